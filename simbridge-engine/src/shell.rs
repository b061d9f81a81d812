//! Script-facing handles to cached entities.

use crate::error::{CallError, CallResult};
use crate::storage::ObjectStorage;
use simbridge_types::{
    BuildingData, EntityKind, NodeData, PropData, SegmentData, Snapshot, Vector,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The snapshot a shell currently shows; `None` while a refresh is in flight.
pub(crate) type ShellCell<T> = Rc<RefCell<Option<T>>>;

/// A lightweight view of one entity.
///
/// Shells do not own their data: the storage does, and a shell only shows
/// the snapshot it was created with or last refreshed to. A shell whose
/// refresh is still in flight resolves it on first read.
pub struct Shell<T: Snapshot> {
    id: T::Id,
    state: ShellCell<T>,
    storage: ObjectStorage<T>,
}

impl<T: Snapshot> Shell<T> {
    pub(crate) fn loaded(snapshot: T, storage: ObjectStorage<T>) -> Self {
        Self {
            id: snapshot.id(),
            state: Rc::new(RefCell::new(Some(snapshot))),
            storage,
        }
    }

    pub(crate) fn pending(id: T::Id, storage: ObjectStorage<T>) -> Self {
        Self {
            id,
            state: Rc::new(RefCell::new(None)),
            storage,
        }
    }

    pub(crate) fn cell(&self) -> ShellCell<T> {
        Rc::clone(&self.state)
    }

    pub(crate) fn mark_pending(&self) {
        self.state.replace(None);
    }

    pub fn id(&self) -> T::Id {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    /// Whether the shell holds a snapshot without needing the host.
    pub fn is_loaded(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The snapshot behind this shell, reading any outstanding reply first.
    /// A shell whose call was answered with a host fault returns that fault.
    pub fn snapshot(&self) -> CallResult<T> {
        if let Some(snapshot) = self.state.borrow().as_ref() {
            return Ok(snapshot.clone());
        }
        self.storage.client().borrow_mut().settle()?;
        self.state
            .borrow()
            .clone()
            .ok_or_else(|| CallError::Unresolved {
                kind: T::KIND,
                id: self.id.to_string(),
            })
    }

    pub fn is_deleted(&self) -> CallResult<bool> {
        Ok(self.snapshot()?.is_deleted())
    }

    pub fn position(&self) -> CallResult<Vector> {
        Ok(self.snapshot()?.position())
    }

    pub fn prefab_name(&self) -> CallResult<String> {
        Ok(self.snapshot()?.prefab_name().to_string())
    }

    /// Asks the host for fresh data; the shell updates when the reply is read.
    pub fn refresh(&self) -> CallResult<()> {
        self.storage.refresh_instance(self.id, Some(self))
    }

    /// Moves the entity, keeping its rotation.
    pub fn move_to(&self, position: Vector) -> CallResult<()> {
        let moved = self.storage.move_instance(self.id, position, None)?;
        self.state.replace(moved.state.borrow().clone());
        Ok(())
    }

    /// Deletes the entity. The shell reads as deleted once the host replies.
    pub fn delete(&self) -> CallResult<()> {
        self.storage.delete(self.id, false, Some(self))
    }
}

impl<T: Snapshot> Clone for Shell<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Rc::clone(&self.state),
            storage: self.storage.clone(),
        }
    }
}

impl<T: Snapshot> fmt::Debug for Shell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("kind", &T::KIND)
            .field("id", &self.id)
            .field("snapshot", &self.state.borrow())
            .finish()
    }
}

impl Shell<BuildingData> {
    pub fn angle(&self) -> CallResult<f64> {
        Ok(self.snapshot()?.angle)
    }

    /// Moves and rotates the building.
    pub fn move_with_angle(&self, position: Vector, angle: f64) -> CallResult<()> {
        let moved = self.storage.move_instance(self.id, position, Some(angle))?;
        self.state.replace(moved.state.borrow().clone());
        Ok(())
    }
}

impl Shell<PropData> {
    pub fn angle(&self) -> CallResult<f64> {
        Ok(self.snapshot()?.angle)
    }
}

impl Shell<NodeData> {
    pub fn segment_ids(&self) -> CallResult<Vec<u16>> {
        Ok(self.snapshot()?.segment_ids)
    }
}

impl Shell<SegmentData> {
    pub fn start_node_id(&self) -> CallResult<u16> {
        Ok(self.snapshot()?.start_node_id)
    }

    pub fn end_node_id(&self) -> CallResult<u16> {
        Ok(self.snapshot()?.end_node_id)
    }

    pub fn length(&self) -> CallResult<f64> {
        Ok(self.snapshot()?.length)
    }

    /// Deletes the segment; `keep_nodes` leaves orphaned end nodes in place.
    pub fn delete_with_nodes(&self, keep_nodes: bool) -> CallResult<()> {
        self.storage.delete(self.id, keep_nodes, Some(self))
    }
}
