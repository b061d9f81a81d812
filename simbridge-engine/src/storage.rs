//! Per-kind cache of entity snapshots.
//!
//! Each [`ObjectStorage`] maps ids of one entity kind to the last snapshot
//! the host returned for them. Refreshes and deletes evict the entry before
//! their call is sent, so between the send and the reply a lookup sees a
//! miss rather than stale data. This relies on every cache access happening
//! on the connection's thread; the cache is not locked.

use crate::client::{decode_reply, Continuation, SharedClient};
use crate::error::{CallError, CallResult};
use crate::shell::{Shell, ShellCell};
use simbridge_protocol::contracts;
use simbridge_protocol::messages::{DeleteObjectMessage, GetObjectMessage, MoveObjectMessage};
use simbridge_types::{Snapshot, Vector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

type Cache<T> = Rc<RefCell<HashMap<<T as Snapshot>::Id, T>>>;

/// Runs with the last known snapshot of an entity about to be deleted.
type DeleteHook<T> = Rc<dyn Fn(&T)>;

/// Cache of one entity kind, bound to one connection.
pub struct ObjectStorage<T: Snapshot> {
    cache: Cache<T>,
    client: SharedClient,
    on_delete: Option<DeleteHook<T>>,
}

impl<T: Snapshot> Clone for ObjectStorage<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Rc::clone(&self.cache),
            client: Rc::clone(&self.client),
            on_delete: self.on_delete.clone(),
        }
    }
}

impl<T: Snapshot> ObjectStorage<T> {
    pub fn new(client: SharedClient) -> Self {
        Self {
            cache: Rc::new(RefCell::new(HashMap::new())),
            client,
            on_delete: None,
        }
    }

    /// Installs a hook run before each delete with the entity's current
    /// snapshot, fetched first if it is not cached. Used to evict entries
    /// of other kinds that the delete changes.
    pub fn on_delete(mut self, hook: impl Fn(&T) + 'static) -> Self {
        self.on_delete = Some(Rc::new(hook));
        self
    }

    /// Returns a function that evicts ids from this cache. It holds only
    /// the cache, so it may be captured by hooks of other storages.
    pub fn evictor(&self) -> impl Fn(T::Id) + 'static {
        let cache = Rc::clone(&self.cache);
        move |id| {
            cache.borrow_mut().remove(&id);
        }
    }

    /// Returns a shell for `id`. A cached snapshot is used as-is unless
    /// `force_refresh` is set; otherwise the entry is refreshed and the shell
    /// fills in when the reply is read.
    pub fn get_by_id(&self, id: T::Id, force_refresh: bool) -> CallResult<Shell<T>> {
        if !force_refresh {
            if let Some(shell) = self.get_cached(id) {
                return Ok(shell);
            }
        }
        let shell = Shell::pending(id, self.clone());
        self.refresh_instance(id, Some(&shell))?;
        Ok(shell)
    }

    /// Returns a shell from the cache only. Never calls the host.
    pub fn get_cached(&self, id: T::Id) -> Option<Shell<T>> {
        let snapshot = self.cache.borrow().get(&id).cloned()?;
        Some(Shell::loaded(snapshot, self.clone()))
    }

    /// Evicts `id` and asks the host for a fresh snapshot. When the reply is
    /// read the cache is updated, along with `shell` if one was given.
    pub fn refresh_instance(&self, id: T::Id, shell: Option<&Shell<T>>) -> CallResult<()> {
        self.wipe_from_cache(id);
        let target = shell.map(|s| {
            s.mark_pending();
            s.cell()
        });
        let args = GetObjectMessage { id, kind: T::KIND };
        let continuation = self.snapshot_continuation(contracts::GET_OBJECT, id, target);
        self.client
            .borrow_mut()
            .call_async(contracts::GET_OBJECT, &args, continuation)?;
        Ok(())
    }

    /// Installs a snapshot the caller already holds, typically the result
    /// of a mutation, and returns a shell for it.
    pub fn save_data(&self, snapshot: Option<T>) -> CallResult<Shell<T>> {
        let snapshot = snapshot.ok_or(CallError::MissingSnapshot(T::KIND))?;
        self.cache
            .borrow_mut()
            .insert(snapshot.id(), snapshot.clone());
        Ok(Shell::loaded(snapshot, self.clone()))
    }

    /// Returns the snapshot for `id`, fetching it with a blocking call on a
    /// miss.
    pub fn get_data(&self, id: T::Id) -> CallResult<T> {
        if let Some(snapshot) = self.cached(id) {
            return Ok(snapshot);
        }
        // A refresh of this id may already be in flight.
        self.client.borrow_mut().settle()?;
        if let Some(snapshot) = self.cached(id) {
            return Ok(snapshot);
        }
        let args = GetObjectMessage { id, kind: T::KIND };
        let snapshot: T = self.client.borrow_mut().call(contracts::GET_OBJECT, &args)?;
        self.cache.borrow_mut().insert(id, snapshot.clone());
        Ok(snapshot)
    }

    /// Evicts `id` and asks the host to delete the entity. The snapshot the
    /// host returns, normally a tombstone, is written back to the cache.
    pub fn delete(&self, id: T::Id, keep_nodes: bool, shell: Option<&Shell<T>>) -> CallResult<()> {
        if let Some(hook) = &self.on_delete {
            let doomed = self.get_data(id)?;
            hook(&doomed);
        }
        self.wipe_from_cache(id);
        let target = shell.map(|s| {
            s.mark_pending();
            s.cell()
        });
        let args = DeleteObjectMessage {
            id,
            kind: T::KIND,
            keep_nodes,
        };
        let continuation = self.snapshot_continuation(contracts::DELETE_OBJECT, id, target);
        self.client
            .borrow_mut()
            .call_async(contracts::DELETE_OBJECT, &args, continuation)?;
        Ok(())
    }

    /// Moves the entity and caches the snapshot the host returns.
    pub fn move_instance(
        &self,
        id: T::Id,
        position: Vector,
        angle: Option<f64>,
    ) -> CallResult<Shell<T>> {
        self.wipe_from_cache(id);
        let args = MoveObjectMessage {
            id,
            kind: T::KIND,
            position,
            angle,
        };
        let snapshot: T = self.client.borrow_mut().call(contracts::MOVE_OBJECT, &args)?;
        self.save_data(Some(snapshot))
    }

    /// Drops the cached snapshot for `id`, returning it.
    pub fn wipe_from_cache(&self, id: T::Id) -> Option<T> {
        self.cache.borrow_mut().remove(&id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.cache.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    pub(crate) fn client(&self) -> &SharedClient {
        &self.client
    }

    fn cached(&self, id: T::Id) -> Option<T> {
        self.cache.borrow().get(&id).cloned()
    }

    // The continuation runs inside the client's poll, so it may touch the
    // cache and the shell but never the client. Host faults are held by the
    // client and surface from its next poll-driven operation.
    fn snapshot_continuation(
        &self,
        function: &'static str,
        id: T::Id,
        target: Option<ShellCell<T>>,
    ) -> Continuation {
        let cache = Rc::clone(&self.cache);
        Box::new(move |result| {
            match result.and_then(|value| decode_reply::<T>(function, value)) {
                Ok(snapshot) => {
                    debug!(kind = %T::KIND, %id, function, "snapshot installed");
                    cache.borrow_mut().insert(id, snapshot.clone());
                    if let Some(cell) = target {
                        *cell.borrow_mut() = Some(snapshot);
                    }
                }
                Err(e) => debug!(kind = %T::KIND, %id, function, error = %e, "async call failed"),
            }
        })
    }
}
