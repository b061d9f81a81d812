//! The common shape of every entity snapshot.

use crate::{Error, Vector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// The simulation entity kinds the bridge knows how to cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Building,
    Prop,
    Tree,
    Node,
    Segment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Building,
        EntityKind::Prop,
        EntityKind::Tree,
        EntityKind::Node,
        EntityKind::Segment,
    ];

    /// Wire name of the kind, as carried in `type` fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Building => "building",
            EntityKind::Prop => "prop",
            EntityKind::Tree => "tree",
            EntityKind::Node => "node",
            EntityKind::Segment => "segment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

/// Fields shared by every entity snapshot.
///
/// A snapshot with `deleted = true` is a tombstone: the entity no longer
/// exists and the remaining fields carry no meaning. Equality honours this,
/// two tombstones for the same id compare equal whatever else they hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceData<I> {
    pub id: I,
    #[serde(default)]
    pub position: Vector,
    #[serde(default)]
    pub prefab_name: String,
    #[serde(default)]
    pub deleted: bool,
}

impl<I> InstanceData<I> {
    /// Creates the data of a live entity.
    pub fn new(id: I, position: Vector, prefab_name: impl Into<String>) -> Self {
        Self {
            id,
            position,
            prefab_name: prefab_name.into(),
            deleted: false,
        }
    }

    /// Creates the data of an entity that no longer exists.
    pub fn tombstone(id: I) -> Self {
        Self {
            id,
            position: Vector::zero(),
            prefab_name: String::new(),
            deleted: true,
        }
    }
}

impl<I: PartialEq> PartialEq for InstanceData<I> {
    fn eq(&self, other: &Self) -> bool {
        if self.deleted || other.deleted {
            return self.deleted == other.deleted && self.id == other.id;
        }
        self.id == other.id
            && self.position == other.position
            && self.prefab_name == other.prefab_name
    }
}

/// A snapshot of one simulation entity, keyed by a kind-specific id.
///
/// Implemented by the concrete records in this crate. The engine's object
/// cache is generic over this trait, one cache per implementor.
pub trait Snapshot: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static {
    /// Identifier type; its width depends on the entity kind.
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + 'static;

    const KIND: EntityKind;

    fn instance(&self) -> &InstanceData<Self::Id>;

    /// Builds the snapshot reported for an id that no longer exists.
    fn tombstone(id: Self::Id) -> Self;

    fn id(&self) -> Self::Id {
        self.instance().id
    }

    fn is_deleted(&self) -> bool {
        self.instance().deleted
    }

    fn position(&self) -> Vector {
        self.instance().position
    }

    fn prefab_name(&self) -> &str {
        &self.instance().prefab_name
    }
}
