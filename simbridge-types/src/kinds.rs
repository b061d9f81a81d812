//! Concrete snapshot records, one per entity kind.

use crate::snapshot::{EntityKind, InstanceData, Snapshot};
use crate::Vector;
use serde::{Deserialize, Serialize};

// Declares a snapshot record: the shared instance fields flattened in, the
// kind-specific fields after them, tombstone-aware equality and the
// `Snapshot` impl.
macro_rules! snapshot_kind {
    (
        $(#[$meta:meta])*
        $name:ident: $kind:expr, $id:ty {
            $( $(#[$fmeta:meta])* $field:ident: $fty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub instance: InstanceData<$id>,
            $(
                $(#[$fmeta])*
                #[serde(default)]
                pub $field: $fty,
            )*
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                if self.instance.deleted || other.instance.deleted {
                    return self.instance == other.instance;
                }
                self.instance == other.instance $( && self.$field == other.$field )*
            }
        }

        impl Snapshot for $name {
            type Id = $id;
            const KIND: EntityKind = $kind;

            fn instance(&self) -> &InstanceData<$id> {
                &self.instance
            }

            fn tombstone(id: $id) -> Self {
                Self {
                    instance: InstanceData::tombstone(id),
                    $( $field: Default::default(), )*
                }
            }
        }
    };
}

snapshot_kind! {
    /// A placed building.
    BuildingData: EntityKind::Building, u16 {
        /// Rotation around the height axis, in radians.
        angle: f64,
    }
}

snapshot_kind! {
    /// A decorative prop.
    PropData: EntityKind::Prop, u16 {
        /// Rotation around the height axis, in radians.
        angle: f64,
    }
}

snapshot_kind! {
    /// A tree. Tree ids have a wider range than other kinds.
    TreeData: EntityKind::Tree, u32 {}
}

snapshot_kind! {
    /// A network node (road/rail junction or end point).
    NodeData: EntityKind::Node, u16 {
        /// Segments attached to this node.
        segment_ids: Vec<u16>,
    }
}

snapshot_kind! {
    /// A network segment between two nodes.
    SegmentData: EntityKind::Segment, u16 {
        start_node_id: u16,
        end_node_id: u16,
        length: f64,
    }
}

impl BuildingData {
    pub fn new(id: u16, position: Vector, prefab_name: impl Into<String>, angle: f64) -> Self {
        Self {
            instance: InstanceData::new(id, position, prefab_name),
            angle,
        }
    }
}

impl PropData {
    pub fn new(id: u16, position: Vector, prefab_name: impl Into<String>, angle: f64) -> Self {
        Self {
            instance: InstanceData::new(id, position, prefab_name),
            angle,
        }
    }
}

impl TreeData {
    pub fn new(id: u32, position: Vector, prefab_name: impl Into<String>) -> Self {
        Self {
            instance: InstanceData::new(id, position, prefab_name),
        }
    }
}

impl NodeData {
    pub fn new(id: u16, position: Vector, prefab_name: impl Into<String>) -> Self {
        Self {
            instance: InstanceData::new(id, position, prefab_name),
            segment_ids: Vec::new(),
        }
    }
}

impl SegmentData {
    /// Creates a segment; `position` is the segment's middle point.
    pub fn new(
        id: u16,
        position: Vector,
        prefab_name: impl Into<String>,
        start_node_id: u16,
        end_node_id: u16,
        length: f64,
    ) -> Self {
        Self {
            instance: InstanceData::new(id, position, prefab_name),
            start_node_id,
            end_node_id,
            length,
        }
    }
}

/// Description of a network prefab (road, rail, path type).
///
/// Prefabs are looked up by name and never cached, so this is not a
/// [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPrefabData {
    pub name: String,
    pub width: f32,
    pub is_overground: bool,
    pub is_underground: bool,
    pub fw_vehicle_lane_count: u32,
    pub bw_vehicle_lane_count: u32,
}
