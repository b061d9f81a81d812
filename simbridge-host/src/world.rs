//! An in-memory simulation that answers every host contract.
//!
//! Used by the console binary and the tests as the world scripts act on.
//! Ids are allocated densely per kind; positions without a height are
//! placed on the terrain, which is flat at [`MemoryWorld::terrain_height`].

use crate::api::HostApi;
use serde::Serialize;
use serde_json::Value;
use simbridge_protocol::contracts;
use simbridge_protocol::messages::{
    CreateBuildingMessage, CreateNodeMessage, CreatePropMessage, CreateSegmentMessage,
    CreateTreeMessage, DeleteObjectMessage, GetObjectMessage, MoveObjectMessage,
};
use simbridge_protocol::{CallFault, FaultKind};
use simbridge_types::{
    BuildingData, EntityKind, NetPrefabData, NodeData, PropData, SegmentData, Snapshot,
    TreeData, Vector,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    buildings: BTreeMap<u16, BuildingData>,
    props: BTreeMap<u16, PropData>,
    trees: BTreeMap<u32, TreeData>,
    nodes: BTreeMap<u16, NodeData>,
    segments: BTreeMap<u16, SegmentData>,
    prefabs: BTreeSet<String>,
    net_prefabs: BTreeMap<String, NetPrefabData>,
    terrain_height: f64,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small populated world: a few prefabs, one road type, a town hall.
    pub fn demo() -> Self {
        let mut world = Self::new();
        world.set_terrain_height(60.0);
        for name in ["Oak", "Pine", "Bench", "Street Lamp", "Town Hall"] {
            world.add_prefab(name);
        }
        world.add_net_prefab(NetPrefabData {
            name: "Basic Road".to_string(),
            width: 16.0,
            is_overground: true,
            is_underground: false,
            fw_vehicle_lane_count: 1,
            bw_vehicle_lane_count: 1,
        });
        world.insert_building(BuildingData::new(
            1,
            Vector::new(0.0, 60.0, 0.0),
            "Town Hall",
            0.0,
        ));
        world
    }

    // ── Setup ───────────────────────────────────────────────────

    pub fn add_prefab(&mut self, name: &str) {
        self.prefabs.insert(name.to_string());
    }

    pub fn add_net_prefab(&mut self, prefab: NetPrefabData) {
        self.net_prefabs.insert(prefab.name.clone(), prefab);
    }

    pub fn set_terrain_height(&mut self, height: f64) {
        self.terrain_height = height;
    }

    pub fn terrain_height(&self) -> f64 {
        self.terrain_height
    }

    pub fn insert_building(&mut self, building: BuildingData) {
        self.buildings.insert(building.id(), building);
    }

    pub fn insert_prop(&mut self, prop: PropData) {
        self.props.insert(prop.id(), prop);
    }

    pub fn insert_tree(&mut self, tree: TreeData) {
        self.trees.insert(tree.id(), tree);
    }

    // ── Inspection ──────────────────────────────────────────────

    pub fn building(&self, id: u16) -> Option<&BuildingData> {
        self.buildings.get(&id)
    }

    pub fn prop(&self, id: u16) -> Option<&PropData> {
        self.props.get(&id)
    }

    pub fn tree(&self, id: u32) -> Option<&TreeData> {
        self.trees.get(&id)
    }

    pub fn node(&self, id: u16) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub fn segment(&self, id: u16) -> Option<&SegmentData> {
        self.segments.get(&id)
    }

    /// Number of live entities of a kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Building => self.buildings.len(),
            EntityKind::Prop => self.props.len(),
            EntityKind::Tree => self.trees.len(),
            EntityKind::Node => self.nodes.len(),
            EntityKind::Segment => self.segments.len(),
        }
    }

    // ── Contracts ───────────────────────────────────────────────

    /// The snapshot for an id, or a tombstone if there is no such entity.
    pub fn get_object(&mut self, msg: GetObjectMessage<u32>) -> Result<Value, CallFault> {
        let id = msg.id;
        match msg.kind {
            EntityKind::Building => lookup(&self.buildings, narrow(id, msg.kind)?),
            EntityKind::Prop => lookup(&self.props, narrow(id, msg.kind)?),
            EntityKind::Tree => lookup(&self.trees, id),
            EntityKind::Node => lookup(&self.nodes, narrow(id, msg.kind)?),
            EntityKind::Segment => lookup(&self.segments, narrow(id, msg.kind)?),
        }
    }

    /// Removes an entity and returns its tombstone. Deleting a node removes
    /// the segments attached to it; deleting a segment removes end nodes
    /// left without segments unless `keep_nodes` is set.
    pub fn delete_object(&mut self, msg: DeleteObjectMessage<u32>) -> Result<Value, CallFault> {
        let id = msg.id;
        match msg.kind {
            EntityKind::Building => {
                let id = narrow(id, msg.kind)?;
                self.buildings.remove(&id);
                to_value(&BuildingData::tombstone(id))
            }
            EntityKind::Prop => {
                let id = narrow(id, msg.kind)?;
                self.props.remove(&id);
                to_value(&PropData::tombstone(id))
            }
            EntityKind::Tree => {
                self.trees.remove(&id);
                to_value(&TreeData::tombstone(id))
            }
            EntityKind::Node => {
                let id = narrow(id, msg.kind)?;
                if let Some(node) = self.nodes.remove(&id) {
                    for segment_id in node.segment_ids {
                        self.remove_segment(segment_id, true);
                    }
                }
                to_value(&NodeData::tombstone(id))
            }
            EntityKind::Segment => {
                let id = narrow(id, msg.kind)?;
                self.remove_segment(id, msg.keep_nodes);
                to_value(&SegmentData::tombstone(id))
            }
        }
    }

    /// Moves an entity and returns its new snapshot. Segments follow their
    /// nodes and cannot be moved directly.
    pub fn move_object(&mut self, msg: MoveObjectMessage<u32>) -> Result<Value, CallFault> {
        let position = self.place(msg.position);
        let kind = msg.kind;
        match kind {
            EntityKind::Building => {
                let id = narrow(msg.id, kind)?;
                let building = self
                    .buildings
                    .get_mut(&id)
                    .ok_or_else(|| CallFault::not_found(kind, id))?;
                building.instance.position = position;
                if let Some(angle) = msg.angle {
                    building.angle = angle;
                }
                to_value(building)
            }
            EntityKind::Prop => {
                let id = narrow(msg.id, kind)?;
                let prop = self
                    .props
                    .get_mut(&id)
                    .ok_or_else(|| CallFault::not_found(kind, id))?;
                prop.instance.position = position;
                if let Some(angle) = msg.angle {
                    prop.angle = angle;
                }
                to_value(prop)
            }
            EntityKind::Tree => {
                let tree = self
                    .trees
                    .get_mut(&msg.id)
                    .ok_or_else(|| CallFault::not_found(kind, msg.id))?;
                tree.instance.position = position;
                to_value(tree)
            }
            EntityKind::Node => {
                let id = narrow(msg.id, kind)?;
                let node = self
                    .nodes
                    .get_mut(&id)
                    .ok_or_else(|| CallFault::not_found(kind, id))?;
                node.instance.position = position;
                let node = node.clone();
                for segment_id in &node.segment_ids {
                    self.reshape_segment(*segment_id);
                }
                to_value(&node)
            }
            EntityKind::Segment => Err(CallFault::invalid_arguments(
                contracts::MOVE_OBJECT,
                "segments move with their nodes",
            )),
        }
    }

    pub fn create_prop(&mut self, msg: CreatePropMessage) -> Result<PropData, CallFault> {
        self.require_prefab(&msg.prefab_name)?;
        let id = free_id(&self.props, EntityKind::Prop)?;
        let prop = PropData::new(id, self.place(msg.position), msg.prefab_name, msg.angle);
        self.props.insert(id, prop.clone());
        Ok(prop)
    }

    pub fn create_tree(&mut self, msg: CreateTreeMessage) -> Result<TreeData, CallFault> {
        self.require_prefab(&msg.prefab_name)?;
        let id = free_id(&self.trees, EntityKind::Tree)?;
        let tree = TreeData::new(id, self.place(msg.position), msg.prefab_name);
        self.trees.insert(id, tree.clone());
        Ok(tree)
    }

    pub fn create_building(&mut self, msg: CreateBuildingMessage) -> Result<BuildingData, CallFault> {
        self.require_prefab(&msg.prefab_name)?;
        let id = free_id(&self.buildings, EntityKind::Building)?;
        let building = BuildingData::new(id, self.place(msg.position), msg.prefab_name, msg.angle);
        self.buildings.insert(id, building.clone());
        Ok(building)
    }

    pub fn create_node(&mut self, msg: CreateNodeMessage) -> Result<NodeData, CallFault> {
        self.require_net_prefab(&msg.prefab_name)?;
        let id = free_id(&self.nodes, EntityKind::Node)?;
        let node = NodeData::new(id, self.place(msg.position), msg.prefab_name);
        self.nodes.insert(id, node.clone());
        Ok(node)
    }

    pub fn create_segment(&mut self, msg: CreateSegmentMessage) -> Result<SegmentData, CallFault> {
        self.require_net_prefab(&msg.prefab_name)?;
        if msg.start_node_id == msg.end_node_id {
            return Err(CallFault::invalid_arguments(
                contracts::CREATE_SEGMENT,
                "a segment needs two distinct nodes",
            ));
        }
        let start = self.node_position(msg.start_node_id)?;
        let end = self.node_position(msg.end_node_id)?;
        let id = free_id(&self.segments, EntityKind::Segment)?;
        let segment = SegmentData::new(
            id,
            (start + end) * 0.5,
            msg.prefab_name,
            msg.start_node_id,
            msg.end_node_id,
            start.distance(&end),
        );
        for node_id in [msg.start_node_id, msg.end_node_id] {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.segment_ids.push(id);
            }
        }
        self.segments.insert(id, segment.clone());
        Ok(segment)
    }

    pub fn exists_prefab(&mut self, name: String) -> Result<bool, CallFault> {
        Ok(self.prefabs.contains(&name) || self.net_prefabs.contains_key(&name))
    }

    pub fn get_terrain_height(&mut self, _position: Vector) -> Result<f64, CallFault> {
        Ok(self.terrain_height)
    }

    pub fn get_net_prefab(&mut self, name: String) -> Result<NetPrefabData, CallFault> {
        self.net_prefabs
            .get(&name)
            .cloned()
            .ok_or_else(|| CallFault::prefab_not_found(&name))
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn place(&self, position: Vector) -> Vector {
        if position.is_height_defined() {
            position
        } else {
            position.with_height(self.terrain_height)
        }
    }

    fn require_prefab(&self, name: &str) -> Result<(), CallFault> {
        if self.prefabs.contains(name) {
            Ok(())
        } else {
            Err(CallFault::prefab_not_found(name))
        }
    }

    fn require_net_prefab(&self, name: &str) -> Result<(), CallFault> {
        if self.net_prefabs.contains_key(name) {
            Ok(())
        } else {
            Err(CallFault::prefab_not_found(name))
        }
    }

    fn node_position(&self, id: u16) -> Result<Vector, CallFault> {
        self.nodes
            .get(&id)
            .map(|node| node.position())
            .ok_or_else(|| CallFault::not_found(EntityKind::Node, id))
    }

    fn remove_segment(&mut self, id: u16, keep_nodes: bool) {
        let Some(segment) = self.segments.remove(&id) else {
            return;
        };
        for node_id in [segment.start_node_id, segment.end_node_id] {
            let orphaned = match self.nodes.get_mut(&node_id) {
                Some(node) => {
                    node.segment_ids.retain(|s| *s != id);
                    node.segment_ids.is_empty()
                }
                None => false,
            };
            if orphaned && !keep_nodes {
                self.nodes.remove(&node_id);
                debug!(node_id, "removed orphaned node");
            }
        }
    }

    fn reshape_segment(&mut self, id: u16) {
        let Some(segment) = self.segments.get(&id) else {
            return;
        };
        let (Ok(start), Ok(end)) = (
            self.node_position(segment.start_node_id),
            self.node_position(segment.end_node_id),
        ) else {
            return;
        };
        if let Some(segment) = self.segments.get_mut(&id) {
            segment.instance.position = (start + end) * 0.5;
            segment.length = start.distance(&end);
        }
    }
}

/// Builds the host API over a [`MemoryWorld`], one handler per contract.
pub fn world_api() -> HostApi<MemoryWorld> {
    let mut api = HostApi::new();
    api.register(contracts::GET_OBJECT, MemoryWorld::get_object)
        .register(contracts::DELETE_OBJECT, MemoryWorld::delete_object)
        .register(contracts::MOVE_OBJECT, MemoryWorld::move_object)
        .register(contracts::CREATE_PROP, MemoryWorld::create_prop)
        .register(contracts::CREATE_TREE, MemoryWorld::create_tree)
        .register(contracts::CREATE_BUILDING, MemoryWorld::create_building)
        .register(contracts::CREATE_NODE, MemoryWorld::create_node)
        .register(contracts::CREATE_SEGMENT, MemoryWorld::create_segment)
        .register(contracts::EXISTS_PREFAB, MemoryWorld::exists_prefab)
        .register(contracts::GET_TERRAIN_HEIGHT, MemoryWorld::get_terrain_height)
        .register(contracts::GET_NET_PREFAB, MemoryWorld::get_net_prefab);
    api
}

fn narrow(id: u32, kind: EntityKind) -> Result<u16, CallFault> {
    u16::try_from(id)
        .map_err(|_| CallFault::new(FaultKind::InvalidArguments, format!("{kind} id {id} out of range")))
}

fn lookup<T: Snapshot>(map: &BTreeMap<T::Id, T>, id: T::Id) -> Result<Value, CallFault>
where
    T::Id: Ord,
{
    match map.get(&id) {
        Some(snapshot) => to_value(snapshot),
        None => to_value(&T::tombstone(id)),
    }
}

fn free_id<I, T>(map: &BTreeMap<I, T>, kind: EntityKind) -> Result<I, CallFault>
where
    I: Copy + Ord + TryFrom<u32>,
    u32: From<I>,
{
    map.keys()
        .next_back()
        .map_or(Some(1), |&last| u32::from(last).checked_add(1))
        .and_then(|next| I::try_from(next).ok())
        .ok_or_else(|| CallFault::internal(format!("no free {kind} ids")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, CallFault> {
    serde_json::to_value(value).map_err(|e| CallFault::internal(e.to_string()))
}
