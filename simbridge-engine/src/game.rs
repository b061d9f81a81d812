//! The API scripts use to reach the simulation.

use crate::client::SharedClient;
use crate::error::CallResult;
use crate::shell::Shell;
use crate::storage::ObjectStorage;
use simbridge_protocol::contracts;
use simbridge_protocol::messages::{
    CreateBuildingMessage, CreateNodeMessage, CreatePropMessage, CreateSegmentMessage,
    CreateTreeMessage,
};
use simbridge_types::{
    BuildingData, NetPrefabData, NodeData, PropData, SegmentData, TreeData, Vector,
};

/// Entry point of one connection: the call client plus one object cache
/// per entity kind. Caches live as long as the connection, across runs.
///
/// Nodes and segments reference each other, so deleting one evicts the
/// cached snapshots of the other kind it was connected to.
pub struct GameApi {
    client: SharedClient,
    buildings: ObjectStorage<BuildingData>,
    props: ObjectStorage<PropData>,
    trees: ObjectStorage<TreeData>,
    nodes: ObjectStorage<NodeData>,
    segments: ObjectStorage<SegmentData>,
}

impl GameApi {
    pub fn new(client: SharedClient) -> Self {
        let nodes = ObjectStorage::<NodeData>::new(client.clone());
        let segments = ObjectStorage::<SegmentData>::new(client.clone());

        let evict_segment = segments.evictor();
        let nodes = nodes.on_delete(move |node| {
            node.segment_ids.iter().for_each(|&id| evict_segment(id));
        });
        let evict_node = nodes.evictor();
        let segments = segments.on_delete(move |segment| {
            evict_node(segment.start_node_id);
            evict_node(segment.end_node_id);
        });

        Self {
            buildings: ObjectStorage::new(client.clone()),
            props: ObjectStorage::new(client.clone()),
            trees: ObjectStorage::new(client.clone()),
            nodes,
            segments,
            client,
        }
    }

    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    // ── Caches ──────────────────────────────────────────────────

    pub fn buildings(&self) -> &ObjectStorage<BuildingData> {
        &self.buildings
    }

    pub fn props(&self) -> &ObjectStorage<PropData> {
        &self.props
    }

    pub fn trees(&self) -> &ObjectStorage<TreeData> {
        &self.trees
    }

    pub fn nodes(&self) -> &ObjectStorage<NodeData> {
        &self.nodes
    }

    pub fn segments(&self) -> &ObjectStorage<SegmentData> {
        &self.segments
    }

    // ── Lookups ─────────────────────────────────────────────────

    pub fn get_building(&self, id: u16) -> CallResult<Shell<BuildingData>> {
        let data = self.buildings.get_data(id)?;
        self.buildings.save_data(Some(data))
    }

    pub fn get_prop(&self, id: u16) -> CallResult<Shell<PropData>> {
        let data = self.props.get_data(id)?;
        self.props.save_data(Some(data))
    }

    pub fn get_tree(&self, id: u32) -> CallResult<Shell<TreeData>> {
        let data = self.trees.get_data(id)?;
        self.trees.save_data(Some(data))
    }

    pub fn get_node(&self, id: u16) -> CallResult<Shell<NodeData>> {
        let data = self.nodes.get_data(id)?;
        self.nodes.save_data(Some(data))
    }

    pub fn get_segment(&self, id: u16) -> CallResult<Shell<SegmentData>> {
        let data = self.segments.get_data(id)?;
        self.segments.save_data(Some(data))
    }

    // ── Creation ────────────────────────────────────────────────

    /// Places a tree. A height-undefined position lands on the terrain.
    pub fn create_tree(&self, position: Vector, prefab_name: &str) -> CallResult<Shell<TreeData>> {
        let args = CreateTreeMessage {
            position,
            prefab_name: prefab_name.to_string(),
        };
        let data = self.client.borrow_mut().call(contracts::CREATE_TREE, &args)?;
        self.trees.save_data(Some(data))
    }

    pub fn create_prop(
        &self,
        position: Vector,
        prefab_name: &str,
        angle: f64,
    ) -> CallResult<Shell<PropData>> {
        let args = CreatePropMessage {
            position,
            prefab_name: prefab_name.to_string(),
            angle,
        };
        let data = self.client.borrow_mut().call(contracts::CREATE_PROP, &args)?;
        self.props.save_data(Some(data))
    }

    pub fn create_building(
        &self,
        position: Vector,
        prefab_name: &str,
        angle: f64,
    ) -> CallResult<Shell<BuildingData>> {
        let args = CreateBuildingMessage {
            position,
            prefab_name: prefab_name.to_string(),
            angle,
        };
        let data = self.client.borrow_mut().call(contracts::CREATE_BUILDING, &args)?;
        self.buildings.save_data(Some(data))
    }

    pub fn create_node(&self, position: Vector, prefab_name: &str) -> CallResult<Shell<NodeData>> {
        let args = CreateNodeMessage {
            position,
            prefab_name: prefab_name.to_string(),
        };
        let data = self.client.borrow_mut().call(contracts::CREATE_NODE, &args)?;
        self.nodes.save_data(Some(data))
    }

    /// Connects two nodes. The end nodes change too, so their cached
    /// snapshots are dropped.
    pub fn create_segment(
        &self,
        start_node_id: u16,
        end_node_id: u16,
        prefab_name: &str,
    ) -> CallResult<Shell<SegmentData>> {
        let args = CreateSegmentMessage {
            start_node_id,
            end_node_id,
            prefab_name: prefab_name.to_string(),
        };
        let data = self.client.borrow_mut().call(contracts::CREATE_SEGMENT, &args)?;
        self.nodes.wipe_from_cache(start_node_id);
        self.nodes.wipe_from_cache(end_node_id);
        self.segments.save_data(Some(data))
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn exists_prefab(&self, prefab_name: &str) -> CallResult<bool> {
        self.client
            .borrow_mut()
            .call(contracts::EXISTS_PREFAB, prefab_name)
    }

    pub fn terrain_height(&self, position: Vector) -> CallResult<f64> {
        self.client
            .borrow_mut()
            .call(contracts::GET_TERRAIN_HEIGHT, &position)
    }

    pub fn net_prefab(&self, prefab_name: &str) -> CallResult<NetPrefabData> {
        self.client
            .borrow_mut()
            .call(contracts::GET_NET_PREFAB, prefab_name)
    }

    /// Sends printed text to the host console.
    pub fn print(&self, text: &str) -> CallResult<()> {
        self.client.borrow_mut().send_output(text)?;
        Ok(())
    }
}
