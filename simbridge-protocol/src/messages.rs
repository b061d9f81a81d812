//! Payloads carried by run and call-in frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use simbridge_types::{EntityKind, Vector};
use std::fmt;

/// Names of the host functions the engine may call into.
///
/// A call-in frame's tag is `c_callfunc_` followed by one of these.
pub mod contracts {
    /// Fetch one entity snapshot; args [`super::GetObjectMessage`].
    pub const GET_OBJECT: &str = "get_object";
    /// Delete one entity; args [`super::DeleteObjectMessage`].
    pub const DELETE_OBJECT: &str = "delete_object";
    /// Move (and optionally rotate) one entity; args [`super::MoveObjectMessage`].
    pub const MOVE_OBJECT: &str = "move_object";
    pub const CREATE_PROP: &str = "create_prop";
    pub const CREATE_TREE: &str = "create_tree";
    pub const CREATE_BUILDING: &str = "create_building";
    pub const CREATE_NODE: &str = "create_node";
    pub const CREATE_SEGMENT: &str = "create_segment";
    /// Whether any prefab of that name is loaded; args a bare string.
    pub const EXISTS_PREFAB: &str = "exists_prefab";
    /// Terrain height under a position; args a [`simbridge_types::Vector`].
    pub const GET_TERRAIN_HEIGHT: &str = "get_terrain_height";
    /// Network prefab description by name; args a bare string.
    pub const GET_NET_PREFAB: &str = "get_net_prefab";
}

/// Host → engine run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunScriptMessage {
    pub script: String,
}

impl RunScriptMessage {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetObjectMessage<I> {
    pub id: I,
    #[serde(rename = "type")]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteObjectMessage<I> {
    pub id: I,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// For segments: leave the end nodes in place even if orphaned.
    #[serde(default)]
    pub keep_nodes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveObjectMessage<I> {
    pub id: I,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub position: Vector,
    #[serde(default)]
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePropMessage {
    pub position: Vector,
    pub prefab_name: String,
    #[serde(default)]
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTreeMessage {
    pub position: Vector,
    pub prefab_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBuildingMessage {
    pub position: Vector,
    pub prefab_name: String,
    #[serde(default)]
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeMessage {
    pub position: Vector,
    pub prefab_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSegmentMessage {
    pub start_node_id: u16,
    pub end_node_id: u16,
    pub prefab_name: String,
}

/// Category of a host-side call fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    PrefabNotFound,
    NotFound,
    InvalidArguments,
    UnknownFunction,
    Internal,
}

/// A fault raised by a host handler, sent back as the call-in's result.
///
/// The engine turns it into a script-visible error carrying `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct CallFault {
    pub kind: FaultKind,
    pub message: String,
}

impl CallFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn prefab_not_found(name: &str) -> Self {
        Self::new(FaultKind::PrefabNotFound, format!("Prefab '{name}' not found"))
    }

    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::new(FaultKind::NotFound, format!("{kind} {id} does not exist"))
    }

    pub fn invalid_arguments(function: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            FaultKind::InvalidArguments,
            format!("invalid arguments for '{function}': {detail}"),
        )
    }

    pub fn unknown_function(function: &str) -> Self {
        Self::new(
            FaultKind::UnknownFunction,
            format!("unknown host function '{function}'"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, message)
    }
}

/// Host → engine reply to one call-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum CallReply {
    Ok(Value),
    Fault(CallFault),
}

impl CallReply {
    pub fn into_result(self) -> Result<Value, CallFault> {
        match self {
            CallReply::Ok(v) => Ok(v),
            CallReply::Fault(f) => Err(f),
        }
    }
}

impl From<Result<Value, CallFault>> for CallReply {
    fn from(result: Result<Value, CallFault>) -> Self {
        match result {
            Ok(v) => CallReply::Ok(v),
            Err(f) => CallReply::Fault(f),
        }
    }
}
