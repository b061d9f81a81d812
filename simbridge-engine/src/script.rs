//! The script-engine seam and a line-oriented demo language.
//!
//! The server only needs to compile a source text and run the result
//! against a [`GameApi`]; [`ScriptEngine`] is that contract. [`LineScript`]
//! implements it with one command per line:
//!
//! ```text
//! # comment
//! print <text>
//! building|prop|tree|node|segment <id>
//! refresh <kind> <id>
//! delete <kind> <id>
//! move <kind> <id> <x> <z>
//! create_tree <prefab> <x> <z>
//! create_prop <prefab> <x> <z> <angle>
//! exists <prefab>
//! height <x> <z>
//! raise <message>
//! ```
//!
//! Every line is parsed before anything runs, so a malformed script fails
//! to compile without making a single call into the host.

use crate::error::CallError;
use crate::game::GameApi;
use crate::shell::Shell;
use simbridge_types::{EntityKind, Snapshot, Vector};
use std::str::FromStr;
use thiserror::Error;

/// The script failed to compile; nothing ran.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct CompileError(pub String);

/// The script raised an error while running.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct RuntimeError(pub String);

impl From<CallError> for RuntimeError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Fault(fault) => RuntimeError(format!("HostError: {}", fault.message)),
            other => RuntimeError(format!("BridgeError: {other}")),
        }
    }
}

/// A language the engine can run.
pub trait ScriptEngine {
    type Program;

    fn compile(&self, source: &str) -> Result<Self::Program, CompileError>;

    fn execute(&self, program: &Self::Program, game: &GameApi) -> Result<(), RuntimeError>;
}

/// One entity reference with an id of the kind's width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef {
    Building(u16),
    Prop(u16),
    Tree(u32),
    Node(u16),
    Segment(u16),
}

impl EntityRef {
    fn parse(kind: &str, id: &str) -> Result<Self, String> {
        let kind = EntityKind::from_str(kind).map_err(|e| e.to_string())?;
        let bad_id = |_| format!("invalid {kind} id '{id}'");
        Ok(match kind {
            EntityKind::Building => EntityRef::Building(id.parse().map_err(bad_id)?),
            EntityKind::Prop => EntityRef::Prop(id.parse().map_err(bad_id)?),
            EntityKind::Tree => EntityRef::Tree(id.parse().map_err(bad_id)?),
            EntityKind::Node => EntityRef::Node(id.parse().map_err(bad_id)?),
            EntityKind::Segment => EntityRef::Segment(id.parse().map_err(bad_id)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Print(String),
    Show(EntityRef),
    Refresh(EntityRef),
    Delete(EntityRef),
    Move(EntityRef, Vector),
    CreateTree { prefab: String, position: Vector },
    CreateProp { prefab: String, position: Vector, angle: f64 },
    Exists(String),
    Height(Vector),
    Raise(String),
}

/// The demo language.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineScript;

impl LineScript {
    fn parse_line(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match (word, args.as_slice()) {
            ("print", _) => Command::Print(rest.to_string()),
            ("raise", _) => Command::Raise(rest.to_string()),
            ("refresh", [kind, id]) => Command::Refresh(EntityRef::parse(kind, id)?),
            ("delete", [kind, id]) => Command::Delete(EntityRef::parse(kind, id)?),
            ("move", [kind, id, x, z]) => {
                Command::Move(EntityRef::parse(kind, id)?, Vector::xz(number(x)?, number(z)?))
            }
            ("create_tree", [prefab, x, z]) => Command::CreateTree {
                prefab: prefab.to_string(),
                position: Vector::xz(number(x)?, number(z)?),
            },
            ("create_prop", [prefab, x, z, angle]) => Command::CreateProp {
                prefab: prefab.to_string(),
                position: Vector::xz(number(x)?, number(z)?),
                angle: number(angle)?,
            },
            ("exists", [prefab]) => Command::Exists(prefab.to_string()),
            ("height", [x, z]) => Command::Height(Vector::xz(number(x)?, number(z)?)),
            (kind, [id]) if EntityKind::from_str(kind).is_ok() => {
                Command::Show(EntityRef::parse(kind, id)?)
            }
            (
                "refresh" | "delete" | "move" | "create_tree" | "create_prop" | "exists"
                | "height",
                _,
            ) => return Err(format!("wrong number of arguments to '{word}'")),
            (kind, _) if EntityKind::from_str(kind).is_ok() => {
                return Err(format!("'{kind}' takes exactly one id"));
            }
            _ => return Err(format!("unknown command '{word}'")),
        };
        Ok(Some(command))
    }

    fn run(command: &Command, game: &GameApi) -> Result<(), RuntimeError> {
        match command {
            Command::Print(text) => game.print(text)?,
            Command::Raise(message) => return Err(RuntimeError(message.clone())),
            Command::Show(entity) => {
                let line = match *entity {
                    EntityRef::Building(id) => describe(&game.get_building(id)?)?,
                    EntityRef::Prop(id) => describe(&game.get_prop(id)?)?,
                    EntityRef::Tree(id) => describe(&game.get_tree(id)?)?,
                    EntityRef::Node(id) => describe(&game.get_node(id)?)?,
                    EntityRef::Segment(id) => describe(&game.get_segment(id)?)?,
                };
                game.print(&line)?;
            }
            Command::Refresh(entity) => match *entity {
                EntityRef::Building(id) => game.buildings().refresh_instance(id, None)?,
                EntityRef::Prop(id) => game.props().refresh_instance(id, None)?,
                EntityRef::Tree(id) => game.trees().refresh_instance(id, None)?,
                EntityRef::Node(id) => game.nodes().refresh_instance(id, None)?,
                EntityRef::Segment(id) => game.segments().refresh_instance(id, None)?,
            },
            Command::Delete(entity) => match *entity {
                EntityRef::Building(id) => game.buildings().delete(id, false, None)?,
                EntityRef::Prop(id) => game.props().delete(id, false, None)?,
                EntityRef::Tree(id) => game.trees().delete(id, false, None)?,
                EntityRef::Node(id) => game.nodes().delete(id, false, None)?,
                EntityRef::Segment(id) => game.segments().delete(id, false, None)?,
            },
            Command::Move(entity, position) => {
                let position = *position;
                let line = match *entity {
                    EntityRef::Building(id) => {
                        describe(&game.buildings().move_instance(id, position, None)?)?
                    }
                    EntityRef::Prop(id) => describe(&game.props().move_instance(id, position, None)?)?,
                    EntityRef::Tree(id) => describe(&game.trees().move_instance(id, position, None)?)?,
                    EntityRef::Node(id) => describe(&game.nodes().move_instance(id, position, None)?)?,
                    EntityRef::Segment(id) => {
                        describe(&game.segments().move_instance(id, position, None)?)?
                    }
                };
                game.print(&line)?;
            }
            Command::CreateTree { prefab, position } => {
                let tree = game.create_tree(*position, prefab)?;
                game.print(&describe(&tree)?)?;
            }
            Command::CreateProp {
                prefab,
                position,
                angle,
            } => {
                let prop = game.create_prop(*position, prefab, *angle)?;
                game.print(&describe(&prop)?)?;
            }
            Command::Exists(prefab) => {
                let exists = game.exists_prefab(prefab)?;
                game.print(&exists.to_string())?;
            }
            Command::Height(position) => {
                let height = game.terrain_height(*position)?;
                game.print(&format!("{height:.2}"))?;
            }
        }
        Ok(())
    }
}

impl ScriptEngine for LineScript {
    type Program = Vec<Command>;

    fn compile(&self, source: &str) -> Result<Vec<Command>, CompileError> {
        let mut program = Vec::new();
        for (index, line) in source.lines().enumerate() {
            match Self::parse_line(line) {
                Ok(Some(command)) => program.push(command),
                Ok(None) => {}
                Err(message) => {
                    return Err(CompileError(format!(
                        "SyntaxError: line {}: {message}",
                        index + 1
                    )));
                }
            }
        }
        Ok(program)
    }

    fn execute(&self, program: &Vec<Command>, game: &GameApi) -> Result<(), RuntimeError> {
        program
            .iter()
            .try_for_each(|command| Self::run(command, game))
    }
}

fn number(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("'{text}' is not a number"))
}

/// One-line description of the entity behind a shell.
pub fn describe<T: Snapshot>(shell: &Shell<T>) -> Result<String, CallError> {
    let snapshot = shell.snapshot()?;
    if snapshot.is_deleted() {
        return Ok(format!("{} {} (deleted)", T::KIND, shell.id()));
    }
    Ok(format!(
        "{} {} '{}' at {}",
        T::KIND,
        shell.id(),
        snapshot.prefab_name(),
        snapshot.position()
    ))
}
