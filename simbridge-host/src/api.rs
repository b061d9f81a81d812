//! Registry of host functions the engine may call into.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use simbridge_protocol::{CallFault, CallReply};
use std::collections::HashMap;
use tracing::debug;

type Handler<W> = Box<dyn Fn(&mut W, Value) -> Result<Value, CallFault>>;

/// Maps call-in names to handlers over some world state `W`.
///
/// Handlers run synchronously on the thread driving the execution turn and
/// get exclusive access to the world for the duration of the call.
pub struct HostApi<W> {
    handlers: HashMap<String, Handler<W>>,
}

impl<W> Default for HostApi<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> HostApi<W> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a typed handler. Arguments that do not decode into `A` are
    /// answered with an invalid-arguments fault without calling it.
    /// Registering a name twice replaces the earlier handler.
    pub fn register<A, R, F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        W: 'static,
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(&mut W, A) -> Result<R, CallFault> + 'static,
    {
        let function = name.to_string();
        let wrapped = move |world: &mut W, args: Value| -> Result<Value, CallFault> {
            let args: A = serde_json::from_value(args)
                .map_err(|e| CallFault::invalid_arguments(&function, e))?;
            let result = handler(world, args)?;
            serde_json::to_value(result).map_err(|e| CallFault::internal(e.to_string()))
        };
        self.handlers.insert(name.to_string(), Box::new(wrapped));
        self
    }

    /// Runs the named handler and builds the reply for the engine.
    pub fn handle(&self, world: &mut W, function: &str, args: Value) -> CallReply {
        let Some(handler) = self.handlers.get(function) else {
            debug!(function, "call to unregistered host function");
            return CallReply::Fault(CallFault::unknown_function(function));
        };
        handler(world, args).into()
    }

    pub fn contains(&self, function: &str) -> bool {
        self.handlers.contains_key(function)
    }

    /// Registered names, sorted.
    pub fn functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
