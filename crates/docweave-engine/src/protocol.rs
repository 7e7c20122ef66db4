//! Command messages exchanged between the engine and its host.
//!
//! A [`Message`] is a command name plus an arbitrary JSON payload. The
//! [`MessageBus`] fans each message out to every handler registered for its
//! command, in registration order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::editing::Patch;

pub mod cmds {
    pub const PATCH: &str = "patch";
    pub const SELECTION: &str = "selection";
    pub const LAYOUT: &str = "layout";
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new(cmd: impl Into<String>, data: Value) -> Self {
        Self {
            cmd: cmd.into(),
            data,
        }
    }

    /// A `patch` message carrying the change and selection of an edit
    pub fn patch(patch: &Patch) -> Result<Self, ProtocolError> {
        Ok(Self::new(cmds::PATCH, serde_json::to_value(patch)?))
    }

    /// Decode the payload into a typed value
    pub fn data_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProtocolError> {
        Ok(T::deserialize(&self.data)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

type Handler = Box<dyn FnMut(&Message)>;

/// Routes messages to handlers by command name
#[derive(Default)]
pub struct MessageBus {
    handlers: HashMap<String, Vec<Handler>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `cmd`. Earlier handlers for the same command keep
    /// running first.
    pub fn register<F>(&mut self, cmd: impl Into<String>, handler: F)
    where
        F: FnMut(&Message) + 'static,
    {
        self.handlers
            .entry(cmd.into())
            .or_default()
            .push(Box::new(handler));
    }

    pub fn handler_count(&self, cmd: &str) -> usize {
        self.handlers.get(cmd).map_or(0, Vec::len)
    }

    /// Drop every handler for `cmd`
    pub fn unregister_all(&mut self, cmd: &str) {
        self.handlers.remove(cmd);
    }

    /// Deliver a message; returns how many handlers saw it
    pub fn dispatch(&mut self, message: &Message) -> usize {
        let Some(handlers) = self.handlers.get_mut(&message.cmd) else {
            log::debug!("no handler for message {:?}", message.cmd);
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler(message);
        }
        handlers.len()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(cmd, handlers)| (cmd.as_str(), handlers.len()))
            .collect();
        counts.sort();
        f.debug_struct("MessageBus").field("handlers", &counts).finish()
    }
}
