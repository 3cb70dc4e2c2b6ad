//! Error types for graph construction, execution and result queries.

use std::fmt;
use std::io;

use crate::context::Channel;
use crate::value::ValueKind;

/// Result alias carrying the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A graph run was aborted.
    #[error(transparent)]
    Run(#[from] RunError),

    /// A query named a key that no node ever wrote.
    #[error("pool key `{key}` was never written")]
    PoolKeyNotFound { key: String },

    /// The key exists but nothing was emitted into it since the last clear.
    #[error("pool key `{key}` holds no values")]
    EmptySeries { key: String },

    /// The graph could not be wired. Fatal at setup.
    #[error(transparent)]
    GraphConfiguration(#[from] GraphConfigError),

    /// A channel index beyond the configured channel count.
    #[error("{channel} is out of range for {channels} configured channels")]
    ChannelIndexOutOfRange { channel: Channel, channels: usize },

    /// The latest value of a key is not of the requested kind.
    #[error("pool key `{key}` holds a {found} value, expected a {expected}")]
    ValueKind {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// An ingested block did not match the configured frame size.
    #[error("expected a block of {expected} samples, got {got}")]
    BlockLength { expected: usize, got: usize },

    /// The engine configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// One or more channel contexts failed during a tick.
    #[error(transparent)]
    Tick(#[from] TickError),

    /// Audio input device failure.
    #[error("audio device: {0}")]
    Device(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// The contract breach a node reports when handed malformed input.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InputViolation {
    /// `process` was called while the port had nothing queued.
    #[error("input port {port} has no queued token")]
    Starved { port: usize },

    #[error("input port {port} expected a {expected} token, got a {found}")]
    WrongKind {
        port: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("input port {port} expected {expected} elements, got {got}")]
    WrongLength {
        port: usize,
        expected: usize,
        got: usize,
    },

    #[error("input port {port} received an empty vector")]
    Empty { port: usize },
}

/// A node's [`InputViolation`], tagged with the node that raised it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("node `{node}` ({algorithm}) rejected its input: {violation}")]
pub struct NodeInputError {
    pub node: String,
    pub algorithm: &'static str,
    #[source]
    pub violation: InputViolation,
}

/// Why a graph run stopped before draining its input.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    NodeInput(#[from] NodeInputError),

    /// A node stayed ready past the run's invocation budget without the
    /// graph draining.
    #[error("node `{node}` ({algorithm}) still ready after {invocations} invocations")]
    Stalled {
        node: String,
        algorithm: &'static str,
        invocations: usize,
    },
}

/// Wiring mistakes caught while building a graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphConfigError {
    #[error("a node named `{0}` already exists")]
    DuplicateNode(String),

    #[error("`{0}` is reserved for the graph source")]
    ReservedName(String),

    #[error("no node named `{0}`")]
    UnknownNode(String),

    #[error("node `{node}` has no {direction} port `{port}`")]
    UnknownPort {
        node: String,
        port: String,
        direction: PortDirection,
    },

    #[error("input `{node}.{port}` already has a producer")]
    InputAlreadyConnected { node: String, port: String },

    #[error("input `{node}.{port}` is not connected")]
    UnconnectedInput { node: String, port: String },

    #[error("node `{0}` declares no inputs; only the source may originate data")]
    Detached(String),

    #[error("connection would create a cycle through {}", .nodes.join(" -> "))]
    Cycle { nodes: Vec<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// A context that failed during a tick, and why.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub error: RunError,
}

/// Per-context failures collected over one tick.
///
/// Contexts not listed here ran to completion.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("tick failed in {} context(s): {}", .failures.len(), describe(.failures))]
pub struct TickError {
    pub failures: Vec<ChannelFailure>,
}

impl TickError {
    /// Whether the given context is among the failures.
    pub fn failed(&self, channel: Channel) -> bool {
        self.failures.iter().any(|f| f.channel == channel)
    }
}

fn describe(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.channel, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
