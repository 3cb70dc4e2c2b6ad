//! Per-channel processing state

use core::fmt;

use crate::aggregate::AggregateSnapshot;
use crate::error::{Error, Result, RunError};
use crate::graph::Graph;
use crate::pool::Pool;

/// Which context a query or ingest targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The mixdown of every input channel.
    Mono,
    /// One input channel, zero-based.
    Index(usize),
}

impl From<usize> for Channel {
    fn from(i: usize) -> Self {
        Channel::Index(i)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Mono => f.write_str("mono"),
            Channel::Index(i) => write!(f, "channel{}", i),
        }
    }
}

/// One channel's sample buffer, graph, pool and latest aggregate.
///
/// Contexts never share state: a node in one context cannot see another
/// context's buffer or pool.
pub struct ChannelContext {
    channel: Channel,
    buffer: Vec<f32>,
    graph: Graph,
    pool: Pool,
    aggregate: Option<AggregateSnapshot>,
}

impl ChannelContext {
    /// Wrap a built graph. The buffer is sized to the graph's frame size and
    /// starts silent.
    pub fn new(channel: Channel, graph: Graph) -> Self {
        let frame_size = graph.context().frame_size;
        Self {
            channel,
            buffer: vec![0.0; frame_size],
            graph,
            pool: Pool::new(),
            aggregate: None,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The block the next [`execute`](Self::execute) will analyse.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [f32] {
        &mut self.buffer
    }

    /// Copy `block` into the buffer. Fails unless it is exactly one frame long.
    pub fn load(&mut self, block: &[f32]) -> Result<()> {
        if block.len() != self.buffer.len() {
            return Err(Error::BlockLength {
                expected: self.buffer.len(),
                got: block.len(),
            });
        }
        self.buffer.copy_from_slice(block);
        Ok(())
    }

    /// Reset the graph and run it over the current buffer.
    pub fn execute(&mut self) -> std::result::Result<(), RunError> {
        self.graph.reset();
        self.graph.run(&self.buffer, &mut self.pool)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn clear_pool(&mut self) {
        self.pool.clear();
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The snapshot taken by the most recent aggregation, if any.
    pub fn aggregate(&self) -> Option<&AggregateSnapshot> {
        self.aggregate.as_ref()
    }

    /// Recompute the aggregate from the pool as it stands now.
    pub fn refresh_aggregate(&mut self) -> &AggregateSnapshot {
        self.aggregate.insert(AggregateSnapshot::from_pool(&self.pool))
    }
}
