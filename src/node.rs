//! Core node trait and context types.

use std::collections::VecDeque;

use crate::error::InputViolation;
use crate::value::{Value, ValueKind};

/// Information available during processing.
///
/// Passed to every [`Algorithm::process`] call. Identical for every graph an
/// engine builds, since all channel contexts share one configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessContext {
    /// Sample rate of the analysed stream in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of samples delivered to the graph source per tick
    pub frame_size: usize,
    /// Distance in samples between successive analysis frames
    pub hop_size: usize,
}

/// Unique identifier for a node within a graph.
///
/// Identifiers follow declaration order, which is also the tie-break used when
/// ordering the graph for execution.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The core trait for analysis nodes.
///
/// A node declares named input and output ports once, at construction. The
/// graph keeps a token queue per input port. It calls
/// [`process`](Self::process) whenever [`is_ready`](Self::is_ready) says
/// enough input is buffered. Tokens a node pushes to an output port are fanned
/// out to every connected consumer and pool key.
///
/// ```
/// use mltk::{Algorithm, InputViolation, Inputs, Outputs, ProcessContext};
///
/// /// Peak absolute sample of each frame.
/// struct Peak;
///
/// impl Algorithm for Peak {
///     fn kind(&self) -> &'static str { "Peak" }
///     fn inputs(&self) -> &[&'static str] { &["array"] }
///     fn outputs(&self) -> &[&'static str] { &["peak"] }
///
///     fn process(
///         &mut self,
///         _ctx: &ProcessContext,
///         inputs: &mut Inputs<'_>,
///         outputs: &mut Outputs<'_>,
///     ) -> Result<(), InputViolation> {
///         let frame = inputs.pop_nonempty(0)?;
///         let peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
///         outputs.push(0, peak);
///         Ok(())
///     }
/// }
/// ```
///
/// # Progress
///
/// When `is_ready` returns true, `process` must consume input or otherwise
/// move its internal state forward. A node that stays ready without doing
/// either exhausts the run's invocation budget and fails the run with
/// [`RunError::Stalled`](crate::RunError::Stalled).
pub trait Algorithm: Send + 'static {
    /// Short algorithm name used in errors and logs (e.g. `"FrameCutter"`).
    fn kind(&self) -> &'static str;

    /// Input port names. Every one must be connected before the graph builds.
    fn inputs(&self) -> &[&'static str];

    /// Output port names.
    fn outputs(&self) -> &[&'static str];

    /// Whether `process` can run now.
    ///
    /// The default requires one token on every input port. Nodes that hold
    /// buffered input of their own, like a frame cutter, override this.
    fn is_ready(&self, inputs: &Inputs<'_>) -> bool {
        inputs.all_available()
    }

    /// Consume input and push zero or more tokens per output port.
    ///
    /// Returning an [`InputViolation`] aborts the current graph run.
    fn process(
        &mut self,
        ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation>;

    /// Drop per-tick transient state. Persistent state such as filter memory
    /// or carried-over samples survives.
    fn reset(&mut self) {}
}

/// A node's view of its input queues.
pub struct Inputs<'a> {
    queues: &'a mut [VecDeque<Value>],
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(queues: &'a mut [VecDeque<Value>]) -> Self {
        Self { queues }
    }

    /// Number of input ports.
    #[inline]
    pub fn ports(&self) -> usize {
        self.queues.len()
    }

    /// Tokens queued on `port`.
    #[inline]
    pub fn available(&self, port: usize) -> usize {
        self.queues.get(port).map_or(0, VecDeque::len)
    }

    /// True when every port has at least one token queued.
    #[inline]
    pub fn all_available(&self) -> bool {
        self.queues.iter().all(|q| !q.is_empty())
    }

    pub fn peek(&self, port: usize) -> Option<&Value> {
        self.queues.get(port)?.front()
    }

    /// Take the oldest token on `port`.
    pub fn pop(&mut self, port: usize) -> Result<Value, InputViolation> {
        self.queues
            .get_mut(port)
            .and_then(VecDeque::pop_front)
            .ok_or(InputViolation::Starved { port })
    }

    pub fn pop_real(&mut self, port: usize) -> Result<f32, InputViolation> {
        match self.pop(port)? {
            Value::Real(x) => Ok(x),
            Value::Vector(_) => Err(InputViolation::WrongKind {
                port,
                expected: ValueKind::Real,
                found: ValueKind::Vector,
            }),
        }
    }

    pub fn pop_vector(&mut self, port: usize) -> Result<Vec<f32>, InputViolation> {
        match self.pop(port)? {
            Value::Vector(v) => Ok(v),
            Value::Real(_) => Err(InputViolation::WrongKind {
                port,
                expected: ValueKind::Vector,
                found: ValueKind::Real,
            }),
        }
    }

    /// Like [`pop_vector`](Self::pop_vector), rejecting empty vectors.
    pub fn pop_nonempty(&mut self, port: usize) -> Result<Vec<f32>, InputViolation> {
        let v = self.pop_vector(port)?;
        if v.is_empty() {
            return Err(InputViolation::Empty { port });
        }
        Ok(v)
    }

    /// Like [`pop_vector`](Self::pop_vector), requiring exactly `len` elements.
    pub fn pop_exact(&mut self, port: usize, len: usize) -> Result<Vec<f32>, InputViolation> {
        let v = self.pop_vector(port)?;
        if v.len() != len {
            return Err(InputViolation::WrongLength {
                port,
                expected: len,
                got: v.len(),
            });
        }
        Ok(v)
    }
}

/// Where a node pushes the tokens it emits.
pub struct Outputs<'a> {
    pending: &'a mut Vec<(usize, Value)>,
    ports: usize,
}

impl<'a> Outputs<'a> {
    pub(crate) fn new(pending: &'a mut Vec<(usize, Value)>, ports: usize) -> Self {
        Self { pending, ports }
    }

    /// Number of output ports.
    #[inline]
    pub fn ports(&self) -> usize {
        self.ports
    }

    /// Emit `value` on `port`. Pushes to undeclared ports are dropped.
    pub fn push(&mut self, port: usize, value: impl Into<Value>) {
        debug_assert!(port < self.ports, "output port {} out of range", port);
        if port < self.ports {
            self.pending.push((port, value.into()));
        }
    }
}
