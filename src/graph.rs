//! Analysis graph - wired by name at setup, frozen for execution

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use hashbrown::HashMap;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{GraphConfigError, NodeInputError, PortDirection, RunError};
use crate::node::{Algorithm, Inputs, NodeId, Outputs, ProcessContext};
use crate::pool::Pool;
use crate::value::Value;

/// Name of the source vertex and of its single output port.
///
/// Every graph starts with this vertex; it emits the context's sample buffer
/// once per run.
pub const SOURCE: &str = "signal";

const SOURCE_OUTPUTS: &[&str] = &[SOURCE];

/// Floor of the per-run invocation budget. The budget grows with the block
/// length, so only a node that stays ready without consuming reaches it.
const MIN_INVOCATIONS: usize = 1 << 16;

enum NodeKind {
    Source,
    Algorithm(Box<dyn Algorithm>),
}

struct NodeSlot {
    name: String,
    kind: NodeKind,
    /// One token queue per input port
    queues: Vec<VecDeque<Value>>,
}

impl NodeSlot {
    fn inputs(&self) -> &[&'static str] {
        match &self.kind {
            NodeKind::Source => &[],
            NodeKind::Algorithm(a) => a.inputs(),
        }
    }

    fn outputs(&self) -> &[&'static str] {
        match &self.kind {
            NodeKind::Source => SOURCE_OUTPUTS,
            NodeKind::Algorithm(a) => a.outputs(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Wire {
    from_port: usize,
    to_port: usize,
}

type InnerGraph = DiGraph<NodeSlot, Wire>;

/// Where a token emitted on an output port ends up.
#[derive(Clone, Debug)]
enum Route {
    Node { index: NodeIndex, port: usize },
    Pool(String),
}

/// Setup-time graph: add nodes, wire ports by name, then [`build`](Self::build).
///
/// ```
/// use mltk::graph::{GraphBuilder, SOURCE};
/// use mltk::nodes::{Rms, WindowKind, Windowing};
/// use mltk::ProcessContext;
///
/// let ctx = ProcessContext { sample_rate: 44100, frame_size: 512, hop_size: 256 };
/// let mut b = GraphBuilder::new(ctx);
/// b.add("window", Windowing::new(WindowKind::Hann))?;
/// b.add("rms", Rms::new())?;
/// b.connect((SOURCE, SOURCE), ("window", "frame"))?;
/// b.connect(("window", "frame"), ("rms", "array"))?;
/// b.store(("rms", "rms"), "RMS")?;
/// let graph = b.build()?;
/// assert_eq!(graph.order().collect::<Vec<_>>(), ["signal", "window", "rms"]);
/// # Ok::<(), mltk::GraphConfigError>(())
/// ```
pub struct GraphBuilder {
    ctx: ProcessContext,
    graph: InnerGraph,
    names: HashMap<String, NodeIndex>,
    stores: Vec<(NodeIndex, usize, String)>,
}

impl GraphBuilder {
    /// Create a builder holding only the source vertex.
    pub fn new(ctx: ProcessContext) -> Self {
        let mut graph = InnerGraph::with_capacity(16, 32);
        let source = graph.add_node(NodeSlot {
            name: SOURCE.to_owned(),
            kind: NodeKind::Source,
            queues: Vec::new(),
        });
        let mut names = HashMap::new();
        names.insert(SOURCE.to_owned(), source);

        Self {
            ctx,
            graph,
            names,
            stores: Vec::new(),
        }
    }

    /// The context every node in this graph will be processed with.
    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    /// Add a node under a unique name.
    pub fn add<A: Algorithm>(
        &mut self,
        name: &str,
        algorithm: A,
    ) -> Result<NodeId, GraphConfigError> {
        self.add_boxed(name, Box::new(algorithm))
    }

    /// Add an already boxed node under a unique name.
    pub fn add_boxed(
        &mut self,
        name: &str,
        algorithm: Box<dyn Algorithm>,
    ) -> Result<NodeId, GraphConfigError> {
        if name == SOURCE {
            return Err(GraphConfigError::ReservedName(name.to_owned()));
        }
        if self.names.contains_key(name) {
            return Err(GraphConfigError::DuplicateNode(name.to_owned()));
        }

        let queues = vec![VecDeque::new(); algorithm.inputs().len()];
        let idx = self.graph.add_node(NodeSlot {
            name: name.to_owned(),
            kind: NodeKind::Algorithm(algorithm),
            queues,
        });
        self.names.insert(name.to_owned(), idx);

        Ok(NodeId(idx.index() as u32))
    }

    /// Connect output port `from.1` of node `from.0` to input port `to.1` of
    /// node `to.0`.
    ///
    /// An input takes exactly one producer; outputs fan out freely.
    pub fn connect(
        &mut self,
        from: (&str, &str),
        to: (&str, &str),
    ) -> Result<(), GraphConfigError> {
        let src = self.lookup(from.0)?;
        let dst = self.lookup(to.0)?;
        let from_port = self.port(src, from.1, PortDirection::Output)?;
        let to_port = self.port(dst, to.1, PortDirection::Input)?;

        let taken = self
            .graph
            .edges_directed(dst, Direction::Incoming)
            .any(|e| e.weight().to_port == to_port);
        if taken {
            return Err(GraphConfigError::InputAlreadyConnected {
                node: to.0.to_owned(),
                port: to.1.to_owned(),
            });
        }

        // Closing a cycle: the destination already reaches the source.
        if src == dst || has_path_connecting(&self.graph, dst, src, None) {
            return Err(GraphConfigError::Cycle {
                nodes: vec![from.0.to_owned(), to.0.to_owned()],
            });
        }

        self.graph.add_edge(src, dst, Wire { from_port, to_port });
        Ok(())
    }

    /// Write every token from an output port into the pool under `key`.
    pub fn store(&mut self, from: (&str, &str), key: &str) -> Result<(), GraphConfigError> {
        let src = self.lookup(from.0)?;
        let port = self.port(src, from.1, PortDirection::Output)?;
        self.stores.push((src, port, key.to_owned()));
        Ok(())
    }

    /// Validate the wiring and freeze it into an executable [`Graph`].
    pub fn build(self) -> Result<Graph, GraphConfigError> {
        let GraphBuilder {
            ctx,
            graph,
            stores,
            ..
        } = self;

        for idx in graph.node_indices() {
            let slot = &graph[idx];
            if let NodeKind::Source = slot.kind {
                continue;
            }
            if slot.inputs().is_empty() {
                return Err(GraphConfigError::Detached(slot.name.clone()));
            }
            for (port, port_name) in slot.inputs().iter().enumerate() {
                let connected = graph
                    .edges_directed(idx, Direction::Incoming)
                    .any(|e| e.weight().to_port == port);
                if !connected {
                    return Err(GraphConfigError::UnconnectedInput {
                        node: slot.name.clone(),
                        port: (*port_name).to_owned(),
                    });
                }
            }
        }

        let order = execution_order(&graph)?;

        let mut routes: Vec<Vec<Vec<Route>>> = graph
            .node_indices()
            .map(|idx| vec![Vec::new(); graph[idx].outputs().len()])
            .collect();
        // edge_references walks edges in declaration order
        for edge in graph.edge_references() {
            let wire = edge.weight();
            routes[edge.source().index()][wire.from_port].push(Route::Node {
                index: edge.target(),
                port: wire.to_port,
            });
        }
        for (idx, port, key) in &stores {
            routes[idx.index()][*port].push(Route::Pool(key.clone()));
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            stores = stores.len(),
            order = ?order.iter().map(|&i| graph[i].name.as_str()).collect::<Vec<_>>(),
            "graph built"
        );

        Ok(Graph {
            ctx,
            graph,
            order,
            routes,
            stores,
            scratch: Vec::new(),
        })
    }

    fn lookup(&self, name: &str) -> Result<NodeIndex, GraphConfigError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GraphConfigError::UnknownNode(name.to_owned()))
    }

    fn port(
        &self,
        idx: NodeIndex,
        port: &str,
        direction: PortDirection,
    ) -> Result<usize, GraphConfigError> {
        let slot = &self.graph[idx];
        let ports = match direction {
            PortDirection::Input => slot.inputs(),
            PortDirection::Output => slot.outputs(),
        };
        ports
            .iter()
            .position(|p| *p == port)
            .ok_or_else(|| GraphConfigError::UnknownPort {
                node: slot.name.clone(),
                port: port.to_owned(),
                direction,
            })
    }
}

/// Kahn's algorithm over a min-heap of node indices, so ties resolve by
/// declaration order and the source (index 0) always comes first.
fn execution_order(graph: &InnerGraph) -> Result<Vec<NodeIndex>, GraphConfigError> {
    let mut in_degree = vec![0usize; graph.node_count()];
    for edge in graph.edge_references() {
        in_degree[edge.target().index()] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(i)) = ready.pop() {
        let idx = NodeIndex::new(i);
        order.push(idx);
        for edge in graph.edges_directed(idx, Direction::Outgoing) {
            let t = edge.target().index();
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                ready.push(Reverse(t));
            }
        }
    }

    if order.len() < graph.node_count() {
        let nodes = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d > 0)
            .map(|(i, _)| graph[NodeIndex::new(i)].name.clone())
            .collect();
        return Err(GraphConfigError::Cycle { nodes });
    }

    Ok(order)
}

fn deliver(routes: &[Route], graph: &mut InnerGraph, pool: &mut Pool, value: Value) {
    let Some((last, rest)) = routes.split_last() else {
        return;
    };
    for route in rest {
        route.deliver(graph, pool, value.clone());
    }
    last.deliver(graph, pool, value);
}

impl Route {
    fn deliver(&self, graph: &mut InnerGraph, pool: &mut Pool, value: Value) {
        match self {
            Route::Node { index, port } => graph[*index].queues[*port].push_back(value),
            Route::Pool(key) => pool.write(key, value),
        }
    }
}

/// A node-to-node connection, as reported by [`Graph::connections`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection<'a> {
    pub from: &'a str,
    pub from_port: &'a str,
    pub to: &'a str,
    pub to_port: &'a str,
}

/// A frozen analysis graph.
///
/// Owns its nodes outright; the topology cannot change once built.
pub struct Graph {
    ctx: ProcessContext,
    graph: InnerGraph,
    order: Vec<NodeIndex>,
    /// routes[node][output port]
    routes: Vec<Vec<Vec<Route>>>,
    stores: Vec<(NodeIndex, usize, String)>,
    scratch: Vec<(usize, Value)>,
}

impl Graph {
    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    /// Number of vertices, source included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() <= 1
    }

    /// Node names in declaration order, source first.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(move |i| self.graph[i].name.as_str())
    }

    /// Node names in execution order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(move |&i| self.graph[i].name.as_str())
    }

    /// Every node-to-node edge, in declaration order.
    pub fn connections(&self) -> impl Iterator<Item = Connection<'_>> {
        self.graph.edge_references().map(move |e| {
            let (src, dst) = (&self.graph[e.source()], &self.graph[e.target()]);
            Connection {
                from: &src.name,
                from_port: src.outputs()[e.weight().from_port],
                to: &dst.name,
                to_port: dst.inputs()[e.weight().to_port],
            }
        })
    }

    /// Every `(node, output port, pool key)` write, in declaration order.
    pub fn stores(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.stores.iter().map(move |(idx, port, key)| {
            let slot = &self.graph[*idx];
            (slot.name.as_str(), slot.outputs()[*port], key.as_str())
        })
    }

    /// How many edges feed input `port` of `node`. Exactly one in a built graph.
    pub fn inbound_edges(&self, node: &str, port: &str) -> usize {
        self.connections()
            .filter(|c| c.to == node && c.to_port == port)
            .count()
    }

    /// Declared `(node, input port)` pairs across every node.
    pub fn declared_inputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.graph.node_indices().flat_map(move |i| {
            let slot = &self.graph[i];
            slot.inputs().iter().map(move |p| (slot.name.as_str(), *p))
        })
    }

    /// Drop queued tokens and per-tick node state before the next run.
    pub fn reset(&mut self) {
        for slot in self.graph.node_weights_mut() {
            slot.queues.iter_mut().for_each(VecDeque::clear);
            if let NodeKind::Algorithm(algorithm) = &mut slot.kind {
                algorithm.reset();
            }
        }
    }

    /// Push `signal` through the graph, publishing stored outputs into `pool`.
    ///
    /// The source emits `signal` once. Nodes then run in execution order,
    /// each invoked for as long as it stays ready, so a node that slices one
    /// block into several frames is invoked once per frame and its consumers
    /// see every frame in the same run.
    ///
    /// The first [`NodeInputError`] ends the run. So does a node still ready
    /// once the run's invocation budget is spent, reported as
    /// [`RunError::Stalled`]. Values already written to `pool` stay there.
    pub fn run(&mut self, signal: &[f32], pool: &mut Pool) -> Result<(), RunError> {
        let budget = MIN_INVOCATIONS
            .max((signal.len() + self.ctx.frame_size + 1) * self.graph.node_count() * 2);
        let mut invocations = 0usize;

        for step in 0..self.order.len() {
            let idx = self.order[step];

            if let NodeKind::Source = self.graph[idx].kind {
                let routes = &self.routes[idx.index()][0];
                deliver(routes, &mut self.graph, pool, Value::from(signal));
                continue;
            }

            loop {
                let NodeSlot { name, kind, queues } = &mut self.graph[idx];
                let NodeKind::Algorithm(algorithm) = kind else {
                    break;
                };

                let mut inputs = Inputs::new(queues);
                if !algorithm.is_ready(&inputs) {
                    break;
                }

                if invocations >= budget {
                    tracing::error!(
                        node = %name,
                        algorithm = algorithm.kind(),
                        invocations,
                        "node still ready after the invocation budget"
                    );
                    return Err(RunError::Stalled {
                        node: name.clone(),
                        algorithm: algorithm.kind(),
                        invocations,
                    });
                }

                self.scratch.clear();
                let mut outputs = Outputs::new(&mut self.scratch, algorithm.outputs().len());
                if let Err(violation) = algorithm.process(&self.ctx, &mut inputs, &mut outputs) {
                    tracing::trace!(
                        node = %name,
                        algorithm = algorithm.kind(),
                        %violation,
                        "node rejected input"
                    );
                    return Err(NodeInputError {
                        node: name.clone(),
                        algorithm: algorithm.kind(),
                        violation,
                    }
                    .into());
                }

                invocations += 1;
                for (port, value) in self.scratch.drain(..) {
                    deliver(&self.routes[idx.index()][port], &mut self.graph, pool, value);
                }
            }
        }

        tracing::trace!(invocations, "graph run complete");
        Ok(())
    }
}
