//! # Render graph
//!
//! Append only table of recorded [Node]s and their resource [links](NodeLinks). A graph is filled during a frame,
//! possibly from several threads, its [tables](RenderGraph::tables) are handed to the [Scheduler](crate::Scheduler)
//! and the command builder, and then the graph is [reset](RenderGraph::reset).
//!
//! Both draining and reset take `&mut self`, so recording threads must have finished before.

use std::fmt::Display;

use crate::{Node, ResourceStateTracker, TrackedState};

pub(crate) mod debug;
pub(crate) mod links;

use debug::DebugContext;
use links::NodeLinks;

///Index of a node in its graph. Handles are dense, the n-th node since the last reset has handle n.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct NodeHandle(pub(crate) u32);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeHandle({})", self.0)
    }
}

///Node and link tables of a [RenderGraph], together with its debug group bookkeeping.
///
/// Lives behind the lock of the graph's [ResourceStateTracker]. Exclusive access is available through
/// [RenderGraph::tables] once recording has finished.
pub struct GraphTables {
    nodes: Vec<Node>,
    ///Always as long as `nodes`.
    links: Vec<NodeLinks>,
    debug: DebugContext,
}

impl GraphTables {
    fn new(debug_capture: bool) -> Self {
        GraphTables {
            nodes: Vec::new(),
            links: Vec::new(),
            debug: DebugContext::new(debug_capture),
        }
    }

    ///Handle the next [add_node](RenderGraph::add_node) call will return.
    pub fn next_node_handle(&self) -> NodeHandle {
        NodeHandle(self.nodes.len() as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    ///Panics if `handle` was not issued since the last reset.
    pub fn node(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.index()]
    }

    pub fn links(&self, handle: NodeHandle) -> &NodeLinks {
        &self.links[handle.index()]
    }

    ///All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeHandle(idx as u32), node))
    }

    ///Dotted path of the debug groups `handle` was added under. Empty if capture was disabled.
    pub fn full_debug_group(&self, handle: NodeHandle) -> String {
        self.debug.full_group(handle)
    }

    pub fn debug_group_color(&self, handle: NodeHandle) -> Option<[f32; 4]> {
        self.debug.group_color(handle)
    }

    pub fn debug(&self) -> &DebugContext {
        &self.debug
    }

    fn reset(&mut self) {
        #[cfg(feature = "logging")]
        log::debug!("Resetting render graph with {} nodes", self.nodes.len());

        self.nodes.clear();
        self.links.clear();
        self.debug.reset_nodes();
    }
}

///Records nodes from any number of threads.
///
/// The graph owns the [ResourceStateTracker] of its device. The tracker's single mutex guards the resources as well
/// as the [GraphTables], so [add_node](Self::add_node) only needs `&self` and resolves stamps and commits the node in
/// one critical section. Share the graph by reference (or `Arc`) between recording threads.
pub struct RenderGraph {
    tracker: ResourceStateTracker<GraphTables>,
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGraph {
    ///Creates an empty graph with an empty resource tracker. Debug group capture starts enabled if the
    /// `debug_marker` feature is active.
    pub fn new() -> Self {
        Self::with_debug_capture(cfg!(feature = "debug_marker"))
    }

    pub fn with_debug_capture(capture: bool) -> Self {
        RenderGraph {
            tracker: ResourceStateTracker::with_guarded(GraphTables::new(capture)),
        }
    }

    ///Adds a node and resolves its links.
    ///
    /// The tracker lock is held for the whole call. The stamps the node captures are therefore the ones that were
    /// current when the node was committed, even if other threads record into this graph concurrently.
    pub fn add_node(&self, create_info: impl Into<Node>) -> NodeHandle {
        //build the node before taking the lock
        let node = create_info.into();

        let mut guard = self.tracker.lock();
        let TrackedState {
            resources,
            guarded: tables,
        } = &mut *guard;

        assert!(
            tables.nodes.len() < u32::MAX as usize,
            "Node table of render graph is full"
        );
        let handle = NodeHandle(tables.nodes.len() as u32);
        tables.nodes.push(node);
        if tables.links.len() < tables.nodes.len() {
            tables
                .links
                .resize_with(tables.nodes.len(), NodeLinks::default);
        }

        let links = &mut tables.links[handle.index()];
        assert!(
            links.is_empty(),
            "Links of {} were populated before the node was added",
            handle
        );
        let node = &tables.nodes[handle.index()];
        node.build_links(resources, links);

        #[cfg(feature = "logging")]
        log::trace!(
            "Added {} {:?} with {} inputs, {} outputs",
            handle,
            node.node_type(),
            links.inputs.len(),
            links.outputs.len()
        );

        tables.debug.record_node(handle);

        handle
    }

    ///Handle the next [add_node](Self::add_node) call will return, unless another thread is faster.
    pub fn next_node_handle(&self) -> NodeHandle {
        self.tracker.lock().guarded.next_node_handle()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.lock().guarded.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.tracker.lock().guarded.node_count()
    }

    ///Tracker the graph records against. Used to register and unregister resources.
    pub fn resources(&self) -> &ResourceStateTracker<GraphTables> {
        &self.tracker
    }

    ///Exclusive, lock free access to the recorded nodes. Taking `&mut self` ends the recording phase.
    pub fn tables(&mut self) -> &GraphTables {
        &self.tracker.get_mut().guarded
    }

    pub fn debug_group_begin(&self, name: &str, color: [f32; 4]) {
        self.tracker.lock().guarded.debug.begin(name, color);
    }

    pub fn debug_group_end(&self) {
        self.tracker.lock().guarded.debug.end();
    }

    ///Dotted path of the debug groups `handle` was added under. Empty if capture was disabled.
    pub fn full_debug_group(&self, handle: NodeHandle) -> String {
        self.tracker.lock().guarded.full_debug_group(handle)
    }

    pub fn debug_group_color(&self, handle: NodeHandle) -> Option<[f32; 4]> {
        self.tracker.lock().guarded.debug_group_color(handle)
    }

    pub fn set_debug_capture(&self, capture: bool) {
        self.tracker.lock().guarded.debug.set_enabled(capture);
    }

    pub fn debug_capture(&self) -> bool {
        self.tracker.lock().guarded.debug.is_enabled()
    }

    ///Drops all nodes and links. Resources and interned debug groups are kept.
    pub fn reset(&mut self) {
        self.tracker.get_mut().guarded.reset();
    }
}
