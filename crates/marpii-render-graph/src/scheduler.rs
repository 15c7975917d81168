//! # Scheduler
//!
//! Turns the insertion order of a [RenderGraph](crate::RenderGraph) into a submission order. The scheduler only
//! reads the graph's [GraphTables], see [RenderGraph::tables](crate::RenderGraph::tables).
//!
//! Insertion order is already a valid order, since every node captured its resource versions after all earlier
//! nodes advanced them. On top of that the scheduler moves non-rendering work (copies, clears, dispatches ...) that
//! was recorded at the start or the end of a rendering scope out of that scope. Rendering nodes never change their
//! relative order.
//!
//! The caller must guarantee that such a non-rendering node does not depend on the rendering nodes of the scope
//! it was recorded in. This is not checked.

use crate::{GraphTables, NodeHandle, NodeType, ResourceHandle, ScheduleError, error::fatal};

///Computes submission orders. Keeps its result buffer between frames.
#[derive(Default)]
pub struct Scheduler {
    result: Vec<NodeHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    ///Submission order of all nodes in `graph`.
    ///
    /// Panics if the rendering scopes of `graph` are malformed, see [validate_rendering_scopes](Self::validate_rendering_scopes).
    pub fn select_nodes(&mut self, graph: &GraphTables) -> &[NodeHandle] {
        self.select_all_nodes(graph);
        self.reorder_nodes(graph);
        &self.result
    }

    ///Nodes needed to update `image`. Currently the whole graph.
    pub fn select_nodes_for_image(
        &mut self,
        graph: &GraphTables,
        _image: ResourceHandle,
    ) -> &[NodeHandle] {
        self.select_nodes(graph)
    }

    ///Nodes needed to update `buffer`. Currently the whole graph.
    pub fn select_nodes_for_buffer(
        &mut self,
        graph: &GraphTables,
        _buffer: ResourceHandle,
    ) -> &[NodeHandle] {
        self.select_nodes(graph)
    }

    ///Checks that every `BeginRendering` is followed by its `EndRendering` before the next scope starts.
    pub fn validate_rendering_scopes(graph: &GraphTables) -> Result<(), ScheduleError> {
        let order = graph.nodes().map(|(handle, _)| handle).collect::<Vec<_>>();
        let mut start = 0;
        while let Some((_begin, end)) = find_rendering_scope(graph, &order, start)? {
            start = end + 1;
        }
        Ok(())
    }

    fn select_all_nodes(&mut self, graph: &GraphTables) {
        self.result.clear();
        self.result.extend(graph.nodes().map(|(handle, _)| handle));
    }

    fn reorder_nodes(&mut self, graph: &GraphTables) {
        move_transfer_and_dispatch_outside_rendering_scope(graph, &mut self.result);
    }
}

fn node_type(graph: &GraphTables, handle: NodeHandle) -> NodeType {
    graph.node(handle).node_type()
}

///Finds the first rendering scope in `order[start..]`. Returns the positions of its `BeginRendering` and
/// `EndRendering` nodes.
fn find_rendering_scope(
    graph: &GraphTables,
    order: &[NodeHandle],
    start: usize,
) -> Result<Option<(usize, usize)>, ScheduleError> {
    let mut begin: Option<usize> = None;
    for (pos, handle) in order.iter().enumerate().skip(start) {
        match node_type(graph, *handle) {
            NodeType::BeginRendering => {
                if let Some(outer) = begin {
                    return Err(ScheduleError::NestedBeginRendering {
                        outer: order[outer],
                        inner: *handle,
                    });
                }
                begin = Some(pos);
            }
            NodeType::EndRendering => {
                return match begin {
                    Some(begin) => Ok(Some((begin, pos))),
                    None => Err(ScheduleError::StrayEndRendering(*handle)),
                };
            }
            _ => {}
        }
    }

    match begin {
        Some(begin) => Err(ScheduleError::UnmatchedBeginRendering(order[begin])),
        None => Ok(None),
    }
}

///Moves leading non-rendering nodes in front of `BeginRendering` and trailing ones behind `EndRendering`.
fn move_transfer_and_dispatch_outside_rendering_scope(
    graph: &GraphTables,
    order: &mut [NodeHandle],
) {
    let mut start = 0;
    loop {
        let (mut begin, mut end) = match find_rendering_scope(graph, order, start) {
            Ok(Some(scope)) => scope,
            Ok(None) => break,
            Err(err) => fatal(err),
        };

        //trailing nodes, walking back from EndRendering
        let mut pos = end - 1;
        while pos > begin && !node_type(graph, order[pos]).is_rendering() {
            #[cfg(feature = "logging")]
            log::trace!("Moving {} behind end of rendering scope", order[pos]);

            order.swap(pos, end);
            end = pos;
            pos -= 1;
        }

        //leading nodes, walking forward from BeginRendering
        let mut pos = begin + 1;
        while pos < end && !node_type(graph, order[pos]).is_rendering() {
            #[cfg(feature = "logging")]
            log::trace!("Moving {} in front of rendering scope", order[pos]);

            order.swap(pos, begin);
            begin = pos;
            pos += 1;
        }

        start = end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BeginRenderingInfo, CopyBufferInfo, DispatchInfo, DrawInfo, EndRenderingInfo,
        FillBufferInfo, RenderGraph, ResourceAccessInfo,
    };
    use ash::vk::{self, Handle};
    use smallvec::SmallVec;

    const BUFFER_A: u64 = 1;
    const BUFFER_B: u64 = 2;

    fn graph() -> RenderGraph {
        let graph = RenderGraph::new();
        graph.resources().register_buffer(vk::Buffer::from_raw(BUFFER_A));
        graph.resources().register_buffer(vk::Buffer::from_raw(BUFFER_B));
        graph
    }

    fn begin(graph: &RenderGraph) -> NodeHandle {
        graph.add_node(BeginRenderingInfo {
            render_area: vk::Rect2D::default(),
            layer_count: 1,
            color_attachments: SmallVec::new(),
            depth_attachment: None,
            stencil_attachment: None,
        })
    }

    fn end(graph: &RenderGraph) -> NodeHandle {
        graph.add_node(EndRenderingInfo)
    }

    fn draw(graph: &RenderGraph) -> NodeHandle {
        graph.add_node(DrawInfo {
            pipeline: vk::Pipeline::null(),
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
            resources: ResourceAccessInfo::default(),
        })
    }

    fn dispatch(graph: &RenderGraph) -> NodeHandle {
        graph.add_node(DispatchInfo {
            pipeline: vk::Pipeline::null(),
            group_count: [8, 8, 1],
            resources: ResourceAccessInfo::default().with_buffer(
                vk::Buffer::from_raw(BUFFER_A),
                vk::AccessFlags2::SHADER_STORAGE_WRITE,
            ),
        })
    }

    fn copy(graph: &RenderGraph) -> NodeHandle {
        graph.add_node(CopyBufferInfo {
            src_buffer: vk::Buffer::from_raw(BUFFER_A),
            dst_buffer: vk::Buffer::from_raw(BUFFER_B),
            region: vk::BufferCopy::default(),
        })
    }

    fn fill(graph: &RenderGraph) -> NodeHandle {
        graph.add_node(FillBufferInfo {
            buffer: vk::Buffer::from_raw(BUFFER_B),
            offset: 0,
            size: vk::WHOLE_SIZE,
            data: 0,
        })
    }

    #[test]
    fn insertion_order_without_scopes() {
        let mut graph = graph();
        let expected = vec![
            fill(&graph),
            dispatch(&graph),
            copy(&graph),
            draw(&graph),
            fill(&graph),
        ];

        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.select_nodes(graph.tables()), expected.as_slice());
    }

    #[test]
    fn empty_graph() {
        let mut graph = graph();
        let mut scheduler = Scheduler::new();
        assert!(scheduler.select_nodes(graph.tables()).is_empty());
    }

    #[test]
    fn hoist_out_of_scope() {
        let mut graph = graph();
        let copy1 = copy(&graph);
        let begin = begin(&graph);
        let dispatch = dispatch(&graph);
        let draw1 = draw(&graph);
        let copy2 = copy(&graph);
        let end = end(&graph);
        let draw2 = draw(&graph);

        let mut scheduler = Scheduler::new();
        assert_eq!(
            scheduler.select_nodes(graph.tables()),
            &[copy1, dispatch, begin, draw1, end, copy2, draw2]
        );
    }

    #[test]
    fn hoisted_nodes_keep_their_order() {
        let mut graph = graph();
        let begin = begin(&graph);
        let lead1 = fill(&graph);
        let lead2 = dispatch(&graph);
        let draw1 = draw(&graph);
        let draw2 = draw(&graph);
        let trail1 = copy(&graph);
        let trail2 = fill(&graph);
        let end = end(&graph);

        let mut scheduler = Scheduler::new();
        assert_eq!(
            scheduler.select_nodes(graph.tables()),
            &[lead1, lead2, begin, draw1, draw2, end, trail1, trail2]
        );
    }

    #[test]
    fn interior_nodes_are_not_moved() {
        let mut graph = graph();
        let begin = begin(&graph);
        let draw1 = draw(&graph);
        let inner = dispatch(&graph);
        let draw2 = draw(&graph);
        let end = end(&graph);

        let mut scheduler = Scheduler::new();
        assert_eq!(
            scheduler.select_nodes(graph.tables()),
            &[begin, draw1, inner, draw2, end]
        );
    }

    #[test]
    fn scope_without_rendering_nodes() {
        let mut graph = graph();
        let begin = begin(&graph);
        let a = copy(&graph);
        let b = fill(&graph);
        let end = end(&graph);

        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.select_nodes(graph.tables()), &[begin, end, a, b]);
    }

    #[test]
    fn multiple_scopes() {
        let mut graph = graph();
        let begin1 = begin(&graph);
        let draw1 = draw(&graph);
        let between = copy(&graph);
        let end1 = end(&graph);
        let begin2 = begin(&graph);
        let lead = dispatch(&graph);
        let draw2 = draw(&graph);
        let end2 = end(&graph);

        let mut scheduler = Scheduler::new();
        assert_eq!(
            scheduler.select_nodes(graph.tables()),
            &[begin1, draw1, end1, between, lead, begin2, draw2, end2]
        );
    }

    #[test]
    fn resource_scoped_selection_matches_full_selection() {
        let mut graph = graph();
        begin(&graph);
        copy(&graph);
        draw(&graph);
        end(&graph);

        let handle = graph
            .resources()
            .lock()
            .buffer_handle(vk::Buffer::from_raw(BUFFER_A))
            .unwrap();

        let mut scheduler = Scheduler::new();
        let full = scheduler.select_nodes(graph.tables()).to_vec();
        assert_eq!(scheduler.select_nodes_for_buffer(graph.tables(), handle), full.as_slice());
        assert_eq!(scheduler.select_nodes_for_image(graph.tables(), handle), full.as_slice());
    }

    #[test]
    fn scheduler_reuse_across_frames() {
        let mut graph = graph();
        let mut scheduler = Scheduler::new();
        copy(&graph);
        copy(&graph);
        assert_eq!(scheduler.select_nodes(graph.tables()).len(), 2);

        graph.reset();
        let only = fill(&graph);
        assert_eq!(scheduler.select_nodes(graph.tables()), &[only]);
    }

    #[test]
    fn validation() {
        let mut graph = graph();
        begin(&graph);
        draw(&graph);
        end(&graph);
        assert_eq!(Scheduler::validate_rendering_scopes(graph.tables()), Ok(()));

        let unmatched = begin(&graph);
        draw(&graph);
        assert_eq!(
            Scheduler::validate_rendering_scopes(graph.tables()),
            Err(ScheduleError::UnmatchedBeginRendering(unmatched))
        );

        let nested = begin(&graph);
        assert_eq!(
            Scheduler::validate_rendering_scopes(graph.tables()),
            Err(ScheduleError::NestedBeginRendering {
                outer: unmatched,
                inner: nested
            })
        );

        graph.reset();
        let stray = end(&graph);
        assert_eq!(
            Scheduler::validate_rendering_scopes(graph.tables()),
            Err(ScheduleError::StrayEndRendering(stray))
        );
    }

    #[test]
    #[should_panic]
    fn unmatched_begin_panics() {
        let mut graph = graph();
        begin(&graph);
        draw(&graph);
        Scheduler::new().select_nodes(graph.tables());
    }
}
