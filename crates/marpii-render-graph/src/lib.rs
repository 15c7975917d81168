//! # Render graph
//!
//! Records GPU commands as [Node]s of a [RenderGraph]. Each node links to the versions ("stamps") of the buffers and
//! images it reads and writes. Those versions are handed out by the graph's [ResourceStateTracker], whose single
//! lock also guards the node tables, so any number of threads can record into one graph. The [Scheduler] turns a
//! recorded graph into a submission order.
//!
//! A frame usually looks like this:
//!
//! 1. register buffers, images and swapchain images at the graph's tracker,
//! 2. add nodes to the graph, optionally grouped by debug groups,
//! 3. let the scheduler select the nodes, build and submit the command buffer,
//! 4. reset the graph.
//!
//! Command buffer building, submission, and memory management are not part of this crate. The graph only deals with
//! native `ash` handles.

mod error;
pub use error::{ResourceError, ScheduleError};

mod resources;
pub use resources::{
    ResourceStateTracker, ResourceTable, TrackedState,
    state::{
        BarrierState, NativeResource, Resource, ResourceHandle, ResourceKind, ResourceOwner,
        ResourceWithStamp,
    },
};

mod graph;
pub use graph::{
    GraphTables, NodeHandle, RenderGraph,
    debug::{DebugContext, DebugGroup, DebugGroupId},
    links::{LayerRange, Link, NodeLinks},
};

///All recordable commands.
pub mod nodes;
pub use nodes::{
    BeginQueryInfo, BeginRenderingInfo, BlitImageInfo, BufferAccess, ClearAttachmentsInfo,
    ClearColorImageInfo, ClearDepthStencilImageInfo, CopyBufferInfo, CopyBufferToImageInfo,
    CopyImageInfo, CopyImageToBufferInfo, DispatchIndirectInfo, DispatchInfo,
    DrawIndexedIndirectInfo, DrawIndexedInfo, DrawIndirectInfo, DrawInfo, EndQueryInfo,
    EndRenderingInfo, FillBufferInfo, ImageAccess, Node, NodeType, RenderingAttachment,
    ResetQueryPoolInfo, ResourceAccessInfo, SynchronizationInfo, UpdateBufferInfo,
    UpdateMipmapsInfo, is_write_access, write_access_mask,
};

mod scheduler;
pub use scheduler::Scheduler;

//Re-export of the vulkan bindings used in the public interface.
pub use ash;
