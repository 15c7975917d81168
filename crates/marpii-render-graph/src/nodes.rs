//! # Nodes
//!
//! Every command the graph can record is a variant of [Node]. A variant carries the create info of its command and
//! knows which of the referenced resources are read and which are written. That knowledge lives in each create
//! info's `build_links` and is dispatched by [Node::build_links].
//!
//! Bigger payloads are boxed to keep the node table compact.

use ash::vk;

use crate::{
    ResourceTable,
    graph::links::{LayerRange, Link, NodeLinks},
};

mod compute;
mod rendering;
mod sync;
mod transfer;

pub use compute::{DispatchIndirectInfo, DispatchInfo};
pub use rendering::{
    BeginRenderingInfo, ClearAttachmentsInfo, DrawIndexedIndirectInfo, DrawIndexedInfo,
    DrawIndirectInfo, DrawInfo, EndRenderingInfo, RenderingAttachment,
};
pub use sync::{BeginQueryInfo, EndQueryInfo, ResetQueryPoolInfo, SynchronizationInfo};
pub use transfer::{
    BlitImageInfo, ClearColorImageInfo, ClearDepthStencilImageInfo, CopyBufferInfo,
    CopyBufferToImageInfo, CopyImageInfo, CopyImageToBufferInfo, FillBufferInfo,
    UpdateBufferInfo, UpdateMipmapsInfo,
};

///Tag of a [Node].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeType {
    BeginRendering,
    EndRendering,
    ClearColorImage,
    ClearDepthStencilImage,
    ClearAttachments,
    FillBuffer,
    UpdateBuffer,
    CopyBuffer,
    CopyBufferToImage,
    CopyImageToBuffer,
    CopyImage,
    BlitImage,
    UpdateMipmaps,
    Dispatch,
    DispatchIndirect,
    Draw,
    DrawIndexed,
    DrawIndirect,
    DrawIndexedIndirect,
    ResetQueryPool,
    BeginQuery,
    EndQuery,
    Synchronization,
}

impl NodeType {
    ///True for commands that may only be recorded inside a rendering scope, including the scope markers
    /// themselves. The scheduler never moves those across a scope boundary.
    pub fn is_rendering(&self) -> bool {
        match self {
            NodeType::BeginRendering
            | NodeType::EndRendering
            | NodeType::ClearAttachments
            | NodeType::Draw
            | NodeType::DrawIndexed
            | NodeType::DrawIndirect
            | NodeType::DrawIndexedIndirect
            | NodeType::BeginQuery
            | NodeType::EndQuery => true,
            NodeType::ClearColorImage
            | NodeType::ClearDepthStencilImage
            | NodeType::FillBuffer
            | NodeType::UpdateBuffer
            | NodeType::CopyBuffer
            | NodeType::CopyBufferToImage
            | NodeType::CopyImageToBuffer
            | NodeType::CopyImage
            | NodeType::BlitImage
            | NodeType::UpdateMipmaps
            | NodeType::Dispatch
            | NodeType::DispatchIndirect
            | NodeType::ResetQueryPool
            | NodeType::Synchronization => false,
        }
    }

    ///Pipeline stages the command executes in. Used by the command builder as destination stage of the barriers
    /// in front of the node.
    pub fn pipeline_stage(&self) -> vk::PipelineStageFlags2 {
        match self {
            NodeType::BeginRendering | NodeType::EndRendering | NodeType::ClearAttachments => {
                vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS
            }
            NodeType::Draw | NodeType::DrawIndexed => vk::PipelineStageFlags2::ALL_GRAPHICS,
            NodeType::DrawIndirect | NodeType::DrawIndexedIndirect => {
                vk::PipelineStageFlags2::ALL_GRAPHICS | vk::PipelineStageFlags2::DRAW_INDIRECT
            }
            NodeType::ClearColorImage | NodeType::ClearDepthStencilImage | NodeType::FillBuffer => {
                vk::PipelineStageFlags2::CLEAR
            }
            NodeType::CopyBuffer
            | NodeType::CopyBufferToImage
            | NodeType::CopyImageToBuffer
            | NodeType::CopyImage => vk::PipelineStageFlags2::COPY,
            NodeType::BlitImage | NodeType::UpdateMipmaps => vk::PipelineStageFlags2::BLIT,
            NodeType::UpdateBuffer | NodeType::ResetQueryPool => {
                vk::PipelineStageFlags2::TRANSFER
            }
            NodeType::Dispatch => vk::PipelineStageFlags2::COMPUTE_SHADER,
            NodeType::DispatchIndirect => {
                vk::PipelineStageFlags2::COMPUTE_SHADER | vk::PipelineStageFlags2::DRAW_INDIRECT
            }
            NodeType::BeginQuery | NodeType::EndQuery => vk::PipelineStageFlags2::ALL_COMMANDS,
            NodeType::Synchronization => vk::PipelineStageFlags2::NONE,
        }
    }
}

///Single recorded command.
#[derive(Clone)]
pub enum Node {
    BeginRendering(Box<BeginRenderingInfo>),
    EndRendering(EndRenderingInfo),
    ClearColorImage(ClearColorImageInfo),
    ClearDepthStencilImage(ClearDepthStencilImageInfo),
    ClearAttachments(Box<ClearAttachmentsInfo>),
    FillBuffer(FillBufferInfo),
    UpdateBuffer(UpdateBufferInfo),
    CopyBuffer(CopyBufferInfo),
    CopyBufferToImage(CopyBufferToImageInfo),
    CopyImageToBuffer(CopyImageToBufferInfo),
    CopyImage(CopyImageInfo),
    BlitImage(BlitImageInfo),
    UpdateMipmaps(UpdateMipmapsInfo),
    Dispatch(DispatchInfo),
    DispatchIndirect(DispatchIndirectInfo),
    Draw(DrawInfo),
    DrawIndexed(DrawIndexedInfo),
    DrawIndirect(DrawIndirectInfo),
    DrawIndexedIndirect(DrawIndexedIndirectInfo),
    ResetQueryPool(ResetQueryPoolInfo),
    BeginQuery(BeginQueryInfo),
    EndQuery(EndQueryInfo),
    Synchronization(SynchronizationInfo),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::BeginRendering(_) => NodeType::BeginRendering,
            Node::EndRendering(_) => NodeType::EndRendering,
            Node::ClearColorImage(_) => NodeType::ClearColorImage,
            Node::ClearDepthStencilImage(_) => NodeType::ClearDepthStencilImage,
            Node::ClearAttachments(_) => NodeType::ClearAttachments,
            Node::FillBuffer(_) => NodeType::FillBuffer,
            Node::UpdateBuffer(_) => NodeType::UpdateBuffer,
            Node::CopyBuffer(_) => NodeType::CopyBuffer,
            Node::CopyBufferToImage(_) => NodeType::CopyBufferToImage,
            Node::CopyImageToBuffer(_) => NodeType::CopyImageToBuffer,
            Node::CopyImage(_) => NodeType::CopyImage,
            Node::BlitImage(_) => NodeType::BlitImage,
            Node::UpdateMipmaps(_) => NodeType::UpdateMipmaps,
            Node::Dispatch(_) => NodeType::Dispatch,
            Node::DispatchIndirect(_) => NodeType::DispatchIndirect,
            Node::Draw(_) => NodeType::Draw,
            Node::DrawIndexed(_) => NodeType::DrawIndexed,
            Node::DrawIndirect(_) => NodeType::DrawIndirect,
            Node::DrawIndexedIndirect(_) => NodeType::DrawIndexedIndirect,
            Node::ResetQueryPool(_) => NodeType::ResetQueryPool,
            Node::BeginQuery(_) => NodeType::BeginQuery,
            Node::EndQuery(_) => NodeType::EndQuery,
            Node::Synchronization(_) => NodeType::Synchronization,
        }
    }

    pub fn pipeline_stage(&self) -> vk::PipelineStageFlags2 {
        self.node_type().pipeline_stage()
    }

    ///Resolves the node's resources against `resources` and appends the resulting links.
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        match self {
            Node::BeginRendering(info) => info.build_links(resources, links),
            Node::ClearColorImage(info) => info.build_links(resources, links),
            Node::ClearDepthStencilImage(info) => info.build_links(resources, links),
            Node::FillBuffer(info) => info.build_links(resources, links),
            Node::UpdateBuffer(info) => info.build_links(resources, links),
            Node::CopyBuffer(info) => info.build_links(resources, links),
            Node::CopyBufferToImage(info) => info.build_links(resources, links),
            Node::CopyImageToBuffer(info) => info.build_links(resources, links),
            Node::CopyImage(info) => info.build_links(resources, links),
            Node::BlitImage(info) => info.build_links(resources, links),
            Node::UpdateMipmaps(info) => info.build_links(resources, links),
            Node::Dispatch(info) => info.build_links(resources, links),
            Node::DispatchIndirect(info) => info.build_links(resources, links),
            Node::Draw(info) => info.build_links(resources, links),
            Node::DrawIndexed(info) => info.build_links(resources, links),
            Node::DrawIndirect(info) => info.build_links(resources, links),
            Node::DrawIndexedIndirect(info) => info.build_links(resources, links),
            Node::Synchronization(info) => info.build_links(resources, links),
            //Work on the currently bound attachments or on query pools, which are not tracked.
            Node::EndRendering(_)
            | Node::ClearAttachments(_)
            | Node::ResetQueryPool(_)
            | Node::BeginQuery(_)
            | Node::EndQuery(_) => {}
        }
    }
}

macro_rules! impl_into_node {
    ($($info:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$info> for Node {
                fn from(info: $info) -> Self {
                    Node::$variant(info)
                }
            }
        )*
    };
}

macro_rules! impl_into_boxed_node {
    ($($info:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$info> for Node {
                fn from(info: $info) -> Self {
                    Node::$variant(Box::new(info))
                }
            }
        )*
    };
}

impl_into_boxed_node!(
    BeginRenderingInfo => BeginRendering,
    ClearAttachmentsInfo => ClearAttachments,
);

impl_into_node!(
    EndRenderingInfo => EndRendering,
    ClearColorImageInfo => ClearColorImage,
    ClearDepthStencilImageInfo => ClearDepthStencilImage,
    FillBufferInfo => FillBuffer,
    UpdateBufferInfo => UpdateBuffer,
    CopyBufferInfo => CopyBuffer,
    CopyBufferToImageInfo => CopyBufferToImage,
    CopyImageToBufferInfo => CopyImageToBuffer,
    CopyImageInfo => CopyImage,
    BlitImageInfo => BlitImage,
    UpdateMipmapsInfo => UpdateMipmaps,
    DispatchInfo => Dispatch,
    DispatchIndirectInfo => DispatchIndirect,
    DrawInfo => Draw,
    DrawIndexedInfo => DrawIndexed,
    DrawIndirectInfo => DrawIndirect,
    DrawIndexedIndirectInfo => DrawIndexedIndirect,
    ResetQueryPoolInfo => ResetQueryPool,
    BeginQueryInfo => BeginQuery,
    EndQueryInfo => EndQuery,
    SynchronizationInfo => Synchronization,
);

///Access masks that modify a resource. A link with any of those bits set is a write.
pub fn write_access_mask() -> vk::AccessFlags2 {
    vk::AccessFlags2::SHADER_WRITE
        | vk::AccessFlags2::SHADER_STORAGE_WRITE
        | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
        | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
        | vk::AccessFlags2::TRANSFER_WRITE
        | vk::AccessFlags2::HOST_WRITE
        | vk::AccessFlags2::MEMORY_WRITE
        | vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR
}

pub fn is_write_access(access: vk::AccessFlags2) -> bool {
    access.intersects(write_access_mask())
}

///Image used by a shader.
#[derive(Clone, Copy, Debug)]
pub struct ImageAccess {
    pub image: vk::Image,
    pub access: vk::AccessFlags2,
    pub aspect: vk::ImageAspectFlags,
    ///`None` means all layers.
    pub layers: Option<LayerRange>,
}

impl ImageAccess {
    ///Layout a shader needs for this access. Storage writes need `GENERAL`, everything else is sampled.
    pub fn image_layout(&self) -> vk::ImageLayout {
        if is_write_access(self.access) {
            vk::ImageLayout::GENERAL
        } else {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        }
    }
}

///Buffer used by a shader.
#[derive(Clone, Copy, Debug)]
pub struct BufferAccess {
    pub buffer: vk::Buffer,
    pub access: vk::AccessFlags2,
}

///All resources a pipeline (compute or graphics) accesses through its descriptors.
#[derive(Clone, Default, Debug)]
pub struct ResourceAccessInfo {
    pub images: Vec<ImageAccess>,
    pub buffers: Vec<BufferAccess>,
}

impl ResourceAccessInfo {
    pub fn with_image(
        mut self,
        image: vk::Image,
        access: vk::AccessFlags2,
        aspect: vk::ImageAspectFlags,
    ) -> Self {
        self.images.push(ImageAccess {
            image,
            access,
            aspect,
            layers: None,
        });
        self
    }

    pub fn with_buffer(mut self, buffer: vk::Buffer, access: vk::AccessFlags2) -> Self {
        self.buffers.push(BufferAccess { buffer, access });
        self
    }

    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        for image in &self.images {
            if is_write_access(image.access) {
                let resource = resources.write_image(image.image);
                links.outputs.push(
                    Link::image(resource, image.access, image.image_layout(), image.aspect)
                        .with_layers(image.layers),
                );
            } else {
                let resource = resources.read_image(image.image);
                links.inputs.push(
                    Link::image(resource, image.access, image.image_layout(), image.aspect)
                        .with_layers(image.layers),
                );
            }
        }

        for buffer in &self.buffers {
            if is_write_access(buffer.access) {
                let resource = resources.write_buffer(buffer.buffer);
                links.outputs.push(Link::buffer(resource, buffer.access));
            } else {
                let resource = resources.read_buffer(buffer.buffer);
                links.inputs.push(Link::buffer(resource, buffer.access));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use static_assertions::{assert_impl_all, const_assert};

    const_assert!(std::mem::size_of::<Node>() <= 128);

    #[test]
    fn impl_send_sync() {
        assert_impl_all!(Node: Send, Sync);
    }

    #[test]
    fn write_classification() {
        assert!(is_write_access(vk::AccessFlags2::SHADER_STORAGE_WRITE));
        assert!(is_write_access(
            vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE
        ));
        assert!(!is_write_access(vk::AccessFlags2::SHADER_SAMPLED_READ));
        assert!(!is_write_access(vk::AccessFlags2::NONE));
    }

    #[test]
    fn access_info_links() {
        let mut resources = ResourceTable::new();
        let sampled = vk::Image::from_raw(1);
        let storage = vk::Image::from_raw(2);
        let uniform = vk::Buffer::from_raw(3);
        let output = vk::Buffer::from_raw(4);
        let sampled_hdl = resources.register_image(
            sampled,
            crate::ResourceOwner::Application,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
        let storage_hdl = resources.register_image(
            storage,
            crate::ResourceOwner::Application,
            vk::ImageLayout::GENERAL,
        );
        resources.register_buffer(uniform);
        let output_hdl = resources.register_buffer(output);

        let info = ResourceAccessInfo::default()
            .with_image(
                sampled,
                vk::AccessFlags2::SHADER_SAMPLED_READ,
                vk::ImageAspectFlags::COLOR,
            )
            .with_image(
                storage,
                vk::AccessFlags2::SHADER_STORAGE_WRITE,
                vk::ImageAspectFlags::COLOR,
            )
            .with_buffer(uniform, vk::AccessFlags2::UNIFORM_READ)
            .with_buffer(output, vk::AccessFlags2::SHADER_STORAGE_WRITE);

        let mut links = NodeLinks::default();
        info.build_links(&mut resources, &mut links);

        assert_eq!(links.inputs.len(), 2);
        assert_eq!(links.outputs.len(), 2);
        assert_eq!(links.inputs[0].resource.handle, sampled_hdl);
        assert_eq!(
            links.inputs[0].image_layout,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
        assert_eq!(links.outputs[0].resource.handle, storage_hdl);
        assert_eq!(links.outputs[0].image_layout, vk::ImageLayout::GENERAL);
        assert_eq!(links.outputs[1].resource.handle, output_hdl);
        assert_eq!(links.outputs[1].image_layout, vk::ImageLayout::UNDEFINED);

        assert_eq!(resources.read(storage_hdl).stamp, 1);
        assert_eq!(resources.read(output_hdl).stamp, 1);
        assert_eq!(resources.read(sampled_hdl).stamp, 0);
    }

    #[test]
    fn rendering_classification() {
        assert!(NodeType::Draw.is_rendering());
        assert!(NodeType::ClearAttachments.is_rendering());
        assert!(NodeType::BeginRendering.is_rendering());
        assert!(!NodeType::Dispatch.is_rendering());
        assert!(!NodeType::CopyBuffer.is_rendering());
        assert!(!NodeType::ResetQueryPool.is_rendering());
    }
}
