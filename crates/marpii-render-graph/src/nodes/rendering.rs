use ash::vk;
use smallvec::SmallVec;

use super::ResourceAccessInfo;
use crate::{
    ResourceTable,
    graph::links::{LayerRange, Link, NodeLinks},
};

///Single attachment of a dynamic rendering scope.
#[derive(Clone, Copy)]
pub struct RenderingAttachment {
    pub image: vk::Image,
    pub layout: vk::ImageLayout,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub clear_value: vk::ClearValue,
}

impl RenderingAttachment {
    fn access(&self, read: vk::AccessFlags2, write: vk::AccessFlags2) -> vk::AccessFlags2 {
        if self.load_op == vk::AttachmentLoadOp::LOAD {
            read | write
        } else {
            write
        }
    }
}

///Starts a rendering scope. All attachments are written by the scope.
#[derive(Clone)]
pub struct BeginRenderingInfo {
    pub render_area: vk::Rect2D,
    pub layer_count: u32,
    pub color_attachments: SmallVec<[RenderingAttachment; 4]>,
    pub depth_attachment: Option<RenderingAttachment>,
    pub stencil_attachment: Option<RenderingAttachment>,
}

impl BeginRenderingInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        let layers = Some(LayerRange {
            base: 0,
            count: self.layer_count,
        });

        for attachment in &self.color_attachments {
            let resource = resources.write_image(attachment.image);
            links.outputs.push(
                Link::image(
                    resource,
                    attachment.access(
                        vk::AccessFlags2::COLOR_ATTACHMENT_READ,
                        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                    ),
                    attachment.layout,
                    vk::ImageAspectFlags::COLOR,
                )
                .with_layers(layers),
            );
        }

        //A combined depth/stencil image is used by both attachments but only linked (and advanced) once.
        let shared_depth_stencil = match (&self.depth_attachment, &self.stencil_attachment) {
            (Some(depth), Some(stencil)) => depth.image == stencil.image,
            _ => false,
        };

        if let Some(depth) = &self.depth_attachment {
            let aspect = if shared_depth_stencil {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            };
            let resource = resources.write_image(depth.image);
            links.outputs.push(
                Link::image(
                    resource,
                    depth.access(
                        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
                        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    ),
                    depth.layout,
                    aspect,
                )
                .with_layers(layers),
            );
        }

        if let Some(stencil) = &self.stencil_attachment {
            if !shared_depth_stencil {
                let resource = resources.write_image(stencil.image);
                links.outputs.push(
                    Link::image(
                        resource,
                        stencil.access(
                            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
                            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                        ),
                        stencil.layout,
                        vk::ImageAspectFlags::STENCIL,
                    )
                    .with_layers(layers),
                );
            }
        }
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct EndRenderingInfo;

///Clears regions of the attachments bound by the enclosing rendering scope.
#[derive(Clone, Default)]
pub struct ClearAttachmentsInfo {
    pub attachments: SmallVec<[vk::ClearAttachment; 4]>,
    pub rects: SmallVec<[vk::ClearRect; 1]>,
}

fn read_indirect_buffer(resources: &ResourceTable, links: &mut NodeLinks, buffer: vk::Buffer) {
    let resource = resources.read_buffer(buffer);
    links.inputs.push(Link::buffer(
        resource,
        vk::AccessFlags2::INDIRECT_COMMAND_READ,
    ));
}

fn read_index_buffer(resources: &ResourceTable, links: &mut NodeLinks, buffer: vk::Buffer) {
    let resource = resources.read_buffer(buffer);
    links
        .inputs
        .push(Link::buffer(resource, vk::AccessFlags2::INDEX_READ));
}

#[derive(Clone, Debug)]
pub struct DrawInfo {
    pub pipeline: vk::Pipeline,
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
    pub resources: ResourceAccessInfo,
}

impl DrawInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        self.resources.build_links(resources, links);
    }
}

#[derive(Clone, Debug)]
pub struct DrawIndexedInfo {
    pub pipeline: vk::Pipeline,
    pub index_buffer: vk::Buffer,
    pub index_type: vk::IndexType,
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
    pub resources: ResourceAccessInfo,
}

impl DrawIndexedInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_index_buffer(resources, links, self.index_buffer);
        self.resources.build_links(resources, links);
    }
}

#[derive(Clone, Debug)]
pub struct DrawIndirectInfo {
    pub pipeline: vk::Pipeline,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub draw_count: u32,
    pub stride: u32,
    pub resources: ResourceAccessInfo,
}

impl DrawIndirectInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_indirect_buffer(resources, links, self.buffer);
        self.resources.build_links(resources, links);
    }
}

#[derive(Clone, Debug)]
pub struct DrawIndexedIndirectInfo {
    pub pipeline: vk::Pipeline,
    pub index_buffer: vk::Buffer,
    pub index_type: vk::IndexType,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub draw_count: u32,
    pub stride: u32,
    pub resources: ResourceAccessInfo,
}

impl DrawIndexedIndirectInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_index_buffer(resources, links, self.index_buffer);
        read_indirect_buffer(resources, links, self.buffer);
        self.resources.build_links(resources, links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceOwner;
    use ash::vk::Handle;
    use smallvec::smallvec;

    fn attachment(image: vk::Image, layout: vk::ImageLayout) -> RenderingAttachment {
        RenderingAttachment {
            image,
            layout,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            clear_value: vk::ClearValue::default(),
        }
    }

    #[test]
    fn begin_rendering_writes_attachments() {
        let mut resources = ResourceTable::new();
        let color = vk::Image::from_raw(1);
        let depth = vk::Image::from_raw(2);
        let color_hdl = resources.register_image(
            color,
            ResourceOwner::Application,
            vk::ImageLayout::UNDEFINED,
        );
        let depth_hdl = resources.register_image(
            depth,
            ResourceOwner::Application,
            vk::ImageLayout::UNDEFINED,
        );

        let mut load = attachment(color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        load.load_op = vk::AttachmentLoadOp::LOAD;

        let info = BeginRenderingInfo {
            render_area: vk::Rect2D::default(),
            layer_count: 1,
            color_attachments: smallvec![load],
            depth_attachment: Some(attachment(
                depth,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            )),
            stencil_attachment: Some(attachment(
                depth,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            )),
        };
        let mut links = NodeLinks::default();
        info.build_links(&mut resources, &mut links);

        assert!(links.inputs.is_empty());
        assert_eq!(links.outputs.len(), 2);
        assert_eq!(
            links.outputs[0].access,
            vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
        );
        assert_eq!(
            links.outputs[1].aspect,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(
            links.outputs[1].access,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
        );
        assert_eq!(resources.read(color_hdl).stamp, 1);
        //shared depth/stencil is only advanced once
        assert_eq!(resources.read(depth_hdl).stamp, 1);
    }

    #[test]
    fn indexed_indirect_reads() {
        let mut resources = ResourceTable::new();
        let index = vk::Buffer::from_raw(1);
        let indirect = vk::Buffer::from_raw(2);
        resources.register_buffer(index);
        resources.register_buffer(indirect);

        let info = DrawIndexedIndirectInfo {
            pipeline: vk::Pipeline::null(),
            index_buffer: index,
            index_type: vk::IndexType::UINT32,
            buffer: indirect,
            offset: 0,
            draw_count: 1,
            stride: 20,
            resources: ResourceAccessInfo::default(),
        };
        let mut links = NodeLinks::default();
        info.build_links(&mut resources, &mut links);

        assert_eq!(links.inputs.len(), 2);
        assert!(links.outputs.is_empty());
        assert_eq!(links.inputs[0].access, vk::AccessFlags2::INDEX_READ);
        assert_eq!(
            links.inputs[1].access,
            vk::AccessFlags2::INDIRECT_COMMAND_READ
        );
    }
}
