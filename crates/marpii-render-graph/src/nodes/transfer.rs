use ash::vk;

use crate::{
    ResourceTable,
    graph::links::{LayerRange, Link, NodeLinks},
};

fn layers_of(subresource: &vk::ImageSubresourceLayers) -> Option<LayerRange> {
    Some(LayerRange {
        base: subresource.base_array_layer,
        count: subresource.layer_count,
    })
}

fn layers_of_range(range: &vk::ImageSubresourceRange) -> Option<LayerRange> {
    Some(LayerRange {
        base: range.base_array_layer,
        count: range.layer_count,
    })
}

///Reads `image` as transfer source.
fn read_src_image(
    resources: &ResourceTable,
    links: &mut NodeLinks,
    image: vk::Image,
    subresource: &vk::ImageSubresourceLayers,
) {
    let resource = resources.read_image(image);
    links.inputs.push(
        Link::image(
            resource,
            vk::AccessFlags2::TRANSFER_READ,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            subresource.aspect_mask,
        )
        .with_layers(layers_of(subresource)),
    );
}

///Writes `image` as transfer destination.
fn write_dst_image(
    resources: &mut ResourceTable,
    links: &mut NodeLinks,
    image: vk::Image,
    aspect: vk::ImageAspectFlags,
    layers: Option<LayerRange>,
) {
    let resource = resources.write_image(image);
    links.outputs.push(
        Link::image(
            resource,
            vk::AccessFlags2::TRANSFER_WRITE,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            aspect,
        )
        .with_layers(layers),
    );
}

fn read_src_buffer(resources: &ResourceTable, links: &mut NodeLinks, buffer: vk::Buffer) {
    let resource = resources.read_buffer(buffer);
    links
        .inputs
        .push(Link::buffer(resource, vk::AccessFlags2::TRANSFER_READ));
}

fn write_dst_buffer(resources: &mut ResourceTable, links: &mut NodeLinks, buffer: vk::Buffer) {
    let resource = resources.write_buffer(buffer);
    links
        .outputs
        .push(Link::buffer(resource, vk::AccessFlags2::TRANSFER_WRITE));
}

#[derive(Clone, Copy)]
pub struct ClearColorImageInfo {
    pub image: vk::Image,
    pub color: vk::ClearColorValue,
    pub range: vk::ImageSubresourceRange,
}

impl ClearColorImageInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        write_dst_image(
            resources,
            links,
            self.image,
            self.range.aspect_mask,
            layers_of_range(&self.range),
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClearDepthStencilImageInfo {
    pub image: vk::Image,
    pub value: vk::ClearDepthStencilValue,
    pub range: vk::ImageSubresourceRange,
}

impl ClearDepthStencilImageInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        write_dst_image(
            resources,
            links,
            self.image,
            self.range.aspect_mask,
            layers_of_range(&self.range),
        );
    }
}

///Fills `size` bytes starting at `offset` with the repeated `data` word.
#[derive(Clone, Copy, Debug)]
pub struct FillBufferInfo {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub data: u32,
}

impl FillBufferInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        write_dst_buffer(resources, links, self.buffer);
    }
}

///Inline buffer update. The data is stored out of line.
#[derive(Clone, Debug)]
pub struct UpdateBufferInfo {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub data: Box<[u8]>,
}

impl UpdateBufferInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        write_dst_buffer(resources, links, self.buffer);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CopyBufferInfo {
    pub src_buffer: vk::Buffer,
    pub dst_buffer: vk::Buffer,
    pub region: vk::BufferCopy,
}

impl CopyBufferInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_src_buffer(resources, links, self.src_buffer);
        write_dst_buffer(resources, links, self.dst_buffer);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CopyBufferToImageInfo {
    pub src_buffer: vk::Buffer,
    pub dst_image: vk::Image,
    pub region: vk::BufferImageCopy,
}

impl CopyBufferToImageInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_src_buffer(resources, links, self.src_buffer);
        write_dst_image(
            resources,
            links,
            self.dst_image,
            self.region.image_subresource.aspect_mask,
            layers_of(&self.region.image_subresource),
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CopyImageToBufferInfo {
    pub src_image: vk::Image,
    pub dst_buffer: vk::Buffer,
    pub region: vk::BufferImageCopy,
}

impl CopyImageToBufferInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_src_image(
            resources,
            links,
            self.src_image,
            &self.region.image_subresource,
        );
        write_dst_buffer(resources, links, self.dst_buffer);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CopyImageInfo {
    pub src_image: vk::Image,
    pub dst_image: vk::Image,
    pub region: vk::ImageCopy,
}

impl CopyImageInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_src_image(resources, links, self.src_image, &self.region.src_subresource);
        write_dst_image(
            resources,
            links,
            self.dst_image,
            self.region.dst_subresource.aspect_mask,
            layers_of(&self.region.dst_subresource),
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlitImageInfo {
    pub src_image: vk::Image,
    pub dst_image: vk::Image,
    pub region: vk::ImageBlit,
    pub filter: vk::Filter,
}

impl BlitImageInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        read_src_image(resources, links, self.src_image, &self.region.src_subresource);
        write_dst_image(
            resources,
            links,
            self.dst_image,
            self.region.dst_subresource.aspect_mask,
            layers_of(&self.region.dst_subresource),
        );
    }
}

///Regenerates mip levels `1..mip_levels` from level 0 by successive blits.
///
/// The image is read and written within one command. It is linked as a single write, the command builder moves
/// the individual levels between `TRANSFER_SRC_OPTIMAL` and `TRANSFER_DST_OPTIMAL` while recording.
#[derive(Clone, Copy, Debug)]
pub struct UpdateMipmapsInfo {
    pub image: vk::Image,
    pub l0_extent: vk::Extent3D,
    pub mip_levels: u32,
    pub layer_count: u32,
    pub aspect: vk::ImageAspectFlags,
    pub filter: vk::Filter,
}

impl UpdateMipmapsInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        let resource = resources.write_image(self.image);
        links.outputs.push(
            Link::image(
                resource,
                vk::AccessFlags2::TRANSFER_READ | vk::AccessFlags2::TRANSFER_WRITE,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                self.aspect,
            )
            .with_layers(Some(LayerRange {
                base: 0,
                count: self.layer_count,
            })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceOwner;
    use ash::vk::Handle;

    fn color_layers() -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    #[test]
    fn copy_image_to_buffer() {
        let mut resources = ResourceTable::new();
        let image = vk::Image::from_raw(1);
        let buffer = vk::Buffer::from_raw(2);
        let img = resources.register_image(
            image,
            ResourceOwner::Application,
            vk::ImageLayout::UNDEFINED,
        );
        let buf = resources.register_buffer(buffer);

        let info = CopyImageToBufferInfo {
            src_image: image,
            dst_buffer: buffer,
            region: vk::BufferImageCopy {
                image_subresource: color_layers(),
                ..Default::default()
            },
        };
        let mut links = NodeLinks::default();
        info.build_links(&mut resources, &mut links);

        assert_eq!(links.inputs.len(), 1);
        assert_eq!(links.outputs.len(), 1);
        assert_eq!(links.inputs[0].resource.handle, img);
        assert_eq!(
            links.inputs[0].image_layout,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL
        );
        assert_eq!(
            links.inputs[0].layers,
            Some(LayerRange { base: 0, count: 1 })
        );
        assert_eq!(links.outputs[0].resource.handle, buf);
        assert_eq!(links.outputs[0].access, vk::AccessFlags2::TRANSFER_WRITE);

        assert_eq!(resources.read(img).stamp, 0);
        assert_eq!(resources.read(buf).stamp, 1);
    }

    #[test]
    fn copy_within_one_image() {
        let mut resources = ResourceTable::new();
        let image = vk::Image::from_raw(1);
        let img = resources.register_image(
            image,
            ResourceOwner::Application,
            vk::ImageLayout::UNDEFINED,
        );

        let info = CopyImageInfo {
            src_image: image,
            dst_image: image,
            region: vk::ImageCopy {
                src_subresource: color_layers(),
                dst_subresource: color_layers(),
                ..Default::default()
            },
        };
        let mut links = NodeLinks::default();
        info.build_links(&mut resources, &mut links);

        //read sees the version the write is based on
        assert_eq!(links.inputs[0].resource.stamp, 0);
        assert_eq!(links.outputs[0].resource.stamp, 0);
        assert_eq!(resources.read(img).stamp, 1);
    }

    #[test]
    fn fill_and_update_write() {
        let mut resources = ResourceTable::new();
        let buffer = vk::Buffer::from_raw(5);
        let buf = resources.register_buffer(buffer);

        let mut links = NodeLinks::default();
        FillBufferInfo {
            buffer,
            offset: 0,
            size: vk::WHOLE_SIZE,
            data: 0,
        }
        .build_links(&mut resources, &mut links);
        UpdateBufferInfo {
            buffer,
            offset: 16,
            data: vec![1u8, 2, 3, 4].into_boxed_slice(),
        }
        .build_links(&mut resources, &mut links);

        assert!(links.inputs.is_empty());
        assert_eq!(links.outputs[0].resource.stamp, 0);
        assert_eq!(links.outputs[1].resource.stamp, 1);
        assert_eq!(resources.read(buf).stamp, 2);
    }
}
