use ash::vk;

use crate::{
    ResourceTable,
    graph::links::{Link, NodeLinks},
};

#[derive(Clone, Copy, Debug)]
pub struct ResetQueryPoolInfo {
    pub pool: vk::QueryPool,
    pub first_query: u32,
    pub query_count: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct BeginQueryInfo {
    pub pool: vk::QueryPool,
    pub query: u32,
    pub flags: vk::QueryControlFlags,
}

#[derive(Clone, Copy, Debug)]
pub struct EndQueryInfo {
    pub pool: vk::QueryPool,
    pub query: u32,
}

///Moves `image` into `layout` without any other work. Used to hand swapchain images over to presentation.
#[derive(Clone, Copy, Debug)]
pub struct SynchronizationInfo {
    pub image: vk::Image,
    pub layout: vk::ImageLayout,
    pub aspect: vk::ImageAspectFlags,
}

impl SynchronizationInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        //a layout transition modifies the image
        let resource = resources.write_image(self.image);
        links.outputs.push(Link::image(
            resource,
            vk::AccessFlags2::NONE,
            self.layout,
            self.aspect,
        ));
    }
}
