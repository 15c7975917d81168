use ash::vk;

use super::ResourceAccessInfo;
use crate::{
    ResourceTable,
    graph::links::{Link, NodeLinks},
};

#[derive(Clone, Debug)]
pub struct DispatchInfo {
    pub pipeline: vk::Pipeline,
    pub group_count: [u32; 3],
    pub resources: ResourceAccessInfo,
}

impl DispatchInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        self.resources.build_links(resources, links);
    }
}

///Dispatch whose group count is read from `buffer` at `offset`.
#[derive(Clone, Debug)]
pub struct DispatchIndirectInfo {
    pub pipeline: vk::Pipeline,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub resources: ResourceAccessInfo,
}

impl DispatchIndirectInfo {
    pub(crate) fn build_links(&self, resources: &mut ResourceTable, links: &mut NodeLinks) {
        let resource = resources.read_buffer(self.buffer);
        links.inputs.push(Link::buffer(
            resource,
            vk::AccessFlags2::INDIRECT_COMMAND_READ,
        ));
        self.resources.build_links(resources, links);
    }
}
