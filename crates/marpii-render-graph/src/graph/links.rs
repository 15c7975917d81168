use ash::vk;
use smallvec::SmallVec;

use crate::ResourceWithStamp;

///Range of array layers a link touches. `None` on a [Link] means all layers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LayerRange {
    pub base: u32,
    pub count: u32,
}

///Read or write reference from a node to a resource, together with the state the node needs the resource in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Link {
    pub resource: ResourceWithStamp,
    pub access: vk::AccessFlags2,
    ///Layout the node expects. Always `UNDEFINED` for buffers.
    pub image_layout: vk::ImageLayout,
    pub aspect: vk::ImageAspectFlags,
    pub layers: Option<LayerRange>,
}

impl Link {
    pub fn buffer(resource: ResourceWithStamp, access: vk::AccessFlags2) -> Self {
        Link {
            resource,
            access,
            image_layout: vk::ImageLayout::UNDEFINED,
            aspect: vk::ImageAspectFlags::empty(),
            layers: None,
        }
    }

    pub fn image(
        resource: ResourceWithStamp,
        access: vk::AccessFlags2,
        image_layout: vk::ImageLayout,
        aspect: vk::ImageAspectFlags,
    ) -> Self {
        Link {
            resource,
            access,
            image_layout,
            aspect,
            layers: None,
        }
    }

    pub fn with_layers(mut self, layers: Option<LayerRange>) -> Self {
        self.layers = layers;
        self
    }
}

///Inputs (reads) and outputs (writes) of a single node.
#[derive(Clone, Default, Debug)]
pub struct NodeLinks {
    pub inputs: SmallVec<[Link; 4]>,
    pub outputs: SmallVec<[Link; 2]>,
}

impl NodeLinks {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    pub fn reads(&self) -> impl Iterator<Item = &ResourceWithStamp> + '_ {
        self.inputs.iter().map(|link| &link.resource)
    }

    pub fn writes(&self) -> impl Iterator<Item = &ResourceWithStamp> + '_ {
        self.outputs.iter().map(|link| &link.resource)
    }
}
