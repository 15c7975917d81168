use std::fmt::Display;

use ash::vk;

///Handle to a tracked buffer or image. Indexes the tracker's dense resource table.
///
/// Handles are recycled after [unregister](crate::ResourceTable::unregister), so a handle is only meaningful
/// while the resource it was issued for is registered.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ResourceHandle(pub(crate) u32);

impl ResourceHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceHandle({})", self.0)
    }
}

///Resource version captured at the moment a node's link was built.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub struct ResourceWithStamp {
    pub handle: ResourceHandle,
    pub stamp: u64,
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum ResourceKind {
    Buffer,
    Image,
}

///Who controls the resource's state between frames.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum ResourceOwner {
    ///Only ever changed by commands recorded through the render graph.
    Application,
    ///Swapchain images. Presentation may change their layout outside of our control.
    SwapChain,
}

///Native object behind a resource.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum NativeResource {
    Buffer(vk::Buffer),
    Image(vk::Image),
}

///Last known barrier relevant state of a resource. `image_layout` is only meaningful for images.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BarrierState {
    pub access: vk::AccessFlags2,
    pub stages: vk::PipelineStageFlags2,
    pub image_layout: vk::ImageLayout,
}

impl Default for BarrierState {
    fn default() -> Self {
        BarrierState {
            access: vk::AccessFlags2::NONE,
            stages: vk::PipelineStageFlags2::NONE,
            image_layout: vk::ImageLayout::UNDEFINED,
        }
    }
}

impl BarrierState {
    pub fn with_layout(image_layout: vk::ImageLayout) -> Self {
        BarrierState {
            image_layout,
            ..Default::default()
        }
    }
}

///Tracked state of a single buffer or image.
#[derive(Clone, Debug)]
pub struct Resource {
    pub native: NativeResource,
    pub owner: ResourceOwner,
    ///Modification version. Advanced exactly once per write link.
    pub(crate) stamp: u64,
    pub barrier_state: BarrierState,
    ///If set, the command builder tracks layouts per mip level / array layer.
    pub use_subresource_tracking: bool,
}

impl Resource {
    pub(crate) fn buffer(buffer: vk::Buffer) -> Self {
        Resource {
            native: NativeResource::Buffer(buffer),
            owner: ResourceOwner::Application,
            stamp: 0,
            barrier_state: BarrierState::default(),
            use_subresource_tracking: false,
        }
    }

    pub(crate) fn image(
        image: vk::Image,
        owner: ResourceOwner,
        layout: vk::ImageLayout,
        use_subresource_tracking: bool,
    ) -> Self {
        Resource {
            native: NativeResource::Image(image),
            owner,
            stamp: 0,
            barrier_state: BarrierState::with_layout(layout),
            use_subresource_tracking,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self.native {
            NativeResource::Buffer(_) => ResourceKind::Buffer,
            NativeResource::Image(_) => ResourceKind::Image,
        }
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn is_image(&self) -> bool {
        self.kind() == ResourceKind::Image
    }
}
