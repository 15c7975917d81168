//! # Resources
//!
//! The [ResourceStateTracker] is the single source of truth for the modification version ("stamp") and the
//! barrier relevant state of every buffer and image the render graph knows about.
//!
//! All state lives in a [ResourceTable] behind one mutex. The render graph keeps its node tables behind the same
//! mutex and locks it for the whole "resolve stamps, commit node" step, so a node always captures stamps that were
//! current when it was inserted.

use std::{
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard},
};

use ahash::AHashMap;
use ash::vk;

use crate::{ResourceError, error::fatal};

pub(crate) mod state;
use state::{
    BarrierState, NativeResource, Resource, ResourceHandle, ResourceOwner, ResourceWithStamp,
};

///Dense resource storage. Holes left by [unregister](Self::unregister) are recycled through a free list.
#[derive(Default)]
pub struct ResourceTable {
    resources: Vec<Option<Resource>>,
    free_list: Vec<u32>,
    images: AHashMap<vk::Image, ResourceHandle>,
    buffers: AHashMap<vk::Buffer, ResourceHandle>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, resource: Resource) -> ResourceHandle {
        if let Some(index) = self.free_list.pop() {
            debug_assert!(self.resources[index as usize].is_none());
            self.resources[index as usize] = Some(resource);
            ResourceHandle(index)
        } else {
            let index = self.resources.len();
            assert!(index < u32::MAX as usize, "Resource table is full");
            self.resources.push(Some(resource));
            ResourceHandle(index as u32)
        }
    }

    ///Registers `buffer`. Panics if the buffer is already registered.
    pub fn register_buffer(&mut self, buffer: vk::Buffer) -> ResourceHandle {
        if self.buffers.contains_key(&buffer) {
            fatal(ResourceError::BufferAlreadyRegistered(buffer));
        }
        let handle = self.insert(Resource::buffer(buffer));
        self.buffers.insert(buffer, handle);

        #[cfg(feature = "logging")]
        log::trace!("Registered buffer {:?} as {}", buffer, handle);

        handle
    }

    ///Registers `image` that is currently in `layout`. Panics if the image is already registered.
    pub fn register_image(
        &mut self,
        image: vk::Image,
        owner: ResourceOwner,
        layout: vk::ImageLayout,
    ) -> ResourceHandle {
        self.register_image_inner(image, owner, layout, false)
    }

    ///Same as [register_image](Self::register_image) for an application owned image whose mip levels and layers
    /// are tracked individually by the command builder.
    pub fn register_image_with_subresource_tracking(
        &mut self,
        image: vk::Image,
        layout: vk::ImageLayout,
    ) -> ResourceHandle {
        self.register_image_inner(image, ResourceOwner::Application, layout, true)
    }

    ///Registers a swapchain image. Its layout is unknown at this point.
    pub fn register_swapchain_image(&mut self, image: vk::Image) -> ResourceHandle {
        self.register_image(image, ResourceOwner::SwapChain, vk::ImageLayout::UNDEFINED)
    }

    fn register_image_inner(
        &mut self,
        image: vk::Image,
        owner: ResourceOwner,
        layout: vk::ImageLayout,
        use_subresource_tracking: bool,
    ) -> ResourceHandle {
        if self.images.contains_key(&image) {
            fatal(ResourceError::ImageAlreadyRegistered(image));
        }
        let handle = self.insert(Resource::image(
            image,
            owner,
            layout,
            use_subresource_tracking,
        ));
        self.images.insert(image, handle);

        #[cfg(feature = "logging")]
        log::trace!("Registered image {:?} ({:?}) as {}", image, owner, handle);

        handle
    }

    ///Removes the resource and recycles its handle. Nodes still referencing `handle` must have been drained before.
    pub fn unregister(&mut self, handle: ResourceHandle) {
        let Some(resource) = self
            .resources
            .get_mut(handle.index())
            .and_then(|slot| slot.take())
        else {
            fatal(ResourceError::UnknownHandle(handle));
        };

        match resource.native {
            NativeResource::Buffer(buffer) => {
                self.buffers.remove(&buffer);
            }
            NativeResource::Image(image) => {
                self.images.remove(&image);
            }
        }
        self.free_list.push(handle.0);

        #[cfg(feature = "logging")]
        log::trace!("Unregistered {}", handle);
    }

    pub fn unregister_image(&mut self, image: vk::Image) {
        let handle = self.image_handle(image).unwrap_or_else(|e| fatal(e));
        self.unregister(handle)
    }

    pub fn unregister_buffer(&mut self, buffer: vk::Buffer) {
        let handle = self.buffer_handle(buffer).unwrap_or_else(|e| fatal(e));
        self.unregister(handle)
    }

    pub fn resource(&self, handle: ResourceHandle) -> Result<&Resource, ResourceError> {
        self.resources
            .get(handle.index())
            .and_then(|slot| slot.as_ref())
            .ok_or(ResourceError::UnknownHandle(handle))
    }

    fn get(&self, handle: ResourceHandle) -> &Resource {
        self.resource(handle).unwrap_or_else(|e| fatal(e))
    }

    fn get_mut(&mut self, handle: ResourceHandle) -> &mut Resource {
        match self
            .resources
            .get_mut(handle.index())
            .and_then(|slot| slot.as_mut())
        {
            Some(res) => res,
            None => fatal(ResourceError::UnknownHandle(handle)),
        }
    }

    pub fn image_handle(&self, image: vk::Image) -> Result<ResourceHandle, ResourceError> {
        self.images
            .get(&image)
            .copied()
            .ok_or(ResourceError::ImageNotRegistered(image))
    }

    pub fn buffer_handle(&self, buffer: vk::Buffer) -> Result<ResourceHandle, ResourceError> {
        self.buffers
            .get(&buffer)
            .copied()
            .ok_or(ResourceError::BufferNotRegistered(buffer))
    }

    pub fn contains_image(&self, image: vk::Image) -> bool {
        self.images.contains_key(&image)
    }

    pub fn contains_buffer(&self, buffer: vk::Buffer) -> bool {
        self.buffers.contains_key(&buffer)
    }

    ///Current version of `handle`. Does not change any state.
    pub fn read(&self, handle: ResourceHandle) -> ResourceWithStamp {
        ResourceWithStamp {
            handle,
            stamp: self.get(handle).stamp,
        }
    }

    ///Same as [read](Self::read).
    pub fn peek(&self, handle: ResourceHandle) -> ResourceWithStamp {
        self.read(handle)
    }

    ///Returns the version *before* the write and advances the stamp by one.
    pub fn write_and_advance(&mut self, handle: ResourceHandle) -> ResourceWithStamp {
        let resource = self.get_mut(handle);
        let before = resource.stamp;
        resource.stamp += 1;

        #[cfg(feature = "logging")]
        log::trace!("{} stamp {} -> {}", handle, before, resource.stamp);

        ResourceWithStamp {
            handle,
            stamp: before,
        }
    }

    pub fn read_image(&self, image: vk::Image) -> ResourceWithStamp {
        let handle = self.image_handle(image).unwrap_or_else(|e| fatal(e));
        self.read(handle)
    }

    pub fn read_buffer(&self, buffer: vk::Buffer) -> ResourceWithStamp {
        let handle = self.buffer_handle(buffer).unwrap_or_else(|e| fatal(e));
        self.read(handle)
    }

    pub fn write_image(&mut self, image: vk::Image) -> ResourceWithStamp {
        let handle = self.image_handle(image).unwrap_or_else(|e| fatal(e));
        self.write_and_advance(handle)
    }

    pub fn write_buffer(&mut self, buffer: vk::Buffer) -> ResourceWithStamp {
        let handle = self.buffer_handle(buffer).unwrap_or_else(|e| fatal(e));
        self.write_and_advance(handle)
    }

    pub fn barrier_state(&self, handle: ResourceHandle) -> BarrierState {
        self.get(handle).barrier_state
    }

    ///Overwrites the last known barrier state. Used by the command builder after it recorded a barrier.
    pub fn set_barrier_state(&mut self, handle: ResourceHandle, state: BarrierState) {
        self.get_mut(handle).barrier_state = state;
    }

    ///Notifies the tracker about a layout transition that happened outside of the graph.
    pub fn set_image_layout(&mut self, handle: ResourceHandle, layout: vk::ImageLayout) {
        let resource = self.get_mut(handle);
        if !resource.is_image() {
            fatal(ResourceError::NotAnImage(handle));
        }
        resource.barrier_state.image_layout = layout;
    }

    ///Resets the tracked layout of all swapchain images to `UNDEFINED`. Application owned resources are not touched.
    pub fn reset_swapchain_layouts(&mut self) {
        for resource in self
            .resources
            .iter_mut()
            .flatten()
            .filter(|res| res.owner == ResourceOwner::SwapChain)
        {
            resource.barrier_state.image_layout = vk::ImageLayout::UNDEFINED;
        }

        #[cfg(feature = "logging")]
        {
            let count = self
                .resources
                .iter()
                .flatten()
                .filter(|res| res.owner == ResourceOwner::SwapChain)
                .count();
            if count == 0 {
                log::warn!("Reset swapchain layouts, but no swapchain image is registered");
            } else {
                log::trace!("Reset layout of {} swapchain images", count);
            }
        }
    }

    ///Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///Everything behind the tracker's lock: the [ResourceTable] and the `guarded` state of the tracker's owner.
///
/// `guarded` is for state that has to change in the same critical section as the resources, for instance the node
/// tables of a [RenderGraph](crate::RenderGraph). Derefs to the resource table.
#[derive(Default)]
pub struct TrackedState<T> {
    pub resources: ResourceTable,
    pub guarded: T,
}

impl<T> Deref for TrackedState<T> {
    type Target = ResourceTable;
    fn deref(&self) -> &Self::Target {
        &self.resources
    }
}

impl<T> DerefMut for TrackedState<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.resources
    }
}

///Thread safe wrapper around the [ResourceTable].
///
/// Every operation takes the internal lock. Use [lock](Self::lock) to run several operations as one atomic step.
/// A tracker created with [with_guarded](Self::with_guarded) additionally protects some state `T` of its owner with
/// the same lock.
pub struct ResourceStateTracker<T = ()> {
    state: Mutex<TrackedState<T>>,
}

impl Default for ResourceStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStateTracker {
    pub fn new() -> Self {
        Self::with_guarded(())
    }
}

impl<T> ResourceStateTracker<T> {
    pub fn with_guarded(guarded: T) -> Self {
        ResourceStateTracker {
            state: Mutex::new(TrackedState {
                resources: ResourceTable::new(),
                guarded,
            }),
        }
    }

    ///Locks the tracked state. This is the only lock in the render graph, do not hold it across
    /// calls that lock it again.
    pub fn lock(&self) -> MutexGuard<'_, TrackedState<T>> {
        self.state
            .lock()
            .expect("Resource table lock poisoned by a panicking thread")
    }

    ///Lock free access if the tracker is not shared at the moment.
    pub fn get_mut(&mut self) -> &mut TrackedState<T> {
        self.state
            .get_mut()
            .expect("Resource table lock poisoned by a panicking thread")
    }

    pub fn register_buffer(&self, buffer: vk::Buffer) -> ResourceHandle {
        self.lock().register_buffer(buffer)
    }

    pub fn register_image(
        &self,
        image: vk::Image,
        owner: ResourceOwner,
        layout: vk::ImageLayout,
    ) -> ResourceHandle {
        self.lock().register_image(image, owner, layout)
    }

    pub fn register_image_with_subresource_tracking(
        &self,
        image: vk::Image,
        layout: vk::ImageLayout,
    ) -> ResourceHandle {
        self.lock()
            .register_image_with_subresource_tracking(image, layout)
    }

    pub fn register_swapchain_image(&self, image: vk::Image) -> ResourceHandle {
        self.lock().register_swapchain_image(image)
    }

    pub fn unregister(&self, handle: ResourceHandle) {
        self.lock().unregister(handle)
    }

    pub fn unregister_image(&self, image: vk::Image) {
        self.lock().unregister_image(image)
    }

    pub fn unregister_buffer(&self, buffer: vk::Buffer) {
        self.lock().unregister_buffer(buffer)
    }

    pub fn read(&self, handle: ResourceHandle) -> ResourceWithStamp {
        self.lock().read(handle)
    }

    pub fn peek(&self, handle: ResourceHandle) -> ResourceWithStamp {
        self.lock().peek(handle)
    }

    pub fn write_and_advance(&self, handle: ResourceHandle) -> ResourceWithStamp {
        self.lock().write_and_advance(handle)
    }

    pub fn reset_swapchain_layouts(&self) {
        self.lock().reset_swapchain_layouts()
    }
}
