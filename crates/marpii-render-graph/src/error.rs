use ash::vk;
use thiserror::Error;

use crate::{NodeHandle, ResourceHandle};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{0} is not registered")]
    UnknownHandle(ResourceHandle),
    #[error("Image {0:?} is already registered")]
    ImageAlreadyRegistered(vk::Image),
    #[error("Buffer {0:?} is already registered")]
    BufferAlreadyRegistered(vk::Buffer),
    #[error("Image {0:?} is not registered")]
    ImageNotRegistered(vk::Image),
    #[error("Buffer {0:?} is not registered")]
    BufferNotRegistered(vk::Buffer),
    #[error("{0} is a buffer, but was used as image")]
    NotAnImage(ResourceHandle),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("BeginRendering at node {0:?} has no matching EndRendering")]
    UnmatchedBeginRendering(NodeHandle),
    #[error("BeginRendering at node {inner:?} is nested in the rendering scope started at {outer:?}")]
    NestedBeginRendering { outer: NodeHandle, inner: NodeHandle },
    #[error("EndRendering at node {0:?} has no matching BeginRendering")]
    StrayEndRendering(NodeHandle),
}

///Programmer errors are not recoverable. Logs and panics.
#[track_caller]
pub(crate) fn fatal(err: impl std::error::Error) -> ! {
    #[cfg(feature = "logging")]
    log::error!("{}", err);
    panic!("{}", err)
}
