//! roughmark Application
//!
//! Headless host for roughmark scenes: loads a scene file, mounts it against
//! the in-memory engine, and replays its scripted steps.

mod host;
mod scene;

pub use host::Host;
pub use scene::{
    AnnotationNode, GroupNode, HostConfig, SceneConfig, SceneError, SceneNode, SceneResult, Step,
};
