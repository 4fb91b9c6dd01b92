//! roughmark Core Library
//!
//! Lifecycle bindings between a component-style host and a hand-drawn
//! annotation engine: per-element controllers, hover-aware visibility, and
//! groups that animate several annotations as one sequence.

pub mod controller;
pub mod element;
pub mod engine;
pub mod error;
pub mod group;
pub mod hover;
pub mod options;

pub use controller::AnnotationController;
pub use element::{Element, ElementBinding, ElementId};
pub use engine::{
    Annotation, AnnotationEngine, AnnotationGroup, AnnotationHandle, AnnotationId, EngineCall,
    MemoryEngine,
};
pub use error::{AnnotationError, AnnotationResult};
pub use group::{GroupCoordinator, GroupRegistry, require_group};
pub use hover::VisibilityIntent;
pub use options::{AnnotationConfig, AnnotationOptions, BracketPosition, Brackets, NotationType};
