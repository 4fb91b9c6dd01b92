//! Annotation engine abstraction.
//!
//! The drawing engine is an external collaborator. It is reached only
//! through these traits, so the lifecycle code never depends on how strokes
//! are generated or animated.

mod memory;

pub use memory::{AnnotationSnapshot, EngineCall, MemoryEngine, ScheduledShow};

use crate::element::{Element, ElementId};
use crate::options::AnnotationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Unique identifier for a live annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One annotation instance bound to exactly one element.
///
/// Methods take `&self`: engines keep their mutable state behind interior
/// mutability so handles can be shared with a group registry.
pub trait Annotation {
    fn id(&self) -> AnnotationId;

    /// The element this annotation is drawn around.
    fn element(&self) -> ElementId;

    /// The arguments the annotation was created with.
    fn config(&self) -> &AnnotationConfig;

    fn is_showing(&self) -> bool;

    /// Start drawing. The engine ignores this while already showing.
    fn show(&self);

    /// Erase. The engine ignores this while hidden.
    fn hide(&self);

    /// Release the annotation and detach it from its element.
    fn remove(&self);
}

/// Shared reference to a live annotation.
pub type AnnotationHandle = Rc<dyn Annotation>;

/// Composite that animates several annotations as one sequence.
///
/// The engine only offers a grouped show; hiding is always per annotation.
pub trait AnnotationGroup {
    fn show(&self);

    /// Members in the order the group was built with.
    fn members(&self) -> Vec<AnnotationId>;
}

/// Trait for annotation engine backends.
pub trait AnnotationEngine {
    /// Create an annotation around a mounted element.
    fn annotate(&self, element: &Element, config: &AnnotationConfig) -> AnnotationHandle;

    /// Build a group over a snapshot of annotations.
    fn group(&self, members: &[AnnotationHandle]) -> Box<dyn AnnotationGroup>;
}
