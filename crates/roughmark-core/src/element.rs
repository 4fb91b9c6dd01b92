//! Host surface elements that annotations attach to.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An element mounted on the host surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: ElementId,
    /// Layout box in surface coordinates.
    pub bounds: Rect,
}

impl Element {
    pub fn new(bounds: Rect) -> Self {
        Self {
            id: ElementId::new(),
            bounds,
        }
    }

    /// Check if a point (in surface coordinates) lies inside this element.
    pub fn hit_test(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }
}

/// Slot that receives the element once the host mounts it.
///
/// This is the binding token a controller hands to the host: the host fills
/// it on mount and clears it on unmount.
#[derive(Debug, Clone, Default)]
pub struct ElementBinding {
    element: Option<Element>,
}

impl ElementBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the mounted element, returning whatever was bound before.
    pub fn bind(&mut self, element: Element) -> Option<Element> {
        self.element.replace(element)
    }

    /// Clear the slot, returning the element that was bound.
    pub fn unbind(&mut self) -> Option<Element> {
        self.element.take()
    }

    pub fn get(&self) -> Option<&Element> {
        self.element.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.element.is_some()
    }
}
