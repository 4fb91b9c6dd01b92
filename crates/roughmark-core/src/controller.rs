//! Single-annotation controller.
//!
//! Owns one element binding and at most one engine handle, and keeps the
//! handle in step with the host lifecycle:
//! - mount ([`AnnotationController::attach`]) creates the handle
//! - an options change releases the old handle before creating a new one
//! - every intent change is a settle point where the shown state converges
//! - unmount ([`AnnotationController::detach`]) releases the handle
//!
//! Inside a group the controller registers its handle instead of showing
//! itself; the group shows all members together. Hiding stays per handle.

use crate::element::{Element, ElementBinding};
use crate::engine::{AnnotationEngine, AnnotationHandle};
use crate::error::{AnnotationError, AnnotationResult};
use crate::group::GroupRegistry;
use crate::hover::VisibilityIntent;
use crate::options::AnnotationOptions;
use kurbo::Point;
use std::rc::Rc;

pub struct AnnotationController {
    engine: Rc<dyn AnnotationEngine>,
    options: AnnotationOptions,
    binding: ElementBinding,
    handle: Option<AnnotationHandle>,
    intent: VisibilityIntent,
    /// Enclosing group, if any. `None` means standalone.
    group: Option<GroupRegistry>,
}

impl AnnotationController {
    /// Create a controller. No handle exists until an element is attached.
    pub fn new(
        engine: Rc<dyn AnnotationEngine>,
        options: AnnotationOptions,
        group: Option<&GroupRegistry>,
    ) -> Self {
        Self {
            engine,
            options,
            binding: ElementBinding::new(),
            handle: None,
            intent: VisibilityIntent::default(),
            group: group.cloned(),
        }
    }

    /// Set the initial explicit visibility (before mount).
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.intent.set_external(visible);
        self
    }

    /// Enable hover-driven visibility (before mount).
    pub fn with_hover(mut self, hover: bool) -> Self {
        self.intent.set_hover_enabled(hover);
        self
    }

    pub fn options(&self) -> &AnnotationOptions {
        &self.options
    }

    pub fn intent(&self) -> &VisibilityIntent {
        &self.intent
    }

    pub fn binding(&self) -> &ElementBinding {
        &self.binding
    }

    pub fn element(&self) -> Option<&Element> {
        self.binding.get()
    }

    pub fn handle(&self) -> Option<&AnnotationHandle> {
        self.handle.as_ref()
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }

    pub fn is_showing(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_showing())
    }

    /// Mount: bind the element and create the handle.
    pub fn attach(&mut self, element: Element) {
        if self.binding.is_bound() {
            self.release();
        }
        self.binding.bind(element);
        self.create_handle();
    }

    /// Unmount: release the handle, then clear the binding.
    ///
    /// Release happens whether or not the annotation is still animating.
    pub fn detach(&mut self) -> Option<Element> {
        self.release();
        self.binding.unbind()
    }

    /// Replace the options. Any change recreates the handle.
    pub fn set_options(&mut self, options: AnnotationOptions) {
        if options == self.options {
            return;
        }
        self.options = options;
        if self.binding.is_bound() {
            self.recreate_handle();
        }
    }

    /// Set the explicit visibility intent.
    pub fn set_visible(&mut self, visible: bool) {
        let before = self.intent.visible();
        let after = self.intent.set_external(visible);
        self.reconcile(before, after);
    }

    pub fn set_hover_enabled(&mut self, hover: bool) {
        self.intent.set_hover_enabled(hover);
    }

    pub fn pointer_enter(&mut self) {
        let before = self.intent.visible();
        let after = self.intent.pointer_enter();
        self.reconcile(before, after);
    }

    pub fn pointer_leave(&mut self) {
        let before = self.intent.visible();
        let after = self.intent.pointer_leave();
        self.reconcile(before, after);
    }

    /// Feed a pointer position; enter/leave are derived from the element
    /// bounds.
    pub fn pointer_moved(&mut self, point: Point) {
        let inside = self.binding.get().is_some_and(|e| e.hit_test(point));
        let before = self.intent.visible();
        if let Some(after) = self.intent.pointer_at(inside) {
            self.reconcile(before, after);
        }
    }

    /// Show now. No-op without a handle or when already showing.
    pub fn show(&self) {
        if let Some(handle) = &self.handle {
            if !handle.is_showing() {
                handle.show();
            }
        }
    }

    /// Hide now. No-op without a handle or when already hidden.
    pub fn hide(&self) {
        if let Some(handle) = &self.handle {
            if handle.is_showing() {
                handle.hide();
            }
        }
    }

    /// Like [`show`](Self::show), but reports a missing handle.
    pub fn try_show(&self) -> AnnotationResult<()> {
        if self.handle.is_none() {
            return Err(AnnotationError::NotAttached);
        }
        self.show();
        Ok(())
    }

    /// Like [`hide`](Self::hide), but reports a missing handle.
    pub fn try_hide(&self) -> AnnotationResult<()> {
        if self.handle.is_none() {
            return Err(AnnotationError::NotAttached);
        }
        self.hide();
        Ok(())
    }

    fn reconcile(&self, before: bool, after: bool) {
        log::trace!(
            "reconcile intent {} -> {} (grouped: {})",
            before,
            after,
            self.is_grouped()
        );
        if self.group.is_some() {
            // The group owns the shared show; only a falling edge is ours.
            if before && !after {
                self.hide();
            }
        } else if after {
            self.show();
        } else {
            self.hide();
        }
    }

    fn create_handle(&mut self) {
        let Some(element) = self.binding.get() else {
            return;
        };
        let config = self.options.to_config();
        let handle = self.engine.annotate(element, &config);
        log::debug!(
            "created {} annotation {} on element {}",
            config.notation,
            handle.id(),
            element.id
        );
        if let Some(group) = &self.group {
            group.register(Rc::clone(&handle));
        }
        self.handle = Some(handle);
        if self.group.is_none() && self.intent.visible() {
            self.show();
        }
    }

    /// Release the current handle and create its replacement.
    ///
    /// Inside a group the new handle takes over the old one's registry slot,
    /// and keeps the old one's shown state: the group does not show a
    /// replaced member again.
    fn recreate_handle(&mut self) {
        let Some(group) = self.group.clone() else {
            self.release();
            self.create_handle();
            return;
        };
        let Some(old) = self.handle.take() else {
            self.create_handle();
            return;
        };
        let was_showing = old.is_showing();
        old.remove();
        log::debug!("released annotation {}", old.id());

        let Some(element) = self.binding.get() else {
            group.deregister(old.id());
            return;
        };
        let config = self.options.to_config();
        let handle = self.engine.annotate(element, &config);
        log::debug!(
            "recreated {} annotation {} on element {}",
            config.notation,
            handle.id(),
            element.id
        );
        group.replace(old.id(), Rc::clone(&handle));
        if was_showing {
            handle.show();
        }
        self.handle = Some(handle);
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Some(group) = &self.group {
                group.deregister(handle.id());
            }
            handle.remove();
            log::debug!("released annotation {}", handle.id());
        }
    }
}

impl Drop for AnnotationController {
    fn drop(&mut self) {
        self.release();
    }
}
