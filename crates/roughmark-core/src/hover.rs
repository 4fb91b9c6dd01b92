//! Visibility intent with optional hover.

/// The shown state an annotation should converge to.
///
/// Combines the caller's explicit flag with pointer hover when hover is
/// enabled. Leaving the element only hides the annotation again when the
/// explicit flag is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityIntent {
    external: bool,
    hover_enabled: bool,
    pointer_inside: bool,
    visible: bool,
}

impl VisibilityIntent {
    pub fn new(external: bool, hover_enabled: bool) -> Self {
        Self {
            external,
            hover_enabled,
            pointer_inside: false,
            visible: external,
        }
    }

    /// Resolved intent.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn external(&self) -> bool {
        self.external
    }

    pub fn hover_enabled(&self) -> bool {
        self.hover_enabled
    }

    pub fn pointer_inside(&self) -> bool {
        self.pointer_inside
    }

    /// Set the explicit flag. The resolved intent follows it directly.
    pub fn set_external(&mut self, external: bool) -> bool {
        self.external = external;
        self.visible = external;
        self.visible
    }

    /// Enable or disable hover. Disabling does not change the resolved intent.
    pub fn set_hover_enabled(&mut self, enabled: bool) {
        self.hover_enabled = enabled;
    }

    pub fn pointer_enter(&mut self) -> bool {
        self.pointer_inside = true;
        if self.hover_enabled {
            self.visible = true;
        }
        self.visible
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.pointer_inside = false;
        if self.hover_enabled && !self.external {
            self.visible = false;
        }
        self.visible
    }

    /// Derive enter/leave from whether the pointer is now inside.
    ///
    /// Returns `None` when the pointer did not cross the element boundary.
    pub fn pointer_at(&mut self, inside: bool) -> Option<bool> {
        match (self.pointer_inside, inside) {
            (false, true) => Some(self.pointer_enter()),
            (true, false) => Some(self.pointer_leave()),
            _ => None,
        }
    }
}
