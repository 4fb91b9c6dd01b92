//! Annotation options and the mapping to engine creation arguments.

use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::time::Duration;

/// Default stroke color (black).
pub const DEFAULT_COLOR: &str = "#000000";
/// Default stroke width.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;
/// Default number of passes the engine draws per stroke.
pub const DEFAULT_ITERATIONS: u32 = 2;
/// Default animation duration in milliseconds.
pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 800;
/// Default padding around the annotated content.
pub const DEFAULT_PADDING: f64 = 3.0;

/// Annotation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotationType {
    Underline,
    Box,
    Circle,
    #[default]
    Highlight,
    StrikeThrough,
    CrossedOff,
    Bracket,
}

impl NotationType {
    /// All supported styles.
    pub const ALL: [NotationType; 7] = [
        NotationType::Underline,
        NotationType::Box,
        NotationType::Circle,
        NotationType::Highlight,
        NotationType::StrikeThrough,
        NotationType::CrossedOff,
        NotationType::Bracket,
    ];

    /// Wire name of this style.
    pub fn name(self) -> &'static str {
        match self {
            NotationType::Underline => "underline",
            NotationType::Box => "box",
            NotationType::Circle => "circle",
            NotationType::Highlight => "highlight",
            NotationType::StrikeThrough => "strike-through",
            NotationType::CrossedOff => "crossed-off",
            NotationType::Bracket => "bracket",
        }
    }
}

impl fmt::Display for NotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side of the element a bracket is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketPosition {
    Left,
    Right,
    Top,
    Bottom,
}

/// Accepted input shapes for `brackets`: a single position or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum BracketsRepr {
    One(BracketPosition),
    Many(Vec<BracketPosition>),
}

/// Non-empty list of bracket positions.
///
/// Deserializes from either `"left"` or `["left", "right"]`; always
/// serializes as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Brackets(Vec<BracketPosition>);

impl Brackets {
    /// Build from a list. Returns `None` if the list is empty.
    pub fn new(positions: Vec<BracketPosition>) -> Option<Self> {
        if positions.is_empty() {
            None
        } else {
            Some(Self(positions))
        }
    }

    /// A single bracket.
    pub fn one(position: BracketPosition) -> Self {
        Self(vec![position])
    }

    /// The positions, in declaration order.
    pub fn positions(&self) -> &[BracketPosition] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Brackets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BracketsRepr::deserialize(deserializer)? {
            BracketsRepr::One(position) => Ok(Self::one(position)),
            BracketsRepr::Many(positions) => Self::new(positions)
                .ok_or_else(|| de::Error::custom("brackets must not be empty")),
        }
    }
}

/// Declarative annotation options as supplied by the host.
///
/// Every field is optional; [`AnnotationOptions::to_config`] fills in the
/// defaults. A value that differs from the previous render forces the
/// controller to recreate its handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationOptions {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub notation: Option<NotationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_duration: Option<u64>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brackets: Option<Brackets>,
    /// Position within a group sequence, lower first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl AnnotationOptions {
    /// Options for the given style, everything else defaulted.
    pub fn new(notation: NotationType) -> Self {
        Self {
            notation: Some(notation),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn with_animation_duration(mut self, ms: u64) -> Self {
        self.animation_duration = Some(ms);
        self
    }

    pub fn with_animation_delay(mut self, ms: u64) -> Self {
        self.animation_delay = Some(ms);
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn with_multiline(mut self, multiline: bool) -> Self {
        self.multiline = Some(multiline);
        self
    }

    pub fn with_brackets(mut self, brackets: Brackets) -> Self {
        self.brackets = Some(brackets);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Map to engine creation arguments, applying defaults.
    pub fn to_config(&self) -> AnnotationConfig {
        AnnotationConfig::from(self)
    }
}

/// Engine creation arguments with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationConfig {
    pub notation: NotationType,
    pub color: String,
    pub stroke_width: f64,
    /// Always at least 1.
    pub iterations: u32,
    pub animation_duration: Duration,
    pub animation_delay: Duration,
    pub padding: f64,
    pub multiline: bool,
    pub brackets: Option<Brackets>,
    pub order: Option<i32>,
}

impl From<&AnnotationOptions> for AnnotationConfig {
    fn from(options: &AnnotationOptions) -> Self {
        Self {
            notation: options.notation.unwrap_or_default(),
            color: options
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            stroke_width: options.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            iterations: options.iterations.unwrap_or(DEFAULT_ITERATIONS).max(1),
            animation_duration: Duration::from_millis(
                options
                    .animation_duration
                    .unwrap_or(DEFAULT_ANIMATION_DURATION_MS),
            ),
            animation_delay: Duration::from_millis(options.animation_delay.unwrap_or(0)),
            padding: options.padding.unwrap_or(DEFAULT_PADDING),
            multiline: options.multiline.unwrap_or(true),
            brackets: options.brackets.clone(),
            order: options.order,
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationOptions::default().to_config()
    }
}
