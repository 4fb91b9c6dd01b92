//! Scene description files.
//!
//! A scene is a tree of annotations and groups plus a script of steps to
//! replay against it.

use roughmark_core::AnnotationOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Scene loading and playback errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unknown target: {0}")]
    UnknownTarget(String),
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Layout settings for the headless surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    pub viewport_width: f64,
    /// Height of each annotated line.
    pub line_height: f64,
    /// Horizontal inset of every element.
    pub margin: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800.0,
            line_height: 24.0,
            margin: 16.0,
        }
    }
}

/// An annotated span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationNode {
    pub name: String,
    #[serde(default)]
    pub show: bool,
    #[serde(default)]
    pub hover: bool,
    #[serde(flatten)]
    pub options: AnnotationOptions,
}

/// A group boundary and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub name: String,
    #[serde(default)]
    pub show: bool,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SceneNode {
    Annotation(AnnotationNode),
    Group(GroupNode),
}

impl SceneNode {
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Annotation(node) => &node.name,
            SceneNode::Group(node) => &node.name,
        }
    }
}

/// One scripted interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Set the explicit intent of an annotation or group to visible.
    Show { target: String },
    /// Set the explicit intent of an annotation or group to hidden.
    Hide { target: String },
    /// Flip the explicit intent.
    Toggle { target: String },
    /// Move the pointer to a surface position.
    Pointer { x: f64, y: f64 },
    /// Replace an annotation's options.
    Options {
        target: String,
        options: AnnotationOptions,
    },
    /// Unmount an annotation, or a group with everything inside it.
    Unmount { target: String },
}

/// A complete scene file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub host: HostConfig,
    pub nodes: Vec<SceneNode>,
    pub steps: Vec<Step>,
}

impl SceneConfig {
    /// Parse a scene from JSON.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a scene file.
    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
