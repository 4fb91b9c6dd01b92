//! Headless host that mounts a scene and replays its steps.
//!
//! Each annotation gets one line of the surface. Groups are mounted before
//! their children and settled once the whole batch is mounted, mirroring a
//! render/commit cycle.

use crate::scene::{
    AnnotationNode, GroupNode, HostConfig, SceneConfig, SceneError, SceneNode, SceneResult, Step,
};
use kurbo::{Point, Rect};
use roughmark_core::{
    AnnotationController, AnnotationEngine, AnnotationId, Element, EngineCall, GroupCoordinator,
    GroupRegistry, MemoryEngine,
};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

struct MountedAnnotation {
    name: String,
    controller: AnnotationController,
}

struct MountedGroup {
    name: String,
    coordinator: GroupCoordinator,
    /// Names of everything mounted inside this group, nested groups included.
    descendants: Vec<String>,
}

/// A mounted scene backed by the in-memory engine.
pub struct Host {
    engine: MemoryEngine,
    shared: Rc<dyn AnnotationEngine>,
    config: HostConfig,
    annotations: Vec<MountedAnnotation>,
    groups: Vec<MountedGroup>,
    /// Every annotation id ever created, for readable call logs.
    labels: HashMap<AnnotationId, String>,
    next_line: usize,
}

impl Host {
    /// Create an empty host.
    pub fn new(config: HostConfig) -> Self {
        let engine = MemoryEngine::new();
        let shared: Rc<dyn AnnotationEngine> = Rc::new(engine.clone());
        Self {
            engine,
            shared,
            config,
            annotations: Vec::new(),
            groups: Vec::new(),
            labels: HashMap::new(),
            next_line: 0,
        }
    }

    /// Mount every node of a scene and settle.
    pub fn mount_scene(scene: &SceneConfig) -> SceneResult<Self> {
        let mut host = Self::new(scene.host.clone());
        let mut seen = HashSet::new();
        for node in &scene.nodes {
            host.mount_node(node, None, &mut seen)?;
        }
        host.commit();
        Ok(host)
    }

    /// Mount a scene and replay all of its steps.
    pub fn run(scene: &SceneConfig) -> SceneResult<Self> {
        let mut host = Self::mount_scene(scene)?;
        for step in &scene.steps {
            host.apply(step)?;
        }
        Ok(host)
    }

    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn annotation(&self, name: &str) -> Option<&AnnotationController> {
        self.annotations
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.controller)
    }

    pub fn group(&self, name: &str) -> Option<&GroupCoordinator> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| &g.coordinator)
    }

    /// Name of the annotation an engine id belonged to.
    pub fn label(&self, id: AnnotationId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Apply one step, then settle.
    pub fn apply(&mut self, step: &Step) -> SceneResult<()> {
        log::debug!("step: {:?}", step);
        match step {
            Step::Show { target } => self.set_visible(target, |_| true)?,
            Step::Hide { target } => self.set_visible(target, |_| false)?,
            Step::Toggle { target } => self.set_visible(target, |current| !current)?,
            Step::Pointer { x, y } => {
                let point = Point::new(*x, *y);
                for mounted in &mut self.annotations {
                    mounted.controller.pointer_moved(point);
                }
            }
            Step::Options { target, options } => {
                let mounted = self
                    .annotations
                    .iter_mut()
                    .find(|a| a.name == *target)
                    .ok_or_else(|| SceneError::UnknownTarget(target.clone()))?;
                mounted.controller.set_options(options.clone());
            }
            Step::Unmount { target } => self.unmount(target)?,
        }
        self.commit();
        Ok(())
    }

    /// Render the call log with annotation names.
    pub fn describe_calls(&self) -> Vec<String> {
        self.engine
            .calls()
            .iter()
            .map(|call| self.describe(call))
            .collect()
    }

    fn describe(&self, call: &EngineCall) -> String {
        let name = |id: &AnnotationId| self.label(*id).unwrap_or("?").to_string();
        match call {
            EngineCall::Create {
                annotation,
                notation,
                ..
            } => format!("create {} ({})", name(annotation), notation),
            EngineCall::Show { annotation } => format!("show {}", name(annotation)),
            EngineCall::Hide { annotation } => format!("hide {}", name(annotation)),
            EngineCall::Remove { annotation } => format!("remove {}", name(annotation)),
            EngineCall::Group { members } => {
                let names: Vec<_> = members.iter().map(name).collect();
                format!("group [{}]", names.join(", "))
            }
            EngineCall::GroupShow { schedule } => {
                let names: Vec<_> = schedule
                    .iter()
                    .map(|s| format!("{}@{}ms", name(&s.annotation), s.delay_ms))
                    .collect();
                format!("group-show [{}]", names.join(", "))
            }
        }
    }

    fn mount_node(
        &mut self,
        node: &SceneNode,
        group: Option<&GroupRegistry>,
        seen: &mut HashSet<String>,
    ) -> SceneResult<Vec<String>> {
        if !seen.insert(node.name().to_string()) {
            return Err(SceneError::DuplicateName(node.name().to_string()));
        }
        match node {
            SceneNode::Annotation(annotation) => {
                self.mount_annotation(annotation, group);
                Ok(vec![annotation.name.clone()])
            }
            SceneNode::Group(group_node) => self.mount_group(group_node, seen),
        }
    }

    fn mount_annotation(&mut self, node: &AnnotationNode, group: Option<&GroupRegistry>) {
        let mut controller =
            AnnotationController::new(Rc::clone(&self.shared), node.options.clone(), group)
                .with_visible(node.show)
                .with_hover(node.hover);
        controller.attach(Element::new(self.next_line_rect()));
        log::info!("mounted annotation '{}'", node.name);
        self.annotations.push(MountedAnnotation {
            name: node.name.clone(),
            controller,
        });
        self.refresh_labels();
    }

    fn mount_group(
        &mut self,
        node: &GroupNode,
        seen: &mut HashSet<String>,
    ) -> SceneResult<Vec<String>> {
        let coordinator = GroupCoordinator::new(Rc::clone(&self.shared), node.show);
        let registry = coordinator.registry().clone();
        let index = self.groups.len();
        self.groups.push(MountedGroup {
            name: node.name.clone(),
            coordinator,
            descendants: Vec::new(),
        });
        log::info!("mounted group '{}'", node.name);

        let mut descendants = Vec::new();
        for child in &node.children {
            descendants.extend(self.mount_node(child, Some(&registry), seen)?);
        }
        self.groups[index].descendants = descendants.clone();

        descendants.push(node.name.clone());
        Ok(descendants)
    }

    fn next_line_rect(&mut self) -> Rect {
        let y = self.next_line as f64 * self.config.line_height;
        self.next_line += 1;
        Rect::new(
            self.config.margin,
            y,
            (self.config.viewport_width - self.config.margin).max(self.config.margin),
            y + self.config.line_height,
        )
    }

    fn set_visible(&mut self, target: &str, f: impl Fn(bool) -> bool) -> SceneResult<()> {
        if let Some(mounted) = self.annotations.iter_mut().find(|a| a.name == target) {
            let next = f(mounted.controller.intent().external());
            mounted.controller.set_visible(next);
            return Ok(());
        }
        if let Some(mounted) = self.groups.iter_mut().find(|g| g.name == target) {
            let next = f(mounted.coordinator.visible());
            mounted.coordinator.set_visible(next);
            return Ok(());
        }
        Err(SceneError::UnknownTarget(target.to_string()))
    }

    fn unmount(&mut self, target: &str) -> SceneResult<()> {
        if let Some(index) = self.annotations.iter().position(|a| a.name == target) {
            let mut mounted = self.annotations.remove(index);
            mounted.controller.detach();
            log::info!("unmounted annotation '{}'", target);
            return Ok(());
        }

        let index = self
            .groups
            .iter()
            .position(|g| g.name == target)
            .ok_or_else(|| SceneError::UnknownTarget(target.to_string()))?;
        let descendants = self.groups[index].descendants.clone();

        // Children unmount before their group.
        for name in &descendants {
            if let Some(i) = self.annotations.iter().position(|a| a.name == *name) {
                let mut mounted = self.annotations.remove(i);
                mounted.controller.detach();
            }
        }
        self.groups.retain_mut(|g| {
            let drop_it = g.name == target || descendants.contains(&g.name);
            if drop_it {
                g.coordinator.detach();
            }
            !drop_it
        });
        log::info!("unmounted group '{}'", target);
        Ok(())
    }

    /// Settle every group after a batch.
    fn commit(&mut self) {
        for mounted in &mut self.groups {
            mounted.coordinator.settle();
        }
        self.refresh_labels();
    }

    fn refresh_labels(&mut self) {
        for mounted in &self.annotations {
            if let Some(handle) = mounted.controller.handle() {
                self.labels
                    .entry(handle.id())
                    .or_insert_with(|| mounted.name.clone());
            }
        }
    }
}
