//! In-memory annotation engine.

use super::{Annotation, AnnotationEngine, AnnotationGroup, AnnotationHandle, AnnotationId};
use crate::element::{Element, ElementId};
use crate::options::{AnnotationConfig, NotationType};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// One invocation made against the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum EngineCall {
    Create {
        annotation: AnnotationId,
        element: ElementId,
        notation: NotationType,
    },
    Show {
        annotation: AnnotationId,
    },
    Hide {
        annotation: AnnotationId,
    },
    Remove {
        annotation: AnnotationId,
    },
    /// A group was built over these members, in this order.
    Group {
        members: Vec<AnnotationId>,
    },
    /// A group was shown with this sequence.
    GroupShow {
        schedule: Vec<ScheduledShow>,
    },
}

impl EngineCall {
    /// The annotation this call targets, if it targets a single one.
    pub fn annotation(&self) -> Option<AnnotationId> {
        match self {
            EngineCall::Create { annotation, .. }
            | EngineCall::Show { annotation }
            | EngineCall::Hide { annotation }
            | EngineCall::Remove { annotation } => Some(*annotation),
            EngineCall::Group { .. } | EngineCall::GroupShow { .. } => None,
        }
    }
}

/// Position of one member in a grouped show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledShow {
    pub annotation: AnnotationId,
    /// Delay from the start of the group animation, in milliseconds: the
    /// earlier members' delays and durations plus this member's own delay.
    pub delay_ms: u64,
}

/// Observable state of one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSnapshot {
    pub element: ElementId,
    pub config: AnnotationConfig,
    pub showing: bool,
    pub removed: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    annotations: HashMap<AnnotationId, AnnotationSnapshot>,
    /// Creation order, for stable listing.
    created: Vec<AnnotationId>,
}

impl EngineState {
    fn record(&mut self, call: EngineCall) {
        log::trace!("engine call: {:?}", call);
        self.calls.push(call);
    }
}

/// Engine that keeps annotation state in memory and records every call.
///
/// Used by tests and by the headless host. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Rc<RefCell<EngineState>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls made so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    /// Number of recorded calls matching a predicate.
    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Forget the call log, keeping annotation state.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Annotations that have not been removed, in creation order.
    pub fn live_annotations(&self) -> Vec<AnnotationId> {
        let state = self.state.borrow();
        state
            .created
            .iter()
            .copied()
            .filter(|id| state.annotations.get(id).is_some_and(|a| !a.removed))
            .collect()
    }

    /// Live annotations bound to an element.
    pub fn live_on(&self, element: ElementId) -> Vec<AnnotationId> {
        let state = self.state.borrow();
        state
            .created
            .iter()
            .copied()
            .filter(|id| {
                state
                    .annotations
                    .get(id)
                    .is_some_and(|a| !a.removed && a.element == element)
            })
            .collect()
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<AnnotationSnapshot> {
        self.state.borrow().annotations.get(&id).cloned()
    }
}

impl AnnotationEngine for MemoryEngine {
    fn annotate(&self, element: &Element, config: &AnnotationConfig) -> AnnotationHandle {
        let id = AnnotationId::new();
        {
            let mut state = self.state.borrow_mut();
            state.annotations.insert(
                id,
                AnnotationSnapshot {
                    element: element.id,
                    config: config.clone(),
                    showing: false,
                    removed: false,
                },
            );
            state.created.push(id);
            state.record(EngineCall::Create {
                annotation: id,
                element: element.id,
                notation: config.notation,
            });
        }
        Rc::new(MemoryAnnotation {
            id,
            element: element.id,
            config: config.clone(),
            state: Rc::clone(&self.state),
        })
    }

    fn group(&self, members: &[AnnotationHandle]) -> Box<dyn AnnotationGroup> {
        self.state.borrow_mut().record(EngineCall::Group {
            members: members.iter().map(|m| m.id()).collect(),
        });
        Box::new(MemoryGroup {
            members: members.to_vec(),
            state: Rc::clone(&self.state),
        })
    }
}

struct MemoryAnnotation {
    id: AnnotationId,
    element: ElementId,
    config: AnnotationConfig,
    state: Rc<RefCell<EngineState>>,
}

impl MemoryAnnotation {
    /// Record the call and apply `f` to the stored state unless removed.
    fn apply(&self, call: EngineCall, f: impl FnOnce(&mut AnnotationSnapshot)) {
        let mut state = self.state.borrow_mut();
        state.record(call);
        match state.annotations.get_mut(&self.id) {
            Some(snapshot) if snapshot.removed => {
                log::warn!("ignoring call on removed annotation {}", self.id);
            }
            Some(snapshot) => f(snapshot),
            None => log::warn!("unknown annotation {}", self.id),
        }
    }
}

impl Annotation for MemoryAnnotation {
    fn id(&self) -> AnnotationId {
        self.id
    }

    fn element(&self) -> ElementId {
        self.element
    }

    fn config(&self) -> &AnnotationConfig {
        &self.config
    }

    fn is_showing(&self) -> bool {
        self.state
            .borrow()
            .annotations
            .get(&self.id)
            .is_some_and(|a| a.showing && !a.removed)
    }

    fn show(&self) {
        self.apply(EngineCall::Show { annotation: self.id }, |a| a.showing = true);
    }

    fn hide(&self) {
        self.apply(EngineCall::Hide { annotation: self.id }, |a| a.showing = false);
    }

    fn remove(&self) {
        self.apply(EngineCall::Remove { annotation: self.id }, |a| {
            a.showing = false;
            a.removed = true;
        });
    }
}

struct MemoryGroup {
    members: Vec<AnnotationHandle>,
    state: Rc<RefCell<EngineState>>,
}

impl MemoryGroup {
    /// Members sorted by `order` (lower first, unordered last, ties kept in
    /// build order), each starting when the previous one finishes.
    fn schedule(&self) -> Vec<(AnnotationHandle, Duration)> {
        let mut ordered: Vec<&AnnotationHandle> = self.members.iter().collect();
        ordered.sort_by_key(|m| {
            let order = m.config().order;
            (order.is_none(), order.unwrap_or_default())
        });

        let mut delay = Duration::ZERO;
        ordered
            .into_iter()
            .map(|member| {
                let config = member.config();
                let start = delay + config.animation_delay;
                delay = start + config.animation_duration;
                (Rc::clone(member), start)
            })
            .collect()
    }
}

impl AnnotationGroup for MemoryGroup {
    fn show(&self) {
        let schedule = self.schedule();
        self.state.borrow_mut().record(EngineCall::GroupShow {
            schedule: schedule
                .iter()
                .map(|(member, delay)| ScheduledShow {
                    annotation: member.id(),
                    delay_ms: delay.as_millis() as u64,
                })
                .collect(),
        });
        for (member, _) in schedule {
            member.show();
        }
    }

    fn members(&self) -> Vec<AnnotationId> {
        self.members.iter().map(|m| m.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AnnotationOptions;
    use kurbo::Rect;

    fn element() -> Element {
        Element::new(Rect::new(0.0, 0.0, 100.0, 20.0))
    }

    #[test]
    fn test_annotate_records_create() {
        let engine = MemoryEngine::new();
        let el = element();
        let handle = engine.annotate(&el, &AnnotationConfig::default());

        assert_eq!(engine.live_annotations(), vec![handle.id()]);
        assert_eq!(engine.live_on(el.id), vec![handle.id()]);
        assert!(matches!(engine.calls()[0], EngineCall::Create { .. }));
        assert!(!handle.is_showing());
    }

    #[test]
    fn test_show_hide_state() {
        let engine = MemoryEngine::new();
        let handle = engine.annotate(&element(), &AnnotationConfig::default());

        handle.show();
        assert!(handle.is_showing());
        handle.hide();
        assert!(!handle.is_showing());
    }

    #[test]
    fn test_removed_annotation_ignores_calls() {
        let engine = MemoryEngine::new();
        let handle = engine.annotate(&element(), &AnnotationConfig::default());

        handle.remove();
        handle.show();

        assert!(!handle.is_showing());
        assert!(engine.live_annotations().is_empty());
        assert!(engine.annotation(handle.id()).unwrap().removed);
    }

    #[test]
    fn test_group_schedule_follows_order() {
        let engine = MemoryEngine::new();
        let a = engine.annotate(
            &element(),
            &AnnotationOptions::default().with_order(2).to_config(),
        );
        let b = engine.annotate(
            &element(),
            &AnnotationOptions::default()
                .with_animation_duration(500)
                .to_config(),
        );
        let c = engine.annotate(
            &element(),
            &AnnotationOptions::default()
                .with_order(1)
                .with_animation_duration(300)
                .to_config(),
        );

        let group = engine.group(&[Rc::clone(&a), Rc::clone(&b), Rc::clone(&c)]);
        assert_eq!(group.members(), vec![a.id(), b.id(), c.id()]);
        group.show();

        let schedule = engine
            .calls()
            .into_iter()
            .find_map(|call| match call {
                EngineCall::GroupShow { schedule } => Some(schedule),
                _ => None,
            })
            .unwrap();
        let ids: Vec<_> = schedule.iter().map(|s| s.annotation).collect();
        let delays: Vec<_> = schedule.iter().map(|s| s.delay_ms).collect();

        assert_eq!(ids, vec![c.id(), a.id(), b.id()]);
        assert_eq!(delays, vec![0, 300, 1100]);
        assert!(a.is_showing() && b.is_showing() && c.is_showing());
    }

    #[test]
    fn test_group_schedule_adds_member_delay() {
        let engine = MemoryEngine::new();
        let a = engine.annotate(&element(), &AnnotationOptions::default().to_config());
        let b = engine.annotate(
            &element(),
            &AnnotationOptions::default()
                .with_animation_delay(200)
                .to_config(),
        );
        let c = engine.annotate(&element(), &AnnotationOptions::default().to_config());

        engine
            .group(&[Rc::clone(&a), Rc::clone(&b), Rc::clone(&c)])
            .show();

        let delays: Vec<_> = engine
            .calls()
            .into_iter()
            .find_map(|call| match call {
                EngineCall::GroupShow { schedule } => Some(schedule),
                _ => None,
            })
            .unwrap()
            .iter()
            .map(|s| s.delay_ms)
            .collect();
        assert_eq!(delays, vec![0, 1000, 1800]);
    }
}
