//! Grouped annotations that animate as one sequence.
//!
//! A [`GroupCoordinator`] owns a [`GroupRegistry`]. Controllers mounted
//! inside the group receive a clone of the registry and register their
//! handles with it instead of showing themselves. The coordinator then shows
//! the whole set through an engine group built from a registry snapshot.

use crate::engine::{AnnotationEngine, AnnotationGroup, AnnotationHandle, AnnotationId};
use crate::error::{AnnotationError, AnnotationResult};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Stable position of one member. Survives handle replacement.
pub type SlotId = u64;

struct RegistryEntry {
    slot: SlotId,
    handle: AnnotationHandle,
}

#[derive(Default)]
struct RegistryState {
    /// Registration order.
    members: Vec<RegistryEntry>,
    /// Bumped on every membership change.
    generation: u64,
    next_slot: SlotId,
}

impl RegistryState {
    fn position(&self, id: AnnotationId) -> Option<usize> {
        self.members.iter().position(|m| m.handle.id() == id)
    }
}

/// Ordered set of handles registered by the controllers inside a group.
///
/// Cloning shares the same registry; a clone is what gets passed down to
/// descendants.
#[derive(Clone, Default)]
pub struct GroupRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handle. Returns `false` if it is already a member.
    pub fn register(&self, handle: AnnotationHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let id = handle.id();
        if state.position(id).is_some() {
            log::trace!("annotation {} already registered", id);
            return false;
        }
        let slot = state.next_slot;
        state.next_slot += 1;
        state.members.push(RegistryEntry { slot, handle });
        state.generation += 1;
        log::debug!("registered annotation {} ({} members)", id, state.members.len());
        true
    }

    /// Swap `old` for `handle` in place, keeping its slot and position.
    ///
    /// Appends like [`register`](Self::register) when `old` is not a member.
    pub fn replace(&self, old: AnnotationId, handle: AnnotationHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(index) = state.position(old) else {
            drop(state);
            return self.register(handle);
        };
        let id = handle.id();
        if id != old && state.position(id).is_some() {
            return false;
        }
        state.members[index].handle = handle;
        state.generation += 1;
        log::debug!("replaced annotation {} with {}", old, id);
        true
    }

    /// Remove a handle. Returns `false` if it was not a member.
    pub fn deregister(&self, id: AnnotationId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(index) = state.position(id) else {
            return false;
        };
        state.members.remove(index);
        state.generation += 1;
        log::debug!("deregistered annotation {} ({} members)", id, state.members.len());
        true
    }

    /// Current members, in registration order.
    pub fn snapshot(&self) -> Vec<AnnotationHandle> {
        self.state
            .borrow()
            .members
            .iter()
            .map(|m| Rc::clone(&m.handle))
            .collect()
    }

    /// Current members with their slots, in registration order.
    pub fn entries(&self) -> Vec<(SlotId, AnnotationHandle)> {
        self.state
            .borrow()
            .members
            .iter()
            .map(|m| (m.slot, Rc::clone(&m.handle)))
            .collect()
    }

    pub fn ids(&self) -> Vec<AnnotationId> {
        self.state
            .borrow()
            .members
            .iter()
            .map(|m| m.handle.id())
            .collect()
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.state.borrow().position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().members.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Check if two registries are the same shared instance.
    pub fn same(&self, other: &GroupRegistry) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("members", &self.ids())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Strict accessor for code paths where group membership is mandatory.
///
/// Controllers do not use this: for them a missing group means standalone.
pub fn require_group(group: Option<&GroupRegistry>) -> AnnotationResult<&GroupRegistry> {
    group.ok_or(AnnotationError::MissingGroup)
}

/// Drives show/hide for every annotation registered in its group.
pub struct GroupCoordinator {
    engine: Rc<dyn AnnotationEngine>,
    registry: GroupRegistry,
    visible: bool,
    /// Engine group built at the last show. Dropped as soon as the
    /// membership changes.
    aggregate: Option<Box<dyn AnnotationGroup>>,
    /// Registry generation the coordinator last acted on.
    synced_generation: u64,
    /// Slots the group has shown since it last turned visible. A member
    /// that hid itself stays in here, so the group does not show it again.
    launched: HashSet<SlotId>,
}

impl GroupCoordinator {
    pub fn new(engine: Rc<dyn AnnotationEngine>, visible: bool) -> Self {
        Self {
            engine,
            registry: GroupRegistry::new(),
            visible,
            aggregate: None,
            synced_generation: 0,
            launched: HashSet::new(),
        }
    }

    /// The registry to hand to descendants.
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Members of the current aggregate, if one is live.
    pub fn aggregate_members(&self) -> Option<Vec<AnnotationId>> {
        self.aggregate.as_ref().map(|a| a.members())
    }

    /// Apply a new visibility intent.
    ///
    /// Turning on shows all members as one engine group. Turning off hides
    /// each member that is showing, one by one.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            self.settle();
            return;
        }
        self.visible = visible;
        if visible {
            self.sync_membership();
            self.launched.clear();
            self.show_pending();
        } else {
            self.hide_all();
            self.settle();
        }
    }

    /// Reconcile after a batch of mounts and unmounts.
    ///
    /// A membership change invalidates the aggregate. While visible, members
    /// that joined since the last show are shown as a new engine group;
    /// members already shown (or that hid themselves) are left alone.
    pub fn settle(&mut self) {
        if self.registry.generation() == self.synced_generation {
            return;
        }
        self.sync_membership();
        if self.visible {
            self.show_pending();
        }
    }

    /// Discard the aggregate when the group unmounts.
    pub fn detach(&mut self) {
        if self.aggregate.take().is_some() {
            log::debug!("group detached, aggregate dropped");
        }
    }

    fn sync_membership(&mut self) {
        if self.aggregate.take().is_some() {
            log::trace!("membership changed, aggregate dropped");
        }
        self.synced_generation = self.registry.generation();
    }

    /// Show every member whose slot has not been shown yet.
    fn show_pending(&mut self) {
        let entries = self.registry.entries();
        self.launched
            .retain(|slot| entries.iter().any(|(s, _)| s == slot));

        let (slots, members): (Vec<SlotId>, Vec<AnnotationHandle>) = entries
            .into_iter()
            .filter(|(slot, _)| !self.launched.contains(slot))
            .unzip();
        if members.is_empty() {
            log::trace!("group show skipped: no pending members");
            return;
        }
        log::debug!("showing group of {} annotations", members.len());
        let aggregate = self.engine.group(&members);
        aggregate.show();
        self.aggregate = Some(aggregate);
        self.launched.extend(slots);
    }

    fn hide_all(&mut self) {
        for member in self.registry.snapshot() {
            if member.is_showing() {
                member.hide();
            }
        }
        self.launched.clear();
    }
}

impl Drop for GroupCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::AnnotationController;
    use crate::element::Element;
    use crate::engine::{EngineCall, MemoryEngine};
    use crate::options::{
        AnnotationConfig, AnnotationOptions, BracketPosition, Brackets, NotationType,
    };
    use kurbo::Rect;

    fn setup() -> (MemoryEngine, Rc<dyn AnnotationEngine>) {
        let engine = MemoryEngine::new();
        let shared: Rc<dyn AnnotationEngine> = Rc::new(engine.clone());
        (engine, shared)
    }

    fn line(index: usize) -> Element {
        let y = index as f64 * 24.0;
        Element::new(Rect::new(0.0, y, 200.0, y + 20.0))
    }

    fn mount_children(
        shared: &Rc<dyn AnnotationEngine>,
        group: &GroupCoordinator,
        count: usize,
    ) -> Vec<AnnotationController> {
        (0..count)
            .map(|i| {
                let options = AnnotationOptions::new(NotationType::Bracket)
                    .with_brackets(Brackets::one(BracketPosition::Left));
                let mut child =
                    AnnotationController::new(Rc::clone(shared), options, Some(group.registry()));
                child.attach(line(i));
                child
            })
            .collect()
    }

    fn group_shows(engine: &MemoryEngine) -> usize {
        engine.count(|c| matches!(c, EngineCall::GroupShow { .. }))
    }

    #[test]
    fn test_register_is_unique_and_ordered() {
        let (engine, _) = setup();
        let registry = GroupRegistry::new();
        let a = engine.annotate(&line(0), &AnnotationConfig::default());
        let b = engine.annotate(&line(1), &AnnotationConfig::default());

        assert!(registry.register(Rc::clone(&a)));
        assert!(registry.register(Rc::clone(&b)));
        assert!(!registry.register(Rc::clone(&a)));

        assert_eq!(registry.ids(), vec![a.id(), b.id()]);
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn test_deregister_unknown_is_noop() {
        let (engine, _) = setup();
        let registry = GroupRegistry::new();
        let a = engine.annotate(&line(0), &AnnotationConfig::default());

        assert!(!registry.deregister(a.id()));
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn test_clones_share_members() {
        let (engine, _) = setup();
        let registry = GroupRegistry::new();
        let child_view = registry.clone();
        let a = engine.annotate(&line(0), &AnnotationConfig::default());

        child_view.register(Rc::clone(&a));
        assert!(registry.contains(a.id()));
        assert!(registry.same(&child_view));
    }

    #[test]
    fn test_require_group() {
        let registry = GroupRegistry::new();
        assert_eq!(require_group(None).unwrap_err(), AnnotationError::MissingGroup);
        assert!(require_group(Some(&registry)).is_ok());
    }

    #[test]
    fn test_group_show_builds_from_mount_order() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let children = mount_children(&shared, &group, 3);
        group.settle();

        assert!(children.iter().all(|c| !c.is_showing()));
        assert_eq!(group_shows(&engine), 0);

        group.set_visible(true);

        let expected: Vec<_> = children.iter().map(|c| c.handle().unwrap().id()).collect();
        let built: Vec<_> = engine
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Group { members } => Some(members),
                _ => None,
            })
            .collect();
        assert_eq!(built, vec![expected.clone()]);
        assert_eq!(group.aggregate_members(), Some(expected));
        assert_eq!(group_shows(&engine), 1);
        assert!(children.iter().all(|c| c.is_showing()));
    }

    #[test]
    fn test_group_hide_is_per_member() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let children = mount_children(&shared, &group, 3);
        group.set_visible(true);
        engine.clear_calls();

        group.set_visible(false);

        for child in &children {
            let id = child.handle().unwrap().id();
            assert_eq!(
                engine.count(|c| *c == EngineCall::Hide { annotation: id }),
                1
            );
            assert!(!child.is_showing());
        }
        assert_eq!(group_shows(&engine), 0);
        assert_eq!(engine.count(|c| matches!(c, EngineCall::Group { .. })), 0);
    }

    #[test]
    fn test_empty_group_is_noop() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(shared, false);

        group.set_visible(true);
        group.set_visible(false);

        assert!(engine.calls().is_empty());
        assert!(group.aggregate_members().is_none());
    }

    #[test]
    fn test_unmounted_child_left_out_of_aggregate() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let mut children = mount_children(&shared, &group, 3);
        let removed = children.remove(1);
        let removed_id = removed.handle().unwrap().id();
        drop(removed);
        group.settle();

        group.set_visible(true);

        let members = group.aggregate_members().unwrap();
        assert_eq!(members.len(), 2);
        assert!(!members.contains(&removed_id));
        assert_eq!(
            engine.count(|c| *c == EngineCall::Show { annotation: removed_id }),
            0
        );
    }

    #[test]
    fn test_late_member_rebuilds_visible_group() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), true);
        let mut children = mount_children(&shared, &group, 2);
        group.settle();
        assert_eq!(group_shows(&engine), 1);

        let mut late = AnnotationController::new(
            Rc::clone(&shared),
            AnnotationOptions::new(NotationType::Underline),
            Some(group.registry()),
        );
        late.attach(line(5));
        assert!(!late.is_showing());
        group.settle();

        assert_eq!(group_shows(&engine), 2);
        assert!(late.is_showing());
        assert_eq!(
            group.aggregate_members(),
            Some(vec![late.handle().unwrap().id()])
        );

        // Settling again without membership changes does nothing.
        group.settle();
        assert_eq!(group_shows(&engine), 2);
        children.clear();
    }

    #[test]
    fn test_options_change_keeps_mount_order() {
        let (_engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let mut children = mount_children(&shared, &group, 3);
        group.settle();

        children[0].set_options(AnnotationOptions::new(NotationType::Circle));
        group.settle();

        let expected: Vec<_> = children.iter().map(|c| c.handle().unwrap().id()).collect();
        assert_eq!(group.registry().ids(), expected);

        group.set_visible(true);
        assert_eq!(group.aggregate_members(), Some(expected));
    }

    #[test]
    fn test_options_change_in_visible_group_keeps_state() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), true);
        let mut children = mount_children(&shared, &group, 3);
        group.settle();
        assert_eq!(group_shows(&engine), 1);

        children[1].set_options(AnnotationOptions::new(NotationType::Underline));
        group.settle();

        assert!(children.iter().all(|c| c.is_showing()));
        assert_eq!(group_shows(&engine), 1);
    }

    #[test]
    fn test_self_hidden_member_stays_hidden_on_membership_change() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let mut children: Vec<_> = (0..3)
            .map(|i| {
                let mut child = AnnotationController::new(
                    Rc::clone(&shared),
                    AnnotationOptions::new(NotationType::Box),
                    Some(group.registry()),
                )
                .with_visible(true);
                child.attach(line(i));
                child
            })
            .collect();
        group.settle();
        group.set_visible(true);
        assert!(children.iter().all(|c| c.is_showing()));

        children[0].set_visible(false);
        assert!(!children[0].is_showing());

        children.pop();
        group.settle();

        assert!(!children[0].is_showing());
        assert!(children[1].is_showing());
        assert_eq!(group_shows(&engine), 1);

        // Cycling the group brings everyone back together.
        group.set_visible(false);
        group.set_visible(true);
        assert!(children.iter().all(|c| c.is_showing()));
    }

    #[test]
    fn test_replace_keeps_position() {
        let (engine, _) = setup();
        let registry = GroupRegistry::new();
        let a = engine.annotate(&line(0), &AnnotationConfig::default());
        let b = engine.annotate(&line(1), &AnnotationConfig::default());
        let a2 = engine.annotate(&line(0), &AnnotationConfig::default());
        registry.register(Rc::clone(&a));
        registry.register(Rc::clone(&b));
        let slots: Vec<_> = registry.entries().into_iter().map(|(s, _)| s).collect();

        assert!(registry.replace(a.id(), Rc::clone(&a2)));

        assert_eq!(registry.ids(), vec![a2.id(), b.id()]);
        let after: Vec<_> = registry.entries().into_iter().map(|(s, _)| s).collect();
        assert_eq!(after, slots);
        assert_eq!(registry.generation(), 3);
        assert!(!registry.contains(a.id()));
    }

    #[test]
    fn test_replace_unknown_appends() {
        let (engine, _) = setup();
        let registry = GroupRegistry::new();
        let a = engine.annotate(&line(0), &AnnotationConfig::default());
        let b = engine.annotate(&line(1), &AnnotationConfig::default());

        assert!(registry.replace(a.id(), Rc::clone(&b)));
        assert_eq!(registry.ids(), vec![b.id()]);
    }

    #[test]
    fn test_group_initially_visible_shows_on_first_settle() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), true);
        let children = mount_children(&shared, &group, 2);

        assert!(children.iter().all(|c| !c.is_showing()));
        group.settle();

        assert_eq!(group_shows(&engine), 1);
        assert!(children.iter().all(|c| c.is_showing()));
    }

    #[test]
    fn test_hidden_group_drops_stale_aggregate() {
        let (_engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let mut children = mount_children(&shared, &group, 2);
        group.set_visible(true);
        group.set_visible(false);
        assert!(group.aggregate_members().is_some());

        children.pop();
        group.settle();
        assert!(group.aggregate_members().is_none());
    }

    #[test]
    fn test_child_hides_itself_inside_visible_group() {
        let (engine, shared) = setup();
        let mut group = GroupCoordinator::new(Rc::clone(&shared), false);
        let mut child = AnnotationController::new(
            Rc::clone(&shared),
            AnnotationOptions::new(NotationType::Box),
            Some(group.registry()),
        )
        .with_visible(true);
        child.attach(line(0));
        assert!(!child.is_showing());

        group.set_visible(true);
        assert!(child.is_showing());

        child.set_visible(false);
        assert!(!child.is_showing());
        assert!(group.visible());
        assert_eq!(group_shows(&engine), 1);
    }
}
