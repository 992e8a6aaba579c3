//! Systems: an eligibility predicate plus per-entity lifecycle hooks.
//!
//! Application code implements [`System`]. The coordinator wraps each added
//! system in a [`RegisteredSystem`], which owns the ordered member list and
//! keeps it in step with every member's own membership cache.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use engine_component::EntityId;

use crate::entity::Entity;
use crate::error::{EcsError, Hook};

/// Identifies a system registered with an [`Ecs`](crate::Ecs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u64);

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Behaviour applied to every entity that passes [`System::test`].
///
/// `enter` and `exit` fire on membership transitions, which only happen
/// during reconciliation or explicit add/remove calls on the coordinator.
/// Hooks receive the entity but never the coordinator: component changes a
/// hook makes are picked up by the next reconciliation.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use engine_ecs::{Entity, System};
///
/// struct Gravity;
///
/// impl System for Gravity {
///     fn test(&self, entity: &Entity) -> bool {
///         entity.has_component("velocity")
///     }
///
///     fn enter(&mut self, _entity: &mut Entity) -> anyhow::Result<()> { Ok(()) }
///     fn exit(&mut self, _entity: &mut Entity) -> anyhow::Result<()> { Ok(()) }
///
///     fn update(&mut self, _entity: &mut Entity, _elapsed: Duration) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait System {
    /// Eligibility predicate. Must be pure, deterministic and cheap: it runs
    /// for every dirty entity on every reconciliation.
    fn test(&self, _entity: &Entity) -> bool {
        false
    }

    /// Called after `entity` becomes a member.
    fn enter(&mut self, entity: &mut Entity) -> anyhow::Result<()>;

    /// Called after `entity` stops being a member.
    fn exit(&mut self, entity: &mut Entity) -> anyhow::Result<()>;

    /// Called once per member on every tick the system runs.
    fn update(&mut self, entity: &mut Entity, elapsed: Duration) -> anyhow::Result<()>;

    /// Called before the first `update` of a batch.
    fn pre_update(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after the last `update` of a batch.
    fn post_update(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Registration parameters for a system.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Human-readable name used in logs and errors.
    pub name: String,
    /// The system runs on ticks where `tick % frequency == 0`.
    pub frequency: u32,
}

impl SystemConfig {
    /// A system that runs every tick.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frequency: 1,
        }
    }

    /// Run the system once every `frequency` ticks.
    #[must_use]
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }
}

/// A system owned by the coordinator, together with its member list.
pub struct RegisteredSystem {
    id: SystemId,
    config: SystemConfig,
    system: Box<dyn System>,
    /// Members in the order they joined.
    entities: Vec<EntityId>,
}

impl std::fmt::Debug for RegisteredSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredSystem")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

impl RegisteredSystem {
    pub(crate) fn new(id: SystemId, config: SystemConfig, system: Box<dyn System>) -> Self {
        Self {
            id,
            config,
            system,
            entities: Vec::new(),
        }
    }

    /// Returns the system's id.
    #[must_use]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Returns the system's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the tick divisor.
    #[must_use]
    pub fn frequency(&self) -> u32 {
        self.config.frequency
    }

    /// Current members in join order.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    /// Evaluate the eligibility predicate.
    #[must_use]
    pub fn test(&self, entity: &Entity) -> bool {
        self.system.test(entity)
    }

    /// Returns `true` if the system should run on tick `tick`.
    #[must_use]
    pub fn is_due(&self, tick: u64) -> bool {
        tick % u64::from(self.config.frequency) == 0
    }

    /// Record membership on both sides, then fire `enter`.
    ///
    /// The caller guarantees `entity` is not already a member.
    pub(crate) fn add_entity(&mut self, entity: &mut Entity) -> Result<(), EcsError> {
        self.entities.push(entity.id());
        entity.add_system(self.id);
        trace!(system = %self.config.name, entity = %entity.id(), "enter");
        self.system
            .enter(entity)
            .map_err(|source| self.hook_error(Hook::Enter, source))
    }

    /// Drop membership on both sides. `exit` fires only if `entity` was
    /// actually a member; returns whether it was.
    pub(crate) fn remove_entity(&mut self, entity: &mut Entity) -> Result<bool, EcsError> {
        entity.remove_system(self.id);
        let Some(pos) = self.entities.iter().position(|id| *id == entity.id()) else {
            return Ok(false);
        };
        self.entities.remove(pos);
        trace!(system = %self.config.name, entity = %entity.id(), "exit");
        self.system
            .exit(entity)
            .map_err(|source| self.hook_error(Hook::Exit, source))?;
        Ok(true)
    }

    /// Run one batch: `pre_update`, `update` for each member, `post_update`.
    ///
    /// Members are snapshotted when the batch starts.
    pub(crate) fn update_all(
        &mut self,
        entities: &mut HashMap<EntityId, Entity>,
        elapsed: Duration,
    ) -> Result<(), EcsError> {
        self.system
            .pre_update()
            .map_err(|source| self.hook_error(Hook::PreUpdate, source))?;

        let members = self.entities.clone();
        for id in members {
            if let Some(entity) = entities.get_mut(&id) {
                self.system
                    .update(entity, elapsed)
                    .map_err(|source| self.hook_error(Hook::Update, source))?;
            }
        }

        self.system
            .post_update()
            .map_err(|source| self.hook_error(Hook::PostUpdate, source))
    }

    /// Fire `exit` for every member, oldest first, leaving the system empty.
    ///
    /// If a hook fails, the members not yet processed stay members.
    pub(crate) fn dispose(
        &mut self,
        entities: &mut HashMap<EntityId, Entity>,
    ) -> Result<(), EcsError> {
        while let Some(&id) = self.entities.first() {
            match entities.get_mut(&id) {
                Some(entity) => {
                    self.remove_entity(entity)?;
                }
                None => {
                    self.entities.remove(0);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Box<dyn System> {
        self.system
    }

    fn hook_error(&self, hook: Hook, source: anyhow::Error) -> EcsError {
        EcsError::Hook {
            system: self.config.name.clone(),
            hook,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use engine_component::{Component, EntityAllocator};

    use super::*;

    #[derive(Default)]
    struct Counting {
        log: Rc<RefCell<Vec<String>>>,
        fail_exit: bool,
    }

    impl System for Counting {
        fn test(&self, entity: &Entity) -> bool {
            entity.has_component("tag")
        }

        fn enter(&mut self, entity: &mut Entity) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("enter {}", entity.id().id()));
            Ok(())
        }

        fn exit(&mut self, entity: &mut Entity) -> anyhow::Result<()> {
            if self.fail_exit {
                anyhow::bail!("exit refused");
            }
            self.log.borrow_mut().push(format!("exit {}", entity.id().id()));
            Ok(())
        }

        fn update(&mut self, entity: &mut Entity, _elapsed: Duration) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("update {}", entity.id().id()));
            Ok(())
        }

        fn pre_update(&mut self) -> anyhow::Result<()> {
            self.log.borrow_mut().push("pre".to_string());
            Ok(())
        }

        fn post_update(&mut self) -> anyhow::Result<()> {
            self.log.borrow_mut().push("post".to_string());
            Ok(())
        }
    }

    struct Unconfigured;

    impl System for Unconfigured {
        fn enter(&mut self, _entity: &mut Entity) -> anyhow::Result<()> {
            Ok(())
        }

        fn exit(&mut self, _entity: &mut Entity) -> anyhow::Result<()> {
            Ok(())
        }

        fn update(&mut self, _entity: &mut Entity, _elapsed: Duration) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registered(system: impl System + 'static) -> RegisteredSystem {
        RegisteredSystem::new(SystemId(1), SystemConfig::new("counting"), Box::new(system))
    }

    #[test]
    fn test_default_predicate_rejects_everything() {
        let mut ids = EntityAllocator::new();
        let e = Entity::with_components(&mut ids, [("tag", Component::new())]);
        assert!(!registered(Unconfigured).test(&e));
    }

    #[test]
    fn test_add_and_remove_keep_both_sides_in_step() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sys = registered(Counting {
            log: log.clone(),
            ..Default::default()
        });
        let mut ids = EntityAllocator::new();
        let mut e = Entity::new(&mut ids);

        sys.add_entity(&mut e).unwrap();
        assert!(sys.contains(e.id()));
        assert!(e.is_member_of(sys.id()));

        assert!(sys.remove_entity(&mut e).unwrap());
        assert!(!sys.contains(e.id()));
        assert!(!e.is_member_of(sys.id()));

        // Second removal is defensive: no exit.
        assert!(!sys.remove_entity(&mut e).unwrap());
        assert_eq!(*log.borrow(), vec!["enter 1", "exit 1"]);
    }

    #[test]
    fn test_update_all_runs_in_member_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sys = registered(Counting {
            log: log.clone(),
            ..Default::default()
        });
        let mut ids = EntityAllocator::new();
        let mut table = HashMap::new();
        for _ in 0..3 {
            let mut e = Entity::new(&mut ids);
            sys.add_entity(&mut e).unwrap();
            table.insert(e.id(), e);
        }
        log.borrow_mut().clear();

        sys.update_all(&mut table, Duration::from_millis(16)).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["pre", "update 1", "update 2", "update 3", "post"]
        );
    }

    #[test]
    fn test_dispose_exits_every_member() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sys = registered(Counting {
            log: log.clone(),
            ..Default::default()
        });
        let mut ids = EntityAllocator::new();
        let mut table = HashMap::new();
        for _ in 0..2 {
            let mut e = Entity::new(&mut ids);
            sys.add_entity(&mut e).unwrap();
            table.insert(e.id(), e);
        }
        log.borrow_mut().clear();

        sys.dispose(&mut table).unwrap();

        assert!(sys.entities().is_empty());
        assert!(table.values().all(|e| e.systems().is_empty()));
        assert_eq!(*log.borrow(), vec!["exit 1", "exit 2"]);
    }

    #[test]
    fn test_hook_failure_is_reported_with_system_name() {
        let mut sys = registered(Counting {
            fail_exit: true,
            ..Default::default()
        });
        let mut ids = EntityAllocator::new();
        let mut e = Entity::new(&mut ids);
        sys.add_entity(&mut e).unwrap();

        let err = sys.remove_entity(&mut e).unwrap_err();
        match err {
            EcsError::Hook { system, hook, .. } => {
                assert_eq!(system, "counting");
                assert_eq!(hook, Hook::Exit);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Membership was already dropped on both sides.
        assert!(sys.entities().is_empty());
        assert!(e.systems().is_empty());
    }

    #[test]
    fn test_frequency_gate() {
        let sys = RegisteredSystem::new(
            SystemId(1),
            SystemConfig::new("every-third").with_frequency(3),
            Box::new(Unconfigured),
        );
        let due: Vec<u64> = (0..10).filter(|t| sys.is_due(*t)).collect();
        assert_eq!(due, vec![0, 3, 6, 9]);
    }
}
