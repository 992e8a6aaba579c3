//! The ECS coordinator.
//!
//! [`Ecs`] owns the entity population and the ordered system list. Entities
//! whose component set changes push themselves onto a dirty queue; each tick
//! the coordinator drains that queue, re-tests the dirty entities against
//! every system, and then runs every system whose frequency gate is open.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use engine_component::EntityId;

use crate::clock::Clock;
use crate::config::{EcsConfig, FrequencyGating};
use crate::entity::{DirtyChannel, Entity};
use crate::error::EcsError;
use crate::system::{RegisteredSystem, System, SystemConfig, SystemId};

/// Owner of entities and systems; drives reconciliation and ticking.
pub struct Ecs {
    config: EcsConfig,
    clock: Box<dyn Clock>,
    /// Entity storage, keyed by id.
    entities: HashMap<EntityId, Entity>,
    /// Population in insertion order.
    order: Vec<EntityId>,
    /// Active systems in evaluation order.
    systems: Vec<RegisteredSystem>,
    next_system_id: u64,
    /// Entities awaiting re-evaluation.
    dirty: DirtyChannel,
    update_counter: u64,
    last_update: u64,
}

impl std::fmt::Debug for Ecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ecs")
            .field("config", &self.config)
            .field("entities", &self.order.len())
            .field("systems", &self.systems)
            .field("dirty", &self.dirty.len())
            .field("update_counter", &self.update_counter)
            .field("last_update", &self.last_update)
            .finish_non_exhaustive()
    }
}

impl Ecs {
    /// Create a coordinator with the default configuration.
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self::with_config(EcsConfig::default(), clock)
    }

    /// Create a coordinator with an explicit configuration.
    pub fn with_config(config: EcsConfig, clock: impl Clock + 'static) -> Self {
        let last_update = clock.now_ms();
        Self {
            config,
            clock: Box::new(clock),
            entities: HashMap::new(),
            order: Vec::new(),
            systems: Vec::new(),
            next_system_id: 1,
            dirty: DirtyChannel::default(),
            update_counter: 0,
            last_update,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    // -- Entities --

    /// Add an entity to the population.
    ///
    /// The entity is marked dirty so its membership is computed on the next
    /// tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateEntity`] if an entity with the same id is
    /// already present.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId, EcsError> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(EcsError::DuplicateEntity(id));
        }
        entity.attach(self.dirty.clone());
        self.entities.insert(id, entity);
        self.order.push(id);
        debug!(entity = %id, population = self.order.len(), "entity added");
        Ok(id)
    }

    /// Remove an entity, firing `exit` on every system it belongs to.
    ///
    /// Returns `Ok(None)` if no entity has this id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Hook`] if an `exit` hook fails. The entity then
    /// stays in the population, still a member of the systems it had not yet
    /// left.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Option<Entity>, EcsError> {
        if !self.entities.contains_key(&id) {
            return Ok(None);
        }
        self.dispose_entity(id)?;

        self.dirty.remove(id);
        self.order.retain(|e| *e != id);
        let Some(mut entity) = self.entities.remove(&id) else {
            return Ok(None);
        };
        entity.detach();
        debug!(entity = %id, population = self.order.len(), "entity removed");
        Ok(Some(entity))
    }

    /// Look up an entity by id.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access to an entity. Component changes made through the
    /// returned reference are picked up on the next tick.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns `true` if the entity is in the population.
    #[must_use]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Returns the population size.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// Returns the number of entities waiting for re-evaluation.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    // -- Systems --

    /// Append a system and immediately admit every eligible entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidFrequency`] for a zero frequency, or
    /// [`EcsError::Hook`] if an `enter` hook fails during back-fill. In the
    /// latter case the system stays registered with the members admitted so
    /// far; the rest are admitted when next reconciled.
    pub fn add_system(
        &mut self,
        config: SystemConfig,
        system: impl System + 'static,
    ) -> Result<SystemId, EcsError> {
        if config.frequency == 0 {
            return Err(EcsError::InvalidFrequency {
                system: config.name,
                frequency: config.frequency,
            });
        }

        let id = SystemId(self.next_system_id);
        self.next_system_id += 1;
        info!(system = %config.name, %id, frequency = config.frequency, "system added");
        self.systems.push(RegisteredSystem::new(id, config, Box::new(system)));

        let Some(registered) = self.systems.last_mut() else {
            return Ok(id);
        };
        let mut failure = None;
        for (index, entity_id) in self.order.iter().enumerate() {
            let Some(entity) = self.entities.get_mut(entity_id) else {
                continue;
            };
            if registered.test(entity) && !registered.contains(*entity_id) {
                if let Err(err) = registered.add_entity(entity) {
                    failure = Some((index, err));
                    break;
                }
            }
        }
        if let Some((index, err)) = failure {
            let rest = self.order[index + 1..].to_vec();
            self.requeue(&rest);
            return Err(err);
        }
        Ok(id)
    }

    /// Remove a system, firing `exit` for every member.
    ///
    /// Returns `Ok(None)` if no system has this id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Hook`] if an `exit` hook fails; the system then
    /// stays registered with its remaining members.
    pub fn remove_system(&mut self, id: SystemId) -> Result<Option<Box<dyn System>>, EcsError> {
        let Some(pos) = self.systems.iter().position(|s| s.id() == id) else {
            return Ok(None);
        };
        self.systems[pos].dispose(&mut self.entities)?;
        let registered = self.systems.remove(pos);
        info!(system = %registered.name(), %id, "system removed");
        Ok(Some(registered.into_inner()))
    }

    /// Look up a registered system.
    #[must_use]
    pub fn system(&self, id: SystemId) -> Option<&RegisteredSystem> {
        self.systems.iter().find(|s| s.id() == id)
    }

    /// Find a system by name. Returns the first match in evaluation order.
    #[must_use]
    pub fn system_by_name(&self, name: &str) -> Option<SystemId> {
        self.systems.iter().find(|s| s.name() == name).map(RegisteredSystem::id)
    }

    /// Systems in evaluation order.
    pub fn systems(&self) -> impl Iterator<Item = &RegisteredSystem> {
        self.systems.iter()
    }

    /// Members of a system in join order.
    #[must_use]
    pub fn members(&self, id: SystemId) -> Option<&[EntityId]> {
        self.system(id).map(RegisteredSystem::entities)
    }

    /// Returns the number of active systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // -- Ticking --

    /// Number of completed ticks.
    #[must_use]
    pub fn update_counter(&self) -> u64 {
        self.update_counter
    }

    /// Clock reading taken at the end of the previous tick (or at
    /// construction).
    #[must_use]
    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    /// Re-test every dirty entity against every system and fix membership.
    ///
    /// Each entity's dirty flag is cleared before it is tested, so component
    /// changes made by `enter`/`exit` hooks queue it again for the next
    /// reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Hook`] if a hook fails. Entities not yet processed
    /// (and the one being processed) are put back in the queue.
    pub fn clean_dirty_entities(&mut self) -> Result<(), EcsError> {
        let dirty = self.dirty.drain();
        let mut entered = 0usize;
        let mut exited = 0usize;

        let mut failure = None;
        'entities: for (index, id) in dirty.iter().enumerate() {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            entity.clear_systems_dirty();

            for registered in &mut self.systems {
                let member = registered.contains(*id);
                let eligible = registered.test(entity);
                let result = match (member, eligible) {
                    (false, true) => registered.add_entity(entity).map(|()| entered += 1),
                    (true, false) => registered.remove_entity(entity).map(|_| exited += 1),
                    _ => Ok(()),
                };
                if let Err(err) = result {
                    failure = Some((index, err));
                    break 'entities;
                }
            }
        }
        if let Some((index, err)) = failure {
            self.requeue(&dirty[index..]);
            return Err(err);
        }

        debug!(
            dirty = dirty.len(),
            entered,
            exited,
            tick = self.update_counter,
            "reconciled dirty entities"
        );
        Ok(())
    }

    /// Run one tick.
    ///
    /// Systems run in registration order when `update_counter % frequency`
    /// is zero. Dirty entities are reconciled before any system runs. What a
    /// closed gate does to the systems after it depends on
    /// [`EcsConfig::gating`].
    ///
    /// # Errors
    ///
    /// Returns the first hook failure. The rest of the tick is skipped and
    /// the tick counter is not advanced.
    pub fn update(&mut self) -> Result<(), EcsError> {
        let now = self.clock.now_ms();
        let elapsed = Duration::from_millis(now.saturating_sub(self.last_update));

        for index in 0..self.systems.len() {
            if !self.systems[index].is_due(self.update_counter) {
                match self.config.gating {
                    FrequencyGating::Independent => continue,
                    FrequencyGating::BreakOnSkip => break,
                }
            }
            if !self.dirty.is_empty() {
                self.clean_dirty_entities()?;
            }
            self.systems[index].update_all(&mut self.entities, elapsed)?;
        }

        self.update_counter += 1;
        self.last_update = now;
        Ok(())
    }

    /// Fire `exit` on every system the entity belongs to, in registration
    /// order, then drop cached ids of systems that are no longer registered.
    fn dispose_entity(&mut self, id: EntityId) -> Result<(), EcsError> {
        let Some(entity) = self.entities.get_mut(&id) else {
            return Ok(());
        };
        for registered in &mut self.systems {
            if entity.is_member_of(registered.id()) {
                registered.remove_entity(entity)?;
            }
        }
        for stale in entity.systems().to_vec() {
            entity.remove_system(stale);
        }
        Ok(())
    }

    fn requeue(&mut self, ids: &[EntityId]) {
        for id in ids {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.requeue();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{Component, EntityAllocator};

    use super::*;
    use crate::clock::ManualClock;

    struct Requires(&'static str);

    impl System for Requires {
        fn test(&self, entity: &Entity) -> bool {
            entity.has_component(self.0)
        }

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

    #[test]
    fn test_add_entity_marks_dirty() {
        let mut ecs = Ecs::new(ManualClock::new());
        let mut ids = EntityAllocator::new();
        let id = ecs.add_entity(Entity::new(&mut ids)).unwrap();
        assert_eq!(ecs.entity_count(), 1);
        assert_eq!(ecs.dirty_count(), 1);
        assert!(ecs.get_entity(id).unwrap().is_systems_dirty());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut ecs = Ecs::new(ManualClock::new());
        let mut a = EntityAllocator::new();
        let mut b = EntityAllocator::new();
        ecs.add_entity(Entity::new(&mut a)).unwrap();
        let err = ecs.add_entity(Entity::new(&mut b)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateEntity(id) if id.id() == 1));
        assert_eq!(ecs.entity_count(), 1);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut ecs = Ecs::new(ManualClock::new());
        assert!(ecs.remove_entity(EntityId(99)).unwrap().is_none());
        assert!(ecs.remove_system(SystemId(99)).unwrap().is_none());
        assert!(ecs.get_entity(EntityId(99)).is_none());
    }

    #[test]
    fn test_remove_entity_clears_dirty_queue() {
        let mut ecs = Ecs::new(ManualClock::new());
        let mut ids = EntityAllocator::new();
        let id = ecs.add_entity(Entity::new(&mut ids)).unwrap();
        let removed = ecs.remove_entity(id).unwrap().unwrap();
        assert_eq!(removed.id(), id);
        assert!(!removed.is_attached());
        assert_eq!(ecs.dirty_count(), 0);
        assert_eq!(ecs.entity_count(), 0);
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let mut ecs = Ecs::new(ManualClock::new());
        let err = ecs
            .add_system(SystemConfig::new("never").with_frequency(0), Requires("x"))
            .unwrap_err();
        assert!(matches!(err, EcsError::InvalidFrequency { frequency: 0, .. }));
        assert_eq!(ecs.system_count(), 0);
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let mut ecs = Ecs::new(ManualClock::new());
        let mut ids = EntityAllocator::new();
        let sys = ecs
            .add_system(SystemConfig::new("needs-x"), Requires("x"))
            .unwrap();
        let id = ecs
            .add_entity(Entity::with_components(&mut ids, [("x", Component::new())]))
            .unwrap();

        ecs.clean_dirty_entities().unwrap();
        assert_eq!(ecs.members(sys).unwrap(), &[id]);
        assert_eq!(ecs.dirty_count(), 0);

        ecs.entity_mut(id).unwrap().remove_component("x");
        ecs.clean_dirty_entities().unwrap();
        assert!(ecs.members(sys).unwrap().is_empty());
        assert!(ecs.get_entity(id).unwrap().systems().is_empty());
    }

    #[test]
    fn test_entities_iterate_in_insertion_order() {
        let mut ecs = Ecs::new(ManualClock::new());
        let mut ids = EntityAllocator::new();
        let a = ecs.add_entity(Entity::new(&mut ids)).unwrap();
        let b = ecs.add_entity(Entity::new(&mut ids)).unwrap();
        let c = ecs.add_entity(Entity::new(&mut ids)).unwrap();
        ecs.remove_entity(b).unwrap();
        let order: Vec<EntityId> = ecs.entities().map(Entity::id).collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn test_update_advances_counter_and_timestamp() {
        let clock = ManualClock::new();
        let mut ecs = Ecs::new(clock.clone());
        clock.advance(16);
        ecs.update().unwrap();
        assert_eq!(ecs.update_counter(), 1);
        assert_eq!(ecs.last_update(), 16);
    }

    #[test]
    fn test_system_by_name() {
        let mut ecs = Ecs::new(ManualClock::new());
        let id = ecs
            .add_system(SystemConfig::new("physics"), Requires("body"))
            .unwrap();
        assert_eq!(ecs.system_by_name("physics"), Some(id));
        assert_eq!(ecs.system_by_name("render"), None);
        assert_eq!(ecs.system(id).unwrap().frequency(), 1);
    }
}
