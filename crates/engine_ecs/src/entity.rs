//! Entities: a component bag plus system-membership bookkeeping.
//!
//! An [`Entity`] owns its components by name and caches which systems it
//! currently belongs to. It never owns or points at the coordinator; once
//! added to an [`Ecs`](crate::Ecs) it holds a dirty-queue handle that it
//! uses to schedule itself for re-evaluation when its component set changes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::trace;

use engine_component::{Component, ComponentData, EntityId, IdGenerator};

use crate::error::EcsError;
use crate::system::SystemId;

/// Shared queue of entities awaiting membership re-evaluation.
///
/// The coordinator owns the queue; every attached entity holds a clone of the
/// handle and pushes its own id into it.
#[derive(Debug, Clone, Default)]
pub(crate) struct DirtyChannel(Rc<RefCell<Vec<EntityId>>>);

impl DirtyChannel {
    pub(crate) fn notify(&self, id: EntityId) {
        self.0.borrow_mut().push(id);
    }

    pub(crate) fn notify_once(&self, id: EntityId) {
        let mut queue = self.0.borrow_mut();
        if !queue.contains(&id) {
            queue.push(id);
        }
    }

    pub(crate) fn drain(&self) -> Vec<EntityId> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub(crate) fn remove(&self, id: EntityId) {
        self.0.borrow_mut().retain(|queued| *queued != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// An identity plus a bag of named components.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    components: HashMap<String, Component>,
    /// Systems this entity is currently a member of, in insertion order.
    systems: Vec<SystemId>,
    systems_dirty: bool,
    channel: Option<DirtyChannel>,
}

impl Entity {
    /// Create an entity with no components, taking its id from `ids`.
    pub fn new(ids: &mut impl IdGenerator) -> Self {
        Self {
            id: ids.next_id(),
            components: HashMap::new(),
            systems: Vec::new(),
            systems_dirty: false,
            channel: None,
        }
    }

    /// Create an entity pre-populated with components.
    pub fn with_components<I, S>(ids: &mut impl IdGenerator, components: I) -> Self
    where
        I: IntoIterator<Item = (S, Component)>,
        S: Into<String>,
    {
        let mut entity = Self::new(ids);
        entity.components = components
            .into_iter()
            .map(|(name, component)| (name.into(), component))
            .collect();
        entity
    }

    /// Returns the entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    // -- Component presence --

    /// Insert or replace the component stored under `name`.
    ///
    /// Replacement is wholesale; fields are not merged. Always marks the
    /// entity dirty.
    pub fn add_component(&mut self, name: impl Into<String>, component: Component) {
        self.components.insert(name.into(), component);
        self.set_systems_dirty();
    }

    /// Insert a typed component under [`ComponentData::component_name`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Component`] if `value` is not representable as a
    /// record.
    pub fn insert<T: ComponentData>(&mut self, value: &T) -> Result<(), EcsError> {
        let component = Component::from_value(value)?;
        self.add_component(T::component_name(), component);
        Ok(())
    }

    /// Remove the component stored under `name`.
    ///
    /// Removing an absent component is a no-op and does not mark the entity
    /// dirty.
    pub fn remove_component(&mut self, name: &str) -> Option<Component> {
        let removed = self.components.remove(name)?;
        self.set_systems_dirty();
        Some(removed)
    }

    // -- Field updates --

    /// Shallow-merge `fields` onto the existing component `name`.
    ///
    /// Field updates cannot change which components are present, so the
    /// entity is not marked dirty.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the entity has no component
    /// called `name`.
    pub fn update_component(
        &mut self,
        name: &str,
        fields: Map<String, Value>,
    ) -> Result<(), EcsError> {
        let component =
            self.components
                .get_mut(name)
                .ok_or_else(|| EcsError::MissingComponent {
                    entity: self.id,
                    name: name.to_string(),
                })?;
        component.merge(fields);
        Ok(())
    }

    /// Typed counterpart of [`Entity::update_component`]: overwrite the
    /// fields of `T`'s component with the fields of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if `T` is absent, or
    /// [`EcsError::Component`] if `value` is not representable as a record.
    pub fn update<T: ComponentData>(&mut self, value: &T) -> Result<(), EcsError> {
        let fields = Component::from_value(value)?.into_fields();
        self.update_component(T::component_name(), fields)
    }

    /// Apply [`Entity::update_component`] to every entry in order.
    ///
    /// Not transactional: entries applied before a failing entry stay
    /// applied, entries after it are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`EcsError::MissingComponent`] encountered.
    pub fn update_components<I, S>(&mut self, updates: I) -> Result<(), EcsError>
    where
        I: IntoIterator<Item = (S, Map<String, Value>)>,
        S: AsRef<str>,
    {
        for (name, fields) in updates {
            self.update_component(name.as_ref(), fields)?;
        }
        Ok(())
    }

    // -- Accessors --

    /// Returns `true` if a component called `name` is present.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Returns `true` if the typed component `T` is present.
    #[must_use]
    pub fn has<T: ComponentData>(&self) -> bool {
        self.has_component(T::component_name())
    }

    /// Returns the component stored under `name`.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Mutable access to a component's fields. Does not mark the entity dirty.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    /// Read the typed component `T`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Component`] if the stored fields do not match `T`.
    pub fn get<T: ComponentData>(&self) -> Result<Option<T>, EcsError> {
        match self.components.get(T::component_name()) {
            Some(component) => Ok(Some(component.to_value()?)),
            None => Ok(None),
        }
    }

    /// Returns the names of all components, in no particular order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Returns the number of components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // -- Membership --

    /// Systems this entity currently belongs to, in the order it joined them.
    #[must_use]
    pub fn systems(&self) -> &[SystemId] {
        &self.systems
    }

    /// Returns `true` if the entity is a member of `system`.
    #[must_use]
    pub fn is_member_of(&self, system: SystemId) -> bool {
        self.systems.contains(&system)
    }

    /// Returns `true` if the entity is waiting for re-evaluation.
    #[must_use]
    pub fn is_systems_dirty(&self) -> bool {
        self.systems_dirty
    }

    /// Returns `true` once the entity has been added to a coordinator.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.channel.is_some()
    }

    /// Schedule the entity for membership re-evaluation on the next tick.
    ///
    /// Enqueues at most once per dirty window. Does nothing for an entity that
    /// has not been added to a coordinator.
    pub fn set_systems_dirty(&mut self) {
        if self.systems_dirty {
            return;
        }
        if let Some(channel) = &self.channel {
            self.systems_dirty = true;
            channel.notify(self.id);
            trace!(entity = %self.id, "entity marked dirty");
        }
    }

    pub(crate) fn add_system(&mut self, system: SystemId) {
        if !self.systems.contains(&system) {
            self.systems.push(system);
        }
    }

    pub(crate) fn remove_system(&mut self, system: SystemId) {
        self.systems.retain(|s| *s != system);
    }

    pub(crate) fn attach(&mut self, channel: DirtyChannel) {
        self.channel = Some(channel);
        self.systems_dirty = false;
        self.set_systems_dirty();
    }

    pub(crate) fn detach(&mut self) {
        self.channel = None;
        self.systems_dirty = false;
    }

    pub(crate) fn clear_systems_dirty(&mut self) {
        self.systems_dirty = false;
    }

    /// Put the entity back in the queue after an interrupted operation.
    pub(crate) fn requeue(&mut self) {
        if let Some(channel) = &self.channel {
            self.systems_dirty = true;
            channel.notify_once(self.id);
        }
    }
}
