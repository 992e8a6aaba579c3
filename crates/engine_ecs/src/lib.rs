//! # engine_ecs
//!
//! A single-threaded ECS runtime that keeps every system's member list in
//! step with its eligibility predicate as components come and go.
//!
//! - [`Entity`] — component bag plus membership cache and dirty flag.
//! - [`System`] — eligibility predicate and lifecycle hooks.
//! - [`Ecs`] — the coordinator: owns entities and systems, reconciles dirty
//!   entities, runs frequency-gated ticks.
//! - [`Clock`] — injected time source ([`MonotonicClock`], [`ManualClock`]).
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use engine_component::{Component, EntityAllocator};
//! use engine_ecs::{Ecs, Entity, ManualClock, System, SystemConfig};
//!
//! struct Mover;
//!
//! impl System for Mover {
//!     fn test(&self, entity: &Entity) -> bool {
//!         entity.has_component("velocity")
//!     }
//!     fn enter(&mut self, _e: &mut Entity) -> anyhow::Result<()> { Ok(()) }
//!     fn exit(&mut self, _e: &mut Entity) -> anyhow::Result<()> { Ok(()) }
//!     fn update(&mut self, _e: &mut Entity, _dt: Duration) -> anyhow::Result<()> { Ok(()) }
//! }
//!
//! let mut ids = EntityAllocator::new();
//! let mut ecs = Ecs::new(ManualClock::new());
//! let mover = ecs.add_system(SystemConfig::new("mover"), Mover).unwrap();
//!
//! let id = ecs.add_entity(Entity::new(&mut ids)).unwrap();
//! ecs.entity_mut(id).unwrap().add_component("velocity", Component::new());
//! ecs.update().unwrap();
//!
//! assert_eq!(ecs.members(mover).unwrap(), &[id]);
//! ```

pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod system;
pub mod world;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{EcsConfig, FrequencyGating};
pub use entity::Entity;
pub use error::{EcsError, Hook};
pub use system::{RegisteredSystem, System, SystemConfig, SystemId};
pub use world::Ecs;
