//! Demo scene setup.

use std::cell::Cell;
use std::f32::consts::TAU;
use std::rc::Rc;

use glam::Vec3;
use tracing::info;

use engine_component::{EntityId, IdGenerator};
use engine_ecs::{Ecs, EcsError, Entity, SystemConfig};

use crate::components::{Lifetime, Position, Velocity};
use crate::systems::{Census, CensusReport, Expiry, Movement};

/// Spawn `count` entities on a unit ring, each moving outwards.
///
/// Every third entity keeps moving forever; the rest get a lifetime that
/// grows with their index.
///
/// # Errors
///
/// Fails if a component cannot be stored or an id is already taken.
pub fn spawn_entities(
    ecs: &mut Ecs,
    ids: &mut impl IdGenerator,
    count: usize,
) -> Result<Vec<EntityId>, EcsError> {
    let mut spawned = Vec::with_capacity(count);
    for index in 0..count {
        let angle = TAU * index as f32 / count.max(1) as f32;
        let direction = Vec3::new(angle.cos(), 0.0, angle.sin());

        let mut entity = Entity::new(ids);
        entity.insert(&Position { value: direction })?;
        entity.insert(&Velocity { linear: direction })?;
        if index % 3 != 0 {
            entity.insert(&Lifetime {
                remaining_ms: 500 * index as u64,
            })?;
        }
        spawned.push(ecs.add_entity(entity)?);
    }
    info!(count, "spawned entities");
    Ok(spawned)
}

/// Register the demo systems in evaluation order.
///
/// Returns a handle to the census output, refreshed every `report_every`
/// ticks.
///
/// # Errors
///
/// Fails if `report_every` is zero.
pub fn register_systems(
    ecs: &mut Ecs,
    report_every: u32,
) -> Result<Rc<Cell<Option<CensusReport>>>, EcsError> {
    ecs.add_system(SystemConfig::new("expiry"), Expiry)?;
    ecs.add_system(SystemConfig::new("movement"), Movement)?;

    let census = Census::default();
    let reports = census.reports();
    ecs.add_system(
        SystemConfig::new("census").with_frequency(report_every),
        census,
    )?;
    Ok(reports)
}
