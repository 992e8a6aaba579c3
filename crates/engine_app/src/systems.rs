//! Demo systems.
//!
//! - [`Movement`] integrates velocity into position.
//! - [`Expiry`] counts down [`Lifetime`] and strips movement when it runs out.
//! - [`Census`] summarises every positioned entity once per batch.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use glam::Vec3;
use tracing::{debug, info};

use engine_component::ComponentData;
use engine_ecs::{Entity, System};

use crate::components::{Lifetime, Position, Velocity};

/// Moves every entity that has both a position and a velocity.
#[derive(Debug, Default)]
pub struct Movement;

impl System for Movement {
    fn test(&self, entity: &Entity) -> bool {
        entity.has::<Position>() && entity.has::<Velocity>()
    }

    fn enter(&mut self, entity: &mut Entity) -> Result<()> {
        debug!(entity = %entity.id(), "started moving");
        Ok(())
    }

    fn exit(&mut self, entity: &mut Entity) -> Result<()> {
        debug!(entity = %entity.id(), "stopped moving");
        Ok(())
    }

    fn update(&mut self, entity: &mut Entity, elapsed: Duration) -> Result<()> {
        let (Some(mut position), Some(velocity)) =
            (entity.get::<Position>()?, entity.get::<Velocity>()?)
        else {
            return Ok(());
        };
        position.value += velocity.linear * elapsed.as_secs_f32();
        entity.update(&position)?;
        Ok(())
    }
}

/// Counts lifetimes down; an expired entity loses its velocity and lifetime.
#[derive(Debug, Default)]
pub struct Expiry;

impl System for Expiry {
    fn test(&self, entity: &Entity) -> bool {
        entity.has::<Lifetime>()
    }

    fn enter(&mut self, _entity: &mut Entity) -> Result<()> {
        Ok(())
    }

    fn exit(&mut self, entity: &mut Entity) -> Result<()> {
        debug!(entity = %entity.id(), "expired");
        Ok(())
    }

    fn update(&mut self, entity: &mut Entity, elapsed: Duration) -> Result<()> {
        let Some(mut lifetime) = entity.get::<Lifetime>()? else {
            return Ok(());
        };
        let spent = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        lifetime.remaining_ms = lifetime.remaining_ms.saturating_sub(spent);

        if lifetime.remaining_ms == 0 {
            entity.remove_component(Velocity::component_name());
            entity.remove_component(Lifetime::component_name());
        } else {
            entity.update(&lifetime)?;
        }
        Ok(())
    }
}

/// One batch worth of [`Census`] output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CensusReport {
    pub count: usize,
    pub centroid: Vec3,
}

/// Logs how many entities have a position and where their centre is.
#[derive(Debug, Default)]
pub struct Census {
    count: usize,
    sum: Vec3,
    last: Rc<Cell<Option<CensusReport>>>,
}

impl Census {
    /// Handle to the most recent report.
    #[must_use]
    pub fn reports(&self) -> Rc<Cell<Option<CensusReport>>> {
        Rc::clone(&self.last)
    }
}

impl System for Census {
    fn test(&self, entity: &Entity) -> bool {
        entity.has::<Position>()
    }

    fn enter(&mut self, _entity: &mut Entity) -> Result<()> {
        Ok(())
    }

    fn exit(&mut self, _entity: &mut Entity) -> Result<()> {
        Ok(())
    }

    fn pre_update(&mut self) -> Result<()> {
        self.count = 0;
        self.sum = Vec3::ZERO;
        Ok(())
    }

    fn update(&mut self, entity: &mut Entity, _elapsed: Duration) -> Result<()> {
        if let Some(position) = entity.get::<Position>()? {
            self.count += 1;
            self.sum += position.value;
        }
        Ok(())
    }

    fn post_update(&mut self) -> Result<()> {
        let centroid = if self.count == 0 {
            Vec3::ZERO
        } else {
            self.sum / self.count as f32
        };
        let report = CensusReport {
            count: self.count,
            centroid,
        };
        info!(count = report.count, centroid = ?report.centroid, "census");
        self.last.set(Some(report));
        Ok(())
    }
}
