//! Coordinator error types.

use engine_component::{ComponentError, EntityId};
use thiserror::Error;

/// The lifecycle hook that was running when a system failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// [`System::enter`](crate::System::enter), after an entity joins.
    Enter,
    /// [`System::exit`](crate::System::exit), after an entity leaves.
    Exit,
    /// [`System::pre_update`](crate::System::pre_update), before a batch.
    PreUpdate,
    /// [`System::update`](crate::System::update), once per member.
    Update,
    /// [`System::post_update`](crate::System::post_update), after a batch.
    PostUpdate,
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Hook::Enter => "enter",
            Hook::Exit => "exit",
            Hook::PreUpdate => "pre_update",
            Hook::Update => "update",
            Hook::PostUpdate => "post_update",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by entities, systems and the coordinator.
///
/// Not-found lookups are not errors; they return `None` or `false`.
#[derive(Debug, Error)]
pub enum EcsError {
    /// A field update targeted a component the entity does not have.
    #[error("component '{name}' not found on {entity}")]
    MissingComponent { entity: EntityId, name: String },

    /// An entity with the same id is already in the population.
    #[error("{0} is already registered")]
    DuplicateEntity(EntityId),

    /// A system was registered with a frequency of zero.
    #[error("system '{system}' has frequency {frequency}; it must be at least 1")]
    InvalidFrequency { system: String, frequency: u32 },

    /// A typed component could not be converted.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// A system hook returned an error. The rest of the operation was
    /// abandoned.
    #[error("system '{system}' failed in {hook}: {source}")]
    Hook {
        system: String,
        hook: Hook,
        #[source]
        source: anyhow::Error,
    },

    /// The coordinator configuration could not be parsed.
    #[error("invalid ECS configuration: {0}")]
    Config(#[from] serde_json::Error),
}
