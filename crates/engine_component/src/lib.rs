//! # engine_component
//!
//! The "C" in ECS: what a component is and how entities are identified.
//!
//! This crate provides:
//!
//! - [`Component`] — a mutable record of named fields.
//! - [`ComponentData`] — the contract for typed Rust components.
//! - [`EntityId`] — lightweight `u64` entity identifiers.
//! - [`IdGenerator`] / [`EntityAllocator`] — injected id generation.

pub mod component;
pub mod entity;
pub mod error;

pub use component::{Component, ComponentData};
pub use entity::{EntityAllocator, EntityId, IdGenerator};
pub use error::ComponentError;
