//! Domain layer: aggregates, value objects and the events they raise.

pub mod aggregates;
pub mod events;
pub mod nullable;
pub mod value_objects;
