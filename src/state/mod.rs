// State engine and entity management (Task 3)

mod engine;
mod entity;
mod metrics;
pub mod metrics_broadcaster;

pub use engine::StateEngine;
pub use entity::{Entity, EntityDeleted, StateUpdate};
pub use metrics_broadcaster::MetricsUpdate;
