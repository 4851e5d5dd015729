//! Delivery console: delivery tasks with derived schedules and run state.

pub mod engine;
