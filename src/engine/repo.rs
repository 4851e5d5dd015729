//! Repositories: All database operations in one place.

mod runs;
mod tasks;

pub use runs::RunRepo;
pub use tasks::{TaskRepo, TASK_SELECT};
