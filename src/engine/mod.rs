//! Core engine modules for the delivery console.

pub mod config;
pub mod db;
pub mod error;
pub mod ops;
pub mod repo;
pub mod resolver;
pub mod schedule;
pub mod state;
pub mod types;
