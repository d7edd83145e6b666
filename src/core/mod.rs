//! Core engine infrastructure

pub mod camera;
pub mod error;
pub mod logging;
pub mod types;
