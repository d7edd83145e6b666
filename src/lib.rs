//! Veld - GPU-driven vegetation instancing and culling renderer

pub mod core;
pub mod math;
pub mod grass;
pub mod render;
