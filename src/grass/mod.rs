//! Grass instance population: authored data, configuration, interactors,
//! and the shared procedural displacement math.
//!
//! The authoritative per-instance array lives in [`InstanceStore`]; editing
//! tools replace it wholesale and the renderer rebuilds GPU buffers on the
//! next update. Wind and bending are pure functions mirrored between
//! `displacement.rs`/`wind.rs` and `shaders/grass_common.wgsl`.

pub mod config;
pub mod displacement;
pub mod instance;
pub mod interactor;
pub mod mesh;
pub mod wind;

pub use config::{GrassConfig, MeshSelection};
pub use instance::{GrassInstance, GpuGrassInstance, GpuVisibleInstance, InstanceStore};
pub use interactor::{Interactor, InteractorHandle, InteractorRegistry, GpuInteractor, MAX_INTERACTORS};
pub use mesh::{BladeMesh, BladeVertex};
pub use wind::WindParams;
