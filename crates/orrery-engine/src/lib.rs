//! Orrery render engine.
//!
//! A wgpu session that draws the orbiting-ring scene, exposed to hosts
//! through the [`orrery_host::RenderEngine`] contract: construct against a
//! window, render one frame per call, adopt resizes. The host controller
//! owns the engine value for the session's lifetime.

mod engine;
mod gpu;
mod scene;

pub use engine::OrbitEngine;
pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
