//! Lifecycle and frame scheduling for a hosted render engine.
//!
//! This crate owns the **host controller**: the state machine that sequences
//! engine construction, the steady-state frame loop, resize propagation, and
//! terminal failure handling. The engine itself is consumed through the
//! three-operation [`RenderEngine`] contract and is exclusively owned by the
//! controller while it runs.
//!
//! This crate is intentionally platform-free so hosts and tests can drive the
//! controller deterministically by direct invocation.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`engine`] | `RenderEngine`, `EngineError` |
//! | [`schedule`] | `FrameScheduler`, `ScheduleToken` |
//! | [`controller`] | `HostController`, `ViewState`, `MisuseError` |
//!
//! # Quick start
//!
//! ```rust
//! use orrery_host::{
//!     EngineError, FrameScheduler, HostController, RenderEngine, ScheduleToken, ViewState,
//! };
//!
//! struct NullEngine;
//!
//! impl RenderEngine for NullEngine {
//!     type Surface = ();
//!     fn construct(_surface: ()) -> Result<Self, EngineError> {
//!         Ok(NullEngine)
//!     }
//!     fn render(&mut self) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//!     fn resize(&mut self, _width: u32, _height: u32) {}
//! }
//!
//! struct Immediate(u64);
//!
//! impl FrameScheduler for Immediate {
//!     fn request_frame(&mut self) -> ScheduleToken {
//!         self.0 += 1;
//!         ScheduleToken::new(self.0)
//!     }
//!     fn cancel_frame(&mut self, _token: ScheduleToken) {}
//! }
//!
//! let mut controller = HostController::<NullEngine, _>::new(Immediate(0));
//! controller.start(()).unwrap();
//! assert!(matches!(controller.view_state(), ViewState::Ready));
//! controller.frame_step();
//! controller.stop();
//! ```

pub mod controller;
pub mod engine;
pub mod schedule;

pub use controller::{FailurePhase, HostController, MisuseError, SurfaceDimensions, ViewState};
pub use engine::{EngineError, RenderEngine};
pub use schedule::{FrameScheduler, ScheduleToken};
