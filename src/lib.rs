//! # Coilrig: Physics-Driven Cable Coiling Core
//!
//! Coilrig simulates a rope/cable as a chain of point masses linked by ball
//! joints, fed from a spool and wound onto a rotating coiler drum. It is the
//! simulation core of a 3D equipment configurator: the host application owns
//! the scene, materials, and camera, and this crate owns the rope's motion
//! and its render geometry.
//!
//! ## Architecture Overview
//!
//! The codebase is organized into four subsystems:
//!
//! ### 1. Physics World ([`physics`])
//!
//! A small hand-rolled dynamics core, sized for a few hundred bodies:
//! - [`physics::PhysicsWorld`] - Structure-of-Arrays (SoA) body storage with
//!   generation-checked handles
//! - [`physics::BallJointConstraints`] - position-projected joint solver
//!
//! **Key Design**: constraints are solved by iterative position projection
//! weighted by inverse mass, then velocities are recovered from the position
//! delta. Zero-mass bodies are immovable anchors.
//!
//! ### 2. Rope Domain ([`rope`])
//!
//! Everything specific to cable behavior:
//! - [`rope::RopeChain`] - segment/constraint bookkeeping, build, splice,
//!   teardown
//! - [`rope::AnchorSet`] - feed, mid-guide, and animated coil anchors
//! - [`rope::CoilerField`] - the drum force field that winds the rope
//! - [`rope::GrowthController`] - frame-cadence rope feed
//! - [`rope::DivergenceMonitor`] - non-finite repair and sleep management
//!
//! ### 3. Rendering ([`rendering`])
//!
//! CPU geometry plus a thin wgpu sync layer:
//! - [`rendering::RopeCurve`] - chain-ordered backbone extraction
//! - [`rendering::tube`] - Catmull-Rom sampled tube mesh generation
//! - [`rendering::RopeMesh`] - dispose-before-create GPU buffer ownership
//!
//! ### 4. Driver ([`driver`])
//!
//! [`RopeSimulation`] is the root component. It runs the single per-frame
//! loop in fixed order (anchor sync, coiler forces, physics step, growth,
//! recovery, curve extraction, tube generation) and exposes the three
//! lifecycle calls the configurator UI needs: rebuild, teardown, play/pause.
//!
//! ## Getting Started
//!
//! ```no_run
//! use coilrig::{CoilerDrum, RopeSimulation, SimConfig};
//! use glam::Vec3;
//!
//! let mut sim = RopeSimulation::new(SimConfig::default());
//! sim.rebuild_rope(
//!     Some(Vec3::new(-0.6, 0.5, 0.0)),
//!     Some(Vec3::new(0.6, 0.5, 0.0)),
//!     Some(CoilerDrum::DrumA),
//! )?;
//! sim.set_playing(true);
//!
//! let output = sim.update(None);
//! let (vertices, indices) = sim.tube_geometry();
//! # Ok::<(), coilrig::ConfigurationError>(())
//! ```
//!
//! ## Dependencies
//!
//! - **Math**: `glam` (SIMD vector types), `bytemuck` (vertex transmutation)
//! - **Graphics**: `wgpu` (GPU buffer sync for the tube mesh)
//! - **Errors**: `thiserror` for the configuration error enum
//! - **Config**: `serde` for [`SimConfig`]
//! - **Logging**: `log` facade, `env_logger` in the demo binary

pub mod config;
pub mod driver;
pub mod physics;
pub mod rendering;
pub mod rope;

pub use config::SimConfig;
pub use driver::{FrameOutput, RopeSimulation};
pub use rope::{CoilerDrum, ConfigurationError};
