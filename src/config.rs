use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Simulation configuration for the cable coiling core.
///
/// One flat struct shared by the solver, the rope rig, the coiler force
/// field, and the mesh sync. All values are deterministic and produce
/// identical results across runs. The numeric defaults are empirically
/// tuned for the configurator scene scale (meters); they are starting
/// points, not contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    // === Solver ===
    /// Fixed timestep for physics integration (60 Hz)
    pub fixed_timestep: f32,

    /// Internal substeps per physics step (opaque to callers)
    pub substeps: usize,

    /// Ball-joint projection iterations per substep
    pub constraint_iterations: usize,

    /// Gravity vector
    pub gravity: Vec3,

    /// Velocity damping coefficient (applied as pow(velocity_damping, dt * 100.0))
    pub velocity_damping: f32,

    /// Per-iteration clamp on constraint position corrections
    pub max_correction: f32,

    /// Bodies slower than this for `sleep_steps` consecutive steps fall asleep
    pub sleep_velocity: f32,

    /// Consecutive low-motion steps before a body sleeps
    pub sleep_steps: u32,

    // === Rope chain ===
    /// Segment count created by a rope rebuild
    pub initial_segments: usize,

    /// Hard cap on segment count; growth stops here
    pub max_segments: usize,

    /// Mass of one rope segment (shared by every segment in a rope)
    pub segment_mass: f32,

    /// Collision/visual radius of one rope segment
    pub segment_radius: f32,

    /// Depth of the sine sag used at build time and for divergence recovery
    pub sag_depth: f32,

    /// Allowed fractional deviation of total chain length from the rest sum
    pub slack_tolerance: f32,

    // === Growth ===
    /// Frames between growth cycles while playing
    pub growth_cadence_frames: u32,

    /// Fixed splice index near the feed end (never the coiling region)
    pub splice_index: usize,

    /// How far below the splice segment a new segment is seeded
    pub splice_drop: f32,

    // === Coiler force field ===
    /// Distance from the drum axis within which the field acts
    pub capture_radius: f32,

    /// Tighter radius where the seating bias engages
    pub inner_radius: f32,

    /// Tangential drive gain while playing
    pub drive_gain: f32,

    /// Residual drive while paused (near zero so coiling stops within one
    /// damping interval)
    pub idle_drive: f32,

    /// Inward draw gain across the capture zone, scaled by the active drive
    pub inner_pull: f32,

    /// Downward bias inside `inner_radius` seating segments against prior
    /// coils, scaled by the active drive
    pub seat_bias: f32,

    /// Axial gain steering strays back between the two flanges
    pub channel_gain: f32,

    /// Amplitude of the deterministic per-segment jitter
    pub jitter_amplitude: f32,

    /// Every `jitter_stride`-th segment is jittered each frame (rotating subset)
    pub jitter_stride: u64,

    // === Recovery ===
    /// Frames between majority-asleep wake checks
    pub wake_check_cadence: u32,

    // === Tube meshing ===
    /// Catmull-Rom samples per control-point span
    pub samples_per_span: usize,

    /// Vertices per tube ring
    pub radial_segments: u32,

    /// Texture V units per meter of arc length
    pub uv_scale: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            substeps: 4,
            constraint_iterations: 8,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            velocity_damping: 0.98,
            max_correction: 0.5,
            sleep_velocity: 0.01,
            sleep_steps: 45,

            initial_segments: 40,
            max_segments: 120,
            segment_mass: 0.05,
            segment_radius: 0.012,
            sag_depth: 0.15,
            slack_tolerance: 0.25,

            growth_cadence_frames: 30,
            splice_index: 2,
            splice_drop: 0.02,

            capture_radius: 0.45,
            inner_radius: 0.18,
            drive_gain: 4.0,
            idle_drive: 0.01,
            inner_pull: 1.5,
            seat_bias: 0.4,
            channel_gain: 8.0,
            jitter_amplitude: 0.05,
            jitter_stride: 7,

            wake_check_cadence: 20,

            samples_per_span: 4,
            radial_segments: 6,
            uv_scale: 8.0,
        }
    }
}
