//! Coiler force field: the hand-written force generator that pulls rope
//! segments into a coil between the drum's two flanges.
//!
//! All forces are recomputed and re-applied every step, never accumulated
//! as persistent impulses, so dropping the drive gain stops coiling within
//! one damping interval. The drum axis is world +Y through the volume
//! center.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::chain::RopeChain;
use crate::config::SimConfig;
use crate::physics::PhysicsWorld;

/// The selectable drum equipment. A closed set: adding a drum means adding
/// a variant, and every match below is exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoilerDrum {
    DrumA,
    DrumB,
    DrumC,
}

impl CoilerDrum {
    /// Drum geometry with the volume centered at the origin.
    pub fn volume(self) -> CoilerVolume {
        match self {
            CoilerDrum::DrumA => CoilerVolume {
                center: Vec3::ZERO,
                radius: 0.35,
                height: 0.5,
                side_offsets: [-0.22, 0.22],
            },
            CoilerDrum::DrumB => CoilerVolume {
                center: Vec3::ZERO,
                radius: 0.5,
                height: 0.7,
                side_offsets: [-0.32, 0.32],
            },
            CoilerDrum::DrumC => CoilerVolume {
                center: Vec3::ZERO,
                radius: 0.25,
                height: 0.4,
                side_offsets: [-0.17, 0.17],
            },
        }
    }
}

/// Static drum geometry used only for force computation: the barrel and the
/// two flange planes bounding the coil channel along the axis.
#[derive(Clone, Copy, Debug)]
pub struct CoilerVolume {
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
    /// Axial offsets of the two flanges relative to the center
    pub side_offsets: [f32; 2],
}

/// Per-segment force generator for one drum.
pub struct CoilerField {
    volume: CoilerVolume,
}

impl CoilerField {
    /// Field for `drum` placed at `center` (the animated grip position).
    pub fn new(drum: CoilerDrum, center: Vec3) -> Self {
        let mut volume = drum.volume();
        volume.center = center;
        Self { volume }
    }

    pub fn volume(&self) -> &CoilerVolume {
        &self.volume
    }

    /// Move the drum with its scene node.
    pub fn set_center(&mut self, center: Vec3) {
        self.volume.center = center;
    }

    /// Re-apply field forces to every segment for this frame. `frame` feeds
    /// the rotating jitter subset; `playing` selects the drive gain.
    pub fn apply(
        &self,
        world: &mut PhysicsWorld,
        chain: &RopeChain,
        playing: bool,
        frame: u64,
        config: &SimConfig,
    ) {
        let drive = if playing {
            config.drive_gain
        } else {
            config.idle_drive
        };

        for (i, &segment) in chain.segments().iter().enumerate() {
            let Some(position) = world.position(segment) else {
                continue;
            };
            let mut force = self.segment_force(position, drive, config);

            // Deterministic jitter on a rotating subset keeps settled coils
            // from looking frozen.
            if config.jitter_stride > 0 && (i as u64 + frame) % config.jitter_stride == 0 {
                force += jitter_force(i as u64, frame, config.jitter_amplitude);
            }

            world.apply_force(segment, force);
        }
    }

    /// Force the field exerts on a segment at `position`. Pure so tests can
    /// call it directly; jitter is added separately in `apply`.
    ///
    /// A segment exactly on the drum axis is treated as sitting at the
    /// capture radius: zero force, never a division by zero.
    pub fn segment_force(&self, position: Vec3, drive: f32, config: &SimConfig) -> Vec3 {
        let rel = position - self.volume.center;
        let axial = rel.y;
        let radial_vec = Vec3::new(rel.x, 0.0, rel.z);
        let distance = radial_vec.length();

        let mut force = Vec3::ZERO;

        if distance >= 1e-4 && distance < config.capture_radius {
            let radial_dir = radial_vec / distance;
            let closeness = 1.0 - distance / config.capture_radius;

            // Tangential winding around the axis, strongest at the barrel
            force += Vec3::Y.cross(radial_dir) * (drive * closeness.powi(3));

            // Inward draw across the whole capture zone. Scaled by drive so
            // pausing stops the draw together with the winding.
            force -= radial_dir * (drive * config.inner_pull * closeness);

            // Close in: seat against the coils below
            if distance < config.inner_radius {
                force += Vec3::NEG_Y * (drive * config.seat_bias);
            }
        }

        // Strays past either flange get steered back into the channel
        let mid = (self.volume.side_offsets[0] + self.volume.side_offsets[1]) * 0.5;
        let half_separation = (self.volume.side_offsets[1] - self.volume.side_offsets[0]).abs() * 0.5;
        let excursion = axial - mid;
        if excursion.abs() > half_separation {
            let overshoot = excursion.abs() - half_separation;
            force += Vec3::NEG_Y * (excursion.signum() * overshoot * config.channel_gain);
        }

        force
    }

    /// Fraction of segments currently within capture radius of the drum
    /// axis. Telemetry only.
    pub fn coiled_fraction(&self, world: &PhysicsWorld, chain: &RopeChain, config: &SimConfig) -> f32 {
        let count = chain.segment_count();
        if count == 0 {
            return 0.0;
        }
        let captured = chain
            .segments()
            .iter()
            .filter_map(|&segment| world.position(segment))
            .filter(|position| {
                let rel = *position - self.volume.center;
                Vec3::new(rel.x, 0.0, rel.z).length() < config.capture_radius
            })
            .count();
        captured as f32 / count as f32
    }
}

/// Small deterministic pseudo-random nudge, hashed from segment index and
/// frame number so runs replay identically.
fn jitter_force(segment: u64, frame: u64, amplitude: f32) -> Vec3 {
    let component = |salt: u64| {
        let hash = segment
            .wrapping_mul(2654435761)
            .wrapping_add(frame)
            .wrapping_mul(salt)
            % 1000;
        (hash as f32 / 1000.0 - 0.5) * 2.0 * amplitude
    };
    Vec3::new(component(7919), component(104_729), component(15_485_863))
}
