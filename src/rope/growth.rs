//! Growth controller: feeds rope into the live chain while playing.
//!
//! Runs on a frame-counted cadence inside the driver loop (never a
//! wall-clock timer) so growth is deterministic and testable. Each cycle
//! splices one segment in near the feed end, away from the actively
//! coiling region.

use super::chain::{RopeChain, SpliceEvent};
use crate::config::SimConfig;
use crate::physics::PhysicsWorld;

/// Frame-cadence splice scheduler.
#[derive(Default)]
pub struct GrowthController {
    frames_since_splice: u32,
}

impl GrowthController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cadence; on cadence boundaries while playing and below
    /// the segment cap, splice one segment in. Out-of-range splices (growth
    /// racing a teardown) are skipped silently - this runs on a cadence
    /// independent of UI transitions and must never fault.
    pub fn update(
        &mut self,
        world: &mut PhysicsWorld,
        chain: &mut RopeChain,
        playing: bool,
        config: &SimConfig,
    ) -> Option<SpliceEvent> {
        if !playing {
            return None;
        }

        self.frames_since_splice += 1;
        if self.frames_since_splice < config.growth_cadence_frames {
            return None;
        }
        self.frames_since_splice = 0;

        if chain.segment_count() >= config.max_segments {
            return None;
        }

        let event = chain.splice(world, config.splice_index, config.splice_drop);
        if let Some(event) = &event {
            log::debug!(
                "spliced segment after index {}, chain now {} segments",
                event.index,
                chain.segment_count()
            );
        }
        event
    }
}
