//! Divergence monitor: best-effort self-healing for the live chain.
//!
//! Two passes, both inside the driver loop. Every frame, any segment whose
//! position has gone non-finite is re-seeded onto the same sine-sagged
//! anchor interpolation used at build time and its velocity zeroed. On a
//! slower cadence, a mostly-asleep chain is woken wholesale - the coiler
//! field only reaches awake bodies, so a sleeping coil would never move
//! again.
//!
//! Recovery assumes the anchors themselves are valid; they are world
//! lifetime statics and the coil anchor rejects non-finite node samples, so
//! the interpolation endpoints are always finite.

use glam::Vec3;

use super::chain::{sag_point, RopeChain};
use crate::config::SimConfig;
use crate::physics::PhysicsWorld;

/// Transient-numeric-fault monitor. Faults are repaired locally and logged;
/// nothing is surfaced to the caller beyond a per-frame repair count.
#[derive(Default)]
pub struct DivergenceMonitor {
    frames_since_wake_check: u32,
}

impl DivergenceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seed every segment with a non-finite position. The fallback is
    /// indexed by normalized chain position, so a diverged body lands back
    /// on the curve over the mid-guide it would have occupied at build
    /// time. Returns the number of repairs.
    pub fn recover_diverged(
        &self,
        world: &mut PhysicsWorld,
        chain: &RopeChain,
        feed: Vec3,
        mid_guide: Vec3,
        coil: Vec3,
        sag_depth: f32,
    ) -> usize {
        let count = chain.segment_count();
        let mut recovered = 0;

        for (i, &segment) in chain.segments().iter().enumerate() {
            let diverged = match world.position(segment) {
                Some(position) => !position.is_finite(),
                None => continue,
            };
            if !diverged {
                continue;
            }

            let t = (i + 1) as f32 / (count + 1) as f32;
            let fallback = sag_point(feed, mid_guide, coil, t, sag_depth);
            world.set_position(segment, fallback);
            world.set_velocity(segment, Vec3::ZERO);
            world.wake(segment);
            recovered += 1;

            log::warn!("segment {i} diverged, re-seeded at {fallback}");
        }

        recovered
    }

    /// On a slow cadence: if a majority of chain bodies are asleep, wake all
    /// of them so the force field can keep acting. Returns true when a wake
    /// sweep ran.
    pub fn wake_check(
        &mut self,
        world: &mut PhysicsWorld,
        chain: &RopeChain,
        config: &SimConfig,
    ) -> bool {
        self.frames_since_wake_check += 1;
        if self.frames_since_wake_check < config.wake_check_cadence {
            return false;
        }
        self.frames_since_wake_check = 0;

        let count = chain.segment_count();
        if count == 0 {
            return false;
        }
        let asleep = chain
            .segments()
            .iter()
            .filter(|&&segment| !world.is_awake(segment))
            .count();
        if asleep * 2 <= count {
            return false;
        }

        for &segment in chain.segments() {
            world.wake(segment);
        }
        log::debug!("woke {asleep} sleeping segments of {count}");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rope::anchors::AnchorSet;

    fn rig() -> (PhysicsWorld, AnchorSet, RopeChain) {
        let mut world = PhysicsWorld::new(32);
        let mut anchors = AnchorSet::new(&mut world);
        anchors.retarget(&mut world, Vec3::ZERO, Vec3::new(1.2, 0.0, 0.0));
        let chain = RopeChain::build(&mut world, &anchors, 10, 0.05, 0.012, 0.15).unwrap();
        (world, anchors, chain)
    }

    #[test]
    fn test_nan_segment_is_restored_between_anchors() {
        let (mut world, anchors, chain) = rig();
        let monitor = DivergenceMonitor::new();
        let victim = chain.segments()[4];

        world.set_position(victim, Vec3::new(f32::NAN, 0.0, 0.0));
        world.set_velocity(victim, Vec3::new(50.0, 50.0, 50.0));

        let recovered = monitor.recover_diverged(
            &mut world,
            &chain,
            anchors.feed_position(),
            anchors.mid_guide_position(),
            anchors.coil_position(),
            0.15,
        );
        assert_eq!(recovered, 1);

        let position = world.position(victim).unwrap();
        assert!(position.is_finite());
        assert!(position.x > 0.0 && position.x < 1.2, "between the anchors");
        assert_eq!(world.velocity(victim), Some(Vec3::ZERO));
    }

    #[test]
    fn test_reseed_lands_on_the_guide_routed_path() {
        let mut world = PhysicsWorld::new(32);
        let mut anchors = AnchorSet::new(&mut world);
        anchors.retarget(&mut world, Vec3::ZERO, Vec3::new(1.2, 0.0, 0.0));
        let chain = RopeChain::build(&mut world, &anchors, 9, 0.05, 0.012, 0.15).unwrap();
        let monitor = DivergenceMonitor::new();
        // 9 segments: index 4 sits at t = 0.5, directly under the mid-guide.
        let victim = chain.segments()[4];

        world.set_position(victim, Vec3::splat(f32::INFINITY));
        monitor.recover_diverged(
            &mut world,
            &chain,
            anchors.feed_position(),
            anchors.mid_guide_position(),
            anchors.coil_position(),
            0.15,
        );

        let expected = anchors.mid_guide_position() + Vec3::NEG_Y * 0.15;
        assert!((world.position(victim).unwrap() - expected).length() < 1e-5);
    }

    #[test]
    fn test_healthy_chain_needs_no_recovery() {
        let (mut world, anchors, chain) = rig();
        let monitor = DivergenceMonitor::new();
        let recovered = monitor.recover_diverged(
            &mut world,
            &chain,
            anchors.feed_position(),
            anchors.mid_guide_position(),
            anchors.coil_position(),
            0.15,
        );
        assert_eq!(recovered, 0);
    }

    #[test]
    fn test_majority_asleep_triggers_full_wake() {
        let config = SimConfig {
            wake_check_cadence: 3,
            gravity: Vec3::ZERO,
            ..SimConfig::default()
        };
        let (mut world, _anchors, chain) = rig();
        let mut monitor = DivergenceMonitor::new();

        // Let the whole idle chain fall asleep.
        for _ in 0..(config.sleep_steps + 5) {
            world.step(config.fixed_timestep, &config);
        }
        let asleep = chain
            .segments()
            .iter()
            .filter(|&&s| !world.is_awake(s))
            .count();
        assert!(asleep * 2 > chain.segment_count(), "chain should settle");

        // Cadence: two quiet frames, then the sweep fires.
        assert!(!monitor.wake_check(&mut world, &chain, &config));
        assert!(!monitor.wake_check(&mut world, &chain, &config));
        assert!(monitor.wake_check(&mut world, &chain, &config));
        assert!(chain.segments().iter().all(|&s| world.is_awake(s)));
    }
}
