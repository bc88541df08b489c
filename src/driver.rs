//! Simulation driver: the single per-frame loop tying the core together.
//!
//! Every frame runs the same fixed order: read the play flag, sync the coil
//! anchor from its animated node, re-apply coiler forces, step the world,
//! run the growth cadence, repair divergence, check sleepers, then extract
//! the render curve and regenerate the tube geometry. The segment and
//! constraint tables are owned exclusively by this loop; teardown and
//! rebuild happen between frames and are observed as atomic.
//!
//! The three entry points the equipment-selection layer needs are
//! [`RopeSimulation::rebuild_rope`], [`RopeSimulation::teardown_rope`], and
//! [`RopeSimulation::set_playing`]. Everything else is per-frame output.

use glam::{Quat, Vec3};

use crate::config::SimConfig;
use crate::physics::PhysicsWorld;
use crate::rendering::curve::{sample_catmull_rom, RopeCurve};
use crate::rendering::tube::{generate_tube_mesh, TubeVertex};
use crate::rope::anchors::AnchorSet;
use crate::rope::chain::{ConfigurationError, RopeChain, SpliceEvent};
use crate::rope::coiler::{CoilerDrum, CoilerField};
use crate::rope::growth::GrowthController;
use crate::rope::recovery::DivergenceMonitor;

/// Everything tied to one equipment selection. Destroyed and rebuilt
/// wholesale when the selection changes.
struct RopeRig {
    chain: RopeChain,
    field: CoilerField,
    growth: GrowthController,
    monitor: DivergenceMonitor,
    drum: CoilerDrum,
}

/// Per-frame telemetry returned by [`RopeSimulation::update`]. Developer
/// facing only; no error path reaches the UI layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameOutput {
    pub segment_count: usize,
    pub constraint_count: usize,
    /// Segments re-seeded by divergence recovery this frame
    pub recovered: usize,
    /// Growth splice completed this frame, if any
    pub spliced: Option<SpliceEvent>,
    /// Whether the majority-asleep wake sweep ran
    pub woke_sleepers: bool,
    /// Fraction of segments within capture radius of the drum axis
    pub coiled_fraction: f32,
}

/// The rope/cable simulation core.
pub struct RopeSimulation {
    config: SimConfig,
    world: PhysicsWorld,
    anchors: AnchorSet,
    rig: Option<RopeRig>,
    playing: bool,
    frame: u64,

    curve: RopeCurve,
    tube_vertices: Vec<TubeVertex>,
    tube_indices: Vec<u32>,
}

impl RopeSimulation {
    pub fn new(config: SimConfig) -> Self {
        // Anchor headroom on top of the segment cap
        let mut world = PhysicsWorld::new(config.max_segments + 8);
        let anchors = AnchorSet::new(&mut world);
        Self {
            config,
            world,
            anchors,
            rig: None,
            playing: false,
            frame: 0,
            curve: RopeCurve::default(),
            tube_vertices: Vec::new(),
            tube_indices: Vec::new(),
        }
    }

    /// Destroy any existing rope and build a fresh one for the given
    /// equipment selection. Refuses as a complete no-op when a required
    /// input is missing or the configured segment count cannot be built -
    /// the existing rope (if any) is left untouched.
    pub fn rebuild_rope(
        &mut self,
        feed: Option<Vec3>,
        coil: Option<Vec3>,
        equipment: Option<CoilerDrum>,
    ) -> Result<(), ConfigurationError> {
        let feed = feed.ok_or(ConfigurationError::MissingFeedAnchor)?;
        let coil = coil.ok_or(ConfigurationError::MissingCoilAnchor)?;
        let drum = equipment.ok_or(ConfigurationError::MissingEquipment)?;
        if !feed.is_finite() || !coil.is_finite() {
            return Err(ConfigurationError::NonFiniteAnchor);
        }

        // Validate the segment count before touching the existing rope, so
        // every error path really is a no-op.
        let count = self.config.initial_segments;
        if count < 2 {
            return Err(ConfigurationError::TooFewSegments(count));
        }
        let available = self.world.free_capacity()
            + self.rig.as_ref().map_or(0, |rig| rig.chain.segment_count());
        if available < count {
            return Err(ConfigurationError::WorldFull(count));
        }

        self.teardown_rope();
        self.anchors.retarget(&mut self.world, feed, coil);

        let chain = RopeChain::build(
            &mut self.world,
            &self.anchors,
            self.config.initial_segments,
            self.config.segment_mass,
            self.config.segment_radius,
            self.config.sag_depth,
        )?;
        let field = CoilerField::new(drum, coil);

        log::info!(
            "rope rebuilt: {:?}, {} segments, feed {feed}, coil {coil}",
            drum,
            chain.segment_count()
        );

        self.rig = Some(RopeRig {
            chain,
            field,
            growth: GrowthController::new(),
            monitor: DivergenceMonitor::new(),
            drum,
        });
        Ok(())
    }

    /// Tear the rope down completely: constraints before bodies, render
    /// buffers cleared. Idempotent; calling with no rope is a no-op.
    pub fn teardown_rope(&mut self) {
        if let Some(mut rig) = self.rig.take() {
            rig.chain.teardown(&mut self.world);
            log::info!("rope torn down ({:?})", rig.drum);
        }
        self.curve.clear();
        self.tube_vertices.clear();
        self.tube_indices.clear();
    }

    /// Pausing cuts force-field drive and growth from the next frame on,
    /// but lets existing momentum settle out under damping.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Advance one frame. `coil_node_sample` is the animated grip node's
    /// current world transform, if the host could sample it this frame.
    pub fn update(&mut self, coil_node_sample: Option<(Vec3, Quat)>) -> FrameOutput {
        self.frame += 1;
        // Single read per frame; mid-frame toggles apply next frame
        let playing = self.playing;

        self.anchors.sync_coil(&mut self.world, coil_node_sample);

        let mut output = FrameOutput::default();

        let Some(rig) = self.rig.as_mut() else {
            return output;
        };

        // 1. Coiler forces (re-applied from scratch every frame)
        rig.field.set_center(self.anchors.coil_position());
        rig.field
            .apply(&mut self.world, &rig.chain, playing, self.frame, &self.config);

        // 2. Physics step (sub-steps internally)
        self.world.step(self.config.fixed_timestep, &self.config);

        // 3. Growth cadence
        output.spliced = rig
            .growth
            .update(&mut self.world, &mut rig.chain, playing, &self.config);

        // 4. Divergence repair
        output.recovered = rig.monitor.recover_diverged(
            &mut self.world,
            &rig.chain,
            self.anchors.feed_position(),
            self.anchors.mid_guide_position(),
            self.anchors.coil_position(),
            self.config.sag_depth,
        );

        // 5. Sleep management
        output.woke_sleepers = rig.monitor.wake_check(&mut self.world, &rig.chain, &self.config);

        // 6. Render curve and tube geometry, including any same-frame splice
        self.curve = RopeCurve::from_chain(&self.world, &rig.chain);
        let samples = sample_catmull_rom(self.curve.points(), self.config.samples_per_span);
        let (vertices, indices) = generate_tube_mesh(
            &samples,
            rig.chain.segment_radius(),
            self.config.radial_segments,
            self.config.uv_scale,
        );
        self.tube_vertices = vertices;
        self.tube_indices = indices;

        output.segment_count = rig.chain.segment_count();
        output.constraint_count = rig.chain.constraint_count();
        output.coiled_fraction = rig
            .field
            .coiled_fraction(&self.world, &rig.chain, &self.config);
        output
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Live-tunable configuration. Changes to the rope parameters take
    /// effect on the next rebuild; solver and field parameters apply from
    /// the next frame.
    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    /// The live chain, if a rope is currently built.
    pub fn chain(&self) -> Option<&RopeChain> {
        self.rig.as_ref().map(|rig| &rig.chain)
    }

    pub fn segment_count(&self) -> usize {
        self.rig.as_ref().map_or(0, |rig| rig.chain.segment_count())
    }

    /// This frame's rope backbone positions (chain order).
    pub fn curve(&self) -> &RopeCurve {
        &self.curve
    }

    /// This frame's tube geometry, ready for [`crate::rendering::RopeMesh`].
    pub fn tube_geometry(&self) -> (&[TubeVertex], &[u32]) {
        (&self.tube_vertices, &self.tube_indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: Vec3 = Vec3::new(-0.6, 0.5, 0.0);
    const COIL: Vec3 = Vec3::new(0.6, 0.5, 0.0);

    fn built_sim(config: SimConfig) -> RopeSimulation {
        let mut sim = RopeSimulation::new(config);
        sim.rebuild_rope(Some(FEED), Some(COIL), Some(CoilerDrum::DrumA))
            .unwrap();
        sim
    }

    #[test]
    fn test_rebuild_refuses_incomplete_selection() {
        let mut sim = RopeSimulation::new(SimConfig::default());
        assert!(matches!(
            sim.rebuild_rope(None, Some(COIL), Some(CoilerDrum::DrumA)),
            Err(ConfigurationError::MissingFeedAnchor)
        ));
        assert!(matches!(
            sim.rebuild_rope(Some(FEED), Some(COIL), None),
            Err(ConfigurationError::MissingEquipment)
        ));
        assert_eq!(sim.segment_count(), 0);
        assert_eq!(sim.world().constraint_count(), 0);
    }

    #[test]
    fn test_rebuild_replaces_previous_rope_atomically() {
        let mut sim = built_sim(SimConfig::default());
        let first_count = sim.world().body_count();

        sim.rebuild_rope(Some(FEED), Some(COIL), Some(CoilerDrum::DrumB))
            .unwrap();
        assert_eq!(sim.world().body_count(), first_count, "no leftover bodies");
        assert_eq!(
            sim.world().constraint_count(),
            sim.segment_count() + 1,
            "no leftover constraints"
        );
    }

    #[test]
    fn test_failed_rebuild_leaves_existing_rope_untouched() {
        let mut sim = built_sim(SimConfig::default());

        sim.config_mut().initial_segments = 1;
        assert!(matches!(
            sim.rebuild_rope(Some(FEED), Some(COIL), Some(CoilerDrum::DrumA)),
            Err(ConfigurationError::TooFewSegments(1))
        ));
        assert_eq!(sim.segment_count(), 40, "old rope must survive");
        assert_eq!(sim.world().constraint_count(), 41);

        sim.config_mut().initial_segments = 500;
        assert!(matches!(
            sim.rebuild_rope(Some(FEED), Some(COIL), Some(CoilerDrum::DrumA)),
            Err(ConfigurationError::WorldFull(500))
        ));
        assert_eq!(sim.segment_count(), 40);
        assert_eq!(sim.world().constraint_count(), 41);
    }

    #[test]
    fn test_teardown_twice_is_noop() {
        let mut sim = built_sim(SimConfig::default());
        sim.teardown_rope();
        assert_eq!(sim.segment_count(), 0);
        assert_eq!(sim.world().body_count(), 3);
        assert_eq!(sim.world().constraint_count(), 0);

        sim.teardown_rope();
        assert_eq!(sim.world().body_count(), 3);

        // Updating without a rope is quietly empty.
        let output = sim.update(None);
        assert_eq!(output.segment_count, 0);
        assert!(sim.curve().is_empty());
    }

    #[test]
    fn test_curve_length_matches_segments_after_same_frame_splice() {
        let config = SimConfig {
            growth_cadence_frames: 1,
            ..SimConfig::default()
        };
        let mut sim = built_sim(config);
        sim.set_playing(true);

        for _ in 0..5 {
            let output = sim.update(Some((COIL, Quat::IDENTITY)));
            assert!(output.spliced.is_some());
            assert_eq!(sim.curve().len(), output.segment_count);
            assert_eq!(output.constraint_count, output.segment_count + 1);
        }
    }

    // Scenario A: 40 segments, anchors 1.2 apart, 120 paused steps. The
    // chain must stay finite and hold its length within the slack tolerance.
    #[test]
    fn test_scenario_a_paused_chain_settles_within_slack() {
        let config = SimConfig::default();
        let slack = config.slack_tolerance;
        let mut sim = built_sim(config);
        sim.set_playing(false);

        for _ in 0..120 {
            sim.update(None);
        }

        let chain = sim.chain().unwrap();
        for &segment in chain.segments() {
            let position = sim.world().position(segment).unwrap();
            assert!(position.is_finite(), "segment diverged while settling");
        }

        let measured = chain.measured_length(sim.world());
        let rest = chain.rest_length();
        assert!(
            measured <= rest * (1.0 + slack),
            "chain stretched: {measured} vs rest {rest}"
        );
        assert!(
            measured >= rest * (1.0 - slack),
            "chain collapsed: {measured} vs rest {rest}"
        );
    }

    // Scenario B: with play on and the drum at the coil anchor, 300 frames
    // of winding plus growth-fed slack draw a majority of the chain within
    // capture radius of the drum axis. The anchors are placed so that most
    // segments start OUTSIDE the capture radius - the fraction has to be
    // earned by the field, not by initial placement.
    #[test]
    fn test_scenario_b_playing_chain_coils_onto_drum() {
        let mut sim = RopeSimulation::new(SimConfig::default());
        let feed = Vec3::new(-0.4, 0.5, 0.0);
        let coil = Vec3::new(0.6, 0.5, 0.0);
        sim.rebuild_rope(Some(feed), Some(coil), Some(CoilerDrum::DrumA))
            .unwrap();
        sim.set_playing(true);

        let mut last = sim.update(Some((coil, Quat::IDENTITY)));
        assert!(
            last.coiled_fraction < 0.5,
            "majority must start outside capture, got {:.0}%",
            last.coiled_fraction * 100.0
        );

        for _ in 1..300 {
            last = sim.update(Some((coil, Quat::IDENTITY)));
        }

        assert!(
            last.coiled_fraction >= 0.5,
            "only {:.0}% of segments near the drum axis",
            last.coiled_fraction * 100.0
        );
        for &segment in sim.chain().unwrap().segments() {
            assert!(sim.world().position(segment).unwrap().is_finite());
        }
    }

    // Scenario C: ten growth cycles add exactly ten segments and a net ten
    // constraints, with the count invariant restored after every cycle.
    #[test]
    fn test_scenario_c_growth_accounting() {
        let config = SimConfig {
            growth_cadence_frames: 3,
            ..SimConfig::default()
        };
        let initial = config.initial_segments;
        let mut sim = built_sim(config);
        sim.set_playing(true);

        let mut splices = 0;
        let mut frames = 0;
        while splices < 10 {
            frames += 1;
            assert!(frames < 200, "growth cadence never fired");
            let output = sim.update(Some((COIL, Quat::IDENTITY)));
            if output.spliced.is_some() {
                splices += 1;
            }
            assert_eq!(output.constraint_count, output.segment_count + 1);
        }

        assert_eq!(sim.segment_count(), initial + 10);
        assert_eq!(sim.world().constraint_count(), initial + 11);
    }
}
