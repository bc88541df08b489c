//! Rope chain: ordered point-mass segments joined by ball joints.
//!
//! The segment array index encodes rope order from feed to coil, not any
//! cached spatial position. Splices shift every index past the insertion
//! point, so indices must never be cached across frames.
//!
//! Constraint bookkeeping mirrors the segment order: slot 0 is the feed
//! anchor link, slots 1..count join adjacent segments, and the last slot is
//! the coil anchor link. A healthy chain therefore always holds exactly
//! `segment_count + 1` constraints, except inside the single synchronous
//! splice operation.

use glam::Vec3;
use thiserror::Error;

use super::anchors::AnchorSet;
use crate::physics::{BodyHandle, ConstraintHandle, PhysicsWorld};

/// Build-time faults. The core refuses to build (no-op) rather than leave a
/// partially constructed chain behind; callers avoid these by not invoking
/// build until the equipment selection is complete.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("feed anchor is not configured")]
    MissingFeedAnchor,
    #[error("coil anchor is not configured")]
    MissingCoilAnchor,
    #[error("no coiler drum selected")]
    MissingEquipment,
    #[error("anchor position is not finite")]
    NonFiniteAnchor,
    #[error("segment count {0} is too small for a chain")]
    TooFewSegments(usize),
    #[error("physics world cannot hold {0} more bodies")]
    WorldFull(usize),
}

/// One completed chain splice: the new segment now sits at `index + 1`.
#[derive(Debug, Clone, Copy)]
pub struct SpliceEvent {
    /// Segment index the splice happened after
    pub index: usize,
    /// Handle of the inserted segment body
    pub segment: BodyHandle,
}

/// Interpolate the build/recovery path: feed anchor over the mid-guide to
/// the coil anchor, sagged downward by a half sine that is deepest
/// mid-span. The path passes exactly over the guide at `t = 0.5`.
pub fn sag_point(feed: Vec3, mid_guide: Vec3, coil: Vec3, t: f32, sag_depth: f32) -> Vec3 {
    let base = if t < 0.5 {
        feed.lerp(mid_guide, t * 2.0)
    } else {
        mid_guide.lerp(coil, (t - 0.5) * 2.0)
    };
    base + Vec3::NEG_Y * (sag_depth * (std::f32::consts::PI * t).sin())
}

/// The rope backbone: segment bodies in rope order plus their joints.
pub struct RopeChain {
    segments: Vec<BodyHandle>,
    constraints: Vec<ConstraintHandle>,
    mass: f32,
    radius: f32,
    /// Sum of all link rest lengths, maintained across splices
    rest_length: f32,
    /// Nominal rest length of one link, fixed at build time. Splices feed
    /// rope at this length regardless of the instantaneous gap.
    link_length: f32,
}

impl RopeChain {
    /// Build `count` segments along the sine-sagged path from the feed
    /// anchor over the mid-guide to the coil anchor, joining them with
    /// `count - 1` adjacent ball joints plus one link to each end anchor.
    pub fn build(
        world: &mut PhysicsWorld,
        anchors: &AnchorSet,
        count: usize,
        mass: f32,
        radius: f32,
        sag_depth: f32,
    ) -> Result<Self, ConfigurationError> {
        let feed = anchors.feed_position();
        let mid_guide = anchors.mid_guide_position();
        let coil = anchors.coil_position();
        if !feed.is_finite() || !coil.is_finite() {
            return Err(ConfigurationError::NonFiniteAnchor);
        }
        if count < 2 {
            return Err(ConfigurationError::TooFewSegments(count));
        }
        if world.free_capacity() < count {
            return Err(ConfigurationError::WorldFull(count));
        }

        let mut segments = Vec::with_capacity(count);
        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            let t = (i + 1) as f32 / (count + 1) as f32;
            let position = sag_point(feed, mid_guide, coil, t, sag_depth);
            // Capacity was checked above
            let body = world
                .add_body(position, mass, radius)
                .ok_or(ConfigurationError::WorldFull(count))?;
            segments.push(body);
            points.push(position);
        }

        let mut constraints = Vec::with_capacity(count + 1);
        let mut rest_length = 0.0;

        // Feed anchor link
        let half = (points[0] - feed) * 0.5;
        constraints.push(world.add_constraint(anchors.feed_body(), segments[0], half, -half));
        rest_length += half.length() * 2.0;

        // Adjacent segment links
        for i in 0..count - 1 {
            let half = (points[i + 1] - points[i]) * 0.5;
            constraints.push(world.add_constraint(segments[i], segments[i + 1], half, -half));
            rest_length += half.length() * 2.0;
        }

        // Coil anchor link
        let half = (coil - points[count - 1]) * 0.5;
        constraints.push(world.add_constraint(
            segments[count - 1],
            anchors.coil_body(),
            half,
            -half,
        ));
        rest_length += half.length() * 2.0;

        log::debug!(
            "built rope chain: {} segments, {} constraints",
            segments.len(),
            constraints.len()
        );

        let link_length = rest_length / constraints.len() as f32;
        Ok(Self {
            segments,
            constraints,
            mass,
            radius,
            rest_length,
            link_length,
        })
    }

    /// Split the link after `index`, seed a new segment slightly below
    /// segment `index`, and join it to both neighbors. The two replacement
    /// links carry the chain's nominal link rest length, so every splice
    /// feeds roughly one link of rope into the chain - the slack the coiler
    /// winds onto the drum. Returns `None` and leaves the chain untouched
    /// when the index is out of range or the world is full - growth races
    /// teardown by design and must never fault.
    pub fn splice(
        &mut self,
        world: &mut PhysicsWorld,
        index: usize,
        drop: f32,
    ) -> Option<SpliceEvent> {
        if index + 1 >= self.segments.len() {
            return None;
        }
        if world.free_capacity() == 0 {
            return None;
        }

        let seg_a = self.segments[index];
        let seg_b = self.segments[index + 1];
        let pos_a = world.position(seg_a)?;
        let pos_b = world.position(seg_b)?;
        let old_link = self.constraints[index + 1];
        let old_rest = world.constraint_rest_length(old_link).unwrap_or(0.0);

        let new_position = pos_a + Vec3::NEG_Y * drop;
        // Capacity was checked above
        let body = world.add_body(new_position, self.mass, self.radius)?;

        world.remove_constraint(old_link);

        let half_a = Vec3::NEG_Y * (self.link_length * 0.5);
        let link_a = world.add_constraint(seg_a, body, half_a, -half_a);
        let dir_b = (pos_b - new_position).try_normalize().unwrap_or(Vec3::Y);
        let half_b = dir_b * (self.link_length * 0.5);
        let link_b = world.add_constraint(body, seg_b, half_b, -half_b);

        self.constraints[index + 1] = link_a;
        self.constraints.insert(index + 2, link_b);
        self.segments.insert(index + 1, body);
        self.rest_length += self.link_length * 2.0 - old_rest;

        // The neighbors must take part in the next solve even if they had
        // settled to sleep around the splice point.
        world.wake(seg_a);
        world.wake(seg_b);

        Some(SpliceEvent {
            index,
            segment: body,
        })
    }

    /// Destroy the whole chain: every constraint referencing chain bodies is
    /// removed before any body. Safe to call repeatedly; the second call is
    /// a no-op.
    pub fn teardown(&mut self, world: &mut PhysicsWorld) {
        for constraint in self.constraints.drain(..) {
            world.remove_constraint(constraint);
        }
        for segment in self.segments.drain(..) {
            world.remove_constraints_referencing(segment);
            world.remove_body(segment);
        }
        self.rest_length = 0.0;
    }

    /// Segment handles in rope order, feed end first.
    pub fn segments(&self) -> &[BodyHandle] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn segment_radius(&self) -> f32 {
        self.radius
    }

    /// Sum of all link rest lengths (the chain's nominal length).
    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }

    /// Nominal rest length of one link.
    pub fn link_length(&self) -> f32 {
        self.link_length
    }

    /// Current polyline length through the segment centers.
    pub fn measured_length(&self, world: &PhysicsWorld) -> f32 {
        let mut total = 0.0;
        for pair in self.segments.windows(2) {
            if let (Some(a), Some(b)) = (world.position(pair[0]), world.position(pair[1])) {
                total += (b - a).length();
            }
        }
        total
    }
}
