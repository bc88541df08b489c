//! Anchor set: the three zero-mass bodies pinning the rope path.
//!
//! Feed and mid-guide anchors are static and set once per equipment
//! selection. The coil anchor follows an animated scene node sampled by the
//! host application every frame; when the sample is missing or invalid the
//! anchor holds its last known transform instead of going bad.

use glam::{Quat, Vec3};

use crate::physics::{BodyHandle, PhysicsWorld};

/// The persistent anchor bodies. Created once per physics world and never
/// removed - divergence recovery interpolates between anchor positions, so
/// they must stay valid for the world's whole lifetime.
pub struct AnchorSet {
    feed: BodyHandle,
    mid_guide: BodyHandle,
    coil: BodyHandle,

    feed_position: Vec3,
    mid_guide_position: Vec3,
    coil_position: Vec3,
    /// Orientation of the animated grip node, kept for mesh alignment.
    coil_rotation: Quat,
}

impl AnchorSet {
    /// Create the three static anchor bodies at the origin. Positions are
    /// assigned later by `retarget` when equipment is selected.
    ///
    /// # Panics
    /// Panics if the world cannot hold three more bodies; the driver sizes
    /// the world with anchor headroom, so this only fires on misuse.
    pub fn new(world: &mut PhysicsWorld) -> Self {
        let feed = world
            .add_body(Vec3::ZERO, 0.0, 0.0)
            .expect("world sized without anchor headroom");
        let mid_guide = world
            .add_body(Vec3::ZERO, 0.0, 0.0)
            .expect("world sized without anchor headroom");
        let coil = world
            .add_body(Vec3::ZERO, 0.0, 0.0)
            .expect("world sized without anchor headroom");
        Self {
            feed,
            mid_guide,
            coil,
            feed_position: Vec3::ZERO,
            mid_guide_position: Vec3::ZERO,
            coil_position: Vec3::ZERO,
            coil_rotation: Quat::IDENTITY,
        }
    }

    /// Re-pin the feed and coil ends for a new equipment selection. The
    /// mid-guide is placed on the feed-to-coil line, lifted slightly; the
    /// build and recovery paths route over it (see `sag_point`).
    pub fn retarget(&mut self, world: &mut PhysicsWorld, feed: Vec3, coil: Vec3) {
        self.feed_position = feed;
        self.coil_position = coil;
        self.mid_guide_position = feed.lerp(coil, 0.5) + Vec3::Y * 0.05;
        world.set_position(self.feed, feed);
        world.set_position(self.mid_guide, self.mid_guide_position);
        world.set_position(self.coil, coil);
    }

    /// Copy the animated grip node's transform onto the coil anchor. A
    /// missing or non-finite sample leaves the last known transform in
    /// place - the anchor never becomes invalid mid-run.
    pub fn sync_coil(&mut self, world: &mut PhysicsWorld, sample: Option<(Vec3, Quat)>) {
        if let Some((position, rotation)) = sample {
            if position.is_finite() && rotation.is_finite() {
                self.coil_position = position;
                self.coil_rotation = rotation;
                world.set_position(self.coil, position);
            } else {
                log::warn!("coil grip node sample is non-finite, holding last transform");
            }
        }
    }

    pub fn feed_body(&self) -> BodyHandle {
        self.feed
    }

    pub fn coil_body(&self) -> BodyHandle {
        self.coil
    }

    pub fn feed_position(&self) -> Vec3 {
        self.feed_position
    }

    pub fn mid_guide_position(&self) -> Vec3 {
        self.mid_guide_position
    }

    pub fn coil_position(&self) -> Vec3 {
        self.coil_position
    }

    pub fn coil_rotation(&self) -> Quat {
        self.coil_rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coil_anchor_holds_last_known_transform() {
        let mut world = PhysicsWorld::new(8);
        let mut anchors = AnchorSet::new(&mut world);
        anchors.retarget(&mut world, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));

        let moved = Vec3::new(1.1, 0.2, 0.0);
        anchors.sync_coil(&mut world, Some((moved, Quat::IDENTITY)));
        assert_eq!(anchors.coil_position(), moved);

        // Node unavailable: nothing changes.
        anchors.sync_coil(&mut world, None);
        assert_eq!(anchors.coil_position(), moved);
        assert_eq!(world.position(anchors.coil_body()), Some(moved));

        // Invalid sample: rejected before it can reach the anchor body.
        anchors.sync_coil(&mut world, Some((Vec3::splat(f32::NAN), Quat::IDENTITY)));
        assert_eq!(anchors.coil_position(), moved);
        assert!(world.position(anchors.coil_body()).unwrap().is_finite());
    }
}
