//! Physics world: arena-indexed point-mass bodies plus the ball-joint table.
//!
//! Storage is Structure-of-Arrays, pre-allocated to capacity so stepping
//! never allocates. Bodies are addressed through generation-checked handles;
//! a handle kept across a removal addresses nothing, never a recycled body.
//!
//! Integration is semi-implicit Euler with position-based constraint
//! projection and velocity recovery from positions, sub-stepped internally.
//! Forces are cleared after every step - callers re-apply them each frame.

use glam::Vec3;

use super::constraint::{BallJointConstraints, ConstraintHandle};
use crate::config::SimConfig;

/// Handle to one rigid body slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Point-mass rigid body world.
///
/// Mass 0.0 marks a static (or externally driven) body: it never integrates,
/// never sleeps, and acts as an infinite mass in constraint projection.
#[derive(Clone)]
pub struct PhysicsWorld {
    capacity: usize,
    live_count: usize,

    positions: Vec<Vec3>,
    prev_positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    forces: Vec<Vec3>,
    masses: Vec<f32>,
    radii: Vec<f32>,

    alive: Vec<bool>,
    awake: Vec<bool>,
    still_steps: Vec<u32>,
    generations: Vec<u32>,
    free_slots: Vec<u32>,

    /// Scratch inverse masses for the constraint solve (0 = immovable)
    inv_mass_scratch: Vec<f32>,

    constraints: BallJointConstraints,
}

impl PhysicsWorld {
    /// Create a world holding at most `capacity` bodies. All arrays are
    /// pre-allocated; adding and removing bodies never reallocates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            live_count: 0,
            positions: vec![Vec3::ZERO; capacity],
            prev_positions: vec![Vec3::ZERO; capacity],
            velocities: vec![Vec3::ZERO; capacity],
            forces: vec![Vec3::ZERO; capacity],
            masses: vec![1.0; capacity],
            radii: vec![1.0; capacity],
            alive: vec![false; capacity],
            awake: vec![false; capacity],
            still_steps: vec![0; capacity],
            generations: vec![0; capacity],
            free_slots: (0..capacity as u32).rev().collect(),
            inv_mass_scratch: vec![0.0; capacity],
            constraints: BallJointConstraints::with_capacity(capacity + 1),
        }
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.live_count
    }

    /// Remaining body slots.
    pub fn free_capacity(&self) -> usize {
        self.capacity - self.live_count
    }

    /// Number of live constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.live_count()
    }

    /// Add a body. Mass 0.0 creates a static body. Returns `None` at capacity.
    pub fn add_body(&mut self, position: Vec3, mass: f32, radius: f32) -> Option<BodyHandle> {
        let index = self.free_slots.pop()?;
        let i = index as usize;

        self.positions[i] = position;
        self.prev_positions[i] = position;
        self.velocities[i] = Vec3::ZERO;
        self.forces[i] = Vec3::ZERO;
        self.masses[i] = mass;
        self.radii[i] = radius;
        self.alive[i] = true;
        self.awake[i] = true;
        self.still_steps[i] = 0;
        self.live_count += 1;

        Some(BodyHandle {
            index,
            generation: self.generations[i],
        })
    }

    /// Remove a body, invalidating its handle. Constraints still referencing
    /// it become inert (generation mismatch) but are not reclaimed; callers
    /// that own constraints remove those first.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        let i = handle.index as usize;
        self.alive[i] = false;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free_slots.push(handle.index);
        self.live_count -= 1;
        true
    }

    /// Whether the handle still addresses a live body.
    pub fn contains(&self, handle: BodyHandle) -> bool {
        let i = handle.index as usize;
        i < self.capacity && self.alive[i] && self.generations[i] == handle.generation
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.contains(handle)
            .then(|| self.positions[handle.index as usize])
    }

    /// Teleport a body. Clears implied velocity (previous position follows),
    /// so recovery re-seeds do not inject a spurious impulse.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        if self.contains(handle) {
            let i = handle.index as usize;
            self.positions[i] = position;
            self.prev_positions[i] = position;
        }
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.contains(handle)
            .then(|| self.velocities[handle.index as usize])
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if self.contains(handle) {
            self.velocities[handle.index as usize] = velocity;
        }
    }

    /// Accumulate a central force for the next step. Sleeping and static
    /// bodies ignore forces - force generators must wake their targets (the
    /// divergence monitor's wake pass exists for exactly this reason).
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) {
        if self.contains(handle) {
            let i = handle.index as usize;
            if self.awake[i] && self.masses[i] > 0.0 && force.is_finite() {
                self.forces[i] += force;
            }
        }
    }

    pub fn is_awake(&self, handle: BodyHandle) -> bool {
        self.contains(handle) && self.awake[handle.index as usize]
    }

    pub fn wake(&mut self, handle: BodyHandle) {
        if self.contains(handle) {
            let i = handle.index as usize;
            self.awake[i] = true;
            self.still_steps[i] = 0;
        }
    }

    pub fn add_constraint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        pivot_a: Vec3,
        pivot_b: Vec3,
    ) -> ConstraintHandle {
        self.constraints.add(body_a, body_b, pivot_a, pivot_b)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        self.constraints.remove(handle)
    }

    pub fn contains_constraint(&self, handle: ConstraintHandle) -> bool {
        self.constraints.contains(handle)
    }

    /// Rest distance of a live constraint.
    pub fn constraint_rest_length(&self, handle: ConstraintHandle) -> Option<f32> {
        self.constraints.rest_length_of(handle)
    }

    /// Remove every constraint attached to `body`.
    pub fn remove_constraints_referencing(&mut self, body: BodyHandle) -> usize {
        self.constraints.remove_referencing(body)
    }

    /// Advance the simulation by `dt`, sub-stepping internally for stability.
    /// Accumulated forces are consumed and cleared.
    pub fn step(&mut self, dt: f32, config: &SimConfig) {
        let substeps = config.substeps.max(1);
        let h = dt / substeps as f32;

        for i in 0..self.capacity {
            self.inv_mass_scratch[i] = if self.alive[i] && self.awake[i] && self.masses[i] > 0.0 {
                1.0 / self.masses[i]
            } else {
                0.0
            };
        }

        let damping_factor = config.velocity_damping.powf(h * 100.0);

        for _sub in 0..substeps {
            // 1. Integrate velocities and predict positions
            for i in 0..self.capacity {
                if !self.alive[i] {
                    continue;
                }
                self.prev_positions[i] = self.positions[i];
                if !self.awake[i] || self.masses[i] <= 0.0 {
                    continue;
                }
                let acceleration = config.gravity + self.forces[i] / self.masses[i];
                if acceleration.is_finite() {
                    self.velocities[i] = (self.velocities[i] + acceleration * h) * damping_factor;
                }
                if self.velocities[i].is_finite() {
                    self.positions[i] += self.velocities[i] * h;
                }
            }

            // 2. Project ball-joint constraints
            self.constraints.solve(
                &mut self.positions,
                &self.inv_mass_scratch,
                &self.generations,
                config.constraint_iterations,
                config.max_correction,
            );

            // 3. Recover velocities from corrected positions
            for i in 0..self.capacity {
                if self.alive[i] && self.awake[i] && self.masses[i] > 0.0 {
                    self.velocities[i] = (self.positions[i] - self.prev_positions[i]) / h;
                }
            }
        }

        // Forces never persist across steps
        for i in 0..self.capacity {
            self.forces[i] = Vec3::ZERO;
        }

        self.update_sleep_state(config);
    }

    /// Put bodies to sleep after sustained low motion. Static bodies never
    /// sleep; they are skipped by integration anyway.
    fn update_sleep_state(&mut self, config: &SimConfig) {
        let threshold_sq = config.sleep_velocity * config.sleep_velocity;
        for i in 0..self.capacity {
            if !self.alive[i] || !self.awake[i] || self.masses[i] <= 0.0 {
                continue;
            }
            if self.velocities[i].length_squared() < threshold_sq {
                self.still_steps[i] += 1;
                if self.still_steps[i] >= config.sleep_steps {
                    self.awake[i] = false;
                    self.velocities[i] = Vec3::ZERO;
                }
            } else {
                self.still_steps[i] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> SimConfig {
        SimConfig {
            gravity: Vec3::ZERO,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_handle_generation_safety() {
        let mut world = PhysicsWorld::new(4);
        let a = world.add_body(Vec3::ZERO, 1.0, 0.1).unwrap();
        assert!(world.remove_body(a));
        assert!(!world.remove_body(a));
        assert!(world.position(a).is_none());

        // Reused slot must not be reachable through the stale handle.
        let b = world.add_body(Vec3::ONE, 1.0, 0.1).unwrap();
        assert_eq!(a.index, b.index);
        assert!(!world.contains(a));
        assert_eq!(world.position(b), Some(Vec3::ONE));
    }

    #[test]
    fn test_static_body_ignores_forces_and_gravity() {
        let mut world = PhysicsWorld::new(2);
        let anchor = world.add_body(Vec3::ZERO, 0.0, 0.1).unwrap();
        world.apply_force(anchor, Vec3::new(100.0, 100.0, 100.0));
        world.step(1.0 / 60.0, &SimConfig::default());
        assert_eq!(world.position(anchor), Some(Vec3::ZERO));
    }

    #[test]
    fn test_sleeping_body_rejects_forces_until_woken() {
        let config = quiet_config();
        let mut world = PhysicsWorld::new(2);
        let body = world.add_body(Vec3::ZERO, 1.0, 0.1).unwrap();

        // No gravity, no motion: the body falls asleep.
        for _ in 0..(config.sleep_steps + 1) {
            world.step(config.fixed_timestep, &config);
        }
        assert!(!world.is_awake(body));

        world.apply_force(body, Vec3::new(10.0, 0.0, 0.0));
        world.step(config.fixed_timestep, &config);
        assert_eq!(world.position(body), Some(Vec3::ZERO));

        world.wake(body);
        world.apply_force(body, Vec3::new(10.0, 0.0, 0.0));
        world.step(config.fixed_timestep, &config);
        assert!(world.position(body).unwrap().x > 0.0);
    }

    #[test]
    fn test_constrained_pair_keeps_pivot_contact() {
        let config = quiet_config();
        let mut world = PhysicsWorld::new(3);
        let anchor = world.add_body(Vec3::ZERO, 0.0, 0.1).unwrap();
        let body = world
            .add_body(Vec3::new(0.5, 0.0, 0.0), 1.0, 0.1)
            .unwrap();
        // Joint holding the body half a meter from the anchor.
        world.add_constraint(
            anchor,
            body,
            Vec3::new(0.25, 0.0, 0.0),
            Vec3::new(-0.25, 0.0, 0.0),
        );

        world.set_velocity(body, Vec3::new(3.0, 0.0, 0.0));
        for _ in 0..30 {
            world.step(config.fixed_timestep, &config);
        }
        let distance = world.position(body).unwrap().length();
        assert!(
            (distance - 0.5).abs() < 0.05,
            "joint should hold spacing, got {distance}"
        );
    }
}
