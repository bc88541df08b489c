//! Ball-joint constraint table and position-based solver.
//!
//! Constraints force two bodies' world-space pivot points to coincide while
//! leaving rotation free. Storage is Structure-of-Arrays with slot reuse;
//! handles carry generations so a handle kept across a removal can never
//! address a recycled slot.

use glam::Vec3;

use super::world::BodyHandle;

/// Handle to one ball-joint constraint slot.
///
/// Invalidated when the constraint is removed; the generation check makes
/// stale handles harmless no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// All ball-joint constraints in a physics world (SoA layout).
#[derive(Clone, Default)]
pub struct BallJointConstraints {
    /// First attached body
    body_a: Vec<BodyHandle>,
    /// Second attached body
    body_b: Vec<BodyHandle>,
    /// Pivot offset from body A's center (point masses carry no rotation,
    /// so local space == center-relative world space)
    pivot_a: Vec<Vec3>,
    /// Pivot offset from body B's center
    pivot_b: Vec<Vec3>,
    /// Center distance at which the two pivots touch. Point masses are free
    /// to rotate about the joint, so the solve reduces to holding this
    /// distance rather than pinning a world-space point.
    rest_length: Vec<f32>,
    /// Active flag (1 = active, 0 = free slot)
    is_active: Vec<u8>,
    /// Slot generations for stale-handle detection
    generations: Vec<u32>,
    /// Free slot indices available for reuse
    free_slots: Vec<u32>,
    /// Number of active constraints
    live_count: usize,
}

impl BallJointConstraints {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            body_a: Vec::with_capacity(capacity),
            body_b: Vec::with_capacity(capacity),
            pivot_a: Vec::with_capacity(capacity),
            pivot_b: Vec::with_capacity(capacity),
            rest_length: Vec::with_capacity(capacity),
            is_active: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free_slots: Vec::new(),
            live_count: 0,
        }
    }

    /// Number of active constraints.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Create a ball joint between two bodies. Pivots are offsets from each
    /// body's center; the solver drives the two world pivots to coincide.
    pub fn add(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        pivot_a: Vec3,
        pivot_b: Vec3,
    ) -> ConstraintHandle {
        let rest = pivot_a.length() + pivot_b.length();
        let index = match self.free_slots.pop() {
            Some(slot) => {
                let i = slot as usize;
                self.body_a[i] = body_a;
                self.body_b[i] = body_b;
                self.pivot_a[i] = pivot_a;
                self.pivot_b[i] = pivot_b;
                self.rest_length[i] = rest;
                self.is_active[i] = 1;
                slot
            }
            None => {
                self.body_a.push(body_a);
                self.body_b.push(body_b);
                self.pivot_a.push(pivot_a);
                self.pivot_b.push(pivot_b);
                self.rest_length.push(rest);
                self.is_active.push(1);
                self.generations.push(0);
                (self.body_a.len() - 1) as u32
            }
        };
        self.live_count += 1;
        ConstraintHandle {
            index,
            generation: self.generations[index as usize],
        }
    }

    /// Remove a constraint. Returns false if the handle was already stale.
    pub fn remove(&mut self, handle: ConstraintHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        let i = handle.index as usize;
        self.is_active[i] = 0;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free_slots.push(handle.index);
        self.live_count -= 1;
        true
    }

    /// Rest distance of a live constraint (pivot contact distance).
    pub fn rest_length_of(&self, handle: ConstraintHandle) -> Option<f32> {
        self.contains(handle)
            .then(|| self.rest_length[handle.index as usize])
    }

    /// Whether the handle still addresses a live constraint.
    pub fn contains(&self, handle: ConstraintHandle) -> bool {
        let i = handle.index as usize;
        i < self.is_active.len()
            && self.is_active[i] == 1
            && self.generations[i] == handle.generation
    }

    /// Remove every active constraint attached to `body`. Returns the number
    /// removed. Used to guarantee constraints go before bodies on teardown.
    pub fn remove_referencing(&mut self, body: BodyHandle) -> usize {
        let mut removed = 0;
        for i in 0..self.is_active.len() {
            if self.is_active[i] == 1 && (self.body_a[i] == body || self.body_b[i] == body) {
                self.is_active[i] = 0;
                self.generations[i] = self.generations[i].wrapping_add(1);
                self.free_slots.push(i as u32);
                self.live_count -= 1;
                removed += 1;
            }
        }
        removed
    }

    /// Iterative position projection holding each constrained pair at its
    /// pivot-contact distance, weighted by inverse mass. `inv_masses`
    /// encodes static, sleeping, and dead bodies as 0.0; `body_generations`
    /// filters constraints left pointing at removed body slots.
    pub fn solve(
        &self,
        positions: &mut [Vec3],
        inv_masses: &[f32],
        body_generations: &[u32],
        iterations: usize,
        max_correction: f32,
    ) {
        for _iter in 0..iterations {
            for i in 0..self.is_active.len() {
                if self.is_active[i] == 0 {
                    continue;
                }

                let a = self.body_a[i];
                let b = self.body_b[i];
                let ia = a.index as usize;
                let ib = b.index as usize;
                if ia >= positions.len() || ib >= positions.len() {
                    continue;
                }
                if body_generations[ia] != a.generation || body_generations[ib] != b.generation {
                    continue;
                }

                let delta = positions[ib] - positions[ia];
                let dist = delta.length();
                let error = dist - self.rest_length[i];
                if error.abs() < 1e-6 {
                    continue;
                }

                let normal = if dist < 1e-6 {
                    // Coincident centers: fall back to the stored pivot
                    // direction so the pair separates deterministically.
                    let fallback = self.pivot_a[i];
                    if fallback.length_squared() > 1e-8 {
                        fallback.normalize()
                    } else {
                        Vec3::X
                    }
                } else {
                    delta / dist
                };

                let w_a = inv_masses[ia];
                let w_b = inv_masses[ib];
                let w_total = w_a + w_b;
                if w_total <= 1e-10 {
                    continue;
                }

                let correction = error.clamp(-max_correction, max_correction);
                let s = correction / w_total;
                positions[ia] += normal * (s * w_a);
                positions[ib] -= normal * (s * w_b);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> BodyHandle {
        BodyHandle {
            index,
            generation: 0,
        }
    }

    #[test]
    fn test_slot_reuse_invalidates_old_handles() {
        let mut joints = BallJointConstraints::with_capacity(4);
        let c0 = joints.add(handle(0), handle(1), Vec3::ZERO, Vec3::ZERO);
        assert!(joints.remove(c0));
        assert!(!joints.remove(c0), "second removal must be a stale no-op");

        // The freed slot is recycled with a new generation.
        let c1 = joints.add(handle(2), handle(3), Vec3::ZERO, Vec3::ZERO);
        assert_eq!(c0.index, c1.index);
        assert_ne!(c0.generation, c1.generation);
        assert!(!joints.contains(c0));
        assert!(joints.contains(c1));
        assert_eq!(joints.live_count(), 1);
    }

    #[test]
    fn test_solve_pulls_pivots_together() {
        let mut joints = BallJointConstraints::with_capacity(1);
        joints.add(handle(0), handle(1), Vec3::ZERO, Vec3::ZERO);

        let mut positions = vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)];
        let inv_masses = vec![1.0, 1.0];
        let generations = vec![0, 0];

        joints.solve(&mut positions, &inv_masses, &generations, 16, 8.0);

        let gap = (positions[1] - positions[0]).length();
        assert!(gap < 1e-3, "pivots should coincide, gap = {gap}");
        // Equal masses split the correction symmetrically.
        assert!((positions[0].x - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_solve_leaves_static_side_fixed() {
        let mut joints = BallJointConstraints::with_capacity(1);
        joints.add(handle(0), handle(1), Vec3::ZERO, Vec3::ZERO);

        let mut positions = vec![Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)];
        let inv_masses = vec![0.0, 1.0]; // body 0 is static
        let generations = vec![0, 0];

        joints.solve(&mut positions, &inv_masses, &generations, 16, 8.0);

        assert_eq!(positions[0], Vec3::ZERO);
        assert!(positions[1].length() < 1e-3);
    }

    #[test]
    fn test_solve_holds_pivot_contact_distance() {
        let mut joints = BallJointConstraints::with_capacity(1);
        // Pivots half-way toward each other: contact at distance 1.0.
        joints.add(
            handle(0),
            handle(1),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(-0.5, 0.0, 0.0),
        );

        let mut positions = vec![Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)];
        let inv_masses = vec![1.0, 1.0];
        let generations = vec![0, 0];

        joints.solve(&mut positions, &inv_masses, &generations, 16, 8.0);

        let dist = (positions[1] - positions[0]).length();
        assert!((dist - 1.0).abs() < 1e-3, "expected rest distance, got {dist}");
    }

    #[test]
    fn test_remove_referencing() {
        let mut joints = BallJointConstraints::with_capacity(4);
        joints.add(handle(0), handle(1), Vec3::ZERO, Vec3::ZERO);
        joints.add(handle(1), handle(2), Vec3::ZERO, Vec3::ZERO);
        let keep = joints.add(handle(3), handle(4), Vec3::ZERO, Vec3::ZERO);

        assert_eq!(joints.remove_referencing(handle(1)), 2);
        assert_eq!(joints.live_count(), 1);
        assert!(joints.contains(keep));
    }
}
