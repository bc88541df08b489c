//! Render curve extraction: chain-ordered positions fitted with a smooth
//! Catmull-Rom interpolation.
//!
//! The control points are read in rope order, never spatial order - a
//! coiled rope crosses itself constantly and any spatial sort would shred
//! the tube. The point list is ephemeral: rebuilt every frame, never
//! persisted.

use glam::Vec3;

use crate::physics::PhysicsWorld;
use crate::rope::chain::RopeChain;

/// Ordered rope-backbone positions for one frame. Its length always equals
/// the live segment count at sampling time, including immediately after a
/// same-frame splice.
#[derive(Clone, Default)]
pub struct RopeCurve {
    points: Vec<Vec3>,
}

impl RopeCurve {
    /// Read every segment position in chain order.
    pub fn from_chain(world: &PhysicsWorld, chain: &RopeChain) -> Self {
        let mut points = Vec::with_capacity(chain.segment_count());
        let mut last = Vec3::ZERO;
        for &segment in chain.segments() {
            // Chain handles are valid by construction; a stale handle here
            // would mean the chain outlived its world, so hold the previous
            // point rather than shortening the curve.
            let point = world.position(segment).unwrap_or(last);
            points.push(point);
            last = point;
        }
        Self { points }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Sample a Catmull-Rom curve through `control` with `samples_per_span`
/// points per span, passing exactly through every control point. End spans
/// use reflected phantom points so the curve is clamped, not shortened.
pub fn sample_catmull_rom(control: &[Vec3], samples_per_span: usize) -> Vec<Vec3> {
    if control.len() < 2 || samples_per_span == 0 {
        return control.to_vec();
    }

    let n = control.len();
    let phantom_start = 2.0 * control[0] - control[1];
    let phantom_end = 2.0 * control[n - 1] - control[n - 2];
    let at = |i: isize| -> Vec3 {
        if i < 0 {
            phantom_start
        } else if i as usize >= n {
            phantom_end
        } else {
            control[i as usize]
        }
    };

    let mut samples = Vec::with_capacity((n - 1) * samples_per_span + 1);
    for span in 0..n - 1 {
        let p0 = at(span as isize - 1);
        let p1 = at(span as isize);
        let p2 = at(span as isize + 1);
        let p3 = at(span as isize + 2);
        for step in 0..samples_per_span {
            let t = step as f32 / samples_per_span as f32;
            samples.push(catmull_rom(p0, p1, p2, p3, t));
        }
    }
    samples.push(control[n - 1]);
    samples
}

/// Cumulative approximate arc length at each sample, starting at 0.
pub fn arc_lengths(samples: &[Vec3]) -> Vec<f32> {
    let mut lengths = Vec::with_capacity(samples.len());
    let mut total = 0.0;
    for (i, point) in samples.iter().enumerate() {
        if i > 0 {
            total += (*point - samples[i - 1]).length();
        }
        lengths.push(total);
    }
    lengths
}

/// Uniform Catmull-Rom basis at parameter `t` in [0, 1].
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - 3.0 * p2 - p0 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_pass_through_control_points() {
        let control = vec![
            Vec3::ZERO,
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(2.0, -0.3, 0.4),
            Vec3::new(3.0, 0.0, 0.0),
        ];
        let samples_per_span = 4;
        let samples = sample_catmull_rom(&control, samples_per_span);

        assert_eq!(samples.len(), (control.len() - 1) * samples_per_span + 1);
        for (k, point) in control.iter().enumerate() {
            let sample = samples[k * samples_per_span];
            assert!(
                (sample - *point).length() < 1e-4,
                "knot {k}: {sample} != {point}"
            );
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(sample_catmull_rom(&[], 4).is_empty());
        let single = vec![Vec3::ONE];
        assert_eq!(sample_catmull_rom(&single, 4), single);
    }

    #[test]
    fn test_arc_lengths_are_monotonic() {
        let samples = sample_catmull_rom(
            &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0)],
            8,
        );
        let lengths = arc_lengths(&samples);
        assert_eq!(lengths.len(), samples.len());
        assert_eq!(lengths[0], 0.0);
        for pair in lengths.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        // At least as long as the straight chord between the endpoints
        assert!(*lengths.last().unwrap() >= 2.0 - 1e-3);
    }
}
