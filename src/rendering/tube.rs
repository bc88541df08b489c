//! Tube surface generation: a constant-radius ring sweep along the sampled
//! rope curve.
//!
//! The V texture coordinate is scaled by accumulated arc length rather than
//! ring index, so the surface texture does not stretch as the rope grows.
//! Normal frames are carried along the curve by projecting the previous
//! ring's normal off the new tangent, which keeps rings from flipping on
//! tight coils.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::curve::arc_lengths;

/// Vertex data for the rope tube mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TubeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Sweep a tube of `radius` along `centerline` with `radial_segments`
/// vertices per ring. Returns empty geometry for degenerate centerlines.
pub fn generate_tube_mesh(
    centerline: &[Vec3],
    radius: f32,
    radial_segments: u32,
    uv_scale: f32,
) -> (Vec<TubeVertex>, Vec<u32>) {
    if centerline.len() < 2 || radial_segments < 3 {
        return (Vec::new(), Vec::new());
    }

    let ring_count = centerline.len() as u32;
    let lengths = arc_lengths(centerline);

    let mut vertices = Vec::with_capacity((ring_count * radial_segments) as usize);
    let mut indices = Vec::with_capacity(((ring_count - 1) * radial_segments * 6) as usize);

    let mut frame_normal = Vec3::ZERO;
    for (i, &center) in centerline.iter().enumerate() {
        let tangent = ring_tangent(centerline, i);
        frame_normal = transport_normal(frame_normal, tangent);
        let binormal = tangent.cross(frame_normal).normalize();

        let v = lengths[i] * uv_scale;
        for j in 0..radial_segments {
            let angle = (j as f32 / radial_segments as f32) * std::f32::consts::TAU;
            let (sin_a, cos_a) = angle.sin_cos();
            let offset = frame_normal * cos_a + binormal * sin_a;

            vertices.push(TubeVertex {
                position: (center + offset * radius).to_array(),
                normal: offset.to_array(),
                uv: [j as f32 / radial_segments as f32, v],
            });
        }
    }

    // Two CCW triangles per quad between consecutive rings
    for i in 0..ring_count - 1 {
        for j in 0..radial_segments {
            let current = i * radial_segments + j;
            let next = i * radial_segments + (j + 1) % radial_segments;
            let current_next_ring = (i + 1) * radial_segments + j;
            let next_next_ring = (i + 1) * radial_segments + (j + 1) % radial_segments;

            indices.push(current);
            indices.push(next);
            indices.push(current_next_ring);

            indices.push(next);
            indices.push(next_next_ring);
            indices.push(current_next_ring);
        }
    }

    (vertices, indices)
}

/// Central-difference tangent at ring `i`, clamped at the ends.
fn ring_tangent(centerline: &[Vec3], i: usize) -> Vec3 {
    let n = centerline.len();
    let ahead = centerline[(i + 1).min(n - 1)];
    let behind = centerline[i.saturating_sub(1)];
    let tangent = ahead - behind;
    if tangent.length_squared() > 1e-10 {
        tangent.normalize()
    } else {
        Vec3::Y
    }
}

/// Carry the previous ring's normal onto the new tangent plane. The first
/// ring (zero normal) picks any stable perpendicular.
fn transport_normal(previous: Vec3, tangent: Vec3) -> Vec3 {
    let projected = previous - tangent * previous.dot(tangent);
    if projected.length_squared() > 1e-8 {
        return projected.normalize();
    }
    // Degenerate or first ring: build a perpendicular from the smaller axes
    let reference = if tangent.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
    tangent.cross(reference).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line(points: usize) -> Vec<Vec3> {
        (0..points)
            .map(|i| Vec3::new(i as f32 * 0.1, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_mesh_counts() {
        let line = straight_line(5);
        let (vertices, indices) = generate_tube_mesh(&line, 0.01, 6, 8.0);
        assert_eq!(vertices.len(), 5 * 6);
        assert_eq!(indices.len(), 4 * 6 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn test_degenerate_centerline_yields_empty_mesh() {
        let (vertices, indices) = generate_tube_mesh(&[Vec3::ZERO], 0.01, 6, 8.0);
        assert!(vertices.is_empty());
        assert!(indices.is_empty());
    }

    #[test]
    fn test_vertices_sit_on_tube_surface() {
        let line = straight_line(4);
        let radius = 0.02;
        let (vertices, _) = generate_tube_mesh(&line, radius, 8, 8.0);

        for vertex in &vertices {
            let position = Vec3::from_array(vertex.position);
            assert!(position.is_finite());
            // Straight +X line: every vertex is `radius` off the axis
            let off_axis = Vec3::new(0.0, position.y, position.z).length();
            assert!((off_axis - radius).abs() < 1e-5);
            // Outward unit normal
            let normal = Vec3::from_array(vertex.normal);
            assert!((normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_v_coordinate_tracks_arc_length() {
        let line = straight_line(5);
        let uv_scale = 8.0;
        let (vertices, _) = generate_tube_mesh(&line, 0.01, 6, uv_scale);

        // First vertex of each ring
        for ring in 0..5 {
            let v = vertices[ring * 6].uv[1];
            let expected = ring as f32 * 0.1 * uv_scale;
            assert!((v - expected).abs() < 1e-4, "ring {ring}: v={v}");
        }
    }
}
