//! Rope rendering: curve extraction, tube geometry, and GPU mesh sync.

pub mod curve;
pub mod rope_mesh;
pub mod tube;

pub use curve::{arc_lengths, sample_catmull_rom, RopeCurve};
pub use rope_mesh::RopeMesh;
pub use tube::{generate_tube_mesh, TubeVertex};
