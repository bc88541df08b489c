//! Headless demo: builds a rope between two fixed points, spins the coiler
//! for a few hundred frames with a gently bobbing grip node, and logs the
//! telemetry. Run with `RUST_LOG=info` (or `debug` for splice events).

use glam::{Quat, Vec3};

use coilrig::{CoilerDrum, RopeSimulation, SimConfig};

fn main() {
    env_logger::init();

    let config = SimConfig::default();
    let mut sim = RopeSimulation::new(config);

    let feed = Vec3::new(-0.6, 0.5, 0.0);
    let coil = Vec3::new(0.6, 0.5, 0.0);
    if let Err(error) = sim.rebuild_rope(Some(feed), Some(coil), Some(CoilerDrum::DrumA)) {
        log::error!("rope rebuild refused: {error}");
        return;
    }
    sim.set_playing(true);

    for frame in 0..600u32 {
        // Bob the grip node the way the configurator's animation track would.
        let t = frame as f32 / 60.0;
        let sample = (
            coil + Vec3::Y * (0.03 * (t * 0.8).sin()),
            Quat::from_rotation_y(t * 1.5),
        );
        let output = sim.update(Some(sample));

        if frame % 120 == 0 {
            let (vertices, indices) = sim.tube_geometry();
            log::info!(
                "frame {frame}: {} segments, {} constraints, {:.0}% coiled, \
                 tube {} verts / {} indices, {} recovered",
                output.segment_count,
                output.constraint_count,
                output.coiled_fraction * 100.0,
                vertices.len(),
                indices.len(),
                output.recovered,
            );
        }
    }

    sim.teardown_rope();
    log::info!("done");
}
