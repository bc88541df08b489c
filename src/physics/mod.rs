//! Point-mass physics: the body world and the ball-joint constraint solver.

pub mod constraint;
pub mod world;

pub use constraint::{BallJointConstraints, ConstraintHandle};
pub use world::{BodyHandle, PhysicsWorld};
