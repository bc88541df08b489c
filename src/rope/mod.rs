//! Rope domain: the chain, its anchors, the coiler field, growth, and
//! divergence recovery.

pub mod anchors;
pub mod chain;
pub mod coiler;
pub mod growth;
pub mod recovery;

pub use anchors::AnchorSet;
pub use chain::{sag_point, ConfigurationError, RopeChain, SpliceEvent};
pub use coiler::{CoilerDrum, CoilerField, CoilerVolume};
pub use growth::GrowthController;
pub use recovery::DivergenceMonitor;
