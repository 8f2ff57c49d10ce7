pub mod coord;
pub mod ids;

// Foundation crate: small, well-tested primitives only.
pub use coord::*;
pub use ids::*;
