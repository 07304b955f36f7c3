pub mod camera;
pub mod delivery;
pub mod equivalence;
pub mod metrics;

pub use camera::*;
pub use delivery::*;
pub use equivalence::*;
pub use metrics::*;
