pub mod config_manager;
pub mod error;
pub mod gate;
pub mod graph;
pub mod host;
pub mod logging;
pub mod property;
pub mod scene;
pub mod scheduler;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use gate::*;
pub use graph::*;
pub use host::*;
pub use logging::*;
pub use property::*;
pub use scene::*;
pub use scheduler::*;
pub use types::*;
