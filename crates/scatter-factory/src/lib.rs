pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod notify;
pub mod registry;
pub mod rules;
pub mod sync;
pub mod timing;

pub use batch::*;
pub use dispatcher::*;
pub use error::*;
pub use handler::*;
pub use notify::*;
pub use registry::*;
pub use rules::{enum_index, seed_trigger, standard_rules, umask_rules};
pub use sync::*;
pub use timing::*;
