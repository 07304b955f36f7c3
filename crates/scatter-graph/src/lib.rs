pub mod memory;
pub mod ops;

pub use memory::*;
pub use ops::*;
