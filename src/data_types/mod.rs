pub mod axis;
pub mod interval;

pub use axis::*;
pub use interval::*;
