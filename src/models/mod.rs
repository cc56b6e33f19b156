pub mod assignment;
pub mod course;
pub mod plan;

pub use assignment::*;
pub use course::*;
pub use plan::*;
