pub mod analyze;
pub mod cursor;
pub mod segment_builder;

pub use analyze::*;
pub use cursor::*;
pub use segment_builder::*;
