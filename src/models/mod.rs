pub mod frequency;
pub mod label;
pub mod row;
pub mod segment;
pub mod shape;
pub mod view;

pub use frequency::*;
pub use label::*;
pub use row::*;
pub use segment::*;
pub use shape::*;
pub use view::*;
