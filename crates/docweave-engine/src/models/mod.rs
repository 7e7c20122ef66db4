pub mod attributes;
pub mod doc_pos;
pub mod fragment;
pub mod geometry;
pub mod style;

pub use attributes::*;
pub use doc_pos::*;
pub use fragment::*;
pub use geometry::*;
pub use style::*;
