//! Various utilities functions and types

mod error;
mod geometry;

pub use self::error::error_chain;
pub use self::geometry::{Physical, Point, Raw, Rectangle, Size};
