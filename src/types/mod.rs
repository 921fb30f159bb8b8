//! Data types shared by the selection engine, editor and clipboard.

mod cell;
mod geometry;
mod input;
mod selection;

pub use cell::*;
pub use geometry::*;
pub use input::*;
pub use selection::*;
