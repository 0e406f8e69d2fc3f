//! Core type definitions

mod axis;
mod id;
mod transform;

pub use axis::*;
pub use id::*;
pub use transform::*;
