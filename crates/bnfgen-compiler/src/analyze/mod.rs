//! Grammar analysis that runs before any code is emitted.

pub(crate) mod inheritance;


pub(crate) use inheritance::{analyze, Inheritance};
