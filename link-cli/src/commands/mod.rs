//! CLI command implementations.

pub mod logout;
pub mod pair;
pub mod status;
