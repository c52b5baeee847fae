//! Utility modules shared by resources, sets and the server.

pub mod hash;
pub mod mime;
pub mod path;
