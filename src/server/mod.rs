//! HTTP surface and process wiring.

mod builder;
mod routes;
pub use builder::*;
pub use routes::*;
