mod case_insensitive;
pub use case_insensitive::*;

pub mod file_io;
pub mod namespace;
pub mod time;

#[cfg(test)]
mod case_insensitive_test;
#[cfg(test)]
mod namespace_test;
