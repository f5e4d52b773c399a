mod release_cache;
mod single_flight;
pub use release_cache::*;
pub use single_flight::*;

#[cfg(test)]
mod single_flight_test;
