mod mem_config_store;
pub use mem_config_store::*;

#[cfg(test)]
mod mem_config_store_test;
