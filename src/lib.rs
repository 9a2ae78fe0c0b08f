pub mod catalog;
pub mod config;
pub mod datatypes;
pub mod error;
pub mod query;
pub mod repository;
pub mod scalar;
pub mod statistics;
pub mod store;
#[cfg(test)]
pub mod testing;
