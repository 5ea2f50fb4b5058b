pub mod config;
pub mod db;
pub mod engine;
pub mod host;

#[cfg(test)]
mod integration_tests;
