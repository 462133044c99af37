// Library crate exposing modules for integration tests

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod repository;
pub mod scanner;
pub mod util;
