//! Integration tests with mock HTTP server

pub mod inference;
pub mod models;
