pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod ingest;
pub mod output;
pub mod summary;
