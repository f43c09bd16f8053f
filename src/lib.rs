pub mod app;
pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod repl;
pub mod service;
