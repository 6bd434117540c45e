pub mod app;
pub mod config;
pub mod loader;
pub mod recipes;
pub mod state;
