pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod introspection;
pub mod literal;
pub mod loader;
pub mod logging;
pub mod mock;
pub mod model;
pub mod ops;
pub mod sdl;
pub mod workflow;
