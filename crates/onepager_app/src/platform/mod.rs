//! Terminal front end: configuration, logging, and the wizard loop.
pub mod app;
pub mod config;
pub mod effects;
pub mod input;
pub mod logging;
pub mod render;
