pub mod config;
pub mod model;
pub mod monitor;
pub mod publisher;
pub mod state;
pub mod upstream;
