pub mod api;
pub mod clients;
pub mod config;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod stores;
pub mod utils;

pub use pipeline::{Collaborators, Pipeline};
pub use queue::EventQueue;
