pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod gremlin;
pub mod llm;
pub mod search;
pub mod seed;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{RecipebotError, Result};
