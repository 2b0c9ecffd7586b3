pub mod api;
pub mod chain;
pub mod cli;
pub mod config;
pub mod observe;

pub use {api::Api, chain::Chain, config::Config};
