pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod persona;
pub mod provider;
pub mod relay;
pub mod resources;
pub mod routes;

pub use error::{Error, Result};
