pub mod api;
pub mod audit;
pub mod auth;
pub mod backup;
pub mod config;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod host;
pub mod io;
pub mod paths;
pub mod status;
pub mod types;
pub mod validate;

pub use error::{DevctlError, Result};
