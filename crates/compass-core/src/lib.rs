pub mod access;
pub mod config;
pub mod error;

pub use access::{Permission, Role};
pub use config::CompassConfig;
pub use error::{CompassError, Result};
