pub mod error;
pub mod options;

pub use error::{ConfigError, Result};
pub use options::{ReloadOptions, TlsFiles};
