// Library surface for the binary and the integration tests.
pub mod app_dirs;
pub mod cloze;
pub mod comparator;
pub mod config;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod lyrics;
pub mod metrics;
pub mod navigation;
pub mod results;
pub mod rhythm;
pub mod runtime;
pub mod segment;
pub mod session;
pub mod view;

pub use error::{Error, Result};
