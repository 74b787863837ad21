use std::fs::OpenOptions;
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::error::Result;

/// Send log output to `log_file`.
///
/// `verbosity` 0 keeps logging off unless `RUST_LOG` says otherwise;
/// 1 = info, 2 = debug, 3+ = trace. The terminal belongs to the UI, so
/// nothing is written to stderr.
pub fn init_logging(verbosity: u8, log_file: &Path) -> Result<()> {
    let level = match verbosity {
        0 => "off",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    Builder::from_env(Env::default().default_filter_or(format!("lyrik={level}")))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    Ok(())
}
