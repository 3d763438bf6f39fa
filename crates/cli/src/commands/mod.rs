//! Subcommand implementations.

pub mod orders;
pub mod packages;

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::CliError;

/// Write `value` to stdout as pretty JSON.
pub(crate) fn emit<T: Serialize>(value: &T) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out).map_err(|source| CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}
