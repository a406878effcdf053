//! JSON output for the CLI
//!
//! One JSON object per line on stdout, UTF-8 only.

use std::io::Write;

use serde::Serialize;

use super::errors::CliResult;

/// Write `value` as one JSON line.
pub fn write_json_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}
