//! JSON I/O handling for CLI
//!
//! - Input: one JSON value from a file, or from stdin
//! - Output: one JSON object on stdout, `{"status": "ok", "data": ...}`
//! - UTF-8 only

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read a JSON value from `file`, or from stdin when `None`
pub fn read_input(file: Option<&Path>) -> CliResult<Value> {
    let content = match file {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::io_error(format!("Failed to read {}: {}", path.display(), e))
        })?,
        None => {
            let mut content = String::new();
            io::stdin().lock().read_to_string(&mut content)?;
            content
        }
    };

    parse_input(&content)
}

fn parse_input(content: &str) -> CliResult<Value> {
    if content.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(serde_json::from_str(content)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
