//! JSON I/O handling for CLI
//!
//! - Input: a single JSON object via stdin
//! - Output: a single JSON object via stdout
//! - Logs go to stderr, never stdout

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Parse a JSON request from any reader
pub fn parse_request<T: DeserializeOwned, R: Read>(mut reader: R) -> CliResult<T> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    Ok(serde_json::from_str(&input)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_response_to(&mut io::stdout(), data)
}

/// Write a success response to any writer
pub fn write_response_to<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    write_value(writer, &json!({ "status": "ok", "data": data }))
}

/// Write an error response to any writer
pub fn write_error_to<W: Write>(writer: &mut W, code: u16, message: &str) -> CliResult<()> {
    write_value(
        writer,
        &json!({ "status": "error", "code": code, "message": message }),
    )
}

fn write_value<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
