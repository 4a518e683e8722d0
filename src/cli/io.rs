//! Line-delimited JSON transport for batch requests
//!
//! Each stdin line carries one batch request (or an array of them); each
//! response is one `Response` envelope per stdout line. Logs go to stderr.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Envelope written for every request line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok { data: Value },
    Error { code: String, message: String },
}

impl From<&CliError> for Response {
    fn from(err: &CliError) -> Self {
        Response::Error {
            code: err.code_str().to_string(),
            message: err.message().to_string(),
        }
    }
}

/// Parses one request line; blank lines yield `None`
fn parse_line(line: &str) -> CliResult<Option<Value>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| CliError::request_invalid(format!("Request is not valid JSON: {}", e)))
}

/// Reads the first request line from `input`
pub fn read_request_from<R: BufRead>(mut input: R) -> CliResult<Value> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    parse_line(&line)?.ok_or_else(|| CliError::request_invalid("Empty input"))
}

/// Iterates request lines from `input`, skipping blank lines
pub fn requests_from<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<Value>> {
    input
        .lines()
        .filter_map(|line| line.map_err(CliError::from).and_then(|l| parse_line(&l)).transpose())
}

/// Writes one envelope as a single JSON line and flushes
pub fn write_envelope<W: Write>(out: &mut W, response: &Response) -> CliResult<()> {
    serde_json::to_writer(&mut *out, response)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Reads a single request from stdin
pub fn read_request() -> CliResult<Value> {
    read_request_from(io::stdin().lock())
}

/// Reads requests from stdin until EOF
pub fn read_requests() -> impl Iterator<Item = CliResult<Value>> {
    requests_from(io::stdin().lock())
}

/// Writes a success envelope to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_envelope(&mut io::stdout().lock(), &Response::Ok { data })
}

/// Writes an error envelope to stdout
pub fn write_error(err: &CliError) -> CliResult<()> {
    write_envelope(&mut io::stdout().lock(), &Response::from(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_envelope_shapes() {
        let mut out = Vec::new();
        write_envelope(&mut out, &Response::Ok { data: json!({"batches": []}) }).unwrap();
        let err = CliError::request_invalid("bad line");
        write_envelope(&mut out, &Response::from(&err)).unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0], json!({"status": "ok", "data": {"batches": []}}));
        assert_eq!(
            lines[1],
            json!({"status": "error", "code": "BATCH_CLI_REQUEST_INVALID", "message": "bad line"})
        );
    }

    #[test]
    fn test_requests_skip_blank_lines() {
        let input = Cursor::new("{\"a\": 1}\n\n   \n[1, 2]\n");
        let values: Vec<Value> = requests_from(input).map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![json!({"a": 1}), json!([1, 2])]);
    }

    #[test]
    fn test_bad_line_is_request_error() {
        let input = Cursor::new("{not json\n{\"ok\": true}\n");
        let results: Vec<CliResult<Value>> = requests_from(input).collect();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].as_ref().unwrap_err().code_str(),
            "BATCH_CLI_REQUEST_INVALID"
        );
        assert_eq!(results[1].as_ref().unwrap(), &json!({"ok": true}));
    }

    #[test]
    fn test_empty_single_request_rejected() {
        let err = read_request_from(Cursor::new("\n")).unwrap_err();
        assert_eq!(err.message(), "Empty input");
    }
}
