//! Response encoders.
//!
//! Pure functions producing the wire form of the three POP3 reply
//! shapes: `+OK` status lines, `-ERR` status lines, and multi-line
//! blocks with leading-dot byte-stuffing and a lone-dot terminator.
//! Sessions write the returned strings onto the connection verbatim.

/// Encodes a positive status line: `+OK {text}\r\n`.
///
/// An empty `text` yields a bare `+OK\r\n`.
#[must_use]
pub fn ok(text: &str) -> String {
    if text.is_empty() {
        "+OK\r\n".to_string()
    } else {
        format!("+OK {text}\r\n")
    }
}

/// Encodes a negative status line: `-ERR {text}\r\n`.
#[must_use]
pub fn err(text: &str) -> String {
    if text.is_empty() {
        "-ERR\r\n".to_string()
    } else {
        format!("-ERR {text}\r\n")
    }
}

/// Encodes a multi-line block.
///
/// For each content line: trailing carriage returns are stripped, a
/// leading `.` is doubled (byte-stuffing, RFC 1939 section 3), and a
/// CRLF terminator appended. The block ends with a lone `.\r\n`.
#[must_use]
pub fn multi_line<I, T>(lines: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut out = String::new();
    for line in lines {
        let line = line.as_ref().trim_end_matches('\r');
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str(".\r\n");
    out
}
