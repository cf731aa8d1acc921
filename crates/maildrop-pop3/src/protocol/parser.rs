//! Command-line parser.

/// A parsed client command line.
///
/// Commands are terminated by CRLF on the wire, but bare LF is
/// tolerated on input; the terminator and any trailing spaces are
/// trimmed before splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    verb: String,
    args: Vec<String>,
}

impl Request {
    /// Parses one command line into a verb and its arguments.
    ///
    /// The verb is uppercased (commands are case-insensitive per
    /// RFC 1939); argument case is preserved. Splitting is on single
    /// spaces, so consecutive spaces yield empty arguments, which
    /// later fail argument-count checks rather than being silently
    /// collapsed.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim_matches([' ', '\r', '\n']);
        let mut parts = input.split(' ');
        let verb = parts.next().unwrap_or_default().to_ascii_uppercase();
        let args = parts.map(str::to_string).collect();
        Self { verb, args }
    }

    /// Returns the uppercased verb. Empty for an empty line.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Returns the arguments, case preserved.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verb_only() {
        let request = Request::parse("COMMAND1");
        assert_eq!(request.verb(), "COMMAND1");
        assert!(request.args().is_empty());
    }

    #[test]
    fn trailing_spaces_trimmed() {
        let request = Request::parse("COMMAND1   ");
        assert_eq!(request.verb(), "COMMAND1");
        assert!(request.args().is_empty());
    }

    #[test]
    fn trailing_terminators_trimmed() {
        let request = Request::parse("COMMAND1 \r \n ");
        assert_eq!(request.verb(), "COMMAND1");
        assert!(request.args().is_empty());
    }

    #[test]
    fn verb_uppercased_args_untouched() {
        let request = Request::parse("comm ARG");
        assert_eq!(request.verb(), "COMM");
        assert_eq!(request.args(), ["ARG"]);

        let request = Request::parse("COMM arg");
        assert_eq!(request.verb(), "COMM");
        assert_eq!(request.args(), ["arg"]);
    }

    #[test]
    fn multiple_args() {
        let request = Request::parse("COMM ARG1 ARG2");
        assert_eq!(request.verb(), "COMM");
        assert_eq!(request.args(), ["ARG1", "ARG2"]);
    }

    #[test]
    fn crlf_terminated_line() {
        let request = Request::parse("RETR 1\r\n");
        assert_eq!(request.verb(), "RETR");
        assert_eq!(request.args(), ["1"]);
    }

    #[test]
    fn empty_line_yields_empty_verb() {
        let request = Request::parse("\r\n");
        assert_eq!(request.verb(), "");
        assert!(request.args().is_empty());
    }

    #[test]
    fn consecutive_spaces_yield_empty_args() {
        let request = Request::parse("USER  bob");
        assert_eq!(request.verb(), "USER");
        assert_eq!(request.args(), ["", "bob"]);
    }
}
