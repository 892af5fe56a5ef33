//! SMTP reply parsing.
//!
//! A reply line has the shape `<3-digit code><separator><text>`. Separator
//! `-` means more lines of the same logical reply follow; a space marks the
//! final line. Replies arrive fragmented across arbitrary reads, so the
//! parser buffers until it has seen a complete final line — only then is the
//! reply evaluated, and only the final line's code decides the outcome.

/// One complete (possibly multiline) relay reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Code of the final line.
    pub code: u16,
    /// Every line of the reply, separators included.
    pub lines: Vec<String>,
}

impl Reply {
    /// Success is any final code below 400.
    pub fn is_positive(&self) -> bool {
        self.code < 400
    }

    /// 2xx — the requested action completed.
    pub fn is_completed(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx — the relay wants more input (continuation prompt).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// The final line, for error reporting.
    pub fn last_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("malformed reply line: {0:?}")]
    MalformedLine(String),
}

/// Incremental reply parser. Feed it raw bytes as they arrive; it yields a
/// [`Reply`] once a space-separated final line has been observed.
#[derive(Debug, Default)]
pub struct ReplyParser {
    buf: String,
    pending: Vec<String>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed freshly-arrived bytes (possibly empty, to drain leftovers from a
    /// previous read). Returns the completed reply, if any.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Reply>, ReplyError> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        while let Some(pos) = self.buf.find("\r\n") {
            let line = self.buf[..pos].to_string();
            self.buf.drain(..pos + 2);

            let (code, last) = parse_line(&line)?;
            self.pending.push(line);
            if last {
                let lines = std::mem::take(&mut self.pending);
                return Ok(Some(Reply { code, lines }));
            }
        }
        Ok(None)
    }
}

/// Split a reply line into its code and finality. Lines that do not start
/// with three digits followed by a space or `-` are protocol violations.
fn parse_line(line: &str) -> Result<(u16, bool), ReplyError> {
    let bytes = line.as_bytes();
    if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(ReplyError::MalformedLine(line.to_string()));
    }
    let last = match bytes[3] {
        b' ' => true,
        b'-' => false,
        _ => return Err(ReplyError::MalformedLine(line.to_string())),
    };
    let code = line[..3]
        .parse()
        .map_err(|_| ReplyError::MalformedLine(line.to_string()))?;
    Ok((code, last))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_reply_completes() {
        let mut parser = ReplyParser::new();
        let reply = parser.push(b"220 mail.test ESMTP ready\r\n").unwrap().unwrap();
        assert_eq!(reply.code, 220);
        assert!(reply.is_completed());
    }

    #[test]
    fn fragmented_arrival_is_buffered() {
        let mut parser = ReplyParser::new();
        assert_eq!(parser.push(b"25").unwrap(), None);
        assert_eq!(parser.push(b"0 ok").unwrap(), None);
        let reply = parser.push(b"\r\n").unwrap().unwrap();
        assert_eq!(reply.code, 250);
    }

    #[test]
    fn multiline_reply_waits_for_the_space_separator() {
        let mut parser = ReplyParser::new();
        assert_eq!(parser.push(b"250-mail.test\r\n").unwrap(), None);
        assert_eq!(parser.push(b"250-SIZE 35882577\r\n").unwrap(), None);
        let reply = parser.push(b"250 AUTH LOGIN PLAIN\r\n").unwrap().unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines.len(), 3);
        assert!(reply.is_positive());
    }

    #[test]
    fn only_the_final_line_code_decides() {
        let mut parser = ReplyParser::new();
        parser.push(b"250-looking good\r\n").unwrap();
        let reply = parser.push(b"554 transaction failed\r\n").unwrap().unwrap();
        assert_eq!(reply.code, 554);
        assert!(!reply.is_positive());
        assert_eq!(reply.last_line(), "554 transaction failed");
    }

    #[test]
    fn two_replies_in_one_chunk_are_consumed_in_order() {
        let mut parser = ReplyParser::new();
        let first = parser
            .push(b"220 ready\r\n250 ok\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(first.code, 220);
        let second = parser.push(b"").unwrap().unwrap();
        assert_eq!(second.code, 250);
    }

    #[test]
    fn malformed_line_is_a_protocol_error() {
        let mut parser = ReplyParser::new();
        let err = parser.push(b"garbage\r\n").unwrap_err();
        assert!(matches!(err, ReplyError::MalformedLine(_)));

        // a bare code with no separator is malformed too
        let mut parser = ReplyParser::new();
        assert!(parser.push(b"250\r\n").is_err());
    }
}
