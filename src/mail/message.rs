//! Message body construction for the DATA stage.
//!
//! Line endings are normalized to CRLF, any body line beginning with `.` is
//! escaped by doubling it (dot-stuffing), and the body is closed by a line
//! containing only `.` — the relay would otherwise cut the DATA section
//! short at the first bare dot.

/// Normalize `\n` and `\r\n` line endings to the wire's CRLF.
pub fn normalize_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Double the leading dot on every line of CRLF-normalized text.
pub fn dot_stuff(text: &str) -> String {
    text.split("\r\n")
        .map(|line| {
            if line.starts_with('.') {
                format!(".{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Assemble the full DATA payload: headers, blank separator, escaped body,
/// and the terminating `.` line.
pub fn build(
    subject: &str,
    from_name: &str,
    from_email: &str,
    recipient: &str,
    message: &str,
) -> String {
    // header values must stay on one line
    let from_name = from_name.replace(['\r', '\n'], " ");
    let body = dot_stuff(&normalize_crlf(message));

    format!(
        "Subject: {subject}\r\n\
         From: \"{from_name}\" <{from_email}>\r\n\
         Reply-To: {from_email}\r\n\
         To: {recipient}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Transfer-Encoding: 8bit\r\n\
         \r\n\
         {body}\r\n\
         .\r\n"
    )
}

// ─── Tests ────────────────────────────────────────────────────────────────────
