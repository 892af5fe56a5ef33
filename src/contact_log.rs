use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

/// Append-only audit trail of contact submission attempts.
///
/// Writes one block per attempt to `{data_dir}/contact-log.txt`, whether or
/// not delivery succeeded:
///
/// ```text
/// [#ok 2026-08-06T12:00:00+00:00] Ada Lovelace <ada@example.com>
/// Hello! I saw your site...
///
/// ```
///
/// The file handle is cached for the process lifetime to avoid the overhead
/// of an `open()` syscall on every submission.
pub struct ContactLog {
    path: PathBuf,
    /// Cached, open file handle; `None` until the first write.
    file: Mutex<Option<tokio::fs::File>>,
}

impl ContactLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    /// Append one block recording a submission and its outcome.
    ///
    /// Opens the file lazily on first call. Errors are logged at WARN level
    /// and never propagated — a broken audit trail must not affect the API
    /// response already being constructed.
    pub async fn append(&self, name: &str, email: &str, message: &str, delivered: bool) {
        if let Err(e) = self.try_append(name, email, message, delivered).await {
            tracing::warn!(err = %e, "contact log write failed");
        }
    }

    async fn try_append(
        &self,
        name: &str,
        email: &str,
        message: &str,
        delivered: bool,
    ) -> Result<()> {
        let marker = if delivered { "ok" } else { "fail" };
        let block = format!(
            "[#{marker} {}] {name} <{email}>\n{message}\n\n",
            Utc::now().to_rfc3339()
        );

        let mut guard = self.file.lock().await;

        // Open lazily on the first write.
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            *guard = Some(f);
        }

        guard.as_mut().unwrap().write_all(block.as_bytes()).await?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_one_block_per_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let log = ContactLog::new(dir.path().join("contact-log.txt"));

        log.append("Ada", "ada@example.com", "first message", true)
            .await;
        log.append("Bob", "bob@example.com", "second message", false)
            .await;

        let content = tokio::fs::read_to_string(dir.path().join("contact-log.txt"))
            .await
            .unwrap();
        assert!(content.contains("] Ada <ada@example.com>\nfirst message\n\n"));
        assert!(content.contains("] Bob <bob@example.com>\nsecond message\n\n"));
    }

    #[tokio::test]
    async fn marks_outcome_in_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = ContactLog::new(dir.path().join("contact-log.txt"));

        log.append("Ada", "ada@example.com", "hi", true).await;
        log.append("Bob", "bob@example.com", "hi", false).await;

        let content = tokio::fs::read_to_string(dir.path().join("contact-log.txt"))
            .await
            .unwrap();
        assert!(content.contains("[#ok "));
        assert!(content.contains("[#fail "));
    }
}
