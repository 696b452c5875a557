//! Append-only access log.
//!
//! Each session owns a [`SessionLog`] that buffers its records. The buffer is
//! handed to the shared [`AccessLog`] sink at natural boundaries and cleared,
//! so nothing accumulates across flushes. The sink serialises appends from
//! concurrent sessions behind a mutex.

use std::path::Path;
use std::time::SystemTime;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One request that produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    /// Request time as an HTTP date
    pub time: String,
    pub status: u16,
}

/// Everything a session buffered between two flushes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBatch {
    pub client: String,
    pub records: Vec<AccessRecord>,
    pub served: Vec<String>,
}

impl LogBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.served.is_empty()
    }

    /// Renders the batch as two bracketed lists followed by a blank line.
    ///
    /// ```text
    /// ['127.0.0.1', 'Mon, 19 Oct 2026 09:00:00 GMT', '200']
    /// ['/index.html']
    /// ```
    pub fn render(&self) -> String {
        let mut activity = vec![quote(&self.client)];
        for record in &self.records {
            activity.push(quote(&record.time));
            activity.push(quote(&record.status.to_string()));
        }
        let served: Vec<String> = self.served.iter().map(|p| quote(p)).collect();

        format!("[{}]\n[{}]\n\n", activity.join(", "), served.join(", "))
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s)
}

/// Per-session accumulator. Created on accept, drained on every flush.
#[derive(Debug)]
pub struct SessionLog {
    client: String,
    records: Vec<AccessRecord>,
    served: Vec<String>,
}

impl SessionLog {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            records: Vec::new(),
            served: Vec::new(),
        }
    }

    /// Records a response status, and the URL path when a file was served.
    pub fn record(&mut self, at: SystemTime, status: u16, served: Option<&str>) {
        self.records.push(AccessRecord {
            time: httpdate::fmt_http_date(at),
            status,
        });
        if let Some(path) = served {
            self.served.push(path.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.served.is_empty()
    }

    /// Moves the buffered entries out, leaving the accumulator empty.
    pub fn take(&mut self) -> LogBatch {
        LogBatch {
            client: self.client.clone(),
            records: std::mem::take(&mut self.records),
            served: std::mem::take(&mut self.served),
        }
    }
}

/// Shared append-only sink, usually `log.txt`.
#[derive(Debug)]
pub struct AccessLog {
    file: Mutex<File>,
}

impl AccessLog {
    /// Opens (creating if needed) the log file in append mode.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one batch. Empty batches are skipped.
    pub async fn append(&self, batch: &LogBatch) -> std::io::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let text = batch.render();
        let mut file = self.file.lock().await;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }

    /// Drains a session's buffer into the sink.
    pub async fn flush(&self, session: &mut SessionLog) -> std::io::Result<()> {
        let batch = session.take();
        self.append(&batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn render_two_lists() {
        let mut log = SessionLog::new("127.0.0.1");
        log.record(UNIX_EPOCH + Duration::from_secs(784111777), 200, Some("/index.html"));
        log.record(UNIX_EPOCH + Duration::from_secs(784111777), 404, None);

        let text = log.take().render();

        assert_eq!(
            text,
            "['127.0.0.1', 'Sun, 06 Nov 1994 08:49:37 GMT', '200', \
             'Sun, 06 Nov 1994 08:49:37 GMT', '404']\n['/index.html']\n\n"
        );
    }

    #[test]
    fn take_clears_buffer() {
        let mut log = SessionLog::new("10.0.0.1");
        log.record(SystemTime::now(), 304, Some("/a.png"));

        assert!(!log.take().is_empty());
        assert!(log.is_empty());
        assert!(log.take().is_empty());
    }
}
