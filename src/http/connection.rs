use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

use crate::access_log::{AccessLog, SessionLog};
use crate::http::handler::Handler;
use crate::http::parser::{find_headers_end, parse_request, ParseError};
use crate::http::writer::ResponseWriter;

/// Largest request head accepted before answering 400.
pub const MAX_HEAD_BYTES: usize = 8 * 1024;

const READ_CHUNK: usize = 1024;

pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    handler: Arc<Handler>,
    access_log: Arc<AccessLog>,
    log: SessionLog,
    idle_timeout: Duration,
    state: ConnectionState,
}

pub enum ConnectionState {
    /// Waiting for request bytes until the deadline
    Reading { deadline: Instant },
    /// A complete (or final, partial) request head is buffered
    Dispatching(Inbound),
    Responding { writer: ResponseWriter, close: bool },
    KeepAlive,
    Closing,
}

/// What the read step produced.
pub enum Inbound {
    Head(Vec<u8>),
    /// Head grew past [`MAX_HEAD_BYTES`] without a blank line
    Oversized,
}

enum ReadOutcome {
    Request(Inbound),
    /// Deadline passed or peer closed, with nothing buffered
    Idle,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        client: impl Into<String>,
        handler: Arc<Handler>,
        access_log: Arc<AccessLog>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            handler,
            access_log,
            log: SessionLog::new(client),
            idle_timeout,
            state: ConnectionState::Reading {
                deadline: Instant::now() + idle_timeout,
            },
        }
    }

    /// Drives the session to completion.
    ///
    /// The access log is flushed exactly once on the way out, even when an
    /// I/O error ends the session early; that error is then returned.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.access_log.flush(&mut self.log).await {
            tracing::warn!(error = %e, "Failed to flush access log");
        }
        // Peer may already be gone.
        let _ = self.stream.shutdown().await;

        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading { deadline } => {
                    let deadline = *deadline;
                    match self.read_request(deadline).await? {
                        ReadOutcome::Request(inbound) => {
                            self.state = ConnectionState::Dispatching(inbound);
                        }
                        ReadOutcome::Idle => {
                            tracing::debug!("Session idle, closing");
                            self.state = ConnectionState::Closing;
                        }
                    }
                }

                ConnectionState::Dispatching(inbound) => {
                    let parsed = match inbound {
                        Inbound::Head(head) => parse_request(head),
                        Inbound::Oversized => Err(ParseError::Malformed),
                    };

                    let now = SystemTime::now();
                    let handled = self.handler.handle(parsed, now).await;
                    let status = handled.response.status;

                    tracing::info!(
                        status = status.as_u16(),
                        path = handled.served.as_deref().unwrap_or("-"),
                        "Response ready"
                    );
                    self.log
                        .record(now, status.as_u16(), handled.served.as_deref());

                    let close = handled.close || status.closes_connection();
                    let writer = ResponseWriter::new(&handled.response);
                    self.state = ConnectionState::Responding { writer, close };
                }

                ConnectionState::Responding { writer, close } => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if *close {
                        self.state = ConnectionState::Closing;
                    } else {
                        self.state = ConnectionState::KeepAlive;
                    }
                }

                ConnectionState::KeepAlive => {
                    if let Err(e) = self.access_log.flush(&mut self.log).await {
                        tracing::warn!(error = %e, "Failed to flush access log");
                    }
                    self.state = ConnectionState::Reading {
                        deadline: Instant::now() + self.idle_timeout,
                    };
                }

                ConnectionState::Closing => {
                    return Ok(());
                }
            }
        }
    }

    async fn read_request(&mut self, deadline: Instant) -> anyhow::Result<ReadOutcome> {
        loop {
            if let Some(end) = find_headers_end(&self.buffer) {
                let head = self.buffer.split_to(end + 4);
                return Ok(ReadOutcome::Request(Inbound::Head(head.to_vec())));
            }

            if self.buffer.len() > MAX_HEAD_BYTES {
                self.buffer.clear();
                return Ok(ReadOutcome::Request(Inbound::Oversized));
            }

            let mut temp = [0u8; READ_CHUNK];
            let n = match timeout_at(deadline, self.stream.read(&mut temp)).await {
                Ok(read) => read?,
                Err(_) => 0,
            };

            // Deadline passed or peer finished sending without a blank line.
            // Whatever arrived still gets an answer.
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(ReadOutcome::Idle);
                }
                let head = self.buffer.split();
                return Ok(ReadOutcome::Request(Inbound::Head(head.to_vec())));
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }
}
