use std::future::Future;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::error::GatewayError;
use super::events::{Frame, GatewayEvent, decode_frame};

/// Default cap on a single gateway frame. Ready payloads for large
/// accounts run to several hundred kilobytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// A live gateway session delivering events in arrival order.
pub trait GatewaySession: Send {
    /// Next event the relay consumes. `Ok(None)` means the session ended.
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<GatewayEvent>, GatewayError>> + Send;

    /// Id of the logged-in user, known once the ready event has arrived.
    fn current_user_id(&self) -> Option<&str>;
}

/// Gateway session over newline-delimited JSON frames.
///
/// The websocket side is handled by whatever bridge feeds this stream.
pub struct LineGateway<R, W> {
    reader: BufReader<R>,
    writer: W,
    max_frame_bytes: usize,
    user_id: Option<String>,
    line_buf: String,
}

impl<R, W> LineGateway<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            max_frame_bytes,
            user_id: None,
            line_buf: String::new(),
        }
    }

    /// Send the identify frame carrying the user token.
    pub async fn identify(&mut self, token: &str) -> Result<(), GatewayError> {
        let mut line = serde_json::to_string(&Frame::identify(token))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        info!("identify sent");
        Ok(())
    }

    /// Read one line, capped at `max_frame_bytes`.
    /// Returns Ok(0) on EOF.
    async fn read_bounded_line(&mut self) -> Result<usize, GatewayError> {
        self.line_buf.clear();
        let mut bytes = Vec::new();
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                // EOF, possibly after an unterminated final line.
                let len = bytes.len();
                self.line_buf.push_str(&String::from_utf8_lossy(&bytes));
                return Ok(len);
            }

            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                // The limit applies to the frame, not its terminator.
                let frame_len = bytes.len() + pos;
                bytes.extend_from_slice(&available[..=pos]);
                self.reader.consume(pos + 1);
                if frame_len > self.max_frame_bytes {
                    return Err(GatewayError::FrameTooLong {
                        limit: self.max_frame_bytes,
                    });
                }
                let len = bytes.len();
                self.line_buf.push_str(&String::from_utf8_lossy(&bytes));
                return Ok(len);
            }

            let len = available.len();
            bytes.extend_from_slice(available);
            self.reader.consume(len);
            if bytes.len() > self.max_frame_bytes {
                self.discard_rest_of_line().await?;
                return Err(GatewayError::FrameTooLong {
                    limit: self.max_frame_bytes,
                });
            }
        }
    }

    /// Skip input up to and including the next newline.
    async fn discard_rest_of_line(&mut self) -> Result<(), GatewayError> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                self.reader.consume(pos + 1);
                return Ok(());
            }
            let len = available.len();
            self.reader.consume(len);
        }
    }
}

impl<R, W> GatewaySession for LineGateway<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_event(&mut self) -> Result<Option<GatewayEvent>, GatewayError> {
        loop {
            let read = match self.read_bounded_line().await {
                Ok(n) => n,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "dropping gateway frame");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if read == 0 {
                return Ok(None);
            }

            let line = self.line_buf.trim();
            if line.is_empty() {
                continue;
            }

            match decode_frame(line) {
                Ok(Some(event)) => {
                    if let GatewayEvent::Ready(snapshot) = &event {
                        self.user_id = Some(snapshot.user_id.clone());
                    }
                    return Ok(Some(event));
                }
                Ok(None) => debug!("ignoring gateway frame"),
                Err(e) => warn!(error = %e, "dropping gateway frame"),
            }
        }
    }

    fn current_user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}
