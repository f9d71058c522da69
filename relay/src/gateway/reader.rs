//! Blocking byte sources (stdin) bridged onto the async event loop.
//!
//! Reads happen on a dedicated OS thread rather than tokio's blocking pool,
//! so a read that never returns cannot hold the runtime open at shutdown.

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tracing::debug;

const CHUNK_SIZE: usize = 8 * 1024;
const CHANNEL_DEPTH: usize = 16;

/// Async reader fed by chunks from a reader thread.
#[derive(Debug)]
pub struct ChannelReader {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    pub fn new(rx: mpsc::Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl AsyncRead for ChannelReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while this.pos >= this.chunk.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.chunk = chunk;
                    this.pos = 0;
                }
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Sender gone: EOF.
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = buf.remaining().min(this.chunk.len() - this.pos);
        buf.put_slice(&this.chunk[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Move `source` onto its own thread and read it through a `ChannelReader`.
///
/// The thread exits at EOF, on a read error, or once the reader is dropped
/// and the next chunk arrives. It is never joined.
pub fn spawn_reader<S>(mut source: S, name: &str) -> io::Result<ChannelReader>
where
    S: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let sent = match source.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => tx.blocking_send(Ok(buf[..n].to_vec())),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.blocking_send(Err(e));
                        break;
                    }
                };
                if sent.is_err() {
                    break;
                }
            }
            debug!("reader thread finished");
        })?;
    Ok(ChannelReader::new(rx))
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_reads_across_chunks() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(b"hel".to_vec())).await.unwrap();
        tx.send(Ok(Vec::new())).await.unwrap();
        tx.send(Ok(b"lo\n".to_vec())).await.unwrap();
        drop(tx);

        let mut out = String::new();
        ChannelReader::new(rx).read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn test_read_error_surfaces() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(Err(io::Error::other("broken pipe"))).await.unwrap();

        let mut out = Vec::new();
        let err = ChannelReader::new(rx).read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.to_string(), "broken pipe");
    }

    #[tokio::test]
    async fn test_thread_reader_hits_eof() {
        let source = io::Cursor::new(b"line one\nline two\n".to_vec());
        let mut reader = spawn_reader(source, "test-reader").unwrap();

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "line one\nline two\n");
    }
}
