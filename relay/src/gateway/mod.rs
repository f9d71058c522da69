//! Gateway session: frame decoding and the line-framed transport.

pub mod error;
pub mod events;
pub mod reader;
pub mod session;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::info;

pub use error::GatewayError;
pub use events::{GatewayEvent, decode_frame};
pub use reader::{ChannelReader, spawn_reader};
pub use session::{DEFAULT_MAX_FRAME_BYTES, GatewaySession, LineGateway};

/// Gateway session backed by a TCP bridge.
pub type TcpGateway = LineGateway<OwnedReadHalf, OwnedWriteHalf>;

/// Gateway session reading frames from stdin.
pub type StdioGateway = LineGateway<ChannelReader, tokio::io::Sink>;

/// Connect to a gateway bridge and identify.
pub async fn connect_tcp(
    addr: &str,
    token: &str,
    max_frame_bytes: usize,
) -> Result<TcpGateway, GatewayError> {
    let stream = TcpStream::connect(addr).await?;
    info!(%addr, "connected to gateway");
    let (reader, writer) = stream.into_split();
    let mut gateway = LineGateway::new(reader, writer, max_frame_bytes);
    gateway.identify(token).await?;
    Ok(gateway)
}

/// Read frames from stdin. Nothing is written back.
///
/// Stdin is read on its own thread, so a pending read does not keep the
/// process alive after the relay stops.
pub fn stdio(max_frame_bytes: usize) -> Result<StdioGateway, GatewayError> {
    let reader = spawn_reader(std::io::stdin(), "stdin-reader")?;
    Ok(LineGateway::new(reader, tokio::io::sink(), max_frame_bytes))
}
