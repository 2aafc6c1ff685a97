//! Virtual modem task
//!
//! Owns a [`VirtualModem`] and serves it over an async stream until the
//! other end closes.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::modem::{Reply, VirtualModem};

/// Serve `modem` over `stream`
pub async fn run_virtual_modem<S>(mut stream: S, mut modem: VirtualModem) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 1024];
    info!("Starting virtual modem {}", modem.name());

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("Virtual modem stream closed for {}", modem.name());
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => break,
            Err(e) => return Err(e),
        };

        debug!(
            "Virtual modem {} received {} bytes: {:?}",
            modem.name(),
            n,
            String::from_utf8_lossy(&buf[..n])
        );

        for reply in modem.receive(&buf[..n]) {
            if let Err(e) = send(&mut stream, reply).await {
                debug!("Virtual modem {} write failed: {}", modem.name(), e);
                return Ok(());
            }
        }
    }

    info!("Virtual modem task ended for {}", modem.name());
    Ok(())
}

async fn send<S>(stream: &mut S, reply: Reply) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    match reply {
        Reply::Silent => Ok(()),
        Reply::Text(text) => write(stream, text.as_bytes()).await,
        Reply::Delayed(delay, text) => {
            tokio::time::sleep(delay).await;
            write(stream, text.as_bytes()).await
        }
        Reply::Drip {
            text,
            chunk,
            interval,
        } => {
            for part in text.as_bytes().chunks(chunk.max(1)) {
                write(stream, part).await?;
                tokio::time::sleep(interval).await;
            }
            Ok(())
        }
    }
}

async fn write<S>(stream: &mut S, data: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(data).await?;
    stream.flush().await
}
