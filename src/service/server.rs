//! # Acquiring Server
//!
//! TCP accept loop for the acquirer. Each connection carries exactly one
//! authorization request: read the 4-byte header, read the declared
//! remainder, hand the packet to the [`PacketProcessor`], write back the
//! 15-byte response (if any), close.
//!
//! Concurrency is bounded by a semaphore-backed worker pool; connections
//! beyond the limit wait in the accept queue until a permit frees up.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use crate::core::packet::HEADER_LEN;
use crate::error::Result;
use crate::protocol::processor::PacketProcessor;
use crate::utils::hexdump;

pub struct AcquiringServer {
    listener: TcpListener,
    processor: Arc<PacketProcessor>,
    workers: Arc<Semaphore>,
}

impl AcquiringServer {
    /// Bind the listener and size the worker pool.
    pub async fn bind(
        address: &str,
        processor: PacketProcessor,
        max_workers: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        info!(address = %listener.local_addr()?, workers = max_workers, "acquiring server listening");
        Ok(Self {
            listener,
            processor: Arc::new(processor),
            workers: Arc::new(Semaphore::new(max_workers)),
        })
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until CTRL+C.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received CTRL+C, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.run_with_shutdown(shutdown_rx).await
    }

    /// Serve until the shutdown channel fires. In-flight handlers finish on
    /// their own tasks; new connections stop being accepted immediately.
    pub async fn run_with_shutdown(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("server shutting down");
                    return Ok(());
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            debug!(peer = %peer, "connection accepted");
                            let processor = self.processor.clone();
                            let workers = self.workers.clone();

                            tokio::spawn(async move {
                                let _permit = match workers.acquire_owned().await {
                                    Ok(permit) => permit,
                                    Err(_) => return,
                                };
                                if let Err(e) = handle_client(stream, &processor).await {
                                    warn!(peer = %peer, error = %e, "connection handler failed");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }
    }
}

/// Read one packet, process it, write the response if the processor
/// produced one. Short reads abort silently; the peer sees a closed
/// connection either way.
async fn handle_client(mut stream: TcpStream, processor: &PacketProcessor) -> Result<()> {
    let mut header = [0u8; HEADER_LEN];
    if stream.read_exact(&mut header).await.is_err() {
        debug!("connection closed before a full header arrived");
        return Ok(());
    }

    let declared = u16::from_be_bytes([header[2], header[3]]) as usize;
    let Some(body_len) = declared.checked_sub(HEADER_LEN) else {
        // Declared length smaller than its own header. Nothing sane to
        // read; drop the connection.
        warn!(declared, "declared length below header size, dropping");
        return Ok(());
    };

    let mut packet = vec![0u8; HEADER_LEN + body_len];
    packet[..HEADER_LEN].copy_from_slice(&header);
    if stream.read_exact(&mut packet[HEADER_LEN..]).await.is_err() {
        debug!(declared, "connection closed mid-body");
        return Ok(());
    }

    debug!(bytes = packet.len(), "packet received\n{}", hexdump::format(&packet));

    if let Some(response) = processor.process(&packet).await {
        stream.write_all(&response).await?;
        stream.flush().await?;
        debug!("response written");
    } else {
        debug!("no response, closing connection");
    }

    Ok(())
}
