//! Connection handler
//!
//! Handles one client connection: line framing over the socket, command
//! parsing, synchronous round-trips to the registry, and forwarding of
//! relayed messages. One task per connection; the task is the connection's
//! only writer, so events are processed strictly one at a time.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::message::{ClientCommand, Delivery, ServerReply};
use crate::registry::{RegisterOutcome, RegistryHandle};
use crate::types::{ConnId, Nickname};

/// Handle a newly accepted connection
///
/// Mints the connection identity, wires up the delivery channel, and runs
/// the event loop until the socket closes. On the way out the registration
/// is withdrawn; a connection that never registered has no entry, which is
/// not an error.
///
/// Generic over the stream so tests can drive it over an in-memory duplex
/// pipe instead of a TCP socket.
pub async fn handle_connection<S>(
    stream: S,
    peer_addr: SocketAddr,
    registry: RegistryHandle,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite,
{
    let conn_id = ConnId::new();
    info!("Client {} connected from {}", conn_id, peer_addr);

    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    // Registry -> this connection. Unbounded so the registry's fan-out
    // never waits on this socket.
    let (delivery_tx, mut delivery_rx) = mpsc::unbounded_channel::<Delivery>();

    let result = serve(
        conn_id,
        &registry,
        &delivery_tx,
        &mut delivery_rx,
        &mut lines,
        &mut write_half,
    )
    .await;

    match registry.remove(conn_id).await {
        Ok(()) => {}
        Err(AppError::UserNotFound) => debug!("Client {} closed unregistered", conn_id),
        Err(e) => warn!("Cleanup for client {} failed: {}", conn_id, e),
    }

    info!("Client {} disconnected", conn_id);
    result
}

/// Event loop: wait on whichever source is ready next
///
/// Three event sources: an inbound line, a delivery from a peer, or the
/// socket closing (EOF, read error, or a failed write). Exactly one event
/// is processed per iteration and there are no timeouts.
async fn serve<R, W>(
    conn_id: ConnId,
    registry: &RegistryHandle,
    delivery_tx: &mpsc::UnboundedSender<Delivery>,
    delivery_rx: &mut mpsc::UnboundedReceiver<Delivery>,
    lines: &mut Lines<BufReader<R>>,
    writer: &mut W,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(reply) = handle_line(conn_id, &line, registry, delivery_tx).await? {
                            writer.write_all(reply.as_bytes()).await?;
                        }
                    }
                    Ok(None) => {
                        debug!("Client {} reached EOF", conn_id);
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("Read error from client {}: {}", conn_id, e);
                        return Err(e.into());
                    }
                }
            }
            Some(delivery) = delivery_rx.recv() => {
                writer.write_all(delivery.to_line().as_bytes()).await?;
            }
        }
    }
}

/// Interpret one inbound line
///
/// Returns the reply line to write, or `None` for commands that succeed
/// silently. Protocol errors become reply lines and the loop continues;
/// only a broken registry channel propagates as fatal.
async fn handle_line(
    conn_id: ConnId,
    line: &str,
    registry: &RegistryHandle,
    delivery_tx: &mpsc::UnboundedSender<Delivery>,
) -> Result<Option<String>, AppError> {
    let cmd = match ClientCommand::parse(line) {
        Ok(cmd) => cmd,
        Err(err) => {
            debug!("Client {} sent invalid input", conn_id);
            return Ok(Some(ServerReply::from(err).to_line()));
        }
    };

    match cmd {
        ClientCommand::List => {
            let users = registry.list().await?;
            Ok(Some(ServerReply::Users(users).to_line()))
        }
        ClientCommand::Nick { nickname } => {
            // Validate the format here; the registry only arbitrates
            // uniqueness
            let nickname: Nickname = match nickname.parse() {
                Ok(nickname) => nickname,
                Err(e) => return Ok(Some(ServerReply::from(AppError::from(e)).to_line())),
            };
            match registry
                .register(conn_id, nickname, delivery_tx.clone())
                .await
            {
                Ok(RegisterOutcome::Registered(nick)) => {
                    Ok(Some(ServerReply::Registered(nick).to_line()))
                }
                Ok(RegisterOutcome::Renamed { old, new }) => {
                    Ok(Some(ServerReply::Renamed { old, new }.to_line()))
                }
                Err(err @ AppError::NicknameTaken(_)) => {
                    Ok(Some(ServerReply::from(err).to_line()))
                }
                Err(err) => Err(err),
            }
        }
        ClientCommand::Msg { recipients, text } => {
            match registry.send_message(conn_id, recipients, text).await {
                Ok(outcome) => {
                    debug!("Client {} message routed: {:?}", conn_id, outcome);
                    Ok(None)
                }
                Err(err @ AppError::SenderNotRegistered) => {
                    Ok(Some(ServerReply::from(err).to_line()))
                }
                Err(err) => Err(err),
            }
        }
    }
}
