use common::{BinanceEnvironment, ExponentialBackoff};
use connector_core::{ConnectorError, TickSender};
use futures_util::{SinkExt, StreamExt};
use metrics::SharedMetrics;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::parser::{parse_message, ParsedMessage};

/// Duration of stable connection before resetting backoff.
const STABLE_CONNECTION_THRESHOLD: Duration = Duration::from_secs(300);

/// Timeout for WebSocket connection attempts.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ConnectResult {
    Connected(WsStream),
    Shutdown,
    Error(ConnectorError),
}

async fn connect_with_timeout(url: &str, shutdown_rx: &mut watch::Receiver<bool>) -> ConnectResult {
    let connect = tokio::time::timeout(CONNECTION_TIMEOUT, connect_async(url));
    tokio::pin!(connect);

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                // Sender gone counts as shutdown
                if changed.is_err() || *shutdown_rx.borrow() {
                    return ConnectResult::Shutdown;
                }
            }

            result = &mut connect => {
                return match result {
                    Ok(Ok((stream, _))) => ConnectResult::Connected(stream),
                    Ok(Err(e)) => ConnectResult::Error(ConnectorError::WebSocket(e.to_string())),
                    Err(_) => ConnectResult::Error(ConnectorError::WebSocket(
                        "connection timeout".to_string(),
                    )),
                };
            }
        }
    }
}

enum SessionResult {
    Shutdown,
    Connected {
        duration: Duration,
        error: ConnectorError,
    },
    ConnectFailed(ConnectorError),
}

async fn run_session(
    symbol: &str,
    url: &str,
    sender: &TickSender,
    shutdown_rx: &mut watch::Receiver<bool>,
    metrics: &SharedMetrics,
) -> SessionResult {
    info!(symbol = %symbol, url = %url, "Connecting to trade stream");

    let ws_stream = match connect_with_timeout(url, shutdown_rx).await {
        ConnectResult::Connected(stream) => stream,
        ConnectResult::Shutdown => return SessionResult::Shutdown,
        ConnectResult::Error(e) => return SessionResult::ConnectFailed(e),
    };

    info!(symbol = %symbol, "Trade stream connected");
    let connected_at = Instant::now();
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!(symbol = %symbol, "Closing trade stream");
                    let _ = write.close().await;
                    return SessionResult::Shutdown;
                }
            }

            msg_opt = read.next() => {
                let msg = match msg_opt {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        error!(symbol = %symbol, error = %e, "WebSocket error");
                        metrics.inc_websocket_errors();
                        return SessionResult::Connected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::WebSocket(e.to_string()),
                        };
                    }
                    None => {
                        info!(symbol = %symbol, "Trade stream ended");
                        return SessionResult::Connected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::ConnectionClosed,
                        };
                    }
                };

                match msg {
                    Message::Text(text) => match parse_message(&text) {
                        Ok(ParsedMessage::Tick(tick)) => {
                            metrics.inc_ticks_received();
                            if sender.send(tick).await.is_err() {
                                info!(symbol = %symbol, "Tick receiver dropped, stopping stream");
                                return SessionResult::Connected {
                                    duration: connected_at.elapsed(),
                                    error: ConnectorError::ChannelClosed,
                                };
                            }
                        }
                        Ok(ParsedMessage::Unknown) => {}
                        Err(e) => {
                            metrics.inc_parse_errors();
                            warn!(symbol = %symbol, error = %e, "Failed to parse trade message");
                        }
                    },
                    Message::Ping(data) => {
                        debug!(symbol = %symbol, "Received Ping, sending Pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            warn!(symbol = %symbol, error = %e, "Failed to send Pong");
                            metrics.inc_websocket_errors();
                            return SessionResult::Connected {
                                duration: connected_at.elapsed(),
                                error: ConnectorError::WebSocket(e.to_string()),
                            };
                        }
                    }
                    Message::Close(_) => {
                        info!(symbol = %symbol, "Trade stream closed by server");
                        return SessionResult::Connected {
                            duration: connected_at.elapsed(),
                            error: ConnectorError::ConnectionClosed,
                        };
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Wait out a backoff delay. Returns `true` if shutdown arrived first.
async fn wait_or_shutdown(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
    }
}

/// Stream aggregate trades for one symbol into `sender`, reconnecting with
/// exponential backoff.
///
/// Returns `Ok(())` once `shutdown_rx` flips to `true` (or its sender is
/// dropped), and `Err(ChannelClosed)` if the tick receiver goes away.
pub async fn run_trade_stream(
    symbol: String,
    environment: BinanceEnvironment,
    sender: TickSender,
    mut shutdown_rx: watch::Receiver<bool>,
    metrics: SharedMetrics,
) -> Result<(), ConnectorError> {
    let url = environment.agg_trade_stream_url(&symbol);
    let mut backoff = ExponentialBackoff::default();

    loop {
        if *shutdown_rx.borrow() {
            info!(symbol = %symbol, "Trade stream stopped");
            return Ok(());
        }

        let (error, stable) =
            match run_session(&symbol, &url, &sender, &mut shutdown_rx, &metrics).await {
                SessionResult::Shutdown => {
                    info!(symbol = %symbol, "Trade stream stopped");
                    return Ok(());
                }
                SessionResult::Connected { duration, error } => {
                    if matches!(error, ConnectorError::ChannelClosed) {
                        return Err(ConnectorError::ChannelClosed);
                    }
                    (error, duration >= STABLE_CONNECTION_THRESHOLD)
                }
                SessionResult::ConnectFailed(error) => {
                    metrics.inc_websocket_errors();
                    (error, false)
                }
            };

        if stable {
            debug!(symbol = %symbol, "Connection was stable, resetting backoff");
            backoff.reset();
        }

        metrics.inc_reconnect_attempts();
        let delay = backoff.next_delay();
        warn!(
            symbol = %symbol,
            error = %error,
            attempt = backoff.attempt(),
            delay_secs = delay.as_secs_f64(),
            "Trade stream lost, reconnecting"
        );

        if wait_or_shutdown(delay, &mut shutdown_rx).await {
            info!(symbol = %symbol, "Shutdown requested during backoff");
            return Ok(());
        }
    }
}
