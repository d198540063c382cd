//! Per-connection session loop.
//!
//! One loop per connection: receive a text message, pass the rate-limit
//! gate, parse, dispatch against the session state, send the replies.
//! Messages are handled strictly one at a time to completion, so the state
//! needs no locking and frame results leave in arrival order.
//!
//! Pipeline work (decode, mask, composite, encode) is pure CPU and runs on
//! the blocking pool so a heavy frame does not stall other connections'
//! loops; the result is awaited in place, which preserves ordering.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::state::{DEFAULT_S_MIN, DEFAULT_TOLERANCE, DEFAULT_V_MIN};
use crate::session::{codec, RateLimiter, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Toast text emitted exactly once when a background is captured.
const TOAST_CAPTURED: &str = "Background captured";

/// Toast text emitted when the background is cleared.
const TOAST_CLEARED: &str = "Background cleared";

// ============================================================================
// Session
// ============================================================================

/// Message loop and state for one connection.
pub struct Session {
    /// Peer address, doubling as the rate-limiter key.
    peer: SocketAddr,
    /// Per-connection pipeline state.
    state: SessionState,
    /// Shared limiter; windows are partitioned per key.
    limiter: Arc<RateLimiter>,
}

impl Session {
    /// Creates a session for an accepted connection.
    #[must_use]
    pub fn new(peer: SocketAddr, limiter: Arc<RateLimiter>) -> Self {
        Self {
            peer,
            state: SessionState::new(),
            limiter,
        }
    }

    /// Runs the message loop until the connection closes.
    ///
    /// Every per-message failure is reported to the client and the loop
    /// continues; only transport failures end it. All per-connection state
    /// is discarded on exit.
    pub async fn run(mut self, ws_stream: WebSocketStream<TcpStream>) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        'outer: while let Some(message) = ws_read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    for reply in self.handle_text(text.as_str()).await {
                        let json = match reply.to_json() {
                            Ok(json) => json,
                            Err(e) => {
                                error!(error = %e, "failed to serialize reply");
                                continue;
                            }
                        };
                        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                            warn!(peer = %self.peer, error = %e, "send failed");
                            break 'outer;
                        }
                    }
                }

                Ok(Message::Close(_)) => {
                    debug!(peer = %self.peer, "connection closed by client");
                    break;
                }

                // Ignore Binary, Ping, Pong
                Ok(_) => {}

                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "receive failed");
                    break;
                }
            }
        }

        self.limiter.forget(self.peer);
        debug!(peer = %self.peer, "session ended");
    }

    /// Handles one inbound text message and returns the replies to send.
    async fn handle_text(&mut self, text: &str) -> Vec<ServerMessage> {
        // The gate runs before any parsing or pixel work.
        if !self.limiter.allow(self.peer) {
            return vec![ServerMessage::error(&Error::RateLimitExceeded)];
        }

        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "rejected message");
                return vec![ServerMessage::error(&e)];
            }
        };

        match self.dispatch(message).await {
            Ok(replies) => replies,
            Err(e) => {
                if e.is_validation_error() {
                    debug!(peer = %self.peer, error = %e, "rejected input");
                } else {
                    error!(peer = %self.peer, error = %e, "command failed");
                }
                vec![ServerMessage::error(&e)]
            }
        }
    }

    /// Dispatches a parsed command against the session state.
    async fn dispatch(&mut self, message: ClientMessage) -> Result<Vec<ServerMessage>> {
        match message {
            ClientMessage::Frame { data } => self.handle_frame(data).await,

            ClientMessage::ResetBackground => {
                self.state.reset_background();
                Ok(vec![ServerMessage::toast(TOAST_CLEARED), ServerMessage::Ok])
            }

            ClientMessage::SetColor {
                hex,
                tolerance,
                s_min,
                v_min,
            } => {
                self.state.set_color(
                    &hex,
                    tolerance.unwrap_or(DEFAULT_TOLERANCE),
                    s_min.unwrap_or(DEFAULT_S_MIN),
                    v_min.unwrap_or(DEFAULT_V_MIN),
                )?;
                Ok(vec![ServerMessage::Ok])
            }

            ClientMessage::SetParams(update) => {
                self.state.update_params(&update);
                Ok(vec![ServerMessage::Ok])
            }
        }
    }

    /// Runs one frame through decode, pipeline and encode.
    ///
    /// The session state moves into the blocking task and back, so the
    /// whole frame path runs off the async threads while the loop still
    /// awaits the result in place.
    async fn handle_frame(&mut self, data: String) -> Result<Vec<ServerMessage>> {
        let state = std::mem::take(&mut self.state);

        let joined = tokio::task::spawn_blocking(move || {
            let mut state = state;
            let result: Result<(bool, String)> = (|| {
                let live = codec::decode_frame(&data)?;
                let outcome = state.process_frame(live);
                let encoded = codec::encode_frame(&outcome.frame)?;
                Ok((outcome.background_captured, encoded))
            })();
            (state, result)
        })
        .await;

        let (state, result) = match joined {
            Ok(output) => output,
            Err(e) => {
                // The task panicked and took the state with it; restart
                // the session from defaults and report generically.
                error!(peer = %self.peer, error = %e, "pipeline task failed");
                self.state = SessionState::default();
                return Err(Error::Io(std::io::Error::other("pipeline task failed")));
            }
        };
        self.state = state;

        let (captured, encoded) = result?;

        let mut replies = Vec::with_capacity(2);
        if captured {
            replies.push(ServerMessage::toast(TOAST_CAPTURED));
        }
        replies.push(ServerMessage::Frame { data: encoded });
        Ok(replies)
    }
}

// ============================================================================
// Tests
// ============================================================================
