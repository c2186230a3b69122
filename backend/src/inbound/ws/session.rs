//! Per-connection live channel.
//!
//! Pushes session snapshots from a connection-scoped [`SessionManager`] and
//! catalogue change notifications from the [`ChangeFeed`] port. The server
//! pings every 5s and drops connections idle for 10s. Tests shorten both.
//!
//! [`ChangeFeed`]: crate::domain::ports::ChangeFeed

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::{broadcast, watch};
use tokio::time;
use tracing::{debug, warn};

use crate::domain::ports::CatalogueChange;
use crate::domain::session::{SessionManager, SessionSnapshot};
use crate::inbound::http::auth::SessionPayload;
use crate::inbound::ws::messages::{ClientMessage, ServerMessage};

#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) async fn handle_ws_session(
    manager: SessionManager,
    changes: broadcast::Receiver<CatalogueChange>,
    session: Session,
    stream: MessageStream,
) {
    let live = LiveChannel {
        snapshots: manager.watch(),
        manager,
        changes,
    };
    live.run(session, stream).await;
}

enum ChannelError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    InvalidPayload,
    ServerShutdown,
    Network(Closed),
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

struct LiveChannel {
    manager: SessionManager,
    snapshots: watch::Receiver<SessionSnapshot>,
    changes: broadcast::Receiver<CatalogueChange>,
}

impl LiveChannel {
    async fn run(mut self, mut session: Session, mut stream: MessageStream) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        let initial = self.snapshots.borrow_and_update().clone();
        let mut result = send(&mut session, &session_frame(&initial))
            .await
            .map_err(ChannelError::Network);

        while result.is_ok() {
            result = tokio::select! {
                _ = heartbeat.tick() => {
                    on_heartbeat(&mut session, last_heartbeat).await
                }
                message = stream.recv() => {
                    self.on_client_message(&mut session, &mut last_heartbeat, message).await
                }
                changed = self.snapshots.changed() => {
                    self.on_session_change(&mut session, changed.is_ok()).await
                }
                change = self.changes.recv() => {
                    on_catalogue_change(&mut session, change).await
                }
            };
        }

        self.manager.teardown();
        if let Err(error) = result {
            log_shutdown_reason(&error);
            if let CloseAction::Close(reason) = close_action(error) {
                if let Err(error) = session.close(reason).await {
                    warn!(%error, "failed to close live channel");
                }
            }
        }
    }

    async fn on_client_message(
        &mut self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), ChannelError> {
        let message = match message {
            None => return Err(ChannelError::StreamClosed),
            Some(Err(error)) => return Err(ChannelError::Protocol(error)),
            Some(Ok(message)) => message,
        };
        *last_heartbeat = Instant::now();
        match message {
            Message::Ping(payload) => session.pong(&payload).await.map_err(ChannelError::Network),
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Refresh) => {
                    let snapshot = self.manager.snapshot();
                    send(session, &session_frame(&snapshot))
                        .await
                        .map_err(ChannelError::Network)
                }
                Err(error) => {
                    warn!(%error, "rejected malformed live channel frame");
                    Err(ChannelError::InvalidPayload)
                }
            },
            Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
                Ok(())
            }
            Message::Close(reason) => Err(ChannelError::ClientClosed(reason)),
        }
    }

    async fn on_session_change(
        &mut self,
        session: &mut Session,
        sender_alive: bool,
    ) -> Result<(), ChannelError> {
        if !sender_alive {
            return Err(ChannelError::ServerShutdown);
        }
        let snapshot = self.snapshots.borrow_and_update().clone();
        debug!(phase = snapshot.phase.name(), "pushing session state");
        send(session, &session_frame(&snapshot))
            .await
            .map_err(ChannelError::Network)
    }
}

fn session_frame(snapshot: &SessionSnapshot) -> ServerMessage {
    ServerMessage::Session(SessionPayload::from(snapshot))
}

async fn on_heartbeat(session: &mut Session, last_heartbeat: Instant) -> Result<(), ChannelError> {
    if last_heartbeat.elapsed() > CLIENT_TIMEOUT {
        return Err(ChannelError::HeartbeatTimeout);
    }
    session.ping(b"").await.map_err(ChannelError::Network)
}

async fn on_catalogue_change(
    session: &mut Session,
    change: Result<CatalogueChange, broadcast::error::RecvError>,
) -> Result<(), ChannelError> {
    let frame = match change {
        Ok(change) => ServerMessage::CatalogueChanged(change),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            debug!(skipped, "live channel lagged behind the change feed");
            ServerMessage::Resync
        }
        Err(broadcast::error::RecvError::Closed) => return Err(ChannelError::ServerShutdown),
    };
    send(session, &frame).await.map_err(ChannelError::Network)
}

async fn send(session: &mut Session, frame: &ServerMessage) -> Result<(), Closed> {
    match serde_json::to_string(frame) {
        Ok(body) => session.text(body).await,
        Err(error) => {
            warn!(%error, "failed to serialise live channel frame");
            Ok(())
        }
    }
}

fn log_shutdown_reason(error: &ChannelError) {
    match error {
        ChannelError::HeartbeatTimeout => warn!("live channel heartbeat timeout"),
        ChannelError::Protocol(error) => warn!(%error, "live channel protocol error"),
        ChannelError::Network(error) => warn!(%error, "live channel send failed"),
        ChannelError::ServerShutdown => debug!("live channel source closed"),
        ChannelError::InvalidPayload | ChannelError::ClientClosed(_) | ChannelError::StreamClosed => {
        }
    }
}

fn close_action(error: ChannelError) -> CloseAction {
    let (code, description) = match error {
        ChannelError::HeartbeatTimeout => (CloseCode::Normal, "heartbeat timeout"),
        ChannelError::Protocol(_) => (CloseCode::Protocol, "protocol error"),
        ChannelError::InvalidPayload => (CloseCode::Policy, "invalid payload"),
        ChannelError::ServerShutdown => (CloseCode::Away, "server shutting down"),
        ChannelError::ClientClosed(reason) => return CloseAction::Close(reason),
        ChannelError::StreamClosed | ChannelError::Network(_) => return CloseAction::None,
    };
    CloseAction::Close(Some(CloseReason {
        code,
        description: Some(description.to_owned()),
    }))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
