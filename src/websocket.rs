use crate::{
    agent::{ ChatAgent, ChatError, ChatSession, SessionSettings },
    config::moods::Mood,
    models::websocket::{ ClientMessage, ServerMessage },
};
use futures::{ Sink, SinkExt, StreamExt };
use log::{ debug, info, warn, error };
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio_tungstenite::{ tungstenite::{ protocol::Message, Error as WsError }, WebSocketStream };

const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Defaults applied to every session a connection opens.
#[derive(Debug, Clone, Default)]
pub struct SessionDefaults {
    pub settings: SessionSettings,
    pub user_name: Option<String>,
}

async fn send<S>(tx: &mut S, peer: SocketAddr, msg: &ServerMessage) -> bool
    where S: Sink<Message> + Unpin, S::Error: std::fmt::Display
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message for {}: {}", peer, e);
            return false;
        }
    };
    match tx.send(Message::Text(json)).await {
        Ok(()) => true,
        Err(e) => {
            error!("Error sending message to {}: {}", peer, e);
            false
        }
    }
}

fn transcript(session: &ChatSession) -> ServerMessage {
    ServerMessage::Transcript { records: session.render() }
}

/// Serves one client. The connection owns its session, so turns from the
/// same client run strictly one after another.
pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    agent: Arc<ChatAgent>,
    defaults: SessionDefaults
)
    where S: AsyncRead + AsyncWrite + Unpin
{
    let (mut tx, mut rx) = websocket.split();
    let mut session = ChatSession::new(defaults.settings, defaults.user_name);
    info!("Assigned session {} to {}", session.id, peer);

    if !send(&mut tx, peer, &transcript(&session)).await {
        return;
    }

    while let Some(msg) = rx.next().await {
        let message = match msg {
            Ok(message) => message,
            Err(e) => {
                if let Some(reply) = receive_error_reply(peer, &e) {
                    let _ = send(&mut tx, peer, &reply).await;
                }
                break;
            }
        };

        if message.len() > MAX_MESSAGE_SIZE {
            warn!("Message from {} exceeds size limit ({} > {})", peer, message.len(), MAX_MESSAGE_SIZE);
            let error_msg = ServerMessage::Error { message: "Message too large".to_string() };
            let _ = send(&mut tx, peer, &error_msg).await;
            break;
        }

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                info!("Received close frame from {}", peer);
                break;
            }
            Message::Ping(data) => {
                if tx.send(Message::Pong(data)).await.is_err() {
                    error!("Failed to send pong to {}", peer);
                    break;
                }
                continue;
            }
            Message::Binary(_) => {
                warn!("Ignoring binary message from {}", peer);
                continue;
            }
            Message::Pong(_) | Message::Frame(_) => {
                continue;
            }
        };

        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(client_msg) => client_msg,
            Err(e) => {
                warn!("Failed to parse message from {}: {}", peer, e);
                let error_msg = ServerMessage::Error {
                    message: format!("Failed to parse message: {}", e),
                };
                if !send(&mut tx, peer, &error_msg).await {
                    break;
                }
                continue;
            }
        };

        let keep_going = match client_msg {
            ClientMessage::Chat { content } => {
                run_turn(&mut tx, peer, &agent, &mut session, TurnInput::Text(content)).await
            }
            ClientMessage::Mood { mood } => {
                run_turn(&mut tx, peer, &agent, &mut session, TurnInput::Mood(mood)).await
            }
            ClientMessage::Clear => {
                agent.on_clear(&mut session);
                send(&mut tx, peer, &transcript(&session)).await
            }
            ClientMessage::SetName { name } => {
                session.set_user_name(name);
                debug!("Session {} personalization: {:?}", session.id, session.personalization);
                send(&mut tx, peer, &transcript(&session)).await
            }
            ClientMessage::Settings { max_sentences, max_new_tokens, show_timestamps } => {
                session.update_settings(max_sentences, max_new_tokens, show_timestamps);
                debug!("Session {} settings: {:?}", session.id, session.settings);
                send(&mut tx, peer, &transcript(&session)).await
            }
            ClientMessage::Render => send(&mut tx, peer, &transcript(&session)).await,
        };

        if !keep_going {
            break;
        }
    }
    info!("WebSocket connection closed for {} (session {})", peer, session.id);
}

/// Logs a receive failure and says whether the client should still be told.
/// Disconnects and resets are routine; an oversized frame gets a reply.
fn receive_error_reply(peer: SocketAddr, e: &WsError) -> Option<ServerMessage> {
    match e {
        | WsError::ConnectionClosed
        | WsError::Protocol(_)
        | WsError::Utf8 => {
            info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
            None
        }
        WsError::Io(io_err) if io_err.kind() == std::io::ErrorKind::ConnectionReset => {
            info!("WebSocket connection reset by peer {}", peer);
            None
        }
        WsError::Capacity(cap_err) => {
            error!("WebSocket capacity error for {}: {}", peer, cap_err);
            Some(ServerMessage::Error { message: "Server capacity error".to_string() })
        }
        _ => {
            error!("Error receiving message from {}: {}", peer, e);
            None
        }
    }
}

enum TurnInput {
    Text(String),
    Mood(Mood),
}

async fn run_turn<S>(
    tx: &mut S,
    peer: SocketAddr,
    agent: &ChatAgent,
    session: &mut ChatSession,
    input: TurnInput
) -> bool
    where S: Sink<Message> + Unpin, S::Error: std::fmt::Display
{
    if let TurnInput::Text(text) = &input {
        if text.trim().is_empty() {
            debug!("Ignoring blank message from {}", peer);
            return true;
        }
    }

    if !send(tx, peer, &ServerMessage::Processing).await {
        return false;
    }

    let result = match input {
        TurnInput::Text(text) => agent.on_send(session, &text).await,
        TurnInput::Mood(mood) => agent.on_mood_shortcut(session, mood).await,
    };

    let notice = match result {
        Ok(outcome) => {
            info!("Session {} turn {} answered", session.id, outcome.index());
            outcome.diagnostic().map(|d| ServerMessage::Diagnostic { message: d.to_string() })
        }
        Err(e) => {
            if !matches!(e, ChatError::EmptyInput) {
                error!("Turn failed for {}: {}", peer, e);
            }
            turn_error_message(&e)
        }
    };

    if let Some(msg) = notice {
        if !send(tx, peer, &msg).await {
            return false;
        }
    }

    send(tx, peer, &transcript(session)).await
}

/// What the client is told about a turn that failed. Blank input gets no
/// notice; anything else is an internal fault and its detail stays in the log.
fn turn_error_message(err: &ChatError) -> Option<ServerMessage> {
    match err {
        ChatError::EmptyInput => None,
        ChatError::Log(_) => Some(ServerMessage::Error { message: "Internal error".to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::LogError;

    #[test]
    fn log_fault_is_reported_as_internal_error() {
        let err = ChatError::Log(LogError::IndexOutOfRange { index: 2, len: 1, pending: false });
        assert_eq!(
            turn_error_message(&err),
            Some(ServerMessage::Error { message: "Internal error".to_string() })
        );
    }

    #[test]
    fn blank_input_has_no_notice() {
        assert_eq!(turn_error_message(&ChatError::EmptyInput), None);
    }

    #[test]
    fn capacity_errors_are_reported_to_the_client() {
        use tokio_tungstenite::tungstenite::error::CapacityError;

        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let err = WsError::Capacity(CapacityError::MessageTooLong { size: 10, max_size: 5 });
        assert_eq!(
            receive_error_reply(peer, &err),
            Some(ServerMessage::Error { message: "Server capacity error".to_string() })
        );
    }

    #[test]
    fn resets_and_closes_end_quietly() {
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let reset = WsError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(receive_error_reply(peer, &reset), None);
        assert_eq!(receive_error_reply(peer, &WsError::ConnectionClosed), None);
    }
}
