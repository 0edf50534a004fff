mod common;

use futures::{ SinkExt, StreamExt };
use mental_health_chat::agent::{ SessionSettings, GENERATION_FALLBACK };
use mental_health_chat::llm::generation::GenerationError;
use mental_health_chat::models::chat::{ DisplayRecord, Side };
use mental_health_chat::models::websocket::ServerMessage;
use mental_health_chat::websocket::{ handle_connection, SessionDefaults };
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::{ Message, Role };
use tokio_tungstenite::WebSocketStream;

use common::{ agent, reply, ScriptedGenerator };

type Client = WebSocketStream<DuplexStream>;

/// Runs `handle_connection` over an in-memory pipe and returns the client end
/// once the initial (empty) transcript has arrived.
async fn connect(generator: &Arc<ScriptedGenerator>) -> (Client, JoinHandle<()>) {
    let (client_io, server_io) = tokio::io::duplex(1 << 20);
    let agent = Arc::new(agent(generator));
    let defaults = SessionDefaults {
        settings: SessionSettings { show_timestamps: false, ..SessionSettings::default() },
        user_name: None,
    };
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

    let server = tokio::spawn(async move {
        let ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        handle_connection(peer, ws, agent, defaults).await;
    });

    let mut client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript { records: vec![] });
    (client, server)
}

async fn send(client: &mut Client, json: &str) {
    client.send(Message::Text(json.to_string())).await.unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for the server")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn bubble(side: Side, text: &str) -> DisplayRecord {
    DisplayRecord { side, text: text.to_string(), timestamp: None }
}

#[tokio::test]
async fn chat_turn_sends_processing_then_transcript() {
    let generator = ScriptedGenerator::new(vec![reply("[INST] hi [/INST] I'm here for you.")]);
    let (mut client, _server) = connect(&generator).await;

    send(&mut client, r#"{"type":"chat","content":"hi"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Processing);
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript {
        records: vec![bubble(Side::User, "hi"), bubble(Side::Bot, "I'm here for you.")],
    });
}

#[tokio::test]
async fn backend_failure_sends_diagnostic_before_transcript() {
    let generator = ScriptedGenerator::new(
        vec![Err(GenerationError::Status { status: 502, body: "bad gateway".into() })]
    );
    let (mut client, _server) = connect(&generator).await;

    send(&mut client, r#"{"type":"chat","content":"I can't sleep"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Processing);
    match recv(&mut client).await {
        ServerMessage::Diagnostic { message } => assert!(message.contains("502"), "{}", message),
        other => panic!("expected diagnostic, got {:?}", other),
    }
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript {
        records: vec![bubble(Side::User, "I can't sleep"), bubble(Side::Bot, GENERATION_FALLBACK)],
    });
}

#[tokio::test]
async fn blank_chat_is_silently_ignored() {
    let generator = ScriptedGenerator::new(vec![]);
    let (mut client, _server) = connect(&generator).await;

    send(&mut client, r#"{"type":"chat","content":"   \n\t"}"#).await;
    send(&mut client, r#"{"type":"render"}"#).await;

    // The render reply comes first: nothing was queued for the blank message.
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript { records: vec![] });
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn mood_shortcut_runs_a_turn() {
    let generator = ScriptedGenerator::new(vec![reply("[/INST] Let's breathe together")]);
    let (mut client, _server) = connect(&generator).await;

    send(&mut client, r#"{"type":"mood","mood":"anxious"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Processing);
    match recv(&mut client).await {
        ServerMessage::Transcript { records } => {
            assert_eq!(records.len(), 2);
            assert_eq!(records[1].text, "Let's breathe together.");
        }
        other => panic!("expected transcript, got {:?}", other),
    }
    assert_eq!(generator.requests().len(), 1);
}

#[tokio::test]
async fn set_name_and_clear_answer_with_transcript() {
    let generator = ScriptedGenerator::new(vec![reply("[/INST] Hello.")]);
    let (mut client, _server) = connect(&generator).await;

    send(&mut client, r#"{"type":"set_name","name":"Sam"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript { records: vec![] });

    send(&mut client, r#"{"type":"chat","content":"hey"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Processing);
    let ServerMessage::Transcript { records } = recv(&mut client).await else {
        panic!("expected transcript");
    };
    assert_eq!(records.len(), 2);
    assert!(generator.requests()[0].prompt.contains("Sam"));

    send(&mut client, r#"{"type":"clear"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript { records: vec![] });
}

#[tokio::test]
async fn unparseable_message_is_reported_and_connection_stays_open() {
    let generator = ScriptedGenerator::new(vec![]);
    let (mut client, _server) = connect(&generator).await;

    send(&mut client, r#"{"type":"dance"}"#).await;
    match recv(&mut client).await {
        ServerMessage::Error { message } => {
            assert!(message.starts_with("Failed to parse message"), "{}", message);
        }
        other => panic!("expected error, got {:?}", other),
    }

    send(&mut client, r#"{"type":"render"}"#).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Transcript { records: vec![] });
}

#[tokio::test]
async fn oversized_message_is_rejected_and_connection_closed() {
    let generator = ScriptedGenerator::new(vec![]);
    let (mut client, server) = connect(&generator).await;

    let content = "a".repeat(70_000);
    send(&mut client, &format!(r#"{{"type":"chat","content":"{}"}}"#, content)).await;
    assert_eq!(recv(&mut client).await, ServerMessage::Error {
        message: "Message too large".to_string(),
    });

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("handler kept running")
        .unwrap();
    assert!(generator.requests().is_empty());
}
