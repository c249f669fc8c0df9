//! End-to-end tests using real WebSocket clients.
//!
//! Each test boots the full router on an ephemeral port and drives it with
//! `tokio-tungstenite` clients:
//! 1. Join announcements carry the joining identity and member count
//! 2. A relayed line reaches every client, sender included
//! 3. Departures are announced to the remaining clients

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use silence::adapters::http::app_router;
use silence::adapters::websocket::{Hub, HubHandle, PumpSettings, WebSocketState};
use silence::config::{RelayConfig, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Boot a relay and return its address plus a handle to its hub.
async fn boot_server() -> (SocketAddr, HubHandle) {
    let hub = Hub::spawn();
    let state = WebSocketState::new(hub.clone(), PumpSettings::from(&RelayConfig::default()));
    let app = app_router(&ServerConfig::default(), state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, hub)
}

/// WebSocket client that reads the relay line by line.
///
/// The relay may pack several lines into one frame, so frames are split and
/// buffered.
struct Client {
    ws: WsStream,
    pending: VecDeque<String>,
    id: String,
}

impl Client {
    /// Connect and learn our identity from our own join announcement.
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let mut client = Self {
            ws,
            pending: VecDeque::new(),
            id: String::new(),
        };
        let joined = client.next_line().await;
        client.id = joined
            .strip_prefix("> New user connected: ")
            .and_then(|rest| rest.split(' ').next())
            .expect("first line is our own join announcement")
            .to_string();
        client
    }

    async fn send(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string())).await.unwrap();
    }

    async fn next_line(&mut self) -> String {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return line;
            }
            let frame = timeout(TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                self.pending.extend(text.split('\n').map(str::to_owned));
            }
        }
    }

    /// Skip lines until one satisfies the predicate.
    async fn line_matching(&mut self, predicate: impl Fn(&str) -> bool) -> String {
        loop {
            let line = self.next_line().await;
            if predicate(&line) {
                return line;
            }
        }
    }

    /// Wait for the server to end the connection.
    async fn closed(&mut self) {
        loop {
            match timeout(TIMEOUT, self.ws.next()).await.expect("timed out waiting for close") {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => continue,
            }
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn relays_to_all_clients_and_announces_departure() {
    let (addr, _hub) = boot_server().await;

    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    assert_ne!(a.id, b.id);

    let joined_b = a.line_matching(|l| l.starts_with("> New user connected")).await;
    assert_eq!(joined_b, format!("> New user connected: {} (total: 2)", b.id));

    a.send("hello").await;
    let expected = format!("{} hello", a.id);
    assert_eq!(a.line_matching(|l| !l.starts_with('>')).await, expected);
    assert_eq!(b.line_matching(|l| !l.starts_with('>')).await, expected);

    b.ws.close(None).await.unwrap();

    let departed = a.line_matching(|l| l.starts_with("> User disconnected")).await;
    assert_eq!(departed, format!("> User disconnected: {} (total: 1)", b.id));
}

#[tokio::test]
async fn departure_is_announced_exactly_once() {
    let (addr, hub) = boot_server().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    let departed = format!("> User disconnected: {}", b.id);

    b.ws.close(None).await.unwrap();
    b.closed().await;
    a.line_matching(|l| l.starts_with(&departed)).await;

    // Both server-side tasks for B are done once the registry has shrunk.
    while hub.member_count().await != Some(1) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    a.send("marker").await;
    let marker = format!("{} marker", a.id);
    let mut repeats = 0;
    loop {
        let line = a.next_line().await;
        if line == marker {
            break;
        }
        if line.starts_with(&departed) {
            repeats += 1;
        }
    }
    assert_eq!(repeats, 0, "departure of {} announced more than once", b.id);
}

#[tokio::test]
async fn embedded_newlines_are_flattened() {
    let (addr, _hub) = boot_server().await;
    let mut a = Client::connect(addr).await;

    a.send("hi\nthere\n").await;

    let line = a.line_matching(|l| !l.starts_with('>')).await;
    assert_eq!(line, format!("{} hi there", a.id));
}

#[tokio::test]
async fn many_clients_all_receive_a_broadcast() {
    let (addr, hub) = boot_server().await;
    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(Client::connect(addr).await);
    }
    assert_eq!(hub.member_count().await, Some(5));

    let sender_id = clients[2].id.clone();
    clients[2].send("fan out").await;

    let expected = format!("{} fan out", sender_id);
    for client in &mut clients {
        assert_eq!(client.line_matching(|l| !l.starts_with('>')).await, expected);
    }
}

#[tokio::test]
async fn oversized_frame_disconnects_sender_only() {
    let (addr, hub) = boot_server().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;

    let oversized = "x".repeat(RelayConfig::default().max_message_size + 1);
    // The server may drop the socket before the send completes.
    let _ = a.ws.send(Message::Text(oversized)).await;
    a.closed().await;

    let departed = b.line_matching(|l| l.starts_with("> User disconnected")).await;
    assert_eq!(departed, format!("> User disconnected: {} (total: 1)", a.id));
    assert_eq!(hub.member_count().await, Some(1));

    b.send("still here").await;
    assert_eq!(
        b.line_matching(|l| !l.starts_with('>')).await,
        format!("{} still here", b.id)
    );
}

#[tokio::test]
async fn landing_page_is_served() {
    let (addr, _hub) = boot_server().await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let content_type = response.headers()[reqwest::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    assert!(response.text().await.unwrap().contains("/ws"));
}

#[tokio::test]
async fn failed_upgrade_leaves_hub_untouched() {
    let (addr, hub) = boot_server().await;

    let response = reqwest::get(format!("http://{addr}/ws")).await.unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(hub.member_count().await, Some(0));
}
