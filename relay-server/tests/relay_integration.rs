//! End-to-end tests: a real relay on an ephemeral port driven by WebSocket
//! clients.

use camera_relay_server::{server, CameraRelay, Config};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct TestRelay {
    url: String,
    relay: Arc<CameraRelay>,
    _shutdown: oneshot::Sender<()>,
}

async fn start_relay(config: Config) -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ws_path = config.server.ws_path.clone();
    let relay = Arc::new(CameraRelay::new(config));
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(server::serve(listener, relay.clone(), async {
        let _ = rx.await;
    }));

    TestRelay {
        url: format!("ws://{addr}{ws_path}"),
        relay,
        _shutdown: tx,
    }
}

struct Peer {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Peer {
    async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.expect("connect");
        Self { ws }
    }

    async fn send(&mut self, value: Value) {
        self.ws.send(Message::Text(value.to_string())).await.unwrap();
    }

    async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string())).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .expect("transport error");
            match frame {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    async fn expect_error(&mut self, message: &str) {
        assert_eq!(self.recv().await, json!({"type": "ERROR", "message": message}));
    }

    async fn expect_silence(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(200), self.ws.next()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }

    async fn register(&mut self, msg_type: &str, pin: &str, role: &str) {
        self.send(json!({"type": msg_type, "pin": pin, "deviceType": role}))
            .await;
    }

    async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

async fn paired(relay: &TestRelay, pin: &str) -> (Peer, Peer) {
    let mut server = Peer::connect(&relay.url).await;
    server.register("CREATE_ROOM", pin, "SERVER").await;
    assert_eq!(server.recv().await, json!({"type": "ROOM_CREATED", "pin": pin}));

    let mut client = Peer::connect(&relay.url).await;
    client.register("JOIN_ROOM", pin, "CLIENT").await;
    assert_eq!(client.recv().await, json!({"type": "CONNECTED", "pin": pin}));
    assert_eq!(server.recv().await, json!({"type": "CLIENT_CONNECTED"}));

    (server, client)
}

#[tokio::test]
async fn scenario_server_creates_room() {
    let relay = start_relay(Config::default()).await;
    let mut server = Peer::connect(&relay.url).await;

    server.register("CREATE_ROOM", "1234", "SERVER").await;

    assert_eq!(server.recv().await, json!({"type": "ROOM_CREATED", "pin": "1234"}));
    assert_eq!(relay.relay.total_rooms(), 1);
}

#[tokio::test]
async fn scenario_second_server_is_refused() {
    let relay = start_relay(Config::default()).await;
    let mut first = Peer::connect(&relay.url).await;
    first.register("CREATE_ROOM", "1234", "SERVER").await;
    first.recv().await;

    let mut second = Peer::connect(&relay.url).await;
    second.register("CREATE_ROOM", "1234", "SERVER").await;
    second.expect_error("Room already has a server").await;
    first.expect_silence().await;

    // The loser stays connected and may try another PIN.
    second.register("CREATE_ROOM", "4321", "SERVER").await;
    assert_eq!(second.recv().await, json!({"type": "ROOM_CREATED", "pin": "4321"}));
}

#[tokio::test]
async fn scenario_client_without_server() {
    let relay = start_relay(Config::default()).await;
    let mut client = Peer::connect(&relay.url).await;

    client.register("JOIN_ROOM", "9999", "CLIENT").await;

    client
        .expect_error("No server in room. Server must create room first.")
        .await;
    assert_eq!(relay.relay.total_rooms(), 0);
}

#[tokio::test]
async fn scenario_command_reaches_server() {
    let relay = start_relay(Config::default()).await;
    let (mut server, mut client) = paired(&relay, "1234").await;

    client
        .send(json!({"type": "COMMAND", "command": "TAKE_PHOTO"}))
        .await;
    assert_eq!(
        server.recv().await,
        json!({"type": "COMMAND", "command": "TAKE_PHOTO"})
    );

    server
        .send(json!({"type": "RESPONSE", "message": "Photo taken"}))
        .await;
    assert_eq!(
        client.recv().await,
        json!({"type": "RESPONSE", "message": "Photo taken"})
    );

    server.send(json!({"type": "IMAGE", "data": "/9j/4AAQ"})).await;
    assert_eq!(client.recv().await, json!({"type": "IMAGE", "data": "/9j/4AAQ"}));
}

#[tokio::test]
async fn scenario_server_disconnect() {
    let relay = start_relay(Config::default()).await;
    let (server, mut client) = paired(&relay, "1234").await;

    server.close().await;
    assert_eq!(client.recv().await, json!({"type": "SERVER_DISCONNECTED"}));

    client
        .send(json!({"type": "COMMAND", "command": "TAKE_PHOTO"}))
        .await;
    client.expect_error("Server not connected").await;
    assert_eq!(relay.relay.total_rooms(), 1);

    client.close().await;
    let inner = relay.relay.clone();
    wait_until(move || inner.total_rooms() == 0).await;
}

#[tokio::test]
async fn client_disconnect_notifies_server() {
    let relay = start_relay(Config::default()).await;
    let (mut server, client) = paired(&relay, "2468").await;

    client.close().await;
    assert_eq!(server.recv().await, json!({"type": "CLIENT_DISCONNECTED"}));

    server
        .send(json!({"type": "RESPONSE", "message": "anyone?"}))
        .await;
    server.expect_error("Client not connected").await;
}

#[tokio::test]
async fn oversize_frame_ends_the_sender_connection() {
    let mut config = Config::default();
    config.websocket.max_message_size = 1024;
    let relay = start_relay(config).await;
    let (mut server, mut client) = paired(&relay, "1024").await;

    client
        .send(json!({"type": "COMMAND", "command": "X".repeat(2000)}))
        .await;

    assert_eq!(server.recv().await, json!({"type": "CLIENT_DISCONNECTED"}));
    let inner = relay.relay.clone();
    wait_until(move || inner.bound_sessions() == 1 && inner.total_rooms() == 1).await;
}

#[tokio::test]
async fn rooms_do_not_leak_between_pins() {
    let relay = start_relay(Config::default()).await;
    let (mut server_a, _client_a) = paired(&relay, "1111").await;
    let (mut server_b, mut client_b) = paired(&relay, "2222").await;

    client_b
        .send(json!({"type": "COMMAND", "command": "RECORD"}))
        .await;
    assert_eq!(
        server_b.recv().await,
        json!({"type": "COMMAND", "command": "RECORD"})
    );
    server_a.expect_silence().await;
}

#[tokio::test]
async fn extra_fields_are_forwarded() {
    let relay = start_relay(Config::default()).await;
    let (mut server, mut client) = paired(&relay, "1357").await;

    let command = json!({"type": "COMMAND", "command": "FLIP_CAMERA", "requestId": 7});
    client.send(command.clone()).await;
    assert_eq!(server.recv().await, command);
}

#[tokio::test]
async fn malformed_frames_get_errors_and_connection_survives() {
    let relay = start_relay(Config::default()).await;
    let mut peer = Peer::connect(&relay.url).await;

    peer.send_raw("this is not json").await;
    peer.expect_error("Invalid JSON format").await;

    peer.send(json!({"type": "DANCE"})).await;
    peer.expect_error("Unknown message type: DANCE").await;

    peer.register("CREATE_ROOM", "12a4", "SERVER").await;
    peer.expect_error("PIN must be 4 digits").await;

    peer.register("CREATE_ROOM", "1234", "CAMERA").await;
    peer.expect_error("Invalid device type. Use SERVER or CLIENT").await;

    peer.send(json!({"type": "CREATE_ROOM", "pin": "1234"})).await;
    peer.expect_error("PIN and deviceType are required").await;

    peer.send(json!({"type": "COMMAND", "command": "TAKE_PHOTO"})).await;
    peer.expect_error("Not in a room").await;

    assert_eq!(relay.relay.total_rooms(), 0);

    peer.register("CREATE_ROOM", "1234", "SERVER").await;
    assert_eq!(peer.recv().await, json!({"type": "ROOM_CREATED", "pin": "1234"}));
}

#[tokio::test]
async fn connection_rate_limit_rejects_upgrade() {
    let mut config = Config::default();
    config.limits.connections_per_ip = 1;
    let relay = start_relay(config).await;

    let _first = Peer::connect(&relay.url).await;
    match connect_async(relay.url.as_str()).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 429),
        other => panic!("expected HTTP 429, got {other:?}"),
    }
}

#[tokio::test]
async fn session_cap_rejects_upgrade() {
    let mut config = Config::default();
    config.limits.max_concurrent_sessions = 1;
    let relay = start_relay(config).await;

    let _first = Peer::connect(&relay.url).await;
    match connect_async(relay.url.as_str()).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 503),
        other => panic!("expected HTTP 503, got {other:?}"),
    }
}

#[tokio::test]
async fn idle_connection_is_reaped() {
    let mut config = Config::default();
    config.websocket.idle_timeout_secs = 1;
    config.websocket.ping_interval_secs = 30;
    let relay = start_relay(config).await;

    let mut server = Peer::connect(&relay.url).await;
    server.register("CREATE_ROOM", "8080", "SERVER").await;
    server.recv().await;

    let ended = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match server.ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "idle connection was not closed");

    let inner = relay.relay.clone();
    wait_until(move || inner.total_rooms() == 0 && inner.open_sockets() == 0).await;
}
