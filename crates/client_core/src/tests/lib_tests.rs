use super::*;
use std::time::Duration;

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use shared::domain::DeliveryStatus;
use tokio::{net::TcpListener, sync::oneshot};

#[derive(Clone)]
struct ChatServerState {
    login_calls: Arc<Mutex<u32>>,
    fail_login: Arc<Mutex<bool>>,
    history_requests: Arc<Mutex<Vec<i64>>>,
    /// When set, the history request for the held peer id blocks until the
    /// paired sender fires. Used to force a stale response.
    history_gate: Arc<Mutex<Option<(i64, oneshot::Receiver<()>)>>>,
    sent_messages: Arc<Mutex<Vec<(i64, SendMessageRequest)>>>,
    fail_send: Arc<Mutex<bool>>,
    deleted_ids: Arc<Mutex<Vec<i64>>>,
    fail_delete: Arc<Mutex<bool>>,
    event_tx: broadcast::Sender<ServerEvent>,
}

impl ChatServerState {
    fn push_event(&self, event: ServerEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn profile(user_id: i64, email: &str) -> UserProfile {
    UserProfile {
        user_id: UserId(user_id),
        email: email.to_string(),
        full_name: format!("User {user_id}"),
        profile_pic: None,
        created_at: Utc::now(),
        last_login: None,
        last_logout: None,
        login_count: 1,
        messages_sent: 0,
    }
}

fn live_message(id: i64, sender: i64, receiver: i64) -> MessagePayload {
    MessagePayload {
        message_id: MessageId(id),
        sender_id: UserId(sender),
        receiver_id: UserId(receiver),
        text: Some(format!("live-{id}")),
        image: None,
        status: DeliveryStatus::Sent,
        created_at: Utc::now(),
    }
}

async fn handle_login(
    State(state): State<ChatServerState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    *state.login_calls.lock().await += 1;
    if *state.fail_login.lock().await {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(LoginResponse {
        token: "test-token".to_string(),
        user: profile(1, &request.email),
    }))
}

async fn handle_logout() -> StatusCode {
    StatusCode::OK
}

async fn handle_update_profile(
    Json(update): Json<UpdateProfileRequest>,
) -> Json<UserProfile> {
    let mut user = profile(1, "local@example.com");
    if let Some(full_name) = update.full_name {
        user.full_name = full_name;
    }
    if let Some(profile_pic) = update.profile_pic {
        user.profile_pic = Some(profile_pic);
    }
    Json(user)
}

async fn handle_contacts() -> Json<Vec<UserProfile>> {
    Json(vec![
        profile(2, "ana@example.com"),
        profile(3, "bo@example.com"),
    ])
}

async fn handle_history(
    State(state): State<ChatServerState>,
    Path(peer_id): Path<i64>,
) -> Json<Vec<MessagePayload>> {
    state.history_requests.lock().await.push(peer_id);

    let gate = {
        let mut held = state.history_gate.lock().await;
        match held.as_ref() {
            Some((held_peer, _)) if *held_peer == peer_id => held.take().map(|(_, rx)| rx),
            _ => None,
        }
    };
    if let Some(rx) = gate {
        let _ = rx.await;
    }

    Json(vec![MessagePayload {
        message_id: MessageId(100 + peer_id),
        sender_id: UserId(peer_id),
        receiver_id: UserId(1),
        text: Some(format!("history-with-{peer_id}")),
        image: None,
        status: DeliveryStatus::Read,
        created_at: Utc::now(),
    }])
}

async fn handle_send(
    State(state): State<ChatServerState>,
    Path(peer_id): Path<i64>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<MessagePayload>, StatusCode> {
    if *state.fail_send.lock().await {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    state.sent_messages.lock().await.push((peer_id, body.clone()));
    Ok(Json(MessagePayload {
        message_id: MessageId(999),
        sender_id: UserId(1),
        receiver_id: UserId(peer_id),
        text: body.text,
        image: body.image,
        status: DeliveryStatus::Sent,
        created_at: Utc::now(),
    }))
}

async fn handle_delete(
    State(state): State<ChatServerState>,
    Path(message_id): Path<i64>,
) -> StatusCode {
    if *state.fail_delete.lock().await {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.deleted_ids.lock().await.push(message_id);
    StatusCode::OK
}

async fn handle_event_stream(
    State(state): State<ChatServerState>,
    upgrade: WebSocketUpgrade,
) -> axum::response::Response {
    upgrade.on_upgrade(move |socket| pump_events(socket, state))
}

async fn pump_events(mut socket: axum::extract::ws::WebSocket, state: ChatServerState) {
    let mut events = state.event_tx.subscribe();
    while let Ok(event) = events.recv().await {
        let Ok(text) = serde_json::to_string(&event) else {
            break;
        };
        if socket
            .send(axum::extract::ws::Message::Text(text))
            .await
            .is_err()
        {
            break;
        }
    }
}

async fn spawn_chat_server() -> Result<(String, ChatServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (event_tx, _) = broadcast::channel(64);
    let state = ChatServerState {
        login_calls: Arc::new(Mutex::new(0)),
        fail_login: Arc::new(Mutex::new(false)),
        history_requests: Arc::new(Mutex::new(Vec::new())),
        history_gate: Arc::new(Mutex::new(None)),
        sent_messages: Arc::new(Mutex::new(Vec::new())),
        fail_send: Arc::new(Mutex::new(false)),
        deleted_ids: Arc::new(Mutex::new(Vec::new())),
        fail_delete: Arc::new(Mutex::new(false)),
        event_tx,
    };
    let app = Router::new()
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/auth/update-profile", put(handle_update_profile))
        .route("/messages/users", get(handle_contacts))
        .route("/messages/send/:peer_id", post(handle_send))
        .route("/messages/:id", get(handle_history).delete(handle_delete))
        .route("/ws", get(handle_event_stream))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn wait_for_stream_attach(state: &ChatServerState) {
    for _ in 0..100 {
        if state.event_tx.receiver_count() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("event stream never attached");
}

async fn drain_events(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await {
        events.push(event);
    }
    events
}

fn arrived_message_ids(events: &[ClientEvent]) -> Vec<i64> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::MessageArrived { message } => Some(message.message_id.0),
            _ => None,
        })
        .collect()
}

fn loaded_history_peers(events: &[ClientEvent]) -> Vec<i64> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::HistoryLoaded { peer_id, .. } => Some(peer_id.0),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn login_establishes_session_and_emits_profile() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    let mut events = client.subscribe_events();

    let user = client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");

    assert_eq!(user.email, "local@example.com");
    assert_eq!(*state.login_calls.lock().await, 1);
    assert_eq!(
        client.local_user().await.map(|user| user.user_id),
        Some(UserId(1))
    );

    let events = drain_events(&mut events).await;
    assert!(events
        .iter()
        .any(|event| matches!(event, ClientEvent::SessionEstablished { .. })));
}

#[tokio::test]
async fn login_failure_leaves_no_session() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    *state.fail_login.lock().await = true;

    let client = ChatClient::new();
    let err = client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect_err("login must fail");

    assert!(err.to_string().contains("401"), "unexpected error: {err}");
    assert!(client.local_user().await.is_none());
}

#[tokio::test]
async fn select_conversation_loads_history_for_the_new_peer() {
    let (server_url, _state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    client
        .select_conversation(UserId(2))
        .await
        .expect("select peer 2");

    assert_eq!(client.selected_peer().await, Some(UserId(2)));
    let events = drain_events(&mut events).await;
    assert_eq!(loaded_history_peers(&events), vec![2]);
    let history = events.iter().find_map(|event| match event {
        ClientEvent::HistoryLoaded { messages, .. } => Some(messages.clone()),
        _ => None,
    });
    let history = history.expect("history event");
    assert_eq!(history[0].text.as_deref(), Some("history-with-2"));
}

#[tokio::test]
async fn switching_conversations_discards_stale_history_response() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    let (release_first, gate) = oneshot::channel();
    *state.history_gate.lock().await = Some((2, gate));

    let background = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.select_conversation(UserId(2)).await })
    };
    for _ in 0..100 {
        if state.history_requests.lock().await.contains(&2) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    client
        .select_conversation(UserId(3))
        .await
        .expect("select peer 3");
    let _ = release_first.send(());
    background.await.expect("join").expect("stale select");

    assert_eq!(client.selected_peer().await, Some(UserId(3)));
    let events = drain_events(&mut events).await;
    assert_eq!(
        loaded_history_peers(&events),
        vec![3],
        "stale history for peer 2 must be discarded"
    );
}

#[tokio::test]
async fn live_messages_outside_the_selected_conversation_are_dropped() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    wait_for_stream_attach(&state).await;
    client
        .select_conversation(UserId(3))
        .await
        .expect("select peer 3");
    let mut events = client.subscribe_events();

    state.push_event(ServerEvent::NewMessage {
        message: live_message(40, 2, 1),
    });
    state.push_event(ServerEvent::NewMessage {
        message: live_message(41, 3, 1),
    });

    let events = drain_events(&mut events).await;
    assert_eq!(arrived_message_ids(&events), vec![41]);
}

#[tokio::test]
async fn switching_selection_stops_delivery_from_the_previous_peer() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    wait_for_stream_attach(&state).await;

    client
        .select_conversation(UserId(2))
        .await
        .expect("select peer 2");
    let mut events = client.subscribe_events();
    state.push_event(ServerEvent::NewMessage {
        message: live_message(50, 2, 1),
    });
    let before_switch = drain_events(&mut events).await;
    assert_eq!(arrived_message_ids(&before_switch), vec![50]);

    client
        .select_conversation(UserId(3))
        .await
        .expect("select peer 3");
    state.push_event(ServerEvent::NewMessage {
        message: live_message(51, 2, 1),
    });
    state.push_event(ServerEvent::NewMessage {
        message: live_message(52, 3, 1),
    });

    let after_switch = drain_events(&mut events).await;
    assert_eq!(
        arrived_message_ids(&after_switch),
        vec![52],
        "messages from the abandoned conversation must not surface"
    );
}

#[tokio::test]
async fn send_message_returns_the_stored_message_and_emits_it() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    let message = client
        .send_message(
            UserId(2),
            SendMessageRequest {
                text: Some("hello there".to_string()),
                image: None,
            },
        )
        .await
        .expect("send");

    assert_eq!(message.text.as_deref(), Some("hello there"));
    let recorded = state.sent_messages.lock().await.clone();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, 2);

    let events = drain_events(&mut events).await;
    assert_eq!(arrived_message_ids(&events), vec![999]);
}

#[tokio::test]
async fn send_rejects_empty_body_without_network_call() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");

    let err = client
        .send_message(
            UserId(2),
            SendMessageRequest {
                text: Some("   ".to_string()),
                image: None,
            },
        )
        .await
        .expect_err("empty send must fail");

    assert!(err.to_string().contains("empty message"));
    assert!(state.sent_messages.lock().await.is_empty());
}

#[tokio::test]
async fn failed_send_does_not_emit_a_message() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    *state.fail_send.lock().await = true;

    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    client
        .send_message(
            UserId(2),
            SendMessageRequest {
                text: Some("will fail".to_string()),
                image: None,
            },
        )
        .await
        .expect_err("send must fail");

    let events = drain_events(&mut events).await;
    assert!(arrived_message_ids(&events).is_empty());
}

#[tokio::test]
async fn delete_message_emits_deletion_on_success() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    client
        .delete_message(MessageId(77))
        .await
        .expect("delete");

    assert_eq!(state.deleted_ids.lock().await.clone(), vec![77]);
    let events = drain_events(&mut events).await;
    assert!(events.iter().any(|event| matches!(
        event,
        ClientEvent::Server(ServerEvent::MessageDeleted {
            message_id: MessageId(77)
        })
    )));
}

#[tokio::test]
async fn delete_message_failure_surfaces_error_and_emits_nothing() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    *state.fail_delete.lock().await = true;

    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    client
        .delete_message(MessageId(77))
        .await
        .expect_err("delete must fail");

    assert!(state.deleted_ids.lock().await.is_empty());
    let events = drain_events(&mut events).await;
    assert!(!events.iter().any(|event| matches!(
        event,
        ClientEvent::Server(ServerEvent::MessageDeleted { .. })
    )));
}

#[tokio::test]
async fn presence_updates_flow_from_the_event_stream() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    wait_for_stream_attach(&state).await;

    state.push_event(ServerEvent::OnlineUsers {
        user_ids: vec![UserId(2), UserId(3)],
    });

    let expected: HashSet<UserId> = [UserId(2), UserId(3)].into_iter().collect();
    for _ in 0..100 {
        if client.online_users().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("presence set never updated");
}

#[tokio::test]
async fn contacts_list_is_fetched_and_broadcast() {
    let (server_url, _state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    let mut events = client.subscribe_events();

    let contacts = client.list_contacts().await.expect("contacts");
    assert_eq!(contacts.len(), 2);

    let events = drain_events(&mut events).await;
    assert!(events
        .iter()
        .any(|event| matches!(event, ClientEvent::ContactsLoaded { contacts } if contacts.len() == 2)));
}

#[tokio::test]
async fn update_profile_updates_the_cached_user() {
    let (server_url, _state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");

    let updated = client
        .update_profile(UpdateProfileRequest {
            full_name: Some("Renamed User".to_string()),
            profile_pic: None,
        })
        .await
        .expect("update profile");

    assert_eq!(updated.full_name, "Renamed User");
    assert_eq!(
        client.local_user().await.map(|user| user.full_name),
        Some("Renamed User".to_string())
    );
}

#[tokio::test]
async fn logout_clears_the_session_and_emits_closure() {
    let (server_url, _state) = spawn_chat_server().await.expect("spawn server");
    let client = ChatClient::new();
    client
        .login(&server_url, "local@example.com", "abcdef")
        .await
        .expect("login");
    client
        .select_conversation(UserId(2))
        .await
        .expect("select");
    let mut events = client.subscribe_events();

    client.logout().await.expect("logout");

    assert!(client.local_user().await.is_none());
    assert_eq!(client.selected_peer().await, None);
    let err = client
        .refresh_history(UserId(2))
        .await
        .expect_err("history must require a session");
    assert!(err.to_string().contains("not logged in"));

    let events = drain_events(&mut events).await;
    assert!(events
        .iter()
        .any(|event| matches!(event, ClientEvent::SessionClosed)));
}

#[test]
fn event_stream_url_rewrites_http_schemes() {
    let ws = event_stream_url("http://127.0.0.1:5001", UserId(9)).expect("ws url");
    assert_eq!(ws.as_str(), "ws://127.0.0.1:5001/ws?user_id=9");

    let wss = event_stream_url("https://chat.example.com", UserId(9)).expect("wss url");
    assert_eq!(wss.as_str(), "wss://chat.example.com/ws?user_id=9");
}

#[test]
fn event_stream_url_rejects_non_http_schemes() {
    let err = event_stream_url("ftp://chat.example.com", UserId(9)).expect_err("must reject");
    assert!(matches!(err, SubscriptionError::UnsupportedScheme { .. }));
}
