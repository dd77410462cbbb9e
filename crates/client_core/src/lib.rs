//! Client-side state container for the desktop messenger.
//!
//! [`ChatClient`] owns the session (server URL, bearer token, local profile),
//! the conversation selection with its live-event subscription, and the
//! presence set. Views never talk to the network themselves: they call the
//! [`ClientHandle`] operations and observe the resulting [`ClientEvent`]s on
//! a broadcast channel.

use std::{collections::HashSet, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use shared::{
    domain::{MessageId, UserId},
    protocol::{
        LoginRequest, LoginResponse, MessagePayload, SendMessageRequest, ServerEvent,
        UpdateProfileRequest, UserProfile,
    },
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

/// Failures while deriving or connecting the live event stream.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("server url must start with http:// or https:// (got '{url}')")]
    UnsupportedScheme { url: String },
    #[error("failed to connect event stream at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// State-change notifications fanned out to every subscribed view.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Raw server event passed through unchanged (presence, deletions, server
    /// errors). New-message events are filtered first and surface as
    /// [`ClientEvent::MessageArrived`].
    Server(ServerEvent),
    SessionEstablished {
        user: UserProfile,
    },
    SessionClosed,
    ProfileUpdated {
        user: UserProfile,
    },
    ContactsLoaded {
        contacts: Vec<UserProfile>,
    },
    HistoryLoaded {
        peer_id: UserId,
        messages: Vec<MessagePayload>,
    },
    /// A message belonging to the currently selected conversation: either a
    /// live event that passed the selection filter or a just-sent own message.
    MessageArrived {
        message: MessagePayload,
    },
    Error(String),
}

/// The operations a view may drive against the state container.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    async fn login(&self, server_url: &str, email: &str, password: &str) -> Result<UserProfile>;
    async fn logout(&self) -> Result<()>;
    async fn update_profile(&self, update: UpdateProfileRequest) -> Result<UserProfile>;
    async fn list_contacts(&self) -> Result<Vec<UserProfile>>;
    /// Detach the previous conversation's subscription, attach the new one,
    /// then load its history. Detach always completes before attach.
    async fn select_conversation(&self, peer_id: UserId) -> Result<()>;
    /// Detach the current conversation's subscription without attaching a new
    /// one. Safe to call when nothing is selected.
    async fn clear_conversation(&self);
    /// Fetch the full history with `peer_id`. A response that arrives after
    /// the selection has moved on is discarded and yields an empty list.
    async fn refresh_history(&self, peer_id: UserId) -> Result<Vec<MessagePayload>>;
    async fn send_message(
        &self,
        peer_id: UserId,
        body: SendMessageRequest,
    ) -> Result<MessagePayload>;
    async fn delete_message(&self, message_id: MessageId) -> Result<()>;
    async fn local_user(&self) -> Option<UserProfile>;
    async fn online_users(&self) -> HashSet<UserId>;
    async fn selected_peer(&self) -> Option<UserId>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

pub struct ChatClient {
    http: Client,
    inner: Mutex<ChatClientState>,
    events: broadcast::Sender<ClientEvent>,
}

struct ChatClientState {
    server_url: Option<String>,
    token: Option<String>,
    user: Option<UserProfile>,
    selected_peer: Option<UserId>,
    /// Bumped on every selection change; history responses issued under an
    /// older generation are discarded instead of overwriting the new view.
    history_generation: u64,
    online_users: HashSet<UserId>,
    event_stream: Option<JoinHandle<()>>,
}

fn clear_session(state: &mut ChatClientState) {
    state.server_url = None;
    state.token = None;
    state.user = None;
    state.selected_peer = None;
    state.history_generation = state.history_generation.wrapping_add(1);
    state.online_users.clear();
    if let Some(task) = state.event_stream.take() {
        task.abort();
    }
}

fn event_stream_url(server_url: &str, user_id: UserId) -> Result<Url, SubscriptionError> {
    let mut url = Url::parse(server_url).map_err(|_| SubscriptionError::UnsupportedScheme {
        url: server_url.to_string(),
    })?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => {
            return Err(SubscriptionError::UnsupportedScheme {
                url: server_url.to_string(),
            })
        }
    };
    if url.set_scheme(scheme).is_err() {
        return Err(SubscriptionError::UnsupportedScheme {
            url: server_url.to_string(),
        });
    }
    url.set_path("/ws");
    url.query_pairs_mut()
        .clear()
        .append_pair("user_id", &user_id.0.to_string());
    Ok(url)
}

impl ChatClient {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            http: Client::new(),
            inner: Mutex::new(ChatClientState {
                server_url: None,
                token: None,
                user: None,
                selected_peer: None,
                history_generation: 0,
                online_users: HashSet::new(),
                event_stream: None,
            }),
            events,
        })
    }

    async fn session(&self) -> Result<(String, String, UserId)> {
        let guard = self.inner.lock().await;
        let server_url = guard
            .server_url
            .clone()
            .ok_or_else(|| anyhow!("not logged in: missing server_url"))?;
        let token = guard
            .token
            .clone()
            .ok_or_else(|| anyhow!("not logged in: missing session token"))?;
        let user_id = guard
            .user
            .as_ref()
            .map(|user| user.user_id)
            .ok_or_else(|| anyhow!("not logged in: missing user profile"))?;
        Ok((server_url, token, user_id))
    }

    async fn spawn_event_stream(
        self: &Arc<Self>,
        server_url: &str,
        user_id: UserId,
    ) -> Result<(), SubscriptionError> {
        let ws_url = event_stream_url(server_url, user_id)?;
        let (ws_stream, _) =
            connect_async(ws_url.as_str())
                .await
                .map_err(|source| SubscriptionError::Connect {
                    url: ws_url.to_string(),
                    source,
                })?;
        let (_, mut ws_reader) = ws_stream.split();

        let client = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => client.route_server_event(event).await,
                        Err(err) => {
                            let _ = client
                                .events
                                .send(ClientEvent::Error(format!("invalid server event: {err}")));
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        let _ = client.events.send(ClientEvent::Error(format!(
                            "event stream receive failed: {err}"
                        )));
                        break;
                    }
                }
            }
            debug!(user_id = user_id.0, "event stream reader finished");
        });

        self.inner.lock().await.event_stream = Some(task);
        Ok(())
    }

    /// Forward a server event to subscribers, applying the per-selection
    /// message filter and keeping the presence set current.
    async fn route_server_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::NewMessage { message } => {
                let in_selected_conversation = {
                    let guard = self.inner.lock().await;
                    match (guard.user.as_ref(), guard.selected_peer) {
                        (Some(user), Some(peer)) => message.is_between(user.user_id, peer),
                        _ => false,
                    }
                };
                if in_selected_conversation {
                    let _ = self.events.send(ClientEvent::MessageArrived { message });
                } else {
                    debug!(
                        message_id = message.message_id.0,
                        sender_id = message.sender_id.0,
                        "dropping live message outside the selected conversation"
                    );
                }
            }
            ServerEvent::OnlineUsers { user_ids } => {
                {
                    let mut guard = self.inner.lock().await;
                    guard.online_users = user_ids.iter().copied().collect();
                }
                let _ = self
                    .events
                    .send(ClientEvent::Server(ServerEvent::OnlineUsers { user_ids }));
            }
            other => {
                let _ = self.events.send(ClientEvent::Server(other));
            }
        }
    }
}

#[async_trait]
impl ClientHandle for Arc<ChatClient> {
    async fn login(&self, server_url: &str, email: &str, password: &str) -> Result<UserProfile> {
        let server_url = server_url.trim_end_matches('/').to_string();
        let res = self
            .http
            .post(format!("{server_url}/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .with_context(|| format!("failed to reach login endpoint at {server_url}"))?
            .error_for_status()?;
        let body: LoginResponse = res.json().await?;

        {
            let mut guard = self.inner.lock().await;
            clear_session(&mut guard);
            guard.server_url = Some(server_url.clone());
            guard.token = Some(body.token.clone());
            guard.user = Some(body.user.clone());
        }

        if let Err(err) = self.spawn_event_stream(&server_url, body.user.user_id).await {
            warn!(user_id = body.user.user_id.0, "discarding session after event stream failure");
            let mut guard = self.inner.lock().await;
            clear_session(&mut guard);
            return Err(err.into());
        }

        let _ = self.events.send(ClientEvent::SessionEstablished {
            user: body.user.clone(),
        });
        Ok(body.user)
    }

    async fn logout(&self) -> Result<()> {
        let (server_url, token, _user_id) = self.session().await?;
        self.http
            .post(format!("{server_url}/auth/logout"))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?;

        {
            let mut guard = self.inner.lock().await;
            clear_session(&mut guard);
        }
        let _ = self.events.send(ClientEvent::SessionClosed);
        Ok(())
    }

    async fn update_profile(&self, update: UpdateProfileRequest) -> Result<UserProfile> {
        let (server_url, token, _user_id) = self.session().await?;
        let user: UserProfile = self
            .http
            .put(format!("{server_url}/auth/update-profile"))
            .bearer_auth(&token)
            .json(&update)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        {
            let mut guard = self.inner.lock().await;
            guard.user = Some(user.clone());
        }
        let _ = self
            .events
            .send(ClientEvent::ProfileUpdated { user: user.clone() });
        Ok(user)
    }

    async fn list_contacts(&self) -> Result<Vec<UserProfile>> {
        let (server_url, token, _user_id) = self.session().await?;
        let contacts: Vec<UserProfile> = self
            .http
            .get(format!("{server_url}/messages/users"))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let _ = self.events.send(ClientEvent::ContactsLoaded {
            contacts: contacts.clone(),
        });
        Ok(contacts)
    }

    async fn select_conversation(&self, peer_id: UserId) -> Result<()> {
        {
            let mut guard = self.inner.lock().await;
            if guard.user.is_none() {
                return Err(anyhow!("not logged in: cannot select a conversation"));
            }
            // Detach before attach: the old selection stops matching the
            // moment this lock is released, and the generation bump orphans
            // any history fetch still in flight for it.
            guard.selected_peer = Some(peer_id);
            guard.history_generation = guard.history_generation.wrapping_add(1);
        }
        self.refresh_history(peer_id).await?;
        Ok(())
    }

    async fn clear_conversation(&self) {
        let mut guard = self.inner.lock().await;
        guard.selected_peer = None;
        guard.history_generation = guard.history_generation.wrapping_add(1);
    }

    async fn refresh_history(&self, peer_id: UserId) -> Result<Vec<MessagePayload>> {
        let (server_url, token, _user_id) = self.session().await?;
        let issued_under = { self.inner.lock().await.history_generation };

        let messages: Vec<MessagePayload> = self
            .http
            .get(format!("{server_url}/messages/{}", peer_id.0))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        {
            let guard = self.inner.lock().await;
            if guard.history_generation != issued_under {
                debug!(
                    peer_id = peer_id.0,
                    issued_under,
                    current = guard.history_generation,
                    "discarding stale history response"
                );
                return Ok(Vec::new());
            }
        }

        let _ = self.events.send(ClientEvent::HistoryLoaded {
            peer_id,
            messages: messages.clone(),
        });
        Ok(messages)
    }

    async fn send_message(
        &self,
        peer_id: UserId,
        body: SendMessageRequest,
    ) -> Result<MessagePayload> {
        let text_empty = body
            .text
            .as_deref()
            .map_or(true, |text| text.trim().is_empty());
        if text_empty && body.image.is_none() {
            return Err(anyhow!("refusing to send an empty message"));
        }

        let (server_url, token, _user_id) = self.session().await?;
        let message: MessagePayload = self
            .http
            .post(format!("{server_url}/messages/send/{}", peer_id.0))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let _ = self.events.send(ClientEvent::MessageArrived {
            message: message.clone(),
        });
        Ok(message)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<()> {
        let (server_url, token, _user_id) = self.session().await?;
        self.http
            .delete(format!("{server_url}/messages/{}", message_id.0))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?;

        // Other clients converge through the broadcast stream or their next
        // refresh; the local emit keeps this client's view in step even when
        // the server does not echo the deletion back.
        let _ = self
            .events
            .send(ClientEvent::Server(ServerEvent::MessageDeleted {
                message_id,
            }));
        Ok(())
    }

    async fn local_user(&self) -> Option<UserProfile> {
        self.inner.lock().await.user.clone()
    }

    async fn online_users(&self) -> HashSet<UserId> {
        self.inner.lock().await.online_users.clone()
    }

    async fn selected_peer(&self) -> Option<UserId> {
        self.inner.lock().await.selected_peer
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if let Some(state) = self.inner.get_mut().event_stream.take() {
            state.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
