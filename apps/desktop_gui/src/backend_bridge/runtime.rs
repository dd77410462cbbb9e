//! Backend worker thread: owns the async chat client, drains the UI command
//! queue, and pumps client events back into the UI intake channel.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use client_core::{ChatClient, ClientEvent, ClientHandle};
use crossbeam_channel::{Receiver, Sender};
use shared::protocol::{SendMessageRequest, ServerEvent, UpdateProfileRequest};
use tokio::sync::broadcast;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::media;
use crate::notify;

/// Reads a local image file and packs it as a `data:` URI for upload.
/// Non-image paths are rejected before any disk read happens.
async fn read_image_as_data_uri(path: &Path) -> Result<String, String> {
    let mime = media::image_mime_for_path(path)
        .ok_or_else(|| "Please select an image file".to_string())?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| format!("failed to read '{}': {err}", path.display()))?;
    Ok(media::encode_image_data_uri(&mime, &bytes))
}

fn spawn_event_pump(
    mut events: broadcast::Receiver<ClientEvent>,
    ui_tx: Sender<UiEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let evt = match event {
                ClientEvent::Server(server_event) => match server_event {
                    ServerEvent::NewMessage { message } => UiEvent::MessageArrived { message },
                    ServerEvent::MessageDeleted { message_id } => {
                        UiEvent::MessageDeleted { message_id }
                    }
                    ServerEvent::OnlineUsers { user_ids } => {
                        UiEvent::PresenceChanged { user_ids }
                    }
                    ServerEvent::Error(api) => UiEvent::Error(UiError::from_message(
                        UiErrorContext::General,
                        api.message,
                    )),
                },
                ClientEvent::SessionEstablished { user } => {
                    UiEvent::SessionEstablished { user }
                }
                ClientEvent::SessionClosed => UiEvent::SessionClosed,
                ClientEvent::ProfileUpdated { user } => UiEvent::ProfileUpdated { user },
                ClientEvent::ContactsLoaded { contacts } => {
                    UiEvent::ContactsLoaded { contacts }
                }
                ClientEvent::HistoryLoaded { peer_id, messages } => {
                    UiEvent::HistoryLoaded { peer_id, messages }
                }
                ClientEvent::MessageArrived { message } => UiEvent::MessageArrived { message },
                ClientEvent::Error(err) => {
                    UiEvent::Error(UiError::from_message(UiErrorContext::General, err))
                }
            };
            let _ = ui_tx.try_send(evt);
        }
    })
}

pub fn spawn_backend_thread(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client: Arc<ChatClient> = ChatClient::new();
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            let mut event_task: Option<tokio::task::JoinHandle<()>> = None;
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Login {
                        server_url,
                        email,
                        password,
                    } => {
                        if let Some(task) = event_task.take() {
                            task.abort();
                        }

                        // Subscribe before logging in so the session events
                        // broadcast during login land in the pump's buffer.
                        let events = client.subscribe_events();
                        event_task = Some(spawn_event_pump(events, ui_tx.clone()));

                        if let Err(err) = client.login(&server_url, &email, &password).await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::Login,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::Logout => {
                        if let Err(err) = client.logout().await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::General,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::UpdateProfile {
                        full_name,
                        avatar_path,
                    } => {
                        let profile_pic = if let Some(path) = avatar_path {
                            match read_image_as_data_uri(&path).await {
                                Ok(data_uri) => Some(data_uri),
                                Err(err) => {
                                    let _ = ui_tx.try_send(UiEvent::Error(
                                        UiError::from_message(UiErrorContext::Profile, err),
                                    ));
                                    continue;
                                }
                            }
                        } else {
                            None
                        };

                        let update = UpdateProfileRequest {
                            full_name,
                            profile_pic,
                        };
                        if let Err(err) = client.update_profile(update).await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::Profile,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::ListContacts => {
                        if let Err(err) = client.list_contacts().await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::General,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::SelectConversation { peer_id } => {
                        if let Err(err) = client.select_conversation(peer_id).await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::General,
                                err.to_string(),
                            )));
                        }
                    }
                    BackendCommand::ClearConversation => {
                        client.clear_conversation().await;
                    }
                    BackendCommand::SendMessage {
                        peer_id,
                        text,
                        attachment_path,
                    } => {
                        let image = if let Some(path) = attachment_path {
                            match read_image_as_data_uri(&path).await {
                                Ok(data_uri) => Some(data_uri),
                                Err(err) => {
                                    let _ = ui_tx.try_send(UiEvent::Error(
                                        UiError::from_message(UiErrorContext::SendMessage, err),
                                    ));
                                    continue;
                                }
                            }
                        } else {
                            None
                        };

                        let trimmed = text.trim();
                        let body = SendMessageRequest {
                            text: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                            image,
                        };
                        match client.send_message(peer_id, body).await {
                            Ok(message) => {
                                let _ = ui_tx.try_send(UiEvent::MessageSent { message });
                            }
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::SendMessage,
                                    err.to_string(),
                                )));
                            }
                        }
                    }
                    BackendCommand::DeleteMessage { message_id } => {
                        match client.delete_message(message_id).await {
                            Ok(()) => {
                                let _ = ui_tx
                                    .try_send(UiEvent::MessageDeleteConfirmed { message_id });
                            }
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::DeleteMessage,
                                    err.to_string(),
                                )));
                            }
                        }
                    }
                    BackendCommand::LoadAttachmentPreview { path } => {
                        let outcome = match tokio::fs::read(&path).await {
                            Ok(bytes) => media::decode_preview_image(&bytes).map(|image| {
                                UiEvent::AttachmentPreviewReady {
                                    path: path.clone(),
                                    image,
                                    size_bytes: bytes.len() as u64,
                                }
                            }),
                            Err(err) => Err(err.to_string()),
                        };
                        let event = outcome.unwrap_or_else(|reason| {
                            UiEvent::AttachmentPreviewFailed { path, reason }
                        });
                        let _ = ui_tx.try_send(event);
                    }
                    BackendCommand::PlayMessageChime => {
                        let ui_tx = ui_tx.clone();
                        tokio::task::spawn_blocking(move || {
                            if let Err(err) = notify::play_chime_blocking() {
                                tracing::warn!("message chime failed: {err}");
                                let _ = ui_tx.try_send(UiEvent::Info(format!(
                                    "Notification sound unavailable: {err}"
                                )));
                            }
                        });
                    }
                }
            }

            if let Some(task) = event_task.take() {
                task.abort();
            }
        });
    });
}
