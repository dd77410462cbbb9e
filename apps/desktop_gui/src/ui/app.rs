//! Application shell: owns every piece of per-window UI state, drains the
//! backend event channel once per frame, and routes between the login and
//! main views.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

use crossbeam_channel::{Receiver, Sender};
use shared::{
    domain::{MessageId, UserId},
    protocol::{MessagePayload, UserProfile},
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{
    classify_login_failure, err_label, StatusBanner, UiError, UiErrorContext, UiEvent,
};
use crate::controller::orchestration::dispatch_backend_command;
use crate::controller::projection::{self, LoginFieldErrors, LoginFocusField};
use crate::media;
use crate::ui::theme::{
    scaled_text_styles, visuals_for_theme, PersistedDesktopSettings, ThemeSettings,
    UiReadabilitySettings,
};

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub server_url: String,
    pub email: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5001".to_string(),
            email: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    Login,
    Main,
}

#[derive(Debug, Clone)]
pub(crate) struct LoginUiState {
    pub(crate) focus: Option<LoginFocusField>,
    pub(crate) attempted_auto_focus: bool,
}

impl Default for LoginUiState {
    fn default() -> Self {
        Self {
            focus: Some(LoginFocusField::Email),
            attempted_auto_focus: false,
        }
    }
}

/// Composer attachment preview as it moves through the backend decode.
pub(crate) enum AttachmentPreviewLoad {
    Loading,
    Ready {
        image: media::PreviewImage,
        size_bytes: u64,
        /// Created lazily on the first frame that renders the preview.
        texture: Option<egui::TextureHandle>,
    },
    Unavailable(String),
}

pub struct DesktopApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view_state: AppViewState,

    // Login form.
    pub(crate) server_url: String,
    pub(crate) login_email: String,
    pub(crate) login_password: String,
    pub(crate) show_password: bool,
    pub(crate) login_busy: bool,
    pub(crate) login_field_errors: LoginFieldErrors,
    pub(crate) login_ui: LoginUiState,

    // Session.
    pub(crate) local_user: Option<UserProfile>,
    pub(crate) contacts: Vec<UserProfile>,
    pub(crate) contacts_loading: bool,
    pub(crate) online_users: HashSet<UserId>,
    pub(crate) show_online_only: bool,

    // Selected conversation.
    pub(crate) selected_peer: Option<UserId>,
    pub(crate) messages: Vec<MessagePayload>,
    pub(crate) message_ids: HashSet<MessageId>,
    pub(crate) hidden_messages: HashSet<MessageId>,
    pub(crate) history_loading: bool,
    pub(crate) hovered_message: Option<MessageId>,
    pub(crate) expanded_image: Option<MessageId>,
    pub(crate) avatar_expanded: Option<UserId>,

    // Composer.
    pub(crate) composer_text: String,
    pub(crate) pending_attachment: Option<PathBuf>,
    pub(crate) attachment_preview: Option<(PathBuf, AttachmentPreviewLoad)>,
    pub(crate) sending: bool,
    pub(crate) composer_panel_height: f32,

    // Windows and menus.
    pub(crate) profile_open: bool,
    pub(crate) profile_name_editing: bool,
    pub(crate) profile_name_draft: String,
    pub(crate) profile_pic_uploading: bool,
    pub(crate) settings_open: bool,
    pub(crate) account_menu_open: bool,
    pub(crate) account_menu_anchor: Option<egui::Pos2>,
    /// Set on the frame the toggle opens the menu, so the opening click is
    /// not treated as an outside click.
    pub(crate) suppress_account_menu_close: bool,
    pub(crate) compact_menu_open: bool,
    pub(crate) compact_menu_anchor: Option<egui::Pos2>,
    pub(crate) logout_confirm: bool,

    // Appearance and notifications.
    pub(crate) theme: ThemeSettings,
    applied_theme: Option<ThemeSettings>,
    pub(crate) readability: UiReadabilitySettings,
    applied_readability: Option<UiReadabilitySettings>,
    pub(crate) sound_notifications: bool,
    has_interacted: bool,

    // Status surface.
    pub(crate) status: String,
    pub(crate) status_banner: Option<StatusBanner>,

    // Decoded-image caches, keyed by the id they render. `None` marks a
    // decode that already failed so it is not retried every frame.
    pub(crate) avatar_textures: HashMap<UserId, Option<egui::TextureHandle>>,
    pub(crate) message_textures: HashMap<MessageId, Option<egui::TextureHandle>>,
}

impl DesktopApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        persisted_settings: Option<PersistedDesktopSettings>,
        startup: StartupConfig,
    ) -> Self {
        let (theme, readability, sound_notifications, composer_panel_height) =
            persisted_settings.unwrap_or_default().into_runtime();
        Self {
            cmd_tx,
            ui_rx,
            view_state: AppViewState::Login,
            server_url: startup.server_url,
            login_email: startup.email,
            login_password: String::new(),
            show_password: false,
            login_busy: false,
            login_field_errors: LoginFieldErrors::default(),
            login_ui: LoginUiState::default(),
            local_user: None,
            contacts: Vec::new(),
            contacts_loading: false,
            online_users: HashSet::new(),
            show_online_only: false,
            selected_peer: None,
            messages: Vec::new(),
            message_ids: HashSet::new(),
            hidden_messages: HashSet::new(),
            history_loading: false,
            hovered_message: None,
            expanded_image: None,
            avatar_expanded: None,
            composer_text: String::new(),
            pending_attachment: None,
            attachment_preview: None,
            sending: false,
            composer_panel_height,
            profile_open: false,
            profile_name_editing: false,
            profile_name_draft: String::new(),
            profile_pic_uploading: false,
            settings_open: false,
            account_menu_open: false,
            account_menu_anchor: None,
            suppress_account_menu_close: false,
            compact_menu_open: false,
            compact_menu_anchor: None,
            logout_confirm: false,
            theme,
            applied_theme: None,
            readability,
            applied_readability: None,
            sound_notifications,
            has_interacted: false,
            status: "Not signed in".to_string(),
            status_banner: None,
            avatar_textures: HashMap::new(),
            message_textures: HashMap::new(),
        }
    }

    pub(crate) fn queue(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    pub(crate) fn selected_contact(&self) -> Option<&UserProfile> {
        let peer_id = self.selected_peer?;
        self.contacts
            .iter()
            .find(|contact| contact.user_id == peer_id)
    }

    /// Cached avatar texture for a user, decoding the profile picture data
    /// URI on first use.
    pub(crate) fn avatar_texture_for(
        &mut self,
        ctx: &egui::Context,
        user_id: UserId,
        profile_pic: Option<&str>,
    ) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.avatar_textures.get(&user_id) {
            return cached.clone();
        }
        let texture = profile_pic
            .and_then(|data_uri| media::decode_data_uri(data_uri).ok())
            .and_then(|(_, bytes)| media::decode_preview_image(&bytes).ok())
            .map(|preview| {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [preview.width, preview.height],
                    &preview.rgba,
                );
                ctx.load_texture(
                    format!("avatar:{}", user_id.0),
                    image,
                    egui::TextureOptions::LINEAR,
                )
            });
        self.avatar_textures.insert(user_id, texture.clone());
        texture
    }

    pub(crate) fn message_texture_for(
        &mut self,
        ctx: &egui::Context,
        message_id: MessageId,
    ) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.message_textures.get(&message_id) {
            return cached.clone();
        }
        let data_uri = self
            .messages
            .iter()
            .find(|message| message.message_id == message_id)
            .and_then(|message| message.image.clone());
        let texture = data_uri
            .and_then(|uri| media::decode_data_uri(&uri).ok())
            .and_then(|(_, bytes)| media::decode_preview_image(&bytes).ok())
            .map(|preview| {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [preview.width, preview.height],
                    &preview.rgba,
                );
                ctx.load_texture(
                    format!("message-image:{}", message_id.0),
                    image,
                    egui::TextureOptions::LINEAR,
                )
            });
        self.message_textures.insert(message_id, texture.clone());
        texture
    }

    fn reset_conversation_state(&mut self) {
        self.selected_peer = None;
        self.messages.clear();
        self.message_ids.clear();
        self.hidden_messages.clear();
        self.message_textures.clear();
        self.history_loading = false;
        self.hovered_message = None;
        self.expanded_image = None;
        self.avatar_expanded = None;
        self.composer_text.clear();
        self.pending_attachment = None;
        self.attachment_preview = None;
        self.sending = false;
    }

    pub(crate) fn close_menus(&mut self) {
        self.account_menu_open = false;
        self.compact_menu_open = false;
        self.logout_confirm = false;
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::SessionEstablished { user } => {
                    self.view_state = AppViewState::Main;
                    self.status = format!("Signed in as {}", user.full_name);
                    self.status_banner = None;
                    self.login_busy = false;
                    self.login_password.clear();
                    self.login_field_errors = LoginFieldErrors::default();
                    self.local_user = Some(user);
                    self.contacts.clear();
                    self.online_users.clear();
                    self.avatar_textures.clear();
                    self.reset_conversation_state();
                    self.close_menus();
                    self.contacts_loading = true;
                    self.queue(BackendCommand::ListContacts);
                }
                UiEvent::SessionClosed => {
                    self.view_state = AppViewState::Login;
                    self.status = "Signed out".to_string();
                    self.local_user = None;
                    self.contacts.clear();
                    self.contacts_loading = false;
                    self.online_users.clear();
                    self.avatar_textures.clear();
                    self.reset_conversation_state();
                    self.close_menus();
                    self.profile_open = false;
                    self.profile_name_editing = false;
                    self.profile_pic_uploading = false;
                    self.login_ui = LoginUiState::default();
                }
                UiEvent::ProfileUpdated { user } => {
                    self.avatar_textures.remove(&user.user_id);
                    self.profile_pic_uploading = false;
                    self.status = "Profile updated".to_string();
                    self.status_banner = Some(StatusBanner::success("Profile updated"));
                    self.local_user = Some(user);
                }
                UiEvent::ContactsLoaded { contacts } => {
                    self.contacts_loading = false;
                    self.avatar_textures.clear();
                    self.contacts = contacts;
                }
                UiEvent::HistoryLoaded { peer_id, messages } => {
                    // A response for anything but the current selection is
                    // stale and must not overwrite the new conversation.
                    if self.selected_peer != Some(peer_id) {
                        continue;
                    }
                    self.history_loading = false;
                    self.message_ids = messages.iter().map(|m| m.message_id).collect();
                    self.messages = messages;
                    self.message_textures.clear();
                }
                UiEvent::MessageArrived { message } => {
                    self.apply_arrived_message(message);
                }
                UiEvent::MessageSent { message } => {
                    self.sending = false;
                    self.composer_text.clear();
                    self.pending_attachment = None;
                    self.attachment_preview = None;
                    self.status = "Message sent".to_string();
                    self.apply_arrived_message(message);
                }
                UiEvent::MessageDeleted { message_id } => {
                    self.messages
                        .retain(|message| message.message_id != message_id);
                    self.message_ids.remove(&message_id);
                    self.message_textures.remove(&message_id);
                    self.hidden_messages.remove(&message_id);
                    if self.expanded_image == Some(message_id) {
                        self.expanded_image = None;
                    }
                }
                UiEvent::MessageDeleteConfirmed { message_id } => {
                    self.hidden_messages.insert(message_id);
                    if self.expanded_image == Some(message_id) {
                        self.expanded_image = None;
                    }
                    self.status = "Message deleted".to_string();
                    self.status_banner = Some(StatusBanner::success("Message deleted"));
                }
                UiEvent::PresenceChanged { user_ids } => {
                    self.online_users = user_ids.into_iter().collect();
                }
                UiEvent::AttachmentPreviewReady {
                    path,
                    image,
                    size_bytes,
                } => {
                    if self.pending_attachment.as_ref() == Some(&path) {
                        self.attachment_preview = Some((
                            path,
                            AttachmentPreviewLoad::Ready {
                                image,
                                size_bytes,
                                texture: None,
                            },
                        ));
                    }
                }
                UiEvent::AttachmentPreviewFailed { path, reason } => {
                    if self.pending_attachment.as_ref() == Some(&path) {
                        self.attachment_preview =
                            Some((path, AttachmentPreviewLoad::Unavailable(reason)));
                    }
                }
                UiEvent::Error(err) => {
                    self.apply_error(err);
                }
            }
        }
    }

    /// Insert a message into the selected conversation, deduplicating by id.
    /// Live events and the local send echo both land here.
    fn apply_arrived_message(&mut self, message: MessagePayload) {
        let Some(local_id) = self.local_user.as_ref().map(|user| user.user_id) else {
            return;
        };
        let Some(peer_id) = self.selected_peer else {
            return;
        };
        if !message.is_between(local_id, peer_id) {
            return;
        }
        if !self.message_ids.insert(message.message_id) {
            return;
        }
        let chime = projection::should_play_notification(
            &message,
            local_id,
            self.sound_notifications,
            self.has_interacted,
        );
        self.messages.push(message);
        self.messages.sort_by_key(|m| m.message_id.0);
        if chime {
            self.queue(BackendCommand::PlayMessageChime);
        }
    }

    fn apply_error(&mut self, err: UiError) {
        // Roll back the in-flight flag for the action that failed; drafts
        // stay untouched so the user can retry.
        match err.context() {
            UiErrorContext::Login => self.login_busy = false,
            UiErrorContext::SendMessage => self.sending = false,
            UiErrorContext::Profile => self.profile_pic_uploading = false,
            _ => {}
        }

        // A 401 on the login form is a rejected credential, not an expired
        // session; only established sessions drop back to the login view.
        if err.requires_reauth() && err.context() != UiErrorContext::Login {
            self.view_state = AppViewState::Login;
            self.local_user = None;
            self.contacts.clear();
            self.contacts_loading = false;
            self.online_users.clear();
            self.reset_conversation_state();
            self.close_menus();
            self.profile_open = false;
            self.settings_open = false;
            self.status = format!("Authentication error: {}", err.message());
            self.status_banner = Some(StatusBanner::error(
                "Session expired or invalid credentials. Please sign in again.",
            ));
            self.login_ui = LoginUiState::default();
            return;
        }

        self.status = if err.context() == UiErrorContext::Login {
            classify_login_failure(err.message())
        } else {
            format!("{} error: {}", err_label(err.category()), err.message())
        };
        if matches!(
            err.context(),
            UiErrorContext::Login
                | UiErrorContext::SendMessage
                | UiErrorContext::DeleteMessage
                | UiErrorContext::Profile
                | UiErrorContext::BackendStartup
        ) {
            self.status_banner = Some(StatusBanner::error(self.status.clone()));
        }
    }

    fn apply_theme_if_needed(&mut self, ctx: &egui::Context) {
        if self.applied_theme != Some(self.theme) {
            ctx.set_visuals(visuals_for_theme(self.theme));
            self.applied_theme = Some(self.theme);
        }
        if self.applied_readability != Some(self.readability) {
            let mut style = (*ctx.style()).clone();
            style.text_styles = scaled_text_styles(self.readability.text_scale);
            ctx.set_style(style);
            self.applied_readability = Some(self.readability);
        }
    }

    /// Notification playback is gated behind the first click or key press
    /// of the session.
    fn note_user_interaction(&mut self, ctx: &egui::Context) {
        if self.has_interacted {
            return;
        }
        let interacted = ctx.input(|input| {
            input.pointer.any_pressed()
                || input
                    .events
                    .iter()
                    .any(|event| matches!(event, egui::Event::Key { pressed: true, .. }))
        });
        if interacted {
            self.has_interacted = true;
        }
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.apply_theme_if_needed(ctx);
        self.note_user_interaction(ctx);

        match self.view_state {
            AppViewState::Login => self.show_login_screen(ctx),
            AppViewState::Main => {
                self.show_top_bar(ctx);
                self.show_contacts_panel(ctx);
                self.show_chat_header(ctx);
                self.show_composer_panel(ctx);
                self.show_message_panel(ctx);
                self.show_account_menu(ctx);
                self.show_compact_menu(ctx);
                self.show_profile_window(ctx);
                self.show_settings_window(ctx);
                self.show_expanded_image_overlay(ctx);
                self.show_avatar_overlay(ctx);
            }
        }

        // Live events arrive on a channel, not through egui input, so poll
        // at a steady cadence even when the window is idle.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDesktopSettings::from_runtime(
            self.theme,
            self.readability,
            self.sound_notifications,
            self.composer_panel_height,
        );
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(crate::ui::theme::SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
