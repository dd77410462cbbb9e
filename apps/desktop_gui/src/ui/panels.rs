//! Screen-level panels: login card, conversation header, message list,
//! composer, and the profile/settings windows.

use std::fs;

use chrono::{DateTime, Utc};
use shared::domain::{DeliveryStatus, MessageId};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::StatusBanner;
use crate::controller::projection::{self, LoginFocusField};
use crate::media;
use crate::ui::app::{AttachmentPreviewLoad, DesktopApp};
use crate::ui::theme::{
    chat_palette, ThemePreset, ThemeSettings, UiReadabilitySettings, MAX_COMPOSER_PANEL_HEIGHT,
    MIN_COMPOSER_PANEL_HEIGHT,
};
use crate::ui::widgets;

fn lighten_color(c: egui::Color32, t: f32) -> egui::Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |channel: u8| -> u8 {
        let channel = channel as f32;
        (channel + (255.0 - channel) * t).round().clamp(0.0, 255.0) as u8
    };
    egui::Color32::from_rgba_unmultiplied(mix(c.r()), mix(c.g()), mix(c.b()), c.a())
}

fn default_image_dir() -> Option<std::path::PathBuf> {
    dirs::picture_dir()
        .or_else(dirs::download_dir)
        .or_else(dirs::desktop_dir)
        .or_else(dirs::home_dir)
}

/// Per-frame snapshot of one message row, detached from `self.messages`
/// so rendering can borrow the app mutably.
struct MessageRow {
    message_id: MessageId,
    own: bool,
    text: Option<String>,
    has_image: bool,
    status: DeliveryStatus,
    created_at: DateTime<Utc>,
    highlight: bool,
}

impl DesktopApp {
    // ---------- Login ----------

    pub(crate) fn show_login_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            let two_column = avail.x >= 900.0;
            let card_width = if two_column {
                440.0
            } else {
                avail.x.clamp(360.0, 520.0)
            };
            let top_space = (avail.y * 0.12).clamp(18.0, 90.0);

            ui.add_space(top_space);

            if two_column {
                let side_width = 360.0;
                let content_width = card_width + side_width + 40.0;
                let left_pad = ((avail.x - content_width) * 0.5).max(0.0);
                ui.horizontal_top(|ui| {
                    ui.add_space(left_pad);
                    ui.vertical(|ui| {
                        ui.set_width(card_width);
                        self.render_login_card(ctx, ui);
                    });
                    ui.add_space(40.0);
                    ui.vertical(|ui| {
                        ui.set_width(side_width);
                        self.render_login_side_panel(ui);
                    });
                });
            } else {
                ui.vertical_centered(|ui| {
                    ui.set_width(card_width);
                    self.render_login_card(ctx, ui);
                });
            }

            ui.add_space((avail.y * 0.08).clamp(12.0, 60.0));
        });
    }

    fn render_login_card(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let card_fill = lighten_color(ui.visuals().panel_fill, 0.02);

        egui::Frame::none()
            .fill(card_fill)
            .rounding(14.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::symmetric(20.0, 18.0))
            .show(ui, |ui| {
                ui.style_mut().spacing.item_spacing = egui::vec2(10.0, 10.0);

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("💬").size(24.0));
                    ui.vertical(|ui| {
                        ui.heading("Welcome Back");
                        ui.weak("Sign in to your account");
                    });
                });

                ui.add_space(8.0);
                self.show_status_banner(ui);

                let mut focus_to_set = None;
                if !self.login_ui.attempted_auto_focus {
                    self.login_ui.attempted_auto_focus = true;
                    focus_to_set = self.login_ui.focus;
                } else if self.login_ui.focus.is_some() {
                    focus_to_set = self.login_ui.focus;
                    self.login_ui.focus = None;
                }

                egui::Frame::none()
                    .fill(ui.visuals().faint_bg_color.gamma_multiply(0.55))
                    .rounding(12.0)
                    .inner_margin(egui::Margin::symmetric(14.0, 12.0))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new("Account")
                                .strong()
                                .size(20.0 * self.readability.text_scale),
                        );
                        ui.add_space(6.0);

                        let mut server_url_buf = self.server_url.clone();
                        let mut email_buf = self.login_email.clone();
                        let mut password_buf = self.login_password.clone();

                        ui.label(egui::RichText::new("Server URL").strong());
                        let server_resp = ui.add_sized(
                            [ui.available_width(), 34.0],
                            egui::TextEdit::singleline(&mut server_url_buf)
                                .id_salt("login_server_url")
                                .hint_text("http://127.0.0.1:5001"),
                        );

                        ui.add_space(6.0);

                        ui.label(egui::RichText::new("Email").strong());
                        let email_resp = ui.add_sized(
                            [ui.available_width(), 34.0],
                            egui::TextEdit::singleline(&mut email_buf)
                                .id_salt("login_email")
                                .hint_text("you@example.com"),
                        );
                        if focus_to_set == Some(LoginFocusField::Email) {
                            email_resp.request_focus();
                        }
                        if let Some(error) = self.login_field_errors.email {
                            ui.small(
                                egui::RichText::new(error)
                                    .color(egui::Color32::from_rgb(220, 90, 90)),
                            );
                        }

                        ui.add_space(6.0);

                        ui.label(egui::RichText::new("Password").strong());
                        let password_resp = ui
                            .horizontal(|ui| {
                                let eye_width = 34.0;
                                let resp = ui.add_sized(
                                    [ui.available_width() - eye_width - 6.0, 34.0],
                                    egui::TextEdit::singleline(&mut password_buf)
                                        .id_salt("login_password")
                                        .password(!self.show_password)
                                        .hint_text("••••••"),
                                );
                                let eye = if self.show_password { "🙈" } else { "👁" };
                                if ui
                                    .add_sized([eye_width, 34.0], egui::Button::new(eye))
                                    .on_hover_text("Show or hide password")
                                    .clicked()
                                {
                                    self.show_password = !self.show_password;
                                }
                                resp
                            })
                            .inner;
                        if focus_to_set == Some(LoginFocusField::Password) {
                            password_resp.request_focus();
                        }
                        if let Some(error) = self.login_field_errors.password {
                            ui.small(
                                egui::RichText::new(error)
                                    .color(egui::Color32::from_rgb(220, 90, 90)),
                            );
                        }

                        self.server_url = server_url_buf;
                        self.login_email = email_buf;
                        self.login_password = password_buf;

                        let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                        let can_submit = email_resp.has_focus()
                            || password_resp.has_focus()
                            || server_resp.has_focus();
                        if can_submit && enter_pressed {
                            self.try_login();
                        }
                    });

                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    let btn = egui::Button::new(
                        egui::RichText::new(if self.login_busy {
                            "Signing in..."
                        } else {
                            "Sign in"
                        })
                        .strong()
                        .size(16.0),
                    )
                    .fill(self.theme.accent_color)
                    .min_size(egui::vec2(ui.available_width(), 40.0));

                    if ui.add_enabled(!self.login_busy, btn).clicked() {
                        self.try_login();
                    }
                });

                ui.add_space(10.0);
                ui.separator();
                ui.add_space(6.0);

                ui.horizontal_wrapped(|ui| {
                    ui.small("Status:");
                    ui.small(egui::RichText::new(&self.status).weak());
                });
            });
    }

    fn render_login_side_panel(&mut self, ui: &mut egui::Ui) {
        let palette = chat_palette(self.theme.preset);
        egui::Frame::none()
            .fill(palette.panel_background)
            .rounding(14.0)
            .inner_margin(egui::Margin::same(24.0))
            .show(ui, |ui| {
                let tile = 64.0;
                let icons: [(usize, &str); 4] = [(3, "💬"), (7, "👥"), (12, "🖼"), (15, "❤")];
                // Even tiles pulse on a staggered phase; the app-level
                // repaint cadence keeps the animation ticking.
                let time = ui.input(|input| input.time);

                egui::Grid::new("login_pattern_grid")
                    .spacing([10.0, 10.0])
                    .show(ui, |ui| {
                        for row in 0..4usize {
                            for col in 0..4usize {
                                let index = row * 4 + col;
                                let (rect, _) = ui.allocate_exact_size(
                                    egui::vec2(tile, tile),
                                    egui::Sense::hover(),
                                );
                                let opacity = if index % 2 == 0 {
                                    let phase = index as f64 * 0.4;
                                    0.14 + 0.14
                                        * ((time * 2.0 + phase).sin() * 0.5 + 0.5) as f32
                                } else {
                                    0.12
                                };
                                let fill = self.theme.accent_color.gamma_multiply(opacity);
                                ui.painter()
                                    .rect_filled(rect, egui::Rounding::same(16.0), fill);
                                if let Some((_, icon)) =
                                    icons.iter().find(|(slot, _)| *slot == index)
                                {
                                    ui.painter().text(
                                        rect.center(),
                                        egui::Align2::CENTER_CENTER,
                                        *icon,
                                        egui::FontId::proportional(26.0),
                                        ui.visuals().strong_text_color(),
                                    );
                                }
                            }
                            ui.end_row();
                        }
                    });

                ui.add_space(14.0);
                ui.heading("Welcome back!");
                ui.label(
                    egui::RichText::new(
                        "Sign in to continue your conversations and catch up with your messages.",
                    )
                    .weak(),
                );
            });
    }

    pub(crate) fn try_login(&mut self) {
        let errors = projection::validate_login(&self.login_email, &self.login_password);
        self.login_field_errors = errors;
        if !errors.is_clean() {
            self.login_ui.focus = projection::login_focus_for(&errors);
            self.status = "Please fix the errors in the form".to_string();
            self.status_banner = Some(StatusBanner::error("Please fix the errors in the form"));
            return;
        }

        let server_url = self.server_url.trim().to_string();
        if server_url.is_empty() {
            self.status = "Server URL is required".to_string();
            self.status_banner = Some(StatusBanner::error("Please enter a server URL."));
            self.login_field_errors = Default::default();
            return;
        }

        self.login_busy = true;
        self.status = "Signing in...".to_string();
        self.status_banner = None;
        self.queue(BackendCommand::Login {
            server_url,
            email: self.login_email.trim().to_string(),
            password: self.login_password.clone(),
        });
    }

    // ---------- Conversation header ----------

    pub(crate) fn show_chat_header(&mut self, ctx: &egui::Context) {
        let Some(peer) = self.selected_contact().cloned() else {
            return;
        };
        let palette = chat_palette(self.theme.preset);
        let online = self.online_users.contains(&peer.user_id);

        egui::TopBottomPanel::top("chat_header")
            .frame(
                egui::Frame::none()
                    .fill(palette.panel_background)
                    .inner_margin(egui::Margin::symmetric(10.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let texture =
                        self.avatar_texture_for(ui.ctx(), peer.user_id, peer.profile_pic.as_deref());
                    let avatar = widgets::avatar_circle(
                        ui,
                        texture.as_ref(),
                        &peer.full_name,
                        36.0,
                        self.theme.accent_color.gamma_multiply(0.8),
                    );
                    if avatar.clicked() && texture.is_some() {
                        self.avatar_expanded = Some(peer.user_id);
                    }

                    ui.add_space(4.0);
                    ui.vertical(|ui| {
                        ui.horizontal(|ui| {
                            ui.strong(&peer.full_name);
                            widgets::presence_dot(ui, online);
                        });
                        let presence_text = if online {
                            "Online".to_string()
                        } else if let Some(last_logout) = peer.last_logout {
                            format!(
                                "Last seen {}",
                                widgets::relative_time_since(last_logout, Utc::now())
                            )
                        } else {
                            "Offline".to_string()
                        };
                        ui.small(egui::RichText::new(presence_text).weak());
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button("✕")
                            .on_hover_text("Close conversation")
                            .clicked()
                        {
                            self.clear_selected_conversation();
                        }
                    });
                });
            });
    }

    // ---------- Message list ----------

    pub(crate) fn show_message_panel(&mut self, ctx: &egui::Context) {
        let palette = chat_palette(self.theme.preset);

        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(palette.app_background)
                    .inner_margin(egui::Margin::symmetric(10.0, 8.0)),
            )
            .show(ctx, |ui| {
                if self.selected_peer.is_none() {
                    ui.allocate_ui_with_layout(
                        ui.available_size(),
                        egui::Layout::centered_and_justified(egui::Direction::TopDown),
                        |ui| {
                            ui.vertical_centered(|ui| {
                                ui.label(egui::RichText::new("💬").size(48.0));
                                ui.heading("Welcome to Banter!");
                                ui.weak(
                                    "Select a conversation from the sidebar to start chatting",
                                );
                            });
                        },
                    );
                    return;
                }

                if self.history_loading && self.messages.is_empty() {
                    ui.allocate_ui_with_layout(
                        ui.available_size(),
                        egui::Layout::centered_and_justified(egui::Direction::TopDown),
                        |ui| {
                            ui.spinner();
                        },
                    );
                    return;
                }

                let rows = self.build_message_rows();
                let mut hovered_message = None;

                egui::ScrollArea::vertical()
                    .id_salt("message_scroll")
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if rows.is_empty() {
                            ui.add_space(16.0);
                            ui.vertical_centered(|ui| {
                                ui.weak("No messages yet. Say hello!");
                            });
                            return;
                        }

                        for row in &rows {
                            self.render_message_row(ui, row, &mut hovered_message);
                            ui.add_space(if self.readability.compact_density {
                                4.0
                            } else {
                                6.0
                            });
                        }
                    });

                self.hovered_message = hovered_message;
            });
    }

    fn build_message_rows(&self) -> Vec<MessageRow> {
        let local_id = self.local_user.as_ref().map(|user| user.user_id);
        let visible = projection::visible_messages(&self.messages, &self.hidden_messages);

        let latest_incoming = visible
            .iter()
            .rev()
            .find(|message| Some(message.sender_id) != local_id)
            .map(|message| message.message_id);

        visible
            .into_iter()
            .map(|message| MessageRow {
                message_id: message.message_id,
                own: Some(message.sender_id) == local_id,
                text: message.text.clone(),
                has_image: message.image.is_some(),
                status: message.status,
                created_at: message.created_at,
                highlight: local_id.is_some()
                    && Some(message.message_id) == latest_incoming
                    && Some(message.sender_id) != local_id,
            })
            .collect()
    }

    fn render_message_row(
        &mut self,
        ui: &mut egui::Ui,
        row: &MessageRow,
        hovered_message: &mut Option<MessageId>,
    ) {
        let palette = chat_palette(self.theme.preset);
        let peer = self.selected_contact().cloned();

        ui.horizontal(|ui| {
            if row.own {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                    self.render_bubble(ui, row, hovered_message);
                });
            } else {
                if let Some(peer) = &peer {
                    let texture = self.avatar_texture_for(
                        ui.ctx(),
                        peer.user_id,
                        peer.profile_pic.as_deref(),
                    );
                    let avatar = widgets::avatar_circle(
                        ui,
                        texture.as_ref(),
                        &peer.full_name,
                        24.0,
                        palette.accent.gamma_multiply(0.8),
                    );
                    if avatar.clicked() && texture.is_some() {
                        self.avatar_expanded = Some(peer.user_id);
                    }
                    ui.add_space(4.0);
                }
                self.render_bubble(ui, row, hovered_message);
            }
        });
    }

    fn render_bubble(
        &mut self,
        ui: &mut egui::Ui,
        row: &MessageRow,
        hovered_message: &mut Option<MessageId>,
    ) {
        let palette = chat_palette(self.theme.preset);
        let message_margin = if self.readability.compact_density {
            egui::Margin::symmetric(8.0, 6.0)
        } else {
            egui::Margin::symmetric(10.0, 8.0)
        };

        let (base_fill, text_color) = if row.own {
            (palette.bubble_local, palette.bubble_local_text)
        } else {
            (palette.bubble_remote, palette.bubble_remote_text)
        };
        let fill = if self.hovered_message == Some(row.message_id) {
            lighten_color(base_fill, 0.08)
        } else {
            base_fill
        };

        let frame = if self.readability.message_bubble_backgrounds {
            egui::Frame::none().fill(fill)
        } else {
            egui::Frame::none()
        };
        let frame = if row.highlight {
            frame.stroke(egui::Stroke::new(1.5, self.theme.accent_color))
        } else {
            frame
        };

        let max_bubble_width = ui.available_width() * 0.72;
        let response = frame
            .rounding(egui::Rounding::same(f32::from(self.theme.panel_rounding)))
            .inner_margin(message_margin)
            .show(ui, |ui| {
                ui.set_max_width(max_bubble_width);
                if self.readability.message_bubble_backgrounds {
                    ui.visuals_mut().override_text_color = Some(text_color);
                }

                if row.has_image {
                    match self.message_texture_for(ui.ctx(), row.message_id) {
                        Some(texture) => {
                            let mut size = texture.size_vec2();
                            let max_edge = 260.0;
                            let scale =
                                (max_edge / size.x).min(max_edge / size.y).min(1.0);
                            size *= scale;
                            let image = ui.add(
                                egui::Image::new(&texture)
                                    .fit_to_exact_size(size)
                                    .rounding(egui::Rounding::same(6.0))
                                    .sense(egui::Sense::click()),
                            );
                            if image.clicked() {
                                self.expanded_image = Some(row.message_id);
                            }
                        }
                        None => {
                            ui.label("🖼 Image unavailable");
                        }
                    }
                }

                if let Some(text) = &row.text {
                    ui.label(text);
                }

                ui.horizontal(|ui| {
                    if self.readability.show_timestamps {
                        ui.small(
                            egui::RichText::new(widgets::format_message_time(row.created_at))
                                .weak(),
                        );
                    }
                    if row.own {
                        let (ticks, color) = widgets::delivery_ticks(
                            row.status,
                            self.theme.accent_color,
                            ui.visuals().weak_text_color(),
                        );
                        ui.small(egui::RichText::new(ticks).color(color));
                    }
                });
            })
            .response;

        if response.hovered() {
            *hovered_message = Some(row.message_id);
        }

        let response = response.interact(egui::Sense::click());
        response.context_menu(|ui| {
            ui.set_min_width(160.0);
            if row.has_image {
                if ui.button("Download Image").clicked() {
                    self.save_message_image(row.message_id);
                    ui.close_menu();
                }
                if ui.button("Copy Image").clicked() {
                    self.copy_message_image(row.message_id);
                    ui.close_menu();
                }
            }
            if let Some(text) = &row.text {
                if ui.button("Copy Text").clicked() {
                    ui.ctx().copy_text(text.clone());
                    self.status = "Text copied!".to_string();
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.button("Delete For You").clicked() {
                self.hidden_messages.insert(row.message_id);
                ui.close_menu();
            }
            if row.own && ui.button("Delete For Both").clicked() {
                self.queue(BackendCommand::DeleteMessage {
                    message_id: row.message_id,
                });
                ui.close_menu();
            }
        });
    }

    fn message_image_bytes(&self, message_id: MessageId) -> Option<(String, Vec<u8>)> {
        let data_uri = self
            .messages
            .iter()
            .find(|message| message.message_id == message_id)
            .and_then(|message| message.image.as_deref())?;
        media::decode_data_uri(data_uri).ok()
    }

    fn save_message_image(&mut self, message_id: MessageId) {
        let Some((mime, bytes)) = self.message_image_bytes(message_id) else {
            self.status = "Image data is missing or malformed".to_string();
            return;
        };
        let mut dialog =
            rfd::FileDialog::new().set_file_name(media::suggested_image_file_name(&mime));
        if let Some(dir) = dirs::download_dir()
            .or_else(dirs::desktop_dir)
            .or_else(dirs::home_dir)
        {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.save_file() {
            match fs::write(&path, &bytes) {
                Ok(()) => {
                    self.status = format!("Saved image to {}", path.display());
                }
                Err(err) => {
                    self.status = format!("Failed to save image: {err}");
                }
            }
        }
    }

    fn copy_message_image(&mut self, message_id: MessageId) {
        let Some((_mime, bytes)) = self.message_image_bytes(message_id) else {
            self.status = "Image data is missing or malformed".to_string();
            return;
        };
        match media::decode_image_for_clipboard(&bytes)
            .and_then(|(rgba, width, height)| media::write_clipboard_image(&rgba, width, height))
        {
            Ok(()) => self.status = "Image copied to clipboard".to_string(),
            Err(err) => self.status = format!("Failed to copy image: {err}"),
        }
    }

    // ---------- Expanded previews ----------

    pub(crate) fn show_expanded_image_overlay(&mut self, ctx: &egui::Context) {
        let Some(message_id) = self.expanded_image else {
            return;
        };
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.expanded_image = None;
            return;
        }
        let Some(texture) = self.message_texture_for(ctx, message_id) else {
            self.expanded_image = None;
            return;
        };

        let mut close = false;
        egui::Area::new(egui::Id::new("expanded_image_overlay"))
            .order(egui::Order::Foreground)
            .fixed_pos(egui::pos2(0.0, 0.0))
            .show(ctx, |ui| {
                let screen = ctx.screen_rect();
                let backdrop = ui.allocate_rect(screen, egui::Sense::click());
                ui.painter()
                    .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(180));

                let mut size = texture.size_vec2();
                let max = screen.size() * 0.86;
                let scale = (max.x / size.x).min(max.y / size.y).min(1.0);
                size *= scale;
                let image_rect = egui::Rect::from_center_size(screen.center(), size);
                // Clicks on the image land on the image widget, not the
                // backdrop, so only clicks outside it close the preview.
                ui.put(
                    image_rect,
                    egui::Image::new(&texture)
                        .fit_to_exact_size(size)
                        .sense(egui::Sense::click()),
                );

                let close_rect = egui::Rect::from_center_size(
                    screen.right_top() + egui::vec2(-28.0, 28.0),
                    egui::vec2(28.0, 28.0),
                );
                if ui.put(close_rect, egui::Button::new("✕")).clicked() {
                    close = true;
                }
                if backdrop.clicked() {
                    close = true;
                }
            });

        if close {
            self.expanded_image = None;
        }
    }

    pub(crate) fn show_avatar_overlay(&mut self, ctx: &egui::Context) {
        let Some(user_id) = self.avatar_expanded else {
            return;
        };
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.avatar_expanded = None;
            return;
        }
        let Some(texture) = self.avatar_textures.get(&user_id).cloned().flatten() else {
            self.avatar_expanded = None;
            return;
        };

        let mut close = false;
        egui::Area::new(egui::Id::new("avatar_overlay"))
            .order(egui::Order::Foreground)
            .fixed_pos(egui::pos2(0.0, 0.0))
            .show(ctx, |ui| {
                let screen = ctx.screen_rect();
                let backdrop = ui.allocate_rect(screen, egui::Sense::click());
                ui.painter()
                    .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(180));

                let mut size = texture.size_vec2();
                let max = screen.size() * 0.6;
                let scale = (max.x / size.x).min(max.y / size.y).min(1.0);
                size *= scale;
                let image_rect = egui::Rect::from_center_size(screen.center(), size);
                ui.put(
                    image_rect,
                    egui::Image::new(&texture)
                        .fit_to_exact_size(size)
                        .rounding(egui::Rounding::same(12.0))
                        .sense(egui::Sense::click()),
                );

                if backdrop.clicked() {
                    close = true;
                }
            });

        if close {
            self.avatar_expanded = None;
        }
    }

    // ---------- Composer ----------

    pub(crate) fn show_composer_panel(&mut self, ctx: &egui::Context) {
        if self.selected_peer.is_none() {
            return;
        }
        let palette = chat_palette(self.theme.preset);

        egui::TopBottomPanel::bottom("composer_panel")
            .resizable(true)
            .default_height(self.composer_panel_height)
            .min_height(MIN_COMPOSER_PANEL_HEIGHT)
            .frame(
                egui::Frame::none()
                    .fill(palette.composer_background)
                    .inner_margin(egui::Margin::symmetric(10.0, 8.0)),
            )
            .show(ctx, |ui| {
                self.composer_panel_height = ui
                    .available_height()
                    .clamp(MIN_COMPOSER_PANEL_HEIGHT, MAX_COMPOSER_PANEL_HEIGHT);

                if let Some(path) = self.pending_attachment.clone() {
                    let texture = self.composer_preview_texture(ui.ctx(), &path);
                    ui.horizontal(|ui| {
                        let file_name = path
                            .file_name()
                            .and_then(|name| name.to_str())
                            .unwrap_or("image");
                        match (&self.attachment_preview, texture) {
                            (
                                Some((_, AttachmentPreviewLoad::Ready { size_bytes, .. })),
                                Some(texture),
                            ) => {
                                let mut size = texture.size_vec2();
                                let scale = (40.0 / size.y).min(1.0);
                                size *= scale;
                                ui.add(
                                    egui::Image::new(&texture)
                                        .fit_to_exact_size(size)
                                        .rounding(egui::Rounding::same(4.0)),
                                );
                                ui.small(format!(
                                    "{file_name} ({})",
                                    media::human_readable_bytes(*size_bytes)
                                ));
                            }
                            (Some((_, AttachmentPreviewLoad::Loading)), _) => {
                                ui.spinner();
                                ui.small(format!("Loading {file_name}..."));
                            }
                            (Some((_, AttachmentPreviewLoad::Unavailable(reason))), _) => {
                                ui.small(
                                    egui::RichText::new(format!("⚠ {file_name}: {reason}"))
                                        .color(egui::Color32::from_rgb(220, 150, 60)),
                                );
                            }
                            _ => {
                                ui.small(format!("Attached: {}", path.display()));
                            }
                        }
                        if ui.button("✕ Remove").clicked() {
                            self.pending_attachment = None;
                            self.attachment_preview = None;
                        }
                    });
                    ui.add_space(4.0);
                }

                let row_height = (self.composer_panel_height - 18.0)
                    .clamp(36.0, MAX_COMPOSER_PANEL_HEIGHT - 12.0);
                let send_width = (88.0 + (row_height - 36.0) * 0.28).clamp(88.0, 124.0);

                ui.horizontal(|ui| {
                    if ui.button("📎").on_hover_text("Attach an image").clicked() {
                        self.pick_composer_attachment();
                    }

                    let emoji_button = ui.button("😊").on_hover_text("Insert emoji");
                    let popup_id = ui.make_persistent_id("composer_emoji_popup");
                    if emoji_button.clicked() {
                        ui.memory_mut(|mem| mem.toggle_popup(popup_id));
                    }
                    egui::popup::popup_above_or_below_widget(
                        ui,
                        popup_id,
                        &emoji_button,
                        egui::AboveOrBelow::Above,
                        egui::PopupCloseBehavior::CloseOnClickOutside,
                        |ui| {
                            ui.set_min_width(220.0);
                            egui::Grid::new("emoji_grid").spacing([4.0, 4.0]).show(
                                ui,
                                |ui| {
                                    for (index, emoji) in
                                        widgets::EMOJI_PALETTE.iter().enumerate()
                                    {
                                        if ui.button(*emoji).clicked() {
                                            self.composer_text.push_str(emoji);
                                        }
                                        if (index + 1) % 8 == 0 {
                                            ui.end_row();
                                        }
                                    }
                                },
                            );
                        },
                    );

                    let text_width = ui.available_width() - send_width - 8.0;
                    let response = ui.add_sized(
                        [text_width, row_height],
                        egui::TextEdit::multiline(&mut self.composer_text)
                            .id_salt("composer_text")
                            .hint_text("Type a message (Enter to send, Shift+Enter for newline)"),
                    );

                    let send_shortcut = response.has_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift);

                    // Busy covers both an in-flight send and an attachment
                    // still being read off disk.
                    let busy = self.sending
                        || matches!(
                            self.attachment_preview,
                            Some((_, AttachmentPreviewLoad::Loading))
                        );
                    let can_send = projection::can_send(
                        &self.composer_text,
                        self.pending_attachment.is_some(),
                        busy,
                    );
                    let clicked_send = ui
                        .add_enabled(
                            can_send,
                            egui::Button::new(if self.sending { "Sending..." } else { "⬆ Send" })
                                .min_size(egui::vec2(send_width, row_height)),
                        )
                        .clicked();

                    if (send_shortcut && can_send) || clicked_send {
                        self.try_send_composer();
                        response.request_focus();
                    }
                });
            });
    }

    fn pick_composer_attachment(&mut self) {
        let mut dialog =
            rfd::FileDialog::new().add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"]);
        if let Some(dir) = default_image_dir() {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else {
            return;
        };
        if media::image_mime_for_path(&path).is_none() {
            self.status = "Please select an image file".to_string();
            self.status_banner = Some(StatusBanner::error("Please select an image file"));
            return;
        }
        // The worker reads and decodes the file; the preview row shows a
        // spinner until the decoded image comes back.
        self.pending_attachment = Some(path.clone());
        self.attachment_preview = Some((path.clone(), AttachmentPreviewLoad::Loading));
        self.queue(BackendCommand::LoadAttachmentPreview { path });
    }

    fn try_send_composer(&mut self) {
        let Some(peer_id) = self.selected_peer else {
            return;
        };
        let has_text = !self.composer_text.trim().is_empty();
        let has_attachment = self.pending_attachment.is_some();
        if !has_text && !has_attachment {
            return;
        }

        // The draft stays in place until the backend confirms the send, so
        // a failure leaves everything editable.
        self.sending = true;
        self.queue(BackendCommand::SendMessage {
            peer_id,
            text: self.composer_text.trim_end_matches('\n').to_string(),
            attachment_path: self.pending_attachment.clone(),
        });
    }

    /// Texture for the composer preview, created on the UI thread the first
    /// frame after the worker's decoded image arrives.
    fn composer_preview_texture(
        &mut self,
        ctx: &egui::Context,
        path: &std::path::Path,
    ) -> Option<egui::TextureHandle> {
        let (slot_path, load) = self.attachment_preview.as_mut()?;
        if slot_path.as_path() != path {
            return None;
        }
        let AttachmentPreviewLoad::Ready { image, texture, .. } = load else {
            return None;
        };
        if texture.is_none() {
            let color_image =
                egui::ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.rgba);
            *texture = Some(ctx.load_texture(
                format!("attachment-preview:{}", path.display()),
                color_image,
                egui::TextureOptions::LINEAR,
            ));
        }
        texture.clone()
    }

    // ---------- Profile window ----------

    pub(crate) fn show_profile_window(&mut self, ctx: &egui::Context) {
        if !self.profile_open {
            return;
        }
        let Some(user) = self.local_user.clone() else {
            return;
        };

        let mut profile_open = self.profile_open;
        egui::Window::new("Profile")
            .open(&mut profile_open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    let texture =
                        self.avatar_texture_for(ui.ctx(), user.user_id, user.profile_pic.as_deref());
                    let avatar = widgets::avatar_circle(
                        ui,
                        texture.as_ref(),
                        &user.full_name,
                        80.0,
                        self.theme.accent_color.gamma_multiply(0.8),
                    );
                    if avatar.clicked() && texture.is_some() {
                        self.avatar_expanded = Some(user.user_id);
                    }

                    ui.add_space(4.0);
                    if self.profile_pic_uploading {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.small("Uploading...");
                        });
                    } else if ui.button("📷 Change picture").clicked() {
                        self.pick_profile_picture();
                    }
                });

                ui.add_space(8.0);
                ui.separator();

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("Full name").strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.profile_name_editing {
                            if ui.button("✔").on_hover_text("Save").clicked() {
                                self.commit_profile_name(&user.full_name);
                            }
                            if ui.button("✕").on_hover_text("Cancel").clicked() {
                                self.profile_name_editing = false;
                                self.profile_name_draft.clear();
                            }
                        } else if ui.button("✏").on_hover_text("Edit name").clicked() {
                            self.profile_name_editing = true;
                            self.profile_name_draft = user.full_name.clone();
                        }
                    });
                });
                if self.profile_name_editing {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.profile_name_draft)
                            .id_salt("profile_name_edit")
                            .desired_width(f32::INFINITY),
                    );
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        self.commit_profile_name(&user.full_name);
                    }
                } else {
                    ui.label(&user.full_name);
                }

                ui.add_space(6.0);
                ui.label(egui::RichText::new("Email").strong());
                ui.label(&user.email);

                ui.add_space(8.0);
                ui.separator();
                ui.label(egui::RichText::new("Account Information").strong());
                ui.add_space(4.0);

                egui::Grid::new("account_stats_grid")
                    .num_columns(2)
                    .spacing([24.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Member Since");
                        ui.label(user.created_at.format("%Y-%m-%d").to_string());
                        ui.end_row();

                        ui.label("Last Login");
                        ui.label(
                            user.last_login
                                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "N/A".to_string()),
                        );
                        ui.end_row();

                        ui.label("Last Logout");
                        ui.label(
                            user.last_logout
                                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "N/A".to_string()),
                        );
                        ui.end_row();

                        ui.label("Total Logins");
                        ui.label(user.login_count.to_string());
                        ui.end_row();

                        ui.label("Messages Sent");
                        ui.label(user.messages_sent.to_string());
                        ui.end_row();

                        ui.label("Account Status");
                        ui.label(
                            egui::RichText::new("Active")
                                .color(egui::Color32::from_rgb(67, 181, 129)),
                        );
                        ui.end_row();
                    });

                ui.add_space(8.0);
                ui.separator();
                self.render_sign_out_rows(ui);
            });
        self.profile_open = profile_open;
    }

    fn commit_profile_name(&mut self, current_name: &str) {
        self.profile_name_editing = false;
        let draft = std::mem::take(&mut self.profile_name_draft);
        if let Some(full_name) = projection::commit_name_edit(current_name, &draft) {
            self.queue(BackendCommand::UpdateProfile {
                full_name: Some(full_name),
                avatar_path: None,
            });
        }
    }

    fn pick_profile_picture(&mut self) {
        let mut dialog =
            rfd::FileDialog::new().add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"]);
        if let Some(dir) = default_image_dir() {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else {
            return;
        };
        if media::image_mime_for_path(&path).is_none() {
            self.status = "Please select an image file".to_string();
            self.status_banner = Some(StatusBanner::error("Please select an image file"));
            return;
        }
        self.profile_pic_uploading = true;
        self.queue(BackendCommand::UpdateProfile {
            full_name: None,
            avatar_path: Some(path),
        });
    }

    // ---------- Settings window ----------

    pub(crate) fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let mut settings_open = self.settings_open;
        egui::Window::new("Settings")
            .open(&mut settings_open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal_top(|ui| {
                    ui.vertical(|ui| {
                        ui.set_width(320.0);
                        self.render_settings_controls(ui);
                    });
                    ui.separator();
                    ui.vertical(|ui| {
                        ui.set_width(250.0);
                        self.render_settings_preview(ui);
                    });
                });
            });
        self.settings_open = settings_open;
    }

    fn render_settings_controls(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Theme").strong());
        ui.small("Choose a theme for your chat interface");
        ui.add_space(4.0);

        egui::Grid::new("theme_preset_grid")
            .spacing([8.0, 8.0])
            .show(ui, |ui| {
                for (index, preset) in ThemePreset::ALL.iter().enumerate() {
                    if self.render_theme_tile(ui, *preset) {
                        self.theme.preset = *preset;
                        self.theme.accent_color = chat_palette(*preset).accent;
                        self.status = format!("Theme changed to {}", preset.label());
                    }
                    if (index + 1) % 5 == 0 {
                        ui.end_row();
                    }
                }
            });

        ui.separator();
        ui.label("Accent color");
        ui.color_edit_button_srgba(&mut self.theme.accent_color);
        ui.small("Used for selected rows, hover emphasis, and primary actions.");
        ui.add(egui::Slider::new(&mut self.theme.panel_rounding, 0..=16).text("Panel rounding"));
        ui.checkbox(
            &mut self.theme.list_row_shading,
            "Use shaded backgrounds for contact rows",
        );

        ui.separator();
        ui.label("Readability");
        ui.add(
            egui::Slider::new(&mut self.readability.text_scale, 0.8..=1.4)
                .text("Text scale")
                .step_by(0.05),
        );
        ui.checkbox(&mut self.readability.compact_density, "Compact UI density");
        ui.checkbox(&mut self.readability.show_timestamps, "Show message timestamps");
        ui.checkbox(
            &mut self.readability.message_bubble_backgrounds,
            "Show chat message bubble backgrounds",
        );

        ui.separator();
        ui.label("Notifications");
        if ui
            .checkbox(&mut self.sound_notifications, "Enable Notifications")
            .changed()
        {
            self.status = if self.sound_notifications {
                "Notifications enabled".to_string()
            } else {
                "Notifications disabled".to_string()
            };
        }

        ui.separator();
        if ui.button("Reset all settings to defaults").clicked() {
            self.theme = ThemeSettings::coffee_default();
            self.readability = UiReadabilitySettings::defaults();
            self.sound_notifications = true;
        }
    }

    fn render_theme_tile(&mut self, ui: &mut egui::Ui, preset: ThemePreset) -> bool {
        let selected = self.theme.preset == preset;
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(58.0, 48.0), egui::Sense::click());

        let tile_fill = if selected {
            ui.visuals().selection.bg_fill.gamma_multiply(0.35)
        } else if response.hovered() {
            ui.visuals().widgets.hovered.bg_fill
        } else {
            ui.visuals().faint_bg_color
        };
        ui.painter()
            .rect_filled(rect, egui::Rounding::same(6.0), tile_fill);
        if selected {
            ui.painter().rect_stroke(
                rect,
                egui::Rounding::same(6.0),
                egui::Stroke::new(1.5, self.theme.accent_color),
            );
        }

        let swatches = preset.swatches();
        let swatch_size = 10.0;
        let total = swatch_size * 4.0 + 3.0 * 2.0;
        let mut x = rect.center().x - total / 2.0;
        let y = rect.top() + 10.0;
        for swatch in swatches {
            let swatch_rect = egui::Rect::from_min_size(
                egui::pos2(x, y),
                egui::vec2(swatch_size, swatch_size),
            );
            ui.painter()
                .rect_filled(swatch_rect, egui::Rounding::same(2.0), swatch);
            x += swatch_size + 2.0;
        }

        ui.painter().text(
            egui::pos2(rect.center().x, rect.bottom() - 12.0),
            egui::Align2::CENTER_CENTER,
            preset.label(),
            egui::TextStyle::Small.resolve(ui.style()),
            ui.visuals().text_color(),
        );

        response.clicked()
    }

    fn render_settings_preview(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Preview").strong());
        ui.add_space(4.0);

        let palette = chat_palette(self.theme.preset);
        egui::Frame::none()
            .fill(palette.app_background)
            .rounding(10.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::same(10.0))
            .show(ui, |ui| {
                ui.visuals_mut().override_text_color = Some(palette.text);

                ui.horizontal(|ui| {
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(26.0, 26.0), egui::Sense::hover());
                    ui.painter().circle_filled(
                        rect.center(),
                        13.0,
                        palette.accent.gamma_multiply(0.8),
                    );
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "JD",
                        egui::FontId::proportional(11.0),
                        egui::Color32::WHITE,
                    );
                    ui.vertical(|ui| {
                        ui.strong("John Doe");
                        ui.small(egui::RichText::new("Online").color(palette.text_muted));
                    });
                });
                ui.add_space(6.0);

                let bubble_rounding = egui::Rounding::same(f32::from(self.theme.panel_rounding));
                egui::Frame::none()
                    .fill(palette.bubble_remote)
                    .rounding(bubble_rounding)
                    .inner_margin(egui::Margin::symmetric(8.0, 6.0))
                    .show(ui, |ui| {
                        ui.visuals_mut().override_text_color = Some(palette.bubble_remote_text);
                        ui.label("Hey! How's it going?");
                        ui.small(egui::RichText::new("12:00 PM").weak());
                    });
                ui.add_space(4.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                    egui::Frame::none()
                        .fill(palette.bubble_local)
                        .rounding(bubble_rounding)
                        .inner_margin(egui::Margin::symmetric(8.0, 6.0))
                        .show(ui, |ui| {
                            ui.visuals_mut().override_text_color =
                                Some(palette.bubble_local_text);
                            ui.set_max_width(170.0);
                            ui.label("I'm doing great! Just working on some new features.");
                            ui.small(egui::RichText::new("12:00 PM").weak());
                        });
                });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    let mut preview_text = "This is a preview".to_string();
                    ui.add_enabled(
                        false,
                        egui::TextEdit::singleline(&mut preview_text)
                            .id_salt("settings_preview_input")
                            .desired_width(ui.available_width() - 60.0),
                    );
                    ui.add_enabled(false, egui::Button::new("Send"));
                });
            });
    }
}
