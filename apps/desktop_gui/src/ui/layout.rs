//! Window chrome: top bar, account menu, and the contacts side panel.

use shared::domain::UserId;

use crate::backend_bridge::commands::BackendCommand;
use crate::ui::app::DesktopApp;
use crate::ui::theme::chat_palette;
use crate::ui::widgets;

impl DesktopApp {
    pub(crate) fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            if widgets::draw_status_banner(ui, &banner) {
                self.status_banner = None;
            }
        }
    }

    pub(crate) fn show_top_bar(&mut self, ctx: &egui::Context) {
        let palette = chat_palette(self.theme.preset);
        let compact = ctx.screen_rect().width() < 760.0;
        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(palette.panel_background)
                    .inner_margin(egui::Margin::symmetric(10.0, 6.0)),
            )
            .show(ctx, |ui| {
                ui.scope(|ui| {
                    let style = ui.style_mut();
                    style.spacing.button_padding = egui::vec2(6.0, 2.0);
                    style.visuals.widgets.inactive.rounding = egui::Rounding::same(0.0);
                    style.visuals.widgets.hovered.rounding = egui::Rounding::same(0.0);
                    style.visuals.widgets.active.rounding = egui::Rounding::same(0.0);
                    style.visuals.widgets.open.rounding = egui::Rounding::same(0.0);

                    egui::menu::bar(ui, |ui| {
                        ui.label(
                            egui::RichText::new("💬 Banter")
                                .strong()
                                .size(18.0)
                                .color(self.theme.accent_color),
                        );
                        ui.separator();

                        if !compact && ui.button("⚙ Settings").clicked() {
                            self.settings_open = true;
                        }

                        let mut account_label = self
                            .local_user
                            .as_ref()
                            .map(|user| format!("👤 {}", user.full_name))
                            .unwrap_or_else(|| "👤 Account".to_string());
                        if self.account_menu_open {
                            account_label.push_str(" ▾");
                        }
                        let account_button = ui.button(account_label);
                        if account_button.clicked() {
                            self.account_menu_open = !self.account_menu_open;
                            self.suppress_account_menu_close = self.account_menu_open;
                            if !self.account_menu_open {
                                self.logout_confirm = false;
                            }
                        }
                        self.account_menu_anchor =
                            Some(account_button.rect.left_bottom() + egui::vec2(0.0, 6.0));

                        if compact {
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    let menu_button = ui.button("☰");
                                    if menu_button.clicked() {
                                        self.compact_menu_open = !self.compact_menu_open;
                                    }
                                    self.compact_menu_anchor = Some(
                                        menu_button.rect.right_bottom() + egui::vec2(0.0, 6.0),
                                    );
                                },
                            );
                        } else {
                            self.compact_menu_open = false;
                        }
                    });
                });

                ui.label(&self.status);
                self.show_status_banner(ui);
            });
    }

    /// Account dropdown, anchored under its top-bar toggle. Independent of
    /// the compact menu; closes on outside click and Escape.
    pub(crate) fn show_account_menu(&mut self, ctx: &egui::Context) {
        if !self.account_menu_open {
            return;
        }
        let anchor = self
            .account_menu_anchor
            .unwrap_or_else(|| egui::pos2(110.0, 40.0));
        let response = egui::Window::new("Account")
            .id(egui::Id::new("account_menu_window"))
            .title_bar(false)
            .resizable(false)
            .collapsible(false)
            .fixed_pos(anchor)
            .frame(
                egui::Frame::popup(&ctx.style())
                    .fill(chat_palette(self.theme.preset).panel_background)
                    .rounding(egui::Rounding::same(f32::from(self.theme.panel_rounding))),
            )
            .show(ctx, |ui| self.show_account_menu_contents(ui));

        let clicked_outside = response
            .map(|inner| inner.response.clicked_elsewhere())
            .unwrap_or(false);
        let escape_pressed = ctx.input(|input| input.key_pressed(egui::Key::Escape));
        if escape_pressed || (clicked_outside && !self.suppress_account_menu_close) {
            self.account_menu_open = false;
            self.logout_confirm = false;
        }
        self.suppress_account_menu_close = false;
    }

    fn show_account_menu_contents(&mut self, ui: &mut egui::Ui) {
        ui.style_mut().spacing.button_padding = egui::vec2(4.0, 1.0);
        ui.style_mut().visuals.widgets.inactive.rounding = egui::Rounding::same(0.0);
        ui.style_mut().visuals.widgets.hovered.rounding = egui::Rounding::same(0.0);
        ui.style_mut().visuals.widgets.active.rounding = egui::Rounding::same(0.0);
        ui.style_mut().visuals.widgets.open.rounding = egui::Rounding::same(0.0);

        ui.set_min_width(260.0);
        if let Some(user) = &self.local_user {
            ui.label(egui::RichText::new(&user.full_name).strong());
            ui.small(&user.email);
        }

        ui.separator();
        if ui.button("👤 Profile").clicked() {
            self.profile_open = true;
            self.account_menu_open = false;
        }
        if ui.button("⚙ Settings").clicked() {
            self.settings_open = true;
            self.account_menu_open = false;
        }

        ui.separator();
        self.render_sign_out_rows(ui);
    }

    /// Compact-width navigation menu. Shares nothing with the account
    /// dropdown; its toggle is the only thing that opens or closes it.
    pub(crate) fn show_compact_menu(&mut self, ctx: &egui::Context) {
        if !self.compact_menu_open {
            return;
        }
        let anchor = self
            .compact_menu_anchor
            .unwrap_or_else(|| egui::pos2(ctx.screen_rect().right() - 10.0, 40.0));
        egui::Window::new("Menu")
            .id(egui::Id::new("compact_menu_window"))
            .title_bar(false)
            .resizable(false)
            .collapsible(false)
            .pivot(egui::Align2::RIGHT_TOP)
            .fixed_pos(anchor)
            .frame(
                egui::Frame::popup(&ctx.style())
                    .fill(chat_palette(self.theme.preset).panel_background)
                    .rounding(egui::Rounding::same(f32::from(self.theme.panel_rounding))),
            )
            .show(ctx, |ui| {
                ui.set_min_width(180.0);
                if ui.button("⚙ Settings").clicked() {
                    self.settings_open = true;
                    self.compact_menu_open = false;
                }
                if ui.button("👤 Profile").clicked() {
                    self.profile_open = true;
                    self.compact_menu_open = false;
                }
                ui.separator();
                self.render_sign_out_rows(ui);
            });
    }

    /// Sign-out entry with its inline confirm step; confirmation closes
    /// every open menu before queueing the logout.
    pub(crate) fn render_sign_out_rows(&mut self, ui: &mut egui::Ui) {
        if self.logout_confirm {
            ui.label("Sign out of Banter?");
            ui.horizontal(|ui| {
                if ui.button("Yes").clicked() {
                    self.close_menus();
                    self.queue(BackendCommand::Logout);
                }
                if ui.button("Cancel").clicked() {
                    self.logout_confirm = false;
                }
            });
        } else if ui.button("⎋ Sign out").clicked() {
            self.logout_confirm = true;
        }
    }

    pub(crate) fn show_contacts_panel(&mut self, ctx: &egui::Context) {
        let palette = chat_palette(self.theme.preset);
        egui::SidePanel::left("contacts_panel")
            .default_width(240.0)
            .frame(
                egui::Frame::none()
                    .fill(palette.panel_background)
                    .inner_margin(egui::Margin::symmetric(10.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.heading("Contacts");
                ui.add_space(4.0);

                let online_count = self
                    .contacts
                    .iter()
                    .filter(|contact| self.online_users.contains(&contact.user_id))
                    .count();
                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.show_online_only, "Show online only");
                    ui.small(format!("({online_count} online)"));
                });
                ui.add_space(6.0);
                ui.separator();
                ui.add_space(4.0);

                let row_height = if self.readability.compact_density { 40.0 } else { 48.0 };
                egui::ScrollArea::vertical()
                    .id_salt("contacts_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if self.contacts_loading && self.contacts.is_empty() {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Loading contacts...");
                            });
                            return;
                        }

                        let mut shown = 0usize;
                        for index in 0..self.contacts.len() {
                            let contact = &self.contacts[index];
                            let user_id = contact.user_id;
                            let online = self.online_users.contains(&user_id);
                            if self.show_online_only && !online {
                                continue;
                            }
                            let name = contact.full_name.clone();
                            let profile_pic = contact.profile_pic.clone();
                            let selected = self.selected_peer == Some(user_id);

                            let avatar = self.avatar_texture_for(
                                ui.ctx(),
                                user_id,
                                profile_pic.as_deref(),
                            );
                            let response = self.render_contact_row(
                                ui,
                                &name,
                                online,
                                selected,
                                row_height,
                                avatar,
                            );
                            if response.clicked() {
                                self.select_contact(user_id);
                            }
                            ui.add_space(4.0);
                            shown += 1;
                        }

                        if shown == 0 {
                            ui.add_space(8.0);
                            ui.label(if self.show_online_only {
                                "No online users"
                            } else {
                                "No contacts yet"
                            });
                        }
                    });
            });
    }

    fn render_contact_row(
        &mut self,
        ui: &mut egui::Ui,
        name: &str,
        online: bool,
        selected: bool,
        row_height: f32,
        avatar: Option<egui::TextureHandle>,
    ) -> egui::Response {
        let base_bg = if self.theme.list_row_shading {
            ui.visuals().faint_bg_color
        } else {
            egui::Color32::TRANSPARENT
        };
        let selected_bg = ui
            .visuals()
            .selection
            .bg_fill
            .gamma_multiply(if self.theme.list_row_shading { 0.35 } else { 0.22 });
        let row_stroke = if selected {
            egui::Stroke::new(1.0, ui.visuals().selection.bg_fill.gamma_multiply(0.9))
        } else if self.theme.list_row_shading {
            egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
        } else {
            egui::Stroke::NONE
        };

        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), row_height),
            egui::Sense::click(),
        );
        let row_fill = if selected {
            selected_bg
        } else if response.hovered() {
            ui.visuals().widgets.hovered.bg_fill
        } else {
            base_bg
        };

        let rounding = egui::Rounding::same(f32::from(self.theme.panel_rounding));
        ui.painter().rect_filled(rect, rounding, row_fill);
        if row_stroke != egui::Stroke::NONE {
            ui.painter().rect_stroke(rect, rounding, row_stroke);
        }

        let avatar_size = (row_height - 14.0).clamp(24.0, 40.0);
        let avatar_rect = egui::Rect::from_center_size(
            egui::pos2(rect.left() + 10.0 + avatar_size / 2.0, rect.center().y),
            egui::vec2(avatar_size, avatar_size),
        );
        match avatar {
            Some(texture) => {
                ui.put(
                    avatar_rect,
                    egui::Image::new(&texture)
                        .fit_to_exact_size(avatar_rect.size())
                        .rounding(egui::Rounding::same(avatar_size / 2.0)),
                );
            }
            None => {
                let fill = chat_palette(self.theme.preset).accent.gamma_multiply(0.8);
                ui.painter()
                    .circle_filled(avatar_rect.center(), avatar_size / 2.0, fill);
                ui.painter().text(
                    avatar_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    widgets::initials_for_name(name),
                    egui::FontId::proportional(avatar_size * 0.42),
                    egui::Color32::WHITE,
                );
            }
        }
        if online {
            let badge = avatar_rect.right_bottom() - egui::vec2(3.0, 3.0);
            ui.painter()
                .circle_filled(badge, 4.5, egui::Color32::from_rgb(67, 181, 129));
            ui.painter()
                .circle_stroke(badge, 4.5, egui::Stroke::new(1.5, ui.visuals().panel_fill));
        }

        let text_origin = egui::pos2(avatar_rect.right() + 10.0, rect.center().y);
        let name_color = if selected || response.hovered() {
            ui.visuals().strong_text_color()
        } else {
            ui.visuals().text_color()
        };
        ui.painter().text(
            text_origin - egui::vec2(0.0, 2.0),
            egui::Align2::LEFT_BOTTOM,
            name,
            egui::TextStyle::Button.resolve(ui.style()),
            name_color,
        );
        ui.painter().text(
            text_origin + egui::vec2(0.0, 2.0),
            egui::Align2::LEFT_TOP,
            if online { "Online" } else { "Offline" },
            egui::TextStyle::Small.resolve(ui.style()),
            ui.visuals().weak_text_color(),
        );

        response
    }

    pub(crate) fn select_contact(&mut self, peer_id: UserId) {
        if self.selected_peer == Some(peer_id) {
            return;
        }
        self.selected_peer = Some(peer_id);
        self.messages.clear();
        self.message_ids.clear();
        self.hidden_messages.clear();
        self.message_textures.clear();
        self.expanded_image = None;
        self.history_loading = true;
        self.queue(BackendCommand::SelectConversation { peer_id });
    }

    pub(crate) fn clear_selected_conversation(&mut self) {
        self.selected_peer = None;
        self.messages.clear();
        self.message_ids.clear();
        self.hidden_messages.clear();
        self.message_textures.clear();
        self.expanded_image = None;
        self.history_loading = false;
        self.queue(BackendCommand::ClearConversation);
    }
}
