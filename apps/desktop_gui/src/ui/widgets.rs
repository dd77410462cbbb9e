//! Small reusable draw helpers shared by the chat panels.

use chrono::{DateTime, Utc};
use shared::domain::DeliveryStatus;

use crate::controller::events::{StatusBanner, StatusBannerSeverity};

pub const EMOJI_PALETTE: [&str; 40] = [
    "😀", "😃", "😄", "😁", "😂", "🤣", "😊", "😍", "😘", "😎",
    "🤔", "🙄", "😴", "😢", "😭", "😡", "🤯", "🥳", "😅", "🙃",
    "👍", "👎", "👋", "🙏", "👏", "💪", "🤝", "✌️", "🤞", "👀",
    "❤️", "💙", "💚", "💛", "🔥", "⭐", "🎉", "🎂", "☕", "🍕",
];

pub fn initials_for_name(name: &str) -> String {
    let mut initials: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect();
    if initials.is_empty() {
        initials.push('?');
    }
    initials
}

/// Round avatar. Falls back to an initials disc when no picture is set.
pub fn avatar_circle(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    name: &str,
    size: f32,
    fallback_fill: egui::Color32,
) -> egui::Response {
    match texture {
        Some(texture) => ui.add(
            egui::Image::new(texture)
                .fit_to_exact_size(egui::vec2(size, size))
                .rounding(egui::Rounding::same(size / 2.0))
                .sense(egui::Sense::click()),
        ),
        None => {
            let (rect, response) =
                ui.allocate_exact_size(egui::vec2(size, size), egui::Sense::click());
            if ui.is_rect_visible(rect) {
                let painter = ui.painter();
                painter.circle_filled(rect.center(), size / 2.0, fallback_fill);
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    initials_for_name(name),
                    egui::FontId::proportional(size * 0.42),
                    egui::Color32::WHITE,
                );
            }
            response
        }
    }
}

pub fn presence_dot(ui: &mut egui::Ui, online: bool) {
    let color = if online {
        egui::Color32::from_rgb(67, 181, 129)
    } else {
        egui::Color32::from_rgb(116, 127, 141)
    };
    let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
    ui.painter().circle_filled(rect.center(), 4.0, color);
}

/// Delivery ticks for a message the local user sent: one tick for stored,
/// two for delivered, accent-colored two for read.
pub fn delivery_ticks(
    status: DeliveryStatus,
    accent: egui::Color32,
    muted: egui::Color32,
) -> (&'static str, egui::Color32) {
    match status {
        DeliveryStatus::Sent => ("✓", muted),
        DeliveryStatus::Delivered => ("✓✓", muted),
        DeliveryStatus::Read => ("✓✓", accent),
    }
}

pub fn relative_time_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    format!("{days}d ago")
}

pub fn format_message_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&chrono::Local).format("%H:%M").to_string()
}

/// Draws the banner and reports whether the user dismissed it.
pub fn draw_status_banner(ui: &mut egui::Ui, banner: &StatusBanner) -> bool {
    let (fill, stroke) = match banner.severity {
        StatusBannerSeverity::Error => (
            egui::Color32::from_rgb(111, 53, 53),
            egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
        ),
        StatusBannerSeverity::Success => (
            egui::Color32::from_rgb(47, 98, 60),
            egui::Stroke::new(1.0, egui::Color32::from_rgb(96, 160, 110)),
        ),
    };

    let mut dismissed = false;
    egui::Frame::none()
        .fill(fill)
        .stroke(stroke)
        .rounding(8.0)
        .inner_margin(egui::Margin::symmetric(10.0, 8.0))
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Dismiss").clicked() {
                        dismissed = true;
                    }
                });
            });
        });
    dismissed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn initials_take_the_first_two_words() {
        assert_eq!(initials_for_name("Jane Doe"), "JD");
        assert_eq!(initials_for_name("Ada"), "A");
        assert_eq!(initials_for_name("ana maria lopez"), "AM");
        assert_eq!(initials_for_name("   "), "?");
    }

    #[test]
    fn ticks_follow_delivery_status() {
        let accent = egui::Color32::from_rgb(219, 146, 75);
        let muted = egui::Color32::GRAY;

        assert_eq!(delivery_ticks(DeliveryStatus::Sent, accent, muted), ("✓", muted));
        assert_eq!(
            delivery_ticks(DeliveryStatus::Delivered, accent, muted),
            ("✓✓", muted)
        );
        assert_eq!(delivery_ticks(DeliveryStatus::Read, accent, muted), ("✓✓", accent));
    }

    #[test]
    fn relative_times_step_through_units() {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        assert_eq!(relative_time_since(base, base + chrono::Duration::seconds(30)), "just now");
        assert_eq!(relative_time_since(base, base + chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(relative_time_since(base, base + chrono::Duration::hours(3)), "3h ago");
        assert_eq!(relative_time_since(base, base + chrono::Duration::days(2)), "2d ago");
    }

    #[test]
    fn clock_skew_reads_as_just_now() {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let earlier = base - chrono::Duration::minutes(10);
        assert_eq!(relative_time_since(base, earlier), "just now");
    }

    #[test]
    fn message_times_render_as_hour_minute() {
        let shape = regex::Regex::new(r"^\d{2}:\d{2}$").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap();
        assert!(shape.is_match(&format_message_time(at)));
    }
}
