//! Theme presets, palettes, and persisted appearance settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SETTINGS_STORAGE_KEY: &str = "desktop_gui.settings";

pub const DEFAULT_COMPOSER_PANEL_HEIGHT: f32 = 66.0;
pub const MIN_COMPOSER_PANEL_HEIGHT: f32 = 52.0;
pub const MAX_COMPOSER_PANEL_HEIGHT: f32 = 220.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemePreset {
    Coffee,
    Dark,
    Light,
    Cupcake,
    Forest,
    Synthwave,
    Retro,
    Night,
    Dracula,
    Winter,
}

impl ThemePreset {
    pub const ALL: [ThemePreset; 10] = [
        ThemePreset::Coffee,
        ThemePreset::Dark,
        ThemePreset::Light,
        ThemePreset::Cupcake,
        ThemePreset::Forest,
        ThemePreset::Synthwave,
        ThemePreset::Retro,
        ThemePreset::Night,
        ThemePreset::Dracula,
        ThemePreset::Winter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ThemePreset::Coffee => "Coffee",
            ThemePreset::Dark => "Dark",
            ThemePreset::Light => "Light",
            ThemePreset::Cupcake => "Cupcake",
            ThemePreset::Forest => "Forest",
            ThemePreset::Synthwave => "Synthwave",
            ThemePreset::Retro => "Retro",
            ThemePreset::Night => "Night",
            ThemePreset::Dracula => "Dracula",
            ThemePreset::Winter => "Winter",
        }
    }

    /// Swatch strip shown on the preset tile: primary, secondary, accent,
    /// and base background.
    pub fn swatches(self) -> [egui::Color32; 4] {
        let palette = chat_palette(self);
        [
            palette.bubble_local,
            palette.bubble_remote,
            palette.accent,
            palette.app_background,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChatPalette {
    pub app_background: egui::Color32,
    pub panel_background: egui::Color32,
    pub composer_background: egui::Color32,
    pub bubble_local: egui::Color32,
    pub bubble_local_text: egui::Color32,
    pub bubble_remote: egui::Color32,
    pub bubble_remote_text: egui::Color32,
    pub accent: egui::Color32,
    pub text: egui::Color32,
    pub text_muted: egui::Color32,
    pub is_dark: bool,
}

pub fn chat_palette(preset: ThemePreset) -> ChatPalette {
    use egui::Color32;
    match preset {
        ThemePreset::Coffee => ChatPalette {
            app_background: Color32::from_rgb(32, 22, 31),
            panel_background: Color32::from_rgb(38, 27, 36),
            composer_background: Color32::from_rgb(46, 33, 43),
            bubble_local: Color32::from_rgb(219, 146, 75),
            bubble_local_text: Color32::from_rgb(32, 22, 31),
            bubble_remote: Color32::from_rgb(38, 62, 63),
            bubble_remote_text: Color32::from_rgb(222, 213, 196),
            accent: Color32::from_rgb(219, 146, 75),
            text: Color32::from_rgb(199, 183, 163),
            text_muted: Color32::from_rgb(140, 128, 116),
            is_dark: true,
        },
        ThemePreset::Dark => ChatPalette {
            app_background: Color32::from_rgb(29, 35, 42),
            panel_background: Color32::from_rgb(25, 30, 36),
            composer_background: Color32::from_rgb(21, 25, 30),
            bubble_local: Color32::from_rgb(116, 128, 255),
            bubble_local_text: Color32::from_rgb(237, 239, 255),
            bubble_remote: Color32::from_rgb(42, 50, 60),
            bubble_remote_text: Color32::from_rgb(226, 230, 235),
            accent: Color32::from_rgb(116, 128, 255),
            text: Color32::from_rgb(236, 239, 244),
            text_muted: Color32::from_rgb(148, 155, 164),
            is_dark: true,
        },
        ThemePreset::Light => ChatPalette {
            app_background: Color32::from_rgb(255, 255, 255),
            panel_background: Color32::from_rgb(242, 242, 242),
            composer_background: Color32::from_rgb(233, 233, 233),
            bubble_local: Color32::from_rgb(87, 13, 248),
            bubble_local_text: Color32::from_rgb(255, 255, 255),
            bubble_remote: Color32::from_rgb(229, 231, 235),
            bubble_remote_text: Color32::from_rgb(31, 41, 55),
            accent: Color32::from_rgb(87, 13, 248),
            text: Color32::from_rgb(31, 41, 55),
            text_muted: Color32::from_rgb(107, 114, 128),
            is_dark: false,
        },
        ThemePreset::Cupcake => ChatPalette {
            app_background: Color32::from_rgb(250, 247, 245),
            panel_background: Color32::from_rgb(239, 234, 230),
            composer_background: Color32::from_rgb(231, 224, 219),
            bubble_local: Color32::from_rgb(101, 195, 200),
            bubble_local_text: Color32::from_rgb(32, 41, 42),
            bubble_remote: Color32::from_rgb(239, 159, 188),
            bubble_remote_text: Color32::from_rgb(54, 32, 40),
            accent: Color32::from_rgb(238, 173, 129),
            text: Color32::from_rgb(41, 19, 52),
            text_muted: Color32::from_rgb(120, 110, 116),
            is_dark: false,
        },
        ThemePreset::Forest => ChatPalette {
            app_background: Color32::from_rgb(23, 18, 18),
            panel_background: Color32::from_rgb(30, 24, 24),
            composer_background: Color32::from_rgb(37, 30, 30),
            bubble_local: Color32::from_rgb(30, 184, 84),
            bubble_local_text: Color32::from_rgb(16, 32, 22),
            bubble_remote: Color32::from_rgb(42, 40, 40),
            bubble_remote_text: Color32::from_rgb(216, 212, 208),
            accent: Color32::from_rgb(30, 184, 84),
            text: Color32::from_rgb(212, 206, 202),
            text_muted: Color32::from_rgb(134, 128, 124),
            is_dark: true,
        },
        ThemePreset::Synthwave => ChatPalette {
            app_background: Color32::from_rgb(45, 27, 105),
            panel_background: Color32::from_rgb(38, 22, 92),
            composer_background: Color32::from_rgb(52, 33, 118),
            bubble_local: Color32::from_rgb(231, 121, 193),
            bubble_local_text: Color32::from_rgb(52, 16, 40),
            bubble_remote: Color32::from_rgb(56, 40, 120),
            bubble_remote_text: Color32::from_rgb(224, 220, 252),
            accent: Color32::from_rgb(88, 199, 243),
            text: Color32::from_rgb(224, 220, 252),
            text_muted: Color32::from_rgb(160, 152, 205),
            is_dark: true,
        },
        ThemePreset::Retro => ChatPalette {
            app_background: Color32::from_rgb(228, 216, 180),
            panel_background: Color32::from_rgb(219, 205, 166),
            composer_background: Color32::from_rgb(210, 195, 154),
            bubble_local: Color32::from_rgb(239, 153, 149),
            bubble_local_text: Color32::from_rgb(56, 32, 32),
            bubble_remote: Color32::from_rgb(200, 188, 152),
            bubble_remote_text: Color32::from_rgb(56, 48, 36),
            accent: Color32::from_rgb(163, 204, 171),
            text: Color32::from_rgb(56, 48, 36),
            text_muted: Color32::from_rgb(122, 112, 90),
            is_dark: false,
        },
        ThemePreset::Night => ChatPalette {
            app_background: Color32::from_rgb(15, 23, 42),
            panel_background: Color32::from_rgb(20, 29, 51),
            composer_background: Color32::from_rgb(26, 36, 61),
            bubble_local: Color32::from_rgb(56, 189, 248),
            bubble_local_text: Color32::from_rgb(12, 24, 38),
            bubble_remote: Color32::from_rgb(30, 41, 66),
            bubble_remote_text: Color32::from_rgb(216, 225, 240),
            accent: Color32::from_rgb(56, 189, 248),
            text: Color32::from_rgb(216, 225, 240),
            text_muted: Color32::from_rgb(135, 148, 170),
            is_dark: true,
        },
        ThemePreset::Dracula => ChatPalette {
            app_background: Color32::from_rgb(40, 42, 54),
            panel_background: Color32::from_rgb(33, 35, 46),
            composer_background: Color32::from_rgb(46, 49, 62),
            bubble_local: Color32::from_rgb(255, 121, 198),
            bubble_local_text: Color32::from_rgb(50, 20, 40),
            bubble_remote: Color32::from_rgb(54, 57, 72),
            bubble_remote_text: Color32::from_rgb(232, 232, 240),
            accent: Color32::from_rgb(189, 147, 249),
            text: Color32::from_rgb(248, 248, 242),
            text_muted: Color32::from_rgb(150, 152, 166),
            is_dark: true,
        },
        ThemePreset::Winter => ChatPalette {
            app_background: Color32::from_rgb(245, 248, 253),
            panel_background: Color32::from_rgb(235, 240, 249),
            composer_background: Color32::from_rgb(226, 233, 245),
            bubble_local: Color32::from_rgb(4, 122, 255),
            bubble_local_text: Color32::from_rgb(245, 248, 253),
            bubble_remote: Color32::from_rgb(222, 229, 242),
            bubble_remote_text: Color32::from_rgb(36, 48, 70),
            accent: Color32::from_rgb(4, 122, 255),
            text: Color32::from_rgb(36, 48, 70),
            text_muted: Color32::from_rgb(115, 130, 155),
            is_dark: false,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeSettings {
    pub preset: ThemePreset,
    pub accent_color: egui::Color32,
    pub panel_rounding: u8,
    pub list_row_shading: bool,
}

impl ThemeSettings {
    pub fn coffee_default() -> Self {
        Self {
            preset: ThemePreset::Coffee,
            accent_color: chat_palette(ThemePreset::Coffee).accent,
            panel_rounding: 10,
            list_row_shading: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiReadabilitySettings {
    pub text_scale: f32,
    pub compact_density: bool,
    pub show_timestamps: bool,
    pub message_bubble_backgrounds: bool,
}

impl UiReadabilitySettings {
    pub fn defaults() -> Self {
        Self {
            text_scale: 1.0,
            compact_density: false,
            show_timestamps: true,
            message_bubble_backgrounds: true,
        }
    }
}

pub fn visuals_for_theme(theme: ThemeSettings) -> egui::Visuals {
    let palette = chat_palette(theme.preset);
    let mut visuals = if palette.is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };

    visuals.override_text_color = Some(palette.text);
    visuals.window_fill = palette.app_background;
    visuals.panel_fill = palette.app_background;
    visuals.extreme_bg_color = palette.composer_background;
    visuals.faint_bg_color = palette.panel_background;

    visuals.hyperlink_color = theme.accent_color;
    visuals.selection.bg_fill = theme.accent_color;
    visuals.widgets.active.bg_fill = theme.accent_color;
    visuals.widgets.hovered.bg_fill = theme.accent_color.gamma_multiply(0.85);

    let radius = f32::from(theme.panel_rounding);
    visuals.widgets.noninteractive.rounding = egui::Rounding::same(radius);
    visuals.widgets.inactive.rounding = egui::Rounding::same(radius);
    visuals.widgets.hovered.rounding = egui::Rounding::same(radius);
    visuals.widgets.active.rounding = egui::Rounding::same(radius);
    visuals.widgets.open.rounding = egui::Rounding::same(radius);

    visuals
}

pub fn scaled_text_styles(text_scale: f32) -> BTreeMap<egui::TextStyle, egui::FontId> {
    let mut styles = egui::Style::default().text_styles;
    for font in styles.values_mut() {
        font.size *= text_scale;
    }
    styles
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PersistedThemePreset {
    Coffee,
    Dark,
    Light,
    Cupcake,
    Forest,
    Synthwave,
    Retro,
    Night,
    Dracula,
    Winter,
}

impl From<ThemePreset> for PersistedThemePreset {
    fn from(value: ThemePreset) -> Self {
        match value {
            ThemePreset::Coffee => Self::Coffee,
            ThemePreset::Dark => Self::Dark,
            ThemePreset::Light => Self::Light,
            ThemePreset::Cupcake => Self::Cupcake,
            ThemePreset::Forest => Self::Forest,
            ThemePreset::Synthwave => Self::Synthwave,
            ThemePreset::Retro => Self::Retro,
            ThemePreset::Night => Self::Night,
            ThemePreset::Dracula => Self::Dracula,
            ThemePreset::Winter => Self::Winter,
        }
    }
}

impl From<PersistedThemePreset> for ThemePreset {
    fn from(value: PersistedThemePreset) -> Self {
        match value {
            PersistedThemePreset::Coffee => Self::Coffee,
            PersistedThemePreset::Dark => Self::Dark,
            PersistedThemePreset::Light => Self::Light,
            PersistedThemePreset::Cupcake => Self::Cupcake,
            PersistedThemePreset::Forest => Self::Forest,
            PersistedThemePreset::Synthwave => Self::Synthwave,
            PersistedThemePreset::Retro => Self::Retro,
            PersistedThemePreset::Night => Self::Night,
            PersistedThemePreset::Dracula => Self::Dracula,
            PersistedThemePreset::Winter => Self::Winter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedDesktopSettings {
    theme_preset: PersistedThemePreset,
    accent_color: [u8; 4],
    panel_rounding: u8,
    list_row_shading: bool,
    text_scale: f32,
    compact_density: bool,
    show_timestamps: bool,
    message_bubble_backgrounds: bool,
    sound_notifications: bool,
    composer_panel_height: f32,
}

impl Default for PersistedDesktopSettings {
    fn default() -> Self {
        let theme = ThemeSettings::coffee_default();
        let readability = UiReadabilitySettings::defaults();
        Self {
            theme_preset: theme.preset.into(),
            accent_color: [
                theme.accent_color.r(),
                theme.accent_color.g(),
                theme.accent_color.b(),
                theme.accent_color.a(),
            ],
            panel_rounding: theme.panel_rounding,
            list_row_shading: theme.list_row_shading,
            text_scale: readability.text_scale,
            compact_density: readability.compact_density,
            show_timestamps: readability.show_timestamps,
            message_bubble_backgrounds: readability.message_bubble_backgrounds,
            sound_notifications: true,
            composer_panel_height: DEFAULT_COMPOSER_PANEL_HEIGHT,
        }
    }
}

impl PersistedDesktopSettings {
    pub fn into_runtime(self) -> (ThemeSettings, UiReadabilitySettings, bool, f32) {
        (
            ThemeSettings {
                preset: self.theme_preset.into(),
                accent_color: egui::Color32::from_rgba_unmultiplied(
                    self.accent_color[0],
                    self.accent_color[1],
                    self.accent_color[2],
                    self.accent_color[3],
                ),
                panel_rounding: self.panel_rounding.min(16),
                list_row_shading: self.list_row_shading,
            },
            UiReadabilitySettings {
                text_scale: self.text_scale.clamp(0.8, 1.4),
                compact_density: self.compact_density,
                show_timestamps: self.show_timestamps,
                message_bubble_backgrounds: self.message_bubble_backgrounds,
            },
            self.sound_notifications,
            self.composer_panel_height
                .clamp(MIN_COMPOSER_PANEL_HEIGHT, MAX_COMPOSER_PANEL_HEIGHT),
        )
    }

    pub fn from_runtime(
        theme: ThemeSettings,
        readability: UiReadabilitySettings,
        sound_notifications: bool,
        composer_panel_height: f32,
    ) -> Self {
        Self {
            theme_preset: theme.preset.into(),
            accent_color: [
                theme.accent_color.r(),
                theme.accent_color.g(),
                theme.accent_color.b(),
                theme.accent_color.a(),
            ],
            panel_rounding: theme.panel_rounding,
            list_row_shading: theme.list_row_shading,
            text_scale: readability.text_scale,
            compact_density: readability.compact_density,
            show_timestamps: readability.show_timestamps,
            message_bubble_backgrounds: readability.message_bubble_backgrounds,
            sound_notifications,
            composer_panel_height: composer_panel_height
                .clamp(MIN_COMPOSER_PANEL_HEIGHT, MAX_COMPOSER_PANEL_HEIGHT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_survive_a_persistence_round_trip() {
        let mut theme = ThemeSettings::coffee_default();
        theme.preset = ThemePreset::Synthwave;
        theme.accent_color = egui::Color32::from_rgb(88, 199, 243);
        theme.panel_rounding = 4;
        theme.list_row_shading = false;

        let mut readability = UiReadabilitySettings::defaults();
        readability.text_scale = 1.2;
        readability.show_timestamps = false;

        let persisted = PersistedDesktopSettings::from_runtime(theme, readability, false, 120.0);
        let (theme_back, readability_back, sound_back, composer_back) = persisted.into_runtime();

        assert_eq!(theme_back, theme);
        assert_eq!(readability_back, readability);
        assert!(!sound_back);
        assert_eq!(composer_back, 120.0);
    }

    #[test]
    fn out_of_range_persisted_values_are_clamped() {
        let mut settings = PersistedDesktopSettings::default();
        settings.text_scale = 9.0;
        settings.panel_rounding = 99;
        settings.composer_panel_height = 1000.0;

        let (theme, readability, _, composer_height) = settings.into_runtime();
        assert_eq!(theme.panel_rounding, 16);
        assert_eq!(readability.text_scale, 1.4);
        assert_eq!(composer_height, MAX_COMPOSER_PANEL_HEIGHT);
    }

    #[test]
    fn empty_persisted_blob_falls_back_to_coffee_defaults() {
        let settings: PersistedDesktopSettings =
            serde_json::from_str("{}").expect("empty object should deserialize via defaults");
        let (theme, readability, sound, composer_height) = settings.into_runtime();

        assert_eq!(theme.preset, ThemePreset::Coffee);
        assert_eq!(readability.text_scale, 1.0);
        assert!(sound);
        assert_eq!(composer_height, DEFAULT_COMPOSER_PANEL_HEIGHT);
    }

    #[test]
    fn preset_labels_are_unique() {
        let mut labels: Vec<&str> = ThemePreset::ALL.iter().map(|p| p.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ThemePreset::ALL.len());
    }
}
