use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    Ocean,
}

impl ThemeName {
    pub const ALL: [ThemeName; 3] = [ThemeName::Dark, ThemeName::Light, ThemeName::Ocean];

    pub fn label(self) -> &'static str {
        match self {
            ThemeName::Dark => "Dark",
            ThemeName::Light => "Light",
            ThemeName::Ocean => "Ocean",
        }
    }

    pub fn is_dark(self) -> bool {
        !matches!(self, ThemeName::Light)
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub app_background: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub header: Color32,
    pub accent_primary: Color32,
    pub user_bubble: Color32,
    pub bot_bubble: Color32,
    pub code_background: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    pub spacing_8: f32,
    pub spacing_12: f32,
    pub radius_8: u8,
    pub radius_bubble: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Self::for_name(ThemeName::default())
    }
}

impl Theme {
    pub const R8: u8 = 8;
    pub const R20: u8 = 20;
    pub const P8: f32 = 8.0;
    pub const P12: f32 = 12.0;

    pub fn for_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self {
                name,
                app_background: Color32::from_rgb(0x12, 0x12, 0x12),
                surface_1: Color32::from_rgb(0x1E, 0x1E, 0x1E),
                surface_2: Color32::from_rgb(0x2E, 0x2E, 0x2E),
                header: Color32::from_rgb(0x33, 0x33, 0x33),
                accent_primary: Color32::from_rgb(0x00, 0x7B, 0xFF),
                user_bubble: Color32::from_rgb(0x1A, 0x73, 0xE8),
                bot_bubble: Color32::from_rgb(0x2E, 0x2E, 0x2E),
                code_background: Color32::from_rgb(0x22, 0x22, 0x22),
                danger: Color32::from_rgb(0xE7, 0x4C, 0x3C),
                text_primary: Color32::from_rgb(0xE0, 0xE0, 0xE0),
                text_muted: Color32::from_rgb(0xAA, 0xAA, 0xAA),
                text_on_accent: Color32::WHITE,
                ..Self::base(name)
            },
            ThemeName::Light => Self {
                name,
                app_background: Color32::from_rgb(0xF7, 0xF7, 0xF7),
                surface_1: Color32::WHITE,
                surface_2: Color32::from_rgb(0xF1, 0xF0, 0xF0),
                header: Color32::from_rgb(0x00, 0x7B, 0xFF),
                accent_primary: Color32::from_rgb(0x00, 0x7B, 0xFF),
                user_bubble: Color32::from_rgb(0x00, 0x7B, 0xFF),
                bot_bubble: Color32::from_rgb(0xF1, 0xF0, 0xF0),
                code_background: Color32::from_rgb(0x22, 0x22, 0x22),
                danger: Color32::from_rgb(0xE7, 0x4C, 0x3C),
                text_primary: Color32::from_rgb(0x33, 0x33, 0x33),
                text_muted: Color32::from_rgb(0x88, 0x88, 0x88),
                text_on_accent: Color32::WHITE,
                ..Self::base(name)
            },
            ThemeName::Ocean => Self::base(name),
        }
    }

    fn base(name: ThemeName) -> Self {
        Self {
            name,
            app_background: Color32::from_rgb(0x0F, 0x11, 0x15),
            surface_1: Color32::from_rgb(0x16, 0x1A, 0x20),
            surface_2: Color32::from_rgb(0x1C, 0x22, 0x2B),
            header: Color32::from_rgb(0x22, 0x2A, 0x35),
            accent_primary: Color32::from_rgb(0x3B, 0x82, 0xF6),
            user_bubble: Color32::from_rgb(0x2F, 0x6E, 0xD8),
            bot_bubble: Color32::from_rgb(0x22, 0x2A, 0x35),
            code_background: Color32::from_rgb(0x0F, 0x11, 0x15),
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            text_primary: Color32::from_rgb(0xE6, 0xED, 0xF3),
            text_muted: Color32::from_rgb(0x8B, 0x94, 0x9E),
            text_on_accent: Color32::from_rgb(0xF8, 0xFB, 0xFF),
            spacing_8: Self::P8,
            spacing_12: Self::P12,
            radius_8: Self::R8,
            radius_bubble: Self::R20,
        }
    }

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = if self.name.is_dark() {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        visuals.panel_fill = self.surface_1;
        visuals.extreme_bg_color = self.surface_2;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.noninteractive.fg_stroke.color = self.text_primary;
        visuals.widgets.inactive.bg_stroke = Stroke::NONE;
        visuals.widgets.hovered.bg_stroke = Stroke::NONE;
        visuals.widgets.active.bg_fill = self.accent_primary;
        visuals.selection.bg_fill = self.accent_primary;
        visuals.hyperlink_color = self.accent_primary;
        visuals.window_fill = self.surface_1;
        visuals.window_corner_radius = CornerRadius::same(self.radius_8);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(18.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn bubble_frame(&self, fill: Color32, error: bool) -> Frame {
        let stroke = if error {
            Stroke::new(2.0, self.danger)
        } else {
            Stroke::NONE
        };
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::symmetric(15, 10))
            .corner_radius(CornerRadius::same(self.radius_bubble))
            .stroke(stroke)
    }

    pub fn code_frame(&self) -> Frame {
        Frame::new()
            .fill(self.code_background)
            .inner_margin(Margin::same(self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(4))
    }

    pub fn composer_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_2)
            .inner_margin(Margin::same(self.spacing_12 as i8))
    }
}

#[cfg(test)]
mod tests {
    use super::{Theme, ThemeName};

    #[test]
    fn theme_names_round_trip_as_snake_case() {
        for name in ThemeName::ALL {
            let json = serde_json::to_string(&name).expect("theme name should serialize");
            let restored: ThemeName = serde_json::from_str(&json).expect("theme name should parse");
            assert_eq!(restored, name);
        }
        assert_eq!(
            serde_json::to_string(&ThemeName::Ocean).expect("should serialize"),
            "\"ocean\""
        );
    }

    #[test]
    fn each_name_builds_its_own_palette() {
        let dark = Theme::for_name(ThemeName::Dark);
        let light = Theme::for_name(ThemeName::Light);
        assert_eq!(dark.name, ThemeName::Dark);
        assert_ne!(dark.surface_1, light.surface_1);
        assert!(!ThemeName::Light.is_dark());
    }
}
