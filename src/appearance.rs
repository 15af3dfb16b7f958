//! Terminal appearance state and the value grammar shared by `config`.
//!
//! Colors can be given by name, as a `#RRGGBB` hex string, or as an RGB
//! triplet of 0..1 floats spread over three argv words. A color of `None`
//! means "use the host theme color"; that distinction matters because only
//! explicitly chosen colors are persisted.

use crate::store::KeyValueStore;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FONT_SIZE_KEY: &str = "fontSize";
pub const FONT_NAME_KEY: &str = "fontName";
pub const BACKGROUND_KEY: &str = "backgroundColor";
pub const FOREGROUND_KEY: &str = "foregroundColor";
pub const CURSOR_COLOR_KEY: &str = "cursorColor";
pub const CURSOR_SHAPE_KEY: &str = "cursorShape";

pub const FACTORY_FONT_SIZE: f32 = 13.0;
pub const FACTORY_FONT_NAME: &str = "Menlo";
pub const FACTORY_CURSOR_SHAPE: CursorShape = CursorShape::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorShape {
    Beam,
    Block,
    Underline,
}

impl CursorShape {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "BEAM" => Some(CursorShape::Beam),
            "BLOCK" => Some(CursorShape::Block),
            "UNDERLINE" => Some(CursorShape::Underline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CursorShape::Beam => "BEAM",
            CursorShape::Block => "BLOCK",
            CursorShape::Underline => "UNDERLINE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

static NAMED_COLORS: Lazy<HashMap<&'static str, Color>> = Lazy::new(|| {
    let mut names = HashMap::new();
    let mut add = |name: &'static str, red: f32, green: f32, blue: f32| {
        names.insert(name, Color { red, green, blue });
    };
    add("black", 0.0, 0.0, 0.0);
    add("white", 1.0, 1.0, 1.0);
    add("red", 1.0, 0.0, 0.0);
    add("green", 0.0, 1.0, 0.0);
    add("blue", 0.0, 0.0, 1.0);
    add("yellow", 1.0, 1.0, 0.0);
    add("cyan", 0.0, 1.0, 1.0);
    add("magenta", 1.0, 0.0, 1.0);
    add("orange", 1.0, 0.5, 0.0);
    add("purple", 0.5, 0.0, 0.5);
    add("brown", 0.6, 0.4, 0.2);
    add("gray", 0.5, 0.5, 0.5);
    add("grey", 0.5, 0.5, 0.5);
    names
});

impl Color {
    pub fn from_name(name: &str) -> Option<Color> {
        NAMED_COLORS.get(name.to_lowercase().as_str()).copied()
    }

    /// `#RRGGBB`, case-insensitive.
    pub fn from_hex(text: &str) -> Option<Color> {
        let digits = text.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Color {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }

    /// Three consecutive argv words after `position` as 0..1 floats.
    /// Words starting with `-` are options, never color components.
    pub fn from_components(args: &[String], position: usize) -> Option<Color> {
        if position + 3 >= args.len() {
            return None;
        }
        let component = |text: &String| {
            if text.starts_with('-') {
                None
            } else {
                text.parse::<f32>().ok()
            }
        };
        Some(Color {
            red: component(&args[position + 1])?,
            green: component(&args[position + 2])?,
            blue: component(&args[position + 3])?,
        })
    }

    pub fn to_hex_string(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            byte(self.red),
            byte(self.green),
            byte(self.blue)
        )
    }
}

/// One window's terminal appearance. `None` fields fall back to the host:
/// theme colors for colors, and the factory font until the user picks one.
/// Serializable so hosts can carry window state across restarts wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub background: Option<Color>,
    #[serde(default)]
    pub foreground: Option<Color>,
    #[serde(default)]
    pub cursor_color: Option<Color>,
    #[serde(default)]
    pub cursor_shape: Option<CursorShape>,
}

/// A partial appearance parsed from a `config` command line. `None` fields
/// were not mentioned; for colors, `Some(None)` means "reset to the host
/// theme color" (the factory value) as opposed to not mentioned at all.
#[derive(Debug, Clone, Default)]
pub struct AppearanceUpdate {
    pub font_size: Option<f32>,
    pub font_name: Option<String>,
    pub background: Option<Option<Color>>,
    pub foreground: Option<Option<Color>>,
    pub cursor_color: Option<Option<Color>>,
    pub cursor_shape: Option<CursorShape>,
}

impl AppearanceUpdate {
    pub fn is_empty(&self) -> bool {
        self.font_size.is_none()
            && self.font_name.is_none()
            && self.background.is_none()
            && self.foreground.is_none()
            && self.cursor_color.is_none()
            && self.cursor_shape.is_none()
    }
}

impl Appearance {
    pub fn factory() -> Self {
        Self {
            font_size: Some(FACTORY_FONT_SIZE),
            font_name: Some(FACTORY_FONT_NAME.to_string()),
            background: None,
            foreground: None,
            cursor_color: None,
            cursor_shape: Some(FACTORY_CURSOR_SHAPE),
        }
    }

    /// The stored defaults, field by field, with factory values where
    /// nothing was stored.
    pub fn stored(store: &dyn KeyValueStore) -> Self {
        Self {
            font_size: store.get_f32(FONT_SIZE_KEY).or(Some(FACTORY_FONT_SIZE)),
            font_name: store
                .get_string(FONT_NAME_KEY)
                .or_else(|| Some(FACTORY_FONT_NAME.to_string())),
            background: store
                .get_string(BACKGROUND_KEY)
                .as_deref()
                .and_then(Color::from_hex),
            foreground: store
                .get_string(FOREGROUND_KEY)
                .as_deref()
                .and_then(Color::from_hex),
            cursor_color: store
                .get_string(CURSOR_COLOR_KEY)
                .as_deref()
                .and_then(Color::from_hex),
            cursor_shape: store
                .get_string(CURSOR_SHAPE_KEY)
                .as_deref()
                .and_then(CursorShape::parse)
                .or(Some(FACTORY_CURSOR_SHAPE)),
        }
    }

    /// Applies the mentioned fields of `update`, leaving the rest alone.
    pub fn apply(&mut self, update: &AppearanceUpdate) {
        if let Some(size) = update.font_size {
            self.font_size = Some(size);
        }
        if let Some(name) = &update.font_name {
            self.font_name = Some(name.clone());
        }
        if let Some(background) = update.background {
            self.background = background;
        }
        if let Some(foreground) = update.foreground {
            self.foreground = foreground;
        }
        if let Some(cursor_color) = update.cursor_color {
            self.cursor_color = cursor_color;
        }
        if let Some(shape) = update.cursor_shape {
            self.cursor_shape = Some(shape);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn hex_colors_round_trip() {
        let color = Color::from_hex("#00FF00").unwrap();
        assert_eq!(color, Color { red: 0.0, green: 1.0, blue: 0.0 });
        assert_eq!(color.to_hex_string(), "#00FF00");
        assert!(Color::from_hex("00FF00").is_none());
        assert!(Color::from_hex("#00FF0").is_none());
        assert!(Color::from_hex("#GGFF00").is_none());
    }

    #[test]
    fn named_colors_are_case_insensitive() {
        assert_eq!(Color::from_name("RED"), Color::from_name("red"));
        assert!(Color::from_name("red").is_some());
        assert!(Color::from_name("heliotrope").is_none());
    }

    #[test]
    fn triplets_parse_and_reject_options() {
        let args: Vec<String> = ["config", "-b", "0", "0.5", "1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            Color::from_components(&args, 1),
            Some(Color { red: 0.0, green: 0.5, blue: 1.0 })
        );

        let args: Vec<String> = ["config", "-b", "0", "-f", "1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(Color::from_components(&args, 1), None);
    }

    #[test]
    fn cursor_shapes_parse_case_insensitively() {
        assert_eq!(CursorShape::parse("beam"), Some(CursorShape::Beam));
        assert_eq!(CursorShape::parse("BLOCK"), Some(CursorShape::Block));
        assert_eq!(CursorShape::parse("wedge"), None);
    }

    #[test]
    fn stored_appearance_falls_back_to_factory() {
        let store = MemoryStore::new();
        let appearance = Appearance::stored(&store);
        assert_eq!(appearance.font_size, Some(FACTORY_FONT_SIZE));
        assert_eq!(appearance.font_name.as_deref(), Some(FACTORY_FONT_NAME));
        assert_eq!(appearance.background, None);

        store.set(FONT_SIZE_KEY, json!(15.0));
        store.set(BACKGROUND_KEY, json!("#000000"));
        let appearance = Appearance::stored(&store);
        assert_eq!(appearance.font_size, Some(15.0));
        assert_eq!(
            appearance.background,
            Some(Color { red: 0.0, green: 0.0, blue: 0.0 })
        );
    }

    #[test]
    fn apply_only_touches_mentioned_fields() {
        let mut appearance = Appearance::factory();
        appearance.background = Some(Color { red: 1.0, green: 1.0, blue: 1.0 });

        let update = AppearanceUpdate {
            font_size: Some(16.0),
            // explicit reset to the host theme
            background: Some(None),
            ..Default::default()
        };
        appearance.apply(&update);

        assert_eq!(appearance.font_size, Some(16.0));
        assert_eq!(appearance.background, None);
        assert_eq!(appearance.font_name.as_deref(), Some(FACTORY_FONT_NAME));
    }
}
