//! Icon metadata attached to plugins, tabs and providers.
//!
//! Icons are stored once and referenced by identity, so the three fields
//! together form the natural key.

use serde::{Deserialize, Serialize};

/// Longest icon name the storage layer accepts.
pub const ICON_NAME_MAX: usize = 50;

/// Icon family, matching the Font Awesome style sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Family {
    #[default]
    Solid,
    Regular,
    Brand,
}

impl Family {
    /// Stored name of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Solid => "SOLID",
            Family::Regular => "REGULAR",
            Family::Brand => "BRAND",
        }
    }
}

/// Material palette color for an icon. `None` renders in the default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Red,
    Pink,
    Purple,
    DeepPurple,
    Indigo,
    Blue,
    LightBlue,
    Cyan,
    Teal,
    Green,
    LightGreen,
    Lime,
    Yellow,
    Amber,
    Orange,
    DeepOrange,
    Brown,
    Grey,
    BlueGrey,
    Black,
    #[default]
    None,
}

impl Color {
    /// Stored name of the color.
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Pink => "PINK",
            Color::Purple => "PURPLE",
            Color::DeepPurple => "DEEP_PURPLE",
            Color::Indigo => "INDIGO",
            Color::Blue => "BLUE",
            Color::LightBlue => "LIGHT_BLUE",
            Color::Cyan => "CYAN",
            Color::Teal => "TEAL",
            Color::Green => "GREEN",
            Color::LightGreen => "LIGHT_GREEN",
            Color::Lime => "LIME",
            Color::Yellow => "YELLOW",
            Color::Amber => "AMBER",
            Color::Orange => "ORANGE",
            Color::DeepOrange => "DEEP_ORANGE",
            Color::Brown => "BROWN",
            Color::Grey => "GREY",
            Color::BlueGrey => "BLUE_GREY",
            Color::Black => "BLACK",
            Color::None => "NONE",
        }
    }
}

/// An icon reference: name plus style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Icon {
    /// Icon name (e.g., "gavel", "user").
    pub name: String,
    /// Style family.
    #[serde(default)]
    pub family: Family,
    /// Display color.
    #[serde(default)]
    pub color: Color,
}

impl Icon {
    /// Create an icon, truncating the name to [`ICON_NAME_MAX`] characters.
    pub fn new(name: impl Into<String>, family: Family, color: Color) -> Self {
        let name: String = name.into();
        let name = if name.chars().count() > ICON_NAME_MAX {
            name.chars().take(ICON_NAME_MAX).collect()
        } else {
            name
        };
        Self {
            name,
            family,
            color,
        }
    }

    /// Solid icon in the default color.
    pub fn solid(name: impl Into<String>) -> Self {
        Self::new(name, Family::Solid, Color::None)
    }

    /// Set the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

impl Default for Icon {
    fn default() -> Self {
        Self::solid("question")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_icon_is_solid_question() {
        let icon = Icon::default();
        assert_eq!(icon.name, "question");
        assert_eq!(icon.family, Family::Solid);
        assert_eq!(icon.color, Color::None);
    }

    #[test]
    fn long_names_are_truncated() {
        let icon = Icon::solid("x".repeat(80));
        assert_eq!(icon.name.len(), ICON_NAME_MAX);
    }

    #[test]
    fn stored_names_match_serde() {
        let json = serde_json::to_string(&Color::DeepOrange).unwrap();
        assert_eq!(json, format!("\"{}\"", Color::DeepOrange.as_str()));
        let json = serde_json::to_string(&Family::Brand).unwrap();
        assert_eq!(json, format!("\"{}\"", Family::Brand.as_str()));
    }
}
