//! Marker (billboard) styling for point entities

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ColorError {
    #[error("Invalid CSS color '{0}': expected #RRGGBB or #RRGGBBAA")]
    InvalidHex(String),
}

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    /// CSS royalblue (#4169E1)
    pub const ROYAL_BLUE: Color = Color::from_bytes(0x41, 0x69, 0xE1, 0xFF);

    pub const fn from_bytes(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`
    pub fn from_css_hex(s: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError::InvalidHex(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 { byte(6)? } else { 0xFF };
        Ok(Self::from_bytes(byte(0)?, byte(2)?, byte(4)?, alpha))
    }

    /// Format as `#RRGGBBAA`
    pub fn to_css_hex(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

/// Where the marker image is anchored relative to its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalOrigin {
    Center,
    /// Pin tip sits on the position
    #[default]
    Bottom,
    Top,
}

/// Visual style of a point entity: a map pin drawn facing the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub color: Color,
    /// Pin edge length in pixels
    pub size: u32,
    /// Multiplier applied to `size` at draw time
    pub scale: f64,
    pub vertical_origin: VerticalOrigin,
}

/// Builds the fixed pin style shared by every airport marker
#[derive(Debug, Clone, PartialEq)]
pub struct PinBuilder {
    pub color: Color,
    pub size: u32,
}

impl PinBuilder {
    pub const DEFAULT_SIZE: u32 = 48;

    pub fn new(color: Color, size: u32) -> Self {
        Self { color, size }
    }

    pub fn build(&self, scale: f64) -> Marker {
        Marker {
            color: self.color,
            size: self.size,
            scale,
            vertical_origin: VerticalOrigin::Bottom,
        }
    }
}

impl Default for PinBuilder {
    fn default() -> Self {
        Self::new(Color::ROYAL_BLUE, Self::DEFAULT_SIZE)
    }
}
