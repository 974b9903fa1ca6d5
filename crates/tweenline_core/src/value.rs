//! Animatable property values
//!
//! Targets expose their fields as one of three shapes: a number, an array of
//! numbers, or text. Text is only animatable when it holds a hex color
//! (`#RGB` or `#RRGGBB`).

use serde::{Deserialize, Serialize};

/// A property value read from or written to a target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Array(Vec<f64>),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<f64>> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Parse the value as a hex color, if it is one
    pub fn as_color(&self) -> Option<Rgb> {
        self.as_text().and_then(Rgb::parse_hex)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Array(values)
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(values: [f64; N]) -> Self {
        Value::Array(values.to_vec())
    }
}

impl From<&[f64]> for Value {
    fn from(values: &[f64]) -> Self {
        Value::Array(values.to_vec())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Rgb> for Value {
    fn from(color: Rgb) -> Self {
        Value::Text(color.to_hex())
    }
}

/// An RGB color with channels normalized to `[0, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `#RGB` (case-insensitive)
    ///
    /// The short form expands each digit, so `#0F8` is `#00FF88`.
    pub fn parse_hex(text: &str) -> Option<Rgb> {
        let digits = text.strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let packed = match digits.len() {
            6 => u32::from_str_radix(digits, 16).ok()?,
            3 => {
                let short = u32::from_str_radix(digits, 16).ok()?;
                let r = (short >> 8) & 0xF;
                let g = (short >> 4) & 0xF;
                let b = short & 0xF;
                (r * 0x11) << 16 | (g * 0x11) << 8 | b * 0x11
            }
            _ => return None,
        };

        Some(Rgb::from_packed(packed))
    }

    /// Whether `text` is a color accepted by [`Rgb::parse_hex`]
    pub fn is_hex(text: &str) -> bool {
        Rgb::parse_hex(text).is_some()
    }

    pub fn from_packed(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as f64 / 255.0,
            g: ((packed >> 8) & 0xFF) as f64 / 255.0,
            b: (packed & 0xFF) as f64 / 255.0,
        }
    }

    /// Pack into `0xRRGGBB`, truncating each scaled channel toward zero
    pub fn to_packed(&self) -> u32 {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0) as u32;
        channel(self.r) << 16 | channel(self.g) << 8 | channel(self.b)
    }

    /// Format as uppercase `#RRGGBB`
    pub fn to_hex(&self) -> String {
        format!("#{:06X}", self.to_packed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_hex() {
        assert_eq!(Rgb::parse_hex("#FFFFFF"), Some(Rgb::WHITE));
        assert_eq!(Rgb::parse_hex("#000"), Some(Rgb::BLACK));
        assert_eq!(
            Rgb::parse_hex("#0f8").map(|c| c.to_hex()),
            Some("#00FF88".to_string())
        );
    }

    #[test]
    fn test_rejects_non_colors() {
        assert!(!Rgb::is_hex("FFFFFF"));
        assert!(!Rgb::is_hex("#FFFF"));
        assert!(!Rgb::is_hex("#GGGGGG"));
        assert!(!Rgb::is_hex("#+12345"));
    }

    #[test]
    fn test_to_hex_truncates_channels() {
        let mid = Rgb::new(0.5, 0.5, 0.5);
        assert_eq!(mid.to_hex(), "#7F7F7F");
        assert_eq!(Rgb::BLACK.to_hex(), "#000000");
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let values: Vec<Value> = serde_json::from_str(r##"[1.5, [1, 2], "#ABCDEF"]"##).unwrap();
        assert_eq!(values[0], Value::Number(1.5));
        assert_eq!(values[1], Value::Array(vec![1.0, 2.0]));
        assert!(values[2].as_color().is_some());
    }
}
