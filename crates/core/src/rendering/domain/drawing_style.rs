use serde::{Deserialize, Serialize};

use crate::shared::frame::PixelFormat;

/// Color as a blue, green, red triple, the capture byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgrColor(pub [u8; 3]);

impl BgrColor {
    pub const WHITE: BgrColor = BgrColor([255, 255, 255]);
    pub const GREEN: BgrColor = BgrColor([0, 255, 0]);
    pub const BLUE: BgrColor = BgrColor([255, 0, 0]);

    pub fn new(b: u8, g: u8, r: u8) -> Self {
        Self([b, g, r])
    }

    /// Bytes to write into a frame of the given format.
    pub fn bytes_for(&self, format: PixelFormat) -> [u8; 3] {
        let [b, g, r] = self.0;
        match format {
            PixelFormat::Bgr => [b, g, r],
            PixelFormat::Rgb => [r, g, b],
        }
    }
}

/// Style of the dot drawn at each landmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointStyle {
    pub color: BgrColor,
    /// Ring thickness in pixels; negative fills the circle.
    pub thickness: i32,
    pub radius: u32,
    /// Ring drawn just outside the dot so it stays visible on any background.
    pub border: Option<BgrColor>,
}

impl PointStyle {
    /// Border radius: one pixel larger, or 20% larger for big dots.
    pub fn border_radius(&self) -> u32 {
        (self.radius + 1).max((self.radius as f64 * 1.2) as u32)
    }
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            color: BgrColor::GREEN,
            thickness: 1,
            radius: 1,
            border: Some(BgrColor::WHITE),
        }
    }
}

/// Style of the line drawn for each mesh connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: BgrColor,
    pub thickness: u32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: BgrColor::BLUE,
            thickness: 1,
        }
    }
}

/// Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawingStyle {
    pub point: PointStyle,
    pub line: LineStyle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let style = DrawingStyle::default();
        assert_eq!(style.point.color, BgrColor::new(0, 255, 0));
        assert_eq!(style.point.thickness, 1);
        assert_eq!(style.point.radius, 1);
        assert_eq!(style.line.color, BgrColor::new(255, 0, 0));
        assert_eq!(style.line.thickness, 1);
    }

    #[test]
    fn test_bytes_for_format() {
        let c = BgrColor::new(1, 2, 3);
        assert_eq!(c.bytes_for(PixelFormat::Bgr), [1, 2, 3]);
        assert_eq!(c.bytes_for(PixelFormat::Rgb), [3, 2, 1]);
    }

    #[rstest]
    #[case(1, 2)]
    #[case(2, 3)]
    #[case(10, 12)]
    fn test_border_radius(#[case] radius: u32, #[case] expected: u32) {
        let style = PointStyle {
            radius,
            ..PointStyle::default()
        };
        assert_eq!(style.border_radius(), expected);
    }
}
