//! # Printer Configuration
//!
//! Hardware and media characteristics of a connected label printer. The
//! transpiler takes a snapshot of this at the start of each compile; the
//! driver refreshes it from [`ConfigUpdate`] messages as config dumps
//! arrive.
//!
//! ## Calculations
//!
//! ```text
//! dots_per_mm = dpi / 25.4
//!
//! For a 203 DPI, 4-inch printhead:
//!   dots_per_mm ≈ 8
//!   print_width_dots = 812
//! ```

use serde::Serialize;

use crate::command::PrintSpeed;
use crate::message::ConfigUpdate;

/// Printer hardware/media snapshot.
///
/// `print_width_dots` is the physical printhead width; `label_width_dots`
/// is the loaded media, which may be narrower.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrinterConfig {
    pub model: String,
    pub firmware: Option<String>,
    pub serial_number: Option<String>,

    /// Resolution in dots per inch.
    pub dpi: u16,

    /// Physical printhead width in dots.
    pub print_width_dots: u16,

    /// Loaded label width in dots.
    pub label_width_dots: u16,

    /// Loaded label height in dots, if known (continuous media has none).
    pub label_height_dots: Option<u16>,

    /// Gap between labels in dots, for gapped media.
    pub label_gap_dots: Option<u16>,

    /// Darkness as a percentage (0-100).
    pub darkness_percent: u8,

    pub speed: PrintSpeed,
}

impl Default for PrinterConfig {
    /// Generic 203 DPI, 4-inch (812 dot) direct-thermal unit.
    fn default() -> Self {
        Self {
            model: "unknown".into(),
            firmware: None,
            serial_number: None,
            dpi: 203,
            print_width_dots: 812,
            label_width_dots: 812,
            label_height_dots: None,
            label_gap_dots: None,
            darkness_percent: 50,
            speed: PrintSpeed::Medium,
        }
    }
}

impl PrinterConfig {
    /// Dots per millimeter at this resolution.
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Fold a decoded config dump into this snapshot. Absent fields leave
    /// the current values untouched.
    pub fn apply_update(&mut self, update: &ConfigUpdate) {
        if let Some(model) = &update.model {
            self.model = model.clone();
        }
        if let Some(firmware) = &update.firmware {
            self.firmware = Some(firmware.clone());
        }
        if let Some(serial) = &update.serial_number {
            self.serial_number = Some(serial.clone());
        }
        if let Some(darkness) = update.darkness_percent {
            self.darkness_percent = darkness;
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(width) = update.label_width_dots {
            self.label_width_dots = width;
        }
        if let Some(height) = update.label_height_dots {
            self.label_height_dots = Some(height);
        }
        if let Some(gap) = update.label_gap_dots {
            self.label_gap_dots = Some(gap);
        }
        if let Some(width) = update.print_width_dots {
            self.print_width_dots = width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrinterConfig::default();
        assert_eq!(config.dpi, 203);
        assert_eq!(config.print_width_dots, 812);
        assert!((config.dots_per_mm() - 7.99).abs() < 0.01);
    }

    #[test]
    fn test_apply_update_merges() {
        let mut config = PrinterConfig::default();
        config.apply_update(&ConfigUpdate {
            darkness_percent: Some(80),
            label_width_dots: Some(600),
            ..Default::default()
        });
        assert_eq!(config.darkness_percent, 80);
        assert_eq!(config.label_width_dots, 600);
        // untouched fields keep defaults
        assert_eq!(config.speed, PrintSpeed::Medium);
        assert_eq!(config.model, "unknown");
    }

    #[test]
    fn test_apply_empty_update_is_noop() {
        let mut config = PrinterConfig::default();
        let before = config.clone();
        config.apply_update(&ConfigUpdate::default());
        assert_eq!(config, before);
    }
}
