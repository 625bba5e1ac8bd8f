//! 24-bit RGB palette for terminal output.

use std::io::IsTerminal;

use owo_colors::{OwoColorize, Rgb};

use crate::scoring::RelevanceTier;

/// Colors used by the dashboard and command output.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// High relevance and success messages - green (34, 197, 94)
    pub high: Rgb,
    /// Medium relevance and warnings - yellow (234, 179, 8)
    pub medium: Rgb,
    /// Low relevance - gray (156, 163, 175)
    pub low: Rgb,
    /// Errors - red (239, 68, 68)
    pub error: Rgb,
    /// Section headings - cyan (34, 211, 238)
    pub heading: Rgb,
    /// Secondary text - gray (107, 114, 128)
    pub muted: Rgb,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            high: Rgb(34, 197, 94),
            medium: Rgb(234, 179, 8),
            low: Rgb(156, 163, 175),
            error: Rgb(239, 68, 68),
            heading: Rgb(34, 211, 238),
            muted: Rgb(107, 114, 128),
        }
    }
}

impl Theme {
    pub fn tier(&self, tier: RelevanceTier) -> Rgb {
        match tier {
            RelevanceTier::High => self.high,
            RelevanceTier::Medium => self.medium,
            RelevanceTier::Low => self.low,
        }
    }
}

/// Applies the theme, or passes text through untouched when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Paint {
    pub theme: Theme,
    enabled: bool,
}

impl Paint {
    pub fn new(enabled: bool) -> Self {
        Self {
            theme: Theme::default(),
            enabled,
        }
    }

    /// Color for stdout: on only when stdout is a terminal and neither the
    /// flag nor the `NO_COLOR` variable disables it.
    pub fn detect(no_color_flag: bool) -> Self {
        Self::new(color_wanted(
            no_color_flag,
            std::env::var_os("NO_COLOR").is_some(),
            std::io::stdout().is_terminal(),
        ))
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn color(&self, text: &str, rgb: Rgb) -> String {
        if self.enabled {
            text.color(rgb).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: &str, rgb: Rgb) -> String {
        if self.enabled {
            text.color(rgb).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn color_wanted(no_color_flag: bool, no_color_env: bool, stdout_is_tty: bool) -> bool {
    stdout_is_tty && !no_color_flag && !no_color_env
}
