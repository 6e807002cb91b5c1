//! Terminal styling and color detection.
//!
//! Text output uses a small fixed palette. Every renderer takes a
//! [`ColorPalette`] so tests can render with [`ColorPalette::plain`].

/// ANSI escape codes used by the text renderers.
pub mod colors {
    /// Reset all styling.
    pub const RESET: &str = "\x1b[0m";
    /// Bright bold white for headings and titles.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for secondary details.
    pub const GRAY: &str = "\x1b[90m";
    /// Green for upward travel.
    pub const GREEN: &str = "\x1b[32m";
    /// Cyan for downward travel.
    pub const CYAN: &str = "\x1b[36m";
    /// Yellow for warnings.
    pub const YELLOW: &str = "\x1b[33m";
    /// Red for errors.
    pub const RED: &str = "\x1b[31m";
}

/// Resolved color codes, either ANSI sequences or empty strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub heading: &'static str,
    pub muted: &'static str,
    pub up: &'static str,
    pub down: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            heading: colors::WHITE_BOLD,
            muted: colors::GRAY,
            up: colors::GREEN,
            down: colors::CYAN,
            warning: colors::YELLOW,
            error: colors::RED,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            heading: "",
            muted: "",
            up: "",
            down: "",
            warning: "",
            error: "",
        }
    }

    /// Palette matching the terminal's capabilities.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Check whether ANSI colors should be used.
///
/// Honours `NO_COLOR` (<https://no-color.org/>) and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.eq_ignore_ascii_case("dumb") {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_palette_is_empty() {
        let palette = ColorPalette::plain();
        for code in [
            palette.reset,
            palette.heading,
            palette.muted,
            palette.up,
            palette.down,
            palette.warning,
            palette.error,
        ] {
            assert!(code.is_empty());
        }
    }

    #[test]
    fn colored_palette_uses_escape_codes() {
        let palette = ColorPalette::colored();
        assert_eq!(palette.reset, colors::RESET);
        assert!(palette.warning.starts_with("\x1b["));
    }
}
