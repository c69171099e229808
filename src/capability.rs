use std::env;

use log::debug;

use crate::encoder::Transport;

/// Terminal types known to speak SIXEL
const SIXEL_TERMS: &[&str] = &[
    "xterm",
    "mlterm",
    "wezterm",
    "foot",
    "mintty",
    "xterm-256color",
    "sixel",
];

/// Terminal programs known to speak SIXEL
const SIXEL_PROGRAMS: &[&str] = &["iterm.app", "wezterm", "mintty", "foot"];

/// Terminal types that imply 24-bit color
const TRUECOLOR_TERMS: &[&str] = &[
    "xterm-256color",
    "screen-256color",
    "tmux-256color",
    "xterm-direct",
    "alacritty",
];

/// Terminal programs that render 24-bit color
const TRUECOLOR_PROGRAMS: &[&str] = &["iterm.app", "wezterm", "hyper", "vscode", "mintty"];

/// Fallback cell dimensions when nothing can be queried
pub const FALLBACK_SIZE: (u16, u16) = (120, 30);

/// Detected terminal capabilities, re-sampled on resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCapabilities {
    /// Width in character cells
    pub width: u16,
    /// Height in character cells
    pub height: u16,
    /// SIXEL bitmap graphics support
    pub sixel: bool,
    /// 24-bit color support
    pub true_color: bool,
    /// 256-color palette support
    pub color256: bool,
    /// UTF-8 capable locale
    pub unicode: bool,
}

impl TerminalCapabilities {
    /// Whether the given transport can be used on this terminal
    pub fn supports(&self, transport: Transport) -> bool {
        match transport {
            Transport::Sixel => self.sixel,
            Transport::HalfBlock => self.true_color && self.unicode,
            Transport::IndexedColor => self.color256 && self.unicode,
            Transport::Grayscale => true,
        }
    }

    /// Best transport for this terminal, in preference order
    pub fn preferred_transport(&self) -> Transport {
        [
            Transport::Sixel,
            Transport::HalfBlock,
            Transport::IndexedColor,
        ]
        .into_iter()
        .find(|t| self.supports(*t))
        .unwrap_or(Transport::Grayscale)
    }
}

/// Detect capabilities from the live environment and terminal device
pub fn detect() -> TerminalCapabilities {
    let size = crossterm::terminal::size().ok();
    let caps = detect_from(|name| env::var(name).ok(), size);
    debug!(
        "Detected terminal: {}x{} sixel={} truecolor={} 256color={} unicode={}",
        caps.width, caps.height, caps.sixel, caps.true_color, caps.color256, caps.unicode
    );
    caps
}

/// Re-query only the cell dimensions (used by the resize check)
pub fn current_size() -> (u16, u16) {
    match crossterm::terminal::size() {
        Ok(size) => size,
        Err(_) => size_from_env(|name| env::var(name).ok()),
    }
}

/// Detect capabilities from an explicit environment lookup.
///
/// `size` is the cell size reported by the terminal device, if any; the
/// lookup supplies the environment variables. Split out this way so tests
/// can probe arbitrary environments without mutating the process state.
pub fn detect_from<F>(lookup: F, size: Option<(u16, u16)>) -> TerminalCapabilities
where
    F: Fn(&str) -> Option<String>,
{
    let (width, height) = size.unwrap_or_else(|| size_from_env(&lookup));

    let term = lookup("TERM").unwrap_or_default().to_lowercase();
    let program = lookup("TERM_PROGRAM").unwrap_or_default().to_lowercase();
    let colorterm = lookup("COLORTERM").unwrap_or_default().to_lowercase();
    let windows = is_windows(&lookup);

    let sixel = contains_any(&term, SIXEL_TERMS)
        || contains_any(&program, SIXEL_PROGRAMS)
        || (windows && lookup("WT_SESSION").is_some() && windows_terminal_recent(&lookup));

    let true_color = colorterm == "truecolor"
        || colorterm == "24bit"
        || contains_any(&term, TRUECOLOR_TERMS)
        || contains_any(&program, TRUECOLOR_PROGRAMS)
        || lookup("WT_SESSION").is_some()
        || lookup("ConEmuANSI").map(|v| v == "ON").unwrap_or(false);

    // 256-color support is near-universal, so it is assumed rather
    // than detected.
    let color256 = true;

    let unicode = ["LANG", "LC_ALL", "LC_CTYPE"].iter().any(|name| {
        lookup(name)
            .map(|v| {
                let v = v.to_uppercase();
                v.contains("UTF-8") || v.contains("UTF8")
            })
            .unwrap_or(false)
    }) || windows;

    TerminalCapabilities {
        width,
        height,
        sixel,
        true_color,
        color256,
        unicode,
    }
}

fn size_from_env<F>(lookup: F) -> (u16, u16)
where
    F: Fn(&str) -> Option<String>,
{
    let parse = |name: &str| lookup(name).and_then(|v| v.parse::<u16>().ok()).filter(|v| *v > 0);
    match (parse("COLUMNS"), parse("LINES")) {
        (Some(w), Some(h)) => (w, h),
        _ => FALLBACK_SIZE,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    !haystack.is_empty() && needles.iter().any(|n| haystack.contains(n))
}

fn is_windows<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    cfg!(windows)
        || lookup("OS").map(|v| v.contains("Windows")).unwrap_or(false)
        || lookup("PSModulePath").is_some()
}

/// Windows Terminal gained SIXEL in 1.22; older builds only pretend.
fn windows_terminal_recent<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let version = match lookup("TERM_PROGRAM_VERSION") {
        Some(v) => v,
        None => return false,
    };
    let mut parts = version.split('.');
    let major: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    major > 1 || (major == 1 && minor >= 22)
}
