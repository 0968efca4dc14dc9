use std::time::Duration;

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};
use tracing::debug;

/// Terminal identity as far as the environment tells it, used to decide
/// whether probing stdio for a graphics protocol is worth the wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TerminalHints {
    pub kitty_window: bool,
    pub xterm_kitty: bool,
    pub iterm: bool,
    pub tmux: bool,
}

impl TerminalHints {
    pub fn from_env() -> Self {
        let non_blank = |key: &str| {
            std::env::var(key)
                .ok()
                .is_some_and(|value| !value.trim().is_empty())
        };
        let contains = |key: &str, needle: &str| {
            std::env::var(key)
                .ok()
                .is_some_and(|value| value.contains(needle))
        };

        Self {
            kitty_window: non_blank("KITTY_WINDOW_ID"),
            xterm_kitty: std::env::var("TERM")
                .ok()
                .is_some_and(|term| term.trim().starts_with("xterm-kitty")),
            iterm: non_blank("ITERM_SESSION_ID")
                || contains("TERM_PROGRAM", "iTerm")
                || contains("LC_TERMINAL", "iTerm"),
            tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    pub fn should_query(&self) -> bool {
        // TERM survives ssh even when KITTY_WINDOW_ID does not; tmux hides
        // the outer terminal, so it always needs a query.
        self.kitty_window || self.xterm_kitty || self.iterm || self.tmux
    }

    pub fn query_timeout(&self) -> Duration {
        if self.kitty_window || self.xterm_kitty || self.iterm {
            return Duration::from_millis(1500);
        }
        if self.tmux {
            return Duration::from_millis(300);
        }
        Duration::ZERO
    }

    fn kitty_supported(&self, picker: &Picker) -> bool {
        if self.iterm {
            return false;
        }
        self.kitty_window
            || picker
                .capabilities()
                .iter()
                .any(|cap| matches!(cap, Capability::Kitty))
    }
}

/// Probes the terminal when the hints suggest a graphics protocol, and
/// falls back to halfblocks otherwise or on failure.
pub(crate) fn detect_picker(hints: TerminalHints, background: image::Rgba<u8>) -> Picker {
    if hints.tmux {
        allow_tmux_passthrough();
    }

    let mut picker = if hints.should_query() {
        let mut options = QueryStdioOptions::default();
        options.timeout = hints.query_timeout();
        options.text_sizing_protocol = false;
        Picker::from_query_stdio_with_options(options).unwrap_or_else(|err| {
            debug!(%err, "terminal graphics query failed");
            Picker::halfblocks()
        })
    } else {
        Picker::halfblocks()
    };
    picker.set_background_color(background);
    if hints.kitty_supported(&picker) {
        picker.set_protocol_type(ProtocolType::Kitty);
    }
    debug!(protocol = protocol_label(&picker), "image protocol selected");
    picker
}

fn allow_tmux_passthrough() {
    // Best effort; old tmux versions reject the option.
    let _ = std::process::Command::new("tmux")
        .args(["set-option", "-g", "allow-passthrough", "on"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

pub(crate) fn image_supported(picker: &Picker) -> bool {
    !matches!(picker.protocol_type(), ProtocolType::Halfblocks)
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}
