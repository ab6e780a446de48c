/// Button states and how each one looks
use chrono::{DateTime, Utc};

use crate::product::{ProductStatus, format_short_date};

pub const CHECKING_LABEL: &str = "Checking...";
pub const ERROR_LABEL: &str = "Error ✗";
pub const RESET_NOTICE: &str = "Removed status reset";

const GREY: &str = "#cccccc";
const ORANGE: &str = "#FF9900";
const PURPLE: &str = "#6A1B9A";
const BLUE: &str = "#0277BD";
const GREEN: &str = "#2E7D32";
const RED: &str = "#C62828";
const DARK_GREY: &str = "#757575";
const BLACK: &str = "black";
const WHITE: &str = "white";

/// What a click on the main button does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Report,
    ResetRemoved,
}

/// A remote write in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processing {
    Sending,
    Fixing,
}

impl Processing {
    fn verb(&self) -> &'static str {
        match self {
            Processing::Sending => "Sending",
            Processing::Fixing => "Fixing",
        }
    }
}

/// Where a button is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Checking,
    Settled(ProductStatus),
    Busy(Processing),
    Failed,
}

/// Everything needed to paint one product button
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonView {
    pub label: String,
    pub background: &'static str,
    pub foreground: &'static str,
    pub action: Option<ButtonAction>,
    pub disabled: bool,
    /// Show the info control that opens the detail modal
    pub show_details: bool,
}

impl ButtonView {
    fn plain(label: String, background: &'static str, foreground: &'static str) -> ButtonView {
        ButtonView {
            label,
            background,
            foreground,
            action: None,
            disabled: false,
            show_details: false,
        }
    }

    /// Placeholder while the status lookup runs
    pub fn checking() -> ButtonView {
        ButtonView::plain(CHECKING_LABEL.to_string(), GREY, BLACK)
    }

    pub fn for_status(status: ProductStatus, date: Option<&DateTime<Utc>>) -> ButtonView {
        let dated = |label: &str| match date {
            Some(d) => format!("{} ({})", label, format_short_date(d)),
            None => label.to_string(),
        };

        let view = match status {
            ProductStatus::Unreported => ButtonView {
                action: Some(ButtonAction::Report),
                ..ButtonView::plain("Report".to_string(), ORANGE, BLACK)
            },
            ProductStatus::Staged => ButtonView {
                action: Some(ButtonAction::Report),
                ..ButtonView::plain(dated("Staged"), PURPLE, WHITE)
            },
            ProductStatus::ToAssess => ButtonView {
                action: Some(ButtonAction::Report),
                ..ButtonView::plain("In Database (click to re-add)".to_string(), BLUE, WHITE)
            },
            ProductStatus::Reported => ButtonView {
                action: Some(ButtonAction::Report),
                ..ButtonView::plain(dated("Reported"), GREEN, WHITE)
            },
            ProductStatus::NeedsUpdate => ButtonView {
                action: Some(ButtonAction::ResetRemoved),
                ..ButtonView::plain("Fix Removed Status".to_string(), RED, WHITE)
            },
            ProductStatus::Removed => ButtonView {
                disabled: true,
                ..ButtonView::plain("Removed".to_string(), DARK_GREY, WHITE)
            },
        };

        ButtonView {
            show_details: status.is_tracked(),
            ..view
        }
    }

    /// Write in flight. `dots` is `None` for the initial `...` label,
    /// otherwise the animation frame (0 to 3 dots).
    pub fn processing(kind: Processing, dots: Option<usize>) -> ButtonView {
        let label = match dots {
            None => format!("{}...", kind.verb()),
            Some(n) => format!("{}{}", kind.verb(), ".".repeat(n % 4)),
        };
        ButtonView {
            disabled: true,
            ..ButtonView::plain(label, GREY, BLACK)
        }
    }

    /// Transient failure after a write; interaction stays blocked until it reverts
    pub fn failed() -> ButtonView {
        ButtonView {
            disabled: true,
            ..ButtonView::plain(ERROR_LABEL.to_string(), RED, WHITE)
        }
    }

    pub fn is_clickable(&self) -> bool {
        self.action.is_some() && !self.disabled
    }
}

/// Next animation frame for a processing label
pub fn next_dots(dots: usize) -> usize {
    (dots + 1) % 4
}
