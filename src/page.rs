//! Seams between the reconciliation engine and the browser.
//!
//! The engine only talks to the host page, the modal and the clock through
//! these traits; `crate::ui` and `crate::browser` implement them with web-sys,
//! the tests with in-memory fakes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;

use crate::button::ButtonView;
use crate::detail::DetailView;

/// Product cards on a search results page
pub const PRODUCT_SELECTOR: &str = r#"div[data-asin]:not([data-asin=""])"#;
pub const ASIN_ATTRIBUTE: &str = "data-asin";
pub const BUTTON_SELECTOR: &str = ".product-collector-btn";
pub const TITLE_SELECTOR: &str = "h2";

/// Sections a button may follow, in order of preference
pub const INSERTION_SELECTORS: [&str; 4] = [
    r#"div[data-cy="price-recipe"]"#,
    ".puis-atcb-container, .a-button-stack",
    r#"div[data-cy="delivery-recipe"]"#,
    r#"div[data-cy="product-details-recipe"]"#,
];

/// Let the host page finish its own rendering before the first scan
pub const SETTLE_DELAY: Duration = Duration::from_millis(1500);
/// Delay before a scan requested by DOM mutations
pub const RESCAN_DEBOUNCE: Duration = Duration::from_millis(300);
/// Unconditional re-scan for mutations the observer missed
pub const SAFETY_NET_INTERVAL: Duration = Duration::from_millis(3000);
/// Processing label animation
pub const DOTS_INTERVAL: Duration = Duration::from_millis(500);
/// How long a failed write shows its error before reverting
pub const ERROR_REVERT_DELAY: Duration = Duration::from_millis(3000);
/// How long the reset notice stays next to a button
pub const NOTICE_DURATION: Duration = Duration::from_millis(5000);

/// Event handler handed to the page
pub type Handler = Box<dyn FnMut()>;

/// Search result pages are the only ones buttons are added to
pub fn is_listing_page(href: &str) -> bool {
    href.contains("/s?") || href.contains("/search")
}

/// The host page as seen by the scanner and the button renderer
pub trait ProductPage {
    type Node: Clone + PartialEq + std::fmt::Debug + 'static;

    /// All elements matching [`PRODUCT_SELECTOR`], in document order
    fn product_containers(&self) -> Vec<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// First descendant of `scope` matching a CSS selector
    fn query(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node>;

    /// Nearest ancestor carrying a class, else the direct parent
    fn styled_ancestor(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Resolved `href` of the node itself or of its closest enclosing link
    fn link_target(&self, node: &Self::Node) -> Option<String>;

    /// Still attached to the document
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Create a button right after `anchor`; `None` if `anchor` has no parent
    fn insert_button_after(&self, anchor: &Self::Node, asin: &str) -> Option<Self::Node>;

    /// Paint `view` onto `button`, replacing any handlers from earlier renders
    fn render_button(
        &self,
        button: &Self::Node,
        view: &ButtonView,
        on_click: Option<Handler>,
        on_details: Option<Handler>,
    );

    /// Short-lived note next to a button, removed after [`NOTICE_DURATION`]
    fn show_notice(&self, button: &Self::Node, text: &str);
}

/// The single product detail dialog
pub trait DetailModal {
    fn show_loading(&self);
    fn show_detail(&self, view: DetailView, raw: Option<String>);
    fn show_error(&self, message: &str);
}

/// Clock, timers and task spawning
pub trait Scheduler {
    /// Cancels its interval when dropped
    type Ticker: 'static;

    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()>;
    fn every(&self, period: Duration, tick: Handler) -> Self::Ticker;
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}
