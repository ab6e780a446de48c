/// Browser services behind the engine's seams
mod bridge;
mod fetch;
mod timers;
mod watcher;

pub use bridge::{ChromeConfigStore, listen_for_settings};
pub use fetch::FetchTransport;
pub(crate) use timers::millis;
pub use timers::BrowserScheduler;
pub use watcher::watch_for_products;
