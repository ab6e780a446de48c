//! Product Collector - Chrome content script for Amazon search results
//! Built with Rust + WASM + Yew

pub mod asin;
pub mod button;
pub mod classify;
pub mod config;
pub mod detail;
pub mod engine;
pub mod error;
pub mod page;
pub mod product;
pub mod remote;

#[cfg(target_arch = "wasm32")]
pub mod browser;
#[cfg(target_arch = "wasm32")]
pub mod ui;

#[cfg(test)]
mod testing;

#[cfg(target_arch = "wasm32")]
mod content {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    use crate::browser::{
        BrowserScheduler, ChromeConfigStore, FetchTransport, listen_for_settings,
        watch_for_products,
    };
    use crate::config::apply_debug_mode;
    use crate::engine::Reconciler;
    use crate::page::is_listing_page;
    use crate::remote::{ConfigStore, RemoteClient};
    use crate::ui::DomPage;

    type ContentEngine = Reconciler<DomPage, FetchTransport, ChromeConfigStore, BrowserScheduler>;

    thread_local! {
        static ENGINE: RefCell<Option<Rc<ContentEngine>>> = const { RefCell::new(None) };
    }

    // Set up panic hook and logging, then attach to the page
    #[wasm_bindgen(start)]
    pub fn main() {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
        apply_debug_mode(false);
        listen_for_settings();

        spawn_local(run());
    }

    async fn run() {
        let config = ChromeConfigStore.load().await;
        apply_debug_mode(config.debug_mode);

        let href = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default();
        if !is_listing_page(&href) {
            log::debug!("Not a search results page: {}", href);
            return;
        }
        log::info!("Product Collector loaded on {}", href);

        let Some(page) = DomPage::from_window() else {
            log::warn!("No document to attach to");
            return;
        };

        let client = RemoteClient::new(FetchTransport, ChromeConfigStore);
        let engine = Reconciler::new(page, client, BrowserScheduler);
        engine.start();

        let weak = Rc::downgrade(&engine);
        let watching = watch_for_products(move || {
            if let Some(engine) = weak.upgrade() {
                engine.request_rescan();
            }
        });
        if let Err(e) = watching {
            log::warn!("Could not watch for new products, relying on periodic scans: {:?}", e);
        }

        ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));
    }
}
