/// Mutation watching for cards the host page adds after load
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord};

use crate::page::{ASIN_ATTRIBUTE, PRODUCT_SELECTOR};

/// Call `on_products` whenever a batch of mutations adds product cards.
pub fn watch_for_products<F: Fn() + 'static>(on_products: F) -> Result<(), JsValue> {
    let body = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
        .ok_or_else(|| JsValue::from_str("document has no body"))?;

    let callback = Closure::wrap(Box::new(move |records: js_sys::Array, _: MutationObserver| {
        let adds_products = records
            .iter()
            .map(|record| record.unchecked_into::<MutationRecord>())
            .any(|record| adds_product(&record));
        if adds_products {
            log::debug!("Product cards added, scheduling a scan");
            on_products();
        }
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(&body, &options)?;

    // The observer is kept alive by the document for the page lifetime
    callback.forget();
    Ok(())
}

fn adds_product(record: &MutationRecord) -> bool {
    let added = record.added_nodes();
    (0..added.length())
        .filter_map(|i| added.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .any(|element| {
            element.has_attribute(ASIN_ATTRIBUTE)
                || matches!(element.query_selector(PRODUCT_SELECTOR), Ok(Some(_)))
        })
}
