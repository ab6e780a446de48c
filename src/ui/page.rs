/// The Amazon search results page, seen through web-sys
use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlAnchorElement, HtmlButtonElement, HtmlElement, MouseEvent};

use crate::browser::millis;
use crate::button::ButtonView;
use crate::detail::DetailView;
use crate::page::{ASIN_ATTRIBUTE, DetailModal, Handler, NOTICE_DURATION, PRODUCT_SELECTOR, ProductPage};
use crate::ui::modal::{ModalContent, show_modal};

const WRAPPER_CLASS: &str = "product-collector-wrap";
const BUTTON_CLASS: &str = "product-collector-btn";
const INFO_CLASS: &str = "product-info-btn";
const NOTICE_CLASS: &str = "status-notification";

const WRAPPER_STYLE: &str =
    "display: flex; gap: 5px; align-items: center; margin: 5px 0; position: relative;";
const BUTTON_STYLE: &str = "font-weight: bold; border: none; padding: 8px 12px; margin: 5px 0; border-radius: 3px; display: block; width: 100%;";
const INFO_STYLE: &str = "background: transparent; border: none; cursor: pointer; font-size: 16px; padding: 0; width: 24px; height: 24px;";
const NOTICE_STYLE: &str = "position: absolute; top: -15px; left: 50%; transform: translateX(-50%); background-color: rgba(76, 175, 80, 0.9); color: white; padding: 3px 8px; border-radius: 10px; font-size: 11px; white-space: nowrap; box-shadow: 0 1px 3px rgba(0,0,0,0.2); z-index: 10;";

type ClickClosure = Closure<dyn FnMut(MouseEvent)>;

/// Keeps the closures installed on one button and its info control alive
struct Installed {
    button: Element,
    _on_click: Option<ClickClosure>,
    _on_details: Option<ClickClosure>,
}

pub struct DomPage {
    document: Document,
    installed: RefCell<Vec<Installed>>,
}

impl DomPage {
    pub fn from_window() -> Option<DomPage> {
        let document = web_sys::window()?.document()?;
        Some(DomPage {
            document,
            installed: RefCell::new(Vec::new()),
        })
    }

    fn create(&self, tag: &str, class: &str, style: &str) -> Option<HtmlElement> {
        let element = self.document.create_element(tag).ok()?;
        element.set_class_name(class);
        element.set_attribute("style", style).ok()?;
        element.dyn_into::<HtmlElement>().ok()
    }

    /// The info control next to `button`, created or removed as needed
    fn info_control(&self, button: &Element, wanted: bool) -> Option<HtmlElement> {
        let wrapper = button.parent_element()?;
        let existing = wrapper
            .query_selector(&format!(".{}", INFO_CLASS))
            .ok()
            .flatten();

        match (existing, wanted) {
            (Some(info), true) => info.dyn_into::<HtmlElement>().ok(),
            (Some(info), false) => {
                info.remove();
                None
            }
            (None, true) => {
                let info = self.create("button", INFO_CLASS, INFO_STYLE)?;
                info.set_text_content(Some("ℹ️"));
                info.set_title("View product details");
                wrapper.append_child(&info).ok()?;
                Some(info)
            }
            (None, false) => None,
        }
    }
}

fn click_closure(mut handler: Handler) -> ClickClosure {
    Closure::wrap(Box::new(move |event: MouseEvent| {
        event.prevent_default();
        event.stop_propagation();
        handler();
    }) as Box<dyn FnMut(MouseEvent)>)
}

fn set_style(element: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = element.style().set_property(property, value) {
        log::debug!("Could not set {}: {:?}", property, e);
    }
}

impl ProductPage for DomPage {
    type Node = Element;

    fn product_containers(&self) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(PRODUCT_SELECTOR) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn query(&self, scope: &Element, selector: &str) -> Option<Element> {
        match scope.query_selector(selector) {
            Ok(found) => found,
            Err(e) => {
                log::debug!("Invalid selector {}: {:?}", selector, e);
                None
            }
        }
    }

    fn styled_ancestor(&self, node: &Element) -> Option<Element> {
        let parent = node.parent_element()?;
        let mut current = Some(parent.clone());
        while let Some(element) = current {
            if !element.class_name().is_empty() {
                return Some(element);
            }
            current = element.parent_element();
        }
        Some(parent)
    }

    fn link_target(&self, node: &Element) -> Option<String> {
        let link = node.closest("a").ok().flatten()?;
        let href = link.dyn_into::<HtmlAnchorElement>().ok()?.href();
        (!href.is_empty()).then_some(href)
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn insert_button_after(&self, anchor: &Element, asin: &str) -> Option<Element> {
        let parent = anchor.parent_node()?;

        let wrapper = self.create("div", WRAPPER_CLASS, WRAPPER_STYLE)?;
        let button = self.create("button", BUTTON_CLASS, BUTTON_STYLE)?;
        button.set_attribute(ASIN_ATTRIBUTE, asin).ok()?;
        wrapper.append_child(&button).ok()?;

        let next = anchor.next_sibling();
        parent.insert_before(&wrapper, next.as_ref()).ok()?;
        Some(button.into())
    }

    fn render_button(
        &self,
        button: &Element,
        view: &ButtonView,
        on_click: Option<Handler>,
        on_details: Option<Handler>,
    ) {
        let Some(html) = button.dyn_ref::<HtmlElement>() else {
            return;
        };

        html.set_text_content(Some(&view.label));
        set_style(html, "background-color", view.background);
        set_style(html, "color", view.foreground);
        set_style(html, "cursor", if view.is_clickable() { "pointer" } else { "default" });
        if let Some(element) = button.dyn_ref::<HtmlButtonElement>() {
            element.set_disabled(view.disabled);
        }

        let on_click = on_click.map(click_closure);
        html.set_onclick(
            on_click
                .as_ref()
                .map(|c| c.as_ref().unchecked_ref::<js_sys::Function>()),
        );

        let info = self.info_control(button, view.show_details);
        let on_details = match (&info, on_details) {
            (Some(info), Some(handler)) => {
                let closure = click_closure(handler);
                info.set_onclick(Some(closure.as_ref().unchecked_ref()));
                Some(closure)
            }
            (Some(info), None) => {
                info.set_onclick(None);
                None
            }
            (None, _) => None,
        };

        // Earlier closures for this button are dropped here, after the
        // element stopped referencing them
        let mut installed = self.installed.borrow_mut();
        installed.retain(|entry| entry.button.is_connected() && entry.button != *button);
        installed.push(Installed {
            button: button.clone(),
            _on_click: on_click,
            _on_details: on_details,
        });
    }

    fn show_notice(&self, button: &Element, text: &str) {
        let Some(wrapper) = button.parent_element() else {
            return;
        };
        let Some(notice) = self.create("div", NOTICE_CLASS, NOTICE_STYLE) else {
            return;
        };
        notice.set_text_content(Some(text));
        if wrapper.append_child(&notice).is_err() {
            return;
        }

        Timeout::new(millis(NOTICE_DURATION), move || notice.remove()).forget();
    }
}

impl DetailModal for DomPage {
    fn show_loading(&self) {
        show_modal(ModalContent::Loading);
    }

    fn show_detail(&self, view: DetailView, raw: Option<String>) {
        show_modal(ModalContent::Detail { view, raw });
    }

    fn show_error(&self, message: &str) {
        show_modal(ModalContent::Failed(message.to_string()));
    }
}
