//! The single product detail modal.
//!
//! One Yew app is mounted into `#product-details-modal` on first use and fed
//! new props for every show. If the host page removed the mount point, a
//! fresh one is created.

use std::cell::RefCell;

use yew::AppHandle;
use yew::prelude::*;

use crate::detail::DetailView;
use crate::ui::components::{Alert, DetailPanel, Spinner};

pub const MODAL_ID: &str = "product-details-modal";

const OVERLAY_STYLE: &str = "position: fixed; top: 0; left: 0; width: 100%; height: 100%; background-color: rgba(0, 0, 0, 0.7); display: flex; justify-content: center; align-items: center; z-index: 9999;";
const PANEL_STYLE: &str = "background-color: white; padding: 20px; border-radius: 5px; max-width: 800px; max-height: 80vh; overflow-y: auto; position: relative; color: #333; font-family: Arial, sans-serif;";
const CLOSE_STYLE: &str = "position: absolute; top: 10px; right: 10px; border: none; background: none; font-size: 24px; cursor: pointer; color: #555;";

#[derive(Clone, PartialEq)]
pub enum ModalContent {
    Hidden,
    Loading,
    Detail { view: DetailView, raw: Option<String> },
    Failed(String),
}

#[derive(Properties, PartialEq)]
pub struct ModalProps {
    pub content: ModalContent,
    pub on_close: Callback<()>,
}

#[function_component(ProductModal)]
pub fn product_modal(props: &ModalProps) -> Html {
    let body = match &props.content {
        ModalContent::Hidden => return html! {},
        ModalContent::Loading => html! {
            <Spinner message={Some("Loading product details...".to_string())} />
        },
        ModalContent::Detail { view, raw } => html! {
            <DetailPanel view={view.clone()} raw={raw.clone()} />
        },
        ModalContent::Failed(message) => html! {
            <Alert message={message.clone()} />
        },
    };

    let close = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };
    let keep_open = Callback::from(|e: MouseEvent| e.stop_propagation());

    html! {
        <div class="modal-overlay" style={OVERLAY_STYLE} onclick={close.clone()}>
            <div class="modal-content" style={PANEL_STYLE} onclick={keep_open}>
                <button style={CLOSE_STYLE} onclick={close}>{"×"}</button>
                {body}
            </div>
        </div>
    }
}

struct ModalHost {
    root: web_sys::Element,
    app: AppHandle<ProductModal>,
}

thread_local! {
    static MODAL: RefCell<Option<ModalHost>> = const { RefCell::new(None) };
}

fn props(content: ModalContent) -> ModalProps {
    ModalProps {
        content,
        on_close: Callback::from(|_| show_modal(ModalContent::Hidden)),
    }
}

fn mount() -> Option<ModalHost> {
    let document = web_sys::window()?.document()?;
    let body = document.body()?;

    if let Some(stale) = document.get_element_by_id(MODAL_ID) {
        stale.remove();
    }
    let root = document.create_element("div").ok()?;
    root.set_id(MODAL_ID);
    body.append_child(&root).ok()?;

    let app = yew::Renderer::<ProductModal>::with_root_and_props(
        root.clone(),
        props(ModalContent::Hidden),
    )
    .render();
    Some(ModalHost { root, app })
}

/// Replace whatever the modal shows
pub fn show_modal(content: ModalContent) {
    MODAL.with(|slot| {
        let mut slot = slot.borrow_mut();
        if !slot.as_ref().is_some_and(|host| host.root.is_connected()) {
            if content == ModalContent::Hidden {
                return;
            }
            *slot = mount();
        }
        match slot.as_mut() {
            Some(host) => host.app.update(props(content)),
            None => log::warn!("Could not mount the product details modal"),
        }
    });
}
