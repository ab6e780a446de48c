//! In-memory stand-ins for the browser, used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;

use crate::button::ButtonView;
use crate::config::Configuration;
use crate::detail::DetailView;
use crate::page::{
    ASIN_ATTRIBUTE, BUTTON_SELECTOR, DetailModal, Handler, PRODUCT_SELECTOR, ProductPage,
    Scheduler, TITLE_SELECTOR,
};
use crate::remote::{ConfigStore, HttpRequest, HttpResponse, Method, Transport};

type Reply = Result<HttpResponse, String>;

#[derive(Default)]
struct TransportState {
    routes: HashMap<(Method, String), HttpResponse>,
    deferred: HashMap<(Method, String), oneshot::Receiver<Reply>>,
    requests: Vec<HttpRequest>,
}

/// Canned HTTP responses keyed by method and URL. Unknown routes fail like an
/// unreachable host.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Rc<RefCell<TransportState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every later request to this route; replaces an earlier answer.
    pub fn respond(&self, method: Method, url: &str, status: u16, body: &str) {
        self.state.borrow_mut().routes.insert(
            (method, url.to_string()),
            HttpResponse {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Hold the next request to this route until the returned sender fires.
    pub fn respond_later(&self, method: Method, url: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.state
            .borrow_mut()
            .deferred
            .insert((method, url.to_string()), rx);
        tx
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.borrow().requests.clone()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, Reply> {
        let key = (request.method, request.url.clone());
        let mut state = self.state.borrow_mut();
        state.requests.push(request);

        if let Some(rx) = state.deferred.remove(&key) {
            return async move { rx.await.unwrap_or_else(|_| Err("reply dropped".to_string())) }
                .boxed_local();
        }

        let reply = state
            .routes
            .get(&key)
            .cloned()
            .ok_or_else(|| format!("connection refused: {}", key.1));
        future::ready(reply).boxed_local()
    }
}

/// Shared configuration the tests can change between calls
#[derive(Clone)]
pub struct FakeConfig {
    config: Rc<RefCell<Configuration>>,
}

impl FakeConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        FakeConfig {
            config: Rc::new(RefCell::new(Configuration {
                base_url: base_url.to_string(),
                debug_mode: false,
            })),
        }
    }

    pub fn set_base_url(&self, base_url: &str) {
        self.config.borrow_mut().base_url = base_url.to_string();
    }

    pub fn set_debug_mode(&self, debug_mode: bool) {
        self.config.borrow_mut().debug_mode = debug_mode;
    }
}

impl ConfigStore for FakeConfig {
    fn load(&self) -> LocalBoxFuture<'_, Configuration> {
        future::ready(self.config.borrow().clone()).boxed_local()
    }
}

#[derive(Debug, Default)]
struct FakeNode {
    parent: Option<usize>,
    children: Vec<usize>,
    /// Selectors this node matches, compared verbatim
    selectors: Vec<String>,
    attrs: HashMap<String, String>,
    has_class: bool,
    href: Option<String>,
    connected: bool,
}

type SharedHandler = Rc<RefCell<Handler>>;

#[derive(Default)]
struct ButtonSlots {
    on_click: Option<SharedHandler>,
    on_details: Option<SharedHandler>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalEvent {
    Loading,
    Detail(DetailView, Option<String>),
    Error(String),
}

#[derive(Default)]
struct PageState {
    nodes: RefCell<Vec<FakeNode>>,
    renders: RefCell<Vec<(usize, ButtonView)>>,
    slots: RefCell<HashMap<usize, ButtonSlots>>,
    notices: RefCell<Vec<(usize, String)>>,
    modal: RefCell<Vec<ModalEvent>>,
    scans: Cell<usize>,
}

/// A tiny node tree standing in for the search results page
#[derive(Clone, Default)]
pub struct FakePage {
    state: Rc<PageState>,
}

/// Nodes of a card built by [`FakePage::product_card`]
#[derive(Debug, Clone, Copy)]
pub struct Card {
    pub container: usize,
    pub title: usize,
    pub price: usize,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&self, selectors: &[&str]) -> usize {
        self.create(None, selectors)
    }

    pub fn add(&self, parent: usize, selectors: &[&str]) -> usize {
        self.create(Some(parent), selectors)
    }

    fn create(&self, parent: Option<usize>, selectors: &[&str]) -> usize {
        let mut nodes = self.state.nodes.borrow_mut();
        let id = nodes.len();
        nodes.push(FakeNode {
            parent,
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            connected: true,
            ..FakeNode::default()
        });
        if let Some(parent) = parent {
            nodes[parent].children.push(id);
        }
        id
    }

    /// Card with a title and a price section
    pub fn product_card(&self, asin: &str) -> Card {
        let container = self.add_root(&[PRODUCT_SELECTOR]);
        self.set_attr(container, ASIN_ATTRIBUTE, asin);
        let title = self.add(container, &[TITLE_SELECTOR]);
        let price = self.add(container, &[r#"div[data-cy="price-recipe"]"#]);
        Card {
            container,
            title,
            price,
        }
    }

    pub fn set_attr(&self, node: usize, name: &str, value: &str) {
        self.state.nodes.borrow_mut()[node]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn attr(&self, node: usize, name: &str) -> Option<String> {
        self.state.nodes.borrow()[node].attrs.get(name).cloned()
    }

    pub fn set_class(&self, node: usize) {
        self.state.nodes.borrow_mut()[node].has_class = true;
    }

    pub fn set_href(&self, node: usize, href: &str) {
        self.state.nodes.borrow_mut()[node].href = Some(href.to_string());
    }

    /// Detach a node and everything below it
    pub fn remove(&self, node: usize) {
        let mut nodes = self.state.nodes.borrow_mut();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            nodes[id].connected = false;
            stack.extend(nodes[id].children.iter().copied());
        }
    }

    pub fn previous_sibling(&self, node: usize) -> Option<usize> {
        let nodes = self.state.nodes.borrow();
        let parent = nodes[node].parent?;
        let siblings = &nodes[parent].children;
        let index = siblings.iter().position(|&c| c == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Attached buttons in creation order
    pub fn buttons(&self) -> Vec<usize> {
        let nodes = self.state.nodes.borrow();
        (0..nodes.len())
            .filter(|&id| nodes[id].connected)
            .filter(|&id| nodes[id].selectors.iter().any(|s| s == BUTTON_SELECTOR))
            .collect()
    }

    pub fn views(&self, button: usize) -> Vec<ButtonView> {
        self.state
            .renders
            .borrow()
            .iter()
            .filter(|(id, _)| *id == button)
            .map(|(_, view)| view.clone())
            .collect()
    }

    pub fn labels(&self, button: usize) -> Vec<String> {
        self.views(button).into_iter().map(|v| v.label).collect()
    }

    pub fn last_view(&self, button: usize) -> Option<ButtonView> {
        self.views(button).pop()
    }

    pub fn render_count(&self, button: usize) -> usize {
        self.views(button).len()
    }

    pub fn has_click_handler(&self, button: usize) -> bool {
        self.state
            .slots
            .borrow()
            .get(&button)
            .is_some_and(|s| s.on_click.is_some())
    }

    pub fn has_details_handler(&self, button: usize) -> bool {
        self.state
            .slots
            .borrow()
            .get(&button)
            .is_some_and(|s| s.on_details.is_some())
    }

    /// Fire the current click handler, if any
    pub fn click(&self, button: usize) {
        let handler = self
            .state
            .slots
            .borrow()
            .get(&button)
            .and_then(|s| s.on_click.clone());
        if let Some(handler) = handler {
            (handler.borrow_mut())();
        }
    }

    pub fn click_details(&self, button: usize) {
        let handler = self
            .state
            .slots
            .borrow()
            .get(&button)
            .and_then(|s| s.on_details.clone());
        if let Some(handler) = handler {
            (handler.borrow_mut())();
        }
    }

    pub fn notices(&self, button: usize) -> Vec<String> {
        self.state
            .notices
            .borrow()
            .iter()
            .filter(|(id, _)| *id == button)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn modal_events(&self) -> Vec<ModalEvent> {
        self.state.modal.borrow().clone()
    }

    /// How often the product containers were listed
    pub fn scan_count(&self) -> usize {
        self.state.scans.get()
    }

    fn descendants(&self, scope: usize) -> Vec<usize> {
        let nodes = self.state.nodes.borrow();
        let mut found = Vec::new();
        let mut stack: Vec<usize> = nodes[scope].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            found.push(id);
            stack.extend(nodes[id].children.iter().rev().copied());
        }
        found
    }
}

impl ProductPage for FakePage {
    type Node = usize;

    fn product_containers(&self) -> Vec<usize> {
        self.state.scans.set(self.state.scans.get() + 1);
        let nodes = self.state.nodes.borrow();
        (0..nodes.len())
            .filter(|&id| nodes[id].connected)
            .filter(|&id| nodes[id].selectors.iter().any(|s| s == PRODUCT_SELECTOR))
            .filter(|&id| {
                nodes[id]
                    .attrs
                    .get(ASIN_ATTRIBUTE)
                    .is_some_and(|a| !a.is_empty())
            })
            .collect()
    }

    fn attribute(&self, node: &usize, name: &str) -> Option<String> {
        self.attr(*node, name)
    }

    fn query(&self, scope: &usize, selector: &str) -> Option<usize> {
        let candidates = self.descendants(*scope);
        let nodes = self.state.nodes.borrow();
        candidates
            .into_iter()
            .filter(|&id| nodes[id].connected)
            .find(|&id| nodes[id].selectors.iter().any(|s| s == selector))
    }

    fn styled_ancestor(&self, node: &usize) -> Option<usize> {
        let nodes = self.state.nodes.borrow();
        let parent = nodes[*node].parent?;
        let mut current = Some(parent);
        while let Some(id) = current {
            if nodes[id].has_class {
                return Some(id);
            }
            current = nodes[id].parent;
        }
        Some(parent)
    }

    fn link_target(&self, node: &usize) -> Option<String> {
        let nodes = self.state.nodes.borrow();
        let mut current = Some(*node);
        while let Some(id) = current {
            if let Some(href) = &nodes[id].href {
                return Some(href.clone());
            }
            current = nodes[id].parent;
        }
        None
    }

    fn is_connected(&self, node: &usize) -> bool {
        self.state.nodes.borrow()[*node].connected
    }

    fn insert_button_after(&self, anchor: &usize, asin: &str) -> Option<usize> {
        let parent = self.state.nodes.borrow()[*anchor].parent?;
        let button = self.add(parent, &[BUTTON_SELECTOR]);
        self.set_attr(button, ASIN_ATTRIBUTE, asin);

        let mut nodes = self.state.nodes.borrow_mut();
        let children = &mut nodes[parent].children;
        children.retain(|&c| c != button);
        let index = children.iter().position(|c| c == anchor)?;
        children.insert(index + 1, button);
        Some(button)
    }

    fn render_button(
        &self,
        button: &usize,
        view: &ButtonView,
        on_click: Option<Handler>,
        on_details: Option<Handler>,
    ) {
        self.state.renders.borrow_mut().push((*button, view.clone()));
        self.state.slots.borrow_mut().insert(
            *button,
            ButtonSlots {
                on_click: on_click.map(|h| Rc::new(RefCell::new(h))),
                on_details: on_details.map(|h| Rc::new(RefCell::new(h))),
            },
        );
    }

    fn show_notice(&self, button: &usize, text: &str) {
        self.state
            .notices
            .borrow_mut()
            .push((*button, text.to_string()));
    }
}

impl DetailModal for FakePage {
    fn show_loading(&self) {
        self.state.modal.borrow_mut().push(ModalEvent::Loading);
    }

    fn show_detail(&self, view: DetailView, raw: Option<String>) {
        self.state.modal.borrow_mut().push(ModalEvent::Detail(view, raw));
    }

    fn show_error(&self, message: &str) {
        self.state
            .modal
            .borrow_mut()
            .push(ModalEvent::Error(message.to_string()));
    }
}

struct Interval {
    period: Duration,
    active: Rc<Cell<bool>>,
    tick: SharedHandler,
}

/// Stops its interval when dropped
pub struct FakeTicker {
    active: Rc<Cell<bool>>,
}

impl Drop for FakeTicker {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

/// Fixed clock, sleeps that finish at once and intervals fired by hand
#[derive(Clone)]
pub struct FakeScheduler {
    spawner: LocalSpawner,
    now: DateTime<Utc>,
    intervals: Rc<RefCell<Vec<Interval>>>,
}

impl FakeScheduler {
    pub fn new(spawner: LocalSpawner) -> Self {
        FakeScheduler {
            spawner,
            now: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            intervals: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Tick every live interval with this period once
    pub fn fire(&self, period: Duration) {
        let due: Vec<SharedHandler> = self
            .intervals
            .borrow()
            .iter()
            .filter(|i| i.period == period && i.active.get())
            .map(|i| i.tick.clone())
            .collect();
        for tick in due {
            (tick.borrow_mut())();
        }
    }
}

impl Scheduler for FakeScheduler {
    type Ticker = FakeTicker;

    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&self, _delay: Duration) -> LocalBoxFuture<'static, ()> {
        future::ready(()).boxed_local()
    }

    fn every(&self, period: Duration, tick: Handler) -> FakeTicker {
        let active = Rc::new(Cell::new(true));
        self.intervals.borrow_mut().push(Interval {
            period,
            active: active.clone(),
            tick: Rc::new(RefCell::new(tick)),
        });
        FakeTicker { active }
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner
            .spawn_local(task)
            .expect("test executor is alive");
    }
}
