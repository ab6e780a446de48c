//! Product scanning and status reconciliation.
//!
//! [`Reconciler`] owns a side-table of bindings, one per injected button. Each
//! binding records which card and button it belongs to, the resolved product
//! and whether a request is in flight. Nothing about request state lives on
//! the DOM nodes themselves.
//!
//! Every async continuation re-checks liveness (binding still registered and
//! button still attached) before touching the page; a button the host page
//! threw away turns all of its pending work into no-ops.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};

use crate::asin::{canonical_product_url, extract_asin};
use crate::button::{ButtonAction, ButtonPhase, ButtonView, Processing, RESET_NOTICE, next_dots};
use crate::classify::{ReportOutcome, Verdict, classify, status_after_reset};
use crate::detail::DetailView;
use crate::page::{
    ASIN_ATTRIBUTE, BUTTON_SELECTOR, DOTS_INTERVAL, DetailModal, ERROR_REVERT_DELAY, Handler,
    INSERTION_SELECTORS, ProductPage, RESCAN_DEBOUNCE, SAFETY_NET_INTERVAL, SETTLE_DELAY,
    Scheduler, TITLE_SELECTOR,
};
use crate::product::{ProductRef, ProductStatus, parse_timestamp};
use crate::remote::{ConfigStore, RemoteClient, Transport};

/// Stable handle for one injected button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

struct Binding<N> {
    id: BindingId,
    container: N,
    button: N,
    product: ProductRef,
    phase: ButtonPhase,
    pending: bool,
    started_at: Option<DateTime<Utc>>,
}

struct Bindings<N> {
    next_id: u64,
    entries: Vec<Binding<N>>,
}

impl<N: PartialEq> Bindings<N> {
    fn new() -> Self {
        Bindings {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, container: N, button: N, product: ProductRef) -> BindingId {
        self.next_id += 1;
        let id = BindingId(self.next_id);
        self.entries.push(Binding {
            id,
            container,
            button,
            product,
            phase: ButtonPhase::Checking,
            pending: false,
            started_at: None,
        });
        id
    }

    fn get(&self, id: BindingId) -> Option<&Binding<N>> {
        self.entries.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BindingId) -> Option<&mut Binding<N>> {
        self.entries.iter_mut().find(|b| b.id == id)
    }

    fn bound_to(&self, container: &N, button: Option<&N>) -> Option<&Binding<N>> {
        self.entries
            .iter()
            .find(|b| &b.container == container || Some(&b.button) == button)
    }
}

enum Visit {
    Skip,
    Check(BindingId),
    Injected(BindingId),
}

pub struct Reconciler<P: ProductPage, T, C, S: Scheduler> {
    page: P,
    client: RemoteClient<T, C>,
    scheduler: S,
    bindings: RefCell<Bindings<P::Node>>,
    started: Cell<bool>,
    rescan_queued: Cell<bool>,
    safety_net: RefCell<Option<S::Ticker>>,
    this: Weak<Self>,
}

impl<P, T, C, S> Reconciler<P, T, C, S>
where
    P: ProductPage + DetailModal + 'static,
    T: Transport + 'static,
    C: ConfigStore + 'static,
    S: Scheduler + 'static,
{
    pub fn new(page: P, client: RemoteClient<T, C>, scheduler: S) -> Rc<Self> {
        Rc::new_cyclic(|this| Reconciler {
            page,
            client,
            scheduler,
            bindings: RefCell::new(Bindings::new()),
            started: Cell::new(false),
            rescan_queued: Cell::new(false),
            safety_net: RefCell::new(None),
            this: this.clone(),
        })
    }

    /// Initial scan after the settle delay, then the safety-net interval.
    pub fn start(&self) {
        let settle = self.scheduler.sleep(SETTLE_DELAY);
        self.run(move |this| async move {
            settle.await;
            this.started.set(true);
            this.scan();

            let weak = Rc::downgrade(&this);
            let ticker = this.scheduler.every(
                SAFETY_NET_INTERVAL,
                Box::new(move || {
                    if let Some(engine) = weak.upgrade() {
                        engine.scan();
                    }
                }),
            );
            *this.safety_net.borrow_mut() = Some(ticker);
        });
    }

    /// Ask for a scan soon. Requests arriving while one is queued are merged;
    /// requests before the initial scan are dropped.
    pub fn request_rescan(&self) {
        if !self.started.get() || self.rescan_queued.replace(true) {
            return;
        }
        let delay = self.scheduler.sleep(RESCAN_DEBOUNCE);
        self.run(move |this| async move {
            delay.await;
            this.rescan_queued.set(false);
            this.scan();
        });
    }

    /// Bind a button to every product card that lacks one. Returns the number
    /// of buttons injected.
    pub fn scan(&self) -> usize {
        self.prune();

        let containers = self.page.product_containers();
        log::info!("Found {} product elements", containers.len());

        let mut injected = 0;
        for container in &containers {
            match self.visit(container) {
                Visit::Skip => {}
                Visit::Check(id) => self.spawn_check(id),
                Visit::Injected(id) => {
                    injected += 1;
                    self.spawn_check(id);
                }
            }
        }
        injected
    }

    /// Number of buttons currently tracked
    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().entries.len()
    }

    /// Bindings whose button left the page are dead; forget them.
    fn prune(&self) {
        let mut bindings = self.bindings.borrow_mut();
        let before = bindings.entries.len();
        bindings.entries.retain(|b| self.page.is_connected(&b.button));
        let dropped = before - bindings.entries.len();
        if dropped > 0 {
            log::debug!("Dropped {} bindings whose buttons left the page", dropped);
        }
    }

    fn visit(&self, container: &P::Node) -> Visit {
        let Some(page_asin) = self
            .page
            .attribute(container, ASIN_ATTRIBUTE)
            .filter(|asin| !asin.is_empty())
        else {
            return Visit::Skip;
        };

        let existing = self.page.query(container, BUTTON_SELECTOR);
        if let Some(binding) = self.bindings.borrow().bound_to(container, existing.as_ref()) {
            // A checking button with nothing in flight lost its request
            if binding.phase == ButtonPhase::Checking && !binding.pending {
                log::info!("Found stale button for ASIN {}, refreshing status", binding.product.asin);
                return Visit::Check(binding.id);
            }
            return Visit::Skip;
        }

        if let Some(button) = existing {
            let asin = self
                .page
                .attribute(&button, ASIN_ATTRIBUTE)
                .unwrap_or_else(|| page_asin.clone());
            log::info!("Adopting existing button for ASIN {}", asin);
            let product = ProductRef::new(asin.clone(), canonical_product_url(&asin));
            let id = self
                .bindings
                .borrow_mut()
                .insert(container.clone(), button, product);
            self.paint(id, &ButtonView::checking(), None, None);
            return Visit::Check(id);
        }

        let Some(title) = self.page.query(container, TITLE_SELECTOR) else {
            return Visit::Skip;
        };

        log::debug!("Processing product with ASIN {}", page_asin);

        let Some(anchor) = self.insertion_point(container, &title) else {
            log::info!("No insertion point found for ASIN {}", page_asin);
            return Visit::Skip;
        };

        let product = self.resolve_product(container, &title, &page_asin);
        let Some(button) = self.page.insert_button_after(&anchor, &product.asin) else {
            log::info!("Could not insert button for ASIN {}", product.asin);
            return Visit::Skip;
        };

        log::info!("Button added for ASIN {}", product.asin);
        log::debug!("[{}] Resolved from {}", product.asin, product.source_url);
        let id = self
            .bindings
            .borrow_mut()
            .insert(container.clone(), button, product);
        self.paint(id, &ButtonView::checking(), None, None);
        Visit::Injected(id)
    }

    fn insertion_point(&self, container: &P::Node, title: &P::Node) -> Option<P::Node> {
        INSERTION_SELECTORS
            .iter()
            .find_map(|selector| self.page.query(container, selector))
            .or_else(|| self.page.styled_ancestor(title))
    }

    /// The card's links are often tracking redirects; the ASIN found in them
    /// wins over the card attribute, which is only the fallback.
    fn resolve_product(&self, container: &P::Node, title: &P::Node, page_asin: &str) -> ProductRef {
        let source_url = self
            .page
            .link_target(title)
            .or_else(|| {
                let selector = format!(r#"a[href*="/dp/{}"]"#, page_asin);
                self.page
                    .query(container, &selector)
                    .and_then(|link| self.page.link_target(&link))
            })
            .unwrap_or_else(|| canonical_product_url(page_asin));

        let asin = extract_asin(&source_url).unwrap_or_else(|| page_asin.to_string());
        ProductRef::new(asin, source_url)
    }

    /// Button and ASIN of a binding whose button is still on the page
    fn live(&self, id: BindingId) -> Option<(P::Node, String)> {
        let bindings = self.bindings.borrow();
        let binding = bindings.get(id)?;
        self.page
            .is_connected(&binding.button)
            .then(|| (binding.button.clone(), binding.product.asin.clone()))
    }

    fn set_phase(&self, id: BindingId, phase: ButtonPhase) {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(id) {
            binding.phase = phase;
        }
    }

    fn is_checking(&self, id: BindingId) -> bool {
        self.bindings
            .borrow()
            .get(id)
            .is_some_and(|binding| binding.phase == ButtonPhase::Checking)
    }

    /// Claim the binding for one request. `None` if it is dead or busy.
    fn begin_request(&self, id: BindingId) -> Option<String> {
        let mut bindings = self.bindings.borrow_mut();
        let binding = bindings.get_mut(id)?;
        if !self.page.is_connected(&binding.button) {
            return None;
        }
        if binding.pending {
            log::debug!("[{}] Request already in flight, not starting another", binding.product.asin);
            return None;
        }
        binding.pending = true;
        binding.started_at = Some(self.scheduler.now());
        Some(binding.product.asin.clone())
    }

    fn finish_request(&self, id: BindingId) {
        let now = self.scheduler.now();
        if let Some(binding) = self.bindings.borrow_mut().get_mut(id) {
            if let Some(started) = binding.started_at.take() {
                log::debug!(
                    "[{}] Request completed in {}ms",
                    binding.product.asin,
                    (now - started).num_milliseconds()
                );
            }
            binding.pending = false;
        }
    }

    /// Render onto a live button; a dead one is left alone.
    fn paint(
        &self,
        id: BindingId,
        view: &ButtonView,
        on_click: Option<Handler>,
        on_details: Option<Handler>,
    ) -> bool {
        match self.live(id) {
            Some((button, _)) => {
                self.page.render_button(&button, view, on_click, on_details);
                true
            }
            None => {
                log::debug!("Button left the page, not rendering '{}'", view.label);
                false
            }
        }
    }

    fn settle(&self, id: BindingId, status: ProductStatus, date: Option<DateTime<Utc>>) {
        let Some((_, asin)) = self.live(id) else {
            return;
        };
        let view = ButtonView::for_status(status, date.as_ref());
        let on_click = view
            .action
            .filter(|_| view.is_clickable())
            .map(|action| self.action_handler(id, action));
        let on_details = view.show_details.then(|| self.details_handler(asin));

        if self.paint(id, &view, on_click, on_details) {
            self.set_phase(id, ButtonPhase::Settled(status));
        }
    }

    fn action_handler(&self, id: BindingId, action: ButtonAction) -> Handler {
        let this = self.this.clone();
        Box::new(move || {
            if let Some(engine) = this.upgrade() {
                match action {
                    ButtonAction::Report => engine.run(move |e| async move { e.report(id).await }),
                    ButtonAction::ResetRemoved => {
                        engine.run(move |e| async move { e.reset(id).await })
                    }
                }
            }
        })
    }

    fn details_handler(&self, asin: String) -> Handler {
        let this = self.this.clone();
        Box::new(move || {
            if let Some(engine) = this.upgrade() {
                let asin = asin.clone();
                engine.run(move |e| async move { e.show_details(asin).await });
            }
        })
    }

    /// Spawn a flow that holds the engine alive until it finishes
    fn run<F, Fut>(&self, flow: F)
    where
        F: FnOnce(Rc<Self>) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        if let Some(this) = self.this.upgrade() {
            self.scheduler.spawn(Box::pin(flow(this)));
        }
    }

    fn spawn_check(&self, id: BindingId) {
        self.run(move |this| async move { this.check_status(id).await });
    }

    async fn check_status(&self, id: BindingId) {
        if !self.is_checking(id) {
            log::debug!("Status check skipped, button already settled");
            return;
        }
        let Some(asin) = self.begin_request(id) else {
            return;
        };
        self.resolve_status(id, &asin).await;
        self.finish_request(id);
    }

    async fn resolve_status(&self, id: BindingId, asin: &str) {
        let result = self.client.fetch_status(asin).await;

        if self.live(id).is_none() {
            log::debug!("[{}] Button was removed during status request", asin);
            return;
        }

        let verdict = match result {
            Ok(lookup) => classify(&lookup),
            Err(e) => {
                log::error!("[{}] Error checking product status: {}", asin, e);
                Verdict::fail_open()
            }
        };

        match verdict {
            Verdict::Show(report) => {
                log::debug!("[{}] Status {} (record {:?})", asin, report.status, report.record_id);
                let date = report.date.as_deref().and_then(parse_timestamp);
                self.settle(id, report.status, date);
            }
            Verdict::RemovedButLive { prior } => {
                log::debug!("[{}] Marked removed but listed on the page, resetting", asin);
                self.auto_reset(id, asin, prior).await;
            }
        }
    }

    /// Clear a stale removed flag without user interaction.
    async fn auto_reset(&self, id: BindingId, asin: &str, prior: Option<String>) {
        self.set_phase(id, ButtonPhase::Busy(Processing::Fixing));
        self.paint(id, &ButtonView::processing(Processing::Fixing, None), None, None);

        let result = self.client.reset_removed(asin).await;
        let Some((button, _)) = self.live(id) else {
            return;
        };

        match result {
            Ok(outcome) => {
                let status = status_after_reset(prior.as_deref(), outcome.status.as_deref());
                log::debug!("[{}] Removed flag reset, showing {}", asin, status);
                self.settle(id, status, Some(self.scheduler.now()));
                self.page.show_notice(&button, RESET_NOTICE);
            }
            Err(e) => {
                log::error!("[{}] Error auto-resetting removed status: {}", asin, e);
                self.settle(id, ProductStatus::NeedsUpdate, None);
            }
        }
    }

    async fn report(&self, id: BindingId) {
        let Some(asin) = self.begin_request(id) else {
            return;
        };
        log::debug!("[{}] Reporting product", asin);

        let animation = self.animate(id, Processing::Sending);
        let result = self.client.report(&asin).await;
        drop(animation);

        if self.live(id).is_some() {
            match result {
                Ok(ReportOutcome::AlreadyReported { report_date }) => {
                    let date = report_date.as_deref().and_then(parse_timestamp);
                    self.settle(id, ProductStatus::Reported, date);
                }
                Ok(ReportOutcome::Removed) => self.settle(id, ProductStatus::Removed, None),
                Ok(ReportOutcome::Staged) => {
                    self.settle(id, ProductStatus::Staged, Some(self.scheduler.now()))
                }
                Err(e) => {
                    log::error!("[{}] Error reporting product: {}", asin, e);
                    self.fail_then_revert(id, ProductStatus::Unreported).await;
                }
            }
        }
        self.finish_request(id);
    }

    async fn reset(&self, id: BindingId) {
        let Some(asin) = self.begin_request(id) else {
            return;
        };
        log::debug!("[{}] Resetting removed status", asin);

        let animation = self.animate(id, Processing::Fixing);
        let result = self.client.reset_removed(&asin).await;
        drop(animation);

        if let Some((button, _)) = self.live(id) {
            match result {
                Ok(_) => {
                    self.settle(id, ProductStatus::Reported, Some(self.scheduler.now()));
                    self.page.show_notice(&button, RESET_NOTICE);
                }
                Err(e) => {
                    log::error!("[{}] Error resetting removed status: {}", asin, e);
                    self.fail_then_revert(id, ProductStatus::NeedsUpdate).await;
                }
            }
        }
        self.finish_request(id);
    }

    /// Processing label with dots cycling until the returned ticker is dropped
    fn animate(&self, id: BindingId, kind: Processing) -> S::Ticker {
        self.set_phase(id, ButtonPhase::Busy(kind));
        self.paint(id, &ButtonView::processing(kind, None), None, None);

        let this = self.this.clone();
        let mut dots = 0;
        self.scheduler.every(
            DOTS_INTERVAL,
            Box::new(move || {
                dots = next_dots(dots);
                if let Some(engine) = this.upgrade() {
                    engine.paint(id, &ButtonView::processing(kind, Some(dots)), None, None);
                }
            }),
        )
    }

    async fn fail_then_revert(&self, id: BindingId, revert_to: ProductStatus) {
        self.set_phase(id, ButtonPhase::Failed);
        self.paint(id, &ButtonView::failed(), None, None);
        self.scheduler.sleep(ERROR_REVERT_DELAY).await;
        self.settle(id, revert_to, None);
    }

    async fn show_details(&self, asin: String) {
        self.page.show_loading();
        let config = self.client.configuration().await;

        match self.client.fetch_detail(&asin).await {
            Ok(raw) => {
                log::debug!("[{}] Product details: {}", asin, raw);
                let view = DetailView::from_response(&raw);
                let dump = config
                    .debug_mode
                    .then(|| serde_json::to_string_pretty(&raw).unwrap_or_default());
                self.page.show_detail(view, dump);
            }
            Err(e) => {
                log::error!("[{}] Error fetching product details: {}", asin, e);
                self.page
                    .show_error(&format!("Error loading product details: {}", e));
            }
        }
    }
}
