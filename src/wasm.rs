// WebAssembly bindings: the content script injected into retailer pages
use crate::adapter::SiteAdapter;
use crate::config::{Config, EngineConfig};
use crate::dom::{Badge, Dom, DomError, Placement};
use crate::engine::{CardEngine, Observer, ScanReport, Session, SessionState};
use crate::{logging, registry, units};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Document, Element, MutationObserver,
    MutationObserverInit, MutationRecord, NodeList, Window,
};

/// A live element plus a page-unique id, so elements can key hash maps
#[derive(Clone)]
pub struct ElementHandle {
    id: u32,
    element: Element,
}

impl PartialEq for ElementHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ElementHandle {}

impl Hash for ElementHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} #{}>", self.element.tag_name().to_lowercase(), self.id)
    }
}

fn host_error(e: JsValue) -> DomError {
    DomError::Host(format!("{:?}", e))
}

fn selector_error(selector: &str, e: JsValue) -> DomError {
    DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    }
}

/// The page's live document
pub struct BrowserDom {
    document: Document,
    ids: js_sys::WeakMap,
    next_id: Cell<u32>,
}

impl BrowserDom {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ids: js_sys::WeakMap::new(),
            next_id: Cell::new(1),
        }
    }

    fn handle(&self, element: Element) -> ElementHandle {
        let key: &js_sys::Object = element.as_ref();
        let id = match self.ids.get(key).as_f64() {
            Some(id) => id as u32,
            None => {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                self.ids.set(key, &JsValue::from(id));
                id
            }
        };
        ElementHandle { id, element }
    }

    fn handles(&self, list: NodeList) -> Vec<ElementHandle> {
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|el| self.handle(el))
            .collect()
    }
}

impl Dom for BrowserDom {
    type Node = ElementHandle;

    fn is_ready(&self) -> bool {
        self.document.ready_state() != "loading"
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|e| selector_error(selector, e))?;
        Ok(self.handles(list))
    }

    fn query_within(&self, scope: &ElementHandle, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        let list = scope
            .element
            .query_selector_all(selector)
            .map_err(|e| selector_error(selector, e))?;
        Ok(self.handles(list))
    }

    fn query_first(&self, scope: &ElementHandle, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        let found = scope
            .element
            .query_selector(selector)
            .map_err(|e| selector_error(selector, e))?;
        Ok(found.map(|el| self.handle(el)))
    }

    fn matches(&self, node: &ElementHandle, selector: &str) -> Result<bool, DomError> {
        node.element.matches(selector).map_err(|e| selector_error(selector, e))
    }

    fn closest(&self, node: &ElementHandle, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        let found = node
            .element
            .closest(selector)
            .map_err(|e| selector_error(selector, e))?;
        Ok(found.map(|el| self.handle(el)))
    }

    fn text_content(&self, node: &ElementHandle) -> String {
        node.element.text_content().unwrap_or_default()
    }

    fn attribute(&self, node: &ElementHandle, name: &str) -> Option<String> {
        node.element.get_attribute(name)
    }

    fn remove(&mut self, node: &ElementHandle) -> Result<(), DomError> {
        node.element.remove();
        Ok(())
    }

    fn insert_badge(&mut self, parent: &ElementHandle, badge: &Badge) -> Result<ElementHandle, DomError> {
        let span = self.document.create_element("span").map_err(host_error)?;
        span.set_attribute("data-testid", &badge.marker).map_err(host_error)?;
        span.set_attribute("style", &badge.css).map_err(host_error)?;
        span.set_text_content(Some(&badge.text));

        match badge.placement {
            Placement::Append => {
                parent.element.append_child(&span).map_err(host_error)?;
            }
            Placement::Prepend => parent.element.prepend_with_node_1(&span).map_err(host_error)?,
        }
        Ok(self.handle(span))
    }
}

type Callback = Closure<dyn FnMut()>;
type MutationCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

/// Milliseconds on the page clock
fn clock() -> u64 {
    js_sys::Date::now().max(0.0) as u64
}

/// Live listeners and timers. `Inner::clear` unregisters them before the
/// closures are dropped.
#[derive(Default)]
struct Triggers {
    observer: Option<(MutationObserver, MutationCallback)>,
    scroll: Option<Callback>,
    ready: Option<Callback>,
    wake: Option<Callback>,
    /// Pending timeout handle and the deadline it was armed for
    wake_timer: Option<(i32, u64)>,
}

struct Inner {
    window: Window,
    dom: BrowserDom,
    session: Session<BrowserDom>,
    triggers: Triggers,
    last_report: Option<ScanReport>,
}

impl Inner {
    fn site(&self) -> &str {
        &self.session.engine().adapter().name
    }

    fn on_mutation(&mut self, records: js_sys::Array) {
        let badge = self.session.engine().adapter().unit_price_selector();
        let mut added = Vec::new();
        for record in records.iter() {
            let Ok(record) = record.dyn_into::<MutationRecord>() else {
                continue;
            };
            for handle in self.dom.handles(record.added_nodes()) {
                // our own badges never create work
                if !matches!(self.dom.matches(&handle, &badge), Ok(true)) {
                    added.push(handle);
                }
            }
        }
        if added.is_empty() {
            return;
        }
        if let Some(report) = self.session.mutation(&mut self.dom, &added) {
            self.last_report = Some(report);
        }
    }

    fn on_scroll(&mut self) {
        self.session.scroll(clock());
        self.rearm();
    }

    /// The wake timeout fired: run whatever is due, then arm the next one
    fn on_wake(&mut self) {
        let armed_for = self.triggers.wake_timer.take().map_or(0, |(_, due)| due);
        let reports = self.session.advance(&mut self.dom, clock().max(armed_for));
        if let Some(report) = reports.into_iter().last() {
            self.last_report = Some(report);
        }
        self.rearm();
    }

    /// Keep exactly one timeout pending, for the session's earliest deadline
    fn rearm(&mut self) {
        if let Some((handle, _)) = self.triggers.wake_timer.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        let Some(due) = self.session.next_deadline() else {
            return;
        };
        let Some(wake) = self.triggers.wake.as_ref() else {
            return;
        };
        let delay = i32::try_from(due.saturating_sub(clock())).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(wake.as_ref().unchecked_ref(), delay)
        {
            Ok(handle) => self.triggers.wake_timer = Some((handle, due)),
            Err(e) => warn!(site = %self.site(), error = ?e, "could not schedule timer"),
        }
    }

    fn observe(&mut self, weak: &Weak<RefCell<Inner>>) -> Result<(), JsValue> {
        let targets: Vec<Element> = match self.session.observer() {
            Observer::Off => return Ok(()),
            Observer::Body => self
                .dom
                .document
                .body()
                .map(Element::from)
                .or_else(|| self.dom.document.document_element())
                .into_iter()
                .collect(),
            Observer::Root(sel) => self
                .dom
                .query_all(sel)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
                .into_iter()
                .map(|handle| handle.element)
                .collect(),
        };
        if targets.is_empty() {
            return Err(JsValue::from_str("nothing to observe"));
        }

        let w = weak.clone();
        let callback = MutationCallback::new(move |records: js_sys::Array, _: MutationObserver| {
            if let Some(rc) = w.upgrade() {
                if let Ok(mut inner) = rc.try_borrow_mut() {
                    inner.on_mutation(records);
                }
            }
        });
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        for target in &targets {
            if let Err(e) = observer.observe_with_options(target, &init) {
                observer.disconnect();
                return Err(e);
            }
        }
        self.triggers.observer = Some((observer, callback));
        Ok(())
    }

    fn listen_scroll(&mut self, weak: &Weak<RefCell<Inner>>) -> Result<(), JsValue> {
        let w = weak.clone();
        let scroll = Callback::new(move || {
            if let Some(rc) = w.upgrade() {
                if let Ok(mut inner) = rc.try_borrow_mut() {
                    inner.on_scroll();
                }
            }
        });
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        self.window.add_event_listener_with_callback_and_add_event_listener_options(
            "scroll",
            scroll.as_ref().unchecked_ref(),
            &options,
        )?;
        self.triggers.scroll = Some(scroll);
        Ok(())
    }

    /// Tear down observers, listeners and timers
    fn clear(&mut self) {
        let t = std::mem::take(&mut self.triggers);
        if let Some((observer, _callback)) = t.observer {
            observer.disconnect();
        }
        if let Some(callback) = t.scroll.as_ref() {
            let _ = self
                .window
                .remove_event_listener_with_callback("scroll", callback.as_ref().unchecked_ref());
        }
        if let Some((handle, _)) = t.wake_timer {
            self.window.clear_timeout_with_handle(handle);
        }
        if let Some(callback) = t.ready.as_ref() {
            let _ = self
                .dom
                .document
                .remove_event_listener_with_callback("DOMContentLoaded", callback.as_ref().unchecked_ref());
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.clear();
    }
}

thread_local! {
    static ACTIVE: RefCell<Weak<RefCell<Inner>>> = RefCell::new(Weak::new());
}

/// Per-page content script: one adapter, one session, its triggers
#[wasm_bindgen]
pub struct ContentScript {
    inner: Rc<RefCell<Inner>>,
}

fn load_config(config_toml: Option<String>) -> Result<Config, JsValue> {
    match config_toml {
        Some(content) => Config::load_from_str(&content)
            .map_err(|e| JsValue::from_str(&format!("Failed to load config: {}", e))),
        None => Ok(Config::empty()),
    }
}

fn browser() -> Result<(Window, Document), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    Ok((window, document))
}

impl ContentScript {
    fn build(adapter: SiteAdapter, config: EngineConfig) -> Result<ContentScript, JsValue> {
        let (window, document) = browser()?;
        let engine = CardEngine::new(adapter).with_max_attempts(config.max_attempts);
        Ok(ContentScript {
            inner: Rc::new(RefCell::new(Inner {
                window,
                dom: BrowserDom::new(document),
                session: Session::new(engine, &config),
                triggers: Triggers::default(),
                last_report: None,
            })),
        })
    }
}

#[wasm_bindgen]
impl ContentScript {
    /// Content script for a built-in site ("ozon", "lenta", ...)
    #[wasm_bindgen(js_name = forSite)]
    pub fn for_site(name: &str, config_toml: Option<String>) -> Result<ContentScript, JsValue> {
        let config = load_config(config_toml)?;
        let adapter = config
            .adapter(name)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Self::build(adapter, config.engine)
    }

    /// Content script for the current page URL; `undefined` when no site matches
    #[wasm_bindgen(js_name = forLocation)]
    pub fn for_location(config_toml: Option<String>) -> Result<Option<ContentScript>, JsValue> {
        let (window, _) = browser()?;
        let href = window.location().href()?;
        match registry::route(&href) {
            Some(site) => Self::for_site(site, config_toml).map(Some),
            None => Ok(None),
        }
    }

    /// Idempotent. A previously started script on this page is stopped first.
    pub fn start(&self) -> Result<(), JsValue> {
        let previous = ACTIVE.with(|active| active.replace(Rc::downgrade(&self.inner)));
        if let Some(previous) = previous.upgrade() {
            if !Rc::ptr_eq(&previous, &self.inner) {
                stop_inner(&previous);
            }
        }

        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if let Some(report) = inner.session.start(&mut inner.dom, clock()) {
            inner.last_report = Some(report);
            drop(guard);
            install(&self.inner);
            return Ok(());
        }
        if inner.session.state() != SessionState::WaitingForReady || inner.triggers.ready.is_some() {
            return Ok(());
        }

        let weak = Rc::downgrade(&self.inner);
        let ready = Callback::new(move || {
            let Some(rc) = weak.upgrade() else { return };
            let began = match rc.try_borrow_mut() {
                Ok(mut guard) => {
                    let inner = &mut *guard;
                    let report = inner.session.ready(&mut inner.dom, clock());
                    let began = report.is_some();
                    if report.is_some() {
                        inner.last_report = report;
                    }
                    began
                }
                Err(_) => false,
            };
            if began {
                install(&rc);
            }
        });
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        inner
            .dom
            .document
            .add_event_listener_with_callback_and_add_event_listener_options(
                "DOMContentLoaded",
                ready.as_ref().unchecked_ref(),
                &options,
            )?;
        inner.triggers.ready = Some(ready);
        Ok(())
    }

    pub fn stop(&self) {
        stop_inner(&self.inner);
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.inner.borrow().session.state() == SessionState::Running
    }

    /// JSON of the most recent scan, if any
    #[wasm_bindgen(js_name = lastReport)]
    pub fn last_report(&self) -> Result<Option<String>, JsValue> {
        let inner = self.inner.borrow();
        inner
            .last_report
            .as_ref()
            .map(|report| {
                serde_json::to_string(report)
                    .map_err(|e| JsValue::from_str(&format!("Failed to serialize report: {}", e)))
            })
            .transpose()
    }
}

fn stop_inner(rc: &Rc<RefCell<Inner>>) {
    let Ok(mut inner) = rc.try_borrow_mut() else {
        return;
    };
    inner.session.stop();
    inner.clear();
}

/// Wire the page to a session that just ran its init scan. A trigger that
/// cannot be installed is logged and skipped; the others still run.
fn install(rc: &Rc<RefCell<Inner>>) {
    let weak = Rc::downgrade(rc);
    let Ok(mut inner) = rc.try_borrow_mut() else {
        return;
    };

    if let Err(e) = inner.observe(&weak) {
        warn!(site = %inner.site(), error = ?e, "mutation observer unavailable, relying on scroll and poll");
        inner.session.disable_observer();
    }
    if let Err(e) = inner.listen_scroll(&weak) {
        warn!(site = %inner.site(), error = ?e, "scroll listener unavailable");
    }

    let w = weak;
    inner.triggers.wake = Some(Callback::new(move || {
        if let Some(rc) = w.upgrade() {
            if let Ok(mut inner) = rc.try_borrow_mut() {
                inner.on_wake();
            }
        }
    }));
    inner.rearm();
}

/// Install a console logger. `directives` uses `EnvFilter` syntax, "warn,zakilo=debug" by default.
#[wasm_bindgen(js_name = enableLogging)]
pub fn enable_logging(directives: Option<String>) -> bool {
    logging::init_console(directives.as_deref().unwrap_or("warn,zakilo=debug"))
}

/// Site name handling `url`
#[wasm_bindgen(js_name = routeUrl)]
pub fn route_url(url: &str) -> Option<String> {
    registry::route(url).map(str::to_string)
}

/// Page to open for a `runtime.onInstalled` event
#[wasm_bindgen(js_name = onboardingPage)]
pub fn onboarding_page(reason: &str, version: &str) -> Option<String> {
    registry::onboarding_page(registry::InstallReason::parse(reason), version)
}

/// Returns JSON of the conversion result
#[wasm_bindgen(js_name = convertUnit)]
pub fn convert_unit(amount: f64, unit: &str) -> Result<String, JsValue> {
    let result = units::convert(amount, unit).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&result)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize result: {}", e)))
}
