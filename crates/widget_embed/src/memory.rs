//! MemoryPage - an in-memory host document
//!
//! Models just enough of a page for the bootstrap: elements with attributes,
//! an optional isolation boundary per element, document-level styles,
//! global functions and the ready state.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::EmbedError;
use crate::host::{
    DomEvent, DomListener, GlobalFunction, HostPage, ReadyCallback, RootClaim, StyleTarget,
};

#[derive(Default)]
struct Boundary {
    styles: Vec<String>,
}

#[derive(Default)]
struct MemoryElement {
    id: String,
    attributes: BTreeMap<String, String>,
    boundary: Option<Boundary>,
    listeners: Vec<DomListener>,
}

struct PageInner {
    elements: Vec<MemoryElement>,
    document_styles: Vec<String>,
    global_config: Option<Value>,
    script_attributes: BTreeMap<String, String>,
    functions: HashMap<String, GlobalFunction>,
    ready: bool,
    pending_ready: Vec<ReadyCallback>,
    supports_boundary: bool,
}

pub struct MemoryPage {
    inner: Mutex<PageInner>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// A ready page with boundary support.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PageInner {
                elements: Vec::new(),
                document_styles: Vec::new(),
                global_config: None,
                script_attributes: BTreeMap::new(),
                functions: HashMap::new(),
                ready: true,
                pending_ready: Vec::new(),
                supports_boundary: true,
            }),
        }
    }

    /// A page whose document has not finished loading.
    pub fn loading() -> Self {
        let page = Self::new();
        page.inner.lock().ready = false;
        page
    }

    pub fn with_global_config(self, config: Value) -> Self {
        self.inner.lock().global_config = Some(config);
        self
    }

    pub fn with_script_attribute(self, name: &str, value: &str) -> Self {
        self.inner
            .lock()
            .script_attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Simulate a browser without shadow-tree support.
    pub fn without_boundary_support(self) -> Self {
        self.inner.lock().supports_boundary = false;
        self
    }

    /// Place an element the host authored itself.
    pub fn add_host_element(&self, id: &str) {
        self.inner.lock().elements.push(MemoryElement {
            id: id.to_string(),
            ..MemoryElement::default()
        });
    }

    /// Remove every element with `id`, as a host re-render would.
    pub fn remove_element(&self, id: &str) {
        self.inner.lock().elements.retain(|e| e.id != id);
    }

    pub fn add_host_style(&self, css: &str) {
        self.inner.lock().document_styles.push(css.to_string());
    }

    /// Finish loading and run the queued ready callbacks.
    pub fn mark_ready(&self) {
        let callbacks = {
            let mut inner = self.inner.lock();
            inner.ready = true;
            std::mem::take(&mut inner.pending_ready)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }

    pub fn elements_with_id(&self, id: &str) -> usize {
        self.inner
            .lock()
            .elements
            .iter()
            .filter(|e| e.id == id)
            .count()
    }

    pub fn attribute(&self, id: &str, name: &str) -> Option<String> {
        self.inner
            .lock()
            .elements
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.attributes.get(name).cloned())
    }

    pub fn has_boundary(&self, id: &str) -> bool {
        self.inner
            .lock()
            .elements
            .iter()
            .any(|e| e.id == id && e.boundary.is_some())
    }

    /// Styles applying to the subtree of `id`: the boundary's own sheets when
    /// isolated, the document's otherwise.
    pub fn effective_styles(&self, id: &str) -> Vec<String> {
        let inner = self.inner.lock();
        match inner
            .elements
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.boundary.as_ref())
        {
            Some(boundary) => boundary.styles.clone(),
            None => inner.document_styles.clone(),
        }
    }

    pub fn document_styles(&self) -> Vec<String> {
        self.inner.lock().document_styles.clone()
    }

    pub fn listener_count(&self, id: &str) -> usize {
        self.inner
            .lock()
            .elements
            .iter()
            .filter(|e| e.id == id)
            .map(|e| e.listeners.len())
            .sum()
    }

    /// Deliver `event` to the listeners bound under `id`; returns how many ran.
    pub fn dispatch(&self, id: &str, event: DomEvent) -> usize {
        let listeners: Vec<DomListener> = self
            .inner
            .lock()
            .elements
            .iter()
            .filter(|e| e.id == id)
            .flat_map(|e| e.listeners.iter().cloned())
            .collect();
        for listener in &listeners {
            listener(event.clone());
        }
        listeners.len()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.inner.lock().functions.contains_key(name)
    }

    /// Call a global function as host script would. `false` if undefined.
    pub fn invoke(&self, name: &str) -> bool {
        let function = self.inner.lock().functions.get(name).cloned();
        match function {
            Some(function) => {
                function();
                true
            }
            None => false,
        }
    }

    fn with_element<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut MemoryElement, &mut Vec<String>) -> T,
    ) -> Result<T, EmbedError> {
        let mut inner = self.inner.lock();
        let PageInner {
            elements,
            document_styles,
            ..
        } = &mut *inner;
        let element = elements
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EmbedError::RootNotFound(id.to_string()))?;
        Ok(f(element, document_styles))
    }
}

impl HostPage for MemoryPage {
    fn claim_root(&self, id: &str, marker: &str) -> Result<RootClaim, EmbedError> {
        let mut inner = self.inner.lock();
        match inner.elements.iter_mut().find(|e| e.id == id) {
            Some(element) if element.attributes.contains_key(marker) => {
                Ok(RootClaim::AlreadyMounted)
            }
            Some(element) => {
                element
                    .attributes
                    .insert(marker.to_string(), "true".to_string());
                Ok(RootClaim::Claimed)
            }
            None => {
                let mut element = MemoryElement {
                    id: id.to_string(),
                    ..MemoryElement::default()
                };
                element
                    .attributes
                    .insert(marker.to_string(), "true".to_string());
                inner.elements.push(element);
                Ok(RootClaim::Claimed)
            }
        }
    }

    fn release_root(&self, id: &str, marker: &str) {
        let mut inner = self.inner.lock();
        for element in inner.elements.iter_mut().filter(|e| e.id == id) {
            element.attributes.remove(marker);
            element.boundary = None;
            element.listeners.clear();
        }
    }

    fn attach_boundary(&self, root_id: &str) -> Result<StyleTarget, EmbedError> {
        let supports_boundary = self.inner.lock().supports_boundary;
        if !supports_boundary {
            return Ok(StyleTarget::Document);
        }
        self.with_element(root_id, |element, _| {
            element.boundary.get_or_insert_with(Boundary::default);
            StyleTarget::Boundary
        })
    }

    fn inject_style(
        &self,
        root_id: &str,
        target: StyleTarget,
        css: &str,
    ) -> Result<(), EmbedError> {
        self.with_element(root_id, |element, document_styles| match target {
            StyleTarget::Boundary => match element.boundary.as_mut() {
                Some(boundary) => {
                    boundary.styles.push(css.to_string());
                    Ok(())
                }
                None => Err(EmbedError::Host(format!(
                    "element '{}' has no isolation boundary",
                    element.id
                ))),
            },
            StyleTarget::Document => {
                document_styles.push(css.to_string());
                Ok(())
            }
        })?
    }

    fn bind_listener(&self, root_id: &str, listener: DomListener) -> Result<(), EmbedError> {
        self.with_element(root_id, |element, _| element.listeners.push(listener))
    }

    fn global_config(&self) -> Option<Value> {
        self.inner.lock().global_config.clone()
    }

    fn script_attribute(&self, name: &str) -> Option<String> {
        self.inner.lock().script_attributes.get(name).cloned()
    }

    fn expose_function(&self, name: &str, function: GlobalFunction) {
        self.inner
            .lock()
            .functions
            .insert(name.to_string(), function);
    }

    fn on_ready(&self, callback: ReadyCallback) {
        {
            let mut inner = self.inner.lock();
            if !inner.ready {
                inner.pending_ready.push(callback);
                return;
            }
        }
        callback();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn claim_creates_then_reports_mounted() {
        let page = MemoryPage::new();
        assert_eq!(page.claim_root("root", "data-m"), Ok(RootClaim::Claimed));
        assert_eq!(page.claim_root("root", "data-m"), Ok(RootClaim::AlreadyMounted));
        assert_eq!(page.elements_with_id("root"), 1);
        assert_eq!(page.attribute("root", "data-m").as_deref(), Some("true"));
    }

    #[test]
    fn claim_reuses_host_element() {
        let page = MemoryPage::new();
        page.add_host_element("root");
        assert_eq!(page.claim_root("root", "data-m"), Ok(RootClaim::Claimed));
        assert_eq!(page.elements_with_id("root"), 1);
    }

    #[test]
    fn release_clears_marker_and_attachments() {
        let page = MemoryPage::new();
        page.claim_root("root", "data-m").unwrap();
        page.attach_boundary("root").unwrap();
        page.bind_listener("root", Arc::new(|_: DomEvent| {})).unwrap();

        page.release_root("root", "data-m");

        assert!(page.attribute("root", "data-m").is_none());
        assert!(!page.has_boundary("root"));
        assert_eq!(page.listener_count("root"), 0);
    }

    #[test]
    fn boundary_isolates_styles() {
        let page = MemoryPage::new();
        page.add_host_style("button { color: red; }");
        page.claim_root("root", "data-m").unwrap();
        let target = page.attach_boundary("root").unwrap();
        page.inject_style("root", target, ".chat { color: blue; }")
            .unwrap();

        assert_eq!(target, StyleTarget::Boundary);
        assert_eq!(page.effective_styles("root"), vec![".chat { color: blue; }"]);
        assert_eq!(page.document_styles(), vec!["button { color: red; }"]);
    }

    #[test]
    fn style_injection_requires_root() {
        let page = MemoryPage::new();
        assert_eq!(
            page.inject_style("missing", StyleTarget::Document, "a{}"),
            Err(EmbedError::RootNotFound("missing".into()))
        );
    }

    #[test]
    fn ready_callbacks_wait_for_ready() {
        let page = MemoryPage::loading();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        page.on_ready(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!page.is_ready());

        page.mark_ready();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        page.on_ready(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_reaches_bound_listeners() {
        let page = MemoryPage::new();
        page.claim_root("root", "data-m").unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        page.bind_listener(
            "root",
            Arc::new(move |event: DomEvent| sink.lock().push(event)),
        )
        .unwrap();

        assert_eq!(page.dispatch("root", DomEvent::LauncherClicked), 1);
        assert_eq!(page.dispatch("other", DomEvent::LauncherClicked), 0);
        assert_eq!(*seen.lock(), vec![DomEvent::LauncherClicked]);
    }
}
