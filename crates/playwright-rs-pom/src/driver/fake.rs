// In-memory driver for unit tests
//
// Elements are registered under the exact selector a page object uses.
// Chained selectors resolve segment by segment: `nth=i` picks one match,
// any other segment descends into the children registered under it.

use super::{BrowserRuntime, BrowserSession, Driver, SessionOptions};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    pub text: Option<String>,
    pub value: String,
    pub visible: bool,
    pub enabled: bool,
    pub focused: bool,
    pub checked: bool,
    pub attributes: HashMap<String, String>,
    pub children: HashMap<String, Vec<FakeElement>>,
    pub options: Vec<String>,
    /// Visibility probes answered with `false` before `visible` applies
    pub hidden_polls: u32,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            text: None,
            value: String::new(),
            visible: true,
            enabled: true,
            focused: false,
            checked: false,
            attributes: HashMap::new(),
            children: HashMap::new(),
            options: Vec::new(),
            hidden_polls: 0,
        }
    }
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, selector: &str, element: FakeElement) -> Self {
        self.children
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    pub fn options(mut self, values: &[&str]) -> Self {
        self.options = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn appears_after(mut self, polls: u32) -> Self {
        self.hidden_polls = polls;
        self
    }
}

/// Mutable page state behind a [`FakeDriver`].
#[derive(Debug, Default)]
pub(crate) struct FakeDom {
    pub url: String,
    pub title: String,
    elements: HashMap<String, Vec<FakeElement>>,
    events: Vec<String>,
    pub stalled: bool,
}

impl FakeDom {
    /// Replaces every element registered under `selector` with `element`.
    pub fn set(&mut self, selector: &str, element: FakeElement) {
        self.elements.insert(selector.to_string(), vec![element]);
    }

    /// Registers an additional match for `selector`.
    pub fn push(&mut self, selector: &str, element: FakeElement) {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
    }

    pub fn remove(&mut self, selector: &str) {
        self.elements.remove(selector);
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    fn resolve(&mut self, selector: &str) -> Vec<&mut FakeElement> {
        let mut segments = selector.split(" >> ");
        let first = segments.next().unwrap_or_default();
        let mut current: Vec<&mut FakeElement> = match self.elements.get_mut(first) {
            Some(matches) => matches.iter_mut().collect(),
            None => Vec::new(),
        };
        for segment in segments {
            current = match segment.strip_prefix("nth=") {
                Some(index) => {
                    let index = index.parse::<usize>().unwrap_or(usize::MAX);
                    current.into_iter().nth(index).into_iter().collect()
                }
                None => current
                    .into_iter()
                    .flat_map(|element| children_of(element, segment))
                    .collect(),
            };
        }
        current
    }

    /// The single element matching `selector`, if any. More than one match
    /// is a strict mode violation, as in Playwright.
    fn strict(&mut self, selector: &str) -> Result<Option<&mut FakeElement>> {
        let mut matches = self.resolve(selector);
        if matches.len() > 1 {
            return Err(Error::Browser(playwright_rs::Error::ProtocolError(format!(
                "strict mode violation: locator('{selector}') resolved to {} elements",
                matches.len()
            ))));
        }
        Ok(matches.pop())
    }

    fn first(&mut self, selector: &str) -> Result<&mut FakeElement> {
        self.strict(selector)?
            .ok_or_else(|| Error::Timeout(format!("waiting for locator('{selector}')")))
    }
}

fn children_of<'a>(element: &'a mut FakeElement, selector: &str) -> Vec<&'a mut FakeElement> {
    match element.children.get_mut(selector) {
        Some(children) => children.iter_mut().collect(),
        None => Vec::new(),
    }
}

type ClickHandler = Arc<dyn Fn(&mut FakeDom) + Send + Sync>;
type PageHandler = Arc<dyn Fn(&mut FakeDom, &str) + Send + Sync>;

/// Scriptable [`Driver`] over a [`FakeDom`].
pub(crate) struct FakeDriver {
    dom: Mutex<FakeDom>,
    on_click: Mutex<HashMap<String, ClickHandler>>,
    on_load: Mutex<Option<PageHandler>>,
    timeout: Duration,
}

impl FakeDriver {
    pub fn new(url: &str) -> Self {
        Self {
            dom: Mutex::new(FakeDom {
                url: url.to_string(),
                ..FakeDom::default()
            }),
            on_click: Mutex::new(HashMap::new()),
            on_load: Mutex::new(None),
            timeout: Duration::from_millis(200),
        }
    }

    pub fn with(self, selector: &str, element: FakeElement) -> Self {
        self.dom.lock().push(selector, element);
        self
    }

    /// Runs `handler` after every click on `selector`.
    pub fn on_click(
        self,
        selector: &str,
        handler: impl Fn(&mut FakeDom) + Send + Sync + 'static,
    ) -> Self {
        self.on_click
            .lock()
            .insert(selector.to_string(), Arc::new(handler));
        self
    }

    /// Renders the page for a URL on every navigation and reload.
    pub fn on_load(self, handler: impl Fn(&mut FakeDom, &str) + Send + Sync + 'static) -> Self {
        *self.on_load.lock() = Some(Arc::new(handler));
        self
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeDom)) {
        f(&mut self.dom.lock());
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.dom
            .lock()
            .resolve(selector)
            .into_iter()
            .next()
            .map(|e| e.value.clone())
    }

    pub fn events(&self) -> Vec<String> {
        self.dom.lock().events.clone()
    }

    fn record(&self, event: String) {
        self.dom.lock().events.push(event);
    }

    fn load(&self, url: &str) {
        let handler = self.on_load.lock().clone();
        let mut dom = self.dom.lock();
        dom.url = url.to_string();
        if let Some(handler) = handler {
            handler(&mut dom, url);
        }
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto({url})"));
        self.load(url);
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        self.record("wait_for_network_idle".to_string());
        if self.dom.lock().stalled {
            tokio::time::sleep(self.timeout).await;
            return Err(Error::Timeout(format!(
                "page did not settle within {:?}",
                self.timeout
            )));
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.record("reload".to_string());
        let url = self.url();
        self.load(&url);
        Ok(())
    }

    fn url(&self) -> String {
        self.dom.lock().url.clone()
    }

    async fn title(&self) -> Result<String> {
        Ok(self.dom.lock().title.clone())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.dom.lock().first(selector)?;
        self.record(format!("click({selector})"));
        let handler = self.on_click.lock().get(selector).cloned();
        if let Some(handler) = handler {
            handler(&mut self.dom.lock());
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.dom.lock().first(selector)?.value = value.to_string();
        self.record(format!("fill({selector}, {value})"));
        Ok(())
    }

    async fn check(&self, selector: &str) -> Result<()> {
        self.dom.lock().first(selector)?.checked = true;
        self.record(format!("check({selector})"));
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<Vec<String>> {
        {
            let mut dom = self.dom.lock();
            let element = dom.first(selector)?;
            if !element.options.iter().any(|o| o == value) {
                return Err(Error::Timeout(format!(
                    "option '{value}' not found in '{selector}'"
                )));
            }
            element.value = value.to_string();
        }
        self.record(format!("select_option({selector}, {value})"));
        Ok(vec![value.to_string()])
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.dom.lock().first(selector)?.text.clone())
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        Ok(self.dom.lock().first(selector)?.value.clone())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .dom
            .lock()
            .first(selector)?
            .attributes
            .get(name)
            .cloned())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let mut dom = self.dom.lock();
        let Some(element) = dom.strict(selector)? else {
            return Ok(false);
        };
        if element.hidden_polls > 0 {
            element.hidden_polls -= 1;
            return Ok(false);
        }
        Ok(element.visible)
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        Ok(self.dom.lock().first(selector)?.enabled)
    }

    async fn is_focused(&self, selector: &str) -> Result<bool> {
        Ok(self.dom.lock().first(selector)?.focused)
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.dom.lock().resolve(selector).len())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG")?;
        self.record(format!("screenshot({})", path.display()));
        Ok(())
    }
}

/// Runtime handing out sessions over drivers built by a factory.
pub(crate) struct FakeRuntime {
    factory: Box<dyn Fn() -> Arc<FakeDriver> + Send + Sync>,
    pub launches: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    /// Number of upcoming launches that fail
    pub failing_launches: AtomicUsize,
    pub shut_down: AtomicBool,
    drivers: Mutex<Vec<Arc<FakeDriver>>>,
}

impl FakeRuntime {
    pub fn new(factory: impl Fn() -> Arc<FakeDriver> + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            launches: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            failing_launches: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            drivers: Mutex::new(Vec::new()),
        }
    }

    /// Drivers of every session launched so far, in launch order.
    pub fn drivers(&self) -> Vec<Arc<FakeDriver>> {
        self.drivers.lock().clone()
    }
}

#[async_trait]
impl BrowserRuntime for FakeRuntime {
    async fn launch(&self, _options: &SessionOptions) -> Result<Box<dyn BrowserSession>> {
        let failing = self
            .failing_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Error::InvalidArgument("browser executable not found".into()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        let driver = (self.factory)();
        self.drivers.lock().push(driver.clone());
        Ok(Box::new(FakeSession {
            driver,
            closes: self.closes.clone(),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeSession {
    driver: Arc<FakeDriver>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn driver(&self) -> Arc<dyn Driver> {
        self.driver.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chained_selectors() {
        let driver = FakeDriver::new("http://app.test/search")
            .with(
                ".result-item",
                FakeElement::new().child(".title", FakeElement::new().text("First")),
            )
            .with(".result-item", FakeElement::new());

        assert_eq!(driver.count(".result-item").await.unwrap(), 2);
        assert_eq!(driver.count(".result-item >> nth=0 >> .title").await.unwrap(), 1);
        assert_eq!(driver.count(".result-item >> nth=1 >> .title").await.unwrap(), 0);
        assert_eq!(
            driver
                .text_content(".result-item >> nth=0 >> .title")
                .await
                .unwrap()
                .as_deref(),
            Some("First")
        );
    }

    #[tokio::test]
    async fn test_missing_element_times_out_for_actions_only() {
        let driver = FakeDriver::new("http://app.test/");
        assert!(!driver.is_visible("#nope").await.unwrap());
        assert_eq!(driver.count("#nope").await.unwrap(), 0);
        assert!(matches!(
            driver.click("#nope").await.unwrap_err(),
            Error::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn test_multiple_matches_violate_strict_mode() {
        let driver = FakeDriver::new("http://app.test/search")
            .with(".result-item", FakeElement::new().text("First").attr("id", "a"))
            .with(".result-item", FakeElement::new().text("Second"));

        assert!(matches!(
            driver.is_visible(".result-item").await.unwrap_err(),
            Error::Browser(_)
        ));
        assert!(driver.text_content(".result-item").await.is_err());
        assert!(driver.is_enabled(".result-item").await.is_err());
        assert!(driver.attribute(".result-item", "id").await.is_err());
        assert!(driver.click(".result-item").await.is_err());

        assert!(driver.is_visible(".result-item >> nth=1").await.unwrap());
        assert_eq!(
            driver.attribute(".result-item >> nth=0", "id").await.unwrap().as_deref(),
            Some("a")
        );
    }
}
