//! Scripted in-memory driver for unit tests. Clones share state, so a test
//! can hand one clone to the code under test and keep another for
//! assertions.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::traits::{BrowserDriver, ElementHandle, SessionFactory};
use super::BrowserKind;
use crate::locator::Selector;

#[derive(Debug, Default)]
struct FakeState {
    elements: Mutex<HashMap<String, u64>>,
    counts: Mutex<HashMap<String, usize>>,
    locate_attempts: Mutex<Vec<String>>,
    last_locate_timeout: Mutex<Option<Duration>>,
    actions: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u32>>,
    screenshots: Mutex<Vec<String>>,
    close_calls: AtomicU32,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    state: Arc<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `selector` resolvable to the given handle id.
    pub fn script_element(&self, selector: &Selector, id: u64) {
        self.state
            .elements
            .lock()
            .unwrap()
            .insert(selector.to_string(), id);
    }

    pub fn script_count(&self, selector: &Selector, count: usize) {
        self.state
            .counts
            .lock()
            .unwrap()
            .insert(selector.to_string(), count);
    }

    /// Fail the named action (`navigate`, `fill`, `click`, `press`,
    /// `screenshot`) for the next `times` calls. `u32::MAX` fails forever.
    pub fn script_failure(&self, action: &str, times: u32) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(action.to_string(), times);
    }

    pub fn locate_attempts(&self) -> Vec<String> {
        self.state.locate_attempts.lock().unwrap().clone()
    }

    pub fn last_locate_timeout(&self) -> Option<Duration> {
        *self.state.last_locate_timeout.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.actions.lock().unwrap().clone()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.state.screenshots.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> u32 {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self, action: &str) -> Result<()> {
        let mut failures = self.state.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(action) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(anyhow!("{} refused by script", action));
            }
        }
        Ok(())
    }

    fn record(&self, action: String) {
        self.state.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.check_failure("navigate")?;
        self.record(format!("navigate:{}", url));
        Ok(())
    }

    async fn locate(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>> {
        let key = selector.to_string();
        self.state.locate_attempts.lock().unwrap().push(key.clone());
        *self.state.last_locate_timeout.lock().unwrap() = Some(timeout);
        Ok(self
            .state
            .elements
            .lock()
            .unwrap()
            .get(&key)
            .map(|id| ElementHandle(*id)))
    }

    async fn count_matches(&self, selector: &Selector) -> Result<usize> {
        Ok(self
            .state
            .counts
            .lock()
            .unwrap()
            .get(&selector.to_string())
            .copied()
            .unwrap_or(0))
    }

    async fn fill(&self, handle: ElementHandle, value: &str) -> Result<()> {
        self.check_failure("fill")?;
        self.record(format!("fill:{}={}", handle.0, value));
        Ok(())
    }

    async fn click(&self, handle: ElementHandle) -> Result<()> {
        self.check_failure("click")?;
        self.record(format!("click:{}", handle.0));
        Ok(())
    }

    async fn press(&self, key: &str) -> Result<()> {
        self.check_failure("press")?;
        self.record(format!("press:{}", key));
        Ok(())
    }

    async fn wait_for_idle(&self) -> Result<()> {
        Ok(())
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<()> {
        self.check_failure("screenshot")?;
        self.state
            .screenshots
            .lock()
            .unwrap()
            .push(path.display().to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out scripted sessions in order. With an empty queue every `open`
/// returns a fresh default driver.
#[derive(Debug, Default)]
pub struct FakeSessionFactory {
    queue: Mutex<VecDeque<Result<FakeDriver, String>>>,
    opened: Mutex<Vec<FakeDriver>>,
}

impl FakeSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_session(&self, driver: FakeDriver) {
        self.queue.lock().unwrap().push_back(Ok(driver));
    }

    pub fn enqueue_refusal(&self, reason: &str) {
        self.queue.lock().unwrap().push_back(Err(reason.to_string()));
    }

    /// Drivers handed out so far, in order.
    pub fn opened(&self) -> Vec<FakeDriver> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
    async fn open(&self, _browser: BrowserKind) -> Result<Box<dyn BrowserDriver>> {
        let next = self.queue.lock().unwrap().pop_front();
        let driver = match next {
            Some(Ok(driver)) => driver,
            Some(Err(reason)) => return Err(anyhow!(reason)),
            None => FakeDriver::new(),
        };
        self.opened.lock().unwrap().push(driver.clone());
        Ok(Box::new(driver))
    }
}
