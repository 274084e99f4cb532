use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::BrowserKind;
use crate::locator::Selector;

/// Opaque reference to a located element. Valid only for the session that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Browser primitives the step library is written against. Implementations
/// own one live page; every method is asynchronous and fallible.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open an absolute URL and wait for the initial load.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait up to `timeout` for `selector` to appear. `Ok(None)` means the
    /// element never showed up; `Err` is reserved for transport failures.
    async fn locate(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>>;

    /// Count elements currently matching `selector`.
    async fn count_matches(&self, selector: &Selector) -> Result<usize>;

    /// Type `value` into the element behind `handle`, replacing its content.
    async fn fill(&self, handle: ElementHandle, value: &str) -> Result<()>;

    async fn click(&self, handle: ElementHandle) -> Result<()>;

    /// Send a key press (e.g. "Enter") to the focused element.
    async fn press(&self, key: &str) -> Result<()>;

    /// Let in-flight page activity settle.
    async fn wait_for_idle(&self) -> Result<()>;

    /// Write a full-page screenshot to `path`, creating parent directories.
    async fn capture_screenshot(&self, path: &Path) -> Result<()>;

    /// Release the underlying browser session. The scenario runner calls
    /// this exactly once per session, on every exit path.
    async fn close(&self) -> Result<()>;
}

/// Opens fresh, exclusively owned browser sessions. One session per scenario
/// run; the runner releases it before returning.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, browser: BrowserKind) -> Result<Box<dyn BrowserDriver>>;
}
