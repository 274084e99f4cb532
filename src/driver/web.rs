use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page};
use playwright::Playwright;
use tokio::sync::Mutex;

use super::traits::{BrowserDriver, ElementHandle, SessionFactory};
use super::BrowserKind;
use crate::locator::Selector;

/// Session options for the Playwright adapter.
#[derive(Debug, Clone)]
pub struct WebSessionConfig {
    pub headless: bool,
    /// Settle delay used by `wait_for_idle`, in milliseconds.
    pub settle_ms: u64,
}

impl Default for WebSessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            settle_ms: 500,
        }
    }
}

/// One live Playwright page plus the handles located on it.
pub struct PlaywrightSession {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    handles: Mutex<Vec<playwright::api::ElementHandle>>,
    settle: Duration,
}

impl PlaywrightSession {
    pub async fn open(kind: BrowserKind, config: &WebSessionConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match kind {
            BrowserKind::Chromium => {
                playwright
                    .chromium()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserKind::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserKind::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        log::debug!("opened {} session (headless: {})", kind, config.headless);

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            handles: Mutex::new(Vec::new()),
            settle: Duration::from_millis(config.settle_ms),
        })
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .context("Failed to navigate to URL")?;
        Ok(())
    }

    async fn locate(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>> {
        let sel = selector_to_playwright(selector);
        let page = self.page.lock().await;
        let result = page
            .wait_for_selector_builder(&sel)
            .timeout(timeout.as_millis() as f64)
            .wait_for_selector()
            .await;
        drop(page);

        match result {
            Ok(Some(el)) => {
                let mut handles = self.handles.lock().await;
                handles.push(el);
                Ok(Some(ElementHandle((handles.len() - 1) as u64)))
            }
            Ok(None) => Ok(None),
            // The wait API reports a timeout as an error; treat it as absence.
            Err(err) => {
                log::trace!("wait for '{}' gave up: {}", sel, err);
                Ok(None)
            }
        }
    }

    async fn count_matches(&self, selector: &Selector) -> Result<usize> {
        let sel = selector_to_playwright(selector);
        let page = self.page.lock().await;
        let elements = page.query_selector_all(&sel).await?;
        Ok(elements.len())
    }

    async fn fill(&self, handle: ElementHandle, value: &str) -> Result<()> {
        let handles = self.handles.lock().await;
        let el = handles
            .get(handle.0 as usize)
            .context("stale element handle")?;
        el.fill_builder(value).fill().await?;
        Ok(())
    }

    async fn click(&self, handle: ElementHandle) -> Result<()> {
        let handles = self.handles.lock().await;
        let el = handles
            .get(handle.0 as usize)
            .context("stale element handle")?;
        el.click_builder().click().await?;
        Ok(())
    }

    async fn press(&self, key: &str) -> Result<()> {
        let page = self.page.lock().await;
        // down/up instead of press() which misbehaves through the bindings
        page.keyboard.down(key).await?;
        page.keyboard.up(key).await?;
        Ok(())
    }

    async fn wait_for_idle(&self) -> Result<()> {
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .screenshot()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser
            .close()
            .await
            .context("Failed to close browser")?;
        Ok(())
    }
}

/// Opens one fresh Playwright session per scenario.
pub struct PlaywrightSessionFactory {
    config: WebSessionConfig,
}

impl PlaywrightSessionFactory {
    pub fn new(config: WebSessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightSessionFactory {
    async fn open(&self, browser: BrowserKind) -> Result<Box<dyn BrowserDriver>> {
        let session = PlaywrightSession::open(browser, &self.config).await?;
        Ok(Box::new(session))
    }
}

fn selector_to_playwright(selector: &Selector) -> String {
    match selector {
        Selector::Css(css) => css.clone(),
        Selector::Id(id) => format!("#{}", id),
        Selector::Name(name) => format!("[name=\"{}\"]", name),
        Selector::NameContains(fragment) => format!("[name*=\"{}\"]", fragment),
        Selector::Text(text) => format!("text=\"{}\"", text),
        Selector::Placeholder(text) => format!("[placeholder=\"{}\"]", text),
        Selector::TestId(id) => format!("[data-testid=\"{}\"]", id),
        Selector::Role(role) => format!("[role=\"{}\"]", role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_translation() {
        assert_eq!(
            selector_to_playwright(&Selector::css(".add-to-cart")),
            ".add-to-cart"
        );
        assert_eq!(selector_to_playwright(&Selector::id("search")), "#search");
        assert_eq!(
            selector_to_playwright(&Selector::name("search")),
            "[name=\"search\"]"
        );
        assert_eq!(
            selector_to_playwright(&Selector::name_contains("quantity")),
            "[name*=\"quantity\"]"
        );
        assert_eq!(
            selector_to_playwright(&Selector::text("Add to Cart")),
            "text=\"Add to Cart\""
        );
        assert_eq!(
            selector_to_playwright(&Selector::test_id("product")),
            "[data-testid=\"product\"]"
        );
    }
}
