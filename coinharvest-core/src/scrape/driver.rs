//! Browser page driver trait and the headless Chrome implementation.
//!
//! The driver loads one URL in a fresh tab, waits for it to settle, and
//! returns the text of every `td` cell of the first row selector that
//! matches. Everything above that (URL shape, row parsing, validity) lives
//! in the scrape client so it can be exercised without a browser.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Row selectors tried in order until one yields data rows.
pub const ROW_SELECTORS: &[&str] = &[
    "table tbody tr",
    "table tr",
    "[class*='historical'] table tr",
    "div[class*='table'] tr",
];

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("browser page error: {0}")]
    Page(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
}

/// Cell text extracted from one loaded page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    /// Text of each row's `td` cells, in page order.
    pub rows: Vec<Vec<String>>,
    /// The selector that produced `rows`, if any matched.
    pub selector: Option<String>,
    /// Length of the page HTML, captured when no selector matched.
    pub html_len: Option<usize>,
}

/// Loads a page and extracts table rows.
pub trait PageDriver {
    fn load_table(&self, url: &str, selectors: &[&str]) -> Result<TableSnapshot, ScrapeError>;
}

/// Opens a [`PageDriver`] when the scrape phase starts, so a browser only
/// lives as long as the pages it loads.
pub trait PageLauncher {
    fn launch(&self) -> Result<Box<dyn PageDriver + '_>, ScrapeError>;
}

/// An already-open driver launches as itself.
impl<D: PageDriver> PageLauncher for D {
    fn launch(&self) -> Result<Box<dyn PageDriver + '_>, ScrapeError> {
        Ok(Box::new(self))
    }
}

/// Navigation timing for [`ChromeDriver`].
#[derive(Debug, Clone, Copy)]
pub struct DriverTimings {
    /// Upper bound on navigation.
    pub navigation_timeout: Duration,
    /// Fixed wait after navigation for client-side rendering.
    pub settle_delay: Duration,
}

impl Default for DriverTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(45),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// One headless Chrome process shared by every page of a scrape phase.
pub struct ChromeDriver {
    browser: Browser,
    timings: DriverTimings,
}

impl ChromeDriver {
    /// Launch a headless browser.
    pub fn launch(timings: DriverTimings) -> Result<Self, ScrapeError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            // Must outlive the pauses between tokens.
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let browser = Browser::new(options).map_err(|e| ScrapeError::Launch(e.to_string()))?;
        tracing::info!("headless browser launched");
        Ok(Self { browser, timings })
    }

    fn extract_rows(tab: &Tab, selector: &str) -> Result<Vec<Vec<String>>, ScrapeError> {
        let literal =
            serde_json::to_string(selector).map_err(|e| ScrapeError::Page(e.to_string()))?;
        let script = format!(
            "JSON.stringify(Array.from(document.querySelectorAll({literal})).map(\
             r => Array.from(r.querySelectorAll('td')).map(td => (td.textContent || '').trim())))"
        );
        let result = tab
            .evaluate(&script, false)
            .map_err(|e| ScrapeError::Page(e.to_string()))?;
        let json = match result.value {
            Some(serde_json::Value::String(s)) => s,
            _ => return Ok(Vec::new()),
        };
        serde_json::from_str(&json)
            .map_err(|e| ScrapeError::Page(format!("unexpected row payload: {e}")))
    }
}

/// Closes its tab when dropped, whatever the outcome of the page load.
struct PageGuard(Arc<Tab>);

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(true) {
            tracing::debug!(error = %e, "failed to close tab");
        }
    }
}

/// Launches a fresh [`ChromeDriver`] on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher {
    timings: DriverTimings,
}

impl ChromeLauncher {
    pub fn new(timings: DriverTimings) -> Self {
        Self { timings }
    }
}

impl PageLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn PageDriver + '_>, ScrapeError> {
        Ok(Box::new(ChromeDriver::launch(self.timings)?))
    }
}

impl PageDriver for ChromeDriver {
    fn load_table(&self, url: &str, selectors: &[&str]) -> Result<TableSnapshot, ScrapeError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| ScrapeError::Page(e.to_string()))?;
        let page = PageGuard(tab);
        page.0.set_default_timeout(self.timings.navigation_timeout);

        page.0
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        std::thread::sleep(self.timings.settle_delay);

        for selector in selectors {
            let rows = Self::extract_rows(&page.0, selector)?;
            if rows.iter().any(|cells| !cells.is_empty()) {
                tracing::debug!(selector, rows = rows.len(), "row selector matched");
                return Ok(TableSnapshot {
                    rows,
                    selector: Some(selector.to_string()),
                    html_len: None,
                });
            }
        }

        let html_len = page.0.get_content().ok().map(|html| html.len());
        Ok(TableSnapshot {
            rows: Vec::new(),
            selector: None,
            html_len,
        })
    }
}

impl<T: PageDriver + ?Sized> PageDriver for Box<T> {
    fn load_table(&self, url: &str, selectors: &[&str]) -> Result<TableSnapshot, ScrapeError> {
        (**self).load_table(url, selectors)
    }
}

impl<T: PageDriver + ?Sized> PageDriver for &T {
    fn load_table(&self, url: &str, selectors: &[&str]) -> Result<TableSnapshot, ScrapeError> {
        (**self).load_table(url, selectors)
    }
}
