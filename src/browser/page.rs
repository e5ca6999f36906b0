use super::manager::BrowserError;
use headless_chrome::Tab;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Known selectors on the listing page. The card selector mirrors the site's
/// grid layout; all of these are expected to need maintenance when the site
/// changes.
const LISTING_CONTAINER: &str = "#plpContainer";
const PRODUCT_CARD: &str = "div > div > div[style*='grid-column: span']";

const LOCATION_BUTTONS: &[&str] = &[
    ".LocationBar__Container-sc-x8ezho-6",
    ".LocationBar__Container",
    "[data-testid='location-button']",
];
const LOCATION_INPUTS: &[&str] = &[
    "input[name='select-locality']",
    "input[placeholder*='search delivery location']",
    "input[placeholder*='location']",
    ".LocationSearchBox__InputSelect",
];
const LOCATION_RESULTS: &[&str] = &[
    ".LocationSearchList__LocationDetailContainer-sc-93rfr7-1",
    ".LocationSearchList__LocationDetailContainer",
    "[data-testid='location-search-result']",
];

const LOCATION_RETRIES: usize = 3;

/// Drives one tab through a category listing page: navigation, the delivery
/// location modal, and the container scrolling that triggers the listing API.
pub struct PageDriver {
    tab: Arc<Tab>,
    default_timeout: Duration,
}

impl PageDriver {
    pub fn new(tab: Arc<Tab>, timeout: Duration) -> Self {
        Self {
            tab,
            default_timeout: timeout,
        }
    }

    /// Navigate to a URL and wait for page load.
    pub fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.tab.navigate_to(url).map_err(|e| {
            BrowserError::Navigation(format!("failed to navigate to {}: {}", url, e))
        })?;

        self.tab.wait_until_navigated().map_err(|e| {
            BrowserError::Navigation(format!("navigation timeout for {}: {}", url, e))
        })?;

        Ok(())
    }

    /// Wait for an element matching the given CSS selector.
    pub fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let start = Instant::now();

        loop {
            if start.elapsed() > timeout {
                return Err(BrowserError::Timeout(format!(
                    "waiting for selector: {}",
                    selector
                )));
            }

            if self.element_exists(selector)? {
                return Ok(());
            }

            std::thread::sleep(Duration::from_millis(100));
        }
    }

    fn element_exists(&self, selector: &str) -> Result<bool, BrowserError> {
        let script = format!(
            r#"document.querySelector('{}') !== null"#,
            selector.replace('\'', "\\'")
        );

        match self.tab.evaluate(&script, false) {
            Ok(result) => Ok(result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false)),
            // Evaluation can fail transiently mid-navigation; treat as absent
            Err(_) => Ok(false),
        }
    }

    /// Wait for the product listing to appear: the container first, then the
    /// card selector as a fallback for layout variants without the container.
    pub fn wait_for_listing(&self) -> Result<(), BrowserError> {
        if self.wait_for_selector(LISTING_CONTAINER, self.default_timeout).is_ok() {
            return Ok(());
        }

        log::warn!("listing container not found, trying product card selector");
        self.wait_for_selector(PRODUCT_CARD, Duration::from_secs(10))
    }

    /// Number of product cards currently rendered.
    pub fn product_card_count(&self) -> Result<u64, BrowserError> {
        let script = format!(
            r#"document.querySelectorAll("{}").length"#,
            PRODUCT_CARD
        );

        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(result.value.and_then(|v| v.as_u64()).unwrap_or(0))
    }

    /// Scroll the listing container by one step, falling back to window
    /// scrolling when the container is absent. Returns whether the scroll
    /// position advanced.
    pub fn scroll_step(&self) -> Result<bool, BrowserError> {
        let script = r#"
            (function() {
                var container = document.querySelector('#plpContainer');
                if (container) {
                    var oldScroll = container.scrollTop;
                    container.scrollTop += 500;
                    return container.scrollTop > oldScroll;
                }
                var oldY = window.scrollY;
                window.scrollBy(0, 500);
                return window.scrollY > oldY;
            })()
        "#;

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::Script(format!("scroll failed: {}", e)))?;

        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let script = format!(
            r#"
            (function() {{
                var el = document.querySelector('{}');
                if (!el) return false;
                el.scrollIntoView({{block: 'center'}});
                el.click();
                return true;
            }})()
            "#,
            selector.replace('\'', "\\'")
        );

        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| BrowserError::Script(format!("click failed: {}", e)))?;

        if result.value.and_then(|v| v.as_bool()) == Some(true) {
            Ok(())
        } else {
            Err(BrowserError::Script(format!("no element for {}", selector)))
        }
    }

    fn click_first_of(&self, selectors: &[&str]) -> bool {
        for sel in selectors {
            if self.click(sel).is_ok() {
                log::debug!("clicked {}", sel);
                return true;
            }
        }
        false
    }

    /// Open the delivery-location modal, type the query, and pick the first
    /// suggestion. Failure here is non-fatal: the caller falls back to the
    /// site's default location.
    pub fn set_location(&self, query: &str) -> Result<(), BrowserError> {
        for attempt in 1..=LOCATION_RETRIES {
            match self.try_set_location(query) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < LOCATION_RETRIES => {
                    log::warn!(
                        "location attempt {}/{} failed: {}",
                        attempt,
                        LOCATION_RETRIES,
                        e
                    );
                    std::thread::sleep(Duration::from_secs(2));
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("location retry loop returns on last attempt")
    }

    fn try_set_location(&self, query: &str) -> Result<(), BrowserError> {
        if !self.click_first_of(LOCATION_BUTTONS) {
            // Last resort: anything whose text mentions delivery
            self.click_delivery_text_element()?;
        }
        std::thread::sleep(Duration::from_secs(2));

        let input = LOCATION_INPUTS
            .iter()
            .find(|sel| self.element_exists(sel).unwrap_or(false))
            .ok_or_else(|| BrowserError::Timeout("location search input".to_string()))?;
        self.click(input)?;

        self.tab
            .type_str(query)
            .map_err(|e| BrowserError::Script(format!("typing query failed: {}", e)))?;
        std::thread::sleep(Duration::from_secs(3));

        if !self.click_first_of(LOCATION_RESULTS) {
            return Err(BrowserError::Timeout("location search results".to_string()));
        }

        self.wait_for_location_reload();
        Ok(())
    }

    fn click_delivery_text_element(&self) -> Result<(), BrowserError> {
        let script = r#"
            (function() {
                var els = document.querySelectorAll('div, button');
                for (var i = 0; i < els.length; i++) {
                    var t = (els[i].textContent || '').toLowerCase();
                    if (t.indexOf('deliver') !== -1 && t.length < 60) {
                        els[i].click();
                        return true;
                    }
                }
                return false;
            })()
        "#;

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        if result.value.and_then(|v| v.as_bool()) == Some(true) {
            Ok(())
        } else {
            Err(BrowserError::Timeout("location bar".to_string()))
        }
    }

    /// The page reloads with coordinates in the URL once a location sticks.
    fn wait_for_location_reload(&self) {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(10) {
            if self.tab.get_url().contains("latitude=") {
                log::debug!("location confirmed via URL parameters");
                return;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
        // No URL confirmation; give the reload a moment anyway
        std::thread::sleep(Duration::from_secs(5));
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}
