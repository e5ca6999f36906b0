//! Network response capture.
//!
//! The listing page fetches its products from a backend API; a CDP response
//! handler on the tab watches for that request and collects the raw JSON
//! bodies. The URL pattern is the only contract with the site.

use headless_chrome::Tab;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// URL fragment identifying the listing API among the page's traffic.
pub const LISTING_API_PATTERN: &str = "v1/layout/listing_widgets";

const HANDLER_NAME: &str = "listing_capture";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no matching API response within {waited_secs}s")]
    Timeout { waited_secs: u64 },

    #[error("failed to register response handler: {0}")]
    Handler(String),
}

/// Collects bodies of listing-API responses seen on one tab. Deregisters its
/// CDP handler on drop, so a capturer never outlives its combination.
pub struct ResponseCapturer {
    tab: Arc<Tab>,
    payloads: Arc<Mutex<Vec<String>>>,
}

impl ResponseCapturer {
    pub fn attach(tab: &Arc<Tab>, url_pattern: &str) -> Result<Self, CaptureError> {
        let payloads: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let payloads_clone = payloads.clone();
        let seen_requests: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let pattern = url_pattern.to_string();

        tab.register_response_handling(
            HANDLER_NAME,
            Box::new(move |event_params, fetch_body| {
                let response = &event_params.response;
                if !response.url.contains(&pattern) {
                    return;
                }
                let status = response.status as i64;
                if !(200..300).contains(&status) {
                    return;
                }

                // One body per request id; Chrome can replay the event
                let request_id = event_params.request_id.clone();
                {
                    let mut seen = seen_requests.lock().unwrap();
                    if !seen.insert(request_id) {
                        return;
                    }
                }

                // Body may lag the response event slightly
                std::thread::sleep(Duration::from_millis(100));
                match fetch_body() {
                    Ok(body_obj) => {
                        let body = body_obj.body;
                        if body.is_empty() {
                            log::warn!("empty body for {}", response.url);
                            return;
                        }
                        log::info!("captured API response ({} bytes)", body.len());
                        payloads_clone.lock().unwrap().push(body);
                    }
                    Err(e) => log::warn!("could not fetch response body: {}", e),
                }
            }),
        )
        .map_err(|e| CaptureError::Handler(e.to_string()))?;

        Ok(Self {
            tab: tab.clone(),
            payloads,
        })
    }

    /// Number of payloads collected so far.
    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    /// Block until at least one payload has been captured, or time out.
    pub fn wait_for_first(&self, timeout: Duration) -> Result<(), CaptureError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.count() > 0 {
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Err(CaptureError::Timeout {
            waited_secs: timeout.as_secs(),
        })
    }

    /// Drain everything captured so far.
    pub fn take_payloads(&self) -> Vec<String> {
        std::mem::take(&mut *self.payloads.lock().unwrap())
    }
}

impl Drop for ResponseCapturer {
    fn drop(&mut self) {
        let _ = self.tab.deregister_response_handling(HANDLER_NAME);
    }
}
