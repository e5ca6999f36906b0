use super::config::BrowserConfig;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// Owns the Chrome process for the whole run and hands out tabs, one per
/// combination. The batch runner holds this by value and passes it by
/// reference into each pipeline invocation.
pub struct BrowserManager {
    browser: Arc<Browser>,
    config: BrowserConfig,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Result<Self, BrowserError> {
        // Owned flag strings must outlive the &OsStr arg list
        let mut flags = config.chrome_flags.clone();
        if config.disable_images {
            flags.push("--blink-settings=imagesEnabled=false".to_string());
        }
        if let Some(ua) = &config.user_agent {
            flags.push(format!("--user-agent={}", ua));
        }
        let args: Vec<&OsStr> = flags.iter().map(|f| OsStr::new(f.as_str())).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some(config.window_size))
            .args(args)
            .build()
            .map_err(|e| BrowserError::Configuration(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| BrowserError::Session(e.to_string()))?;

        Ok(Self {
            browser: Arc::new(browser),
            config,
        })
    }

    /// Open a fresh tab with the stealth script applied. The caller is
    /// responsible for closing it when the combination is done.
    pub fn new_tab(&self) -> Result<Arc<Tab>, BrowserError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| BrowserError::Tab(e.to_string()))?;

        tab.set_default_timeout(Duration::from_secs(self.config.timeout_seconds));

        // Same navigator override the site is known to probe for
        let stealth_script = r#"
            Object.defineProperty(navigator, 'webdriver', {
                get: () => undefined
            });
        "#;
        tab.evaluate(stealth_script, false)
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(tab)
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

/// Errors from the browser layer. `Session` means Chrome could not be
/// started at all and is fatal to the whole run.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("failed to start browser: {0}")]
    Session(String),

    #[error("invalid browser configuration: {0}")]
    Configuration(String),

    #[error("failed to open tab: {0}")]
    Tab(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("script execution failed: {0}")]
    Script(String),
}
