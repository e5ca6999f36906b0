use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Directory receiving all artifacts (CSVs, raw snapshots, logs)
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum scroll steps per combination
    #[serde(default = "default_scroll_count")]
    pub scroll_count: usize,

    /// Base pause after each scroll step in milliseconds
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ms: u64,

    /// Random extra pause added on top of the base, 0..=jitter
    #[serde(default = "default_scroll_jitter")]
    pub scroll_jitter_ms: u64,

    /// Stop scrolling after this many consecutive steps with no new response
    #[serde(default = "default_quiet_limit")]
    pub quiet_scroll_limit: usize,

    /// Wait after page load for the initial listing request to fire
    #[serde(default = "default_initial_wait")]
    pub initial_wait_secs: u64,

    /// Bounded window to wait for the first matching API response
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_secs: u64,

    /// Whole-combination retries after a capture timeout
    #[serde(default = "default_capture_retries")]
    pub capture_retries: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Navigation and selector-wait timeout in seconds
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,

    /// Skip image loading; the listing data comes from the API, not the DOM
    #[serde(default = "default_true")]
    pub disable_images: bool,

    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategoryEntry {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationEntry {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_output_dir() -> String {
    "blinkit_data".to_string()
}
fn default_scroll_count() -> usize {
    15
}
fn default_scroll_pause() -> u64 {
    3000
}
fn default_scroll_jitter() -> u64 {
    1000
}
fn default_quiet_limit() -> usize {
    3
}
fn default_initial_wait() -> u64 {
    10
}
fn default_capture_timeout() -> u64 {
    20
}
fn default_capture_retries() -> usize {
    2
}
fn default_true() -> bool {
    true
}
fn default_window_width() -> u32 {
    1920
}
fn default_window_height() -> u32 {
    1080
}
fn default_browser_timeout() -> u64 {
    30
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            scroll_count: default_scroll_count(),
            scroll_pause_ms: default_scroll_pause(),
            scroll_jitter_ms: default_scroll_jitter(),
            quiet_scroll_limit: default_quiet_limit(),
            initial_wait_secs: default_initial_wait(),
            capture_timeout_secs: default_capture_timeout(),
            capture_retries: default_capture_retries(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            timeout_secs: default_browser_timeout(),
            disable_images: true,
            user_agent: None,
        }
    }
}

impl Config {
    /// Load configuration from the given path, falling back to defaults when
    /// the file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("ignoring malformed {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("could not read {}: {}", path.display(), e),
            }
        }
        Self::default()
    }
}

impl BrowserSettings {
    /// Translate the file-level settings into a launchable browser config.
    pub fn to_browser_config(&self) -> crate::browser::BrowserConfig {
        let mut config = crate::browser::BrowserConfig::default();
        config.headless = self.headless;
        config.window_size = (self.window_width, self.window_height);
        config.timeout_seconds = self.timeout_secs;
        config.disable_images = self.disable_images;
        if let Some(ua) = &self.user_agent {
            config.user_agent = Some(ua.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.scraper.output_dir, "blinkit_data");
        assert_eq!(cfg.scraper.scroll_count, 15);
        assert!(cfg.browser.headless);
        assert!(cfg.categories.is_empty());
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [scraper]
            output_dir = "out"
            scroll_count = 5

            [[categories]]
            url = "https://blinkit.com/cn/munchies/bhujia-mixtures/cid/1237/1178"

            [[locations]]
            lat = 28.6
            lng = 77.2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.scraper.output_dir, "out");
        assert_eq!(cfg.scraper.scroll_count, 5);
        // Unspecified keys keep their defaults
        assert_eq!(cfg.scraper.capture_retries, 2);
        assert_eq!(cfg.categories.len(), 1);
        assert_eq!(cfg.locations[0].label, None);
    }
}
