use anyhow::Result;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed desktop user agent sent by both the HTTP client and the browser.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// All tunables for one run, passed explicitly into the fetcher and the
/// replicator so tests can shrink the delays to zero.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Steam store, without a trailing slash.
    pub store_base: String,
    /// Timeout for each wishlist-data request.
    pub request_timeout: Duration,
    /// Courtesy delay between wishlist page downloads.
    pub page_delay: Duration,
    /// Mandatory pause after every add action. Steam rate-limits
    /// back-to-back automated writes and can ban the IP.
    pub add_delay: Duration,
    /// Pause after an unexpected per-item failure before moving on.
    pub recovery_delay: Duration,
    /// Settle time after navigating to a store page.
    pub settle_delay: Duration,
    /// How long to wait for the age-gate interstitial to show up.
    pub gate_wait: Duration,
    /// How long to wait for the wishlist-action element to appear.
    pub element_wait: Duration,
    /// Directory holding the per-page JSON cache for the current run.
    pub cache_dir: PathBuf,
}

impl Config {
    /// Builds the default configuration, resolving the cache directory
    /// under the platform cache location.
    pub fn load() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "wishcopy", "wishcopy")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine cache directory"))?;
        let cache_dir = proj_dirs.cache_dir().join("pages");

        Ok(Self {
            store_base: "https://store.steampowered.com".to_string(),
            request_timeout: Duration::from_secs(30),
            page_delay: Duration::from_secs(1),
            add_delay: Duration::from_secs(4),
            recovery_delay: Duration::from_secs(2),
            settle_delay: Duration::from_secs(1),
            gate_wait: Duration::from_secs(2),
            element_wait: Duration::from_secs(5),
            cache_dir,
        })
    }

    /// URL of one page of the public wishlist-data endpoint.
    pub fn wishlist_url(&self, user_id: &str, page: usize) -> String {
        format!(
            "{}/wishlist/id/{}/wishlistdata/?p={}",
            self.store_base, user_id, page
        )
    }

    /// URL of a game's store page.
    pub fn app_url(&self, app_id: &str) -> String {
        format!("{}/app/{}", self.store_base, app_id)
    }

    /// URL of the store login form.
    pub fn login_url(&self) -> String {
        format!("{}/login/", self.store_base)
    }
}
