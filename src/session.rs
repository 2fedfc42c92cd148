use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Narrow capability surface of an interactive, authenticated browser
/// session. The replicator depends only on this trait, never on a
/// concrete automation engine, so its loop is testable with a fake.
#[async_trait]
pub trait StoreSession {
    /// Navigates the session to the given URL.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Waits up to `timeout` for an element matching `selector` to be
    /// present. `Ok(false)` means the wait elapsed without a match.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Waits up to `timeout` for an element matching `selector` to be
    /// present *and* visible. `Ok(false)` means it never was.
    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Reads an attribute of the first element matching `selector`.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Types `text` into the first element matching `selector`.
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// Selects the option with the given value in a dropdown.
    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;
}
