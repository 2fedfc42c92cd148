use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Config;
use crate::session::StoreSession;

const LOGIN_FORM_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A real, headful Chromium session driven over CDP. One instance owns
/// the browser process for the whole run and must be released with
/// [`BrowserSession::close`] on every exit path.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launches a visible browser window so the operator can watch the
    /// run and complete the Steam Guard challenge.
    pub async fn launch() -> Result<Self> {
        info!("launching browser");

        let browser_config = BrowserConfig::builder()
            .with_head()
            .window_size(1280, 720)
            .build()
            .map_err(|err| anyhow::anyhow!("Failed to configure browser: {err}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        // The CDP event stream must be drained for the connection to
        // make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open a browser tab")?;
        page.set_user_agent(crate::config::USER_AGENT).await?;

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Drives the Steam login form. Any second-factor challenge is left
    /// to the operator; the caller pauses until the human confirms.
    pub async fn login(&self, config: &Config, username: &str, password: &str) -> Result<()> {
        info!("navigating to the Steam login page");
        self.navigate(&config.login_url()).await?;

        if !self.wait_for("input[type='text']", LOGIN_FORM_WAIT).await? {
            bail!("Login form did not appear");
        }

        self.fill("input[type='text']", username).await?;
        self.fill("input[type='password']", password).await?;
        self.click("button[type='submit']").await?;

        info!("login form submitted");
        Ok(())
    }

    /// Closes the tab and the browser process and stops the CDP event
    /// loop. Must run on every exit path once a session was launched.
    pub async fn close(mut self) -> Result<()> {
        debug!("closing browser");
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

#[async_trait]
impl StoreSession for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool> {
        // Selectors are internal constants, safe to splice into JS.
        let probe = format!(
            "(() => {{ const el = document.querySelector('{selector}'); \
             return !!el && el.offsetParent !== null; }})()"
        );

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let visible: bool = self.page.evaluate(probe.as_str()).await?.into_value()?;
            if visible {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let element = self.page.find_element(selector).await?;
        Ok(element.attribute(name).await?)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.page.find_element(selector).await?;
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await?
            .click()
            .await?
            .type_str(text)
            .await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let script = format!(
            "(() => {{ \
                const el = document.querySelector('{selector}'); \
                if (!el) return false; \
                el.value = '{value}'; \
                el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                return true; \
             }})()"
        );

        let selected: bool = self.page.evaluate(script.as_str()).await?.into_value()?;
        if !selected {
            bail!("No element matching {selector}");
        }
        Ok(())
    }
}
