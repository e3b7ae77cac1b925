//! Rendering session abstraction and its chromiumoxide implementation.
//!
//! The extraction logic in [`crate::engine`] only talks to [`DomSession`],
//! so selector handling is testable against a fake DOM.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wikipeek_core::config::RenderConfig;
use wikipeek_core::error::WikipeekError;

/// One isolated page-rendering session.
#[async_trait]
pub trait DomSession: Send {
    /// Navigate and wait for the `load` lifecycle event. Other wait
    /// strategies hang or lose time on the target wiki.
    async fn navigate(&mut self, url: &str) -> Result<(), WikipeekError>;

    /// Whether any element matches the selector.
    async fn has_element(&self, selector: &str) -> bool;

    /// Rendered inner text of the first matching element.
    async fn inner_text(&self, selector: &str) -> Option<String>;

    /// Cropped screenshot of the first matching element's bounding box.
    async fn screenshot_element(&self, selector: &str) -> Option<Vec<u8>>;

    /// Release the session. Must be called on every exit path.
    async fn close(&mut self);
}

/// `DomSession` backed by a dedicated Chromium process.
///
/// Nothing is shared between sessions: each launch gets its own browser,
/// profile, cookies, and cache.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    pub async fn launch(cfg: &RenderConfig) -> Result<Self, WikipeekError> {
        let mut args = vec![
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-setuid-sandbox".to_string(),
        ];
        if std::env::var("CI").is_ok()
            || std::env::var("NO_SANDBOX").is_ok()
            || unsafe { libc::geteuid() == 0 }
        {
            args.push("--no-sandbox".to_string());
        }

        let mut builder = BrowserConfig::builder()
            .window_size(cfg.viewport_width, cfg.viewport_height)
            .args(args);
        if let Some(ref bin) = cfg.chrome_executable {
            builder = builder.chrome_executable(bin);
        }
        let config = builder
            .build()
            .map_err(|e| WikipeekError::Snapshot(format!("browser config failed: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| WikipeekError::Snapshot(format!("browser launch failed: {e}")))?;

        // Drain CDP events until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // The browser process exists from here on; a failure opening the
        // page must still tear it down.
        let page = match open_page(&browser, cfg).await {
            Ok(page) => page,
            Err(e) => {
                shutdown_browser(&mut browser, &handler_task).await;
                return Err(e);
            }
        };

        Ok(Self {
            browser,
            page,
            handler_task,
            navigation_timeout: Duration::from_secs(cfg.navigation_timeout_secs),
        })
    }
}

async fn open_page(browser: &Browser, cfg: &RenderConfig) -> Result<Page, WikipeekError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| WikipeekError::Snapshot(format!("page open failed: {e}")))?;

    if !cfg.enable_javascript {
        page.execute(SetScriptExecutionDisabledParams::new(true))
            .await
            .map_err(|e| WikipeekError::Snapshot(format!("disabling scripting failed: {e}")))?;
    }

    Ok(page)
}

/// Stop the browser process and the event drain. Shared between
/// `close` and the launch failure path.
async fn shutdown_browser(browser: &mut Browser, handler_task: &JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!("browser close: {e}");
    }
    if let Err(e) = browser.wait().await {
        warn!("browser wait: {e}");
    }
    handler_task.abort();
}

#[async_trait]
impl DomSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), WikipeekError> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| WikipeekError::Snapshot(format!("navigation failed: {e}")))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| WikipeekError::Snapshot(format!("load event failed: {e}")))?;
            Ok(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(WikipeekError::Snapshot(format!(
                "navigation timed out after {}s",
                self.navigation_timeout.as_secs()
            ))),
        }
    }

    async fn has_element(&self, selector: &str) -> bool {
        self.page.find_element(selector).await.is_ok()
    }

    async fn inner_text(&self, selector: &str) -> Option<String> {
        let element = self.page.find_element(selector).await.ok()?;
        element.inner_text().await.ok().flatten()
    }

    async fn screenshot_element(&self, selector: &str) -> Option<Vec<u8>> {
        let element = self.page.find_element(selector).await.ok()?;
        match element.screenshot(CaptureScreenshotFormat::Png).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("screenshot of '{selector}' failed: {e}");
                None
            }
        }
    }

    async fn close(&mut self) {
        // Page::close consumes the handle; Page is a cheap Arc clone.
        if let Err(e) = self.page.clone().close().await {
            debug!("page close: {e}");
        }
        shutdown_browser(&mut self.browser, &self.handler_task).await;
    }
}
