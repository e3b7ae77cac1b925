//! Snapshot extraction: page validity, lead-paragraph snippet, and the
//! ordered screenshot fallback chain.

use async_trait::async_trait;
use tracing::{debug, error};
use wikipeek_core::config::{RenderConfig, SelectorConfig, WikiConfig};
use wikipeek_core::error::WikipeekError;

use crate::session::{ChromiumSession, DomSession};

/// Outcome of one snapshot run.
///
/// `textblock` and `screenshot` are always absent when `success` is
/// false; screenshot presence is otherwise independent of textblock
/// presence.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Page existed and carried no invalid-page sentinel.
    pub success: bool,
    /// Newline-stripped lead paragraph, when one was found.
    pub textblock: Option<String>,
    /// PNG bytes of the first fallback selector that matched.
    pub screenshot: Option<Vec<u8>>,
}

impl ExtractionResult {
    /// Page unreachable, timed out, or marked non-existent.
    pub fn failure() -> Self {
        Self::default()
    }
}

/// Snapshot extraction behind a trait so the reply pipeline can be
/// exercised with a test double.
#[async_trait]
pub trait Snapshotter: Send + Sync {
    /// Render `url` and extract. Returns `Err` only when the rendering
    /// session itself cannot be brought up; page-content problems
    /// (including navigation failures) come back as `success = false`.
    async fn extract(&self, url: &str) -> Result<ExtractionResult, WikipeekError>;
}

/// The chromium-backed engine. One isolated browser per `extract` call.
pub struct SnapshotEngine {
    wiki: WikiConfig,
    render: RenderConfig,
}

impl SnapshotEngine {
    pub fn new(wiki: WikiConfig, render: RenderConfig) -> Self {
        Self { wiki, render }
    }
}

#[async_trait]
impl Snapshotter for SnapshotEngine {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, WikipeekError> {
        let mut session = ChromiumSession::launch(&self.render).await?;
        let result = run_extraction(&mut session, &self.wiki.selectors, url).await;
        session.close().await;
        Ok(result)
    }
}

/// Drive one session through validity detection and extraction.
///
/// Callers own the session lifecycle; this function never closes it.
pub(crate) async fn run_extraction(
    session: &mut dyn DomSession,
    selectors: &SelectorConfig,
    url: &str,
) -> ExtractionResult {
    if let Err(e) = session.navigate(url).await {
        error!("navigation to {url} failed: {e}");
        return ExtractionResult::failure();
    }

    if session.has_element(&selectors.invalid_page).await {
        debug!("invalid-page sentinel present at {url}");
        return ExtractionResult::failure();
    }

    ExtractionResult {
        success: true,
        textblock: select_textblock(session, selectors).await,
        screenshot: select_screenshot(session, selectors).await,
    }
}

/// Pages with an infobox push the lead paragraph down by one position,
/// so take the second paragraph there and the first everywhere else.
async fn select_textblock(
    session: &mut dyn DomSession,
    selectors: &SelectorConfig,
) -> Option<String> {
    if !session.has_element(&selectors.paragraphs).await {
        return None;
    }

    let infobox_in_content = format!("{} {}", selectors.paragraphs, selectors.infobox);
    let index = if session.has_element(&infobox_in_content).await {
        2
    } else {
        1
    };

    let paragraph = format!("{} > p:nth-of-type({index})", selectors.paragraphs);
    let text = session.inner_text(&paragraph).await?;
    Some(text.replace(['\n', '\r'], ""))
}

/// Ordered fallback chain: info-card, then item-box, then generic table.
/// The first selector that matches wins; later ones are never tried.
async fn select_screenshot(
    session: &mut dyn DomSession,
    selectors: &SelectorConfig,
) -> Option<Vec<u8>> {
    for selector in [&selectors.info_card, &selectors.item_box, &selectors.table] {
        if session.has_element(selector).await {
            return session.screenshot_element(selector).await;
        }
    }
    None
}
