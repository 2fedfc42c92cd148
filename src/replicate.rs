use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{AppId, Outcome, ReplicationReport};
use crate::session::StoreSession;

/// The page element whose click adds the game to the wishlist and whose
/// hidden state encodes current membership.
const WISHLIST_AREA_SELECTOR: &str = "#add_to_wishlist_area";

const AGE_GATE_SELECTOR: &str = "#app_agegate";
const AGE_DAY_SELECTOR: &str = "#ageDay";
const AGE_MONTH_SELECTOR: &str = "#ageMonth";
const AGE_YEAR_SELECTOR: &str = "#ageYear";
const VIEW_PAGE_SELECTOR: &str = "#view_product_page_btn";

// Fixed birthdate, old enough to pass any age check.
const AGE_DAY: &str = "13";
const AGE_MONTH: &str = "April";
const AGE_YEAR: &str = "1993";

/// Replays a wishlist onto the logged-in account behind `session`,
/// one store page at a time, with the mandatory pause after every add.
pub struct Replicator {
    config: Config,
}

impl Replicator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Visits every app id in order and triggers the add action where
    /// the game is not already wishlisted.
    ///
    /// Counters accumulate into the caller-owned `report`, so a
    /// cancelled run still reports truthful partial totals. No single
    /// item's failure stops the loop.
    pub async fn run<S: StoreSession>(
        &self,
        session: &S,
        app_ids: &[AppId],
        report: &mut ReplicationReport,
    ) {
        let total = app_ids.len();

        for (idx, app_id) in app_ids.iter().enumerate() {
            info!(current = idx + 1, total, app_id = %app_id, "processing app");

            match self.process(session, app_id).await {
                Ok(Outcome::Added) => {
                    info!(app_id = %app_id, "added to wishlist");
                    report.record(Outcome::Added);
                    // Rate-limit hold: exactly once per add, and only
                    // on this path. Skipping it risks an IP ban.
                    sleep(self.config.add_delay).await;
                }
                Ok(Outcome::AlreadyPresent) => {
                    info!(app_id = %app_id, "already in wishlist, skipping");
                    report.record(Outcome::AlreadyPresent);
                }
                Ok(Outcome::ButtonMissing) => {
                    warn!(app_id = %app_id, "wishlist button not found, skipping");
                    report.record(Outcome::ButtonMissing);
                }
                Err(err) => {
                    warn!(app_id = %app_id, error = %err, "failed to process app");
                    report.record_error();
                    sleep(self.config.recovery_delay).await;
                }
            }
        }
    }

    async fn process<S: StoreSession>(&self, session: &S, app_id: &str) -> Result<Outcome> {
        session.navigate(&self.config.app_url(app_id)).await?;
        sleep(self.config.settle_delay).await;

        self.resolve_age_gate(session).await;

        let found = session
            .wait_for(WISHLIST_AREA_SELECTOR, self.config.element_wait)
            .await?;
        if !found {
            return Ok(Outcome::ButtonMissing);
        }

        let style = session.attribute(WISHLIST_AREA_SELECTOR, "style").await?;
        if is_already_wishlisted(style.as_deref()) {
            return Ok(Outcome::AlreadyPresent);
        }

        session.click(WISHLIST_AREA_SELECTOR).await?;
        Ok(Outcome::Added)
    }

    /// Submits the fixed birthdate if the age interstitial is showing.
    /// A failure here is not fatal: the item is processed as if no gate
    /// were present and may then fail the membership check instead.
    async fn resolve_age_gate<S: StoreSession>(&self, session: &S) {
        match self.pass_age_gate(session).await {
            Ok(true) => debug!("age gate passed"),
            Ok(false) => {}
            Err(err) => debug!(error = %err, "age gate handling failed, continuing"),
        }
    }

    async fn pass_age_gate<S: StoreSession>(&self, session: &S) -> Result<bool> {
        if !session
            .is_visible(AGE_GATE_SELECTOR, self.config.gate_wait)
            .await?
        {
            return Ok(false);
        }

        session.select_option(AGE_DAY_SELECTOR, AGE_DAY).await?;
        session.select_option(AGE_MONTH_SELECTOR, AGE_MONTH).await?;
        session.select_option(AGE_YEAR_SELECTOR, AGE_YEAR).await?;
        session.click(VIEW_PAGE_SELECTOR).await?;
        Ok(true)
    }
}

/// Membership check: Steam hides the add control when the game is
/// already on the wishlist. This is the only place that interprets the
/// store page's markup for membership, since the attribute is fragile
/// to site changes.
fn is_already_wishlisted(style: Option<&str>) -> bool {
    style.is_some_and(|s| s.contains("display: none"))
}
