//! Metrics recompute loop
//!
//! One loop per session, so at most one calculator call is in flight. The
//! loop captures the composition together with its sequence number, runs the
//! calculator, and applies the result only if no mutation landed meanwhile.
//! A superseded result is dropped and the loop immediately recomputes against
//! the latest composition. Mutations that arrive while a call is in flight
//! coalesce into that single follow-up recompute.

use super::session::Session;
use super::status::Activity;
use crate::error::{EditorError, Result};
use brewlog_common::models::{IngredientAddition, Metrics, Recipe};
use std::sync::Arc;
use tracing::debug;

pub(crate) async fn run_recompute_loop(session: Arc<Session>) {
    let mut requests = session.recompute_requests();
    let mut settled: Option<u64> = None;

    loop {
        let pending = async {
            requests
                .wait_for(|&requested| settled.map_or(true, |done| requested > done))
                .await
                .map(|_| ())
        };
        tokio::select! {
            _ = session.shutdown.cancelled() => break,
            waited = pending => {
                if waited.is_err() {
                    break;
                }
            }
        }

        let captured = match session.capture() {
            Ok(captured) => captured,
            Err(_) => break,
        };

        let calculating = session.status.begin(Activity::CalculatingMetrics);
        let result = compute(&session, &captured.recipe, &captured.ingredients).await;
        drop(calculating);

        if session.is_closed() {
            break;
        }
        if session.apply_metrics(captured.seq, result) {
            settled = Some(captured.seq);
        } else {
            debug!(seq = captured.seq, "Discarding metrics for superseded composition");
        }
    }

    debug!("Recompute loop stopped");
}

async fn compute(
    session: &Session,
    recipe: &Recipe,
    ingredients: &[IngredientAddition],
) -> Result<Metrics> {
    let catalog = session.catalog.fetch_all(false).await.map_err(|e| match e {
        EditorError::CatalogUnavailable(reason) => {
            EditorError::MetricsUnavailable(format!("ingredient catalog unavailable: {}", reason))
        }
        other => other,
    })?;

    session
        .calculator
        .compute(recipe, ingredients, &catalog)
        .await
        .map_err(|e| EditorError::MetricsUnavailable(e.to_string()))
}
