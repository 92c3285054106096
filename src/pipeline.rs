//! One analysis round trip: dispatch, normalize, render, report.

use crate::client::AnalysisBackend;
use crate::error::{AnalysisError, ErrorKind};
use crate::normalize::{Normalized, check_partition, normalize};
use crate::render::render_tokens;
use crate::token::AnalysisRequest;
use crate::view::{HeatmapView, Notice};
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::{error, info};

/// How a single analysis ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Rendered { tokens: usize },
    Empty,
    Failed { kind: ErrorKind },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

pub struct Heatmap<B> {
    backend: B,
}

impl<B: AnalysisBackend> Heatmap<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs one analysis of `text` and paints the result into `view`.
    ///
    /// The view is marked busy before the request goes out and returned to
    /// idle exactly once afterwards, whatever the outcome. That includes the
    /// returned future being dropped before it completes.
    pub async fn analyze<V>(&self, view: &mut V, text: &str) -> Outcome
    where
        V: HeatmapView + ?Sized,
    {
        let mut view = IdleGuard::engage(view);
        let started = Instant::now();
        let endpoint = self.backend.endpoint();

        match self.fetch(text).await {
            Ok(Normalized::Empty) => {
                view.render_notice(Notice::NothingToAnalyze);
                info!(endpoint, elapsed_ms = elapsed_ms(started), "nothing to analyze");
                Outcome::Empty
            }
            Ok(Normalized::Tokens(tokens)) => {
                check_partition(text, &tokens);
                let units = render_tokens(&tokens);
                view.render_tokens(&units);
                info!(
                    endpoint,
                    tokens = units.len(),
                    words = units.iter().filter(|unit| unit.is_highlighted()).count(),
                    elapsed_ms = elapsed_ms(started),
                    "rendered heatmap"
                );
                Outcome::Rendered {
                    tokens: units.len(),
                }
            }
            Err(err) => {
                view.render_notice(Notice::AnalysisFailed);
                error!(
                    endpoint,
                    kind = %err.kind(),
                    error = %err,
                    elapsed_ms = elapsed_ms(started),
                    "analysis failed"
                );
                Outcome::Failed { kind: err.kind() }
            }
        }
    }

    async fn fetch(&self, text: &str) -> Result<Normalized, AnalysisError> {
        let body = self.backend.analyze(&AnalysisRequest::new(text)).await?;
        normalize(&body)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

/// Holds the view while an analysis is in flight and resets it on drop.
struct IdleGuard<'a, V: HeatmapView + ?Sized> {
    view: &'a mut V,
}

impl<'a, V: HeatmapView + ?Sized> IdleGuard<'a, V> {
    fn engage(view: &'a mut V) -> Self {
        view.set_busy();
        view.render_notice(Notice::Processing);
        Self { view }
    }
}

impl<V: HeatmapView + ?Sized> Deref for IdleGuard<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        self.view
    }
}

impl<V: HeatmapView + ?Sized> DerefMut for IdleGuard<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        self.view
    }
}

impl<V: HeatmapView + ?Sized> Drop for IdleGuard<'_, V> {
    fn drop(&mut self) {
        self.view.set_idle();
    }
}
