//! The page surface the pipeline drives: a trigger control and an output
//! container, behind the [`HeatmapView`] trait.

use crate::render::{DisplayUnit, render_html};
use serde::Serialize;
use std::fmt;
use tracing::error;

pub const IDLE_LABEL: &str = "Analyze";
pub const BUSY_LABEL: &str = "Processing...";

/// The single-block messages that can replace the output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Processing,
    NothingToAnalyze,
    AnalysisFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::Processing => "Analyzing text... This may take a moment for large texts.",
            Notice::NothingToAnalyze => "No text to analyze. Please enter some text.",
            Notice::AnalysisFailed => "Error analyzing text. Please try again.",
        }
    }

    /// CSS class of the block the notice is rendered into.
    pub fn css_class(&self) -> &'static str {
        match self {
            Notice::Processing => "processing-indicator",
            Notice::NothingToAnalyze | Notice::AnalysisFailed => "error-message",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What the output container currently shows.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum UiState {
    #[default]
    Idle,
    Busy,
    Displaying(Vec<DisplayUnit>),
    Empty,
    Error(String),
}

/// The analyze button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub enabled: bool,
    pub label: String,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            enabled: true,
            label: IDLE_LABEL.to_string(),
        }
    }
}

impl Trigger {
    fn busy(&mut self) {
        self.enabled = false;
        self.label = BUSY_LABEL.to_string();
    }

    fn reset(&mut self) {
        *self = Trigger::default();
    }
}

/// Every write replaces the output container in full.
pub trait HeatmapView {
    /// Disables the trigger and shows the in-progress label.
    fn set_busy(&mut self);
    /// Re-enables the trigger and restores its label.
    fn set_idle(&mut self);
    fn render_tokens(&mut self, units: &[DisplayUnit]);
    fn render_notice(&mut self, notice: Notice);
}

impl<V: HeatmapView + ?Sized> HeatmapView for &mut V {
    fn set_busy(&mut self) {
        (**self).set_busy();
    }

    fn set_idle(&mut self) {
        (**self).set_idle();
    }

    fn render_tokens(&mut self, units: &[DisplayUnit]) {
        (**self).render_tokens(units);
    }

    fn render_notice(&mut self, notice: Notice) {
        (**self).render_notice(notice);
    }
}

fn state_for_notice(notice: Notice) -> UiState {
    match notice {
        Notice::Processing => UiState::Busy,
        Notice::NothingToAnalyze => UiState::Empty,
        Notice::AnalysisFailed => UiState::Error(notice.message().to_string()),
    }
}

/// In-memory view that records the current state and how often the trigger
/// was toggled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryView {
    pub trigger: Trigger,
    pub state: UiState,
    pub busy_count: usize,
    pub idle_count: usize,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[DisplayUnit] {
        match &self.state {
            UiState::Displaying(units) => units,
            _ => &[],
        }
    }
}

impl HeatmapView for MemoryView {
    fn set_busy(&mut self) {
        self.trigger.busy();
        self.busy_count += 1;
    }

    fn set_idle(&mut self) {
        self.trigger.reset();
        self.idle_count += 1;
    }

    fn render_tokens(&mut self, units: &[DisplayUnit]) {
        self.state = UiState::Displaying(units.to_vec());
    }

    fn render_notice(&mut self, notice: Notice) {
        self.state = state_for_notice(notice);
    }
}

/// Builds the HTML for the output container and tracks the trigger state, so
/// a server can paint the page after the pipeline finishes.
#[derive(Debug, Clone, Default)]
pub struct HtmlView {
    pub trigger: Trigger,
    output: String,
    idle_resets: usize,
}

impl HtmlView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inner HTML of the output container.
    pub fn output_html(&self) -> &str {
        &self.output
    }

    pub fn into_output_html(self) -> String {
        self.output
    }

    pub fn idle_resets(&self) -> usize {
        self.idle_resets
    }
}

pub fn notice_html(notice: Notice) -> String {
    format!(
        r#"<div class="{}">{}</div>"#,
        notice.css_class(),
        notice.message()
    )
}

impl HeatmapView for HtmlView {
    fn set_busy(&mut self) {
        self.trigger.busy();
    }

    fn set_idle(&mut self) {
        self.trigger.reset();
        self.idle_resets += 1;
    }

    fn render_tokens(&mut self, units: &[DisplayUnit]) {
        self.output = match render_html(units) {
            Ok(html) => html,
            Err(err) => {
                error!(error = %err, "failed to render heatmap fragment");
                notice_html(Notice::AnalysisFailed)
            }
        };
    }

    fn render_notice(&mut self, notice: Notice) {
        self.output = notice_html(notice);
    }
}
