//! Word-frequency heatmaps.
//!
//! Text is sent to an analysis service that splits it into tokens and scores
//! each word by corpus frequency (occurrences per million words). The response
//! is sorted and gap-filled, then rendered as a sequence of display units in
//! which every word is tinted by rarity and carries a frequency tooltip.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use wordheat_rs::{Heatmap, HeatmapConfig, HtmlView, HttpBackend};
//!
//! let backend = HttpBackend::new(&HeatmapConfig::default())?;
//! let heatmap = Heatmap::new(backend);
//! let mut view = HtmlView::new();
//! heatmap.analyze(&mut view, "The quick brown fox").await;
//! println!("{}", view.output_html());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod color;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod rarity;
pub mod render;
pub mod token;
pub mod view;

#[cfg(feature = "web")]
pub mod web;

pub use client::{AnalysisBackend, HttpBackend};
pub use config::{ConfigError, Endpoint, HeatmapConfig};
pub use error::{AnalysisError, ErrorKind};
pub use normalize::{Normalized, normalize};
pub use pipeline::{Heatmap, Outcome};
pub use rarity::RarityLabel;
pub use render::{DisplayUnit, Highlight, render_html, render_tokens};
pub use token::{AnalysisRequest, Token};
pub use view::{HeatmapView, HtmlView, MemoryView, Notice, Trigger, UiState};
