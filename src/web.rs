use crate::client::{AnalysisBackend, HttpBackend};
use crate::config::{ConfigError, HeatmapConfig};
use crate::pipeline::{Heatmap, Outcome};
use crate::render::{DisplayUnit, render_html};
use crate::token::AnalysisRequest;
use crate::view::{HtmlView, MemoryView, Notice, Trigger, UiState, notice_html};
use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info};

type SharedState = Arc<AppState>;
type SharedBackend = Arc<dyn AnalysisBackend>;

pub struct AppState {
    pub heatmap: Heatmap<SharedBackend>,
    pub theme: WebTheme,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

const TAILWIND_HEAD: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#;
const BOOTSTRAP_HEAD: &str = r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-sRIl4kxILFvY47J16cr9ZwB07vP4J8+LH7qKQnuqkuIAvNWLzeN8tE5YBujZqJLB" crossorigin="anonymous">"#;

/// Output container styling shared by the heatmap page and the error page.
const HEATMAP_STYLE: &str = "#heatmap-output { white-space: pre-wrap; line-height: 2.2; }
      .processing-indicator { color: #64748b; font-style: italic; }
      .error-message { color: #b91c1c; }";

/// Per-theme stylesheet and CSS classes for the single heatmap page.
#[derive(Debug, Clone, Copy)]
struct Chrome {
    stylesheet: &'static str,
    body_class: &'static str,
    main_class: &'static str,
    headline_class: &'static str,
    input_class: &'static str,
    button_class: &'static str,
    output_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                stylesheet: TAILWIND_HEAD,
                body_class: "bg-slate-50 text-slate-900",
                main_class: "max-w-4xl mx-auto py-10 px-4 space-y-6",
                headline_class: "text-4xl font-extrabold tracking-tight",
                input_class: "w-full rounded-md border border-slate-300 p-3 font-mono",
                button_class: "rounded-md bg-slate-900 px-4 py-2 text-white font-semibold disabled:opacity-50",
                output_class: "bg-white shadow rounded p-4 min-h-[4rem]",
            },
            WebTheme::Bootstrap => Self {
                stylesheet: BOOTSTRAP_HEAD,
                body_class: "bg-light text-dark",
                main_class: "container col-lg-9 py-5",
                headline_class: "display-5 fw-bold mb-4",
                input_class: "form-control font-monospace mb-3",
                button_class: "btn btn-primary",
                output_class: "card card-body mt-4",
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub heatmap: HeatmapConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: WebTheme::default(),
            heatmap: HeatmapConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Config(ConfigError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Config(err) => write!(f, "config error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<ConfigError> for WebError {
    fn from(value: ConfigError) -> Self {
        WebError::Config(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let backend: SharedBackend = Arc::new(HttpBackend::new(&config.heatmap)?);
    let state = Arc::new(AppState {
        heatmap: Heatmap::new(backend),
        theme: config.theme,
    });
    let router = build_router(state);
    info!(
        %config.addr,
        theme = %config.theme,
        endpoint = %config.heatmap.endpoint,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home).post(analyze_page))
        .route("/api/heatmap", post(api_heatmap))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => "ctrl-c",
        _ = terminate => "terminate",
    };
    info!(signal = received, "draining heatmap requests before shutdown");
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "wordheat-web" }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeForm {
    #[serde(default)]
    text: String,
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    Html(render_page(state.theme, "", &Trigger::default(), String::new()))
}

async fn analyze_page(
    State(state): State<SharedState>,
    Form(form): Form<AnalyzeForm>,
) -> impl IntoResponse {
    let mut view = HtmlView::new();
    state.heatmap.analyze(&mut view, &form.text).await;
    let trigger = view.trigger.clone();
    Html(render_page(
        state.theme,
        &form.text,
        &trigger,
        view.into_output_html(),
    ))
}

#[derive(Debug, Serialize)]
struct HeatmapPayload {
    #[serde(flatten)]
    outcome: Outcome,
    html: String,
    units: Vec<DisplayUnit>,
}

async fn api_heatmap(
    State(state): State<SharedState>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    let mut view = MemoryView::new();
    let outcome = state.heatmap.analyze(&mut view, &request.text).await;
    let html = match state_html(&view.state) {
        Ok(html) => html,
        Err(err) => {
            error!(error = %err, "failed to render heatmap fragment");
            let payload = json!({ "error": "failed to render heatmap", "result": outcome });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };
    let units = match view.state {
        UiState::Displaying(units) => units,
        _ => Vec::new(),
    };
    Json(HeatmapPayload {
        outcome,
        html,
        units,
    })
    .into_response()
}

/// Inner HTML of the output container for a finished pipeline run.
fn state_html(state: &UiState) -> Result<String, askama::Error> {
    match state {
        UiState::Displaying(units) => render_html(units),
        UiState::Empty => Ok(notice_html(Notice::NothingToAnalyze)),
        UiState::Error(_) => Ok(notice_html(Notice::AnalysisFailed)),
        UiState::Busy => Ok(notice_html(Notice::Processing)),
        UiState::Idle => Ok(String::new()),
    }
}

/// `output_html` is trusted markup from the renderer or a notice and is
/// inserted into the output container as is.
fn render_page(theme: WebTheme, text: &str, trigger: &Trigger, output_html: String) -> String {
    let template = PageTemplate {
        chrome: Chrome::new(theme),
        style: HEATMAP_STYLE,
        text,
        trigger,
        output: output_html,
        busy_label: crate::view::BUSY_LABEL,
        processing_html: notice_html(Notice::Processing),
    };
    template
        .render()
        .unwrap_or_else(|err| render_error_page(theme, &err.to_string()))
}

/// Fallback when the page template itself fails: the same head and layout,
/// with the escaped message standing in for the output container.
fn render_error_page(theme: WebTheme, message: &str) -> String {
    let chrome = Chrome::new(theme);
    let message = MarkupDisplay::new_unsafe(message, HtmlEscaper);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Word Frequency Heatmap</title>
    {stylesheet}
    <style>
      {style}
    </style>
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <h1 class="{headline_class}">Word Frequency Heatmap</h1>
      <div id="heatmap-output" class="{output_class}"><div class="error-message">{message}</div></div>
      <a href="/" class="{button_class}">{idle_label}</a>
    </main>
  </body>
</html>"#,
        stylesheet = chrome.stylesheet,
        style = HEATMAP_STYLE,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        headline_class = chrome.headline_class,
        output_class = chrome.output_class,
        button_class = chrome.button_class,
        idle_label = crate::view::IDLE_LABEL,
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Word Frequency Heatmap</title>
    {{ chrome.stylesheet|safe }}
    <style>
      {{ style|safe }}
    </style>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <h1 class="{{ chrome.headline_class }}">Word Frequency Heatmap</h1>
      <p>Rare words glow red, common words green. Hover a word to see how often it appears per million words.</p>
      <form id="analyze-form" method="post" action="/">
        <textarea id="text-input" name="text" rows="8" class="{{ chrome.input_class }}">{{ text }}</textarea>
        <button id="analyze-btn" type="submit" class="{{ chrome.button_class }}"{% if !trigger.enabled %} disabled{% endif %}>{{ trigger.label }}</button>
      </form>
      <div id="heatmap-output" class="{{ chrome.output_class }}">{{ output|safe }}</div>
    </main>
    <script>
      document.getElementById('analyze-form').addEventListener('submit', () => {
        const button = document.getElementById('analyze-btn');
        button.disabled = true;
        button.textContent = '{{ busy_label }}';
        document.getElementById('heatmap-output').innerHTML = '{{ processing_html|safe }}';
      });
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct PageTemplate<'a> {
    chrome: Chrome,
    style: &'static str,
    text: &'a str,
    trigger: &'a Trigger,
    output: String,
    busy_label: &'static str,
    processing_html: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::view::HeatmapView;
    use async_trait::async_trait;
    use axum::{body, body::Body, http::Request, http::header::CONTENT_TYPE};
    use tower::ServiceExt;

    struct StaticBackend {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl AnalysisBackend for StaticBackend {
        fn endpoint(&self) -> &str {
            "static://analyze"
        }

        async fn analyze(&self, _request: &AnalysisRequest) -> Result<Vec<u8>, AnalysisError> {
            match self.reply {
                Some(body) => Ok(body.as_bytes().to_vec()),
                None => Err(AnalysisError::http_status("static://analyze", 503, "down")),
            }
        }
    }

    const CAT_SAT: &str = r##"[
        {"token":"sat","position":4,"frequency":40.0,"color":"hsl(90.0, 100%, 50%)"},
        {"token":"cat","position":0,"frequency":0.5,"color":"#f00","rarity":"Rare"},
        {"token":" ","position":3,"color":null,"frequency":null}
    ]"##;

    fn test_router(reply: Option<&'static str>) -> Router {
        let backend: SharedBackend = Arc::new(StaticBackend { reply });
        let state = Arc::new(AppState {
            heatmap: Heatmap::new(backend),
            theme: WebTheme::Tailwind,
        });
        build_router(state)
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_post(body: &'static str) -> Request<Body> {
        Request::post("/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn home_page_renders_idle_form() {
        let response = test_router(Some("[]"))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains(r#"id="text-input""#));
        assert!(html.contains(">Analyze</button>"));
        assert!(!html.contains(" disabled>"));
        assert!(html.contains(r#"<div id="heatmap-output" class="bg-white shadow rounded p-4 min-h-[4rem]"></div>"#));
    }

    #[tokio::test]
    async fn form_post_renders_heatmap_and_keeps_text() {
        let response = test_router(Some(CAT_SAT))
            .oneshot(form_post("text=cat+sat"))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains(">cat sat</textarea>"));
        let cat = html.find(">cat</span>").expect("cat rendered");
        let sat = html.find(">sat</span>").expect("sat rendered");
        assert!(cat < sat);
        assert!(html.contains(r#"title="Frequency: 0.50 (per million) - Rare""#));
        assert!(html.contains(r#"title="Frequency: 40.00 (per million) - Common""#));
        assert!(html.contains(">Analyze</button>"));
    }

    #[tokio::test]
    async fn form_post_escapes_submitted_text() {
        let response = test_router(Some("[]"))
            .oneshot(form_post("text=%3C%2Ftextarea%3E%3Cscript%3E"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("</textarea><script>"));
        assert!(html.contains("No text to analyze. Please enter some text."));
    }

    #[tokio::test]
    async fn failing_backend_shows_generic_notice() {
        let response = test_router(None)
            .oneshot(form_post("text=hello"))
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains(
            r#"<div class="error-message">Error analyzing text. Please try again.</div>"#
        ));
        assert!(!html.contains("503"));
    }

    #[tokio::test]
    async fn api_heatmap_returns_units_and_fragment() {
        let response = test_router(Some(CAT_SAT))
            .oneshot(
                Request::post("/api/heatmap")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"text":"cat sat"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["outcome"], "rendered");
        assert_eq!(payload["tokens"], 3);
        assert_eq!(payload["units"][0]["text"], "cat");
        assert_eq!(payload["units"][1]["text"], " ");
        assert!(payload["units"][1].get("highlight").is_none());
        assert_eq!(payload["units"][2]["highlight"]["rarity"], "Common");
        assert!(payload["html"].as_str().unwrap().starts_with("<span class=\"heat-token\""));
    }

    #[tokio::test]
    async fn api_heatmap_reports_failure_kind() {
        let response = test_router(None)
            .oneshot(
                Request::post("/api/heatmap")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"text":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload["outcome"], "failed");
        assert_eq!(payload["kind"], "http_status");
        assert_eq!(payload["units"], serde_json::json!([]));
    }

    #[test]
    fn output_container_keeps_rendered_markup() {
        let html = render_page(
            WebTheme::Bootstrap,
            "hello",
            &Trigger::default(),
            notice_html(Notice::AnalysisFailed),
        );
        assert!(html.contains(
            r#"<div id="heatmap-output" class="card card-body mt-4"><div class="error-message">Error analyzing text. Please try again.</div></div>"#
        ));
        assert!(!html.contains("&lt;div"));
        assert!(html.contains("bootstrap.min.css"));
        assert!(!html.contains("@tailwindcss/browser"));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = render_error_page(WebTheme::Tailwind, "<b>template failed</b>");
        assert!(html.contains("&lt;b&gt;template failed&lt;/b&gt;"));
        assert!(!html.contains("<b>template failed"));
        assert!(html.contains("@tailwindcss/browser"));
    }

    #[test]
    fn busy_trigger_renders_disabled_button() {
        let mut view = HtmlView::new();
        view.set_busy();
        let html = render_page(WebTheme::Tailwind, "", &view.trigger, String::new());
        assert!(html.contains(" disabled>Processing...</button>"));
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let response = test_router(None)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert!(body_text(response).await.contains("wordheat-web"));
    }
}
