use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use atty::Stream;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use termimad::crossterm::style::{Color, Stylize};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;
use wordheat_rs::color::parse_css_color;
use wordheat_rs::render::plain_text;
use wordheat_rs::{
    DisplayUnit, Endpoint, Heatmap, HeatmapConfig, HeatmapView, HtmlView, HttpBackend, MemoryView,
    Notice, Outcome, RarityLabel, UiState,
};

#[derive(Parser, Debug)]
#[command(
    name = "wordheat-rs",
    about = "Color text by how rare each word is",
    version
)]
pub struct Cli {
    /// Analysis endpoint that text is POSTed to. Takes precedence over --base-url.
    #[arg(long, global = true, env = "WORDHEAT_ENDPOINT")]
    endpoint: Option<String>,

    /// Resolve the endpoint against this origin as `<origin>/analyze`.
    #[arg(long, global = true, env = "WORDHEAT_BASE_URL")]
    base_url: Option<String>,

    /// Give up on the analysis service after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log request and normalization details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze text and print its heatmap.
    Analyze {
        /// Text to analyze. Read from --file or stdin when omitted.
        text: Option<String>,
        /// Read the text from a file.
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// How to print the result.
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },
    /// Print the rarity label for one or more per-million frequencies.
    Classify {
        #[arg(required = true, allow_negative_numbers = true)]
        frequencies: Vec<f64>,
    },
    /// Serve the heatmap page over HTTP.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        /// CSS framework for the page.
        #[arg(long, value_enum, default_value_t = ThemeArg::Tailwind)]
        theme: ThemeArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Colored terminal output when stdout is a terminal, plain text otherwise.
    Auto,
    Ansi,
    Plain,
    Html,
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeArg {
    Tailwind,
    Bootstrap,
}

pub fn run() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    let default_filter = match (&cli.command, cli.verbose) {
        (_, true) => "wordheat_rs=debug,info",
        (Command::Serve { .. }, false) => "info",
        _ => "warn",
    };
    init_tracing(default_filter);
    let config = heatmap_config(&cli)?;

    match cli.command {
        Command::Analyze { text, file, format } => handle_analyze(config, text, file, format),
        Command::Classify { frequencies } => {
            handle_classify(&frequencies);
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { addr, theme } => handle_serve(config, addr, theme),
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn heatmap_config(cli: &Cli) -> Result<HeatmapConfig, Box<dyn Error>> {
    let endpoint = match (&cli.endpoint, &cli.base_url) {
        (Some(url), _) => Endpoint::fixed(url)?,
        (None, Some(base)) => Endpoint::same_origin(base)?,
        (None, None) => Endpoint::default(),
    };
    let mut config = HeatmapConfig::default().with_endpoint(endpoint);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs))?;
    }
    Ok(config)
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String, Box<dyn Error>> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return fs::read_to_string(&path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display()).into());
    }
    if atty::is(Stream::Stdin) {
        return Err("No text given. Pass TEXT, --file, or pipe text on stdin".into());
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn handle_analyze(
    config: HeatmapConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode, Box<dyn Error>> {
    let text = read_input(text, file)?;
    let heatmap = Heatmap::new(HttpBackend::new(&config)?);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = match format {
        OutputFormat::Auto | OutputFormat::Ansi | OutputFormat::Plain => {
            let colored = match format {
                OutputFormat::Ansi => true,
                OutputFormat::Plain => false,
                _ => stdout_is_tty(),
            };
            let mut view = TerminalView::new(colored, atty::is(Stream::Stderr));
            runtime.block_on(heatmap.analyze(&mut view, &text))
        }
        OutputFormat::Html => {
            let mut view = HtmlView::new();
            let outcome = runtime.block_on(heatmap.analyze(&mut view, &text));
            println!("{}", view.output_html());
            outcome
        }
        OutputFormat::Json => {
            let mut view = MemoryView::new();
            let outcome = runtime.block_on(heatmap.analyze(&mut view, &text));
            let payload = json!({ "result": outcome, "view": view.state });
            println!("{}", serde_json::to_string_pretty(&payload)?);
            outcome
        }
        OutputFormat::Table => {
            let mut view = MemoryView::new();
            let outcome = runtime.block_on(heatmap.analyze(&mut view, &text));
            print_outcome_table(&view.state);
            outcome
        }
    };

    Ok(exit_code(outcome))
}

fn exit_code(outcome: Outcome) -> ExitCode {
    if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn handle_classify(frequencies: &[f64]) {
    println!("{:>12}  {}", "FREQUENCY", "RARITY");
    println!("{:->12}  {}", "", "-----------");
    for &frequency in frequencies {
        println!("{:>12.2}  {}", frequency, RarityLabel::classify(frequency));
    }
}

#[cfg(feature = "web")]
fn handle_serve(
    config: HeatmapConfig,
    addr: SocketAddr,
    theme: ThemeArg,
) -> Result<ExitCode, Box<dyn Error>> {
    use wordheat_rs::web::{WebConfig, WebTheme, serve};

    let theme = match theme {
        ThemeArg::Tailwind => WebTheme::Tailwind,
        ThemeArg::Bootstrap => WebTheme::Bootstrap,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(WebConfig {
        addr,
        theme,
        heatmap: config,
    }))?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "web"))]
fn handle_serve(
    _config: HeatmapConfig,
    _addr: SocketAddr,
    _theme: ThemeArg,
) -> Result<ExitCode, Box<dyn Error>> {
    Err("The web server is disabled. Rebuild with `--features web` to enable it.".into())
}

/// Prints the heatmap to stdout; progress goes to stderr so piped output stays
/// clean.
struct TerminalView {
    colored: bool,
    progress: bool,
}

impl TerminalView {
    fn new(colored: bool, progress: bool) -> Self {
        Self { colored, progress }
    }
}

impl HeatmapView for TerminalView {
    fn set_busy(&mut self) {}

    fn set_idle(&mut self) {
        if self.progress {
            // Clear the in-progress line.
            eprint!("\r\x1b[2K");
        }
    }

    fn render_tokens(&mut self, units: &[DisplayUnit]) {
        self.set_idle();
        if !self.colored {
            println!("{}", plain_text(units));
            return;
        }
        let mut line = String::new();
        for unit in units {
            line.push_str(&paint(unit));
        }
        println!("{line}");
    }

    fn render_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Processing if self.progress => eprint!("{}", notice.message()),
            Notice::Processing => {}
            _ => {
                self.set_idle();
                println!("{}", notice.message());
            }
        }
    }
}

fn paint(unit: &DisplayUnit) -> String {
    let Some(rgb) = unit.background().and_then(parse_css_color) else {
        return unit.text.clone();
    };
    let text = rgb.contrasting_text();
    unit.text
        .as_str()
        .with(Color::Rgb {
            r: text.r,
            g: text.g,
            b: text.b,
        })
        .on(Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        })
        .to_string()
}

fn print_outcome_table(state: &UiState) {
    let units = match state {
        UiState::Displaying(units) => units,
        UiState::Empty => {
            println!("{}", Notice::NothingToAnalyze.message());
            return;
        }
        _ => {
            println!("{}", Notice::AnalysisFailed.message());
            return;
        }
    };
    let rows: Vec<_> = units.iter().filter_map(|unit| {
        unit.highlight
            .as_ref()
            .map(|highlight| (unit.text.as_str(), highlight.frequency, highlight.rarity.as_str()))
    })
    .collect();
    if rows.is_empty() {
        println!("No words were scored.");
        return;
    }
    let mut table = String::from("|WORD|FREQUENCY (PER MILLION)|RARITY|\n|:-|-:|:-|\n");
    for (word, frequency, rarity) in &rows {
        table.push_str(&format!(
            "|{}|{:.2}|{}|\n",
            escape_table_cell(word),
            frequency,
            rarity
        ));
    }
    render_markdown_block(&table);
}

fn escape_table_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, body, Some(markdown_width()));
        println!("{formatted}");
    } else {
        print!("{body}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordheat_rs::{Token, render_tokens};

    #[test]
    fn cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "wordheat-rs",
            "--base-url",
            "http://localhost:8080",
            "analyze",
            "--format",
            "json",
            "hello world",
        ])
        .unwrap();
        let config = heatmap_config(&cli).unwrap();
        assert_eq!(config.endpoint.as_str(), "http://localhost:8080/analyze");
        match cli.command {
            Command::Analyze { text, format, .. } => {
                assert_eq!(text.as_deref(), Some("hello world"));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explicit_endpoint_wins_over_base_url() {
        let cli = Cli::try_parse_from([
            "wordheat-rs",
            "--endpoint",
            "http://10.1.1.1:5000/analyze",
            "--base-url",
            "http://localhost:8080",
            "classify",
            "1",
        ])
        .unwrap();
        let config = heatmap_config(&cli).unwrap();
        assert_eq!(config.endpoint.as_str(), "http://10.1.1.1:5000/analyze");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cli =
            Cli::try_parse_from(["wordheat-rs", "--timeout-secs", "0", "classify", "1"]).unwrap();
        assert!(heatmap_config(&cli).is_err());
    }

    #[test]
    fn classify_accepts_negative_numbers() {
        let cli = Cli::try_parse_from(["wordheat-rs", "classify", "-1", "0.5", "250"]).unwrap();
        match cli.command {
            Command::Classify { frequencies } => assert_eq!(frequencies, [-1.0, 0.5, 250.0]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn paint_colors_words_only() {
        let units = render_tokens(&[
            Token::word("rare", 0, 0.01, "hsl(0.0, 100%, 50%)"),
            Token::plain(" ", 4),
            Token::word("odd", 5, 3.0, "var(--unknown)"),
        ]);
        assert!(paint(&units[0]).contains("\x1b["));
        assert!(paint(&units[0]).contains("rare"));
        assert_eq!(paint(&units[1]), " ");
        assert_eq!(paint(&units[2]), "odd");
    }

    #[test]
    fn table_cells_escape_pipes() {
        assert_eq!(escape_table_cell("a|b"), "a\\|b");
    }
}
