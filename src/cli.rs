//! CLI parsing and orchestration. Reads share text, runs the extraction
//! pipeline, optionally materializes images, and renders text or JSON.

use crate::config::{self, Config};
use crate::formats::{render, write_output, FormatError, OutputFormat, Report};
use crate::images::materialize_images;
use crate::model::ExtractionRequest;
use crate::pipeline::{
    extract, BrowserClient, ExtractOptions, FetchError, Stage, DEFAULT_ATTEMPTS,
    DEFAULT_MAX_REDIRECTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_SITE_ROOT, DEFAULT_TIMEOUT_SECS,
};
use clap::Parser;
use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Client(#[from] FetchError),

    #[error("Nothing could be recovered from the link. Paste the title and body manually.")]
    NothingRecovered,

    #[error("{0}")]
    Format(#[from] FormatError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Client(_) => 1,
            CliRunError::NothingRecovered => 2,
            CliRunError::Format(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "notescrape")]
#[command(about = "Recover a Xiaohongshu note's title, body, and images from pasted share text")]
#[command(
    after_help = "Config file keys (user_agents, accept_language, timeout_secs, retry_delay_ms, attempts, max_redirects, site_root, format) are read from ./notescrape.toml or ~/.config/notescrape/config.toml. CLI flags override config."
)]
pub struct Args {
    /// Share text copied from the app. Read from stdin when omitted.
    pub share_text: Option<String>,

    /// Output path. Default: stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: text or json.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Include the extraction log in text output (JSON always includes it).
    #[arg(long)]
    pub log: bool,

    /// Download and decode every image and report its dimensions.
    #[arg(long)]
    pub images: bool,

    /// User-Agent to rotate through (repeatable; replaces the built-in pool).
    #[arg(long = "user-agent")]
    pub user_agents: Vec<String>,

    /// Request timeout in seconds (overrides config; default 15).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause before a retry in milliseconds (overrides config; default 500).
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "text" | "txt" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use text or json.",
            s
        )),
    }
}

fn stage_message(stage: Stage) -> String {
    match stage {
        Stage::PrimaryAttempt(1) => "Fetching note as a mobile browser".to_string(),
        Stage::PrimaryAttempt(n) => format!("Retrying with a new fingerprint (attempt {})", n),
        Stage::SecondaryEndpoint => "Trying the canonical note page".to_string(),
        Stage::Finished => "Done".to_string(),
    }
}

fn read_share_text(args: &Args) -> Result<String, CliRunError> {
    let text = match &args.share_text {
        Some(t) => t.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliRunError::InvalidInput(format!("Cannot read stdin: {}", e)))?;
            buf
        }
    };
    if text.trim().is_empty() {
        return Err(CliRunError::InvalidInput(
            "No share text given. Pass it as an argument or pipe it on stdin.".to_string(),
        ));
    }
    Ok(text)
}

/// Settings after merging CLI flags over config over defaults.
#[derive(Debug, PartialEq, Eq)]
struct Settings {
    format: OutputFormat,
    user_agents: Vec<String>,
    accept_language: Option<String>,
    timeout_secs: u64,
    retry_delay_ms: u64,
    attempts: u32,
    max_redirects: usize,
    site_root: String,
}

fn resolve_settings(args: &Args, config: Option<&Config>) -> Result<Settings, CliRunError> {
    let format = match args.format {
        Some(f) => f,
        None => match config.and_then(|c| c.format.as_deref()) {
            Some(s) => parse_format(s).map_err(CliRunError::InvalidInput)?,
            None => OutputFormat::Text,
        },
    };
    let user_agents = if !args.user_agents.is_empty() {
        args.user_agents.clone()
    } else {
        config
            .and_then(|c| c.user_agents.clone())
            .unwrap_or_default()
    };
    Ok(Settings {
        format,
        user_agents,
        accept_language: config.and_then(|c| c.accept_language.clone()),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        retry_delay_ms: args
            .retry_delay_ms
            .or_else(|| config.and_then(|c| c.retry_delay_ms))
            .unwrap_or(DEFAULT_RETRY_DELAY_MS),
        attempts: config
            .and_then(|c| c.attempts)
            .unwrap_or(DEFAULT_ATTEMPTS)
            .max(1),
        max_redirects: config
            .and_then(|c| c.max_redirects)
            .unwrap_or(DEFAULT_MAX_REDIRECTS),
        site_root: config
            .and_then(|c| c.site_root.clone())
            .unwrap_or_else(|| DEFAULT_SITE_ROOT.to_string()),
    })
}

/// Entry point for the CLI. Returns Ok(()) on complete or partial success.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let share_text = read_share_text(args)?;
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref())?;

    let mut builder = BrowserClient::builder()
        .user_agents(settings.user_agents.clone())
        .timeout_secs(settings.timeout_secs)
        .max_redirects(settings.max_redirects);
    if let Some(lang) = &settings.accept_language {
        builder = builder.accept_language(lang.clone());
    }
    let mut client = builder.build()?;

    let spinner: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |stage: Stage| {
        let mut state = spinner.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::default_spinner()
                .template("{spinner} {msg} ({elapsed})")
            {
                bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_message(stage_message(stage));
    };
    let progress: Option<&dyn Fn(Stage)> = if args.quiet { None } else { Some(&progress_cb) };

    let options = ExtractOptions {
        progress,
        attempts: settings.attempts,
        retry_delay: Duration::from_millis(settings.retry_delay_ms),
        site_root: settings.site_root.clone(),
    };
    let content = extract(&ExtractionRequest::new(share_text), &mut client, &options);

    let images = if args.images && !content.image_urls.is_empty() {
        if let Some(pb) = spinner.borrow().as_ref() {
            pb.set_message(format!("Downloading {} images", content.image_urls.len()));
        }
        Some(materialize_images(
            &content.image_urls,
            &mut client,
            Some(&settings.site_root),
        ))
    } else {
        None
    };

    if let Some(pb) = spinner.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    let report = Report {
        content: &content,
        images: images.as_deref(),
        include_log: args.log || content.is_total_failure(),
    };
    let rendered = render(&report, settings.format)?;
    write_output(&rendered, args.output.as_deref())?;

    if content.is_total_failure() {
        return Err(CliRunError::NothingRecovered);
    }
    if !args.quiet {
        if let Some(path) = &args.output {
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(())
}
