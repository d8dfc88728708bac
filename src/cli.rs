//! CLI parsing and orchestration. Parses args, harvests the chapter chain, writes the document,
//! then optionally converts and delivers it. Maps errors to exit codes.

use crate::config::{self, Config, Template};
use crate::convert::{
    ConvertError, ConverterKind, EbookConverter, EpubConverter, ExternalConverter,
    DEFAULT_CONVERT_PROGRAM,
};
use crate::deliver::{CommandSink, DeliveryError, DeliverySink};
use crate::document::HtmlAttributeOverride;
use crate::formats::{write_html, write_json, write_markdown, FormatError, OutputFormat};
use crate::harvest::{
    harvest, CancelToken, HarvestConfig, HarvestError, HarvestOptions, HarvestReport,
    HarvestState, PageFetcher, StopReason, DEFAULT_CONTENT_SELECTOR, DEFAULT_NEXT_SELECTOR,
    DEFAULT_TITLE,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Harvest(#[from] HarvestError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Convert(#[from] ConvertError),

    #[error("{0}")]
    Deliver(#[from] DeliveryError),

    #[error("Interrupted; partial output written to {}", .0.display())]
    Interrupted(PathBuf),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Harvest(e) if e.is_config() => 1,
            CliRunError::Harvest(_) => 2,
            CliRunError::Format(_) | CliRunError::Convert(_) | CliRunError::Deliver(_) => 3,
            CliRunError::Interrupted(_) => 130,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "storyscrape")]
#[command(about = "Follow a web serial's next-chapter links and collect every chapter into one document")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, timeout_secs, retry_count, retry_backoff_secs, converter, convert_program, deliver_command, credentials_file, [templates.<name>]) are read from ./storyscrape.toml or the user config directory. CLI flags override the template, which overrides built-in defaults."
)]
pub struct Args {
    /// URL of the first chapter to harvest.
    pub url: String,

    /// Output path. Default: {output_dir}/{sanitized-title}.{ext} where ext depends on --format.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: html, json, or markdown.
    #[arg(long, default_value = "html", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Named template from the config file supplying selectors, styles and overrides.
    #[arg(short, long)]
    pub template: Option<String>,

    /// Document title (default "ebook").
    #[arg(long)]
    pub title: Option<String>,

    /// CSS selector for the chapter content (default div.chapter-content).
    #[arg(long)]
    pub container: Option<String>,

    /// CSS selector for the next-chapter link (default a#next_chap).
    #[arg(long)]
    pub next: Option<String>,

    /// CSS selector for the chapter title. Without it chapters are numbered sequentially.
    #[arg(long)]
    pub title_selector: Option<String>,

    /// Stop after visiting this many chapter pages.
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub chapters: Option<u32>,

    /// Stylesheet to link from the document head. Repeatable.
    #[arg(long = "style")]
    pub styles: Vec<String>,

    /// Script to load at the end of the document body. Repeatable.
    #[arg(long = "script")]
    pub scripts: Vec<String>,

    /// Attribute override as element:attribute=value (element: html, head, body, chapter, heading). Repeatable.
    #[arg(long = "set-attr")]
    pub overrides: Vec<HtmlAttributeOverride>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries for transient network failures (overrides config; default 3).
    #[arg(long)]
    pub retries: Option<u32>,

    /// Convert the document after harvesting: ebook-convert or epub.
    #[arg(long)]
    pub convert: Option<ConverterKind>,

    /// Command that receives the converted ebook as `<title> <file> [credentials]`.
    #[arg(long)]
    pub deliver: Option<String>,

    /// Credentials file passed to the delivery command.
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). Also prints the error cause chain.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Errors only; no progress spinner.
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "html" | "htm" => Ok(OutputFormat::Html),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use html, json, or markdown.",
            s
        )),
    }
}

/// Sanitize a title to a safe filename: lowercase, replace spaces/special with `-`.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = DEFAULT_TITLE.to_string();
    }
    s
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn selected_template<'c>(
    args: &Args,
    config: Option<&'c Config>,
) -> Result<Option<&'c Template>, CliRunError> {
    let Some(name) = args.template.as_deref() else {
        return Ok(None);
    };
    let config = config.ok_or_else(|| {
        CliRunError::InvalidInput(format!(
            "Template '{}' requested but no config file was found (./storyscrape.toml).",
            name
        ))
    })?;
    config
        .template(name)
        .map(Some)
        .map_err(CliRunError::InvalidInput)
}

/// Stylesheet or script reference as written into the document. Local paths become absolute so
/// the document and the converter resolve them wherever the output lands; URLs pass through.
fn asset_ref(reference: &str) -> Result<String, CliRunError> {
    let reference = reference.trim();
    if reference.contains("://") || reference.starts_with("//") || reference.starts_with("data:") {
        return Ok(reference.to_string());
    }
    std::path::absolute(reference)
        .map(|p| p.to_string_lossy().into_owned())
        .map_err(|e| CliRunError::InvalidInput(format!("Invalid asset path '{}': {}", reference, e)))
}

/// Merge flags over the template over built-in defaults.
fn harvest_config(args: &Args, template: Option<&Template>) -> Result<HarvestConfig, CliRunError> {
    let pick = |flag: &Option<String>, from_template: fn(&Template) -> &Option<String>| {
        flag.clone()
            .or_else(|| template.and_then(|t| from_template(t).clone()))
    };

    let mut builder = HarvestConfig::builder(args.url.trim())
        .content_selector(
            pick(&args.container, |t| &t.container)
                .unwrap_or_else(|| DEFAULT_CONTENT_SELECTOR.to_string()),
        )
        .next_selector(
            pick(&args.next, |t| &t.next).unwrap_or_else(|| DEFAULT_NEXT_SELECTOR.to_string()),
        )
        .title_selector(pick(&args.title_selector, |t| &t.title_selector))
        .title(pick(&args.title, |t| &t.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()))
        .chapter_limit(args.chapters.or_else(|| template.and_then(|t| t.chapters)));

    if let Some(t) = template {
        for s in &t.styles {
            builder = builder.style(asset_ref(s)?);
        }
        for s in &t.scripts {
            builder = builder.script(asset_ref(s)?);
        }
        for o in &t.overrides {
            builder = builder.attribute_override(o.clone());
        }
    }
    for s in &args.styles {
        builder = builder.style(asset_ref(s)?);
    }
    for s in &args.scripts {
        builder = builder.script(asset_ref(s)?);
    }
    for o in &args.overrides {
        builder = builder.attribute_override(o.clone());
    }
    Ok(builder.build()?)
}

fn build_fetcher(args: &Args, config: Option<&Config>) -> Result<PageFetcher, CliRunError> {
    let mut builder = PageFetcher::builder();
    if let Some(secs) = args.timeout.or_else(|| config.and_then(|c| c.timeout_secs)) {
        builder = builder.timeout_secs(secs);
    }
    if let Some(n) = args.retries.or_else(|| config.and_then(|c| c.retry_count)) {
        builder = builder.retry_count(n);
    }
    if let Some(b) = config.and_then(|c| c.retry_backoff_secs.clone()) {
        builder = builder.retry_backoff_secs(b);
    }
    if let Some(ua) = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()))
    {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| CliRunError::Harvest(HarvestError::Client { source: e }))
}

fn output_path(args: &Args, config: Option<&Config>, title: &str) -> PathBuf {
    match &args.output {
        Some(p) => p.clone(),
        None => {
            let dir = config
                .and_then(|c| c.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            dir.join(format!("{}.{}", sanitize_title(title), args.format.extension()))
        }
    }
}

fn build_converter(
    args: &Args,
    config: Option<&Config>,
    identifier: &str,
) -> Result<Option<Box<dyn EbookConverter>>, CliRunError> {
    let kind = match args.convert {
        Some(k) => Some(k),
        None => config
            .and_then(|c| c.converter.as_deref())
            .map(|s| s.parse::<ConverterKind>())
            .transpose()
            .map_err(CliRunError::InvalidInput)?,
    };
    Ok(kind.map(|k| -> Box<dyn EbookConverter> {
        match k {
            ConverterKind::EbookConvert => Box::new(ExternalConverter::new(
                config
                    .and_then(|c| c.convert_program.clone())
                    .unwrap_or_else(|| DEFAULT_CONVERT_PROGRAM.to_string()),
            )),
            ConverterKind::Epub => Box::new(EpubConverter::new().with_identifier(identifier)),
        }
    }))
}

fn build_sink(args: &Args, config: Option<&Config>) -> Result<Option<CommandSink>, CliRunError> {
    match args
        .deliver
        .as_deref()
        .or_else(|| config.and_then(|c| c.deliver_command.as_deref()))
    {
        Some(cmd) => Ok(Some(CommandSink::from_command_line(cmd)?)),
        None => Ok(None),
    }
}

fn spinner() -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner()
        .template("{spinner} {msg} ({elapsed})")
        .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "))
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Cancel `token` on the first Ctrl-C; exit immediately on the second.
pub fn install_interrupt_handler(token: CancelToken) -> std::io::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            rt.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("interrupt received; stopping after the current chapter (Ctrl-C again to abort)");
                token.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            })
        })?;
    Ok(())
}

fn write_output(
    format: OutputFormat,
    report: &HarvestReport,
    harvest_config: &HarvestConfig,
    path: &Path,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Html => write_html(&report.document, path),
        OutputFormat::Json => write_json(&report.story(harvest_config), path),
        OutputFormat::Markdown => write_markdown(&report.story(harvest_config), path),
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args, cancel: CancelToken) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    run_with_config(args, config.as_ref(), cancel)
}

/// Run with an already loaded config file (or none). A failed fetch or a cancellation still
/// writes the partial document, then skips conversion and delivery.
pub fn run_with_config(
    args: &Args,
    config: Option<&Config>,
    cancel: CancelToken,
) -> Result<(), CliRunError> {
    let template = selected_template(args, config)?;

    let harvest_config = harvest_config(args, template)?;
    let output = output_path(args, config, harvest_config.title());
    validate_output_path(&output)?;

    let converter = build_converter(args, config, harvest_config.initial_url())?;
    let sink = build_sink(args, config)?;
    if sink.is_some() && converter.is_none() {
        return Err(CliRunError::InvalidInput(
            "Delivery needs a converted ebook: pass --convert or set converter in the config file."
                .to_string(),
        ));
    }
    let mut fetcher = build_fetcher(args, config)?;

    let pb = (!args.quiet).then(spinner);
    let progress_cb = |state: &HarvestState| {
        if let Some(ref pb) = pb {
            pb.set_message(format!(
                "Harvested {} chapter(s), {} page(s) visited",
                state.chapters_appended, state.pages_visited
            ));
        }
    };
    let options = HarvestOptions {
        cancel,
        progress: Some(&progress_cb),
    };
    let report = harvest(&mut fetcher, &harvest_config, &options);
    if let Some(pb) = pb {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    if report.chapters.is_empty() {
        warn!("no chapters were harvested; the document is empty");
    }
    write_output(args.format, &report, &harvest_config, &output)?;
    info!(path = %output.display(), chapters = report.chapters.len(), "wrote document");

    match report.stop {
        StopReason::FetchFailed(e) => return Err(CliRunError::Harvest(e)),
        StopReason::Cancelled => return Err(CliRunError::Interrupted(output)),
        StopReason::EndOfStory(_) | StopReason::ChapterLimit => {}
    }

    let Some(converter) = converter else {
        if !args.quiet {
            eprintln!("Wrote {}", output.display());
        }
        return Ok(());
    };

    let document_path = if args.format == OutputFormat::Html {
        output.clone()
    } else {
        let p = output.with_extension("html");
        write_html(&report.document, &p)?;
        p
    };
    let ebook = output.with_extension(converter.extension());
    converter.convert(&document_path, harvest_config.title(), &ebook)?;
    info!(path = %ebook.display(), "converted");

    if let Some(sink) = sink {
        let credentials = args
            .credentials
            .clone()
            .or_else(|| config.and_then(|c| c.credentials_file.clone()));
        sink.deliver(harvest_config.title(), &ebook, credentials.as_deref())?;
        info!("delivered");
    }

    if !args.quiet {
        eprintln!("Wrote {}", ebook.display());
    }
    Ok(())
}
