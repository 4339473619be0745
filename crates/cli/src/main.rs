// ABOUTME: CLI for optimizing CMS HTML fragments with the leanpost engine.
// ABOUTME: Reads a fragment from a file or stdin and prints the cleaned HTML or a JSON envelope.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use leanpost_engine::{
    CleaningOptions, GeminiClient, GeminiConfig, OptimizeResult, Optimizer, OptionKey,
    Recommendation,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Optimize an HTML fragment for page speed.
#[derive(Parser, Debug)]
#[command(name = "leanpost")]
#[command(about = "Optimize CMS-generated HTML fragments for page speed", long_about = None)]
struct Args {
    /// HTML file to optimize. Use "-" or omit to read from stdin.
    input: Option<PathBuf>,

    /// Switch an option on (repeatable), e.g. --enable convertToAvif.
    #[arg(long = "enable", value_name = "KEY")]
    enable: Vec<OptionKey>,

    /// Switch an option off (repeatable), e.g. --disable lazy-load-embeds.
    #[arg(long = "disable", value_name = "KEY")]
    disable: Vec<OptionKey>,

    /// JSON file with CleaningOptions; missing keys take their defaults.
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// JSON file with an array of AI recommendations to auto-apply.
    #[arg(long, value_name = "FILE")]
    recommendations: Option<PathBuf>,

    /// PageSpeed Insights JSON report; an optimization plan is requested from Gemini.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Number of leading images kept eagerly loaded.
    #[arg(long, value_name = "N")]
    eager_images: Option<usize>,

    /// Print the full JSON envelope instead of the cleaned HTML.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Output compact JSON instead of pretty (with --json).
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Write output to a file instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Gemini API key for the semantic rewrite and optimization plans.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_key: Option<String>,

    /// List the option keys with their default values and exit.
    #[arg(long, default_value_t = false)]
    list_options: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args).await {
        Ok(Some(result)) if result.is_fallback() => {
            if let Some(entry) = result.summary.action_log.first() {
                eprintln!("leanpost: {}", entry);
            }
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("leanpost: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<Option<OptimizeResult>> {
    if args.list_options {
        print_option_list(&args)?;
        return Ok(None);
    }

    let html = read_input(args.input.as_deref())?;
    let options = resolve_options(&args)?;
    let gemini = build_gemini(&args)?;

    let mut recommendations = match &args.recommendations {
        Some(path) => read_json::<Vec<Recommendation>>(path)?,
        None => Vec::new(),
    };
    if let Some(path) = &args.report {
        let report = read_json::<serde_json::Value>(path)?;
        match gemini.optimization_plan(&report).await {
            Ok(plan) => recommendations.extend(plan),
            Err(err) => tracing::warn!(error = %err, "optimization plan unavailable"),
        }
    }
    let recommendations = (!recommendations.is_empty()).then_some(recommendations);

    let mut builder = Optimizer::builder();
    if let Some(n) = args.eager_images {
        builder = builder.eager_images(n);
    }
    let optimizer = builder.build();

    let result = if options.semantic_rewrite && gemini.has_api_key() {
        optimizer
            .run_with_rewriter(&html, &options, recommendations.as_deref(), &gemini)
            .await
    } else {
        optimizer.run(&html, &options, recommendations.as_deref())
    };

    let rendered = if args.json {
        if args.compact {
            serde_json::to_string(&result)?
        } else {
            result.to_json()?
        }
    } else {
        result.cleaned_html.clone()
    };
    write_output(args.output.as_deref(), &rendered)?;

    if !args.json && !result.is_fallback() {
        let summary = &result.summary;
        eprintln!(
            "{} -> {} bytes, saved {} ({})",
            summary.original_bytes,
            summary.cleaned_bytes,
            summary.bytes_saved,
            summary.estimated_speed_gain
        );
        for entry in &summary.action_log {
            eprintln!("  - {}", entry);
        }
    }

    Ok(Some(result))
}

fn resolve_options(args: &Args) -> Result<CleaningOptions> {
    let mut options = match &args.options {
        Some(path) => read_json::<CleaningOptions>(path)?,
        None => CleaningOptions::default(),
    };
    for key in &args.enable {
        options.set(*key, true);
    }
    for key in &args.disable {
        options.set(*key, false);
    }
    Ok(options)
}

fn build_gemini(args: &Args) -> Result<GeminiClient> {
    let config = GeminiConfig {
        api_key: args.gemini_key.clone().filter(|key| !key.trim().is_empty()),
        ..GeminiConfig::default()
    };
    GeminiClient::new(config).map_err(anyhow::Error::new)
}

fn print_option_list(args: &Args) -> Result<()> {
    let defaults = CleaningOptions::default();
    let mut out = String::new();
    for key in OptionKey::ALL {
        out.push_str(&format!(
            "{}\t{}\n",
            key,
            if defaults.get(key) { "on" } else { "off" }
        ));
    }
    write_output(args.output.as_deref(), out.trim_end())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        None => read_stdin(),
        Some(p) if p.as_os_str() == "-" => read_stdin(),
        Some(p) => {
            if !p.exists() {
                return Err(anyhow!("file not found: {}", p.display()));
            }
            fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
        }
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(p) => fs::write(p, content).with_context(|| format!("writing {}", p.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", content)?;
            Ok(())
        }
    }
}
