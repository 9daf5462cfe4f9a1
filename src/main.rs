// Command-line front end: summary and sentiment for text, files or whole directories.
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::info;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use sentisum::config::Config;
use sentisum::input::{is_supported, read_file_content, read_stdin};
use sentisum::nlp::{Label, LexRankSummarizer, Sentiment, Summarizer};
use sentisum::{normalize, Analysis, Analyzer, ArtifactLoader};

#[derive(Parser)]
#[command(name = "sentisum", about = "Extractive summaries and CNN sentiment scores for free text")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Classifier artifact, overrides the configuration
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    /// Tokenizer artifact, overrides the configuration
    #[arg(long, global = true)]
    tokenizer: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Text to analyze. Without --text or --file, stdin is read.
    #[arg(short, long, conflicts_with = "file")]
    text: Option<String>,
    /// File to analyze (txt, md, csv, json, html, pdf)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary and sentiment
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        /// Number of summary sentences
        #[arg(short = 'n', long)]
        sentences: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Summary only; does not load the model
    Summarize {
        #[command(flatten)]
        input: InputArgs,
        #[arg(short = 'n', long)]
        sentences: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Sentiment only
    Sentiment {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long)]
        json: bool,
    },
    /// Print the text exactly as the classifier sees it
    Normalize {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Analyze every supported file under a directory
    Batch {
        #[arg(short, long)]
        dir: PathBuf,
        /// Report file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(short = 'n', long)]
        sentences: Option<usize>,
    },
    /// Read paragraphs from stdin; a blank line submits one
    Interactive {
        #[arg(short = 'n', long)]
        sentences: Option<usize>,
    },
}

#[derive(Serialize, Deserialize, Debug)]
struct BatchRecord {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.artifacts.model_path = model.clone();
    }
    if let Some(tokenizer) = &cli.tokenizer {
        config.artifacts.tokenizer_path = tokenizer.clone();
    }
    Ok(config)
}

fn read_input(input: &InputArgs) -> Result<String> {
    if let Some(text) = &input.text {
        return Ok(text.clone());
    }
    if let Some(path) = &input.file {
        return read_file_content(path).with_context(|| format!("reading {}", path.display()));
    }
    read_stdin().context("reading stdin")
}

fn load_analyzer(loader: &ArtifactLoader, config: &Config) -> Result<Analyzer> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    pb.set_message("loading sentiment model");
    pb.enable_steady_tick(Duration::from_millis(100));
    let analyzer = Analyzer::from_loader(loader, config);
    pb.finish_and_clear();
    analyzer.context("cannot load model artifacts")
}

fn label_color(label: Label) -> Color {
    match label {
        Label::Positive => Color::Green,
        Label::Negative => Color::Red,
    }
}

fn render_sentiment(out: &mut dyn WriteColor, sentiment: &Sentiment) -> io::Result<()> {
    write!(out, "Sentiment: ")?;
    out.set_color(ColorSpec::new().set_fg(Some(label_color(sentiment.label))).set_bold(true))?;
    write!(out, "{}", sentiment.label)?;
    out.reset()?;
    writeln!(out, " ({:.2})", sentiment.confidence)?;
    if sentiment.token_count == 0 {
        writeln!(out, "  (no known words; score is for empty input)")?;
    }
    Ok(())
}

fn render_summary(out: &mut dyn WriteColor, summary: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "Summary")?;
    out.reset()?;
    if summary.is_empty() {
        writeln!(out, "(nothing to summarize)")
    } else {
        writeln!(out, "{}", summary)
    }
}

fn render_analysis(out: &mut dyn WriteColor, analysis: &Analysis) -> io::Result<()> {
    render_summary(out, &analysis.summary)?;
    writeln!(out)?;
    render_sentiment(out, &analysis.sentiment)
}

fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();
    files
}

fn analyze_paths(analyzer: &Analyzer, files: &[PathBuf], sentences: usize, pb: &ProgressBar) -> Vec<BatchRecord> {
    files
        .par_iter()
        .map(|p| {
            let outcome = read_file_content(p).and_then(|text| analyzer.analyze(&text, sentences));
            pb.inc(1);
            let path = p.to_string_lossy().to_string();
            match outcome {
                Ok(analysis) => BatchRecord {
                    path,
                    summary: Some(analysis.summary),
                    sentiment: Some(analysis.sentiment),
                    error: None,
                },
                Err(e) => BatchRecord {
                    path,
                    summary: None,
                    sentiment: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}

fn run_batch(analyzer: &Analyzer, dir: &Path, out: Option<&Path>, sentences: usize) -> Result<()> {
    if !dir.is_dir() {
        return Err(anyhow!("{} is not a directory", dir.display()));
    }
    let files = collect_files(dir);
    info!(count = files.len(), dir = %dir.display(), "batch analysis");

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    let records = analyze_paths(analyzer, &files, sentences, &pb);
    pb.finish_with_message("analyzed files");

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    match out {
        Some(path) => {
            let f = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            serde_json::to_writer_pretty(f, &records)?;
            println!("Wrote {} results to {}", records.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    if failed > 0 {
        eprintln!("{} of {} files could not be analyzed", failed, records.len());
    }
    Ok(())
}

fn run_interactive<R: BufRead>(
    analyzer: &Analyzer,
    reader: R,
    out: &mut dyn WriteColor,
    sentences: usize,
) -> Result<usize> {
    let mut handled = 0;
    let mut buffer = String::new();
    let mut lines = reader.lines();
    loop {
        let line = lines.next().transpose()?;
        let submit = match &line {
            Some(l) if l.trim().is_empty() => true,
            Some(l) => {
                buffer.push_str(l);
                buffer.push('\n');
                false
            }
            None => true,
        };
        if submit && !buffer.trim().is_empty() {
            let analysis = analyzer.analyze(&buffer, sentences)?;
            render_analysis(out, &analysis)?;
            writeln!(out)?;
            out.flush()?;
            handled += 1;
            buffer.clear();
        }
        if line.is_none() {
            return Ok(handled);
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let loader = ArtifactLoader::new(config.artifacts.clone());
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    match &cli.command {
        Commands::Analyze { input, sentences, json } => {
            let text = read_input(input)?;
            let analyzer = load_analyzer(&loader, &config)?;
            let n = sentences.unwrap_or(analyzer.default_sentences());
            let analysis = analyzer.analyze(&text, n)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                render_analysis(&mut stdout, &analysis)?;
            }
        }
        Commands::Summarize { input, sentences, json } => {
            let text = read_input(input)?;
            let summarizer = LexRankSummarizer::from_config(&config.summary);
            let n = sentences.unwrap_or(config.summary.sentence_count);
            let summary = summarizer.summarize(&text, n);
            if *json {
                println!("{}", serde_json::json!({ "summary": summary }));
            } else {
                render_summary(&mut stdout, &summary)?;
            }
        }
        Commands::Sentiment { input, json } => {
            let text = read_input(input)?;
            let analyzer = load_analyzer(&loader, &config)?;
            let sentiment = analyzer.scorer().score(&text)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&sentiment)?);
            } else {
                render_sentiment(&mut stdout, &sentiment)?;
            }
        }
        Commands::Normalize { input } => {
            println!("{}", normalize(&read_input(input)?));
        }
        Commands::Batch { dir, out, sentences } => {
            let analyzer = load_analyzer(&loader, &config)?;
            let n = sentences.unwrap_or(analyzer.default_sentences());
            run_batch(&analyzer, dir, out.as_deref(), n)?;
        }
        Commands::Interactive { sentences } => {
            let analyzer = load_analyzer(&loader, &config)?;
            let n = sentences.unwrap_or(analyzer.default_sentences());
            eprintln!("Enter text, then a blank line to analyze it. Ctrl-D quits.");
            let stdin = io::stdin();
            run_interactive(&analyzer, stdin.lock(), &mut stdout, n)?;
        }
    }
    Ok(())
}
