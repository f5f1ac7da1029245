//! Run the lesson enhancement pipeline on a Markdown file.
//!
//! Usage:
//!   cargo run --bin enhance -- raw.md --head-question "Was dit terecht?" --period TV6
//!   cat raw.md | cargo run --bin enhance -- --report

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lesson_forge::config::Config;
use lesson_forge::enhance::{Enhancement, EnhancementContext, Enhancer};

#[derive(Parser)]
#[command(name = "enhance")]
#[command(about = "Clean up raw model output into a lesson document", long_about = None)]
struct Cli {
    /// Input file (stdin when omitted or "-")
    input: Option<PathBuf>,

    #[arg(long)]
    head_question: Option<String>,

    /// Period id, e.g. TV6
    #[arg(long)]
    period: Option<String>,

    /// Topic id, e.g. 23
    #[arg(long)]
    topic: Option<String>,

    #[arg(long)]
    theme: Option<String>,

    /// Use the causes list from lesson_forge.toml instead of the built-in one
    #[arg(long)]
    use_config: bool,

    /// Print what the pipeline changed to stderr
    #[arg(long)]
    report: bool,

    /// Emit the full result as JSON instead of bare Markdown
    #[arg(long)]
    json: bool,
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let raw = read_input(cli.input.as_ref())?;

    let enhancer = if cli.use_config {
        Enhancer::new(Config::load()?.causes)
    } else {
        Enhancer::default()
    };

    let ctx = EnhancementContext {
        head_question: cli.head_question,
        period_id: cli.period,
        topic_id: cli.topic,
        theme: cli.theme,
        causes: None,
    };
    let result = enhancer.enhance(&raw, &ctx);

    if cli.report {
        match &result {
            Enhancement::Complete { report, .. } => {
                eprintln!("fences stripped:     {}", report.fences_stripped);
                eprintln!("heading synthesized: {}", report.heading_synthesized);
                eprintln!("heading rewritten:   {}", report.heading_rewritten);
                eprintln!("intro injected:      {}", report.intro_injected);
                eprintln!("causes placement:    {:?}", report.causes);
            }
            Enhancement::Degraded { reason, .. } => {
                eprintln!("degraded: {}", reason);
            }
        }
    }

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &result)?;
    } else {
        stdout.write_all(result.markdown().as_bytes())?;
    }
    writeln!(stdout)?;

    Ok(())
}
