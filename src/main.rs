//! dynopts CLI
//!
//! Entry point for the `dynopts` command-line tool.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dynopts::{ExplainReport, LayeredLookup, Lookup, Options, OptionsContract, Output};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dynopts")]
#[command(about = "Resolve grammar output options from config layers", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every option with its value and where it came from
    Explain {
        #[command(flatten)]
        layers: LayerArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check that every option resolves
    Verify {
        #[command(flatten)]
        layers: LayerArgs,
    },
}

#[derive(Args)]
struct LayerArgs {
    /// Config file (TOML); repeat to layer, later files win
    #[arg(long, short = 'c')]
    config: Vec<PathBuf>,

    /// Set an option (KEY=VALUE); wins over config files
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Read options from this table of the config
    #[arg(long)]
    section: Option<String>,
}

impl LayerArgs {
    fn load(&self) -> anyhow::Result<(Arc<LayeredLookup>, Options<Output>)> {
        let mut lookup =
            LayeredLookup::build(&self.config, &self.set).context("failed to load config")?;
        if let Some(section) = &self.section {
            lookup = lookup.with_section(section.clone());
        }
        let lookup = Arc::new(lookup);
        let shared: Arc<dyn Lookup> = lookup.clone();
        let options = Options::build_with_shared_lookup(Output::shared(), shared, [])
            .context("invalid options")?;
        Ok((lookup, options))
    }
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Explain {
            layers,
            json,
            output,
        } => run_explain(&layers, json, output),
        Commands::Verify { layers } => run_verify(&layers),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run_explain(layers: &LayerArgs, json: bool, output: Option<PathBuf>) -> anyhow::Result<bool> {
    let (lookup, options) = layers.load()?;
    let report = ExplainReport::build(&options, Some(lookup.as_ref()));

    if let Some(path) = output {
        report
            .write_to_file(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_human());
    }

    Ok(report.is_complete())
}

fn run_verify(layers: &LayerArgs) -> anyhow::Result<bool> {
    let (lookup, options) = layers.load()?;
    let report = ExplainReport::build(&options, Some(lookup.as_ref()));

    let mut failures = 0;
    for option in report.failures() {
        failures += 1;
        eprintln!(
            "  {}: {}",
            option.name,
            option.error.as_deref().unwrap_or("unresolved")
        );
    }

    if failures == 0 {
        println!("OK: all {} options resolve", report.options.len());
        Ok(true)
    } else {
        eprintln!("FAILED: {} of {} options did not resolve", failures, report.options.len());
        Ok(false)
    }
}
