mod sources;
mod verify;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use solmove_core::OptimizationLevel;
use solmove_emit::{render_summary, EmitterConfig, OutputFormat};
use solmove_transform::{
    ErrorStyle, GuardStyle, StringRepr, TranspileConfig, TranspileResult, Transpiler, ViewStyle,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use verify::{Verification, Verifier};

#[derive(Parser)]
#[command(name = "solmove")]
#[command(about = "solmove - Solidity to Aptos Move transpiler")]
#[command(version = "0.1.0")]
#[command(author = "Gianluca Brigandi <gbrigand@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate Solidity files (or a serialized source unit) into Move modules.
    Transpile {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Files or directories that only supply libraries, bases and constants.
        #[arg(long)]
        context: Vec<PathBuf>,

        /// Directory receiving one `<module>.move` file per contract.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ConfigArgs,

        /// Print a structural summary of each module.
        #[arg(long, value_enum)]
        summary: Option<SummaryFormat>,

        /// Print the whole result as JSON instead of Move source.
        #[arg(long, conflicts_with = "summary")]
        json: bool,

        /// Compile the generated modules with `aptos move compile`.
        #[arg(long)]
        verify: bool,

        #[arg(long, default_value = "aptos", requires = "verify")]
        aptos_bin: String,

        /// Seconds before the external compiler is abandoned.
        #[arg(long, default_value_t = 120, requires = "verify")]
        verify_timeout: u64,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how each contract's state variables were classified and grouped.
    Inspect {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        context: Vec<PathBuf>,

        #[command(flatten)]
        options: ConfigArgs,
    },
}

#[derive(Args, Default)]
struct ConfigArgs {
    /// JSON file with a transpiler configuration; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum)]
    optimization: Option<Optimization>,

    /// Named address the modules are published under.
    #[arg(long)]
    address: Option<String>,

    #[arg(long, value_enum)]
    guard_style: Option<Guard>,

    #[arg(long, value_enum)]
    string_repr: Option<Strings>,

    #[arg(long, value_enum)]
    view_style: Option<Views>,

    #[arg(long, value_enum)]
    error_style: Option<Errors>,

    #[arg(long)]
    inline_helpers: bool,

    #[arg(long)]
    source_comments: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Optimization {
    None,
    Basic,
    Full,
}

impl From<Optimization> for OptimizationLevel {
    fn from(level: Optimization) -> Self {
        match level {
            Optimization::None => OptimizationLevel::None,
            Optimization::Basic => OptimizationLevel::Basic,
            Optimization::Full => OptimizationLevel::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Guard {
    Assert,
    IfAbort,
}

impl From<Guard> for GuardStyle {
    fn from(guard: Guard) -> Self {
        match guard {
            Guard::Assert => GuardStyle::Assert,
            Guard::IfAbort => GuardStyle::IfAbort,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strings {
    String,
    Bytes,
}

impl From<Strings> for StringRepr {
    fn from(repr: Strings) -> Self {
        match repr {
            Strings::String => StringRepr::String,
            Strings::Bytes => StringRepr::Bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Views {
    Attribute,
    Comment,
    None,
}

impl From<Views> for ViewStyle {
    fn from(style: Views) -> Self {
        match style {
            Views::Attribute => ViewStyle::Attribute,
            Views::Comment => ViewStyle::Comment,
            Views::None => ViewStyle::None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Errors {
    Code,
    Descriptive,
}

impl From<Errors> for ErrorStyle {
    fn from(style: Errors) -> Self {
        match style {
            Errors::Code => ErrorStyle::Code,
            Errors::Descriptive => ErrorStyle::Descriptive,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
    Markdown,
}

impl From<SummaryFormat> for OutputFormat {
    fn from(format: SummaryFormat) -> Self {
        match format {
            SummaryFormat::Text => OutputFormat::Text,
            SummaryFormat::Json => OutputFormat::Json,
            SummaryFormat::Markdown => OutputFormat::Markdown,
        }
    }
}

impl ConfigArgs {
    fn resolve(&self) -> Result<TranspileConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing configuration {}", path.display()))?
            }
            None => TranspileConfig::default(),
        };
        if self.strict {
            config.strict = true;
        }
        if let Some(level) = self.optimization {
            config.optimization = level.into();
        }
        if let Some(address) = &self.address {
            config.module_address = address.clone();
        }
        if let Some(style) = self.guard_style {
            config.guard_style = style.into();
        }
        if let Some(repr) = self.string_repr {
            config.string_repr = repr.into();
        }
        if let Some(style) = self.view_style {
            config.view_style = style.into();
        }
        if let Some(style) = self.error_style {
            config.error_style = style.into();
        }
        if self.inline_helpers {
            config.inline_helpers = true;
        }
        if self.source_comments {
            config.source_comments = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transpile {
            inputs,
            context,
            output,
            options,
            summary,
            json,
            verify,
            aptos_bin,
            verify_timeout,
            verbose,
        } => {
            let config = options.resolve()?;
            let verifier = verify.then(|| {
                Verifier::new(
                    aptos_bin,
                    config.module_address.clone(),
                    Duration::from_secs(verify_timeout),
                )
            });
            cmd_transpile(
                &inputs,
                &context,
                output.as_deref(),
                config,
                summary,
                json,
                verifier,
                verbose,
            )
        }
        Commands::Inspect {
            inputs,
            context,
            options,
        } => cmd_inspect(&inputs, &context, options.resolve()?),
    }
}

fn run(
    inputs: &[PathBuf],
    context: &[PathBuf],
    config: TranspileConfig,
) -> Result<TranspileResult> {
    let transpiler = Transpiler::new(config);
    if let [single] = inputs {
        if single.extension().and_then(|e| e.to_str()) == Some("json") {
            let json = fs::read_to_string(single)
                .with_context(|| format!("reading {}", single.display()))?;
            return Ok(transpiler.transpile_json(&json));
        }
    }
    let files = sources::collect(inputs)?;
    if files.is_empty() {
        bail!("no Solidity files found");
    }
    let context = sources::collect(context)?;
    Ok(transpiler.transpile_files(&files, &context))
}

#[allow(clippy::too_many_arguments)]
fn cmd_transpile(
    inputs: &[PathBuf],
    context: &[PathBuf],
    output: Option<&Path>,
    config: TranspileConfig,
    summary: Option<SummaryFormat>,
    json: bool,
    verifier: Option<Verifier>,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{}", " solmove".bright_blue().bold());
        eprintln!("{}", "=".repeat(50).bright_blue());
        for input in inputs {
            eprintln!(" Input: {}", input.display());
        }
        eprintln!(" Address: {}", config.module_address);
        eprintln!(" Optimization: {:?}", config.optimization);
        if config.strict {
            eprintln!(" Mode: strict");
        }
        eprintln!();
    }

    let start = Instant::now();
    let result = run(inputs, context, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(dir) = output {
        fs::create_dir_all(dir)?;
        for module in &result.modules {
            let path = dir.join(format!("{}.move", module.module_name));
            fs::write(&path, &module.source)?;
            if verbose {
                eprintln!(" Wrote {}", path.display());
            }
        }
    } else {
        for module in &result.modules {
            println!("{}", module.source);
        }
    }

    if let Some(format) = summary {
        let emitter = EmitterConfig {
            use_colors: matches!(format, SummaryFormat::Text),
            ..EmitterConfig::default()
        };
        for module in &result.modules {
            let rendered = render_summary(&module.summary.module, format.into(), &emitter)?;
            println!("{}", rendered);
        }
    }

    report(&result);

    if let Some(verifier) = verifier {
        if !result.modules.is_empty() {
            match verifier.verify(&result.modules)? {
                Verification::Passed => {
                    eprintln!("{} aptos move compile", "VERIFIED:".bright_green().bold())
                }
                Verification::Failed(detail) => {
                    eprintln!("{} aptos move compile", "REJECTED:".bright_red().bold());
                    eprintln!("{}", detail);
                }
                Verification::Unavailable(reason) => {
                    eprintln!("{} {}", "SKIPPED:".yellow().bold(), reason)
                }
            }
        }
    }

    if verbose {
        eprintln!(
            "\n {} module(s) in {:.3}s",
            result.modules.len(),
            start.elapsed().as_secs_f64()
        );
    }

    if !result.success {
        bail!("{} contract(s) failed to translate", result.errors.len());
    }
    Ok(())
}

fn cmd_inspect(inputs: &[PathBuf], context: &[PathBuf], config: TranspileConfig) -> Result<()> {
    let result = run(inputs, context, config)?;

    for module in &result.modules {
        println!(
            "{}",
            format!(" Contract {} -> {}", module.contract, module.module_name)
                .bright_green()
                .bold()
        );
        println!("{}", "-".repeat(60).bright_green());
        for var in &module.summary.variables {
            println!(
                "  {:<24} {:<20} {:<28} {}",
                var.name,
                var.category,
                var.representation,
                var.resource.as_deref().unwrap_or("-")
            );
        }
        println!();
    }

    report(&result);
    if !result.success {
        bail!("{} contract(s) failed to translate", result.errors.len());
    }
    Ok(())
}

fn report(result: &TranspileResult) {
    for warning in &result.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
    for error in &result.errors {
        eprintln!("{} {}", "error:".bright_red().bold(), error);
    }
}
