//! Shroud CLI
//!
//! Strip privacy decorators from annotated contracts and generate the orchestration code of
//! classified functions.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use shroud_compiler::orchestration::render_fragments;
use shroud_compiler::{
    strip_file, CompilerError, GenerationStage, JavaScriptTemplates, StripOptions, StrippedFile,
    Synthesizer, TemplateConfig,
};
use shroud_runtime::FunctionContext;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shroud")]
#[command(about = "Strip privacy decorators and generate orchestration code", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip decorators from an annotated contract
    Strip {
        /// Annotated contract source
        input: PathBuf,

        /// Directory receiving the stripped file, the original copy and the records
        #[arg(short, long, default_value = "parse")]
        work_dir: PathBuf,

        /// Skip writing the redecoration records
        #[arg(long)]
        no_records: bool,

        /// Print the redecoration records as JSON
        #[arg(long)]
        print_records: bool,
    },

    /// Generate orchestration code for a classified function
    Orchestrate {
        /// Function context JSON produced by the classification pass
        #[arg(short, long)]
        context: PathBuf,

        /// Render a single generation stage instead of the whole routine
        #[arg(short, long)]
        stage: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preimage database path baked into the generated code
        #[arg(long)]
        db_path: Option<String>,

        /// Key database path baked into the generated code
        #[arg(long)]
        key_db_path: Option<String>,

        /// Directory of the shared runtime helpers
        #[arg(long)]
        common_dir: Option<String>,
    },

    /// List the generation stages in routine order
    Stages,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn template_config(
    db_path: Option<String>,
    key_db_path: Option<String>,
    common_dir: Option<String>,
) -> TemplateConfig {
    let defaults = TemplateConfig::default();
    TemplateConfig {
        db_path: db_path.unwrap_or(defaults.db_path),
        key_db_path: key_db_path.unwrap_or(defaults.key_db_path),
        common_dir: common_dir.unwrap_or(defaults.common_dir),
    }
}

fn load_context(path: &Path) -> Result<FunctionContext> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read context file: {:?}", path))?;

    FunctionContext::from_json(&content).context("Failed to parse function context JSON")
}

fn run_strip(input: &Path, options: &StripOptions) -> Result<StrippedFile> {
    match strip_file(input, options) {
        Ok(stripped) => Ok(stripped),
        Err(CompilerError::ReservedKeyword { text, offset }) => {
            error!(%text, offset, "Decorator used as a name");
            eprintln!("❌ '{}' at index {} reuses a decorator as a name", text, offset);
            anyhow::bail!(CompilerError::ReservedKeyword { text, offset })
        }
        Err(e) => Err(e).context(format!("Failed to strip decorators from {:?}", input)),
    }
}

fn run_orchestrate(
    context: &FunctionContext,
    stage: Option<&str>,
    config: TemplateConfig,
) -> Result<String> {
    let synthesizer = Synthesizer::new(context)?;
    let templates = JavaScriptTemplates::new(config);

    let code = match stage {
        Some(name) => {
            let stage: GenerationStage = name.parse()?;
            info!(function = %context.name, %stage, "Rendering single stage");
            render_fragments(&templates, &synthesizer.stage(stage))
        }
        None => synthesizer.render(&templates),
    };

    Ok(code)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Strip { input, work_dir, no_records, print_records } => {
            println!("🔧 Stripping decorators");
            println!("   Input: {:?}", input);
            println!();

            let options = StripOptions { work_dir, write_records: !no_records };
            let stripped = run_strip(&input, &options)?;

            println!("✅ Stripped {} decorator(s)", stripped.source.redecorations.len());
            println!("   Output: {:?}", stripped.stripped_path);
            println!("   Original: {:?}", stripped.original_copy_path);
            if let Some(records) = &stripped.records_path {
                println!("   Records: {:?}", records);
            }
            if print_records {
                println!("{}", serde_json::to_string_pretty(&stripped.source.redecorations)?);
            }
        }
        Commands::Orchestrate { context, stage, output, db_path, key_db_path, common_dir } => {
            let function = load_context(&context)?;
            let config = template_config(db_path, key_db_path, common_dir);
            let code = run_orchestrate(&function, stage.as_deref(), config)?;

            match output {
                Some(path) => {
                    println!("🚀 Orchestration for {}::{}", function.contract_name, function.name);
                    println!("   States: {}", function.states.len());
                    println!();

                    fs::write(&path, &code).context(format!("Failed to write code to {:?}", path))?;

                    println!("✅ Orchestration code generated!");
                    println!("   Output: {:?}", path);
                }
                None => println!("{}", code),
            }
        }
        Commands::Stages => {
            println!("📋 Generation stages:");
            for (index, stage) in GenerationStage::ALL.iter().enumerate() {
                println!("   {:>2}. {}", index + 1, stage);
            }
        }
    }

    Ok(())
}
