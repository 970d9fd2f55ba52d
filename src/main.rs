use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snr_core::config::{self, CoreConfig};
use snr_core::constants::{DEFAULT_BET_THRESHOLD, DEFAULT_WM_THRESHOLD};
use snr_core::{FslToolkit, InputImage, SnrError, SnrPipeline, SnrResult, Stage};

#[derive(Parser, Debug)]
#[command(name = "snr")]
#[command(version)]
#[command(about = "Estimate the signal-to-noise ratio of a 3D brain MRI volume using FSL")]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Input image, e.g. t1.nii.gz
    #[arg(short = 'i', value_name = "file_name")]
    input: PathBuf,
    /// Print the final report as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Entry point for the `snr` command.
///
/// Parses arguments, resolves configuration from the environment (after loading `.env`),
/// runs the pipeline and maps failures onto exit codes.
///
/// # Environment Variables
/// - `SNR_OUTPUT_DIR`: parent directory for `snr_<base>/` workspaces (default: ".")
/// - `FSLDIR`: FSL install root; tools are run from `$FSLDIR/bin` (default: `PATH`)
/// - `SNR_BET_THRESHOLD`: brain extraction fractional intensity threshold (default: 0.3)
/// - `SNR_WM_THRESHOLD`: white matter partial-volume threshold (default: 0.5)
/// - `RUST_LOG`: log filter (default adds `snr=info`)
fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_code(&e) as u8);
        }
    };

    if let Err(e) = init_tracing() {
        eprintln!("error: failed to initialise logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("run failed: {}", e);
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("snr=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

/// Help and version output exit 0; anything else is a usage error.
fn parse_failure_code(e: &clap::Error) -> i32 {
    if e.use_stderr() {
        let reason = e.kind().as_str().unwrap_or("invalid arguments");
        SnrError::Usage(reason.to_string()).exit_code()
    } else {
        0
    }
}

fn check_toolkit(toolkit: &FslToolkit) -> SnrResult<()> {
    toolkit
        .check_available()
        .map_err(|e| SnrError::tool(Stage::ToolkitCheck, e))
}

fn resolve_config() -> SnrResult<CoreConfig> {
    let output_dir = config::output_dir_from_env_value(std::env::var("SNR_OUTPUT_DIR").ok());
    let fsl_dir = config::fsl_dir_from_env_value(std::env::var("FSLDIR").ok());
    let bet_threshold = config::threshold_from_env_value(
        "SNR_BET_THRESHOLD",
        std::env::var("SNR_BET_THRESHOLD").ok(),
        DEFAULT_BET_THRESHOLD,
    )?;
    let wm_threshold = config::threshold_from_env_value(
        "SNR_WM_THRESHOLD",
        std::env::var("SNR_WM_THRESHOLD").ok(),
        DEFAULT_WM_THRESHOLD,
    )?;

    CoreConfig::new(output_dir, fsl_dir, bet_threshold, wm_threshold)
}

fn run(cli: &Cli) -> Result<(), SnrError> {
    let input = InputImage::resolve(&cli.input)?;
    let cfg = resolve_config()?;

    let toolkit = FslToolkit::new(cfg.fsl_dir());
    check_toolkit(&toolkit)?;

    tracing::info!(
        "++ Computing SNR for {} (workspace under {})",
        input.path().display(),
        cfg.output_dir().display()
    );

    let pipeline = SnrPipeline::new(Arc::new(cfg), toolkit);
    let report = pipeline.run(&input)?;

    if cli.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        println!("mean_wm: {:.6}", report.mean_wm);
        println!("snr_basic: {:.6}", report.basic.snr);
        println!("snr_rician: {:.6}", report.rician.snr);
        println!("log: {}", report.log_file.display());
    }

    Ok(())
}
