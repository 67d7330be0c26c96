use anyhow::Context;
use clap::Parser;
use img_fit::batch::{optimize_folder, CancelFlag};
use img_fit::cli::Args;
use img_fit::constants::CANCELLED_EXIT_CODE;
use img_fit::logger;
use img_fit::processing::OptimizeOptions;
use img_fit::report::ConsoleReporter;
use img_fit::{error, info, warn};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    logger::set_quiet_mode(args.quiet);
    logger::init_tracing(args.verbose);

    let cancel = CancelFlag::new();
    install_ctrl_c_handler(cancel.clone());

    match run(&args, &cancel) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, cancel: &CancelFlag) -> anyhow::Result<ExitCode> {
    let options = OptimizeOptions::new(Some(args.width), Some(args.size), args.threads)
        .context("Invalid options")?;

    info!("🚀 Starting image optimization...");
    info!("📁 Input: {}", args.input.display());
    info!("📁 Output: {}", args.output.display());
    info!(
        "🎯 Limits: width <= {} px, size <= {} KB",
        options.limits.max_width, args.size
    );

    let reporter = ConsoleReporter::new();
    let report = optimize_folder(&args.input, &args.output, &options, &reporter, cancel)
        .with_context(|| format!("Cannot optimize {}", args.input.display()))?;
    reporter.finish(&report);

    if report.cancelled {
        return Ok(ExitCode::from(CANCELLED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

/// First Ctrl-C lets in-flight files finish and skips the rest; a second one
/// exits immediately.
fn install_ctrl_c_handler(cancel: CancelFlag) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };

            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("Interrupted, finishing files in progress (Ctrl-C again to abort)");
                cancel.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(i32::from(CANCELLED_EXIT_CODE));
                }
            });
        });

    if let Err(e) = spawned {
        tracing::warn!("Ctrl-C handling unavailable: {}", e);
    }
}
