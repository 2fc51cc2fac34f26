//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module:
//! - parses CLI arguments
//! - loads `.env` and sets up logging for the chosen command
//! - dispatches to the server, dashboard, local prediction or evaluation

use clap::Parser;

use crate::cli::{Command, DashboardArgs, EvaluateArgs, PredictArgs, ServeArgs};
use crate::error::AppError;
use crate::logging::LogTarget;
use crate::model::FareModel;

pub mod pipeline;

/// Entry point for the `taxipred` binary.
pub fn run() -> Result<(), AppError> {
    // `taxipred` and `taxipred --api-url ...` open the dashboard; clap needs a
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // `.env` may set `RUST_LOG`, so it is read before the subscriber exists.
    let env_file = crate::config::load_dotenv();
    crate::logging::init(&log_target(&cli.command))?;
    if let Some(path) = env_file {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Command::Serve(args) => handle_serve(args),
        Command::Dashboard(args) => handle_dashboard(args),
        Command::Predict(args) => handle_predict(args),
        Command::Evaluate(args) => handle_evaluate(args),
    }
}

/// The dashboard owns the terminal, so it logs to a file.
fn log_target(command: &Command) -> LogTarget {
    match command {
        Command::Dashboard(args) => LogTarget::File(args.log_dir.clone()),
        Command::Serve(_) | Command::Predict(_) | Command::Evaluate(_) => LogTarget::Stderr,
    }
}

fn handle_serve(args: ServeArgs) -> Result<(), AppError> {
    let config = crate::config::server_config(args.host, args.port, args.model, args.data)?;
    crate::server::run(&config)
}

fn handle_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let config = crate::config::dashboard_config(args.api_url);
    tracing::info!("Dashboard using API at {}", config.api_url);
    crate::tui::run(&config)
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let trip = args.trip();
    trip.validate().map_err(|errors| {
        let detail: Vec<String> = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        AppError::new(2, format!("Invalid trip: {}", detail.join("; ")))
    })?;

    let model = FareModel::load(&crate::config::model_path(args.model))?;
    let quote = model.quote(&trip)?;
    println!("{:.2} {}", quote.predicted_price, quote.currency);
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let model_path = crate::config::model_path(args.model.clone());
    let data_path = crate::config::data_path(args.data.clone());
    let run = pipeline::run_evaluation(&model_path, &data_path, args.top)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.info, &run.dataset, &run.metrics)
    );
    println!(
        "{}",
        crate::report::format_rankings(&run.rankings, &run.info.currency)
    );

    if args.plot && !args.no_plot {
        let plot = crate::plot::render_ascii_plot(&run.residuals, args.width, args.height, Some(&run.rankings));
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::export::write_residuals_csv(path, &run.residuals)?;
    }

    Ok(())
}

/// Rewrite argv so `taxipred` defaults to `taxipred dashboard`.
///
/// Rules:
/// - `taxipred`                      -> `taxipred dashboard`
/// - `taxipred --api-url URL ...`    -> `taxipred dashboard --api-url URL ...`
/// - `taxipred --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "serve" | "dashboard" | "predict" | "evaluate");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
        return argv;
    }

    argv
}
