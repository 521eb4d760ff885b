use crate::demo::{run_analyze, run_demo, AnalyzeArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use workforce_insights::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Workforce Insights",
    about = "Serve, analyze and demo workforce KPI outlier detection",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Analyze a CSV metric export and print the report
    Analyze(AnalyzeArgs),
    /// Run the report and recommendations over a synthetic population
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analyze(args) => run_analyze(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use workforce_insights::analytics::DetectionMethod;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_parses_metric_list_and_method() {
        let cli = Cli::try_parse_from([
            "workforce-insights",
            "analyze",
            "--samples",
            "export.csv",
            "--metrics",
            "performance, engagement",
            "--method",
            "iqr",
            "--no-confidence-filter",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Analyze(args)) => {
                assert_eq!(args.metrics.0, vec!["performance", "engagement"]);
                assert_eq!(args.method, DetectionMethod::Iqr);
                assert!(args.no_confidence_filter);
                assert!(args.threshold.is_none());
            }
            other => panic!("expected analyze, got {other:?}"),
        }
    }

    #[test]
    fn unknown_method_is_rejected() {
        let parsed = Cli::try_parse_from([
            "workforce-insights",
            "analyze",
            "--samples",
            "export.csv",
            "--metrics",
            "performance",
            "--method",
            "dbscan",
        ]);
        assert!(parsed.is_err());
    }
}
