use crate::demo::{
    run_compare, run_demo, run_evaluation, run_report, run_reports, run_test_cases, CompareArgs,
    EvaluateArgs, ReportArgs, ReportsArgs, TestCasesArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sales_ai::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Scoring Evaluation Harness",
    about = "Run and inspect evaluation suites against the lead-scoring model from the command line",
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
    /// Run the evaluation suite and archive the report
    Evaluate(EvaluateArgs),
    /// List registered test cases
    TestCases(TestCasesArgs),
    /// List archived evaluation reports
    Reports(ReportsArgs),
    /// Print one archived report
    Report(ReportArgs),
    /// Compare two archived reports
    Compare(CompareArgs),
    /// Run the whole suite against the offline scorer and render the report
    Demo,
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
        Command::Evaluate(args) => run_evaluation(args).await,
        Command::TestCases(args) => run_test_cases(args),
        Command::Reports(args) => run_reports(args),
        Command::Report(args) => run_report(args),
        Command::Compare(args) => run_compare(args),
        Command::Demo => run_demo().await,
    }
}
