use authsweep::cli::{Cli, Command};
use authsweep::{logging, plan, run_until_interrupted};
use authsweep_core::CATALOG;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Run(args) => {
            let config = args.to_config()?;
            let report = run_until_interrupted(&config, args.phase).await?;
            info!(
                subsets = report.subsets_checked,
                precedence_cases = report.precedence_cases_checked,
                tester_runs = report.tester_invocations,
                checker_runs = report.checker_invocations,
                elapsed_ms = report.elapsed_ms,
                "all checks passed"
            );
            if let Some(path) = &args.report {
                report.write_json(path)?;
                info!(path = %path.display(), "wrote report");
            }
        }
        Command::Plan(args) if !args.grant.is_empty() => {
            let plan = plan::for_grant(CATALOG, &args.grant)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Plan(args) => {
            let plan = plan::build(CATALOG, args.subsets);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    Ok(())
}
