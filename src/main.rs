use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use tfplan_harness::assertion::report::SuiteReport;
use tfplan_harness::config::{parse_timeout, HarnessConfig};
use tfplan_harness::harness::Harness;
use tfplan_harness::logger::{self, LogFormat};
use tfplan_harness::plan::cache::PlanCache;
use tfplan_harness::suite::{run_suites, TestSuite};

const EXIT_CONFIG_ERROR: u8 = 2;

/// Plans a Terraform template with the variables of each suite and checks the planned values.
#[derive(Parser, Debug)]
#[command(name = "tfplan-harness")]
#[command(version)]
#[command(about = "Assertions on Terraform plans", long_about = None)]
struct Cli {
    /// Terraform template directory (default: $TFPLAN_HARNESS_TEMPLATE_DIR)
    #[arg(short = 't', long)]
    template_dir: Option<PathBuf>,

    /// Default variables, .json/.tfvars.json/.yaml (default: $TFPLAN_HARNESS_DEFAULTS_FILE)
    #[arg(short = 'd', long)]
    defaults: Option<PathBuf>,

    /// Terraform binary (default: $TFPLAN_HARNESS_TERRAFORM_BINARY or `terraform`)
    #[arg(long)]
    terraform: Option<PathBuf>,

    /// Timeout of each terraform command, e.g. 45m (default: $TFPLAN_HARNESS_PLAN_TIMEOUT or 30m)
    #[arg(long)]
    timeout: Option<String>,

    /// Suite files to run
    #[arg(required = true)]
    suites: Vec<PathBuf>,
}

impl Cli {
    fn apply(&self, mut config: HarnessConfig) -> anyhow::Result<HarnessConfig> {
        if let Some(template_dir) = &self.template_dir {
            config.template_dir = Some(template_dir.clone());
        }
        if let Some(defaults) = &self.defaults {
            config.defaults_file = Some(defaults.clone());
        }
        if let Some(terraform) = &self.terraform {
            config.terraform_binary = terraform.clone();
        }
        if let Some(timeout) = &self.timeout {
            config.plan_timeout = parse_timeout("--timeout", timeout)?;
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> anyhow::Result<SuiteReport> {
    let config = cli.apply(HarnessConfig::from_env()?)?;
    let defaults = config.load_defaults()?;
    let suites = cli
        .suites
        .iter()
        .map(|path| TestSuite::from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let harness = Harness::from_config(&config, Arc::new(PlanCache::new()))
        .with_context(|| "cannot set up the plan harness".to_string())?;
    let report = run_suites(&harness, &defaults, &suites)?;

    Ok(report)
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logger::init(LogFormat::from_env());
    let cli = Cli::parse();

    match run(&cli) {
        Ok(report) => {
            print!("{}", report.render());
            ExitCode::from(report.exit_code())
        }
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}
