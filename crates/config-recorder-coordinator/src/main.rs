//! config-recorder: AWS Config recorder and aggregation provisioning
//!
//! Plans the AWS Config resources each account/region needs from one
//! settings file, then creates them through the AWS APIs.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use config_recorder_common::plan::PlanSummary;
use config_recorder_common::{AccountId, ExecutionContext, Facts, plan, order_contexts};
use config_recorder_coordinator::aws::{
    AwsContext, FromAwsContext, StsIdentity, partition_for_region, resolve_context,
};
use config_recorder_coordinator::config::{self, SettingsOverrides};
use config_recorder_coordinator::materializer::ApplyError;
use config_recorder_coordinator::rollout::{self, RolloutError};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "config-recorder")]
#[command(about = "AWS Config recorder and aggregation provisioning")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Arguments shared by every command
#[derive(ClapArgs, Debug)]
struct SettingsArgs {
    /// Path to the JSON settings file
    #[arg(short, long, env = "CONFIG_RECORDER_SETTINGS")]
    settings: PathBuf,

    /// Override the settings file's `enabled` flag
    #[arg(long)]
    enabled: Option<bool>,
}

impl SettingsArgs {
    fn load(&self) -> Result<config_recorder_common::RecorderSettings> {
        let settings = config::load_settings(&self.settings)?;
        Ok(SettingsOverrides {
            enabled: self.enabled,
        }
        .apply(settings))
    }
}

/// Arguments selecting one execution context
#[derive(ClapArgs, Debug)]
struct ContextArgs {
    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resource plan for one account/region as JSON
    Plan {
        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        context: ContextArgs,

        /// Plan for this account without calling AWS
        #[arg(long)]
        account_id: Option<String>,
    },

    /// Plan and create resources in one account/region
    Apply {
        #[command(flatten)]
        settings: SettingsArgs,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Plan and create resources across many accounts/regions
    Rollout {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Path to the JSON targets file (profiles and regions)
        #[arg(short, long)]
        targets: PathBuf,

        /// Print every context's plan in rollout order without creating anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    // Print main error message
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    // Print error chain (causes)
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(apply) = e.downcast_ref::<ApplyError>() {
        if let Some(suggestion) = apply.suggestion() {
            let _ = writeln!(stderr, "\n\x1b[36mSuggestion:\x1b[0m {suggestion}");
        }
    }

    if let Some(rollout) = e.downcast_ref::<RolloutError>() {
        for failure in &rollout.failures {
            let _ = writeln!(
                stderr,
                "\n  \x1b[1m{}\x1b[0m: {}",
                failure.context, failure.error
            );
            let mut source = std::error::Error::source(&failure.error);
            while let Some(cause) = source {
                let _ = writeln!(stderr, "    \x1b[33mCaused by:\x1b[0m {cause}");
                source = cause.source();
            }
            if let Some(suggestion) = failure.error.suggestion() {
                let _ = writeln!(stderr, "    \x1b[36mSuggestion:\x1b[0m {suggestion}");
            }
        }
    }

    // Only print backtrace hint if not already showing
    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Reduce noise from the AWS SDK (show only warnings and errors)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?)
                .add_directive("aws_sdk_sts=warn".parse()?),
        )
        .init();

    match args.command {
        Command::Plan {
            settings,
            context,
            account_id,
        } => handle_plan(settings, context, account_id).await,
        Command::Apply { settings, context } => handle_apply(settings, context).await,
        Command::Rollout {
            settings,
            targets,
            dry_run,
        } => handle_rollout(settings, targets, dry_run).await,
    }
}

/// Handle the plan command
async fn handle_plan(
    settings: SettingsArgs,
    context: ContextArgs,
    account_id: Option<String>,
) -> Result<()> {
    let recorder_settings = settings.load()?;

    let execution_context = match account_id {
        Some(account_id) => {
            let account_id = AccountId::parse(&account_id)
                .with_context(|| format!("--account-id must be 12 digits, got {account_id}"))?;
            ExecutionContext::new(account_id, &context.region)
                .with_partition(partition_for_region(&context.region))
        }
        None => {
            let aws = AwsContext::with_profile(&context.region, context.aws_profile.as_deref()).await;
            resolve_context(&StsIdentity::from_context(&aws)).await?
        }
    };

    let facts = Facts::resolve(&recorder_settings, execution_context)?;
    let plan = plan(&facts, &facts.label)?;
    print_json(&plan.summary()?)
}

/// Handle the apply command
async fn handle_apply(settings: SettingsArgs, context: ContextArgs) -> Result<()> {
    let recorder_settings = settings.load()?;

    if let Some(profile) = &context.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    let aws = AwsContext::with_profile(&context.region, context.aws_profile.as_deref()).await;
    let execution_context = resolve_context(&StsIdentity::from_context(&aws)).await?;

    let facts = Facts::resolve(&recorder_settings, execution_context)?;
    let plan = plan(&facts, &facts.label)?;

    info!(
        context = %plan.context(),
        resources = plan.len(),
        phase = %plan.phase(),
        "Applying plan"
    );

    let report = rollout::apply_context(&aws, &plan).await?;
    print_json(&report)
}

/// Handle the rollout command
async fn handle_rollout(settings: SettingsArgs, targets: PathBuf, dry_run: bool) -> Result<()> {
    let recorder_settings = settings.load()?;
    let targets = config::load_targets(&targets)?;

    if !dry_run {
        let report = rollout::run_rollout(&recorder_settings, &targets).await?;
        return print_json(&report);
    }

    let resolved = rollout::resolve_targets(&targets).await?;
    let planned = rollout::plan_contexts(&recorder_settings, resolved)?;
    let summaries = order_contexts(planned)
        .iter()
        .map(|planned| planned.plan.summary())
        .collect::<Result<Vec<PlanSummary>, _>>()?;

    info!(contexts = summaries.len(), "Dry run, nothing created");
    print_json(&summaries)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
