//! Campaign Console: operator CLI over the segment builder and campaign wizard.
//!
//! Validates segment drafts, previews them against a customer file and
//! summarizes saved wizard states.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use campaign_core::config::AppConfig;
use campaign_management::{CampaignWizard, WizardState};
use campaign_segmentation::service::preview_count;
use campaign_segmentation::{
    CustomerProfile, FieldCatalog, LocalSegmentEvaluator, SegmentEditor, SegmentPayload,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-console")]
#[command(about = "Segment and campaign wizard tooling for the campaign console")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still take precedence)
    #[arg(long, env = "CAMPAIGN_CONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// JSON field catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Log filter directive, overriding `log.filter`
    #[arg(long)]
    log_filter: Option<String>,

    /// Log output format, overriding `log.json`
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Json,
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the field catalog
    Catalog,

    /// Check a segment draft ({name, description, tags, conditions})
    ValidateSegment {
        /// Path to the segment draft JSON
        file: PathBuf,
    },

    /// Count the customers a segment draft matches
    Preview {
        /// Path to the segment draft JSON
        file: PathBuf,

        /// Path to a JSON array of customer profiles
        #[arg(long)]
        customers: PathBuf,
    },

    /// Summarize a saved campaign wizard state
    Audience {
        /// Path to the wizard state JSON
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if let Some(filter) = &cli.log_filter {
        config.log.filter = filter.clone();
    }
    if let Some(format) = cli.log_format {
        config.log.json = matches!(format, LogFormat::Json);
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log.filter.clone().into());
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    config.validate()?;

    let catalog = Arc::new(match &cli.catalog {
        Some(path) => read_json::<FieldCatalog>(path)?,
        None => FieldCatalog::standard(),
    });

    match cli.command {
        Commands::Catalog => print_json(catalog.as_ref()),
        Commands::ValidateSegment { file } => cmd_validate_segment(catalog, &config, &file),
        Commands::Preview { file, customers } => cmd_preview(&file, &customers).await,
        Commands::Audience { file } => cmd_audience(&file),
    }
}

// ---------------------------------------------------------------------------
// Segment commands
// ---------------------------------------------------------------------------

fn cmd_validate_segment(
    catalog: Arc<FieldCatalog>,
    config: &AppConfig,
    file: &Path,
) -> anyhow::Result<()> {
    let payload: SegmentPayload = read_json(file)?;
    let editor = SegmentEditor::from_payload(Arc::clone(&catalog), &config.segments, payload)?;
    let draft = editor.validate()?;
    draft
        .conditions
        .validate_against(&catalog)
        .with_context(|| format!("segment {:?} is invalid", draft.name))?;

    info!(
        name = %draft.name,
        groups = draft.conditions.len(),
        conditions = draft.conditions.condition_count(),
        "Segment draft is valid"
    );
    println!(
        "ok: {} ({} groups, {} conditions)",
        draft.name,
        draft.conditions.len(),
        draft.conditions.condition_count()
    );
    Ok(())
}

async fn cmd_preview(file: &Path, customers: &Path) -> anyhow::Result<()> {
    let draft: SegmentPayload = read_json(file)?;
    let profiles: Vec<CustomerProfile> = read_json(customers)?;
    let evaluator = LocalSegmentEvaluator::with_customers(profiles);

    draft.conditions.ensure_persistable()?;

    match preview_count(&evaluator, &draft.conditions).await {
        Some(count) => {
            println!("{count} of {} customers match", evaluator.customer_count());
            Ok(())
        }
        None => anyhow::bail!("preview failed"),
    }
}

// ---------------------------------------------------------------------------
// Wizard commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AudienceReport {
    step: campaign_management::WizardStep,
    audience: campaign_management::AudienceSummary,
    offer_reach: Vec<(String, u64)>,
    can_advance: bool,
    warnings: Vec<String>,
    request: Option<campaign_management::CreateCampaignRequest>,
    request_error: Option<String>,
}

fn cmd_audience(file: &Path) -> anyhow::Result<()> {
    let state: WizardState = read_json(file)?;
    let wizard = CampaignWizard::from_state(state);

    let offer_reach = wizard
        .state()
        .offers
        .iter()
        .map(|o| (o.id.clone(), wizard.estimated_reach(&o.id)))
        .collect();

    let (request, request_error) = match wizard.submit() {
        Ok(request) => (Some(request), None),
        Err(e) => (None, Some(e.display_message())),
    };

    print_json(&AudienceReport {
        step: wizard.step(),
        audience: wizard.audience_summary(),
        offer_reach,
        can_advance: wizard.can_advance(),
        warnings: wizard.warnings(),
        request,
        request_error,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
