use crate::infra::InMemoryCustomerRepository;
use clap::Args;
use energy_credit::config::AppConfig;
use energy_credit::credit::{
    read_customer_records_from_path, BatchEntry, CreditScoringService, ModelMetadata,
    ScoringEngine, ScoringOptions,
};
use energy_credit::error::AppError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Customer CSV export with a `customer_id` column and one column per raw field
    #[arg(long)]
    pub(crate) customers: PathBuf,
    /// Model artifact to score with (defaults to CREDIT_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Attach the top contributing factors to every score
    #[arg(long)]
    pub(crate) explain: bool,
    /// Number of factors to report when explaining
    #[arg(long)]
    pub(crate) top_k: Option<usize>,
    /// Oldest artifact version to accept (defaults to CREDIT_MODEL_MIN_VERSION)
    #[arg(long)]
    pub(crate) min_version: Option<u32>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateModelArgs {
    /// Path to the model artifact JSON
    pub(crate) path: PathBuf,
    /// Oldest artifact version to accept (defaults to CREDIT_MODEL_MIN_VERSION)
    #[arg(long)]
    pub(crate) min_version: Option<u32>,
}

/// Totals written to stderr once every customer has been scored.
#[derive(Debug, Default, Serialize, PartialEq)]
pub(crate) struct ScoreSummary {
    pub(crate) model_version: String,
    pub(crate) scored: usize,
    pub(crate) failed: usize,
    pub(crate) categories: BTreeMap<&'static str, usize>,
}

impl ScoreSummary {
    fn record(&mut self, entry: &BatchEntry) {
        match entry {
            BatchEntry::Scored(result) => {
                self.scored += 1;
                *self.categories.entry(result.risk_category.label()).or_default() += 1;
            }
            BatchEntry::Failed { .. } => self.failed += 1,
        }
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let stdout = std::io::stdout();
    let summary = score_export(&config, args, &mut stdout.lock())?;
    eprintln!(
        "scored {} customers ({} failed) with model {}",
        summary.scored, summary.failed, summary.model_version
    );
    for (category, count) in &summary.categories {
        eprintln!("  - {category}: {count}");
    }
    Ok(())
}

/// Score every row of the export in file order, writing one JSON line per customer.
pub(crate) fn score_export(
    config: &AppConfig,
    args: ScoreArgs,
    out: &mut impl Write,
) -> Result<ScoreSummary, AppError> {
    let ScoreArgs {
        customers,
        model,
        explain,
        top_k,
        min_version,
    } = args;

    let engine = Arc::new(ScoringEngine::new(
        min_version.unwrap_or(config.scoring.minimum_model_version),
    ));
    let model_path = model.unwrap_or_else(|| config.scoring.model_path.clone());
    let active = engine.load(&model_path)?;

    let records = read_customer_records_from_path(&customers)?;
    let ids: Vec<_> = records
        .iter()
        .map(|record| record.customer_id.clone())
        .collect();

    let mut options = ScoringOptions::from(&config.scoring);
    options.model_path = Some(model_path);
    if let Some(top_k) = top_k {
        options.explanation_top_k = top_k;
    }
    let service = CreditScoringService::new(
        Arc::new(InMemoryCustomerRepository::from_records(records)),
        engine,
        options,
    );

    let mut summary = ScoreSummary {
        model_version: active.metadata().model_version.clone(),
        ..ScoreSummary::default()
    };
    for customer_id in ids {
        let entry = match service.score_customer(&customer_id, explain) {
            Ok(result) => BatchEntry::Scored(result),
            Err(err) => BatchEntry::Failed {
                customer_id,
                kind: err.kind(),
                error: err.to_string(),
            },
        };
        summary.record(&entry);
        serde_json::to_writer(&mut *out, &entry)?;
        writeln!(out)?;
    }

    Ok(summary)
}

pub(crate) fn run_validate_model(args: ValidateModelArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let metadata = validate_model(&config, args)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

pub(crate) fn validate_model(
    config: &AppConfig,
    args: ValidateModelArgs,
) -> Result<ModelMetadata, AppError> {
    let engine = ScoringEngine::new(
        args.min_version
            .unwrap_or(config.scoring.minimum_model_version),
    );
    let active = engine.load(&args.path)?;
    Ok(active.metadata().clone())
}
