use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::cli::RecordArgs;
use crate::config::{AppConfig, Taxonomy};
use crate::model::StoreRow;
use crate::store::{append_rows, open_store};

pub fn run(args: RecordArgs, config: &AppConfig) -> Result<()> {
    let submission = Submission::from_args(&args);
    submission.validate(&config.taxonomy)?;

    let session_id = Uuid::new_v4().to_string();
    let rows = submission.to_rows(&session_id, Utc::now());

    let db_path = args.store.db_path();
    let mut connection = open_store(&db_path)?;
    let appended = append_rows(&mut connection, &rows)?;

    info!(
        annotator = %submission.annotator,
        incident = %submission.incident,
        session_id = %session_id,
        rows = appended,
        "recorded submission"
    );
    Ok(())
}

/// One press of the submit button: a rater's labels for one incident.
#[derive(Debug, Clone)]
struct Submission {
    annotator: String,
    incident: String,
    stakeholders: Vec<String>,
    harm_category: String,
    harm_subcategories: Vec<String>,
    harm_type: String,
    notes: Option<String>,
}

impl Submission {
    fn from_args(args: &RecordArgs) -> Self {
        Self {
            annotator: args.annotator.trim().to_string(),
            incident: args.incident.trim().to_string(),
            stakeholders: dedup_trimmed(&args.stakeholders),
            harm_category: args.harm_category.trim().to_string(),
            harm_subcategories: dedup_trimmed(&args.harm_subcategories),
            harm_type: args.harm_type.trim().to_string(),
            notes: args
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
        }
    }

    fn validate(&self, taxonomy: &Taxonomy) -> Result<()> {
        if self.annotator.is_empty() {
            bail!("annotator must not be empty");
        }
        if self.incident.is_empty() {
            bail!("incident must not be empty");
        }
        if self.stakeholders.is_empty() {
            bail!("select at least one impacted stakeholder");
        }
        if self.harm_subcategories.is_empty() {
            bail!("select at least one harm subcategory");
        }

        for stakeholder in &self.stakeholders {
            if !taxonomy.is_stakeholder(stakeholder) {
                bail!("unknown stakeholder: {stakeholder}");
            }
        }

        let Some(category) = taxonomy.category(&self.harm_category) else {
            bail!("unknown harm category: {}", self.harm_category);
        };
        for subcategory in &self.harm_subcategories {
            if !category.subcategories.iter().any(|value| value == subcategory) {
                bail!(
                    "harm subcategory {subcategory} does not belong to {}",
                    category.name
                );
            }
        }

        if !taxonomy.is_harm_type(&self.harm_type) {
            bail!("unknown harm type: {}", self.harm_type);
        }

        Ok(())
    }

    /// One row per (stakeholder, subcategory) pair, all sharing the session
    /// id, timestamp and date of this submission.
    fn to_rows(&self, session_id: &str, submitted_at: DateTime<Utc>) -> Vec<StoreRow> {
        let datetime = submitted_at.format("%Y-%m-%d").to_string();
        let timestamp = submitted_at.timestamp().to_string();

        let mut rows = Vec::with_capacity(self.stakeholders.len() * self.harm_subcategories.len());
        for stakeholder in &self.stakeholders {
            for subcategory in &self.harm_subcategories {
                rows.push(StoreRow {
                    datetime: Some(datetime.clone()),
                    annotator: Some(self.annotator.clone()),
                    incident_id: Some(self.incident.clone()),
                    stakeholders: Some(stakeholder.clone()),
                    harm_category: Some(self.harm_category.clone()),
                    harm_subcategory: Some(subcategory.clone()),
                    harm_type: Some(self.harm_type.clone()),
                    notes: self.notes.clone(),
                    timestamp: Some(timestamp.clone()),
                    session_id: Some(session_id.to_string()),
                });
            }
        }
        rows
    }
}

fn dedup_trimmed(values: &[String]) -> Vec<String> {
    let mut out = Vec::<String>::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && out.iter().all(|existing| existing != value) {
            out.push(value.to_string());
        }
    }
    out
}
