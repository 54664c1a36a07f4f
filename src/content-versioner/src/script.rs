//! Edit scripts: a JSON document of items to create and edits to apply, in order.

use mktops_core::{ContentError, ContentId};
use mktops_versioning::{AuthoringService, EditOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct EditScript {
    #[serde(default)]
    pub items: Vec<ScriptItem>,
    #[serde(default)]
    pub edits: Vec<ScriptEdit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptItem {
    pub token: String,
    pub content_id: ContentId,
    pub organization_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEdit {
    pub token: String,
    pub content_id: ContentId,
    pub body: String,
}

/// One line of output per script step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub content_id: ContentId,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    ItemCreated,
    Created { version_number: u32 },
    Unchanged { latest_version_number: u32 },
    Error { error: String },
}

impl From<ContentError> for StepOutcome {
    fn from(err: ContentError) -> Self {
        StepOutcome::Error {
            error: err.to_string(),
        }
    }
}

impl EditScript {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply every step in order. A failing step is reported and the run continues.
    pub async fn run(&self, service: &AuthoringService) -> Vec<StepReport> {
        let mut reports = Vec::with_capacity(self.items.len() + self.edits.len());

        for item in &self.items {
            let outcome = match service
                .create_item(
                    &item.token,
                    item.content_id.clone(),
                    item.organization_id,
                    item.title.clone(),
                )
                .await
            {
                Ok(_) => StepOutcome::ItemCreated,
                Err(e) => {
                    warn!(content_id = %item.content_id, error = %e, "Item creation failed");
                    e.into()
                }
            };
            reports.push(StepReport {
                step: "item",
                content_id: item.content_id.clone(),
                outcome,
            });
        }

        for edit in &self.edits {
            let outcome = match service.submit_edit(&edit.token, &edit.content_id, &edit.body).await {
                Ok(EditOutcome::Created { version }) => StepOutcome::Created {
                    version_number: version.version_number,
                },
                Ok(EditOutcome::Unchanged {
                    latest_version_number,
                }) => StepOutcome::Unchanged {
                    latest_version_number,
                },
                Err(e) => {
                    warn!(content_id = %edit.content_id, error = %e, "Edit failed");
                    e.into()
                }
            };
            reports.push(StepReport {
                step: "edit",
                content_id: edit.content_id.clone(),
                outcome,
            });
        }

        reports
    }
}
