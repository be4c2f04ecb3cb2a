//! SQLite lead repository implementation.
//!
//! Upserts are keyed by email through the `UNIQUE(email)` constraint. On
//! conflict every column is merged with `COALESCE`, so a concurrent writer
//! can add fields but never erase them.

use leadpilot_core::repository::lead::LeadRepository;
use leadpilot_types::error::RepositoryError;
use leadpilot_types::lead::{Authority, Lead, LeadStatus};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `LeadRepository`.
#[derive(Clone)]
pub struct SqliteLeadRepository {
    pool: DatabasePool,
}

impl SqliteLeadRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct LeadRow {
    id: String,
    email: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    budget_min: Option<i64>,
    budget_max: Option<i64>,
    timeline: Option<String>,
    authority: Option<String>,
    project_summary: Option<String>,
    score: Option<i64>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl LeadRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            company: row.try_get("company")?,
            budget_min: row.try_get("budget_min")?,
            budget_max: row.try_get("budget_max")?,
            timeline: row.try_get("timeline")?,
            authority: row.try_get("authority")?,
            project_summary: row.try_get("project_summary")?,
            score: row.try_get("score")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_lead(self) -> Result<Lead, RepositoryError> {
        let authority = self
            .authority
            .as_deref()
            .map(|a| a.parse::<Authority>())
            .transpose()
            .map_err(RepositoryError::Query)?;
        let status: LeadStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Lead {
            id: parse_uuid(&self.id, "lead id")?,
            email: self.email,
            name: self.name,
            phone: self.phone,
            company: self.company,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            timeline: self.timeline,
            authority,
            project_summary: self.project_summary,
            score: self.score.map(|s| s.clamp(0, 100) as u8),
            status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// LeadRepository implementation
// ---------------------------------------------------------------------------

impl LeadRepository for SqliteLeadRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM leads WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let lead_row =
                    LeadRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(lead_row.into_lead()?))
            }
            None => Ok(None),
        }
    }

    async fn upsert(&self, lead: &Lead) -> Result<Lead, RepositoryError> {
        let row = sqlx::query(
            r#"INSERT INTO leads (id, email, name, phone, company, budget_min, budget_max, timeline,
                                  authority, project_summary, score, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(email) DO UPDATE SET
                   name            = COALESCE(excluded.name, leads.name),
                   phone           = COALESCE(excluded.phone, leads.phone),
                   company         = COALESCE(excluded.company, leads.company),
                   budget_min      = COALESCE(excluded.budget_min, leads.budget_min),
                   budget_max      = COALESCE(excluded.budget_max, leads.budget_max),
                   timeline        = COALESCE(excluded.timeline, leads.timeline),
                   authority       = COALESCE(excluded.authority, leads.authority),
                   project_summary = COALESCE(excluded.project_summary, leads.project_summary),
                   score           = COALESCE(excluded.score, leads.score),
                   status          = CASE WHEN excluded.status = 'new' THEN leads.status
                                          ELSE excluded.status END,
                   updated_at      = excluded.updated_at
               RETURNING *"#,
        )
        .bind(lead.id.to_string())
        .bind(&lead.email)
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(lead.budget_min)
        .bind(lead.budget_max)
        .bind(&lead.timeline)
        .bind(lead.authority.map(|a| a.to_string()))
        .bind(&lead.project_summary)
        .bind(lead.score.map(i64::from))
        .bind(lead.status.to_string())
        .bind(format_datetime(&lead.created_at))
        .bind(format_datetime(&lead.updated_at))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            other => RepositoryError::Query(other.to_string()),
        })?;

        LeadRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_lead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::test_pool;

    fn lead(email: &str) -> Lead {
        Lead::new(Some(email.to_string()))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = SqliteLeadRepository::new(test_pool().await);
        let mut new = lead("jane@x.com");
        new.name = Some("Jane".into());
        new.authority = Some(Authority::DecisionMaker);
        new.score = Some(89);
        new.status = LeadStatus::Hot;

        let stored = repo.upsert(&new).await.unwrap();
        assert_eq!(stored.id, new.id);

        let found = repo.find_by_email("jane@x.com").await.unwrap().unwrap();
        assert_eq!(found.name.as_deref(), Some("Jane"));
        assert_eq!(found.authority, Some(Authority::DecisionMaker));
        assert_eq!(found.score, Some(89));
        assert_eq!(found.status, LeadStatus::Hot);
        assert!(repo.find_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conflicting_insert_merges_into_existing_row() {
        let repo = SqliteLeadRepository::new(test_pool().await);

        let mut first = lead("a@x.com");
        first.company = Some("Acme".into());
        first.budget_max = Some(12_000);
        let first = repo.upsert(&first).await.unwrap();

        // A second writer that never saw the first row.
        let mut second = lead("a@x.com");
        second.name = Some("Ann".into());
        let merged = repo.upsert(&second).await.unwrap();

        assert_eq!(merged.id, first.id);
        assert_eq!(merged.name.as_deref(), Some("Ann"));
        assert_eq!(merged.company.as_deref(), Some("Acme"));
        assert_eq!(merged.budget_max, Some(12_000));

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
            .fetch_one(&repo.pool.reader)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_new_status_does_not_downgrade_scored_lead() {
        let repo = SqliteLeadRepository::new(test_pool().await);

        let mut scored = lead("a@x.com");
        scored.status = LeadStatus::Warm;
        scored.score = Some(60);
        repo.upsert(&scored).await.unwrap();

        let merged = repo.upsert(&lead("a@x.com")).await.unwrap();
        assert_eq!(merged.status, LeadStatus::Warm);
        assert_eq!(merged.score, Some(60));
    }
}
