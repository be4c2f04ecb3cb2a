//! Lead types for Leadpilot.
//!
//! A lead is a prospect record keyed by email. Updates never erase known
//! fields: a [`LeadPatch`] only overwrites what it actually carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// How much buying authority the prospect has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    #[serde(rename = "dm")]
    DecisionMaker,
    #[serde(rename = "influencer")]
    Influencer,
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "no")]
    No,
}

impl Authority {
    /// Parse free text from the model, falling back to [`Authority::Unknown`]
    /// for anything unrecognised.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Authority::Unknown)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::DecisionMaker => write!(f, "dm"),
            Authority::Influencer => write!(f, "influencer"),
            Authority::Unknown => write!(f, "unknown"),
            Authority::No => write!(f, "no"),
        }
    }
}

impl FromStr for Authority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "dm" | "decision maker" | "decisionmaker" | "owner" => Ok(Authority::DecisionMaker),
            "influencer" => Ok(Authority::Influencer),
            "unknown" => Ok(Authority::Unknown),
            "no" | "none" => Ok(Authority::No),
            other => Err(format!("invalid authority: '{other}'")),
        }
    }
}

/// Qualification status of a lead.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('new', 'hot', 'warm', 'cold'))`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Hot,
    Warm,
    Cold,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::Hot => write!(f, "hot"),
            LeadStatus::Warm => write!(f, "warm"),
            LeadStatus::Cold => write!(f, "cold"),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "hot" => Ok(LeadStatus::Hot),
            "warm" => Ok(LeadStatus::Warm),
            "cold" => Ok(LeadStatus::Cold),
            other => Err(format!("invalid lead status: '{other}'")),
        }
    }
}

/// A prospect record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub timeline: Option<String>,
    pub authority: Option<Authority>,
    pub project_summary: Option<String>,
    pub score: Option<u8>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// A fresh, unscored lead with a new time-sortable id.
    pub fn new(email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email,
            name: None,
            phone: None,
            company: None,
            budget_min: None,
            budget_max: None,
            timeline: None,
            authority: None,
            project_summary: None,
            score: None,
            status: LeadStatus::New,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields reported about a lead in one `save_lead` call. `None` means
/// "not mentioned", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub timeline: Option<String>,
    pub authority: Option<Authority>,
    pub project_summary: Option<String>,
}

impl LeadPatch {
    /// Merge into `lead`. Present values win; absent or blank values keep
    /// whatever the lead already had.
    pub fn apply_to(self, lead: &mut Lead) {
        merge_text(&mut lead.name, self.name);
        merge_text(&mut lead.phone, self.phone);
        merge_text(&mut lead.company, self.company);
        merge_text(&mut lead.timeline, self.timeline);
        merge_text(&mut lead.project_summary, self.project_summary);
        if self.budget_min.is_some() {
            lead.budget_min = self.budget_min;
        }
        if self.budget_max.is_some() {
            lead.budget_max = self.budget_max;
        }
        if self.authority.is_some() {
            lead.authority = self.authority;
        }
        lead.updated_at = Utc::now();
    }
}

fn merge_text(slot: &mut Option<String>, incoming: Option<String>) {
    if let Some(value) = incoming {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *slot = Some(trimmed.to_string());
        }
    }
}
