//! Lead scoring.
//!
//! A lead earns points in four buckets:
//!
//! | Factor    | Points |
//! |-----------|--------|
//! | budget    | 10 (< 3k), 20 (< 5k), 30 (< 10k), 40 (>= 10k) |
//! | timeline  | 20 (<= 28 days), 15 (<= 60), 10 (<= 120), 5 (longer) |
//! | authority | 20 (decision maker), 14 (influencer), 8 (unknown), 2 (none) |
//! | clarity   | clarity (clamped to 0..=100) x 0.2 |
//!
//! The rounded sum is clamped to `0..=100` and mapped to a status:
//! hot (>= 80), warm (>= 50), cold otherwise. All functions are pure.

use serde::Serialize;

use leadpilot_types::chat::Turn;
use leadpilot_types::lead::{Authority, LeadStatus};

/// Clarity assumed when nothing better is known.
pub const DEFAULT_CLARITY: u8 = 70;

/// Days assumed for timeline text that names no unit.
const DEFAULT_TIMELINE_DAYS: u32 = 60;

pub const HOT_THRESHOLD: u8 = 80;
pub const WARM_THRESHOLD: u8 = 50;

/// Per-factor points behind a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub budget: f64,
    pub timeline: f64,
    pub authority: f64,
    pub clarity: f64,
    pub total: u8,
}

pub fn budget_points(budget_max: i64) -> f64 {
    match budget_max {
        b if b < 3_000 => 10.0,
        b if b < 5_000 => 20.0,
        b if b < 10_000 => 30.0,
        _ => 40.0,
    }
}

pub fn timeline_points(timeline_days: u32) -> f64 {
    match timeline_days {
        0..=28 => 20.0,
        29..=60 => 15.0,
        61..=120 => 10.0,
        _ => 5.0,
    }
}

pub fn authority_points(authority: Authority) -> f64 {
    match authority {
        Authority::DecisionMaker => 20.0,
        Authority::Influencer => 14.0,
        Authority::Unknown => 8.0,
        Authority::No => 2.0,
    }
}

pub fn clarity_points(clarity: i64) -> f64 {
    clarity.clamp(0, 100) as f64 * 0.2
}

pub fn breakdown(
    budget_max: i64,
    timeline_days: u32,
    authority: Authority,
    clarity: i64,
) -> ScoreBreakdown {
    let budget = budget_points(budget_max);
    let timeline = timeline_points(timeline_days);
    let authority = authority_points(authority);
    let clarity = clarity_points(clarity);
    let total = (budget + timeline + authority + clarity).round().clamp(0.0, 100.0) as u8;
    ScoreBreakdown {
        budget,
        timeline,
        authority,
        clarity,
        total,
    }
}

/// Score a lead in `0..=100`.
pub fn score_lead(budget_max: i64, timeline_days: u32, authority: Authority, clarity: i64) -> u8 {
    breakdown(budget_max, timeline_days, authority, clarity).total
}

pub fn status_from_score(score: u8) -> LeadStatus {
    if score >= HOT_THRESHOLD {
        LeadStatus::Hot
    } else if score >= WARM_THRESHOLD {
        LeadStatus::Warm
    } else {
        LeadStatus::Cold
    }
}

/// Follow-up steps for the sales team, by lead status.
///
/// Unscored (`new`) leads get the cold playbook.
pub fn recommended_actions(status: LeadStatus) -> &'static [&'static str] {
    match status {
        LeadStatus::Hot => &[
            "🔥 URGENT: Contact within 1 hour",
            "📞 Schedule call immediately",
            "💼 Prepare custom proposal",
            "🎯 Assign to senior sales rep",
            "📧 Send case studies and portfolio",
        ],
        LeadStatus::Warm => &[
            "📅 Follow up within 24 hours",
            "📨 Send educational content",
            "🔄 Add to nurture sequence",
            "📊 Share pricing guide",
            "🤝 Offer free consultation",
        ],
        LeadStatus::Cold | LeadStatus::New => &[
            "📧 Add to email drip campaign",
            "📚 Send resources and guides",
            "🔔 Set reminder for 1 week follow-up",
            "💡 Offer free value (ebook, checklist)",
            "🎓 Invite to webinar or workshop",
        ],
    }
}

const CLARITY_BASELINE: i32 = 50;

/// (any of these substrings, points)
const CLARITY_SIGNALS: &[(&[&str], i32)] = &[
    (&["exactly", "specifically"], 10),
    (&["feature", "functionality"], 10),
    (&["example", "like"], 5),
    (&["user", "customer", "admin", "dashboard"], 10),
    (&["payment", "authentication", "database", "api"], 10),
    (&["not sure", "maybe", "probably"], -15),
    (&["don't know", "no idea"], -20),
];

/// Estimate project clarity (`0..=100`) from a conversation.
///
/// Starts at 50 and moves on keyword signals over the lowercased text of
/// every turn. More question marks than turns costs 10; ten or more turns
/// earn 10 and three or fewer cost 10.
pub fn clarity_from_history(turns: &[Turn]) -> u8 {
    let text = turns
        .iter()
        .map(|t| t.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut score = CLARITY_BASELINE;
    for (words, points) in CLARITY_SIGNALS {
        if words.iter().any(|w| text.contains(w)) {
            score += points;
        }
    }
    if text.matches('?').count() > turns.len() {
        score -= 10;
    }
    match turns.len() {
        n if n >= 10 => score += 10,
        n if n <= 3 => score -= 10,
        _ => {}
    }

    score.clamp(0, 100) as u8
}

/// Estimate a delivery timeline in days from free text.
///
/// "week" text counts weeks (default 4), "month" text counts months (default
/// 3); the count is the first run of digits. Anything else is 60 days.
pub fn timeline_to_days(text: &str) -> u32 {
    let lower = text.to_lowercase();
    let count = first_number(&lower);
    if lower.contains("week") {
        count.unwrap_or(4).saturating_mul(7)
    } else if lower.contains("month") {
        count.unwrap_or(3).saturating_mul(30)
    } else {
        DEFAULT_TIMELINE_DAYS
    }
}

fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        // Absurdly long digit runs saturate rather than fail.
        Some(digits.parse().unwrap_or(u32::MAX))
    }
}
