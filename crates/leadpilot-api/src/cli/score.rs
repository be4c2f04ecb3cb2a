//! Offline lead scoring.

use anyhow::{Result, bail};
use console::style;
use serde::Serialize;

use leadpilot_core::repository::conversation::ConversationLog;
use leadpilot_core::scoring::{self, ScoreBreakdown};
use leadpilot_infra::sqlite::conversation::SqliteConversationLog;
use leadpilot_infra::sqlite::pool::DatabasePool;
use leadpilot_types::chat::{MessageRole, Turn};
use leadpilot_types::config::AppConfig;
use leadpilot_types::lead::{Authority, LeadStatus};

/// Where the clarity figure came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaritySource {
    Flag,
    ConfigDefault,
    Transcript { visitor_id: String, turns: usize },
}

/// Everything `leadpilot score` reports.
#[derive(Debug, Serialize)]
pub struct ScoreReport {
    pub score: u8,
    pub status: LeadStatus,
    pub timeline_days: u32,
    pub authority: Authority,
    pub clarity: i64,
    pub clarity_source: ClaritySource,
    pub breakdown: ScoreBreakdown,
    pub recommended_actions: &'static [&'static str],
}

pub fn score_report(
    budget_max: i64,
    timeline: &str,
    authority: &str,
    clarity: i64,
    clarity_source: ClaritySource,
) -> ScoreReport {
    let timeline_days = scoring::timeline_to_days(timeline);
    let authority = Authority::from_label(authority);
    let breakdown = scoring::breakdown(budget_max, timeline_days, authority, clarity);
    let status = scoring::status_from_score(breakdown.total);
    ScoreReport {
        score: breakdown.total,
        status,
        timeline_days,
        authority,
        clarity,
        clarity_source,
        breakdown,
        recommended_actions: scoring::recommended_actions(status),
    }
}

/// Estimate clarity from a visitor's durable transcript.
///
/// Tool audit turns are left out; only what the visitor and the agent said
/// counts.
pub async fn transcript_clarity(pool: &DatabasePool, visitor_id: &str) -> Result<(u8, usize)> {
    let log = SqliteConversationLog::new(pool.clone());
    let Some(conversation) = log.find_conversation(visitor_id).await? else {
        bail!("no conversation stored for visitor '{visitor_id}'");
    };

    let turns: Vec<Turn> = log
        .list_messages(&conversation.id)
        .await?
        .into_iter()
        .filter(|m| m.role != MessageRole::Tool)
        .map(|m| Turn::new(m.role, m.content))
        .collect();
    Ok((scoring::clarity_from_history(&turns), turns.len()))
}

async fn resolve_clarity(
    config: &AppConfig,
    clarity: Option<i64>,
    visitor: Option<&str>,
) -> Result<(i64, ClaritySource)> {
    if let Some(clarity) = clarity {
        return Ok((clarity, ClaritySource::Flag));
    }
    let Some(visitor_id) = visitor else {
        return Ok((
            i64::from(config.scoring.default_clarity),
            ClaritySource::ConfigDefault,
        ));
    };

    let pool = DatabasePool::new(&config.database.url).await?;
    let estimate = transcript_clarity(&pool, visitor_id).await;
    pool.close().await;
    let (clarity, turns) = estimate?;
    Ok((
        i64::from(clarity),
        ClaritySource::Transcript {
            visitor_id: visitor_id.to_string(),
            turns,
        },
    ))
}

pub async fn score(
    config: &AppConfig,
    budget_max: i64,
    timeline: &str,
    authority: &str,
    clarity: Option<i64>,
    visitor: Option<&str>,
    json: bool,
) -> Result<()> {
    let (clarity, source) = resolve_clarity(config, clarity, visitor).await?;
    let report = score_report(budget_max, timeline, authority, clarity, source);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let status = match report.status {
        LeadStatus::Hot => style(report.status.to_string()).red().bold(),
        LeadStatus::Warm => style(report.status.to_string()).yellow().bold(),
        _ => style(report.status.to_string()).cyan(),
    };
    let source = match &report.clarity_source {
        ClaritySource::Flag => "given".to_string(),
        ClaritySource::ConfigDefault => "config default".to_string(),
        ClaritySource::Transcript { visitor_id, turns } => {
            format!("from {turns} turns of {visitor_id}")
        }
    };

    println!();
    println!("  Score:     {} ({status})", style(report.score).bold());
    println!("  Timeline:  {} days", report.timeline_days);
    println!("  Authority: {}", report.authority);
    println!("  Clarity:   {} {}", report.clarity, style(format!("({source})")).dim());
    println!();
    println!("  {}", style("── Breakdown ──").dim());
    println!("  Budget:    {:>5.1}", report.breakdown.budget);
    println!("  Timeline:  {:>5.1}", report.breakdown.timeline);
    println!("  Authority: {:>5.1}", report.breakdown.authority);
    println!("  Clarity:   {:>5.1}", report.breakdown.clarity);
    println!();
    println!("  {}", style("── Next steps ──").dim());
    for action in report.recommended_actions {
        println!("  {action}");
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hot_lead_report() {
        let report = score_report(15_000, "3 weeks", "dm", 70, ClaritySource::Flag);
        assert_eq!(report.timeline_days, 21);
        assert_eq!(report.score, 94);
        assert_eq!(report.status, LeadStatus::Hot);
        assert_eq!(
            report.recommended_actions,
            scoring::recommended_actions(LeadStatus::Hot)
        );
    }

    #[test]
    fn test_unknown_authority_label_scores_as_unknown() {
        let report = score_report(4_000, "6 months", "the ceo's cousin", 50, ClaritySource::Flag);
        assert_eq!(report.authority, Authority::Unknown);
        assert_eq!(report.timeline_days, 180);
        // 20 + 5 + 8 + 10
        assert_eq!(report.score, 43);
        assert_eq!(report.status, LeadStatus::Cold);
        assert!(report.recommended_actions[0].contains("drip campaign"));
    }

    #[tokio::test]
    async fn test_clarity_from_stored_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("score.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let log = SqliteConversationLog::new(pool.clone());
        let conversation = log.ensure_conversation("v9").await.unwrap();
        for (role, content) in [
            (MessageRole::User, "Not sure yet, maybe a website"),
            (MessageRole::Assistant, "Happy to help."),
            (MessageRole::Tool, r#"{"tool":"save_lead","arguments":{"api":"exactly"}}"#),
        ] {
            log.append_message(&conversation.id, role, content).await.unwrap();
        }

        // 50 - 15 (hedging) - 10 (two turns); the tool audit is ignored
        let (clarity, turns) = transcript_clarity(&pool, "v9").await.unwrap();
        assert_eq!(clarity, 25);
        assert_eq!(turns, 2);

        assert!(transcript_clarity(&pool, "nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_clarity_prefers_flag_then_default() {
        let config = AppConfig::default();
        let (clarity, source) = resolve_clarity(&config, Some(33), None).await.unwrap();
        assert_eq!((clarity, source), (33, ClaritySource::Flag));

        let (clarity, source) = resolve_clarity(&config, None, None).await.unwrap();
        assert_eq!(clarity, i64::from(config.scoring.default_clarity));
        assert_eq!(source, ClaritySource::ConfigDefault);
    }
}
