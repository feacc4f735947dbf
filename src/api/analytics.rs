/// Emotion analytics over stored therapy sessions
use crate::{auth::AuthAccount, context::AppContext, error::ApiResult};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Build analytics routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/analytics/patient/:patient_id/emotions/summary",
            get(emotion_summary),
        )
        .route(
            "/analytics/patient/:patient_id/emotions/by-session",
            get(emotions_by_session),
        )
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct EmotionCount {
    emotion: String,
    count: i64,
}

#[derive(Debug, Serialize)]
struct SessionEmotions {
    date: DateTime<Utc>,
    emotions: Vec<EmotionCount>,
}

/// Pull emotion counts out of a session's results JSON.
///
/// Prefers the model's precomputed `emotion_summary`; otherwise counts
/// label occurrences in `timeline`. Unparsable results count as empty
/// rather than failing the whole aggregation.
fn parse_emotion_counts(results: &str) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();

    let value: serde_json::Value = match serde_json::from_str(results) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("skipping unparsable session results: {}", e);
            return counts;
        }
    };

    if let Some(summary) = value.get("emotion_summary").and_then(|v| v.as_object()) {
        for (emotion, count) in summary {
            counts.insert(emotion.clone(), count.as_i64().unwrap_or(0));
        }
        return counts;
    }

    if let Some(timeline) = value.get("timeline").and_then(|v| v.as_object()) {
        for label in timeline.values().filter_map(|v| v.as_str()) {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    counts
}

/// Total emotion counts across all of a patient's sessions
async fn emotion_summary(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<Vec<EmotionCount>>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let sessions = ctx.sessions.list(patient_id).await?;

    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for session in &sessions {
        for (emotion, count) in parse_emotion_counts(&session.results) {
            *totals.entry(emotion).or_insert(0) += count;
        }
    }

    let summary = totals
        .into_iter()
        .map(|(emotion, count)| EmotionCount { emotion, count })
        .collect();

    Ok(Json(summary))
}

/// Per-session emotion counts, keyed by session id
async fn emotions_by_session(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<BTreeMap<String, SessionEmotions>>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let sessions = ctx.sessions.list(patient_id).await?;

    let mut by_session = BTreeMap::new();
    for session in &sessions {
        let emotions = parse_emotion_counts(&session.results)
            .into_iter()
            .map(|(emotion, count)| EmotionCount { emotion, count })
            .collect();

        by_session.insert(
            session.id.to_string(),
            SessionEmotions {
                date: session.date,
                emotions,
            },
        );
    }

    Ok(Json(by_session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_emotion_summary() {
        let counts = parse_emotion_counts(
            r#"{"emotion_summary":{"happy":3,"sad":1},"timeline":{"0":"angry"}}"#,
        );
        assert_eq!(counts.get("happy"), Some(&3));
        assert_eq!(counts.get("sad"), Some(&1));
        assert_eq!(counts.get("angry"), None);
    }

    #[test]
    fn falls_back_to_timeline_counting() {
        let counts = parse_emotion_counts(
            r#"{"timeline":{"0.0":"happy","1.0":"happy","2.0":"neutral"}}"#,
        );
        assert_eq!(counts.get("happy"), Some(&2));
        assert_eq!(counts.get("neutral"), Some(&1));
    }

    #[test]
    fn unparsable_results_count_as_empty() {
        assert!(parse_emotion_counts("not json").is_empty());
        assert!(parse_emotion_counts("{}").is_empty());
    }
}
