use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::operations::FrenchSession;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrenchStats {
    pub sessions: usize,
    pub total_minutes: i64,
    pub vocabulary_count: usize,
    pub sentence_count: usize,
    pub minutes_by_activity: BTreeMap<String, i64>,
}

pub fn summarize(sessions: &[FrenchSession]) -> FrenchStats {
    let mut stats = FrenchStats {
        sessions: sessions.len(),
        ..FrenchStats::default()
    };

    for session in sessions {
        let minutes = i64::from(session.total_time.unwrap_or(session.duration_minutes));
        stats.total_minutes += minutes;
        stats.vocabulary_count += session.new_vocabulary.len();
        stats.sentence_count += session.practice_sentences.len();
        *stats
            .minutes_by_activity
            .entry(session.activity_type.trim().to_lowercase())
            .or_insert(0) += minutes;
    }

    stats
}
