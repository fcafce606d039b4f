//! Roll-ups of `duolingo_activity` rows into dashboard chart data.
//!
//! Every function here is pure: callers fetch the rows for the look-back
//! window and pass "today" explicitly so results are reproducible.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::db::operations::ActivityRow;

pub const MAX_HEATMAP_DAYS: i64 = 365;
pub const DEFAULT_HEATMAP_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    pub fn lookback_days(self) -> i64 {
        match self {
            Self::Daily => 30,
            Self::Weekly => 90,
            Self::Monthly => 365,
            Self::Yearly => 1825,
        }
    }

    /// First date included in the window ending at `today`.
    pub fn window_start(self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.lookback_days())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpPoint {
    pub date: NaiveDate,
    pub xp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakInfo {
    pub current_streak: i64,
    pub longest_streak: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageTotals {
    pub language: String,
    pub total_xp: i64,
    pub lessons: i64,
    pub minutes: i64,
    pub active_days: usize,
    pub level: Option<i64>,
    pub streak: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStats {
    pub total_minutes: i64,
    pub total_lessons: i64,
    pub active_days: usize,
    pub average_minutes_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub xp: i64,
    pub lessons: i64,
    pub minutes: i64,
    pub intensity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub period: Period,
    pub total_xp: i64,
    pub time: TimeStats,
    pub streak: StreakInfo,
    pub languages: Vec<LanguageTotals>,
    pub recent_xp: Vec<XpPoint>,
}

/// One chart point per date, XP summed across languages and duplicate rows.
pub fn daily_xp(rows: &[ActivityRow]) -> Vec<XpPoint> {
    let mut by_date: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for row in rows {
        *by_date.entry(row.date).or_insert(0) += row.xp_gained;
    }
    by_date
        .into_iter()
        .map(|(date, xp)| XpPoint { date, xp })
        .collect()
}

/// Rows dated inside `start..=end`.
pub fn within(rows: &[ActivityRow], start: NaiveDate, end: NaiveDate) -> Vec<ActivityRow> {
    rows.iter()
        .filter(|row| row.date >= start && row.date <= end)
        .cloned()
        .collect()
}

pub fn total_xp(rows: &[ActivityRow]) -> i64 {
    rows.iter().map(|row| row.xp_gained).sum()
}

pub fn streak_info(rows: &[ActivityRow], today: NaiveDate) -> StreakInfo {
    let Some(latest_date) = rows.iter().map(|row| row.date).max() else {
        return StreakInfo::default();
    };

    let current_streak = rows
        .iter()
        .filter(|row| row.date == latest_date)
        .map(|row| row.streak_count)
        .max()
        .unwrap_or(0);
    let longest_streak = rows.iter().map(|row| row.streak_count).max().unwrap_or(0);

    let active_dates: BTreeSet<NaiveDate> = rows.iter().map(|row| row.date).collect();

    StreakInfo {
        current_streak,
        longest_streak: longest_streak.max(current_streak),
        is_active: active_dates.contains(&today),
    }
}

/// Totals per lowercased language, sorted by XP descending.
pub fn language_totals(rows: &[ActivityRow]) -> Vec<LanguageTotals> {
    struct Acc {
        total_xp: i64,
        lessons: i64,
        minutes: i64,
        dates: BTreeSet<NaiveDate>,
        latest: Option<(NaiveDate, Option<i64>, i64)>,
    }

    let mut by_language: BTreeMap<String, Acc> = BTreeMap::new();
    for row in rows {
        let key = row.language.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let acc = by_language.entry(key).or_insert_with(|| Acc {
            total_xp: 0,
            lessons: 0,
            minutes: 0,
            dates: BTreeSet::new(),
            latest: None,
        });
        acc.total_xp += row.xp_gained;
        acc.lessons += row.lessons_completed;
        acc.minutes += row.time_spent_minutes;
        acc.dates.insert(row.date);

        let newer = match acc.latest {
            Some((date, _, streak)) => row.date > date || (row.date == date && row.streak_count > streak),
            None => true,
        };
        if newer {
            acc.latest = Some((row.date, row.level, row.streak_count));
        }
    }

    let mut out: Vec<LanguageTotals> = by_language
        .into_iter()
        .map(|(language, acc)| LanguageTotals {
            language,
            total_xp: acc.total_xp,
            lessons: acc.lessons,
            minutes: acc.minutes,
            active_days: acc.dates.len(),
            level: acc.latest.and_then(|(_, level, _)| level),
            streak: acc.latest.map(|(_, _, streak)| streak).unwrap_or(0),
        })
        .collect();
    out.sort_by(|a, b| b.total_xp.cmp(&a.total_xp).then_with(|| a.language.cmp(&b.language)));
    out
}

pub fn time_stats(rows: &[ActivityRow]) -> TimeStats {
    let total_minutes: i64 = rows.iter().map(|row| row.time_spent_minutes).sum();
    let total_lessons: i64 = rows.iter().map(|row| row.lessons_completed).sum();
    let active_days = rows.iter().map(|row| row.date).collect::<BTreeSet<_>>().len();

    let average_minutes_per_day = if active_days == 0 {
        0.0
    } else {
        ((total_minutes as f64 / active_days as f64) * 10.0).round() / 10.0
    };

    TimeStats {
        total_minutes,
        total_lessons,
        active_days,
        average_minutes_per_day,
    }
}

pub fn intensity(xp: i64) -> u8 {
    match xp {
        i64::MIN..=0 => 0,
        1..=10 => 1,
        11..=30 => 2,
        31..=60 => 3,
        _ => 4,
    }
}

/// Exactly `days` cells ending at `today`, ascending, zero-filled.
pub fn heatmap(rows: &[ActivityRow], today: NaiveDate, days: i64) -> Vec<HeatmapCell> {
    let days = days.max(0);
    let start = today - Duration::days(days - 1);

    let mut by_date: BTreeMap<NaiveDate, (i64, i64, i64)> = BTreeMap::new();
    for row in rows.iter().filter(|row| row.date >= start && row.date <= today) {
        let entry = by_date.entry(row.date).or_insert((0, 0, 0));
        entry.0 += row.xp_gained;
        entry.1 += row.lessons_completed;
        entry.2 += row.time_spent_minutes;
    }

    (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let (xp, lessons, minutes) = by_date.get(&date).copied().unwrap_or((0, 0, 0));
            HeatmapCell {
                date,
                xp,
                lessons,
                minutes,
                intensity: intensity(xp),
            }
        })
        .collect()
}

pub fn overview(rows: &[ActivityRow], today: NaiveDate, period: Period) -> Overview {
    let in_window = within(rows, period.window_start(today), today);

    let recent_start = today - Duration::days(6);
    let recent_xp = daily_xp(&in_window)
        .into_iter()
        .filter(|point| point.date >= recent_start)
        .collect();

    Overview {
        period,
        total_xp: total_xp(&in_window),
        time: time_stats(&in_window),
        streak: streak_info(rows, today),
        languages: language_totals(&in_window),
        recent_xp,
    }
}
