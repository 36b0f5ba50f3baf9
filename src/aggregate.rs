use std::collections::HashMap;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::domain::{Activity, ActivityInterval, GoalType, UNKNOWN_ACTIVITY_ID};

pub const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DurationSummary {
    /// Minutes per activity id, always including the unknown bucket.
    pub durations: HashMap<String, f64>,
    pub elapsed_minutes: f64,
    pub total_tracked_minutes: f64,
}

impl DurationSummary {
    pub fn minutes_for(&self, activity_id: &str) -> f64 {
        self.durations.get(activity_id).copied().unwrap_or(0.0)
    }

    pub fn unknown_minutes(&self) -> f64 {
        self.minutes_for(UNKNOWN_ACTIVITY_ID)
    }

    /// Entries ordered by minutes descending, then id.
    pub fn sorted(&self) -> Vec<(String, f64)> {
        let mut rows = self
            .durations
            .iter()
            .map(|(id, minutes)| (id.clone(), *minutes))
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
        rows
    }
}

/// Minutes spent on each activity of a day, attributing whatever part of the
/// elapsed day is not covered by an interval to the unknown activity.
///
/// `now` decides both where open intervals end and, through its time zone,
/// where the reference day starts.
pub fn calculate_durations<Tz: TimeZone>(
    intervals: &[ActivityInterval],
    day: NaiveDate,
    now: &DateTime<Tz>,
) -> DurationSummary {
    let now_ms = now.timestamp_millis();
    let mut durations = tracked_minutes(intervals, now_ms);

    let (day_start, day_end) = day_bounds(&now.timezone(), day);
    let elapsed_ms = now_ms.min(day_end.timestamp_millis()) - day_start.timestamp_millis();
    let elapsed_minutes = (elapsed_ms as f64 / MILLIS_PER_MINUTE).clamp(0.0, MINUTES_PER_DAY);

    let total_tracked_minutes = durations.values().sum::<f64>();
    durations.insert(
        UNKNOWN_ACTIVITY_ID.to_string(),
        (elapsed_minutes - total_tracked_minutes).max(0.0),
    );

    DurationSummary {
        durations,
        elapsed_minutes,
        total_tracked_minutes,
    }
}

fn tracked_minutes(intervals: &[ActivityInterval], now_ms: i64) -> HashMap<String, f64> {
    let mut durations = HashMap::new();
    for interval in intervals {
        if interval.activity_id == UNKNOWN_ACTIVITY_ID {
            continue;
        }
        *durations.entry(interval.activity_id.clone()).or_insert(0.0) += interval.minutes_until(now_ms);
    }
    durations
}

/// Percent of the daily goal reached by `activity` in the given intervals,
/// clamped to `[0, 100]`. Activities without a goal report 0.
pub fn calculate_progress(activity: &Activity, intervals: &[ActivityInterval], now_ms: i64) -> f64 {
    let spent = intervals
        .iter()
        .filter(|interval| interval.activity_id == activity.id)
        .map(|interval| interval.minutes_until(now_ms))
        .sum::<f64>();
    goal_percent(activity, spent).map_or(0.0, |percent| percent.clamp(0.0, 100.0))
}

/// Unclamped percent of the goal covered by `minutes`.
pub fn goal_percent(activity: &Activity, minutes: f64) -> Option<f64> {
    let (goal, _) = activity.goal()?;
    if goal == 0 {
        return None;
    }
    Some(minutes / f64::from(goal) * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    /// A "more" goal that has been reached.
    Met,
    /// A "more" goal still below target.
    Behind,
    /// A "less" goal still below its limit.
    Within,
    /// A "less" goal past its limit.
    Exceeded,
    Neutral,
}

impl GoalStatus {
    pub fn is_good(self) -> Option<bool> {
        match self {
            GoalStatus::Met | GoalStatus::Within => Some(true),
            GoalStatus::Behind | GoalStatus::Exceeded => Some(false),
            GoalStatus::Neutral => None,
        }
    }
}

pub fn goal_status(activity: &Activity, minutes: f64) -> Option<GoalStatus> {
    let (_, goal_type) = activity.goal()?;
    let reached = goal_percent(activity, minutes)? >= 100.0;
    Some(match (goal_type, reached) {
        (GoalType::More, true) => GoalStatus::Met,
        (GoalType::More, false) => GoalStatus::Behind,
        (GoalType::Less, true) => GoalStatus::Exceeded,
        (GoalType::Less, false) => GoalStatus::Within,
        (GoalType::Neutral, _) => GoalStatus::Neutral,
    })
}

/// Local midnight of `day` and of the following day in `tz`.
pub fn day_bounds<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> (DateTime<Tz>, DateTime<Tz>) {
    let next_day = day.succ_opt().unwrap_or(day);
    (
        resolve_local(tz, day.and_time(NaiveTime::MIN)),
        resolve_local(tz, next_day.and_time(NaiveTime::MIN)),
    )
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut cursor = naive;
    for _ in 0..=120 {
        match tz.from_local_datetime(&cursor) {
            LocalResult::Single(datetime) => return datetime,
            LocalResult::Ambiguous(first, second) => return first.min(second),
            LocalResult::None => cursor += Duration::minutes(1),
        }
    }

    tz.from_utc_datetime(&naive)
}
