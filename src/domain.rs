use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

const ID_LEN: usize = 8;
const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Id of the virtual activity that absorbs every untracked minute of a day.
pub const UNKNOWN_ACTIVITY_ID: &str = "unknown";
pub const UNKNOWN_ACTIVITY_LABEL: &str = "Unknown (Unallocated)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    More,
    Less,
    Neutral,
}

impl GoalType {
    pub const ALL: [GoalType; 3] = [GoalType::More, GoalType::Less, GoalType::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::More => "more",
            GoalType::Less => "less",
            GoalType::Neutral => "neutral",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            GoalType::More => "More is better",
            GoalType::Less => "Less is better",
            GoalType::Neutral => "Neutral",
        }
    }
}

impl Display for GoalType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        GoalType::ALL
            .into_iter()
            .find(|goal_type| goal_type.as_str() == raw.trim())
            .ok_or_else(|| format!("unknown goal type `{raw}` (expected more, less or neutral)"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub label: String,
    /// Daily target in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_goal: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_type: Option<GoalType>,
}

impl Activity {
    pub fn new(label: impl Into<String>, goal: Option<(u32, GoalType)>) -> Self {
        Self {
            id: generate_id(),
            label: label.into(),
            time_goal: goal.map(|(minutes, _)| minutes),
            goal_type: goal.map(|(_, goal_type)| goal_type),
        }
    }

    pub fn goal(&self) -> Option<(u32, GoalType)> {
        match (self.time_goal, self.goal_type) {
            (Some(minutes), Some(goal_type)) => Some((minutes, goal_type)),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.id.trim().is_empty() {
            return Err(TrackerError::validation("id", "must not be empty"));
        }
        if self.id == UNKNOWN_ACTIVITY_ID {
            return Err(TrackerError::validation(
                "id",
                format!("`{UNKNOWN_ACTIVITY_ID}` is reserved"),
            ));
        }
        if self.label.trim().is_empty() {
            return Err(TrackerError::validation("label", "must not be empty"));
        }
        if self.time_goal.is_some() != self.goal_type.is_some() {
            return Err(TrackerError::validation(
                "goalType",
                "must be set exactly when timeGoal is set",
            ));
        }
        if self.time_goal == Some(0) {
            return Err(TrackerError::validation("timeGoal", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInterval {
    pub activity_id: String,
    /// Epoch milliseconds.
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl ActivityInterval {
    pub fn open(activity_id: impl Into<String>, start_time: i64) -> Self {
        Self {
            activity_id: activity_id.into(),
            start_time,
            end_time: None,
        }
    }

    #[cfg(test)]
    pub fn closed(activity_id: impl Into<String>, start_time: i64, end_time: i64) -> Self {
        Self {
            activity_id: activity_id.into(),
            start_time,
            end_time: Some(end_time),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Length in minutes; an open interval runs until `now_ms`.
    pub fn minutes_until(&self, now_ms: i64) -> f64 {
        self.end_time.unwrap_or(now_ms).saturating_sub(self.start_time) as f64 / 60_000.0
    }
}

/// The id of the activity currently being tracked in a day's interval list.
pub fn active_activity(intervals: &[ActivityInterval]) -> &str {
    match intervals.last() {
        Some(interval) if interval.is_open() => interval.activity_id.as_str(),
        _ => UNKNOWN_ACTIVITY_ID,
    }
}

/// In-memory image of both persisted records: the activity catalog and the
/// per-day interval lists keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    pub activities: Vec<Activity>,
    pub days: BTreeMap<String, Vec<ActivityInterval>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.id == id)
    }

    pub fn day(&self, day_key: &str) -> &[ActivityInterval] {
        self.days.get(day_key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn add_activity(&mut self, activity: Activity) -> Result<(), TrackerError> {
        activity.validate()?;
        if self.activity(&activity.id).is_some() {
            return Err(TrackerError::validation(
                "id",
                format!("activity {} already exists", activity.id),
            ));
        }

        self.activities.push(activity);
        Ok(())
    }

    pub fn update_activity(&mut self, id: &str, mut updated: Activity) -> Result<(), TrackerError> {
        updated.id = id.to_string();
        let slot = self
            .activities
            .iter_mut()
            .find(|activity| activity.id == id)
            .ok_or_else(|| TrackerError::not_found(id))?;
        updated.validate()?;
        *slot = updated;
        Ok(())
    }

    /// Removes the activity and every interval that references it. Days left
    /// without intervals are dropped. Returns the number of purged intervals.
    pub fn remove_activity(&mut self, id: &str) -> Result<usize, TrackerError> {
        let index = self
            .activities
            .iter()
            .position(|activity| activity.id == id)
            .ok_or_else(|| TrackerError::not_found(id))?;
        self.activities.remove(index);

        let mut purged = 0;
        for intervals in self.days.values_mut() {
            let before = intervals.len();
            intervals.retain(|interval| interval.activity_id != id);
            purged += before - intervals.len();
        }
        self.days.retain(|_, intervals| !intervals.is_empty());

        Ok(purged)
    }

    /// Closes the open interval of the day, if any, at `start_time` and opens a
    /// new one for `activity_id`. Switching to the unknown activity only closes.
    pub fn record_switch(
        &mut self,
        day_key: &str,
        activity_id: &str,
        start_time: i64,
    ) -> Result<(), TrackerError> {
        let tracked = activity_id != UNKNOWN_ACTIVITY_ID;
        if tracked && self.activity(activity_id).is_none() {
            return Err(TrackerError::not_found(activity_id));
        }

        let intervals = self.days.entry(day_key.to_string()).or_default();
        if let Some(last) = intervals.last_mut() {
            if last.is_open() {
                last.end_time = Some(start_time);
            }
        }

        if tracked {
            intervals.push(ActivityInterval::open(activity_id, start_time));
        } else if intervals.is_empty() {
            self.days.remove(day_key);
        }

        Ok(())
    }
}

pub fn day_key(day: NaiveDate) -> String {
    day.format(DAY_KEY_FORMAT).to_string()
}

pub fn parse_day_key(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_KEY_FORMAT)
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Renders fractional minutes as `HH:MM:SS`.
pub fn format_minutes(minutes: f64) -> String {
    let total_seconds = (minutes * 60.0).floor().max(0.0) as i64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::error::TrackerError;

    use super::{
        Activity, ActivityInterval, GoalType, Journal, UNKNOWN_ACTIVITY_ID, active_activity,
        day_key, format_minutes, parse_day_key,
    };

    const DAY: &str = "2026-01-01";

    fn journal_with(labels: &[&str]) -> (Journal, Vec<String>) {
        let mut journal = Journal::new();
        let mut ids = Vec::new();
        for label in labels {
            let activity = Activity::new(*label, None);
            ids.push(activity.id.clone());
            journal.add_activity(activity).expect("activity should be valid");
        }
        (journal, ids)
    }

    #[test]
    fn rejects_goal_without_goal_type() {
        let mut activity = Activity::new("Reading", None);
        activity.time_goal = Some(30);
        let err = activity.validate().expect_err("mismatch should fail");
        assert!(matches!(err, TrackerError::Validation { field: "goalType", .. }));

        activity.time_goal = None;
        activity.goal_type = Some(GoalType::More);
        assert!(activity.validate().is_err());
    }

    #[test]
    fn rejects_blank_label_and_reserved_id() {
        assert!(Activity::new("   ", None).validate().is_err());

        let mut journal = Journal::new();
        let mut activity = Activity::new("Sneaky", None);
        activity.id = UNKNOWN_ACTIVITY_ID.to_string();
        assert!(journal.add_activity(activity).is_err());
        assert!(journal.activities.is_empty());
    }

    #[test]
    fn update_keeps_original_id() {
        let (mut journal, ids) = journal_with(&["Work"]);
        let mut replacement = Activity::new("Deep work", Some((120, GoalType::More)));
        replacement.id = "other".to_string();

        journal
            .update_activity(&ids[0], replacement)
            .expect("update should work");

        let stored = journal.activity(&ids[0]).expect("activity should remain");
        assert_eq!(stored.label, "Deep work");
        assert_eq!(stored.goal(), Some((120, GoalType::More)));
        assert!(journal.activity("other").is_none());
    }

    #[test]
    fn update_of_missing_activity_is_not_found() {
        let mut journal = Journal::new();
        let err = journal
            .update_activity("missing", Activity::new("x", None))
            .expect_err("update should fail");
        assert!(matches!(err, TrackerError::NotFound { .. }));
    }

    #[test]
    fn switching_closes_previous_interval() {
        let (mut journal, ids) = journal_with(&["A", "B"]);
        journal.record_switch(DAY, &ids[0], 1_000).expect("switch to A");
        journal.record_switch(DAY, &ids[1], 5_000).expect("switch to B");

        let day = journal.day(DAY);
        assert_eq!(
            day,
            &[
                ActivityInterval::closed(ids[0].clone(), 1_000, 5_000),
                ActivityInterval::open(ids[1].clone(), 5_000),
            ]
        );
        assert_eq!(day.iter().filter(|interval| interval.is_open()).count(), 1);
        assert_eq!(active_activity(day), ids[1]);
    }

    #[test]
    fn switching_to_unknown_only_closes() {
        let (mut journal, ids) = journal_with(&["A"]);
        journal.record_switch(DAY, &ids[0], 0).expect("switch to A");
        journal
            .record_switch(DAY, UNKNOWN_ACTIVITY_ID, 60_000)
            .expect("switch to unknown");

        assert_eq!(journal.day(DAY), &[ActivityInterval::closed(ids[0].clone(), 0, 60_000)]);
        assert_eq!(active_activity(journal.day(DAY)), UNKNOWN_ACTIVITY_ID);

        journal
            .record_switch("2026-01-02", UNKNOWN_ACTIVITY_ID, 0)
            .expect("switch on empty day");
        assert!(!journal.days.contains_key("2026-01-02"));
    }

    #[test]
    fn switching_to_missing_activity_changes_nothing() {
        let (mut journal, ids) = journal_with(&["A"]);
        journal.record_switch(DAY, &ids[0], 0).expect("switch to A");
        let before = journal.clone();

        let err = journal
            .record_switch(DAY, "ghost", 10)
            .expect_err("ghost should be rejected");
        assert!(matches!(err, TrackerError::NotFound { .. }));
        assert_eq!(journal, before);
    }

    #[test]
    fn removing_activity_purges_every_day() {
        let (mut journal, ids) = journal_with(&["A", "B"]);
        journal.record_switch("2026-01-01", &ids[0], 0).expect("switch");
        journal.record_switch("2026-01-01", &ids[1], 10).expect("switch");
        journal.record_switch("2026-01-02", &ids[0], 20).expect("switch");

        let purged = journal.remove_activity(&ids[0]).expect("remove should work");

        assert_eq!(purged, 2);
        assert!(journal.activity(&ids[0]).is_none());
        assert_eq!(journal.day("2026-01-01"), &[ActivityInterval::open(ids[1].clone(), 10)]);
        assert!(!journal.days.contains_key("2026-01-02"));
    }

    #[test]
    fn formats_fractional_minutes() {
        assert_eq!(format_minutes(0.0), "00:00:00");
        assert_eq!(format_minutes(90.5), "01:30:30");
        assert_eq!(format_minutes(-3.0), "00:00:00");
    }

    #[test]
    fn day_keys_use_calendar_date() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(day_key(day), "2026-03-09");
        assert_eq!(parse_day_key("2026-03-09").unwrap(), day);
        assert!(parse_day_key("09/03/2026").is_err());
    }

    #[test]
    fn goal_type_parses_wire_names() {
        assert_eq!("less".parse::<GoalType>(), Ok(GoalType::Less));
        assert!("sometimes".parse::<GoalType>().is_err());
        let json = serde_json::to_string(&Activity {
            id: "a1".to_string(),
            label: "Gym".to_string(),
            time_goal: Some(45),
            goal_type: Some(GoalType::More),
        })
        .unwrap();
        assert_eq!(json, r#"{"id":"a1","label":"Gym","timeGoal":45,"goalType":"more"}"#);
    }
}
