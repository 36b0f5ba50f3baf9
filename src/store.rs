use tracing::{debug, info};

use crate::domain::{Activity, ActivityInterval, Journal, UNKNOWN_ACTIVITY_ID, active_activity};
use crate::error::TrackerError;
use crate::storage::{RecordStore, encode_activities, encode_days, load_journal, load_journal_strict};

/// Operations over the activity catalog and the daily interval log.
///
/// Implementations assume a single reader/writer: nothing guards against
/// another process writing the same records in between two calls.
pub trait ActivityStore {
    fn list_activities(&self) -> Vec<Activity>;

    fn create_activity(&mut self, activity: Activity) -> Result<(), TrackerError>;

    fn get_activity(&self, id: &str) -> Option<Activity>;

    fn update_activity(&mut self, id: &str, updated: Activity) -> Result<(), TrackerError>;

    /// Removes the activity together with all of its intervals on every day.
    fn delete_activity(&mut self, id: &str) -> Result<(), TrackerError>;

    fn record_switch(
        &mut self,
        day_key: &str,
        activity_id: &str,
        start_time: i64,
    ) -> Result<(), TrackerError>;

    fn day_intervals(&self, day_key: &str) -> Vec<ActivityInterval>;
}

/// Store that re-reads its records on every call and writes back each
/// mutation before returning.
#[derive(Debug, Clone)]
pub struct ActivityLog<R> {
    records: R,
}

impl<R: RecordStore> ActivityLog<R> {
    pub fn new(records: R) -> Self {
        Self { records }
    }

    pub fn snapshot(&self) -> Journal {
        load_journal(&self.records)
    }

    /// Journal that mutations build on. Unlike `snapshot`, an unreadable or
    /// malformed record is an error, so it never gets overwritten.
    fn load_for_write(&self) -> Result<Journal, TrackerError> {
        Ok(load_journal_strict(&self.records)?)
    }

    /// Both records as pretty-printed JSON, for the debug view.
    pub fn raw_records(&self) -> (String, String) {
        let journal = self.snapshot();
        let activities = serde_json::to_string_pretty(&journal.activities).unwrap_or_default();
        let days = serde_json::to_string_pretty(&journal.days).unwrap_or_default();
        (activities, days)
    }

    fn persist_activities(&mut self, journal: &Journal) -> Result<(), TrackerError> {
        self.records
            .write_records(&[encode_activities(&journal.activities)?])?;
        Ok(())
    }

    fn persist_days(&mut self, journal: &Journal) -> Result<(), TrackerError> {
        self.records.write_records(&[encode_days(&journal.days)?])?;
        Ok(())
    }
}

impl<R: RecordStore> ActivityStore for ActivityLog<R> {
    fn list_activities(&self) -> Vec<Activity> {
        self.snapshot().activities
    }

    fn create_activity(&mut self, activity: Activity) -> Result<(), TrackerError> {
        let mut journal = self.load_for_write()?;
        let id = activity.id.clone();
        journal.add_activity(activity)?;
        self.persist_activities(&journal)?;
        info!(activity = %id, "created activity");
        Ok(())
    }

    fn get_activity(&self, id: &str) -> Option<Activity> {
        self.snapshot().activity(id).cloned()
    }

    fn update_activity(&mut self, id: &str, updated: Activity) -> Result<(), TrackerError> {
        let mut journal = self.load_for_write()?;
        journal.update_activity(id, updated)?;
        self.persist_activities(&journal)?;
        info!(activity = %id, "updated activity");
        Ok(())
    }

    fn delete_activity(&mut self, id: &str) -> Result<(), TrackerError> {
        let mut journal = self.load_for_write()?;
        let purged = journal.remove_activity(id)?;
        self.records.write_records(&[
            encode_activities(&journal.activities)?,
            encode_days(&journal.days)?,
        ])?;
        info!(activity = %id, purged, "deleted activity");
        Ok(())
    }

    fn record_switch(
        &mut self,
        day_key: &str,
        activity_id: &str,
        start_time: i64,
    ) -> Result<(), TrackerError> {
        let mut journal = self.load_for_write()?;
        journal.record_switch(day_key, activity_id, start_time)?;
        self.persist_days(&journal)?;
        debug!(day = day_key, activity = activity_id, start_time, "recorded switch");
        Ok(())
    }

    fn day_intervals(&self, day_key: &str) -> Vec<ActivityInterval> {
        self.snapshot().day(day_key).to_vec()
    }
}

/// Switches to `requested`, or to the unknown activity when `requested` is
/// already the one being tracked. Returns the id that is active afterwards.
pub fn toggle_activity<S: ActivityStore + ?Sized>(
    store: &mut S,
    day_key: &str,
    requested: &str,
    now_ms: i64,
) -> Result<String, TrackerError> {
    let intervals = store.day_intervals(day_key);
    let target = if active_activity(&intervals) == requested {
        UNKNOWN_ACTIVITY_ID
    } else {
        requested
    };

    store.record_switch(day_key, target, now_ms)?;
    Ok(target.to_string())
}
