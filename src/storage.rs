use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Activity, ActivityInterval, Journal};

pub const ACTIVITIES_KEY: &str = "timeTracker_activities";
pub const ACTIVITY_TIMES_KEY: &str = "timeTracker_activityTimes";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record {key} is malformed: {source}")]
    JsonDecode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record {key}: {source}")]
    JsonEncode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Key/value persistence holding the two fixed records.
pub trait RecordStore {
    fn read_record(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces every given record. When the write fails, the records that
    /// were already replaced are put back to their previous content.
    fn write_records(&mut self, records: &[(&'static str, String)]) -> Result<(), StorageError>;
}

/// One `<key>.json` file per record inside a state directory.
#[derive(Debug, Clone)]
pub struct FileRecords {
    dir: PathBuf,
}

impl FileRecords {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn staging_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{key}.json.tmp"))
    }
}

impl RecordStore for FileRecords {
    fn read_record(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.record_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn write_records(&mut self, records: &[(&'static str, String)]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut staged: Vec<StagedRecord> = Vec::with_capacity(records.len());
        for (key, content) in records {
            let path = self.staging_path(key);
            if let Err(err) = write_file(&path, content) {
                let _ = fs::remove_file(&path);
                for record in &staged {
                    let _ = fs::remove_file(&record.staging);
                }
                return Err(err);
            }
            staged.push(StagedRecord {
                staging: path,
                target: self.record_path(key),
                previous: self.read_record(key),
            });
        }

        for (index, record) in staged.iter().enumerate() {
            if let Err(source) = fs::rename(&record.staging, &record.target) {
                for pending in &staged[index..] {
                    let _ = fs::remove_file(&pending.staging);
                }
                for applied in staged[..index].iter().rev() {
                    applied.restore();
                }
                return Err(StorageError::Io {
                    path: record.target.clone(),
                    source,
                });
            }
            debug!("wrote record {}", record.target.display());
        }

        Ok(())
    }
}

struct StagedRecord {
    staging: PathBuf,
    target: PathBuf,
    previous: Result<Option<String>, StorageError>,
}

impl StagedRecord {
    fn restore(&self) {
        let restored = match &self.previous {
            Ok(Some(content)) => write_file(&self.target, content),
            Ok(None) => fs::remove_file(&self.target).map_err(|source| StorageError::Io {
                path: self.target.clone(),
                source,
            }),
            Err(err) => {
                warn!("previous content of {} was unreadable: {err}", self.target.display());
                return;
            }
        };
        if let Err(err) = restored {
            warn!("could not roll back {}: {err}", self.target.display());
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

/// Loads both records, falling back to empty defaults when a record is
/// missing, unreadable or malformed.
pub fn load_journal<R: RecordStore + ?Sized>(records: &R) -> Journal {
    Journal {
        activities: read_or_default::<Vec<Activity>, _>(records, ACTIVITIES_KEY),
        days: read_or_default::<BTreeMap<String, Vec<ActivityInterval>>, _>(
            records,
            ACTIVITY_TIMES_KEY,
        ),
    }
}

/// Loads both records, failing when one of them exists but cannot be read or
/// decoded. Mutations start from this so a broken record is never replaced by
/// a rewrite of its empty default.
pub fn load_journal_strict<R: RecordStore + ?Sized>(records: &R) -> Result<Journal, StorageError> {
    Ok(Journal {
        activities: read_record_as(records, ACTIVITIES_KEY)?,
        days: read_record_as(records, ACTIVITY_TIMES_KEY)?,
    })
}

fn read_or_default<T, R>(records: &R, key: &'static str) -> T
where
    T: DeserializeOwned + Default,
    R: RecordStore + ?Sized,
{
    read_record_as(records, key).unwrap_or_else(|err| {
        warn!("record {key} is unusable, using empty default: {err}");
        T::default()
    })
}

fn read_record_as<T, R>(records: &R, key: &'static str) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
    R: RecordStore + ?Sized,
{
    let Some(raw) = records.read_record(key)? else {
        return Ok(T::default());
    };
    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).map_err(|source| StorageError::JsonDecode { key, source })
}

pub fn encode_activities(activities: &[Activity]) -> Result<(&'static str, String), StorageError> {
    encode(ACTIVITIES_KEY, activities)
}

pub fn encode_days(
    days: &BTreeMap<String, Vec<ActivityInterval>>,
) -> Result<(&'static str, String), StorageError> {
    encode(ACTIVITY_TIMES_KEY, days)
}

fn encode<T: Serialize + ?Sized>(key: &'static str, value: &T) -> Result<(&'static str, String), StorageError> {
    serde_json::to_string(value)
        .map(|content| (key, content))
        .map_err(|source| StorageError::JsonEncode { key, source })
}

/// In-process records, used by tests in place of the state directory.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryRecords {
    records: std::collections::HashMap<String, String>,
    unavailable: bool,
}

#[cfg(test)]
impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            records: Default::default(),
            unavailable: true,
        }
    }

    pub fn with_record(mut self, key: &str, content: &str) -> Self {
        self.records.insert(key.to_string(), content.to_string());
        self
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Io {
                path: PathBuf::from(":memory:"),
                source: std::io::Error::new(ErrorKind::PermissionDenied, "records are offline"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
impl RecordStore for MemoryRecords {
    fn read_record(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.records.get(key).cloned())
    }

    fn write_records(&mut self, records: &[(&'static str, String)]) -> Result<(), StorageError> {
        self.check_available()?;
        for (key, content) in records {
            self.records.insert((*key).to_string(), content.clone());
        }
        Ok(())
    }
}
