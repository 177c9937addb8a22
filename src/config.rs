use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{AlarmRecord, TIME_FORMAT},
    error::ConfigError,
};

const APP_NAME: &str = "openshock_clock";
const ALARMS_FILE: &str = "alarms.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";

/// where the alarm and credential files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// the per user config directory, e.g. `~/.config/openshock_clock`
    pub fn default_location() -> Result<Self, ConfigError> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| Self::new(dirs.config_dir()))
            .ok_or(ConfigError::NoConfigDir)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn alarms_path(&self) -> PathBuf {
        self.root.join(ALARMS_FILE)
    }

    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    pub fn create(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))
    }

    #[must_use]
    pub fn alarm_store(&self) -> AlarmStore {
        AlarmStore::new(self.alarms_path())
    }

    #[must_use]
    pub fn credential_source(&self) -> CredentialSource {
        CredentialSource::new(self.credentials_path())
    }
}

/// an alarm as it is written to disk, every value is a string
#[derive(Debug, Serialize, Deserialize)]
struct AlarmSection {
    time: String,
    intensity: String,
    duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vibrate_before: Option<String>,
}

impl From<&AlarmRecord> for AlarmSection {
    fn from(record: &AlarmRecord) -> Self {
        Self {
            time: record.fire_at.format(TIME_FORMAT).to_string(),
            intensity: record.intensity.to_string(),
            duration: record.duration_ms.to_string(),
            vibrate_before: Some(String::from(if record.vibrate_before {
                "True"
            } else {
                "False"
            })),
        }
    }
}

impl AlarmSection {
    fn into_record(self, name: &str) -> Result<AlarmRecord, ConfigError> {
        let bad = |field, reason: String| ConfigError::Section {
            name: name.to_string(),
            field,
            reason,
        };
        let fire_at = NaiveDateTime::parse_from_str(self.time.trim(), TIME_FORMAT)
            .map_err(|e| bad("time", format!("{:?}: {e}", self.time)))?;
        let intensity = self
            .intensity
            .trim()
            .parse()
            .map_err(|e| bad("intensity", format!("{:?}: {e}", self.intensity)))?;
        let duration_ms = self
            .duration
            .trim()
            .parse()
            .map_err(|e| bad("duration", format!("{:?}: {e}", self.duration)))?;
        let vibrate_before = match self.vibrate_before {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| bad("vibrate_before", format!("{value:?} is not a boolean")))?,
            None => false,
        };
        Ok(AlarmRecord::new(fire_at, intensity, duration_ms, vibrate_before))
    }
}

/// accepts the same spellings as an ini file would
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// The saved alarms, keyed by name.
///
/// Clones share one lock, every change is a load, mutate, write-whole cycle
/// done while holding it.
#[derive(Debug, Clone)]
pub struct AlarmStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl AlarmStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.path.exists()
    }

    /// every alarm on disk, a missing file is an empty store
    pub fn list_all(&self) -> Result<BTreeMap<String, AlarmRecord>, ConfigError> {
        let _guard = self.guard();
        self.read()
    }

    pub fn get(&self, name: &str) -> Result<Option<AlarmRecord>, ConfigError> {
        Ok(self.list_all()?.remove(name))
    }

    /// insert the alarm or overwrite the one with the same name
    pub fn upsert(&self, name: &str, record: &AlarmRecord) -> Result<(), ConfigError> {
        let _guard = self.guard();
        let mut alarms = self.read()?;
        alarms.insert(name.to_string(), record.clone());
        self.write(&alarms)?;
        debug!("saved alarm {name} at {}", record.fire_at);
        Ok(())
    }

    /// move an alarm to a new name in a single write
    pub fn rename(&self, old: &str, new: &str, record: &AlarmRecord) -> Result<(), ConfigError> {
        let _guard = self.guard();
        let mut alarms = self.read()?;
        if alarms.remove(old).is_none() {
            return Err(ConfigError::AlarmNotFound(old.to_string()));
        }
        alarms.insert(new.to_string(), record.clone());
        self.write(&alarms)?;
        debug!("renamed alarm {old} to {new}");
        Ok(())
    }

    /// returns false if there was no alarm with that name
    pub fn delete(&self, name: &str) -> Result<bool, ConfigError> {
        let _guard = self.guard();
        let mut alarms = self.read()?;
        if alarms.remove(name).is_none() {
            return Ok(false);
        }
        self.write(&alarms)?;
        debug!("deleted alarm {name}");
        Ok(true)
    }

    /// Moves a fired alarm to its next occurrence.
    ///
    /// Only applies if the stored alarm still has the time that was fired, so
    /// an alarm the user deleted or rescheduled in the meantime is left alone.
    /// Returns the record that was written.
    pub fn advance(
        &self,
        name: &str,
        fired: &AlarmRecord,
    ) -> Result<Option<AlarmRecord>, ConfigError> {
        let _guard = self.guard();
        let mut alarms = self.read()?;
        let Some(stored) = alarms.get_mut(name) else {
            return Ok(None);
        };
        if stored.fire_at != fired.fire_at {
            return Ok(None);
        }
        *stored = stored.next_occurrence();
        let next = stored.clone();
        self.write(&alarms)?;
        Ok(Some(next))
    }

    /// write an empty store, replacing whatever is there
    pub fn reset(&self) -> Result<(), ConfigError> {
        let _guard = self.guard();
        self.write(&BTreeMap::new())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // the lock guards no data, so a poisoned lock is still usable
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<BTreeMap<String, AlarmRecord>, ConfigError> {
        let Some(text) = read_if_present(&self.path)? else {
            return Ok(BTreeMap::new());
        };
        let sections: BTreeMap<String, AlarmSection> =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        sections
            .into_iter()
            .map(|(name, section)| section.into_record(&name).map(|record| (name, record)))
            .collect()
    }

    fn write(&self, alarms: &BTreeMap<String, AlarmRecord>) -> Result<(), ConfigError> {
        let sections: BTreeMap<&str, AlarmSection> = alarms
            .iter()
            .map(|(name, record)| (name.as_str(), AlarmSection::from(record)))
            .collect();
        write_whole(&self.path, &toml::to_string(&sections)?)
    }
}

/// what is needed to call the trigger API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    /// id of the shocker the commands go to
    pub shocker_id: String,
}

impl Credentials {
    #[must_use]
    pub fn new(api_key: impl Into<String>, shocker_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            shocker_id: shocker_id.into(),
        }
    }

    /// the api key with every character replaced by `*`
    #[must_use]
    pub fn masked_key(&self) -> String {
        "*".repeat(self.api_key.chars().count())
    }
}

// keep the api key out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.masked_key())
            .field("shocker_id", &self.shocker_id)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "SHOCK_API_KEY", default)]
    api_key: Option<String>,
    #[serde(rename = "SHOCK_ID", default)]
    shocker_id: Option<String>,
}

/// the single saved set of credentials
#[derive(Debug, Clone)]
pub struct CredentialSource {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CredentialSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::default(),
        }
    }

    /// whether setup has been done at least once
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// `None` until both the key and the shocker id have been set
    pub fn load(&self) -> Result<Option<Credentials>, ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(text) = read_if_present(&self.path)? else {
            return Ok(None);
        };
        let file: CredentialsFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(match (file.api_key, file.shocker_id) {
            (Some(api_key), Some(shocker_id)) if !api_key.is_empty() && !shocker_id.is_empty() => {
                Some(Credentials::new(api_key, shocker_id))
            }
            _ => None,
        })
    }

    /// overwrite the saved credentials
    pub fn save(&self, credentials: &Credentials) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = CredentialsFile {
            api_key: Some(credentials.api_key.clone()),
            shocker_id: Some(credentials.shocker_id.clone()),
        };
        write_whole(&self.path, &toml::to_string(&file)?)?;
        debug!(
            "saved credentials: api key {}, shocker id {}",
            credentials.masked_key(),
            credentials.shocker_id
        );
        Ok(())
    }
}

/// run file access on tokio's blocking pool instead of an async worker
pub async fn blocking<T, F>(f: F) -> Result<T, ConfigError>
where
    F: FnOnce() -> Result<T, ConfigError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_if_present(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path)(e)),
    }
}

/// writes to a sibling file and renames it over the old one,
/// so a reader sees either the old contents or the new ones
fn write_whole(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = path.with_extension("toml.tmp");
    let mut file = File::create(&tmp).map_err(io_error(&tmp))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))
}
