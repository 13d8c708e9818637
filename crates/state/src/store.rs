use std::path::{Path, PathBuf};

use {
    serde::{Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
    tokio::{fs, sync::Mutex},
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

type Object = Map<String, Value>;

/// Single-file JSON key-value store.
///
/// One store-wide lock is held for the whole read-modify-write span of every
/// operation, so [`StateStore::update`] is atomic against any concurrent call.
pub struct StateStore {
    path: PathBuf,
    data: Mutex<Object>,
}

impl StateStore {
    /// Open (or create) the store at `path`. The parent directory is created if
    /// absent. A corrupt file falls back to its `.bak` copy when one can be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }

        let data = match read_object(&path).await {
            Ok(Some(obj)) => obj,
            Ok(None) => Object::new(),
            Err(e) => {
                let bak = backup_path(&path);
                match read_object(&bak).await {
                    Ok(Some(obj)) => {
                        warn!(path = %path.display(), error = %e, "state file unreadable, restored from backup");
                        obj
                    },
                    _ => return Err(e),
                }
            },
        };
        debug!(path = %path.display(), keys = data.len(), "state store opened");

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value stored under `key`.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        self.data.lock().await.get(key).cloned()
    }

    /// Typed value stored under `key`, or `default` when absent or of the
    /// wrong shape.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get_value(key).await {
            Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
                warn!(key, error = %e, "state value has unexpected shape, using default");
                default
            }),
            None => default,
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut data = self.data.lock().await;
        let previous = data.insert(key.to_string(), value);
        self.persist_or_revert(&mut data, key, previous).await
    }

    /// Apply `updater` to the current value (or `None`) and store the result.
    /// Returns the stored value.
    pub async fn update<F>(&self, key: &str, updater: F) -> Result<Value>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let mut data = self.data.lock().await;
        let next = updater(data.get(key));
        let previous = data.insert(key.to_string(), next.clone());
        self.persist_or_revert(&mut data, key, previous).await?;
        Ok(next)
    }

    /// Add `by` to an integer counter, treating a missing or non-integer value
    /// as zero.
    pub async fn increment(&self, key: &str, by: i64) -> Result<i64> {
        let next = self
            .update(key, |cur| {
                Value::from(cur.and_then(Value::as_i64).unwrap_or(0).saturating_add(by))
            })
            .await?;
        Ok(next.as_i64().unwrap_or(0))
    }

    async fn persist_or_revert(
        &self,
        data: &mut Object,
        key: &str,
        previous: Option<Value>,
    ) -> Result<()> {
        if let Err(e) = self.write(data).await {
            match previous {
                Some(v) => data.insert(key.to_string(), v),
                None => data.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn write(&self, data: &Object) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::io(&tmp, e))?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &bak).await {
                debug!(path = %bak.display(), error = %e, "could not refresh state backup");
            }
        }

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::io(&self.path, e))
    }
}

fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("json.bak")
}

async fn read_object(path: &Path) -> Result<Option<Object>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Some(Object::new()));
    }
    match serde_json::from_slice::<Value>(&raw)? {
        Value::Object(obj) => Ok(Some(obj)),
        _ => Err(Error::Corrupt {
            path: path.to_path_buf(),
        }),
    }
}
