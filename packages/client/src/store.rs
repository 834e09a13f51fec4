use std::path::{Path, PathBuf};

use common::contest::ContestSnapshot;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::session::Session;

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";
pub const USER_ID_KEY: &str = "userId";
pub const CURRENT_CONTEST_KEY: &str = "currentContest";

/// File-backed key/value store for the session and the contest handoff.
///
/// The whole map is rewritten on every change through a temporary file and a
/// rename, so readers never see a half-written store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(ClientError::Storage(e.to_string())),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ClientError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    async fn save(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Storage(e.to_string()))?;
        }

        let data = serde_json::to_vec_pretty(map).map_err(|e| ClientError::Storage(e.to_string()))?;
        let temp_path = self.path.with_extension("tmp");
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(ClientError::Storage(e.to_string()));
        }
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(ClientError::Storage(e.to_string()));
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load().await?.remove(key).filter(|v| !v.is_null()))
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(&map).await?;
        debug!(key, path = %self.path.display(), "Stored value");
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }

    /// Read the session written at login. Missing keys leave fields empty.
    pub async fn session(&self) -> Result<Session> {
        let map = self.load().await?;
        let string = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        let user_id = map.get(USER_ID_KEY).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        Ok(Session {
            token: string(TOKEN_KEY),
            username: string(USERNAME_KEY),
            user_id,
        })
    }

    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let mut map = self.load().await?;
        let mut put = |key: &str, value: Option<Value>| match value {
            Some(value) => {
                map.insert(key.to_string(), value);
            }
            None => {
                map.remove(key);
            }
        };
        put(TOKEN_KEY, session.token.clone().map(Value::from));
        put(USERNAME_KEY, session.username.clone().map(Value::from));
        put(USER_ID_KEY, session.user_id.map(Value::from));
        self.save(&map).await
    }

    /// Contest handed off by the registration flow. The snapshot may be stored
    /// as an object or as a JSON-encoded string.
    pub async fn current_contest(&self) -> Result<Option<ContestSnapshot>> {
        let Some(value) = self.get(CURRENT_CONTEST_KEY).await? else {
            return Ok(None);
        };
        let value = match value {
            Value::String(encoded) => serde_json::from_str(&encoded)
                .map_err(|e| ClientError::Storage(format!("Invalid contest snapshot: {e}")))?,
            other => other,
        };
        Ok(Some(ContestSnapshot::from_raw(&value)))
    }

    pub async fn set_current_contest(&self, snapshot: &ContestSnapshot) -> Result<()> {
        let value =
            serde_json::to_value(snapshot).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.set(CURRENT_CONTEST_KEY, value).await
    }
}
