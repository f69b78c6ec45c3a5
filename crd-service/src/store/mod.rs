use fjall::{KeyspaceCreateOptions, PersistMode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::AppError;

/// A key-value pair of raw bytes from a prefix scan.
pub type RawKvPair = (Vec<u8>, Vec<u8>);

/// Local persistent store. The dashboard keeps only its own state here
/// (admin sessions); client records live in the hosted registry.
#[derive(Clone)]
pub struct Store {
    db: fjall::Database,
}

#[derive(Clone)]
pub struct KeyspaceHandle {
    keyspace: fjall::Keyspace,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.data_dir).map_err(AppError::Io)?;

        info!(path = %config.data_dir.display(), "opening store");

        let db = fjall::Database::builder(&config.data_dir).open()?;

        Ok(Self { db })
    }

    pub fn keyspace(&self, name: &str) -> Result<KeyspaceHandle, AppError> {
        let keyspace = self.db.keyspace(name, KeyspaceCreateOptions::default)?;
        Ok(KeyspaceHandle { keyspace })
    }

    pub async fn persist(&self) -> Result<(), AppError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.persist(PersistMode::SyncAll))
            .await
            .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))??;
        Ok(())
    }
}

impl KeyspaceHandle {
    pub async fn insert<V: Serialize>(
        &self,
        key: impl Into<Vec<u8>>,
        value: &V,
    ) -> Result<(), AppError> {
        let key = key.into();
        let bytes = serde_json::to_vec(value)?;
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || ks.insert(key, bytes))
            .await
            .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))??;
        Ok(())
    }

    pub async fn get<V: DeserializeOwned + Send + 'static>(
        &self,
        key: impl Into<Vec<u8>>,
    ) -> Result<Option<V>, AppError> {
        let key = key.into();
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<V>, AppError> {
            match ks.get(key)? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))?
    }

    pub async fn remove(&self, key: impl Into<Vec<u8>>) -> Result<(), AppError> {
        let key = key.into();
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || ks.remove(key))
            .await
            .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))??;
        Ok(())
    }

    pub async fn insert_raw(
        &self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), AppError> {
        let key = key.into();
        let value = value.into();
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || ks.insert(key, value))
            .await
            .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))??;
        Ok(())
    }

    pub async fn get_raw(&self, key: impl Into<Vec<u8>>) -> Result<Option<Vec<u8>>, AppError> {
        let key = key.into();
        let ks = self.keyspace.clone();
        let result = tokio::task::spawn_blocking(move || ks.get(key))
            .await
            .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))??;
        Ok(result.map(|v| v.to_vec()))
    }

    /// Iterate all key-value pairs whose key starts with `prefix`.
    pub async fn prefix_iter_raw(
        &self,
        prefix: impl Into<Vec<u8>>,
    ) -> Result<Vec<RawKvPair>, AppError> {
        let prefix = prefix.into();
        let ks = self.keyspace.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<RawKvPair>, AppError> {
            let mut results = Vec::new();
            for guard in ks.prefix(&prefix) {
                let (key, value) = guard.into_inner()?;
                results.push((key.to_vec(), value.to_vec()));
            }
            Ok(results)
        })
        .await
        .map_err(|e| AppError::Internal(format!("blocking task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Session;

    fn temp_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = StoreConfig {
            data_dir: dir.path().to_path_buf(),
        };
        let store = Store::open(&config).expect("failed to open store");
        (store, dir)
    }

    fn make_session(id: &str) -> Session {
        Session {
            session_id: id.to_string(),
            email: "admin@example.com".to_string(),
            created_at: 1_700_000_000,
            refresh_token: format!("refresh-{id}"),
            refresh_expires_at: 1_700_086_400,
        }
    }

    #[tokio::test]
    async fn test_insert_get_remove_round_trip() {
        let (store, _dir) = temp_store();
        let ks = store.keyspace("sessions").unwrap();

        let session = make_session("s1");
        ks.insert("session:s1", &session).await.unwrap();

        let loaded: Option<Session> = ks.get("session:s1").await.unwrap();
        assert_eq!(loaded.as_ref().map(|s| s.email.as_str()), Some("admin@example.com"));

        ks.remove("session:s1").await.unwrap();
        let gone: Option<Session> = ks.get("session:s1").await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_prefix_iter_scopes_to_prefix() {
        let (store, _dir) = temp_store();
        let ks = store.keyspace("sessions").unwrap();

        for i in 0..3 {
            let session = make_session(&format!("s{i}"));
            ks.insert(format!("session:s{i}"), &session).await.unwrap();
        }
        ks.insert_raw("refresh:tok", b"s0".to_vec()).await.unwrap();

        let raw = ks.prefix_iter_raw("session:").await.unwrap();
        assert_eq!(raw.len(), 3);
        for (_key, value) in &raw {
            let _session: Session = serde_json::from_slice(value).unwrap();
        }
    }

    #[tokio::test]
    async fn test_sessions_survive_persist_and_reopen() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let data_dir = dir.path().to_path_buf();

        {
            let config = StoreConfig {
                data_dir: data_dir.clone(),
            };
            let store = Store::open(&config).unwrap();
            let ks = store.keyspace("sessions").unwrap();
            ks.insert("session:s1", &make_session("s1")).await.unwrap();
            store.persist().await.unwrap();
        }

        {
            let config = StoreConfig { data_dir };
            let store = Store::open(&config).unwrap();
            let ks = store.keyspace("sessions").unwrap();
            let loaded: Option<Session> = ks.get("session:s1").await.unwrap();
            assert!(loaded.is_some(), "session lost across reopen");
        }
    }
}
