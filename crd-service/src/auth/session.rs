use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::store::KeyspaceHandle;

/// An authenticated admin session stored under `session:{session_id}`.
///
/// Password login authenticates in one round trip, so there is no
/// intermediate challenge state; a stored session is a live one until
/// its refresh token expires or it is revoked by sign-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub email: String,
    pub created_at: u64,
    pub refresh_token: String,
    pub refresh_expires_at: u64,
}

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

fn refresh_key(token: &str) -> String {
    format!("refresh:{token}")
}

/// Store a new session and its refresh-token reverse index.
pub async fn store_session(sessions: &KeyspaceHandle, session: &Session) -> Result<(), AppError> {
    sessions
        .insert(session_key(&session.session_id), session)
        .await?;
    sessions
        .insert_raw(
            refresh_key(&session.refresh_token),
            session.session_id.as_bytes().to_vec(),
        )
        .await?;
    debug!(session_id = %session.session_id, email = %session.email, "session stored");
    Ok(())
}

/// Load a session by session_id.
pub async fn get_session(
    sessions: &KeyspaceHandle,
    session_id: &str,
) -> Result<Option<Session>, AppError> {
    sessions.get(session_key(session_id)).await
}

/// Look up a session_id by refresh token.
pub async fn get_session_by_refresh(
    sessions: &KeyspaceHandle,
    token: &str,
) -> Result<Option<String>, AppError> {
    match sessions.get_raw(refresh_key(token)).await? {
        Some(bytes) => {
            let session_id = String::from_utf8(bytes)
                .map_err(|e| AppError::Internal(format!("invalid session_id bytes: {e}")))?;
            Ok(Some(session_id))
        }
        None => Ok(None),
    }
}

/// Delete a single session and its refresh index.
pub async fn delete_session(sessions: &KeyspaceHandle, session_id: &str) -> Result<(), AppError> {
    let session: Option<Session> = sessions.get(session_key(session_id)).await?;
    if let Some(session) = session {
        sessions.remove(refresh_key(&session.refresh_token)).await?;
        sessions.remove(session_key(session_id)).await?;
        debug!(session_id, "session deleted");
    }
    Ok(())
}

/// Returns the current UNIX epoch timestamp in seconds.
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

/// Remove sessions whose refresh token has expired.
pub async fn cleanup_expired_sessions(sessions: &KeyspaceHandle) -> Result<(), AppError> {
    let entries = sessions.prefix_iter_raw("session:").await?;
    let now = now_epoch();
    let mut removed = 0u64;

    for (key, value) in entries {
        let session: Session = match serde_json::from_slice(&value) {
            Ok(s) => s,
            Err(_) => continue,
        };

        if now > session.refresh_expires_at {
            sessions.remove(key).await?;
            sessions.remove(refresh_key(&session.refresh_token)).await?;
            removed += 1;
        }
    }

    debug!(removed, "session cleanup complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::Store;

    fn temp_sessions() -> (KeyspaceHandle, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&StoreConfig {
            data_dir: dir.path().to_path_buf(),
        })
        .unwrap();
        (store.keyspace("sessions").unwrap(), dir)
    }

    fn session(id: &str, refresh_expires_at: u64) -> Session {
        Session {
            session_id: id.to_string(),
            email: "admin@example.com".to_string(),
            created_at: now_epoch(),
            refresh_token: format!("refresh-{id}"),
            refresh_expires_at,
        }
    }

    #[tokio::test]
    async fn test_store_and_lookup_by_refresh() {
        let (ks, _dir) = temp_sessions();
        let s = session("s1", now_epoch() + 3600);
        store_session(&ks, &s).await.unwrap();

        let found = get_session_by_refresh(&ks, &s.refresh_token).await.unwrap();
        assert_eq!(found.as_deref(), Some("s1"));

        let loaded = get_session(&ks, "s1").await.unwrap().unwrap();
        assert_eq!(loaded.email, "admin@example.com");
    }

    #[tokio::test]
    async fn test_delete_removes_refresh_index() {
        let (ks, _dir) = temp_sessions();
        let s = session("s1", now_epoch() + 3600);
        store_session(&ks, &s).await.unwrap();

        delete_session(&ks, "s1").await.unwrap();

        assert!(get_session(&ks, "s1").await.unwrap().is_none());
        assert!(
            get_session_by_refresh(&ks, &s.refresh_token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cleanup_sweeps_only_expired() {
        let (ks, _dir) = temp_sessions();
        store_session(&ks, &session("dead", now_epoch() - 10))
            .await
            .unwrap();
        store_session(&ks, &session("live", now_epoch() + 3600))
            .await
            .unwrap();

        cleanup_expired_sessions(&ks).await.unwrap();

        assert!(get_session(&ks, "dead").await.unwrap().is_none());
        assert!(get_session(&ks, "live").await.unwrap().is_some());
        assert!(
            get_session_by_refresh(&ks, "refresh-dead")
                .await
                .unwrap()
                .is_none()
        );
    }
}
