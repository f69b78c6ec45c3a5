use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::CrdClient;

const SERVICE_NAME: &str = "crd-cli";
const KEYRING_KEY: &str = "session";

/// Expiry slack so a token isn't handed out moments before it dies.
const EXPIRY_MARGIN_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    url: String,
    email: String,
    access_token: String,
    access_expires_at: u64,
    refresh_token: String,
}

fn load_session() -> Option<StoredSession> {
    let entry = keyring::Entry::new(SERVICE_NAME, KEYRING_KEY).ok()?;
    let json = match entry.get_password() {
        Ok(v) => v,
        Err(keyring::Error::NoEntry) => return None,
        Err(e) => {
            eprintln!("Warning: keyring read error: {e}");
            return None;
        }
    };
    serde_json::from_str(&json).ok()
}

fn save_session(session: &StoredSession) -> Result<(), Box<dyn std::error::Error>> {
    let entry = keyring::Entry::new(SERVICE_NAME, KEYRING_KEY)
        .map_err(|e| format!("keyring entry error: {e}"))?;
    let json = serde_json::to_string(session)?;
    entry
        .set_password(&json)
        .map_err(|e| format!("failed to store session in keyring: {e}"))?;
    Ok(())
}

fn clear_session() {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, KEYRING_KEY) {
        let _ = entry.delete_credential();
    }
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

/// The service URL the stored session was created against, if any.
pub fn stored_url() -> Option<String> {
    load_session().map(|s| s.url)
}

/// Sign in and store the session in the OS keyring.
pub async fn login(
    url: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = CrdClient::new(url);
    let resp = client.login(email, password).await?;

    let session = StoredSession {
        url: client.base_url().to_string(),
        email: email.to_string(),
        access_token: resp.access_token,
        access_expires_at: resp.access_expires_at,
        refresh_token: resp.refresh_token,
    };
    save_session(&session)?;
    debug!(email, "session saved to keyring");

    println!("Signed in as {email}.");
    Ok(())
}

/// Sign out: revoke the session server-side, then clear the keyring.
pub async fn logout(client: &mut CrdClient) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(token) = access_token(client).await {
        client.set_token(token);
        if let Err(e) = client.logout().await {
            eprintln!("Warning: server-side sign-out failed: {e}");
        }
    }
    clear_session();
    println!("Signed out.");
    Ok(())
}

/// Show current authentication status.
pub fn status() {
    match load_session() {
        Some(session) => {
            let remaining = session.access_expires_at.saturating_sub(now_epoch());
            println!("Signed in as {} ({})", session.email, session.url);
            if remaining > 0 {
                println!("Access token valid for {remaining}s");
            } else {
                println!("Access token expired (will refresh on next use)");
            }
        }
        None => println!("Not signed in. Run `crd auth login <email>`."),
    }
}

/// Return a valid access token, refreshing through the service if the
/// stored one has expired.
pub async fn access_token(client: &CrdClient) -> Result<String, Box<dyn std::error::Error>> {
    let mut session = load_session()
        .ok_or("not signed in.\n\nRun `crd auth login <email>` first.")?;

    if session.access_expires_at > now_epoch() + EXPIRY_MARGIN_SECS {
        return Ok(session.access_token);
    }

    debug!("access token expired, refreshing");
    let resp = client.refresh(&session.refresh_token).await.map_err(|e| {
        format!("token refresh failed: {e}\n\nRun `crd auth login <email>` again.")
    })?;

    session.access_token = resp.access_token;
    session.access_expires_at = resp.access_expires_at;
    save_session(&session)?;

    Ok(session.access_token)
}
