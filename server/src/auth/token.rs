use std::sync::Arc;

use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Session;
use crate::store::Store;
use crate::utils::error::AppError;

const TOKEN_BYTES: usize = 32;

/// Fresh opaque bearer token, URL-safe base64 without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Sessions are looked up by this digest; the raw token is never stored.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Mint a token for `user_id`, persist its session and hand the raw token
/// back to the caller.
pub async fn issue_session(
    store: &dyn Store,
    user_id: Uuid,
    ttl_days: i64,
) -> Result<String, AppError> {
    let token = generate_token();
    let now = Utc::now();
    let session = Session {
        token_hash: token_digest(&token),
        user_id,
        expires_at: now + Duration::days(ttl_days),
        created_at: now,
    };
    store.create_session(&session).await?;
    Ok(token)
}

/// Purge expired sessions every `every` for as long as the runtime lives.
pub fn spawn_session_sweeper(
    store: Arc<dyn Store>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.delete_expired_sessions(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Expired sessions purged"),
                Err(e) => tracing::error!("session sweep error: {e}"),
            }
        }
    })
}
