use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::password::hash_secret;
use crate::store::{Filter, RowStore, StoreError};

pub const RESETS_TABLE: &str = "password_resets";

const OTP_DIGITS: u32 = 6;

/// Pending password reset. Only the salted digest of the code is stored;
/// at most one request exists per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub user_id: Uuid,
    pub otp_hash: String,
    pub salt: String,
}

/// Issues and tracks one-time reset codes. Codes carry no expiry; a code is
/// invalidated by a successful reset or superseded by a newer issue.
#[derive(Clone)]
pub struct OtpStore {
    store: Arc<dyn RowStore>,
}

impl OtpStore {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Generate a fresh code for the user, replacing any pending request.
    /// Returns the plaintext code for dispatch; only its hash is persisted.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, StoreError> {
        let code = generate_code();
        let cred = hash_secret(&code);
        self.invalidate(user_id).await?;
        self.store
            .insert(
                RESETS_TABLE,
                json!({
                    "user_id": user_id,
                    "otp_hash": cred.digest,
                    "salt": cred.salt,
                }),
            )
            .await?;
        debug!(user_id = %user_id, "reset code issued");
        Ok(code)
    }

    pub async fn find(&self, user_id: Uuid) -> Result<Option<PasswordResetRequest>, StoreError> {
        let rows = self
            .store
            .select(RESETS_TABLE, &Filter::eq("user_id", user_id.to_string()))
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row).map_err(StoreError::Malformed)?)),
            None => Ok(None),
        }
    }

    pub async fn invalidate(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.store
            .delete(RESETS_TABLE, &Filter::eq("user_id", user_id.to_string()))
            .await
    }
}

/// Fixed-length numeric code, zero-padded.
fn generate_code() -> String {
    let code: u32 = OsRng.gen_range(0..10u32.pow(OTP_DIGITS));
    format!("{code:0width$}", width = OTP_DIGITS as usize)
}
