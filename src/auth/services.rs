use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::dto::{
    ForgotPasswordRequest, LoginRequest, PublicUser, ResetPasswordRequest, SignupRequest,
};
use crate::auth::jwt::JwtKeys;
use crate::auth::otp::OtpStore;
use crate::auth::password::{hash_secret, verify_secret};
use crate::auth::users::UserDirectory;
use crate::error::ApiError;
use crate::mailer::Mailer;
use crate::store::RowStore;

const MIN_PASSWORD_CHARS: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // local@domain.tld with a TLD of at least two letters
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Orchestrates the five auth flows. Stateless between requests; everything
/// persistent goes through the user directory and OTP store.
pub struct AuthService {
    users: UserDirectory,
    otps: OtpStore,
    mailer: Arc<dyn Mailer>,
    jwt: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn RowStore>, mailer: Arc<dyn Mailer>, jwt: JwtKeys) -> Self {
        Self {
            users: UserDirectory::new(store.clone()),
            otps: OtpStore::new(store),
            mailer,
            jwt,
        }
    }

    pub async fn signup(&self, req: &SignupRequest) -> Result<(), ApiError> {
        if req.email.is_empty()
            || req.password.is_empty()
            || req.confirm_password.is_empty()
            || req.name.is_empty()
        {
            return Err(ApiError::Validation("All fields are required".into()));
        }
        if !is_valid_email(&req.email) {
            return Err(ApiError::Validation("Invalid email format".into()));
        }
        if req.password != req.confirm_password {
            return Err(ApiError::Validation("Passwords do not match".into()));
        }
        if req.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }

        // Read-then-write uniqueness check; a concurrent signup for the same
        // email can slip through between the two calls.
        if self.users.find_by_email(&req.email).await?.is_some() {
            warn!(email = %req.email, "signup for registered email");
            return Err(ApiError::Conflict("Email already registered".into()));
        }

        let cred = hash_secret(&req.password);
        let user = self
            .users
            .create(&req.email, &req.name, &cred.digest, &cred.salt)
            .await?;
        info!(user_id = %user.id, "user registered");
        Ok(())
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<(String, PublicUser), ApiError> {
        if req.email.is_empty() || req.password.is_empty() {
            return Err(ApiError::Validation(
                "Email and password are required".into(),
            ));
        }

        let user = match self.users.find_by_email(&req.email).await? {
            Some(u) => u,
            None => {
                warn!("login for unknown email");
                return Err(ApiError::Credentials);
            }
        };

        if !verify_secret(&user.password_hash, &user.salt, &req.password) {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ApiError::Credentials);
        }

        let token = self.jwt.sign(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok((
            token,
            PublicUser {
                id: user.id,
                email: user.email,
                name: user.name,
            },
        ))
    }

    /// Issues a reset code and dispatches it by email. An unknown email is
    /// reported as success so callers cannot probe for registered accounts;
    /// only an outright mailer failure is distinguishable.
    pub async fn forgot_password(&self, req: &ForgotPasswordRequest) -> Result<(), ApiError> {
        if req.email.is_empty() {
            return Err(ApiError::Validation("Email is required".into()));
        }

        let user = match self.users.find_by_email(&req.email).await? {
            Some(u) => u,
            None => {
                debug!("password reset requested for unknown email");
                return Ok(());
            }
        };

        let code = self.otps.issue(user.id).await?;
        self.mailer
            .send_password_reset(&user.email, &user.name, &code)
            .await
            .map_err(ApiError::MailDispatch)?;
        info!(user_id = %user.id, "password reset code dispatched");
        Ok(())
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ApiError> {
        if req.email.is_empty()
            || req.otp.is_empty()
            || req.new_password.is_empty()
            || req.confirm_password.is_empty()
        {
            return Err(ApiError::Validation("All fields are required".into()));
        }
        if req.new_password != req.confirm_password {
            return Err(ApiError::Validation("Passwords do not match".into()));
        }
        if req.new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }

        let user = match self.users.find_by_email(&req.email).await? {
            Some(u) => u,
            None => return Err(ApiError::Validation("Invalid request".into())),
        };

        let pending = match self.otps.find(user.id).await? {
            Some(p) => p,
            None => return Err(ApiError::InvalidOtp),
        };
        if !verify_secret(&pending.otp_hash, &pending.salt, &req.otp) {
            warn!(user_id = %user.id, "reset with wrong code");
            return Err(ApiError::InvalidOtp);
        }

        let cred = hash_secret(&req.new_password);
        self.users
            .update_password(user.id, &cred.digest, &cred.salt)
            .await?;
        self.otps.invalidate(user.id).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }
}
