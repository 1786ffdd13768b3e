use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser, RegisterRequest,
            TokenPair, TokensResponse, UpdateProfileRequest,
        },
        extractors::AuthContext,
        jwt::{TokenCodec, TokenError},
        password::PasswordHasher,
        repo::CredentialStore,
        repo_types::{NewRefreshToken, NewUser, User, UserChanges},
    },
    config::AppConfig,
    db::StoreError,
    error::{AppError, AppResult},
    validation::Checks,
};

fn internal<E>(e: E) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AppError::Internal(anyhow::Error::new(e))
}

/// Registration, login, refresh rotation, logout and identity checks.
///
/// All state lives in the [`CredentialStore`]; the manager itself holds only
/// keys and configuration, so any number of instances can serve the same
/// database.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    min_password_len: usize,
    // Verified against on unknown-email logins so both failure paths cost one hash.
    dummy_hash: String,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: TokenCodec,
        hasher: PasswordHasher,
        min_password_len: usize,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            codec,
            hasher,
            min_password_len,
            dummy_hash,
        })
    }

    pub fn from_config(store: Arc<dyn CredentialStore>, config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(
            store,
            TokenCodec::new(&config.jwt),
            PasswordHasher::new(&config.password)?,
            config.password.min_length,
        )
    }

    /// Signs a new access/refresh pair and persists the refresh half.
    async fn issue_pair(&self, user: &User) -> AppResult<TokenPair> {
        let access = self
            .codec
            .sign_access(user.id, &user.email)
            .map_err(internal)?;
        let refresh = self.codec.sign_refresh(user.id).map_err(internal)?;
        self.store
            .create_refresh_token(NewRefreshToken {
                token: refresh.token.clone(),
                user_id: user.id,
                expires_at: refresh.expires_at,
            })
            .await
            .map_err(internal)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    #[instrument(skip(self, req))]
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        let email = req.email.trim().to_string();
        let display_name = req.display_name.trim().to_string();
        Checks::new()
            .email("email", &email)
            .min_len("password", &req.password, self.min_password_len)
            .not_blank("displayName", &display_name)
            .finish()?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            info!(email = %email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = match self
            .store
            .create_user(NewUser {
                email,
                password_hash,
                display_name,
            })
            .await
        {
            Ok(u) => u,
            // Lost a race with a concurrent registration of the same email.
            Err(StoreError::Conflict(_)) => return Err(AppError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        };

        let tokens = self.issue_pair(&user).await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(AuthResponse {
            user: user.into(),
            tokens,
        })
    }

    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        let email = req.email.trim();
        Checks::new()
            .email("email", email)
            .require(!req.password.is_empty(), "password", "must not be empty")
            .finish()?;

        let user = match self.store.find_user_by_email(email).await? {
            Some(u) => u,
            None => {
                let _ = self.hasher.verify(&req.password, &self.dummy_hash);
                warn!(email = %email, "login unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(&req.password, &user.password_hash) {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&user).await?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(AuthResponse {
            user: user.into(),
            tokens,
        })
    }

    /// Redeems a refresh token for a new pair. The old row is deleted before
    /// the successor is stored, and only the caller whose delete removed the
    /// row may continue, so one token mints at most one successor.
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &str) -> AppResult<TokensResponse> {
        if token.trim().is_empty() {
            return Err(AppError::field("refreshToken", "must not be empty"));
        }

        let row = match self.store.find_refresh_token(token).await? {
            Some(row) if !row.is_expired(OffsetDateTime::now_utc()) => row,
            Some(_) => {
                debug!("refresh token past expiry");
                return Err(AppError::InvalidOrExpiredToken);
            }
            None => {
                debug!("refresh token not found");
                return Err(AppError::InvalidOrExpiredToken);
            }
        };

        let claims = match self.codec.verify_refresh(token) {
            Ok(c) => c,
            Err(TokenError::Expired) => return Err(AppError::InvalidOrExpiredToken),
            Err(e) => {
                warn!(error = %e, user_id = %row.user_id, "stored refresh token failed verification");
                return Err(AppError::InvalidToken);
            }
        };
        if claims.sub != row.user_id {
            warn!(claim_sub = %claims.sub, user_id = %row.user_id, "refresh token owner mismatch");
            return Err(AppError::InvalidToken);
        }

        if !self.store.delete_refresh_token(token).await? {
            debug!(user_id = %row.user_id, "refresh token already redeemed");
            return Err(AppError::InvalidOrExpiredToken);
        }

        let user = self
            .store
            .find_user_by_id(row.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        let tokens = self.issue_pair(&user).await?;
        info!(user_id = %user.id, "refresh token rotated");
        Ok(TokensResponse { tokens })
    }

    /// Always succeeds: a token that never existed is already unusable.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: Option<&str>) {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return;
        };
        match self.store.delete_refresh_token(token).await {
            Ok(removed) => debug!(removed, "logout"),
            Err(e) => error!(error = %e, "logout: refresh token delete failed"),
        }
    }

    /// Stateless: checks signature, expiry and kind without touching the
    /// store, so an access token stays valid until it expires.
    pub fn authenticate(&self, token: &str) -> AppResult<AuthContext> {
        match self.codec.verify_access(token) {
            Ok(claims) => Ok(AuthContext {
                user_id: claims.sub,
                email: claims.email,
            }),
            Err(e) => {
                debug!(error = %e, "access token rejected");
                Err(AppError::Unauthorized(e))
            }
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<PublicUser> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;
        Ok(user.into())
    }

    /// Outstanding refresh tokens are left alone.
    #[instrument(skip(self, req))]
    pub async fn change_password(&self, user_id: Uuid, req: ChangePasswordRequest) -> AppResult<()> {
        Checks::new()
            .require(!req.current_password.is_empty(), "currentPassword", "must not be empty")
            .min_len("newPassword", &req.new_password, self.min_password_len)
            .finish()?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        if !self.hasher.verify(&req.current_password, &user.password_hash) {
            info!(user_id = %user_id, "change password: current password mismatch");
            return Err(AppError::InvalidCurrentPassword);
        }

        let password_hash = self.hasher.hash(&req.new_password)?;
        self.store
            .update_user(
                user_id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(AppError::NotFound("user"))?;
        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    #[instrument(skip(self, req))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> AppResult<PublicUser> {
        let display_name = req.display_name.map(|v| v.trim().to_string());
        let email = req.email.map(|v| v.trim().to_string());

        let mut checks = Checks::new();
        if let Some(name) = &display_name {
            checks.not_blank("displayName", name);
        }
        if let Some(email) = &email {
            checks.email("email", email);
        }
        checks.finish()?;

        if let Some(email) = &email {
            if let Some(existing) = self.store.find_user_by_email(email).await? {
                if existing.id != user_id {
                    info!(user_id = %user_id, "profile update: email in use");
                    return Err(AppError::DuplicateEmail);
                }
            }
        }

        let changes = UserChanges {
            email,
            display_name,
            password_hash: None,
        };
        let user = match self.store.update_user(user_id, changes).await {
            Ok(Some(u)) => u,
            Ok(None) => return Err(AppError::NotFound("user")),
            Err(StoreError::Conflict(_)) => return Err(AppError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        };
        info!(user_id = %user.id, "profile updated");
        Ok(user.into())
    }
}
