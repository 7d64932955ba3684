//! Authentication service: registration, login, tokens and profile.

use chrono::{DateTime, Utc};
use parley_types::error::{RepositoryError, ServiceError, TokenError, ValidationErrors};
use parley_types::user::{
    AuthUser, ChangePasswordInput, LoginInput, ProfileUpdate, RegisterInput, TokenClaims,
    TokenPair, TokenType, User,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenIssuer;
use crate::repository::user::UserRepository;
use crate::validation::{self, BLANK, PASSWORD_MISMATCH, REQUIRED};

pub const LOGIN_FAILED: &str =
    "Không tìm thấy tài khoản hoạt động với thông tin đăng nhập đã cung cấp.";
pub const TOKEN_INVALID_OR_EXPIRED: &str = "Token không hợp lệ hoặc đã hết hạn.";
pub const LOGOUT_TOKEN_REQUIRED: &str = "Refresh token là bắt buộc.";
pub const LOGOUT_TOKEN_INVALID: &str = "Token không hợp lệ.";
pub const EMAIL_TAKEN: &str = "Email này đã được sử dụng.";
pub const USERNAME_TAKEN: &str = "Username này đã được sử dụng.";
pub const WRONG_OLD_PASSWORD: &str = "Mật khẩu hiện tại không đúng.";

const USERNAME_MAX: usize = 150;
const NAME_MAX: usize = 150;
const PHONE_MAX: usize = 15;

/// Service for accounts and JWT sessions.
///
/// Generic over the user repository and the hashing/signing ports so
/// parley-core never depends on parley-infra.
pub struct AuthService<U: UserRepository, H: PasswordHasher, T: TokenIssuer> {
    users: U,
    hasher: H,
    tokens: T,
}

impl<U: UserRepository, H: PasswordHasher, T: TokenIssuer> AuthService<U, H, T> {
    pub fn new(users: U, hasher: H, tokens: T) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    /// Create an account and hand out its first token pair.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, TokenPair), ServiceError> {
        let mut errors = ValidationErrors::new();

        let email = match validation::required(&mut errors, "email", input.email.as_deref()) {
            Some(raw) => {
                let email = raw.trim().to_lowercase();
                if email.is_empty() {
                    errors.add("email", BLANK);
                } else if !validation::is_valid_email(&email) {
                    errors.add("email", validation::INVALID_EMAIL);
                } else if self.users.get_by_email(&email).await?.is_some() {
                    errors.add("email", EMAIL_TAKEN);
                }
                email
            }
            None => String::new(),
        };

        let username =
            match validation::required(&mut errors, "username", input.username.as_deref()) {
                Some(raw) => {
                    let username = raw.trim().to_string();
                    self.check_username(&mut errors, &username, None).await?;
                    username
                }
                None => String::new(),
            };

        let password = validation::required(&mut errors, "password", input.password.as_deref())
            .unwrap_or_default()
            .to_string();
        if input.password.is_some() {
            if password.is_empty() {
                errors.add("password", BLANK);
            } else {
                validation::check_password(&mut errors, "password", &password);
            }
        }
        let confirm = validation::required(
            &mut errors,
            "password_confirm",
            input.password_confirm.as_deref(),
        )
        .unwrap_or_default();

        let first_name = input.first_name.unwrap_or_default();
        let last_name = input.last_name.unwrap_or_default();
        check_max(&mut errors, "first_name", &first_name, NAME_MAX);
        check_max(&mut errors, "last_name", &last_name, NAME_MAX);
        let phone = input.phone.filter(|p| !p.is_empty());
        if let Some(phone) = &phone {
            check_max(&mut errors, "phone", phone, PHONE_MAX);
        }

        errors.into_result()?;
        if password != confirm {
            return Err(ValidationErrors::single("password_confirm", PASSWORD_MISMATCH).into());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email,
            username,
            first_name,
            last_name,
            phone,
            avatar: None,
            is_verified: false,
            is_active: true,
            is_staff: false,
            password_hash: self.hasher.hash(&password).map_err(ServiceError::Internal)?,
            created_at: now,
            updated_at: now,
        };
        let user = self.users.create(&user).await.map_err(unique_violation)?;

        info!(user_id = %user.id, "User registered");
        let pair = self.issue_pair(&user.id)?;
        Ok((user, pair))
    }

    /// Exchange email + password for a token pair.
    pub async fn login(&self, input: LoginInput) -> Result<(User, TokenPair), ServiceError> {
        let mut errors = ValidationErrors::new();
        let email = validation::required(&mut errors, "email", input.email.as_deref());
        let password = validation::required(&mut errors, "password", input.password.as_deref());
        errors.into_result()?;
        let (email, password) = (email.unwrap_or_default(), password.unwrap_or_default());

        let user = self
            .users
            .get_by_email(&email.trim().to_lowercase())
            .await?
            .filter(|u| u.is_active && self.hasher.verify(password, &u.password_hash))
            .ok_or_else(|| ServiceError::Unauthorized(LOGIN_FAILED.to_string()))?;

        info!(user_id = %user.id, "User logged in");
        let pair = self.issue_pair(&user.id)?;
        Ok((user, pair))
    }

    /// Mint a new access token from a valid, un-revoked refresh token.
    pub async fn refresh(&self, refresh: Option<&str>) -> Result<String, ServiceError> {
        let Some(refresh) = refresh else {
            return Err(ValidationErrors::single("refresh", REQUIRED).into());
        };
        let claims = self
            .verify_refresh(refresh)
            .await
            .map_err(|_| ServiceError::Unauthorized(TOKEN_INVALID_OR_EXPIRED.to_string()))?;
        let user_id = parse_subject(&claims)
            .ok_or_else(|| ServiceError::Unauthorized(TOKEN_INVALID_OR_EXPIRED.to_string()))?;

        Ok(self.tokens.issue(&user_id, TokenType::Access)?.token)
    }

    /// Revoke a refresh token.
    pub async fn logout(&self, caller: &AuthUser, refresh: Option<&str>) -> Result<(), ServiceError> {
        let refresh = refresh
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Rejected(LOGOUT_TOKEN_REQUIRED.to_string()))?;
        let claims = self
            .verify_refresh(refresh)
            .await
            .map_err(|_| ServiceError::Rejected(LOGOUT_TOKEN_INVALID.to_string()))?;
        let user_id = parse_subject(&claims)
            .ok_or_else(|| ServiceError::Rejected(LOGOUT_TOKEN_INVALID.to_string()))?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

        self.users
            .blacklist_token(&claims.jti, &user_id, expires_at)
            .await?;
        info!(user_id = %caller.id, jti = %claims.jti, "Refresh token revoked");
        Ok(())
    }

    /// Resolve a bearer access token to an active user.
    pub async fn authenticate(&self, access: &str) -> Result<AuthUser, ServiceError> {
        let claims = self
            .tokens
            .decode(access, TokenType::Access)
            .map_err(|_| ServiceError::Unauthorized(TOKEN_INVALID_OR_EXPIRED.to_string()))?;
        let user_id = parse_subject(&claims)
            .ok_or_else(|| ServiceError::Unauthorized(TOKEN_INVALID_OR_EXPIRED.to_string()))?;
        match self.users.get_by_id(&user_id).await? {
            Some(user) if user.is_active => Ok(AuthUser::from(&user)),
            _ => Err(ServiceError::Unauthorized(TOKEN_INVALID_OR_EXPIRED.to_string())),
        }
    }

    pub async fn profile(&self, user_id: &Uuid) -> Result<User, ServiceError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Apply profile edits. A full update (`partial = false`) requires `username`.
    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        update: ProfileUpdate,
        partial: bool,
    ) -> Result<User, ServiceError> {
        let mut user = self.profile(user_id).await?;
        let mut errors = ValidationErrors::new();

        match update.username {
            Some(raw) => {
                let username = raw.trim().to_string();
                self.check_username(&mut errors, &username, Some(user_id))
                    .await?;
                user.username = username;
            }
            None if !partial => errors.add("username", REQUIRED),
            None => {}
        }
        if let Some(first_name) = update.first_name {
            check_max(&mut errors, "first_name", &first_name, NAME_MAX);
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            check_max(&mut errors, "last_name", &last_name, NAME_MAX);
            user.last_name = last_name;
        }
        if let Some(phone) = update.phone {
            check_max(&mut errors, "phone", &phone, PHONE_MAX);
            user.phone = Some(phone).filter(|p| !p.is_empty());
        }
        if let Some(avatar) = update.avatar {
            user.avatar = Some(avatar).filter(|a| !a.is_empty());
        }
        errors.into_result()?;

        user.updated_at = Utc::now();
        let user = self.users.update(&user).await.map_err(unique_violation)?;
        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: &Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        let mut errors = ValidationErrors::new();
        let old = validation::required(&mut errors, "old_password", input.old_password.as_deref())
            .unwrap_or_default();
        let new = validation::required(&mut errors, "new_password", input.new_password.as_deref())
            .unwrap_or_default();
        if input.new_password.is_some() {
            validation::check_password(&mut errors, "new_password", new);
        }
        let confirm = validation::required(
            &mut errors,
            "new_password_confirm",
            input.new_password_confirm.as_deref(),
        )
        .unwrap_or_default();
        errors.into_result()?;
        if new != confirm {
            return Err(
                ValidationErrors::single("new_password_confirm", PASSWORD_MISMATCH).into(),
            );
        }

        let mut user = self.profile(user_id).await?;
        if !self.hasher.verify(old, &user.password_hash) {
            warn!(user_id = %user_id, "Password change rejected: wrong current password");
            return Err(ServiceError::RejectedField {
                field: "old_password".to_string(),
                message: WRONG_OLD_PASSWORD.to_string(),
            });
        }
        user.password_hash = self.hasher.hash(new).map_err(ServiceError::Internal)?;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Promote an account to staff. CLI only.
    pub async fn grant_staff(&self, email: &str) -> Result<User, ServiceError> {
        let mut user = self
            .users
            .get_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(ServiceError::NotFound)?;
        user.is_staff = true;
        user.updated_at = Utc::now();
        let user = self.users.update(&user).await?;
        info!(user_id = %user.id, "Staff access granted");
        Ok(user)
    }

    fn issue_pair(&self, user_id: &Uuid) -> Result<TokenPair, ServiceError> {
        Ok(TokenPair {
            refresh: self.tokens.issue(user_id, TokenType::Refresh)?.token,
            access: self.tokens.issue(user_id, TokenType::Access)?.token,
        })
    }

    async fn verify_refresh(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.tokens.decode(token, TokenType::Refresh)?;
        match self.users.is_token_blacklisted(&claims.jti).await {
            Ok(false) => Ok(claims),
            Ok(true) => Err(TokenError::Revoked),
            Err(e) => {
                warn!(error = %e, "Blacklist lookup failed");
                Err(TokenError::Invalid)
            }
        }
    }

    async fn check_username(
        &self,
        errors: &mut ValidationErrors,
        username: &str,
        exclude: Option<&Uuid>,
    ) -> Result<(), ServiceError> {
        if username.is_empty() {
            errors.add("username", BLANK);
            return Ok(());
        }
        check_max(errors, "username", username, USERNAME_MAX);
        if let Some(existing) = self.users.get_by_username(username).await? {
            if Some(&existing.id) != exclude {
                errors.add("username", USERNAME_TAKEN);
            }
        }
        Ok(())
    }
}

fn parse_subject(claims: &TokenClaims) -> Option<Uuid> {
    Uuid::parse_str(&claims.sub).ok()
}

/// Turn a repository conflict into the field error for the column that
/// collided. Lookups run before the write, so this only fires on a race.
fn unique_violation(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::Conflict(column) if column == "username" => {
            ValidationErrors::single("username", USERNAME_TAKEN).into()
        }
        RepositoryError::Conflict(_) => ValidationErrors::single("email", EMAIL_TAKEN).into(),
        other => other.into(),
    }
}

fn check_max(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if validation::char_len(value) > max {
        errors.add(field, validation::max_length(max));
    }
}
