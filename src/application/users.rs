//! Accounts, profiles and personal access tokens.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateUserParams, EMAIL_CONSTRAINT, RepoError, USERNAME_CONSTRAINT, UpdateProfileParams,
    UserActivity, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::users::{normalize_email, normalize_name, normalize_username};

const TOKEN_TAG: &str = "ch";
const PREFIX_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        if err.is_duplicate_of(USERNAME_CONSTRAINT) {
            DomainError::validation("username", "A user with that username already exists.").into()
        } else if err.is_duplicate_of(EMAIL_CONSTRAINT) {
            DomainError::validation("email", "A user with that email already exists.").into()
        } else {
            UserError::Repo(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing access token")]
    Missing,
    #[error("invalid access token")]
    Invalid,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterUserCommand {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileCommand {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    pub articles_count: u64,
    pub comments_count: u64,
}

impl UserProfile {
    fn new(user: UserRecord, activity: UserActivity) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: user.date_joined,
            articles_count: activity.articles_count,
            comments_count: activity.comments_count,
        }
    }
}

/// A profile together with a token shown exactly once.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub profile: UserProfile,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
}

impl UserService {
    pub fn new(reader: Arc<dyn UsersRepo>, writer: Arc<dyn UsersWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn register(&self, cmd: RegisterUserCommand) -> Result<IssuedToken, UserError> {
        let username = normalize_username(&cmd.username)?;
        let email = normalize_email(&cmd.email)?;
        let first_name = normalize_name("first_name", cmd.first_name.as_deref().unwrap_or(""))?;
        let last_name = normalize_name("last_name", cmd.last_name.as_deref().unwrap_or(""))?;

        let credentials = Credentials::generate();
        let user = self
            .writer
            .create_user(CreateUserParams {
                id: Uuid::new_v4(),
                username,
                email,
                first_name,
                last_name,
                token_prefix: credentials.prefix.clone(),
                token_hash: credentials.hash.clone(),
                date_joined: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(IssuedToken {
            profile: UserProfile::new(user, UserActivity::default()),
            token: credentials.token,
        })
    }

    /// Replace the caller's token; the previous one stops working immediately.
    pub async fn rotate_token(&self, principal: &Principal) -> Result<IssuedToken, UserError> {
        let credentials = Credentials::generate();
        let user = self
            .writer
            .replace_token(principal.user_id, &credentials.prefix, &credentials.hash)
            .await?;
        let activity = self.reader.activity(user.id).await?;

        info!(user_id = %user.id, "Access token rotated");
        Ok(IssuedToken {
            profile: UserProfile::new(user, activity),
            token: credentials.token,
        })
    }

    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let parsed = parse_token(token).ok_or(AuthError::Invalid)?;
        let user = self
            .reader
            .find_by_token_prefix(&parsed.prefix)
            .await?
            .ok_or(AuthError::Invalid)?;

        let hashed_input = hash_secret(&parsed.secret);
        if user.token_hash.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        Ok(Principal {
            user_id: user.id,
            username: user.username,
        })
    }

    pub async fn list_profiles(&self, page: PageRequest) -> Result<Page<UserProfile>, UserError> {
        let users = self.reader.list_users(page).await?;
        let mut items = Vec::with_capacity(users.items.len());
        for user in &users.items {
            let activity = self.reader.activity(user.id).await?;
            items.push(UserProfile::new(user.clone(), activity));
        }
        Ok(Page::new(items, page, users.total))
    }

    pub async fn profile(&self, username: &str) -> Result<UserProfile, UserError> {
        let user = self
            .reader
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))?;
        self.with_activity(user).await
    }

    pub async fn me(&self, principal: &Principal) -> Result<UserProfile, UserError> {
        let user = self
            .reader
            .find_user(principal.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))?;
        self.with_activity(user).await
    }

    /// Partial update; absent fields keep their stored values.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        cmd: UpdateProfileCommand,
    ) -> Result<UserProfile, UserError> {
        let current = self
            .reader
            .find_user(principal.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))?;

        let email = match cmd.email.as_deref() {
            Some(email) => normalize_email(email)?,
            None => current.email,
        };
        let first_name = match cmd.first_name.as_deref() {
            Some(value) => normalize_name("first_name", value)?,
            None => current.first_name,
        };
        let last_name = match cmd.last_name.as_deref() {
            Some(value) => normalize_name("last_name", value)?,
            None => current.last_name,
        };

        let user = self
            .writer
            .update_profile(UpdateProfileParams {
                id: current.id,
                email,
                first_name,
                last_name,
            })
            .await?;
        self.with_activity(user).await
    }

    async fn with_activity(&self, user: UserRecord) -> Result<UserProfile, UserError> {
        let activity = self.reader.activity(user.id).await?;
        Ok(UserProfile::new(user, activity))
    }
}

struct Credentials {
    token: String,
    prefix: String,
    hash: Vec<u8>,
}

impl Credentials {
    fn generate() -> Self {
        let prefix = Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string();
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self {
            token: format!("{TOKEN_TAG}_{prefix}_{secret}"),
            hash: hash_secret(&secret),
            prefix,
        }
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_TAG {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
