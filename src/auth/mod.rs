//! Accounts, password checks and session tokens.

pub mod password;
pub mod token;

use crate::config::{AdminConfig, AuthConfig};
use crate::error::{AppError, AppResult};
use crate::models::{Role, User};
use crate::store::users::{self, NewUser};
use crate::store::{journals, Store};
use chrono::Duration;
use tracing::{debug, info};

/// Fields collected by `register`.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub password: &'a str,
}

/// A freshly issued token and the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Issues and checks credentials against the user table.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: String,
    ttl: Duration,
    iterations: u32,
}

impl Authenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret_key.clone(),
            ttl: Duration::minutes(config.token_ttl_minutes),
            iterations: config.hash_iterations,
        }
    }

    /// Create an account with role `user` and its default journal.
    pub fn register(&self, store: &mut Store, form: &Registration<'_>) -> AppResult<Session> {
        let tx = store.write_transaction()?;

        if users::get_by_username(&tx, form.username)?.is_some() {
            return Err(AppError::UsernameTaken(form.username.to_string()));
        }

        let hashed = password::hash_password(form.password, self.iterations);
        let user = users::insert(
            &tx,
            &NewUser {
                name: form.name,
                username: form.username,
                email: form.email,
                hashed_password: &hashed,
                role: Role::User,
            },
        )?;
        let token = token::issue(&self.secret, &user.username, self.ttl)?;
        journals::insert(&tx, user.id, &format!("{} Journal", user.username))?;

        tx.commit()?;
        info!(user_id = user.id, "Registered {}", user.username);
        Ok(Session { token, user })
    }

    /// Check a username and password and issue a token.
    pub fn authenticate(&self, store: &Store, username: &str, password: &str) -> AppResult<Session> {
        let record = users::get_by_username(store.conn(), username)?
            .ok_or(AppError::InvalidCredentials)?;

        if !password::verify_password(password, &record.hashed_password) {
            debug!("Password mismatch for {}", username);
            return Err(AppError::InvalidCredentials);
        }

        let token = token::issue(&self.secret, &record.user.username, self.ttl)?;
        Ok(Session {
            token,
            user: record.user,
        })
    }

    /// Resolve the bearer of a token.
    pub fn current_user(&self, store: &Store, token: Option<&str>) -> AppResult<User> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::NotAuthenticated)?;

        let claims = token::verify(&self.secret, token)?;

        users::get_by_username(store.conn(), &claims.sub)?
            .map(|record| record.user)
            .ok_or(AppError::InvalidToken)
    }

    /// Create the configured admin account if it does not exist yet.
    ///
    /// Returns whether an account was created.
    pub fn ensure_admin(&self, store: &mut Store, admin: &AdminConfig) -> AppResult<bool> {
        let Some((username, password)) = admin.credentials() else {
            return Ok(false);
        };

        let tx = store.write_transaction()?;
        if users::get_by_username(&tx, username)?.is_some() {
            debug!("Admin account {} already exists", username);
            return Ok(false);
        }

        let hashed = password::hash_password(password, self.iterations);
        users::insert(
            &tx,
            &NewUser {
                name: username,
                username,
                email: admin.email.as_deref(),
                hashed_password: &hashed,
                role: Role::Admin,
            },
        )?;
        tx.commit()?;

        info!("Created admin account {}", username);
        Ok(true)
    }
}
