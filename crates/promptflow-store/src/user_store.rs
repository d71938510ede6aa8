//! User accounts.
//!
//! Passwords are hashed with PBKDF2-HMAC-SHA256 (ring) and stored as
//! `base64(salt):base64(hash)`. Hashing and verification run on the
//! blocking pool; at 600 000 iterations each takes a noticeable slice of
//! CPU time.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, is_constraint_violation};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A registered account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// Unique, compared case-insensitively.
    pub email: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

struct UserRow {
    user: User,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at, password_hash";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user: User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        },
        password_hash: row.get(5)?,
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  Password hashing
// ═══════════════════════════════════════════════════════════════════════

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(600_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

const SALT_LEN: usize = 32;

const KEY_LEN: usize = 32;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Hash `password` into `base64(salt):base64(hash)`.
pub fn hash_password(password: &str) -> StoreResult<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| StoreError::InvalidArgument("failed to generate random salt".into()))?;

    let mut hash = [0u8; KEY_LEN];
    pbkdf2::derive(
        PBKDF2_ALG,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!("{}:{}", BASE64.encode(salt), BASE64.encode(hash)))
}

/// Check `password` against a string produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> StoreResult<bool> {
    let Some((salt, expected)) = stored.split_once(':') else {
        return Err(StoreError::InvalidArgument("malformed password hash".into()));
    };

    let salt = BASE64
        .decode(salt)
        .map_err(|e| StoreError::InvalidArgument(format!("invalid salt encoding: {e}")))?;
    let expected = BASE64
        .decode(expected)
        .map_err(|e| StoreError::InvalidArgument(format!("invalid hash encoding: {e}")))?;

    Ok(pbkdf2::verify(
        PBKDF2_ALG,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &expected,
    )
    .is_ok())
}

// ═══════════════════════════════════════════════════════════════════════
//  UserStore
// ═══════════════════════════════════════════════════════════════════════

/// Account registration, lookup and credential checks.
#[derive(Debug, Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a new account.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when the email is taken,
    /// regardless of case.
    #[instrument(skip(self, password))]
    pub async fn create(&self, email: &str, name: &str, password: &str) -> StoreResult<User> {
        let email = email.trim().to_owned();
        let name = name.trim().to_owned();
        if email.is_empty() {
            return Err(StoreError::InvalidArgument("email must not be empty".into()));
        }
        if password.is_empty() {
            return Err(StoreError::InvalidArgument("password must not be empty".into()));
        }

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
        let now = Utc::now().timestamp();

        let user = self
            .db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO users (email, name, password_hash, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    rusqlite::params![email, name, password_hash, now],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        StoreError::AlreadyExists {
                            entity: "user",
                            key: email.clone(),
                        }
                    } else {
                        StoreError::Sqlite(e)
                    }
                })?;
                Ok(User {
                    id: conn.last_insert_rowid(),
                    email,
                    name,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await?;

        debug!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Fetch a user by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> StoreResult<Option<User>> {
        let row = self
            .fetch_one(format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), id.into())
            .await?;
        Ok(row.map(|r| r.user))
    }

    /// Fetch a user by email, ignoring case.
    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = self
            .fetch_one(
                format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                email.trim().to_owned().into(),
            )
            .await?;
        Ok(row.map(|r| r.user))
    }

    /// Check credentials. `None` for an unknown email or a wrong password.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let Some(row) = self
            .fetch_one(
                format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                email.trim().to_owned().into(),
            )
            .await?
        else {
            return Ok(None);
        };

        let password = password.to_owned();
        let stored = row.password_hash;
        let valid =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await??;

        debug!(user_id = row.user.id, valid, "credentials checked");
        Ok(valid.then_some(row.user))
    }

    /// Total number of accounts.
    #[instrument(skip(self))]
    pub async fn count(&self) -> StoreResult<i64> {
        self.db
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .await
    }

    async fn fetch_one(
        &self,
        sql: String,
        key: rusqlite::types::Value,
    ) -> StoreResult<Option<UserRow>> {
        self.db
            .execute(move |conn| {
                match conn.query_row(&sql, rusqlite::params![key], read_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
