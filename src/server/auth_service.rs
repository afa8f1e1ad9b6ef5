//! Accounts and bearer tokens for the Memordo backend.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-user salt.
//! Access and refresh tokens are random opaque strings; only their SHA-256
//! digest is persisted.

use std::num::NonZeroU32;

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use base64::Engine as _;
use log::info;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use rusqlite::{params, Connection, OptionalExtension};
use zeroize::Zeroize;

use crate::types::errors::AuthError;
use crate::types::session::TokenPair;

/// PBKDF2 iteration count for password hashing.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes for PBKDF2.
const SALT_LENGTH: usize = 16;

/// Derived hash length in bytes.
const HASH_LENGTH: usize = 32;

/// Random bytes per issued token.
const TOKEN_LENGTH: usize = 32;

/// Minimum accepted password length on registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const KIND_ACCESS: &str = "access";
const KIND_REFRESH: &str = "refresh";

/// Lifetimes of issued tokens, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl_secs: 60 * 60,
            refresh_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// Encoded PBKDF2 digest and salt of one password, as stored in `users`.
///
/// Deriving and verifying are CPU-bound; callers on an async runtime run
/// them off the reactor and without the database lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub hash: String,
    pub salt: String,
}

impl PasswordDigest {
    /// Hashes `password` under a fresh random salt.
    pub fn derive(password: &str) -> Result<Self, AuthError> {
        let salt = random_bytes(&SystemRandom::new(), SALT_LENGTH)?;
        let mut hash = vec![0u8; HASH_LENGTH];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations()?,
            &salt,
            password.as_bytes(),
            &mut hash,
        );
        let encoded = BASE64.encode(&hash);
        hash.zeroize();
        Ok(Self {
            hash: encoded,
            salt: BASE64.encode(&salt),
        })
    }

    pub fn verify(&self, password: &str) -> Result<(), AuthError> {
        let hash = BASE64
            .decode(&self.hash)
            .map_err(|e| AuthError::CryptoError(e.to_string()))?;
        let salt = BASE64
            .decode(&self.salt)
            .map_err(|e| AuthError::CryptoError(e.to_string()))?;
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations()?,
            &salt,
            password.as_bytes(),
            &hash,
        )
        .map_err(|_| AuthError::InvalidCredentials)
    }
}

/// A stored account looked up by email.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password: PasswordDigest,
}

fn iterations() -> Result<NonZeroU32, AuthError> {
    NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or_else(|| AuthError::CryptoError("Invalid iteration count".to_string()))
}

fn random_bytes(rng: &SystemRandom, length: usize) -> Result<Vec<u8>, AuthError> {
    let mut buf = vec![0u8; length];
    rng.fill(&mut buf)
        .map_err(|_| AuthError::CryptoError("Failed to generate random bytes".to_string()))?;
    Ok(buf)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks registration input, returning the normalized email.
pub fn validate_registration(email: &str, password: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidInput("a valid email is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(email)
}

/// Trait defining account and token operations.
pub trait AuthServiceTrait {
    fn register(&self, email: &str, password: &str) -> Result<i64, AuthError>;
    fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;
    /// Resolves an access token to the owning user id.
    fn authenticate(&self, access_token: &str) -> Result<i64, AuthError>;
    /// Exchanges a refresh token for a new pair; the old refresh token is consumed.
    fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}

/// Auth service backed by a SQLite connection.
pub struct AuthService<'a> {
    conn: &'a Connection,
    policy: TokenPolicy,
    rng: SystemRandom,
}

impl<'a> AuthService<'a> {
    pub fn new(conn: &'a Connection, policy: TokenPolicy) -> Self {
        Self {
            conn,
            policy,
            rng: SystemRandom::new(),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn token_digest(token: &str) -> String {
        BASE64.encode(digest::digest(&digest::SHA256, token.as_bytes()).as_ref())
    }

    /// Fails with `EmailTaken` when an account already uses `email`.
    pub fn ensure_email_free(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let exists: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if exists {
            return Err(AuthError::EmailTaken(email));
        }
        Ok(())
    }

    /// Stores a new account with an already derived password digest.
    pub fn insert_user(&self, email: &str, password: &PasswordDigest) -> Result<i64, AuthError> {
        let email = normalize_email(email);
        self.ensure_email_free(&email)?;
        self.conn
            .execute(
                "INSERT INTO users (email, password_hash, salt, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![email, password.hash, password.salt, Self::now()],
            )
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let id = self.conn.last_insert_rowid();
        info!("[auth] registered user {} ({})", id, email);
        Ok(id)
    }

    /// Looks up an account by email; an unknown email is `InvalidCredentials`.
    pub fn account(&self, email: &str) -> Result<Account, AuthError> {
        let email = normalize_email(email);
        let row: Option<(i64, String, String)> = self
            .conn
            .query_row(
                "SELECT id, password_hash, salt FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let (id, hash, salt) = row.ok_or(AuthError::InvalidCredentials)?;
        Ok(Account {
            id,
            email,
            password: PasswordDigest { hash, salt },
        })
    }

    fn issue_token(&self, user_id: i64, kind: &str, ttl: i64) -> Result<String, AuthError> {
        let raw = random_bytes(&self.rng, TOKEN_LENGTH)?;
        let token = URL_SAFE_NO_PAD.encode(&raw);
        self.conn
            .execute(
                "INSERT INTO auth_tokens (token_hash, user_id, kind, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![Self::token_digest(&token), user_id, kind, Self::now().saturating_add(ttl)],
            )
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        Ok(token)
    }

    /// Issues a fresh access/refresh pair for an authenticated user.
    pub fn issue_pair(&self, user_id: i64, email: String) -> Result<TokenPair, AuthError> {
        // Drop this user's expired tokens.
        self.conn
            .execute(
                "DELETE FROM auth_tokens WHERE user_id = ?1 AND expires_at <= ?2",
                params![user_id, Self::now()],
            )
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(TokenPair {
            access_token: self.issue_token(user_id, KIND_ACCESS, self.policy.access_ttl_secs)?,
            refresh_token: self.issue_token(user_id, KIND_REFRESH, self.policy.refresh_ttl_secs)?,
            email,
        })
    }

    /// Looks up a token of the given kind, returning its user id.
    fn resolve(&self, token: &str, kind: &str) -> Result<i64, AuthError> {
        let row: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT user_id, expires_at FROM auth_tokens WHERE token_hash = ?1 AND kind = ?2",
                params![Self::token_digest(token), kind],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        match row {
            None => Err(AuthError::InvalidToken),
            Some((_, expires_at)) if expires_at <= Self::now() => Err(AuthError::ExpiredToken),
            Some((user_id, _)) => Ok(user_id),
        }
    }
}

impl<'a> AuthServiceTrait for AuthService<'a> {
    fn register(&self, email: &str, password: &str) -> Result<i64, AuthError> {
        let email = validate_registration(email, password)?;
        self.ensure_email_free(&email)?;
        self.insert_user(&email, &PasswordDigest::derive(password)?)
    }

    fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let account = self.account(email)?;
        account.password.verify(password)?;
        info!("[auth] user {} logged in", account.id);
        self.issue_pair(account.id, account.email)
    }

    fn authenticate(&self, access_token: &str) -> Result<i64, AuthError> {
        self.resolve(access_token, KIND_ACCESS)
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let user_id = self.resolve(refresh_token, KIND_REFRESH)?;
        self.conn
            .execute(
                "DELETE FROM auth_tokens WHERE token_hash = ?1",
                params![Self::token_digest(refresh_token)],
            )
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let email: String = self
            .conn
            .query_row(
                "SELECT email FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        self.issue_pair(user_id, email)
    }
}
