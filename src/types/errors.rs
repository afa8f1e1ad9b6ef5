use std::fmt;

// === StoreError ===

/// Errors raised by the extension's local key-value store.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    IoError(String),
    /// A stored value could not be serialized or deserialized.
    SerializationError(String),
    /// A stored value has an unexpected shape for its key.
    InvalidValue(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IoError(msg) => write!(f, "Store I/O error: {}", msg),
            StoreError::SerializationError(msg) => {
                write!(f, "Store serialization error: {}", msg)
            }
            StoreError::InvalidValue(msg) => write!(f, "Invalid stored value: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// === BackendError ===

/// Errors returned by calls from the extension to the history backend.
#[derive(Debug)]
pub enum BackendError {
    /// The backend rejected the access token (HTTP 403).
    Rejected(String),
    /// The backend answered with a non-success status.
    HttpStatus(u16, String),
    /// The request never produced a response.
    NetworkError(String),
    /// The response body could not be decoded.
    DecodeError(String),
}

impl BackendError {
    /// True when the backend refused the session and the local one must be torn down.
    pub fn is_session_rejected(&self) -> bool {
        matches!(self, BackendError::Rejected(_))
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Rejected(msg) => write!(f, "Session rejected by backend: {}", msg),
            BackendError::HttpStatus(status, msg) => {
                write!(f, "Backend returned status {}: {}", status, msg)
            }
            BackendError::NetworkError(msg) => write!(f, "Backend network error: {}", msg),
            BackendError::DecodeError(msg) => {
                write!(f, "Backend response decode error: {}", msg)
            }
        }
    }
}

impl std::error::Error for BackendError {}

// === SessionError ===

/// Errors related to the extension's login session.
#[derive(Debug)]
pub enum SessionError {
    /// No access token is stored.
    NotLoggedIn,
    /// The backend refused the login attempt.
    LoginFailed(String),
    /// The local store failed while reading or writing session keys.
    StorageError(String),
    /// A backend call made on behalf of the session failed.
    Backend(BackendError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotLoggedIn => write!(f, "Not logged in"),
            SessionError::LoginFailed(msg) => write!(f, "Login failed: {}", msg),
            SessionError::StorageError(msg) => write!(f, "Session storage error: {}", msg),
            SessionError::Backend(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::StorageError(err.to_string())
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::Backend(err)
    }
}

// === HistoryError ===

/// Errors related to server-side visit history operations.
#[derive(Debug)]
pub enum HistoryError {
    /// A request parameter failed validation.
    InvalidInput(String),
    /// Database operation failed.
    DatabaseError(String),
    /// The batch transaction could not be opened or committed.
    TransactionError(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::InvalidInput(msg) => write!(f, "Invalid history request: {}", msg),
            HistoryError::DatabaseError(msg) => write!(f, "History database error: {}", msg),
            HistoryError::TransactionError(msg) => {
                write!(f, "History transaction error: {}", msg)
            }
        }
    }
}

impl std::error::Error for HistoryError {}

// === AuthError ===

/// Errors related to server-side accounts and bearer tokens.
#[derive(Debug)]
pub enum AuthError {
    /// Email/password pair did not match an account.
    InvalidCredentials,
    /// An account with this email already exists.
    EmailTaken(String),
    /// The presented token is unknown.
    InvalidToken,
    /// The presented token is past its expiry.
    ExpiredToken,
    /// Registration or login input failed validation.
    InvalidInput(String),
    /// Random generation or key derivation failed.
    CryptoError(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::EmailTaken(email) => write!(f, "Email already registered: {}", email),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
            AuthError::InvalidInput(msg) => write!(f, "Invalid auth request: {}", msg),
            AuthError::CryptoError(msg) => write!(f, "Auth crypto error: {}", msg),
            AuthError::DatabaseError(msg) => write!(f, "Auth database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

// === ConfigError ===

/// Errors related to loading server or client configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the config file.
    IoError(String),
    /// Failed to parse the config file.
    SerializationError(String),
    /// A config or environment value is invalid.
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
