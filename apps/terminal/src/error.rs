//! # Terminal Error Type
//!
//! Everything a command can fail with, mapped to a machine-readable code and
//! a process exit status.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  CoreError / DbError / ServiceError / ConfigError / io::Error        │
//! │       │                                                              │
//! │       ▼                                                              │
//! │  AppError ──► code  (UNAUTHORIZED, INSUFFICIENT_STOCK, ...)          │
//! │           ──► exit  (2 usage, 3 rejected, 4 unauthorized, 5 storage) │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use sari_core::{CoreError, ValidationError};
use sari_db::{DbError, ServiceError};

/// Error codes for `--json` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad command line
    Usage,

    /// Input validation failed
    ValidationError,

    /// Resource not found
    NotFound,

    /// Admin PIN refused
    Unauthorized,

    /// Cart or payment precondition failed
    CartError,

    /// Not enough stock
    InsufficientStock,

    /// Configuration could not be loaded
    ConfigError,

    /// Database operation failed
    DatabaseError,

    /// File could not be read or written
    IoError,
}

impl ErrorCode {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::Usage | ErrorCode::ConfigError => 2,
            ErrorCode::ValidationError
            | ErrorCode::NotFound
            | ErrorCode::CartError
            | ErrorCode::InsufficientStock => 3,
            ErrorCode::Unauthorized => 4,
            ErrorCode::DatabaseError | ErrorCode::IoError => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),

    /// Command line rejected by the parser.
    #[error("{}", first_line(.0))]
    Cli(#[from] clap::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    pub fn usage(message: impl Into<String>) -> Self {
        AppError::Usage(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Usage(_) | AppError::Cli(_) => ErrorCode::Usage,
            AppError::Config(_) => ErrorCode::ConfigError,
            AppError::Io(_) | AppError::Output(_) => ErrorCode::IoError,
            AppError::Service(ServiceError::StorageFailure(_)) => ErrorCode::DatabaseError,
            AppError::Service(ServiceError::Core(err)) => core_code(err),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }
}

/// clap renders "error: <message>" followed by usage hints.
fn first_line(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

fn core_code(err: &CoreError) -> ErrorCode {
    match err {
        CoreError::Unauthorized => ErrorCode::Unauthorized,
        CoreError::InsufficientStock { .. } | CoreError::StockExceeded { .. } => {
            ErrorCode::InsufficientStock
        }
        CoreError::EmptyCart
        | CoreError::InsufficientPayment { .. }
        | CoreError::ProductNotInCart(_)
        | CoreError::CartNotFound(_)
        | CoreError::CartTooLarge { .. } => ErrorCode::CartError,
        CoreError::ProductNotFound(_)
        | CoreError::SaleNotFound(_)
        | CoreError::LineNotInSale { .. } => ErrorCode::NotFound,
        CoreError::NoItemsSelected
        | CoreError::InvalidReportRange { .. }
        | CoreError::Csv(_)
        | CoreError::Validation(_) => ErrorCode::ValidationError,
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Service(ServiceError::Core(err))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Service(ServiceError::Core(err.into()))
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        AppError::Service(ServiceError::StorageFailure(err))
    }
}

/// What `--json` prints on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        ErrorBody {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
