//! Top-level error type for command execution.

use thiserror::Error;

use crate::dashboard::DashboardError;
use crate::feed::{FeedError, FetchError};
use crate::settings::SettingsError;
use crate::workspace::WorkspaceError;

/// Any failure that ends a command.
///
/// Per-feed problems during a scan are not represented here; the scanner
/// records them in its report and carries on.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
