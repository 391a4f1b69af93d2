//! Error types for scanner startup and shutdown.
//!
//! The steady-state tick and edge paths have no error cases; everything here
//! comes from acquiring or releasing hardware lines, or from a stop that
//! does not finish in time.

use core::fmt;

use crate::config::ConfigError;

/// Result alias that carries [`ScannerError`].
pub type Result<T> = std::result::Result<T, ScannerError>;

/// Which kind of line an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineRole {
    /// One of the animated output lines.
    Output,
    /// The button input line.
    Input,
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRole::Output => f.write_str("output"),
            LineRole::Input => f.write_str("input"),
        }
    }
}

/// Errors surfaced by [`Scanner`](crate::Scanner).
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// The configuration was rejected before anything was acquired.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A line could not be acquired or configured. Startup was unwound.
    #[error("failed to acquire {role} line {index}: {message}")]
    Acquisition {
        /// Output or input
        role: LineRole,
        /// Line index
        index: usize,
        /// Collaborator error, formatted
        message: String,
    },

    /// The edge handler could not be installed.
    ///
    /// Not fatal: the scanner keeps running at baseline speed and reports
    /// this through [`Scanner::degraded`](crate::Scanner::degraded).
    #[error("failed to register edge handler on input line {index}: {message}")]
    Registration {
        /// Input line index
        index: usize,
        /// Collaborator error, formatted
        message: String,
    },

    /// The engine thread could not be spawned. Startup was unwound.
    #[error("failed to spawn animation thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The engine did not exit within its bound. Output lines may still
    /// be lit and remain owned by the engine thread.
    #[error("animation engine did not stop within {waited_ms} ms")]
    StopTimeout {
        /// How long the stop waited
        waited_ms: u64,
    },

    /// The engine thread died without handing the output lines back.
    #[error("animation engine exited without returning its lines")]
    EngineLost,

    /// A line failed to release during teardown. Teardown still visited
    /// every other line.
    #[error("failed to release {role} line {index}: {message}")]
    Release {
        /// Output or input
        role: LineRole,
        /// Line index
        index: usize,
        /// Collaborator error, formatted
        message: String,
    },
}

impl ScannerError {
    pub(crate) fn acquisition(role: LineRole, index: usize, err: impl fmt::Debug) -> Self {
        Self::Acquisition {
            role,
            index,
            message: format!("{err:?}"),
        }
    }

    pub(crate) fn release(role: LineRole, index: usize, err: impl fmt::Debug) -> Self {
        Self::Release {
            role,
            index,
            message: format!("{err:?}"),
        }
    }

    pub(crate) fn registration(index: usize, err: impl fmt::Debug) -> Self {
        Self::Registration {
            index,
            message: format!("{err:?}"),
        }
    }

    /// Whether this error left hardware in an unknown state.
    ///
    /// True for [`StopTimeout`](Self::StopTimeout) and
    /// [`EngineLost`](Self::EngineLost), where lines may be left lit.
    pub fn is_fatal_shutdown(&self) -> bool {
        matches!(
            self,
            ScannerError::StopTimeout { .. } | ScannerError::EngineLost
        )
    }
}
