use std::io;

use thiserror::Error;

/// Errors that can escape the public surface of this crate.
///
/// Most of the error kinds described by the design (mismatched start/stop,
/// hash collisions, depth overflow) are deliberately *not* represented here:
/// per the propagation policy, those are corrected in place and reported
/// through the `log` facade instead of returned to the caller. Only the
/// handful of failures that leave the caller with nothing useful to continue
/// with are surfaced as [`ProfileError`].
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A [`Settings`][crate::settings::Settings] value was invalid and could
    /// not be applied; the field retains its previous (or default) value.
    #[error("invalid setting `{key}`: {reason}")]
    Configuration {
        key: &'static str,
        reason: String,
    },

    /// A report could not be written to its destination.
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Merge ran out of memory while stitching worker trees into the master
    /// tree. Finalization aborts without emitting a partial report.
    #[error("finalization aborted: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, ProfileError>;
