//! Removal of stale Unix socket files left behind by a previous instance.

use std::fs;
use std::io;

use camino::Utf8Path;
use tracing::{info, warn};

use super::LISTENER_TARGET;
use crate::diagnostics::{Diagnostic, DiagnosticStage};

/// Removes whatever filesystem entry occupies `path`.
///
/// Dangling symlinks count as entries. A failed removal never aborts startup:
/// it is logged and returned as a diagnostic, and the subsequent bind reports
/// the real problem if the path is still unusable.
pub fn remove_stale_socket(path: &Utf8Path) -> Option<Diagnostic> {
    match fs::symlink_metadata(path.as_std_path()) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
        _ => {}
    }

    match fs::remove_file(path.as_std_path()) {
        Ok(()) => {
            info!(
                target: LISTENER_TARGET,
                path = %path,
                "removed stale unix socket"
            );
            None
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(error) => {
            warn!(
                target: LISTENER_TARGET,
                path = %path,
                error = %error,
                "failed to remove stale unix socket"
            );
            Some(Diagnostic::new(
                DiagnosticStage::SocketHygiene,
                format!("failed to remove stale socket {path}: {error}"),
            ))
        }
    }
}
