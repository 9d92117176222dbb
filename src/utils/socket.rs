//! Unix socket utility functions
//!
//! Provides common operations for Unix socket management including
//! safe removal, directory creation, permission setting, and group
//! ownership assignment.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Error type for socket operations
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("Refusing to replace symlink at {path}: potential security risk")]
    SymlinkDetected { path: String },

    #[error("Failed to check existing socket at {path}: {source}")]
    MetadataError { path: String, source: io::Error },

    #[error("Failed to remove existing socket at {path}: {source}")]
    RemoveError { path: String, source: io::Error },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirError { path: String, source: io::Error },

    #[error("Failed to set permissions on socket at {path}: {source}")]
    PermissionError { path: String, source: io::Error },

    #[error("Unknown group: {name}")]
    UnknownGroup { name: String },

    #[error("Failed to look up group {name}: {source}")]
    GroupLookupError { name: String, source: io::Error },

    #[error("Failed to change group of {path}: {source}")]
    ChownError { path: String, source: io::Error },
}

/// Safely remove an existing socket file if present.
///
/// This function uses `symlink_metadata` instead of `exists` to prevent
/// TOCTOU race conditions. If the path is a symlink, it returns an error
/// to prevent potential symlink attacks.
pub fn remove_existing_socket(path: &Path) -> Result<(), SocketError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_symlink() {
                return Err(SocketError::SymlinkDetected {
                    path: path.display().to_string(),
                });
            }
            fs::remove_file(path).map_err(|e| SocketError::RemoveError {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // Nothing stale to clean up
        }
        Err(e) => {
            return Err(SocketError::MetadataError {
                path: path.display().to_string(),
                source: e,
            });
        }
    }
    Ok(())
}

/// Ensure the parent directory of a path exists.
pub fn ensure_parent_dir(path: &Path) -> Result<(), SocketError> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| SocketError::CreateDirError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Set socket permissions to owner and group read/write (0660).
///
/// Others get nothing: access to the socket is exactly "the daemon user plus
/// the caller group", nobody else.
pub fn set_socket_permissions(path: &Path) -> Result<(), SocketError> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o660)).map_err(|e| {
        SocketError::PermissionError {
            path: path.display().to_string(),
            source: e,
        }
    })
}

/// Resolve a group name to its gid via `getgrnam_r`.
pub fn lookup_group(name: &str) -> Result<libc::gid_t, SocketError> {
    let c_name = CString::new(name).map_err(|_| SocketError::UnknownGroup {
        name: name.to_string(),
    })?;

    let mut grp: libc::group = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::group = std::ptr::null_mut();
    let mut buf = vec![0u8; 4096];

    // SAFETY: buffers are live for the duration of the call and sized per its
    // contract; result aliases grp only when the call succeeds.
    let rc = unsafe {
        libc::getgrnam_r(
            c_name.as_ptr(),
            &mut grp,
            buf.as_mut_ptr() as *mut libc::c_char,
            buf.len(),
            &mut result,
        )
    };

    if rc != 0 {
        return Err(SocketError::GroupLookupError {
            name: name.to_string(),
            source: io::Error::from_raw_os_error(rc),
        });
    }
    if result.is_null() {
        return Err(SocketError::UnknownGroup {
            name: name.to_string(),
        });
    }
    Ok(grp.gr_gid)
}

/// Change the group of the socket, leaving the owner untouched.
pub fn set_socket_group(path: &Path, gid: libc::gid_t) -> Result<(), SocketError> {
    let c_path = CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
        SocketError::ChownError {
            path: path.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"),
        }
    })?;

    // uid -1 keeps the current owner
    // SAFETY: c_path is a valid NUL-terminated path for the duration of the call
    let rc = unsafe { libc::chown(c_path.as_ptr(), libc::uid_t::MAX, gid) };
    if rc != 0 {
        return Err(SocketError::ChownError {
            path: path.display().to_string(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Prepare a path for socket binding.
///
/// 1. Removes any existing socket file (with symlink protection)
/// 2. Creates the parent directory if needed
///
/// Call `set_socket_permissions` and `set_socket_group` after binding.
pub fn prepare_socket_path(path: &Path) -> Result<(), SocketError> {
    remove_existing_socket(path)?;
    ensure_parent_dir(path)?;
    Ok(())
}
