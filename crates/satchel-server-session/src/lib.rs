// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session manifest path resolution for satchel.
//!
//! Session ids are hashed before they touch the filesystem, so ids with path
//! separators or `..` cannot escape the session root.

pub mod error;
pub mod paths;

pub use error::{SessionPathError, SessionPathResult};
pub use paths::{
	resolve_session_manifest_path, session_dir, session_hash, PathOverridePolicy,
	LEGACY_SESSIONS_DIR_VAR, MANIFEST_PATH_VAR, SESSION_DIR_VAR, SESSION_ROOT_VAR,
};
