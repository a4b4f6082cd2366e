// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable helpers shared by satchel crates.

pub mod env;

pub use env::{
	env_flag, load_secret_env, parse_flag, require_secret_env, RequiredSecretError, SecretEnvError,
};
pub use satchel_common_secret::{Secret, SecretString};
