// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for satchel-server.

pub mod encryption;
pub mod http;
pub mod logging;
pub mod paste;
pub mod sessions;

pub use encryption::{EncryptionConfig, EncryptionConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use paste::{PasteConfig, PasteConfigLayer};
pub use sessions::{SessionsConfig, SessionsConfigLayer};
