// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for satchel.
//!
//! This crate provides:
//! - A client builder with a consistent User-Agent header
//! - Retry logic with exponential backoff for transient failures

mod client;
mod retry;

pub use client::{builder, client_with_timeout, user_agent};
pub use retry::{is_retryable_status, retry, RetryConfig, RetryableError};
