// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for the Mixpanel track crates.
//!
//! This crate provides a pre-configured HTTP client with a consistent
//! User-Agent header.

mod client;

pub use client::{builder, builder_with_user_agent, user_agent};
