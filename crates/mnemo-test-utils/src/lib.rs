// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mnemo integration tests.
//!
//! Provides mock adapters and a temp SQLite harness for fast, deterministic,
//! CI-runnable tests without model files or network access.
//!
//! # Components
//!
//! - [`ScriptedEmbedder`] - Embedding adapter returning pre-configured vectors
//! - [`MockExtractor`] - Entity extractor returning a fixed digest
//! - [`FailingStorage`] / [`FailingRerankAdapter`] - Adapters that always error
//! - [`TestHarness`] - Temp database with conversation and message helpers

pub mod harness;
pub mod mock_adapters;
pub mod scripted_embedder;

pub use harness::TestHarness;
pub use mock_adapters::{FailingRerankAdapter, FailingStorage, MockExtractor};
pub use scripted_embedder::ScriptedEmbedder;
