// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity/topic extraction trait consumed by conversation-vector recompute.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationDigest, Message};

/// Derives a summary, key entities, and topics from a message history.
#[async_trait]
pub trait EntityExtractor: PluginAdapter {
    async fn extract(&self, messages: &[Message]) -> Result<ConversationDigest, MnemoError>;
}
