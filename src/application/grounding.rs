//! Grounding provider: live catalogue snapshot for reply prompts.

use std::sync::Arc;

use crate::domain::conversation::prompt::{build_reply_prompt, Catalogue};
use crate::domain::conversation::PromptSettings;
use crate::ports::ListingReader;

/// Builds the reply system prompt from whatever is marketable right now.
pub struct GroundingProvider {
    listings: Arc<dyn ListingReader>,
    settings: PromptSettings,
}

impl GroundingProvider {
    pub fn new(listings: Arc<dyn ListingReader>, settings: PromptSettings) -> Self {
        Self { listings, settings }
    }

    pub fn settings(&self) -> &PromptSettings {
        &self.settings
    }

    /// Fresh system prompt. A failed catalogue read yields a prompt that
    /// forbids quoting listings instead of an error.
    pub async fn system_prompt(&self) -> String {
        match self.listings.list_marketable().await {
            Ok(listings) => {
                tracing::debug!(listings = listings.len(), "grounding snapshot loaded");
                build_reply_prompt(&self.settings, Catalogue::Listings(&listings))
            }
            Err(e) => {
                tracing::warn!(error = %e, "listing catalogue unavailable for grounding");
                build_reply_prompt(&self.settings, Catalogue::Unavailable)
            }
        }
    }
}
