//! Extraction engine.
//!
//! After an AI-path exchange the orchestrator hands the conversation id to
//! [`LeadExtractionEngine::spawn`]. The pass runs on its own task: it reads
//! the transcript, asks the model for the fixed lead JSON shape, and merges
//! whatever it finds into the stored lead profile. Nothing it does can fail
//! the exchange that triggered it.
//!
//! Passes for one conversation may overlap. The read-merge-write at the end
//! of a pass holds a per-conversation lock so no pass overwrites facts
//! another pass has just stored.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::conversation::prompt::{build_extraction_input, EXTRACTION_INSTRUCTIONS};
use crate::domain::conversation::{ExtractionError, LeadExtractor, LeadUpdate, Patch};
use crate::domain::foundation::{ConversationId, DomainError, ListingId};
use crate::domain::listing::Listing;
use crate::ports::{
    AIError, AIProvider, ChatRole, CompletionRequest, ConversationRepository, ListingReader,
    MessageRepository,
};

/// Generous enough for the whole JSON shape with a long summary.
const EXTRACTION_MAX_TOKENS: u32 = 1_000;

/// Why one extraction pass produced nothing.
#[derive(Debug, Error)]
pub enum ExtractionPassError {
    #[error("no language model configured")]
    NoProvider,

    #[error("conversation {0} not found")]
    NotFound(ConversationId),

    #[error("completion failed: {0}")]
    Provider(#[from] AIError),

    #[error("unusable extraction output: {0}")]
    Parse(#[from] ExtractionError),

    #[error("store error: {0}")]
    Store(#[from] DomainError),
}

pub struct LeadExtractionEngine {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    listings: Arc<dyn ListingReader>,
    provider: Option<Arc<dyn AIProvider>>,
    parser: LeadExtractor,
    merge_locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl LeadExtractionEngine {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        listings: Arc<dyn ListingReader>,
        provider: Option<Arc<dyn AIProvider>>,
    ) -> Self {
        Self {
            conversations,
            messages,
            listings,
            provider,
            parser: LeadExtractor::new(),
            merge_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one pass on a detached task. Errors stop at the task boundary.
    pub fn spawn(self: &Arc<Self>, conversation_id: ConversationId) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            match engine.extract(conversation_id).await {
                Ok(true) => {
                    tracing::debug!(%conversation_id, "lead profile updated");
                }
                Ok(false) => {}
                Err(ExtractionPassError::NoProvider) => {
                    tracing::trace!(%conversation_id, "extraction skipped, no model configured");
                }
                Err(e) => {
                    tracing::warn!(%conversation_id, error = %e, "lead extraction discarded");
                }
            }
        })
    }

    /// Runs one pass inline. Returns whether the stored lead changed.
    pub async fn extract(&self, conversation_id: ConversationId) -> Result<bool, ExtractionPassError> {
        let provider = self.provider.as_ref().ok_or(ExtractionPassError::NoProvider)?;

        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(ExtractionPassError::NotFound(conversation_id))?;
        let transcript = self.messages.transcript(conversation_id).await?;
        if transcript.is_empty() {
            return Ok(false);
        }

        let request = CompletionRequest::new()
            .with_system_prompt(EXTRACTION_INSTRUCTIONS)
            .with_message(
                ChatRole::User,
                build_extraction_input(conversation.lead(), &transcript),
            )
            .with_max_tokens(EXTRACTION_MAX_TOKENS)
            .with_temperature(0.0)
            .for_conversation(conversation_id);
        let response = provider.complete(request).await?;

        let mut update = self.parser.parse(&response.content)?;
        self.resolve_interested_properties(&mut update).await;
        if update.is_empty() {
            return Ok(false);
        }

        let lock = self.merge_lock(conversation_id).await;
        let _guard = lock.lock().await;

        // Re-read so the merge lands on the latest stored profile rather
        // than the snapshot the model saw.
        let mut latest = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(ExtractionPassError::NotFound(conversation_id))?;
        if !latest.apply_lead_update(update) {
            return Ok(false);
        }
        self.conversations.update_lead(&latest).await?;
        Ok(true)
    }

    /// Lock for one conversation's lead merge. Entries nobody holds are
    /// pruned on the way in.
    async fn merge_lock(&self, conversation_id: ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.merge_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(conversation_id).or_default().clone()
    }

    /// Maps listing names the model echoed back onto catalogue ids. Names
    /// that match nothing are dropped; if none match, the field is left
    /// untouched.
    async fn resolve_interested_properties(&self, update: &mut LeadUpdate) {
        let Patch::Value(names) = &update.interested_properties else {
            return;
        };
        if names.is_empty() {
            return;
        }

        let catalogue = match self.listings.list_marketable().await {
            Ok(listings) => listings,
            Err(e) => {
                tracing::debug!(error = %e, "catalogue unavailable, interested properties skipped");
                return;
            }
        };

        let ids = match_listing_ids(names, &catalogue);
        if !ids.is_empty() {
            update.interested_property_ids = Patch::Value(ids);
        }
    }
}

fn match_listing_ids(names: &[String], catalogue: &[Listing]) -> Vec<ListingId> {
    let mut ids: Vec<ListingId> = Vec::new();
    for name in names {
        if let Some(listing) = catalogue.iter().find(|l| l.matches_name(name)) {
            if !ids.contains(&listing.id) {
                ids.push(listing.id);
            }
        }
    }
    ids
}
