//! Prospect conversations: identity, ownership status, transcript, and
//! the lead data extracted along the way.

mod aggregate;
mod channel;
pub mod events;
mod extractor;
mod lead;
mod message;
pub mod prompt;
mod status;

pub use aggregate::Conversation;
pub use channel::{Channel, ProspectIdentity};
pub use events::{ConversationCreated, MessageRecorded, StatusChanged};
pub use extractor::{locate_json_object, ExtractionError, LeadExtractor};
pub use lead::{
    Intent, LeadProfile, LeadUpdate, Patch, Preferences, PreferencesUpdate, Schedule,
    ScheduleUpdate,
};
pub use message::{Direction, Message, SenderType};
pub use prompt::{Catalogue, PromptSettings};
pub use status::ConversationStatus;
