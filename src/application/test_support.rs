//! In-memory wiring shared by adapter unit tests.

use std::sync::Arc;

use crate::adapters::ai::MockAIProvider;
use crate::adapters::events::InMemoryEventBus;
use crate::adapters::memory::{
    InMemoryConversationRepository, InMemoryMessageRepository, StaticListingReader,
};
use crate::adapters::messaging::RecordingMessenger;
use crate::domain::conversation::PromptSettings;
use crate::ports::AIProvider;

use super::{
    ConversationOrchestrator, ConversationQueries, GroundingProvider, LeadExtractionEngine,
    OutboundChannelAdapter, ResponseGenerator,
};

pub(crate) struct TestStack {
    pub conversations: InMemoryConversationRepository,
    pub messages: InMemoryMessageRepository,
    pub messenger: RecordingMessenger,
    pub bus: Arc<InMemoryEventBus>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub queries: Arc<ConversationQueries>,
}

pub(crate) fn in_memory_stack(provider: MockAIProvider) -> TestStack {
    in_memory_stack_with_bus(provider, Arc::new(InMemoryEventBus::recording()))
}

pub(crate) fn in_memory_stack_with_bus(
    provider: MockAIProvider,
    bus: Arc<InMemoryEventBus>,
) -> TestStack {
    let conversations = InMemoryConversationRepository::new();
    let messages = InMemoryMessageRepository::new();
    let listings = StaticListingReader::default();
    let messenger = RecordingMessenger::new();
    let ai: Arc<dyn AIProvider> = Arc::new(provider);

    let orchestrator = ConversationOrchestrator::new(
        Arc::new(conversations.clone()),
        Arc::new(messages.clone()),
        GroundingProvider::new(Arc::new(listings.clone()), PromptSettings::default()),
        ResponseGenerator::new(Some(ai)),
        Arc::new(LeadExtractionEngine::new(
            Arc::new(conversations.clone()),
            Arc::new(messages.clone()),
            Arc::new(listings),
            None,
        )),
        OutboundChannelAdapter::new(Arc::new(messenger.clone())),
        bus.clone(),
    );
    let queries = ConversationQueries::new(
        Arc::new(conversations.clone()),
        Arc::new(messages.clone()),
    );

    TestStack {
        conversations,
        messages,
        messenger,
        bus,
        orchestrator: Arc::new(orchestrator),
        queries: Arc::new(queries),
    }
}
