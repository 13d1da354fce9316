//! AI Provider Adapters.
//!
//! - `MockAIProvider` - scripted provider for tests and keyless runs
//! - `OpenAIProvider` - OpenAI chat completions
//! - `AnthropicProvider` - Anthropic Messages API

mod anthropic_provider;
mod http_support;
mod mock_provider;
mod openai_provider;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider, DEFAULT_ANTHROPIC_MODEL};
pub use mock_provider::{MockAIProvider, MockError, MockResponse, DEFAULT_MOCK_REPLY};
pub use openai_provider::{OpenAIConfig, OpenAIProvider, DEFAULT_OPENAI_MODEL};
