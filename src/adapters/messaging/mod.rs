//! Phone messaging adapters.
//!
//! - `CloudApiMessenger` - production sends over the cloud messaging API
//! - `RecordingMessenger` - captures sends for tests and dry runs

mod cloud_api;
mod recording;

pub use cloud_api::{CloudApiConfig, CloudApiMessenger};
pub use recording::{RecordingMessenger, SentText};
