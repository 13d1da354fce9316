//! Listing reader port - the grounding provider's view of the catalogue.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::listing::Listing;

/// Read-only access to listings that may be offered right now.
#[async_trait]
pub trait ListingReader: Send + Sync {
    /// A fresh snapshot of marketable listings. Called on every reply.
    async fn list_marketable(&self) -> Result<Vec<Listing>, DomainError>;
}
