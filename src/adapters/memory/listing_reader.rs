//! Fixed listing catalogue for tests and demo runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::foundation::DomainError;
use crate::domain::listing::Listing;
use crate::ports::ListingReader;

#[derive(Debug, Clone, Default)]
pub struct StaticListingReader {
    listings: Arc<RwLock<Vec<Listing>>>,
    failing: Arc<AtomicBool>,
}

impl StaticListingReader {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(RwLock::new(listings)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn replace(&self, listings: Vec<Listing>) {
        *self.listings.write().unwrap_or_else(|e| e.into_inner()) = listings;
    }

    /// Makes every read fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ListingReader for StaticListingReader {
    async fn list_marketable(&self) -> Result<Vec<Listing>, DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::database("listing catalogue unavailable"));
        }
        Ok(self
            .listings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_current_snapshot() {
        let reader = StaticListingReader::new(vec![Listing::new("A", "Lekki")]);
        assert_eq!(reader.list_marketable().await.unwrap().len(), 1);

        reader.replace(Vec::new());
        assert!(reader.list_marketable().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn can_be_made_to_fail() {
        let reader = StaticListingReader::default();
        reader.set_failing(true);
        assert!(reader.list_marketable().await.is_err());
        reader.set_failing(false);
        assert!(reader.list_marketable().await.is_ok());
    }
}
