//! Marketable property listings, as seen by the assistant.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ListingId;

/// A listing that can currently be offered to prospects.
///
/// Only the fields a prospect may be told about are carried; anything the
/// property ledger keeps for bookkeeping stays out of the assistant's view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub name: String,
    pub location: String,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub price: Option<f64>,
    pub description: Option<String>,
}

impl Listing {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: ListingId::new(),
            name: name.into(),
            location: location.into(),
            bedrooms: None,
            bathrooms: None,
            price: None,
            description: None,
        }
    }

    pub fn with_rooms(mut self, bedrooms: u32, bathrooms: u32) -> Self {
        self.bedrooms = Some(bedrooms);
        self.bathrooms = Some(bathrooms);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Case-insensitive name match, used to resolve names the model echoes
    /// back into listing ids.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}
