//! Marketable listings read straight from the property ledger table.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ListingId};
use crate::domain::listing::Listing;
use crate::ports::ListingReader;

#[derive(Clone)]
pub struct PostgresListingReader {
    pool: PgPool,
}

impl PostgresListingReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingReader for PostgresListingReader {
    async fn list_marketable(&self) -> Result<Vec<Listing>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, location, bedrooms, bathrooms, price, description
            FROM listings
            WHERE is_available AND is_published
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to fetch listings");
            DomainError::database(format!("Failed to fetch listings: {}", e))
        })?;

        rows.iter()
            .map(|row| {
                let decode =
                    |e: sqlx::Error| DomainError::database(format!("Bad listing row: {}", e));
                let id: Uuid = row.try_get("id").map_err(decode)?;
                let bedrooms: Option<i32> = row.try_get("bedrooms").map_err(decode)?;
                let bathrooms: Option<i32> = row.try_get("bathrooms").map_err(decode)?;

                Ok(Listing {
                    id: ListingId::from_uuid(id),
                    name: row.try_get("name").map_err(decode)?,
                    location: row.try_get("location").map_err(decode)?,
                    bedrooms: bedrooms.and_then(|b| u32::try_from(b).ok()),
                    bathrooms: bathrooms.and_then(|b| u32::try_from(b).ok()),
                    price: row.try_get("price").map_err(decode)?,
                    description: row.try_get("description").map_err(decode)?,
                })
            })
            .collect()
    }
}
