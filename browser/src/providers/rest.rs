//! Listing source backed by a PostgREST-style HTTP endpoint.

use crate::config::ListingSourceConfig;
use crate::error::{MapError, Result};
use crate::geo::Coordinates;
use crate::listing::{Listing, ListingFilter};
use crate::providers::ListingSource;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;

const COLUMNS: &str = "id,title,price_per_hour,location,lat,lng";

/// Reads listings from `{url}/rest/v1/{table}`.
#[derive(Clone)]
pub struct RestListingSource {
    client: Client,
    endpoint: String,
    api_key: String,
    default_limit: usize,
}

impl std::fmt::Debug for RestListingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestListingSource")
            .field("endpoint", &self.endpoint)
            .field("default_limit", &self.default_limit)
            .finish_non_exhaustive()
    }
}

impl RestListingSource {
    /// Create a source from its configuration.
    #[must_use]
    pub fn new(config: &ListingSourceConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a source sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: &ListingSourceConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/rest/v1/{}", config.url.trim_end_matches('/'), config.table),
            api_key: config.api_key.clone(),
            default_limit: config.limit,
        }
    }

    /// Endpoint queried by this source.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let params = query_params(filter, self.default_limit);
        tracing::debug!(endpoint = %self.endpoint, ?params, "Querying listings");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MapError::ListingFetch(format!(
                "{} returned {}: {body}",
                self.endpoint,
                status.as_u16()
            )));
        }

        let rows = response.json::<Vec<ListingRow>>().await?;
        Ok(rows.into_iter().map(ListingRow::into_listing).collect())
    }
}

impl ListingSource for RestListingSource {
    fn fetch(&self, filter: &ListingFilter) -> impl Future<Output = Result<Vec<Listing>>> + Send {
        let source = self.clone();
        let filter = filter.clone();
        async move { source.query(&filter).await }
    }
}

/// PostgREST query parameters for a filter.
fn query_params(filter: &ListingFilter, default_limit: usize) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", COLUMNS.to_string())];

    if let Some(location) = filter.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        params.push(("location", format!("ilike.*{location}*")));
    }
    if let Some(min) = filter.min_rate {
        params.push(("price_per_hour", format!("gte.{min}")));
    }
    if let Some(max) = filter.max_rate {
        params.push(("price_per_hour", format!("lte.{max}")));
    }
    if let Some(bounds) = &filter.within {
        params.push(("lat", format!("gte.{}", bounds.south)));
        params.push(("lat", format!("lte.{}", bounds.north)));
        params.push(("lng", format!("gte.{}", bounds.west)));
        params.push(("lng", format!("lte.{}", bounds.east)));
    }
    params.push(("limit", filter.limit.unwrap_or(default_limit).to_string()));
    params
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    price_per_hour: Value,
    #[serde(default)]
    location: String,
    #[serde(default)]
    lat: Value,
    #[serde(default)]
    lng: Value,
}

impl ListingRow {
    fn into_listing(self) -> Listing {
        let id = match self.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        let mut listing = Listing::new(
            id,
            self.title,
            number(&self.price_per_hour).unwrap_or(0.0),
            self.location,
        );
        // Partial coordinates make the listing unmappable
        if let (Some(lat), Some(lng)) = (number(&self.lat), number(&self.lng)) {
            listing.coordinates = Some(Coordinates::new(lat, lng));
        }
        listing
    }
}

/// `numeric` columns may arrive as JSON numbers or strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
