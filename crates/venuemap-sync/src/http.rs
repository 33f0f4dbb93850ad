//! HTTP client for the hosted PostgREST backend that serves the venue directory.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use venuemap_core::region::distinct_sorted;
use venuemap_core::{EventRecord, VenueRecord};

use crate::{SyncError, VenueStore};

const VENUE_TABLE: &str = "Venue";
const EVENT_TABLE: &str = "Event";
/// Embeds each event's venue through the listing foreign key.
const EVENT_SELECT: &str = "*,venue:Venue!Event_listingId_fkey(*)";

/// REST client for the backend's `/rest/v1` table endpoints.
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct CountyOnly {
    county: Option<String>,
}

#[derive(Deserialize)]
struct AuthorityOnly {
    local_authority: Option<String>,
}

/// One table read: column selection, equality filters, ordering, and a row window.
#[derive(Debug, Default)]
struct TableQuery<'a> {
    select: &'a str,
    filters: Vec<(&'a str, String)>,
    order: Option<&'a str>,
    window: Option<(usize, usize)>,
}

impl<'a> TableQuery<'a> {
    fn select(select: &'a str) -> Self {
        Self {
            select,
            ..Self::default()
        }
    }

    fn eq(mut self, column: &'a str, value: impl ToString) -> Self {
        self.filters.push((column, format!("eq.{}", value.to_string())));
        self
    }

    fn order(mut self, order: &'a str) -> Self {
        self.order = Some(order);
        self
    }

    fn range(mut self, offset: usize, limit: usize) -> Self {
        self.window = Some((offset, limit));
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.to_string())];
        for (column, value) in &self.filters {
            params.push((column.to_string(), value.clone()));
        }
        if let Some(order) = self.order {
            params.push(("order".into(), order.into()));
        }
        if let Some((offset, limit)) = self.window {
            params.push(("offset".into(), offset.to_string()));
            params.push(("limit".into(), limit.to_string()));
        }
        params
    }
}

impl RestClient {
    /// Create a client for the given project URL and anon key.
    ///
    /// `base_url` should be like `https://project.example.co` (no trailing slash).
    pub fn new(base_url: String, api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Like [`new`](Self::new), with a per-request timeout.
    pub fn with_timeout(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, table: &str, query: &TableQuery<'_>) -> reqwest::RequestBuilder {
        let url = format!("{}/rest/v1/{table}", self.base_url);
        self.client
            .get(url)
            .query(&query.params())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: TableQuery<'_>,
    ) -> Result<Vec<T>, SyncError> {
        let request = self.request(table, &query);
        debug!(table, params = ?query.params(), "querying backend");

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let rows: Vec<T> = serde_json::from_slice(&body)?;
        Ok(rows)
    }
}

#[async_trait]
impl VenueStore for RestClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<VenueRecord>, SyncError> {
        self.fetch(
            VENUE_TABLE,
            TableQuery::select("*").order("id.asc").range(offset, limit),
        )
        .await
    }

    async fn fetch_venue(&self, id: i64) -> Result<Option<VenueRecord>, SyncError> {
        let rows: Vec<VenueRecord> = self
            .fetch(VENUE_TABLE, TableQuery::select("*").eq("id", id).range(0, 1))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_regions(&self) -> Result<Vec<String>, SyncError> {
        let rows: Vec<CountyOnly> = self
            .fetch(VENUE_TABLE, TableQuery::select("county"))
            .await?;
        let regions = distinct_sorted(rows.into_iter().map(|r| r.county));
        info!(count = regions.len(), "fetched regions");
        Ok(regions)
    }

    async fn fetch_authorities(&self, region: &str) -> Result<Vec<String>, SyncError> {
        let rows: Vec<AuthorityOnly> = self
            .fetch(
                VENUE_TABLE,
                TableQuery::select("local_authority,county").eq("county", region),
            )
            .await?;
        let authorities = distinct_sorted(rows.into_iter().map(|r| r.local_authority));
        info!(region, count = authorities.len(), "fetched authorities");
        Ok(authorities)
    }

    async fn fetch_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<EventRecord>, SyncError> {
        self.fetch(
            EVENT_TABLE,
            TableQuery::select(EVENT_SELECT)
                .order("event_start.asc")
                .range(offset, limit),
        )
        .await
    }
}
