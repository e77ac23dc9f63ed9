use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{GlitchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Paused,
}

/// Optional community links attached to a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
}

/// Fields a visitor submits when asking for a token to be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnectionRequest {
    #[serde(rename = "ca")]
    pub contract_address: String,
    pub name: String,
    pub ticker: String,
    #[serde(flatten)]
    pub links: TokenLinks,
}

impl NewConnectionRequest {
    pub fn validate(&self) -> Result<()> {
        if self.contract_address.trim().is_empty() {
            return Err(GlitchError::InvalidInput("contract address is required"));
        }
        if self.name.trim().is_empty() {
            return Err(GlitchError::InvalidInput("token name is required"));
        }
        if self.ticker.trim().is_empty() {
            return Err(GlitchError::InvalidInput("ticker is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: u64,
    #[serde(flatten)]
    pub fields: NewConnectionRequest,
    pub status: RequestStatus,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: u64,
    #[serde(rename = "ca")]
    pub contract_address: String,
    pub name: String,
    pub ticker: String,
    #[serde(flatten)]
    pub links: TokenLinks,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub fees_to_pool: f64,
    #[serde(default)]
    pub paid_out: f64,
    pub status: EntryStatus,
    pub created_at: u64,
}

/// CRUD over connection requests and the token registry.
pub trait RecordStore {
    /// Stores a new request with status pending.
    fn submit_request(&mut self, request: NewConnectionRequest) -> Result<ConnectionRequest>;

    /// All requests, newest first.
    fn requests(&self) -> Result<Vec<ConnectionRequest>>;

    fn set_request_status(&mut self, id: u64, status: RequestStatus) -> Result<()>;

    fn delete_request(&mut self, id: u64) -> Result<()>;

    /// Active registry entries, newest first.
    fn active_entries(&self) -> Result<Vec<RegistryEntry>>;

    /// Adds an entry built from `fields`; `id` and `created_at` are assigned.
    fn add_entry(&mut self, fields: NewConnectionRequest, status: EntryStatus)
        -> Result<RegistryEntry>;

    fn update_entry(&mut self, entry: RegistryEntry) -> Result<()>;

    fn delete_entry(&mut self, id: u64) -> Result<()>;

    /// Lists the request's token as active and marks the request approved.
    fn approve_request(&mut self, id: u64) -> Result<RegistryEntry> {
        let request = self
            .requests()?
            .into_iter()
            .find(|request| request.id == id)
            .ok_or_else(|| GlitchError::msg(format!("no connection request with id {id}")))?;
        let entry = self.add_entry(request.fields, EntryStatus::Active)?;
        self.set_request_status(id, RequestStatus::Approved)?;
        Ok(entry)
    }
}

/// Market value lookup by contract address.
pub trait MarketData {
    /// `None` when the token has no known market.
    fn market_value(&self, contract_address: &str) -> Result<Option<f64>>;
}

/// Fixed market values, keyed by contract address.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    values: HashMap<String, f64>,
}

impl StaticMarketData {
    pub fn with_value(mut self, contract_address: impl Into<String>, value: f64) -> Self {
        self.values.insert(contract_address.into(), value);
        self
    }
}

impl MarketData for StaticMarketData {
    fn market_value(&self, contract_address: &str) -> Result<Option<f64>> {
        Ok(self.values.get(contract_address).copied())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    requests: BTreeMap<u64, ConnectionRequest>,
    entries: BTreeMap<u64, RegistryEntry>,
    next_id: u64,
    clock: u64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> (u64, u64) {
        self.next_id += 1;
        self.clock += 1;
        (self.next_id, self.clock)
    }
}

fn not_found(kind: &str, id: u64) -> GlitchError {
    GlitchError::msg(format!("no {kind} with id {id}"))
}

impl RecordStore for MemoryRecordStore {
    fn submit_request(&mut self, request: NewConnectionRequest) -> Result<ConnectionRequest> {
        request.validate()?;
        let (id, created_at) = self.allocate();
        let stored = ConnectionRequest {
            id,
            fields: request,
            status: RequestStatus::Pending,
            created_at,
        };
        self.requests.insert(id, stored.clone());
        tracing::debug!(id, "connection request stored");
        Ok(stored)
    }

    fn requests(&self) -> Result<Vec<ConnectionRequest>> {
        let mut requests: Vec<_> = self.requests.values().cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    fn set_request_status(&mut self, id: u64, status: RequestStatus) -> Result<()> {
        let request = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| not_found("connection request", id))?;
        request.status = status;
        Ok(())
    }

    fn delete_request(&mut self, id: u64) -> Result<()> {
        self.requests
            .remove(&id)
            .map(drop)
            .ok_or_else(|| not_found("connection request", id))
    }

    fn active_entries(&self) -> Result<Vec<RegistryEntry>> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .filter(|entry| entry.status == EntryStatus::Active)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    fn add_entry(
        &mut self,
        fields: NewConnectionRequest,
        status: EntryStatus,
    ) -> Result<RegistryEntry> {
        fields.validate()?;
        let (id, created_at) = self.allocate();
        let entry = RegistryEntry {
            id,
            contract_address: fields.contract_address,
            name: fields.name,
            ticker: fields.ticker,
            links: fields.links,
            market_cap: None,
            volume_24h: None,
            fees_to_pool: 0.0,
            paid_out: 0.0,
            status,
            created_at,
        };
        self.entries.insert(id, entry.clone());
        Ok(entry)
    }

    fn update_entry(&mut self, entry: RegistryEntry) -> Result<()> {
        let slot = self
            .entries
            .get_mut(&entry.id)
            .ok_or_else(|| not_found("registry entry", entry.id))?;
        *slot = entry;
        Ok(())
    }

    fn delete_entry(&mut self, id: u64) -> Result<()> {
        self.entries
            .remove(&id)
            .map(drop)
            .ok_or_else(|| not_found("registry entry", id))
    }
}

/// Fills `market_cap` on every entry the lookup knows about.
pub fn refresh_market_caps(entries: &mut [RegistryEntry], market: &impl MarketData) -> Result<usize> {
    let mut updated = 0;
    for entry in entries {
        if let Some(value) = market.market_value(&entry.contract_address)? {
            entry.market_cap = Some(value);
            updated += 1;
        }
    }
    Ok(updated)
}
