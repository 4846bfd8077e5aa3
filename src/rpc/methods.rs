//! Typed catalog of the JSON-RPC methods this toolkit consumes.
//!
//! Pure request/response shaping: each supported query has a request
//! builder and a response parser surfacing a typed value, or a malformed
//! error when required fields are absent or of the wrong kind. Adding a
//! query means adding a `Method` variant plus its wire types, nothing else.

use crate::rpc::error::QueryError;
use crate::types::Pubkey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// The closed set of RPC queries the tracker issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetVoteAccounts,
    GetEpochInfo,
    GetLeaderSchedule,
    GetSlot,
    GetBlockProduction,
}

impl Method {
    /// Wire-level method name.
    pub fn rpc_name(&self) -> &'static str {
        match self {
            Method::GetVoteAccounts => "getVoteAccounts",
            Method::GetEpochInfo => "getEpochInfo",
            Method::GetLeaderSchedule => "getLeaderSchedule",
            Method::GetSlot => "getSlot",
            Method::GetBlockProduction => "getBlockProduction",
        }
    }
}

/// One vote account as reported by `getVoteAccounts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAccount {
    pub vote_pubkey: Pubkey,
    pub node_pubkey: Pubkey,
    pub activated_stake: u64,
    pub commission: u8,
    /// [epoch, credits, previous credits] triples, oldest first
    pub epoch_credits: Vec<[u64; 3]>,
    pub last_vote: u64,
    #[serde(default)]
    pub root_slot: Option<u64>,
}

/// `getVoteAccounts` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetVoteAccountsResult {
    pub current: Vec<VoteAccount>,
    pub delinquent: Vec<VoteAccount>,
}

/// `getEpochInfo` response body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub epoch: u64,
    pub absolute_slot: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    #[serde(default)]
    pub block_height: Option<u64>,
}

/// `getLeaderSchedule` response body: identity -> slot indices it leads.
pub type LeaderSchedule = HashMap<Pubkey, Vec<u64>>;

/// `getBlockProduction` value: per-identity [assigned, produced] counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProduction {
    pub by_identity: HashMap<Pubkey, (u64, u64)>,
    pub range: SlotRange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRange {
    pub first_slot: u64,
    pub last_slot: u64,
}

/// Responses the node wraps in `{context, value}`.
#[derive(Debug, Clone, Deserialize)]
struct RpcValueWrapper<T> {
    value: T,
}

// Request builders. Parameter shapes follow the published RPC schema,
// including the null slot placeholder getLeaderSchedule needs before its
// config object.

pub fn vote_accounts_params() -> Value {
    json!([])
}

pub fn epoch_info_params() -> Value {
    json!([])
}

pub fn slot_params() -> Value {
    json!([])
}

pub fn leader_schedule_params(identity: Option<&str>) -> Value {
    match identity {
        Some(identity) => json!([null, { "identity": identity }]),
        None => json!([]),
    }
}

pub fn block_production_params(identity: Option<&str>) -> Value {
    match identity {
        Some(identity) => json!([{ "identity": identity }]),
        None => json!([]),
    }
}

// Response parsers.

fn decode<T: DeserializeOwned>(method: Method, raw: &Value) -> Result<T, QueryError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| QueryError::Malformed { method: method.rpc_name(), reason: e.to_string() })
}

pub fn parse_vote_accounts(raw: &Value) -> Result<GetVoteAccountsResult, QueryError> {
    decode(Method::GetVoteAccounts, raw)
}

pub fn parse_epoch_info(raw: &Value) -> Result<EpochInfo, QueryError> {
    decode(Method::GetEpochInfo, raw)
}

pub fn parse_slot(raw: &Value) -> Result<u64, QueryError> {
    decode(Method::GetSlot, raw)
}

/// A null schedule (slot outside any known epoch) parses as empty.
pub fn parse_leader_schedule(raw: &Value) -> Result<LeaderSchedule, QueryError> {
    let schedule: Option<LeaderSchedule> = decode(Method::GetLeaderSchedule, raw)?;
    Ok(schedule.unwrap_or_default())
}

pub fn parse_block_production(raw: &Value) -> Result<BlockProduction, QueryError> {
    let wrapper: RpcValueWrapper<BlockProduction> = decode(Method::GetBlockProduction, raw)?;
    Ok(wrapper.value)
}

/// Shape-check a raw response for any catalog method.
///
/// Used by the query layer before a payload is cached, so a response that
/// fails its typed parse is treated as an endpoint failure instead of
/// being served until its TTL expires.
pub fn validate(method: Method, raw: &Value) -> Result<(), QueryError> {
    match method {
        Method::GetVoteAccounts => parse_vote_accounts(raw).map(|_| ()),
        Method::GetEpochInfo => parse_epoch_info(raw).map(|_| ()),
        Method::GetLeaderSchedule => parse_leader_schedule(raw).map(|_| ()),
        Method::GetSlot => parse_slot(raw).map(|_| ()),
        Method::GetBlockProduction => parse_block_production(raw).map(|_| ()),
    }
}
