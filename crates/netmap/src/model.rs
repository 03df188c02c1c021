//! Wire types exchanged with the network map service: node info, the
//! network map itself, and network parameters, each signed by a
//! certificate bound to the role permitted to produce it.
//!
//! Payloads are generic and opaque to this crate beyond `Serialize` +
//! `DeserializeOwned`: the network map never interprets node info content,
//! it only routes and stores it.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zone_pki::validate::SignedEnvelope;

/// A node's published identity and reachability information. The payload
/// is left opaque (`serde_json::Value`) because node info content is
/// defined by the node operator, not by the network map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub legal_identity: String,
    pub addresses: Vec<String>,
    pub platform_version: u32,
    pub serial: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeInfo {
    /// Content hash used as the node info's cache key (`getNodeByHash`).
    /// Computed over the canonical JSON encoding so that two
    /// byte-identical wire payloads hash identically regardless of
    /// transport.
    pub fn hash(&self) -> String {
        let bytes = serde_json::to_vec(self).expect("NodeInfo always serializes");
        let digest = <sha2::Sha256 as sha2::Digest>::digest(bytes);
        hex::encode(digest)
    }
}

/// The full network map: every node hash known to the map, the network
/// parameters hash currently in force, and, when the network operator has
/// proposed a change, the pending update record a node uses to decide
/// whether to fetch and act on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMap {
    pub node_info_hashes: Vec<String>,
    pub network_parameters_hash: String,
    pub parameters_update: Option<ParametersUpdateRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: time::OffsetDateTime,
}

/// A parameters change the network map is currently offering, carried on
/// the map itself so polling nodes can notice it without a separate
/// request. `new_parameters_hash` is fetched via `getNetworkParameters`
/// and, once reviewed, acknowledged via `acceptNewNetworkParameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersUpdateRecord {
    pub new_parameters_hash: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub flag_day: time::OffsetDateTime,
}

/// Network-wide parameters: protocol version floor, notary identities, and
/// the package size/timeout limits every node must honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub min_platform_version: u32,
    pub notaries: Vec<String>,
    pub max_message_size: u64,
    pub epoch: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_time: time::OffsetDateTime,
}

/// A pending parameters change: the new parameters plus the flag day at
/// which nodes must switch over, and a human-readable description shown to
/// the node operator before they consent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersUpdateInfo {
    pub new_parameters: NetworkParameters,
    #[serde(with = "time::serde::rfc3339")]
    pub flag_day: time::OffsetDateTime,
    pub description: String,
}

/// The operator's response to a [`ParametersUpdateInfo`]: accept and sign,
/// or decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParametersUpdateDecision {
    Accept,
    Decline,
}

/// A value signed by a `NETWORK_MAP`-role certificate: the network map
/// itself and network parameters are always distributed this way.
pub type SignedWith<T> = SignedEnvelope<T>;
