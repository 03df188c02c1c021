//! The network map HTTP client (component E): a thin, typed `reqwest`
//! wrapper around the network map service's REST surface.
//!
//! `Cache-Control: max-age=N` on the network map response tells the
//! [`crate::updater`] polling loop how long the returned map may be
//! cached before the next poll; [`parse_max_age`] is the only header
//! parsing this client does.
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::{ResultExt, Snafu};
use x509_cert::Certificate;
use zone_pki::role::Role;
use zone_pki::validate;

use crate::model::{NetworkMap, NetworkParameters, NodeInfo, SignedWith};
use crate::wire::{self, WireEnvelope};

#[derive(Debug, Snafu)]
pub enum TransportError {
    #[snafu(display("request to {url} failed"))]
    Request { source: reqwest::Error, url: String },

    #[snafu(display("network map service at {url} returned {status}"))]
    UnexpectedStatus { url: String, status: reqwest::StatusCode },

    #[snafu(display("failed to decode response body from {url}"))]
    DecodeBody { source: reqwest::Error, url: String },

    #[snafu(display("failed to decode signed envelope from {url}"))]
    Wire { source: wire::WireError, url: String },

    #[snafu(display("failed to verify signed envelope from {url}"))]
    Verify { source: validate::ValidateError, url: String },

    #[snafu(display("failed to encode request body for {url}"))]
    EncodeBody { source: serde_json::Error, url: String },

    #[snafu(display("requested resource was not found: {url}"))]
    NotFound { url: String },
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;

/// The network map service's REST surface, as consumed by the updater's
/// polling loop. Cheap to clone: both fields are reference-counted
/// handles, which is what lets the updater hand a fresh clone to each
/// retrying background task.
#[derive(Clone)]
pub struct NetworkMapClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl NetworkMapClient {
    pub fn new(base_url: reqwest::Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url, path))
    }

    fn encode_envelope<T: Clone + Serialize>(&self, url: &str, envelope: &SignedWith<T>) -> Result<Vec<u8>> {
        let wire = wire::to_wire(envelope).context(WireSnafu { url: url.to_owned() })?;
        serde_json::to_vec(&wire).context(EncodeBodySnafu { url: url.to_owned() })
    }

    /// Publishes this node's own signed node info to the network map.
    #[tracing::instrument(skip(self, signed_node_info))]
    pub async fn publish(&self, signed_node_info: &SignedWith<NodeInfo>) -> Result<()> {
        let url = self.url("network-map/publish");
        let body = self.encode_envelope(&url, signed_node_info)?;
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;

        ensure_success(&url, &response)
    }

    /// Acknowledges a pending network parameters update by posting the
    /// operator-signed accepted hash. There is no "decline" counterpart
    /// here: declining a pending update never contacts the network map
    /// service at all.
    #[tracing::instrument(skip(self, signed_hash))]
    pub async fn ack_parameters_update(&self, signed_hash: &SignedWith<String>) -> Result<()> {
        let url = self.url("network-map/ack-parameters-update");
        let body = self.encode_envelope(&url, signed_hash)?;
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;

        ensure_success(&url, &response)
    }

    /// Fetches the current network map along with the `max-age` the
    /// server attached to this response (`getNetworkMap`), verified against
    /// `trust_anchor` under the `NETWORK_MAP` role.
    #[tracing::instrument(skip(self, trust_anchor))]
    pub async fn get_network_map(&self, trust_anchor: &Certificate) -> Result<(NetworkMap, Duration)> {
        let url = self.url("network-map");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;
        ensure_success(&url, &response)?;

        let max_age = parse_max_age(response.headers());
        let wire: WireEnvelope<NetworkMap> = decode_json(&url, response).await?;
        let envelope = wire::from_wire(wire).context(WireSnafu { url: url.clone() })?;
        let map = validate::verify_role_bound(&envelope, Role::NetworkMap, trust_anchor)
            .context(VerifySnafu { url })?;

        Ok((map, max_age))
    }

    /// Fetches a single node info by content hash (`getNodeInfo`), verified
    /// under the `NODE_CA` role. Returns the full signed envelope: callers
    /// that already trust the chain can re-derive the payload from it.
    #[tracing::instrument(skip(self, trust_anchor))]
    pub async fn get_node_info(&self, hash: &str, trust_anchor: &Certificate) -> Result<SignedWith<NodeInfo>> {
        let url = self.url(&format!("network-map/node-info/{hash}"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;
        ensure_success(&url, &response)?;

        let wire: WireEnvelope<NodeInfo> = decode_json(&url, response).await?;
        let envelope = wire::from_wire(wire).context(WireSnafu { url: url.clone() })?;
        validate::verify_role_bound(&envelope, Role::NodeCa, trust_anchor).context(VerifySnafu { url })?;

        Ok(envelope)
    }

    /// Fetches network parameters by content hash (`getNetworkParameters`).
    /// Returned unverified: the caller reviews the parameters themselves
    /// before deciding whether to accept the update, and the envelope's
    /// chain is checked again at that point.
    #[tracing::instrument(skip(self))]
    pub async fn get_network_parameters(&self, hash: &str) -> Result<SignedWith<NetworkParameters>> {
        let url = self.url(&format!("network-map/network-parameters/{hash}"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;
        ensure_success(&url, &response)?;

        let wire: WireEnvelope<NetworkParameters> = decode_json(&url, response).await?;
        wire::from_wire(wire).context(WireSnafu { url })
    }

    /// Asks the network map service what hostname it observes this node
    /// connecting from, used to pre-fill a node info's addresses
    /// (`myPublicHostname`). Only the first line of the response body is
    /// significant.
    #[tracing::instrument(skip(self))]
    pub async fn my_public_hostname(&self) -> Result<String> {
        let url = self.url("network-map/my-hostname");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;
        ensure_success(&url, &response)?;

        let body = response.text().await.context(DecodeBodySnafu { url })?;
        Ok(body.lines().next().unwrap_or_default().to_owned())
    }
}

fn ensure_success(url: &str, response: &reqwest::Response) -> Result<()> {
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return NotFoundSnafu { url: url.to_owned() }.fail();
    }
    snafu::ensure!(
        response.status().is_success(),
        UnexpectedStatusSnafu {
            url: url.to_owned(),
            status: response.status(),
        }
    );
    Ok(())
}

async fn decode_json<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .context(DecodeBodySnafu { url: url.to_owned() })
}

/// Parses `Cache-Control: max-age=N` out of a response's headers. Falls
/// back to one minute when the header is absent or malformed, matching
/// the updater's retry-at-fixed-interval default.
pub fn parse_max_age(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .split(',')
                .map(str::trim)
                .find_map(|directive| directive.strip_prefix("max-age="))
        })
        .and_then(|seconds| seconds.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(crate::updater::DEFAULT_POLL_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_max_age_directive() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::CACHE_CONTROL, "max-age=30".parse().unwrap());
        assert_eq!(parse_max_age(&headers), Duration::from_secs(30));
    }

    #[test]
    fn falls_back_to_the_default_interval_without_the_header() {
        let headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_max_age(&headers), crate::updater::DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn picks_max_age_out_of_a_multi_directive_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            "no-cache, max-age=45, must-revalidate".parse().unwrap(),
        );
        assert_eq!(parse_max_age(&headers), Duration::from_secs(45));
    }
}
