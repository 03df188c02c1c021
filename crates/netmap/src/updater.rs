//! The network map updater (component F): the background polling loop
//! that keeps a local view of the network map fresh, republishes this
//! node's own info when it changes, and walks the operator through a
//! two-phase network parameters update.
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use snafu::{OptionExt, ResultExt, Snafu};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use x509_cert::Certificate;

use crate::cache::Cache;
use crate::client::{NetworkMapClient, TransportError};
use crate::model::{
    NetworkMap, NodeInfo, ParametersUpdateDecision, ParametersUpdateInfo, ParametersUpdateRecord,
    SignedWith,
};
use crate::watcher::{FileWatcher, WatcherError};

/// Polling cadence used when the network map response carries no
/// `Cache-Control: max-age` directive, and the fixed retry delay used
/// after a failed poll or a failed publish/ack. The updater never backs
/// off: every retry is at this same interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// How often the file watcher is asked for locally-authored node info
/// updates that haven't been published yet.
const WATCHER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long [`NetworkMapUpdater::close`] waits for the background tasks
/// to observe cancellation and exit before giving up on a clean shutdown.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(50);

/// The capacity of the broadcast channels backing [`DataFeed`]
/// subscriptions. A slow subscriber that falls this many updates behind
/// starts missing intermediate updates rather than applying unbounded
/// backpressure to the poll loop.
const BROADCAST_CAPACITY: usize = 16;

/// File name the accepted-but-not-yet-active parameters update is
/// persisted under inside the updater's base directory.
const PENDING_UPDATE_FILE: &str = "network-parameters-update";

/// Signs a node info before it is published.
pub type SignNodeInfo = dyn Fn(&NodeInfo) -> zone_pki::validate::Result<SignedWith<NodeInfo>> + Send + Sync;

/// Signs an accepted parameters hash before it is acknowledged.
pub type SignHash = dyn Fn(&str) -> zone_pki::validate::Result<SignedWith<String>> + Send + Sync;

#[derive(Debug, Snafu)]
pub enum UpdaterError {
    #[snafu(display("network map request failed"))]
    Transport { source: TransportError },

    #[snafu(display("local node info store failed"))]
    Watcher { source: WatcherError },

    #[snafu(display("no pending parameters update to act on"))]
    NoPendingUpdate,

    #[snafu(display("the supplied hash does not match the pending parameters update"))]
    UpdateConflict,

    #[snafu(display("declined parameters update cannot be applied"))]
    UpdateDeclined,

    #[snafu(display("no network map client is configured for this updater"))]
    NoClient,

    #[snafu(display("already subscribed to the network map"))]
    AlreadySubscribed,

    #[snafu(display("failed to sign payload"))]
    Sign { source: zone_pki::validate::ValidateError },

    #[snafu(display("failed to serialize pending parameters update"))]
    SerializePending { source: serde_json::Error },

    #[snafu(display("failed to persist accepted parameters update to {path:?}"))]
    Persist { source: std::io::Error, path: PathBuf },
}

pub type Result<T, E = UpdaterError> = std::result::Result<T, E>;

/// A subscription to the live network map: yields the most recently known
/// map immediately, then every subsequent update as it is polled
/// (`subscribeToNetworkMap`'s "latest value on subscribe" contract).
pub struct DataFeed {
    first: Option<NetworkMap>,
    receiver: broadcast::Receiver<NetworkMap>,
}

impl DataFeed {
    pub async fn next(&mut self) -> Option<NetworkMap> {
        if let Some(first) = self.first.take() {
            return Some(first);
        }

        loop {
            match self.receiver.recv().await {
                Ok(map) => return Some(map),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A subscription to parameters-update notices, fed by the poll loop
/// whenever the network map advertises a new `parameters_update` record.
pub struct ParametersUpdateFeed {
    receiver: broadcast::Receiver<ParametersUpdateInfo>,
}

impl ParametersUpdateFeed {
    pub async fn next(&mut self) -> Option<ParametersUpdateInfo> {
        loop {
            match self.receiver.recv().await {
                Ok(info) => return Some(info),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct PendingUpdate {
    info: ParametersUpdateInfo,
    hash: String,
}

/// The updater's mutable state, held behind a single lock so that the
/// poll loop and caller-driven operations (`updateNodeInfo`,
/// `acceptNewNetworkParameters`) never observe each other half-applied.
struct State {
    latest_map: Option<NetworkMap>,
    pending_update: Option<PendingUpdate>,
    /// Hashes of node info already discovered via the file watcher, so the
    /// poll loop's `toRemove` reconciliation leaves them alone even though
    /// they were never fetched from the network map service.
    watcher_processed: BTreeSet<String>,
}

/// Drives the network map poll loop and exposes the operations a node
/// uses to participate in the network: publishing its own node info,
/// subscribing to map changes, and responding to parameters updates.
///
/// `client` is optional: an updater with no client still subscribes the
/// local cache to the file watcher's stream, but never polls the network
/// and rejects any operation that would require contacting it.
pub struct NetworkMapUpdater {
    client: Option<NetworkMapClient>,
    cache: Arc<dyn Cache>,
    watcher: Arc<dyn FileWatcher>,
    trust_anchor: Certificate,
    current_parameters_hash: String,
    base_directory: PathBuf,
    tx: broadcast::Sender<NetworkMap>,
    parameters_tx: broadcast::Sender<ParametersUpdateInfo>,
    state: RwLock<State>,
    poll_handle: Mutex<Option<JoinHandle<()>>>,
    watcher_handle: Mutex<Option<JoinHandle<()>>>,
    subscribed: std::sync::atomic::AtomicBool,
}

impl NetworkMapUpdater {
    pub fn new(
        client: Option<NetworkMapClient>,
        cache: Arc<dyn Cache>,
        watcher: Arc<dyn FileWatcher>,
        trust_anchor: Certificate,
        current_parameters_hash: String,
        base_directory: PathBuf,
    ) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        let (parameters_tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);

        Arc::new(Self {
            client,
            cache,
            watcher,
            trust_anchor,
            current_parameters_hash,
            base_directory,
            tx,
            parameters_tx,
            state: RwLock::new(State {
                latest_map: None,
                pending_update: None,
                watcher_processed: BTreeSet::new(),
            }),
            poll_handle: Mutex::new(None),
            watcher_handle: Mutex::new(None),
            subscribed: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Subscribes to network map updates. Must be called at most once per
    /// updater: a second call fails with [`UpdaterError::AlreadySubscribed`]
    /// rather than silently handing back another feed over the same
    /// background loop. Always starts the file watcher loop; starts the
    /// network poll loop only if this updater was built with a client.
    pub async fn subscribe_to_network_map(self: &Arc<Self>) -> Result<DataFeed> {
        self.subscribed
            .compare_exchange(
                false,
                true,
                std::sync::atomic::Ordering::SeqCst,
                std::sync::atomic::Ordering::SeqCst,
            )
            .ok()
            .context(AlreadySubscribedSnafu)?;

        let watcher_updater = Arc::clone(self);
        *self.watcher_handle.lock().await = Some(tokio::spawn(async move {
            watcher_updater.watcher_loop().await;
        }));

        if self.client.is_some() {
            let poll_updater = Arc::clone(self);
            *self.poll_handle.lock().await = Some(tokio::spawn(async move { poll_updater.poll_loop().await }));
        }

        let first = self.state.read().expect("state lock poisoned").latest_map.clone();
        Ok(DataFeed {
            first,
            receiver: self.tx.subscribe(),
        })
    }

    /// Subscribes to parameters-update notices raised by the poll loop.
    pub fn subscribe_to_parameters_updates(&self) -> ParametersUpdateFeed {
        ParametersUpdateFeed {
            receiver: self.parameters_tx.subscribe(),
        }
    }

    async fn poll_loop(self: Arc<Self>) {
        loop {
            let interval = match self.poll_once().await {
                Ok(interval) => interval,
                Err(error) => {
                    tracing::warn!(%error, "network map poll failed, retrying at fixed interval");
                    DEFAULT_POLL_INTERVAL
                }
            };

            tokio::time::sleep(interval).await;
        }
    }

    /// One iteration of the poll loop: fetch the map, dispatch any
    /// parameters-update notice, exit the process if the fetched map's
    /// parameters hash no longer matches what this node is running, then
    /// reconcile the local cache against the map's node set.
    #[tracing::instrument(skip(self))]
    async fn poll_once(&self) -> Result<Duration> {
        let client = self.client.as_ref().context(NoClientSnafu)?;
        let (map, max_age) = client.get_network_map(&self.trust_anchor).await.context(TransportSnafu)?;

        if let Some(update) = map.parameters_update.clone() {
            self.handle_parameters_update(client, update).await;
        }

        if map.network_parameters_hash != self.current_parameters_hash {
            tracing::error!(
                running = %self.current_parameters_hash,
                published = %map.network_parameters_hash,
                "network map parameters hash no longer matches this node's active parameters, exiting"
            );
            std::process::exit(1);
        }

        self.reconcile_nodes(client, &map).await;

        let changed = {
            let state = self.state.read().expect("state lock poisoned");
            state.latest_map.as_ref() != Some(&map)
        };
        if changed {
            self.state.write().expect("state lock poisoned").latest_map = Some(map.clone());
            // A lagging or absent subscriber is not an error: the updater
            // keeps polling regardless of whether anyone is listening.
            let _ = self.tx.send(map);
        }

        Ok(max_age)
    }

    /// No-op if `update`'s hash matches the already-pending update;
    /// otherwise fetches the new parameters and, on success, replaces the
    /// pending update and notifies subscribers. A fetch failure is logged
    /// and skipped rather than treated as fatal: the next poll tries again.
    async fn handle_parameters_update(&self, client: &NetworkMapClient, update: ParametersUpdateRecord) {
        let already_pending = {
            let state = self.state.read().expect("state lock poisoned");
            state.pending_update.as_ref().is_some_and(|pending| pending.hash == update.new_parameters_hash)
        };
        if already_pending {
            return;
        }

        let signed_parameters = match client.get_network_parameters(&update.new_parameters_hash).await {
            Ok(signed) => signed,
            Err(error) => {
                tracing::warn!(%error, hash = %update.new_parameters_hash, "failed to fetch offered network parameters, skipping");
                return;
            }
        };

        let info = ParametersUpdateInfo {
            new_parameters: signed_parameters.payload,
            flag_day: update.flag_day,
            description: update.description,
        };
        self.receive_parameters_update(info.clone(), update.new_parameters_hash);
        let _ = self.parameters_tx.send(info);
    }

    /// Fetches and caches every node the map names that this node doesn't
    /// already have (`toAdd`), and drops every cached node the map no
    /// longer names, except those the file watcher is the authority for
    /// (`toRemove`).
    async fn reconcile_nodes(&self, client: &NetworkMapClient, map: &NetworkMap) {
        let known: BTreeSet<String> = self.cache.all_node_hashes().into_iter().collect();
        let in_map: BTreeSet<String> = map.node_info_hashes.iter().cloned().collect();

        for hash in in_map.difference(&known) {
            match client.get_node_info(hash, &self.trust_anchor).await {
                Ok(signed) => self.cache.add_node(signed.payload),
                Err(error) => tracing::warn!(%error, hash, "failed to fetch node info named by the network map"),
            }
        }

        let watcher_owned = self.state.read().expect("state lock poisoned").watcher_processed.clone();
        for hash in known.difference(&in_map) {
            if watcher_owned.contains(hash) {
                continue;
            }
            if let Some(node) = self.cache.get_node_by_hash(hash) {
                self.cache.remove_node(&node.legal_identity);
            }
        }
    }

    /// Polls the file watcher for locally-authored node info this updater
    /// hasn't seen yet and feeds each one into the cache. Runs regardless
    /// of whether a network map client is configured: the cache always
    /// subscribes to the file watcher's stream.
    async fn watcher_loop(self: Arc<Self>) {
        loop {
            let processed = self.state.read().expect("state lock poisoned").watcher_processed.clone();
            match self.watcher.node_info_updates(&processed) {
                Ok(updates) => {
                    let mut state = self.state.write().expect("state lock poisoned");
                    for node in updates {
                        state.watcher_processed.insert(node.hash());
                        self.cache.add_node(node);
                    }
                }
                Err(error) => tracing::warn!(%error, "failed to poll file watcher for node info updates"),
            }

            tokio::time::sleep(WATCHER_POLL_INTERVAL).await;
        }
    }

    /// Publishes `node` if it differs from the cache's current record for
    /// its legal identity (ignoring `serial`, which exists precisely to
    /// change on every republish), persists it locally, and records it in
    /// the cache (`updateNodeInfo`'s compare-and-publish contract). When a
    /// client is configured, the signed publish is retried at a fixed
    /// interval in the background rather than blocking the caller.
    #[tracing::instrument(skip(self, node, sign))]
    pub async fn update_node_info(&self, node: NodeInfo, sign: &SignNodeInfo) -> Result<()> {
        let unchanged = self
            .cache
            .get_node_by_legal_identity(&node.legal_identity)
            .is_some_and(|current| equal_ignoring_serial(&current, &node));
        if unchanged {
            return Ok(());
        }

        self.watcher.save_to_file(&node).context(WatcherSnafu)?;
        self.cache.add_node(node.clone());

        if let Some(client) = &self.client {
            let signed = sign(&node).context(SignSnafu)?;
            tokio::spawn(retry_publish(client.clone(), signed));
        }

        Ok(())
    }

    /// Records a newly-offered parameters update, to be surfaced to the
    /// node operator for a decision before [`Self::accept_new_network_parameters`]
    /// is called.
    pub fn receive_parameters_update(&self, info: ParametersUpdateInfo, hash: String) {
        self.state.write().expect("state lock poisoned").pending_update = Some(PendingUpdate { info, hash });
    }

    /// Acts on the pending parameters update with the operator's decision.
    /// Requires a configured client. Fails with [`UpdaterError::UpdateConflict`]
    /// if there is no pending update, or if `hash` doesn't match it —
    /// checked before any side effect. Declining clears the pending update
    /// without ever contacting the network map service. Accepting persists
    /// the accepted record to this updater's base directory and schedules
    /// a retrying acknowledgement in the background; activation itself
    /// only happens at the update's flag day.
    #[tracing::instrument(skip(self, sign))]
    pub async fn accept_new_network_parameters(
        &self,
        hash: &str,
        decision: ParametersUpdateDecision,
        sign: &SignHash,
    ) -> Result<()> {
        self.client.as_ref().context(NoClientSnafu)?;

        let matches = {
            let state = self.state.read().expect("state lock poisoned");
            match &state.pending_update {
                Some(pending) => pending.hash == hash,
                None => false,
            }
        };
        snafu::ensure!(matches, UpdateConflictSnafu);

        let pending = self
            .state
            .write()
            .expect("state lock poisoned")
            .pending_update
            .take()
            .context(NoPendingUpdateSnafu)?;

        if decision == ParametersUpdateDecision::Decline {
            tracing::info!(hash, "declined network parameters update");
            return Ok(());
        }

        let serialized = serde_json::to_vec(&pending.info).context(SerializePendingSnafu)?;
        let path = self.base_directory.join(PENDING_UPDATE_FILE);
        std::fs::write(&path, serialized).context(PersistSnafu { path })?;

        let signed_hash = sign(hash).context(SignSnafu)?;
        let client = self.client.as_ref().context(NoClientSnafu)?.clone();
        tokio::spawn(retry_ack(client, signed_hash));

        tracing::info!(
            flag_day = %pending.info.flag_day,
            "accepted network parameters update, pending flag day activation"
        );
        Ok(())
    }

    /// Returns the trust anchor this updater validates signed network map
    /// artifacts against.
    pub fn trust_anchor(&self) -> &Certificate {
        &self.trust_anchor
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Stops the background poll and watcher loops, waiting up to
    /// [`SHUTDOWN_DRAIN_TIMEOUT`] for each to exit cleanly.
    pub async fn close(&self) {
        for handle in [self.poll_handle.lock().await.take(), self.watcher_handle.lock().await.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
            if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("background loop did not exit within the shutdown drain timeout");
            }
        }
    }
}

fn equal_ignoring_serial(a: &NodeInfo, b: &NodeInfo) -> bool {
    a.legal_identity == b.legal_identity && a.addresses == b.addresses && a.platform_version == b.platform_version && a.extra == b.extra
}

/// Publishes `signed` once; on failure, reschedules itself at
/// [`DEFAULT_POLL_INTERVAL`] rather than giving up. There is no backoff:
/// every retry waits the same fixed interval.
async fn retry_publish(client: NetworkMapClient, signed: SignedWith<NodeInfo>) {
    loop {
        match client.publish(&signed).await {
            Ok(()) => return,
            Err(error) => {
                tracing::warn!(%error, "failed to publish node info, retrying at fixed interval");
                tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
            }
        }
    }
}

/// The acknowledgement counterpart to [`retry_publish`].
async fn retry_ack(client: NetworkMapClient, signed_hash: SignedWith<String>) {
    loop {
        match client.ack_parameters_update(&signed_hash).await {
            Ok(()) => return,
            Err(error) => {
                tracing::warn!(%error, "failed to acknowledge parameters update, retrying at fixed interval");
                tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::watcher::DirectoryWatcher;
    use std::collections::BTreeMap;

    fn node() -> NodeInfo {
        NodeInfo {
            legal_identity: "O=Erin,L=Madrid,C=ES".to_owned(),
            addresses: vec!["10.0.0.9:10000".to_owned()],
            platform_version: 7,
            serial: 1,
            extra: BTreeMap::new(),
        }
    }

    fn updater_without_network() -> (Arc<NetworkMapUpdater>, tempfile::TempDir, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let base_dir = tempfile::tempdir().expect("failed to create temp dir");
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let watcher: Arc<dyn FileWatcher> = Arc::new(DirectoryWatcher::new(dir.path()));
        let trust_anchor_der_placeholder = include_placeholder_certificate();

        (
            NetworkMapUpdater::new(
                None,
                cache,
                watcher,
                trust_anchor_der_placeholder,
                "deadbeef".to_owned(),
                base_dir.path().to_path_buf(),
            ),
            dir,
            base_dir,
        )
    }

    fn updater_with_offline_client() -> (Arc<NetworkMapUpdater>, tempfile::TempDir, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let base_dir = tempfile::tempdir().expect("failed to create temp dir");
        let client = NetworkMapClient::new("http://127.0.0.1:0/".parse().unwrap());
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let watcher: Arc<dyn FileWatcher> = Arc::new(DirectoryWatcher::new(dir.path()));
        let trust_anchor_der_placeholder = include_placeholder_certificate();

        (
            NetworkMapUpdater::new(
                Some(client),
                cache,
                watcher,
                trust_anchor_der_placeholder,
                "deadbeef".to_owned(),
                base_dir.path().to_path_buf(),
            ),
            dir,
            base_dir,
        )
    }

    fn include_placeholder_certificate() -> Certificate {
        let ca = zone_pki::issuer::CertificateAuthority::<zone_pki::keys::ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Trust Anchor",
            None,
            None,
        )
        .expect("failed to build placeholder trust anchor");
        ca.certificate().clone()
    }

    #[tokio::test]
    async fn a_fresh_data_feed_yields_no_map_before_any_successful_poll() {
        let (updater, _dir, _base_dir) = updater_without_network();
        let mut feed = updater
            .subscribe_to_network_map()
            .await
            .expect("first subscribe should succeed");

        // No network poll loop runs without a client, so the feed stays empty.
        updater.close().await;

        assert_eq!(feed.first.take(), None);
    }

    #[tokio::test]
    async fn subscribing_twice_fails_with_already_subscribed() {
        let (updater, _dir, _base_dir) = updater_without_network();
        updater.subscribe_to_network_map().await.expect("first subscribe should succeed");

        let result = updater.subscribe_to_network_map().await;
        updater.close().await;

        assert!(matches!(result, Err(UpdaterError::AlreadySubscribed)));
    }

    #[tokio::test]
    async fn update_node_info_is_a_no_op_when_the_node_is_unchanged() {
        let (updater, _dir, _base_dir) = updater_without_network();
        updater.close().await;

        let node = node();
        updater.cache.add_node(node.clone());

        let sign: &SignNodeInfo = &|_node| panic!("sign should not be called when node info is unchanged");

        // No HTTP server is reachable, and no client is configured; if
        // update_node_info attempted to sign or publish it would panic or
        // fail here, which demonstrates the compare-and-publish short
        // circuit held.
        let result = updater.update_node_info(node, sign).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn declining_a_pending_update_clears_it_without_requiring_a_server() {
        let (updater, _dir, _base_dir) = updater_with_offline_client();
        updater.close().await;

        let info = ParametersUpdateInfo {
            new_parameters: crate::model::NetworkParameters {
                min_platform_version: 8,
                notaries: vec!["O=Notary,L=London,C=GB".to_owned()],
                max_message_size: 10_485_760,
                epoch: 2,
                modified_time: time::OffsetDateTime::now_utc(),
            },
            flag_day: time::OffsetDateTime::now_utc() + time::Duration::days(7),
            description: "raise minimum platform version".to_owned(),
        };
        updater.receive_parameters_update(info, "deadbeef".to_owned());

        let sign: &SignHash = &|_hash| panic!("sign should not be called on decline");
        let result = updater
            .accept_new_network_parameters("deadbeef", ParametersUpdateDecision::Decline, sign)
            .await;

        assert!(result.is_ok());
        assert!(updater.state.read().unwrap().pending_update.is_none());
    }

    #[tokio::test]
    async fn accepting_with_the_wrong_hash_is_a_conflict_and_persists_nothing() {
        let (updater, _dir, base_dir) = updater_with_offline_client();
        updater.close().await;

        let info = ParametersUpdateInfo {
            new_parameters: crate::model::NetworkParameters {
                min_platform_version: 8,
                notaries: vec!["O=Notary,L=London,C=GB".to_owned()],
                max_message_size: 10_485_760,
                epoch: 2,
                modified_time: time::OffsetDateTime::now_utc(),
            },
            flag_day: time::OffsetDateTime::now_utc() + time::Duration::days(7),
            description: "raise minimum platform version".to_owned(),
        };
        updater.receive_parameters_update(info, "correct-hash".to_owned());

        let sign: &SignHash = &|_hash| panic!("sign should not be called on conflict");
        let result = updater
            .accept_new_network_parameters("wrong-hash", ParametersUpdateDecision::Accept, sign)
            .await;

        assert!(matches!(result, Err(UpdaterError::UpdateConflict)));
        assert!(!base_dir.path().join(PENDING_UPDATE_FILE).exists());
    }

    #[tokio::test]
    async fn accepting_without_a_client_fails() {
        let (updater, _dir, _base_dir) = updater_without_network();
        updater.close().await;

        let sign: &SignHash = &|_hash| panic!("sign should not be called without a client");
        let result = updater
            .accept_new_network_parameters("deadbeef", ParametersUpdateDecision::Accept, sign)
            .await;

        assert!(matches!(result, Err(UpdaterError::NoClient)));
    }
}
