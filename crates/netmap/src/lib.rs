//! Network map client and updater control loop: the part of the identity
//! stack that keeps a node's view of the rest of the permissioned zone
//! current, republishes the node's own info when it changes, and walks
//! the operator through accepting network-wide parameter changes.
//!
//! The network map itself, and the parameters it distributes, are always
//! signed by a `NETWORK_MAP`-role certificate; [`zone_pki::validate`]
//! supplies the role-bound verification this crate relies on.
pub mod cache;
pub mod client;
pub mod model;
pub mod updater;
pub mod watcher;
pub mod wire;
