use std::path::Path;
use std::sync::{Mutex, PoisonError};

use beacon_crypto::{Algorithm, digest, format_with_colons, generate_address};
use beacon_db::PreferenceStore;
use beacon_types::RequestParameters;
use tracing::{info, warn};

use crate::codec::insert_digest;
use crate::platform;
use crate::sanitize::sanitize_long;

/// Key the synthetic address is stored under.
pub const PREFS_KEY: &str = "mac";

/// Writes attempted before giving up on persisting a fresh identity.
const PERSIST_ATTEMPTS: usize = 2;

/// Hex digests of the uppercased identity, ready to be sent as signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDigests {
    pub mac_sha1: String,
    pub mac_md5: String,
}

/// Get-or-create store for the per-install synthetic hardware address.
///
/// The value lives in the injected preference store; nothing is cached here,
/// so every call reads the persisted record. Minting is serialized per store
/// instance. Two instances sharing one backend can still race on first use;
/// the last write wins and later reads converge on it.
pub struct DeviceIdentityStore<S> {
    prefs: S,
    mint_lock: Mutex<()>,
}

impl<S: PreferenceStore> DeviceIdentityStore<S> {
    pub fn new(prefs: S) -> Self {
        Self {
            prefs,
            mint_lock: Mutex::new(()),
        }
    }

    pub fn preferences(&self) -> &S {
        &self.prefs
    }

    /// Identity exactly as persisted (lowercase when minted here).
    pub fn raw_identity(&self) -> String {
        let _guard = self.mint_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(stored) = self.prefs.get(PREFS_KEY) {
            return stored;
        }

        let address = format_with_colons(&generate_address());
        if !self.persist(&address) {
            // Still usable for this call; the next call mints again.
            warn!("Failed to store generated MAC address {}", address);
            return address;
        }
        info!("Generated (and stored) MAC address: {}", address);

        self.prefs.get(PREFS_KEY).unwrap_or(address)
    }

    /// Uppercased, sanitized identity as sent on the wire, e.g. `02:3F:A1:9C:44:7B`.
    pub fn get_identity(&self) -> String {
        let raw = self.raw_identity();
        sanitize_long(Some(raw.to_uppercase().as_str()))
    }

    pub fn digests(&self) -> IdentityDigests {
        let identity = self.get_identity();
        IdentityDigests {
            mac_sha1: digest(&identity, Algorithm::Sha1),
            mac_md5: digest(&identity, Algorithm::Md5),
        }
    }

    /// Add `mac_sha1` and `mac_md5` signatures to `params`.
    pub fn sign(&self, params: &mut RequestParameters) {
        let identity = self.get_identity();
        insert_digest(params, "mac_sha1", &identity, Algorithm::Sha1);
        insert_digest(params, "mac_md5", &identity, Algorithm::Md5);
    }

    fn persist(&self, value: &str) -> bool {
        (0..PERSIST_ATTEMPTS).any(|_| self.prefs.set(PREFS_KEY, value))
    }
}

/// Prefer a readable hardware address from `interfaces`, else the synthetic identity.
///
/// `net_root` is the directory holding one entry per interface (`/sys/class/net`
/// on Linux-based platforms).
pub fn resolve_mac_address<S: PreferenceStore>(
    store: &DeviceIdentityStore<S>,
    net_root: &Path,
    interfaces: &[&str],
) -> String {
    for interface in interfaces {
        if let Some(address) = platform::load_interface_address(net_root, interface) {
            return sanitize_long(Some(address.to_uppercase().as_str()));
        }
    }
    store.get_identity()
}
