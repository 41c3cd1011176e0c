//! Probes into the host platform: permissions, advertising id, hardware address.
//!
//! The host app implements the traits; the agent only asks questions and
//! degrades gracefully when the answer is missing.

use std::path::Path;

use beacon_crypto::parse_address;
use beacon_types::Permission;
use tracing::{error, warn};

pub trait PermissionProbe: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// Probe for hosts without a permission model.
pub struct GrantAll;

impl PermissionProbe for GrantAll {
    fn is_granted(&self, _permission: Permission) -> bool {
        true
    }
}

/// Check the permissions the agent relies on.
///
/// Returns `false` only when INTERNET is missing. A missing
/// ACCESS_WIFI_STATE is logged but not fatal.
pub fn check_permissions(probe: &dyn PermissionProbe) -> bool {
    let mut result = true;

    if !probe.is_granted(Permission::Internet) {
        error!("This SDK requires the INTERNET permission. See the README for details.");
        result = false;
    }
    if !probe.is_granted(Permission::AccessWifiState) {
        warn!(
            "You can improve your tracking results by adding the ACCESS_WIFI_STATE permission. See the README for details."
        );
    }

    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingInfo {
    pub id: String,
    pub limit_ad_tracking: bool,
}

pub trait AdvertisingIdSource: Send + Sync {
    fn advertising_info(&self) -> anyhow::Result<AdvertisingInfo>;
}

/// Advertising identifier, if the user allows it to be used.
///
/// Any lookup failure is logged and treated as "no identifier".
pub fn advertising_id(source: &dyn AdvertisingIdSource) -> Option<String> {
    match source.advertising_info() {
        Ok(info) if info.limit_ad_tracking => None,
        Ok(info) if info.id.is_empty() => None,
        Ok(info) => Some(info.id),
        Err(e) => {
            warn!("Error getting advertising ID: {}", e);
            None
        }
    }
}

/// Read `<net_root>/<interface>/address`.
///
/// Returns `None` when the file is missing, malformed, or all zeros.
pub fn load_interface_address(net_root: &Path, interface: &str) -> Option<String> {
    let raw = std::fs::read_to_string(net_root.join(interface).join("address")).ok()?;
    let bytes = parse_address(&raw)?;
    if bytes.iter().all(|b| *b == 0) {
        return None;
    }
    Some(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Granted(HashSet<Permission>);

    impl PermissionProbe for Granted {
        fn is_granted(&self, permission: Permission) -> bool {
            self.0.contains(&permission)
        }
    }

    struct FixedAdvertising(Option<AdvertisingInfo>);

    impl AdvertisingIdSource for FixedAdvertising {
        fn advertising_info(&self) -> anyhow::Result<AdvertisingInfo> {
            self.0
                .clone()
                .ok_or_else(|| anyhow::anyhow!("play services unavailable"))
        }
    }

    #[test]
    fn internet_is_required_wifi_is_optional() {
        assert!(check_permissions(&GrantAll));
        assert!(check_permissions(&Granted([Permission::Internet].into())));
        assert!(!check_permissions(&Granted([Permission::AccessWifiState].into())));
        assert!(!check_permissions(&Granted(HashSet::new())));
    }

    #[test]
    fn advertising_id_respects_limit_ad_tracking() {
        let allowed = FixedAdvertising(Some(AdvertisingInfo {
            id: "38400000-8cf0-11bd-b23e-10b96e40000d".into(),
            limit_ad_tracking: false,
        }));
        assert_eq!(
            advertising_id(&allowed).as_deref(),
            Some("38400000-8cf0-11bd-b23e-10b96e40000d")
        );

        let limited = FixedAdvertising(Some(AdvertisingInfo {
            id: "38400000-8cf0-11bd-b23e-10b96e40000d".into(),
            limit_ad_tracking: true,
        }));
        assert_eq!(advertising_id(&limited), None);
    }

    #[test]
    fn advertising_lookup_failure_is_absent() {
        assert_eq!(advertising_id(&FixedAdvertising(None)), None);
    }

    #[test]
    fn missing_interface_is_none() {
        let root = std::env::temp_dir().join("beacon_net_missing");
        assert_eq!(load_interface_address(&root, "wlan0"), None);
    }
}
