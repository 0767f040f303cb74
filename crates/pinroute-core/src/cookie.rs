//! Pin persistence codec
//!
//! Carries the pinned set across units of work as a compact JSON cookie
//! payload: a list of `[alias, expires_at_epoch_secs]` pairs. A client that
//! just wrote keeps reading from the master for the pin TTL, which should
//! exceed replication lag.
//!
//! Decoding is total: a corrupt or hostile cookie never fails a request, it
//! degrades to "nothing pinned". Unknown aliases and expired entries are
//! dropped. Encoding merges the carried-over expiries with a fresh
//! `ceil(now + ttl)` expiry for every pin established in this unit of work,
//! and produces no token at all when the result is empty.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RouterConfig;
use crate::pinning::PinningContext;
use crate::registry::DbSetRegistry;
use crate::types::{Alias, DEFAULT_PIN_COOKIE, DEFAULT_PIN_TTL_SECS};

/// One pin as carried on the wire: `[alias, expires_at_epoch_secs]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPin(pub Alias, pub u64);

impl PersistedPin {
    /// The pinned database-set alias
    pub fn alias(&self) -> &str {
        &self.0
    }

    /// Epoch second at which the pin expires
    pub fn expires_at(&self) -> u64 {
        self.1
    }
}

/// Encodes and decodes the cross-request pin cookie
pub struct PinCodec {
    registry: Arc<DbSetRegistry>,
    ttl_secs: u64,
    cookie_name: String,
}

impl PinCodec {
    /// Create a codec with the default TTL and cookie name
    pub fn new(registry: Arc<DbSetRegistry>) -> Self {
        Self {
            registry,
            ttl_secs: DEFAULT_PIN_TTL_SECS,
            cookie_name: DEFAULT_PIN_COOKIE.to_string(),
        }
    }

    /// Create a codec using the TTL and cookie name from a configuration
    pub fn from_config(registry: Arc<DbSetRegistry>, config: &RouterConfig) -> Self {
        Self {
            registry,
            ttl_secs: config.pin_ttl_secs,
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// Name of the cookie this codec reads and writes
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Pin TTL in seconds; also the cookie max-age
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Extract the still-valid pins from a cookie payload
    ///
    /// Parse failures yield an empty list, never an error. Pins for aliases
    /// the registry does not manage (a renamed set, a tampering client) and
    /// pins expiring at or before `now` are dropped.
    pub fn decode(&self, raw: &str, now: f64) -> Vec<PersistedPin> {
        let parsed: Vec<PersistedPin> = match serde_json::from_str(raw) {
            Ok(pins) => pins,
            Err(error) => {
                debug!(%error, "unreadable pin cookie, treating as unpinned");
                return Vec::new();
            }
        };

        parsed
            .into_iter()
            .filter(|pin| {
                if !self.registry.is_managed(pin.alias()) {
                    debug!(alias = %pin.alias(), "dropping pin for unmanaged alias");
                    return false;
                }
                now < pin.expires_at() as f64
            })
            .collect()
    }

    /// Re-apply decoded pins to a fresh context
    ///
    /// Carried-over pins are not counted as new; re-counting them would renew
    /// their expiry on every request and they would never unpin.
    pub fn apply(&self, pins: &[PersistedPin], ctx: &mut PinningContext) {
        for pin in pins {
            ctx.pin(pin.alias(), false);
        }
    }

    /// Serialize the carried-over pins plus this unit's new pins
    ///
    /// Each newly pinned alias gets a fresh `ceil(now + ttl)` expiry,
    /// overwriting any carried expiry. Returns `None` when there is nothing
    /// to persist, so callers can skip setting the cookie entirely.
    pub fn encode(
        &self,
        carried: &BTreeMap<Alias, u64>,
        ctx: &PinningContext,
        now: f64,
    ) -> Option<String> {
        let mut pinned_until = carried.clone();

        let expiry = (now + self.ttl_secs as f64).ceil() as u64;
        for alias in ctx.newly_pinned() {
            pinned_until.insert(alias, expiry);
        }

        if pinned_until.is_empty() {
            return None;
        }

        let pairs: Vec<(&Alias, &u64)> = pinned_until.iter().collect();
        serde_json::to_string(&pairs).ok()
    }

    /// Start a unit of work: wipe the context, then re-apply the still-valid
    /// pins from the incoming cookie
    ///
    /// Returns the carried expiry map for the return trip through
    /// [`finish`](Self::finish).
    pub fn begin(
        &self,
        ctx: &mut PinningContext,
        token: Option<&str>,
        now: f64,
    ) -> BTreeMap<Alias, u64> {
        ctx.unpin_all();

        let mut carried = BTreeMap::new();
        if let Some(raw) = token {
            let pins = self.decode(raw, now);
            for pin in &pins {
                carried.insert(pin.alias().to_string(), pin.expires_at());
            }
            self.apply(&pins, ctx);
        }
        carried
    }

    /// End a unit of work: encode the outgoing cookie payload, if any
    pub fn finish(
        &self,
        carried: &BTreeMap<Alias, u64>,
        ctx: &PinningContext,
        now: f64,
    ) -> Option<String> {
        self.encode(carried, ctx, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbSettings, RouterConfig};
    use std::collections::HashMap;

    fn codec() -> PinCodec {
        let masters = HashMap::from([
            ("default".to_string(), DbSettings::new()),
            ("egg".to_string(), DbSettings::new()),
        ]);
        let replica_sets = HashMap::from([
            ("default".to_string(), vec![DbSettings::new(), DbSettings::new()]),
            ("egg".to_string(), vec![]),
        ]);
        let config = RouterConfig::new(masters, replica_sets);
        let registry = Arc::new(DbSetRegistry::new(&config).unwrap());
        PinCodec::from_config(registry, &config)
    }

    #[test]
    fn test_encode_new_pin() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("default", true);

        let token = codec.encode(&BTreeMap::new(), &ctx, 1.0).unwrap();
        assert_eq!(token, r#"[["default",16]]"#);
    }

    #[test]
    fn test_encode_nothing_yields_no_token() {
        let codec = codec();
        let ctx = PinningContext::new();
        assert_eq!(codec.encode(&BTreeMap::new(), &ctx, 1.0), None);
    }

    #[test]
    fn test_carried_pins_keep_their_expiry() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("default", false); // carried over, not new
        ctx.pin("egg", true);

        let carried = BTreeMap::from([("default".to_string(), 16u64)]);
        let token = codec.encode(&carried, &ctx, 2.0).unwrap();
        assert_eq!(token, r#"[["default",16],["egg",17]]"#);
    }

    #[test]
    fn test_new_pin_overwrites_carried_expiry() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("default", true);

        let carried = BTreeMap::from([("default".to_string(), 16u64)]);
        let token = codec.encode(&carried, &ctx, 10.0).unwrap();
        assert_eq!(token, r#"[["default",25]]"#);
    }

    #[test]
    fn test_fractional_now_rounds_up() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("default", true);

        let token = codec.encode(&BTreeMap::new(), &ctx, 1.25).unwrap();
        assert_eq!(token, r#"[["default",17]]"#);
    }

    #[test]
    fn test_decode_round_trip_within_ttl() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("default", true);
        let token = codec.encode(&BTreeMap::new(), &ctx, 1.0).unwrap();

        let pins = codec.decode(&token, 10.0);
        assert_eq!(pins, vec![PersistedPin("default".to_string(), 16)]);

        // Past the TTL nothing survives.
        assert!(codec.decode(&token, 20.0).is_empty());
        // Expiry exactly at `now` is already stale.
        assert!(codec.decode(&token, 16.0).is_empty());
    }

    #[test]
    fn test_decode_bad_cookie_degrades_to_empty() {
        let codec = codec();
        assert!(codec.decode("bad thing", 1.0).is_empty());
        assert!(codec.decode("{\"default\": 16}", 1.0).is_empty());
        assert!(codec.decode("", 1.0).is_empty());
    }

    #[test]
    fn test_decode_drops_unknown_aliases() {
        let codec = codec();
        let pins = codec.decode(r#"[["default",16],["hacked",16]]"#, 1.0);
        assert_eq!(pins, vec![PersistedPin("default".to_string(), 16)]);
    }

    #[test]
    fn test_apply_does_not_count_as_new() {
        let codec = codec();
        let mut ctx = PinningContext::new();

        let pins = vec![PersistedPin("default".to_string(), 16)];
        codec.apply(&pins, &mut ctx);

        assert!(ctx.is_pinned("default"));
        assert!(!ctx.is_newly_pinned("default"));
    }

    #[test]
    fn test_begin_wipes_and_reapplies() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("egg", true); // dirty state from a previous unit

        let carried = codec.begin(&mut ctx, Some(r#"[["default",16]]"#), 10.0);

        assert!(!ctx.is_pinned("egg"));
        assert!(ctx.is_pinned("default"));
        assert!(!ctx.is_newly_pinned("default"));
        assert_eq!(carried, BTreeMap::from([("default".to_string(), 16u64)]));
    }

    #[test]
    fn test_begin_without_token() {
        let codec = codec();
        let mut ctx = PinningContext::new();
        ctx.pin("egg", true);

        let carried = codec.begin(&mut ctx, None, 10.0);
        assert!(carried.is_empty());
        assert!(ctx.pinned().is_empty());
    }

    #[test]
    fn test_codec_configuration() {
        let codec = codec();
        assert_eq!(codec.cookie_name(), "pinroute_pinned_set");
        assert_eq!(codec.ttl_secs(), 15);
    }
}
