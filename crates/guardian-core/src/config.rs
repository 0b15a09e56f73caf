//! Guardian configuration.
//!
//! Replaces the original source's module-level globals (`CONFIG_DEFAULT_VALUES`,
//! `CPU_SHARES_PER_WATT` as a bare constant) with a single explicit value
//! threaded through call sites, built the way the teacher builds
//! `HealthCheckConfig`/`CircuitBreakerConfig`: a `Builder` with `with_*`
//! setters and `unwrap_or(default)` merges on `build()`.

use std::time::Duration;

use crate::types::Resource;

/// Tunables for one tick of the control loop.
///
/// Defaults match `CONFIG_DEFAULT_VALUES` in the source this was distilled
/// from. At `LoadConfig` these are merged with whatever the service
/// document's `config` object carries, service values winning.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub window_timelapse: Duration,
    pub window_delay: Duration,
    pub event_timeout: Duration,
    pub debug: bool,
    pub structure_guarded: StructureGuarded,
    pub guardable_resources: Vec<Resource>,
    pub cpu_shares_per_watt: i64,
    pub active: bool,
}

/// Which structure subtype a tick fans out over, matching
/// `STRUCTURE_GUARDED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureGuarded {
    Container,
    Application,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `LoadConfig` (§4.8): starts from defaults and overrides whatever
    /// keys the service document's `config` object carries. Unknown keys
    /// and wrong-typed values are ignored rather than rejected -- the
    /// service document is operator-edited JSON, not a schema-checked
    /// payload.
    pub fn merge_from_service_config(value: &serde_json::Value) -> Config {
        let defaults = Config::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };

        let window_timelapse = obj
            .get("WINDOW_TIMELAPSE")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(defaults.window_timelapse);
        let window_delay = obj
            .get("WINDOW_DELAY")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(defaults.window_delay);
        let event_timeout = obj
            .get("EVENT_TIMEOUT")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(defaults.event_timeout);
        let debug = obj.get("DEBUG").and_then(|v| v.as_bool()).unwrap_or(defaults.debug);
        let active = obj.get("ACTIVE").and_then(|v| v.as_bool()).unwrap_or(defaults.active);
        let structure_guarded = obj
            .get("STRUCTURE_GUARDED")
            .and_then(|v| v.as_str())
            .and_then(|s| match s {
                "container" => Some(StructureGuarded::Container),
                "application" => Some(StructureGuarded::Application),
                _ => None,
            })
            .unwrap_or(defaults.structure_guarded);
        let guardable_resources = obj
            .get("GUARDABLE_RESOURCES")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|r| r.as_str()).filter_map(Resource::parse).collect::<Vec<_>>())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.guardable_resources);
        let cpu_shares_per_watt = obj
            .get("CPU_SHARES_PER_WATT")
            .and_then(|v| v.as_i64())
            .unwrap_or(defaults.cpu_shares_per_watt);

        Config {
            window_timelapse,
            window_delay,
            event_timeout,
            debug,
            structure_guarded,
            guardable_resources,
            cpu_shares_per_watt,
            active,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_timelapse: Duration::from_secs(10),
            window_delay: Duration::from_secs(10),
            event_timeout: Duration::from_secs(40),
            debug: true,
            structure_guarded: StructureGuarded::Container,
            guardable_resources: vec![Resource::Cpu],
            cpu_shares_per_watt: 5,
            active: true,
        }
    }
}

/// Builder for [`Config`]; every setter is optional and falls back to the
/// same defaults as [`Config::default`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    window_timelapse: Option<Duration>,
    window_delay: Option<Duration>,
    event_timeout: Option<Duration>,
    debug: Option<bool>,
    structure_guarded: Option<StructureGuarded>,
    guardable_resources: Option<Vec<Resource>>,
    cpu_shares_per_watt: Option<i64>,
    active: Option<bool>,
}

impl ConfigBuilder {
    pub fn window_timelapse(mut self, v: Duration) -> Self {
        self.window_timelapse = Some(v);
        self
    }

    pub fn window_delay(mut self, v: Duration) -> Self {
        self.window_delay = Some(v);
        self
    }

    pub fn event_timeout(mut self, v: Duration) -> Self {
        self.event_timeout = Some(v);
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.debug = Some(v);
        self
    }

    pub fn structure_guarded(mut self, v: StructureGuarded) -> Self {
        self.structure_guarded = Some(v);
        self
    }

    pub fn guardable_resources(mut self, v: Vec<Resource>) -> Self {
        self.guardable_resources = Some(v);
        self
    }

    pub fn cpu_shares_per_watt(mut self, v: i64) -> Self {
        self.cpu_shares_per_watt = Some(v);
        self
    }

    pub fn active(mut self, v: bool) -> Self {
        self.active = Some(v);
        self
    }

    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            window_timelapse: self.window_timelapse.unwrap_or(defaults.window_timelapse),
            window_delay: self.window_delay.unwrap_or(defaults.window_delay),
            event_timeout: self.event_timeout.unwrap_or(defaults.event_timeout),
            debug: self.debug.unwrap_or(defaults.debug),
            structure_guarded: self
                .structure_guarded
                .unwrap_or(defaults.structure_guarded),
            guardable_resources: self
                .guardable_resources
                .unwrap_or(defaults.guardable_resources),
            cpu_shares_per_watt: self
                .cpu_shares_per_watt
                .unwrap_or(defaults.cpu_shares_per_watt),
            active: self.active.unwrap_or(defaults.active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_source_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.window_timelapse, Duration::from_secs(10));
        assert_eq!(cfg.window_delay, Duration::from_secs(10));
        assert_eq!(cfg.event_timeout, Duration::from_secs(40));
        assert!(cfg.debug);
        assert_eq!(cfg.structure_guarded, StructureGuarded::Container);
        assert_eq!(cfg.guardable_resources, vec![Resource::Cpu]);
        assert_eq!(cfg.cpu_shares_per_watt, 5);
        assert!(cfg.active);
    }

    #[test]
    fn builder_overrides_only_what_is_set() {
        let cfg = Config::builder()
            .active(false)
            .cpu_shares_per_watt(8)
            .build();
        assert!(!cfg.active);
        assert_eq!(cfg.cpu_shares_per_watt, 8);
        // untouched fields keep their defaults
        assert_eq!(cfg.window_timelapse, Duration::from_secs(10));
    }

    #[test]
    fn merge_from_service_config_overrides_present_keys_only() {
        let value = serde_json::json!({
            "ACTIVE": false,
            "CPU_SHARES_PER_WATT": 8,
            "GUARDABLE_RESOURCES": ["cpu", "mem"],
        });
        let cfg = Config::merge_from_service_config(&value);
        assert!(!cfg.active);
        assert_eq!(cfg.cpu_shares_per_watt, 8);
        assert_eq!(cfg.guardable_resources, vec![Resource::Cpu, Resource::Mem]);
        // untouched keys keep their defaults
        assert_eq!(cfg.window_timelapse, Duration::from_secs(10));
        assert_eq!(cfg.structure_guarded, StructureGuarded::Container);
    }

    #[test]
    fn merge_from_service_config_falls_back_to_defaults_on_non_object() {
        let cfg = Config::merge_from_service_config(&serde_json::Value::Null);
        assert_eq!(cfg, Config::default());
    }
}
