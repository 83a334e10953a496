//! Bridge configuration.

use std::time::Duration;

/// Default import module name for all host functions.
pub const DEFAULT_IMPORT_MODULE: &str = "env";

/// Configuration for a guest bridge.
///
/// Controls the import namespace, memory limits, surface scaling and the
/// event queue.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Module name the guest imports host functions from.
    pub import_module: String,

    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 16384 pages = 1 GiB.
    pub max_memory_pages: u32,

    /// Factor the physical backing buffer is scaled by relative to the
    /// logical window size. Default: 2. Zero is treated as 1.
    pub multisample_scaling: u32,

    /// Maximum number of undelivered input events.
    pub event_queue_capacity: usize,

    /// Sleep between frames when the guest does not request one.
    pub default_frame_interval: Duration,

    /// Whether routine guest output reaches the log sink. Fatal output from
    /// `fail` is always delivered.
    pub enable_guest_logs: bool,
}

impl BridgeConfig {
    /// Multisample factor with the zero case normalized.
    pub fn scaling(&self) -> u32 {
        self.multisample_scaling.max(1)
    }

    /// Maximum linear memory size in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_pages as usize).saturating_mul(65536)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            import_module: DEFAULT_IMPORT_MODULE.to_string(),
            max_memory_pages: 16384, // 1 GiB
            multisample_scaling: 2,
            event_queue_capacity: 1024,
            default_frame_interval: Duration::from_millis(16),
            enable_guest_logs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.import_module, "env");
        assert_eq!(config.max_memory_pages, 16384);
        assert_eq!(config.multisample_scaling, 2);
        assert_eq!(config.event_queue_capacity, 1024);
        assert_eq!(config.default_frame_interval, Duration::from_millis(16));
        assert!(config.enable_guest_logs);
    }

    #[test]
    fn test_zero_scaling_normalized() {
        let config = BridgeConfig {
            multisample_scaling: 0,
            ..BridgeConfig::default()
        };
        assert_eq!(config.scaling(), 1);
    }

    #[test]
    fn test_max_memory_bytes() {
        let config = BridgeConfig {
            max_memory_pages: 2,
            ..BridgeConfig::default()
        };
        assert_eq!(config.max_memory_bytes(), 131072);
    }
}
