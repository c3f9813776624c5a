//! Configuration types and defaults
//!
//! `Settings` is the user-facing switch board persisted by the host.
//! `EngineConfig` holds the timing constants of the page controller.

use serde::{Deserialize, Serialize};

// =============================================================================
// User settings
// =============================================================================

/// User settings as stored by the extension (camelCase JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Scan and fill pages at all. Default: true
    pub auto_fill_enabled: bool,
    /// Ask before filling. Default: true
    pub show_confirmation: bool,
    /// Learn values from submitted forms. Default: true
    pub learn_from_forms: bool,
    /// Suspend scanning and learning entirely. Default: false
    pub guest_mode: bool,
    /// Show the on-page status badge. Default: true
    #[serde(rename = "showHUD")]
    pub show_hud: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_fill_enabled: true,
            show_confirmation: true,
            learn_from_forms: true,
            guest_mode: false,
            show_hud: true,
        }
    }
}

impl Settings {
    /// Scanning and filling are allowed
    pub fn fill_active(&self) -> bool {
        self.auto_fill_enabled && !self.guest_mode
    }

    /// Learning is allowed
    pub fn learn_active(&self) -> bool {
        self.learn_from_forms && !self.guest_mode
    }
}

// =============================================================================
// Engine timing
// =============================================================================

/// Timer durations of the page controller, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Delay of the first scan after start. Default: 300
    pub initial_scan_delay_ms: u64,
    /// Scans retried after finding nothing. Default: 3
    pub max_retries: u32,
    /// Delay between retries. Default: 1500
    pub retry_delay_ms: u64,
    /// Quiet period after DOM mutations. Default: 500
    pub mutation_debounce_ms: u64,
    /// Delay after an SPA navigation. Default: 1000
    pub url_change_delay_ms: u64,
    /// Delay after the page becomes visible again. Default: 500
    pub visibility_delay_ms: u64,
    /// Auto-dismiss of an unanswered confirmation. Default: 30000
    pub confirmation_timeout_ms: u64,
    /// Delay before blurring a filled element. Default: 50
    pub blur_delay_ms: u64,
    /// Delay before learning after a click or Enter. Default: 100
    pub learn_delay_ms: u64,
    /// Ancestors inspected for a form-like container. Default: 10
    pub nearest_form_hops: usize,
    /// Honor the per-site wait time before each scan. Default: true
    pub apply_site_wait: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_scan_delay_ms: 300,
            max_retries: 3,
            retry_delay_ms: 1500,
            mutation_debounce_ms: 500,
            url_change_delay_ms: 1000,
            visibility_delay_ms: 500,
            confirmation_timeout_ms: 30_000,
            blur_delay_ms: 50,
            learn_delay_ms: 100,
            nearest_form_hops: 10,
            apply_site_wait: true,
        }
    }
}

impl EngineConfig {
    /// Production timings
    pub fn production() -> Self {
        Self::default()
    }

    /// Every delay zero; timers still go through the queue
    pub fn immediate() -> Self {
        Self {
            initial_scan_delay_ms: 0,
            retry_delay_ms: 0,
            mutation_debounce_ms: 0,
            url_change_delay_ms: 0,
            visibility_delay_ms: 0,
            blur_delay_ms: 0,
            learn_delay_ms: 0,
            apply_site_wait: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_partial_json() {
        let settings: Settings = serde_json::from_str(r#"{ "guestMode": true }"#).unwrap();
        assert!(settings.auto_fill_enabled);
        assert!(settings.show_hud);
        assert!(settings.guest_mode);
        assert!(!settings.fill_active());
        assert!(!settings.learn_active());
    }

    #[test]
    fn test_settings_serialized_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["autoFillEnabled"], true);
        assert_eq!(json["showHUD"], true);
        assert_eq!(json["learnFromForms"], true);
    }

    #[test]
    fn test_engine_presets() {
        let config = EngineConfig::default();
        assert_eq!(config.retry_delay_ms, 1500);
        assert_eq!(config.confirmation_timeout_ms, 30_000);
        let fast = EngineConfig::immediate();
        assert_eq!(fast.max_retries, 3);
        assert_eq!(fast.mutation_debounce_ms, 0);
    }
}
