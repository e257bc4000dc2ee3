//! Promptmeter generation controls
//!
//! Sampling parameters forwarded to the chat-completions endpoint, the
//! bounds they are clamped to before every call, and the named presets the
//! services expose.

use serde::{Deserialize, Serialize};

/// Sampling parameters for one generation call.
///
/// Deserializes with per-field defaults so partial JSON bodies work; always
/// pass through [`GenerationConfig::clamped`] before handing the values to a
/// provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "defaults::temperature")]
    pub temperature: f64,
    #[serde(default = "defaults::top_p")]
    pub top_p: f64,
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub frequency_penalty: f64,
    #[serde(default)]
    pub presence_penalty: f64,
    #[serde(default)]
    pub stop: Vec<String>,
}

mod defaults {
    pub fn temperature() -> f64 {
        0.7
    }
    pub fn top_p() -> f64 {
        1.0
    }
    pub fn max_tokens() -> u32 {
        200
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: defaults::temperature(),
            top_p: defaults::top_p(),
            max_tokens: defaults::max_tokens(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: Vec::new(),
        }
    }
}

/// Hard bounds enforced on every call.
pub mod bounds {
    pub const TEMPERATURE: (f64, f64) = (0.0, 2.0);
    pub const TOP_P: (f64, f64) = (1e-6, 1.0);
    pub const MAX_TOKENS: (u32, u32) = (1, 2000);
    pub const PENALTY: (f64, f64) = (0.0, 2.0);
}

impl GenerationConfig {
    /// Clamp every field into its allowed range. Out-of-range values are
    /// clipped, not rejected, so a caller asking for `max_tokens: 100000`
    /// gets the ceiling rather than an error.
    pub fn clamped(mut self) -> Self {
        self.temperature = self.temperature.clamp(bounds::TEMPERATURE.0, bounds::TEMPERATURE.1);
        self.top_p = self.top_p.clamp(bounds::TOP_P.0, bounds::TOP_P.1);
        self.max_tokens = self.max_tokens.clamp(bounds::MAX_TOKENS.0, bounds::MAX_TOKENS.1);
        self.frequency_penalty = self.frequency_penalty.clamp(bounds::PENALTY.0, bounds::PENALTY.1);
        self.presence_penalty = self.presence_penalty.clamp(bounds::PENALTY.0, bounds::PENALTY.1);
        self
    }

    /// Look up a named preset.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "deterministic_tool" => Some(Self {
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 150,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
                stop: vec!["\n\n".to_string()],
            }),
            "rag_qa" => Some(Self {
                temperature: 0.3,
                top_p: 0.9,
                max_tokens: 300,
                frequency_penalty: 0.2,
                presence_penalty: 0.0,
                stop: Vec::new(),
            }),
            "creative_writer" => Some(Self {
                temperature: 0.9,
                top_p: 0.95,
                max_tokens: 400,
                frequency_penalty: 0.3,
                presence_penalty: 0.2,
                stop: Vec::new(),
            }),
            _ => None,
        }
    }

    /// Names accepted by [`GenerationConfig::preset`].
    pub fn preset_names() -> &'static [&'static str] {
        &["deterministic_tool", "rag_qa", "creative_writer"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_within_bounds() {
        let config = GenerationConfig::default();
        assert_eq!(config.clamped(), GenerationConfig::default());
    }

    #[test]
    fn clamping_clips_out_of_range_values() {
        let config = GenerationConfig {
            temperature: 5.0,
            top_p: 0.0,
            max_tokens: 100_000,
            frequency_penalty: -1.0,
            presence_penalty: 3.0,
            stop: Vec::new(),
        }
        .clamped();

        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.top_p, bounds::TOP_P.0);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.frequency_penalty, 0.0);
        assert_eq!(config.presence_penalty, 2.0);
    }

    #[test]
    fn presets_resolve_by_name() {
        let tool = GenerationConfig::preset("deterministic_tool").unwrap();
        assert_eq!(tool.temperature, 0.0);
        assert_eq!(tool.stop, vec!["\n\n".to_string()]);

        let qa = GenerationConfig::preset("rag_qa").unwrap();
        assert_eq!(qa.max_tokens, 300);

        assert!(GenerationConfig::preset("does_not_exist").is_none());
    }

    #[test]
    fn every_preset_survives_clamping_unchanged() {
        for name in GenerationConfig::preset_names() {
            let preset = GenerationConfig::preset(name).unwrap();
            assert_eq!(preset.clone().clamped(), preset, "preset {name} out of bounds");
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: GenerationConfig = serde_json::from_str(r#"{"temperature": 0.2}"#).unwrap();
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.top_p, 1.0);
        assert_eq!(config.max_tokens, 200);
        assert!(config.stop.is_empty());
    }
}
