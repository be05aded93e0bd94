use serde::Deserialize;

/// Engine configuration; deserializable from TOML.
///
/// The flat shape is what the engine reads. On disk the same fields are
/// grouped into tables (see `tables.rs`).
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AlignerConfig {
    /// Words taken on each side of a center word when building context windows.
    #[serde(default = "crate::config::defaults::default_context_radius")]
    pub context_radius: usize,
    /// Text indices scanned on each side of the search center per query.
    #[serde(default = "crate::config::defaults::default_search_radius")]
    pub search_radius: usize,
    #[serde(default = "crate::config::defaults::default_word_weight")]
    pub word_weight: f64,
    #[serde(default = "crate::config::defaults::default_context_weight")]
    pub context_weight: f64,
    #[serde(default = "crate::config::defaults::default_set_overlap_weight")]
    pub set_overlap_weight: f64,
    #[serde(default = "crate::config::defaults::default_positional_weight")]
    pub positional_weight: f64,
    /// Acceptance threshold when the candidate word matches exactly.
    #[serde(default = "crate::config::defaults::default_exact_threshold")]
    pub exact_threshold: f64,
    /// Acceptance threshold when the candidate word differs.
    #[serde(default = "crate::config::defaults::default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "crate::config::defaults::default_lookahead_secs")]
    pub lookahead_secs: f64,
    #[serde(default = "crate::config::defaults::default_fallback_words_per_sec")]
    pub fallback_words_per_sec: f64,
    #[serde(default = "crate::config::defaults::default_gap_words_per_sec")]
    pub gap_words_per_sec: f64,
    /// Audio gaps at or below this length are treated as no gap at all.
    #[serde(default = "crate::config::defaults::default_min_gap_secs")]
    pub min_gap_secs: f64,
    #[serde(default = "crate::config::defaults::default_end_flush_secs")]
    pub end_flush_secs: f64,
    #[serde(default = "crate::config::defaults::default_initial_max_words")]
    pub initial_max_words: usize,
    #[serde(default = "crate::config::defaults::default_forward_search_limit")]
    pub forward_search_limit: usize,
    #[serde(default = "crate::config::defaults::default_locate_direct_weight")]
    pub locate_direct_weight: f64,
    #[serde(default = "crate::config::defaults::default_locate_context_weight")]
    pub locate_context_weight: f64,
    #[serde(default = "crate::config::defaults::default_min_populated_ratio")]
    pub min_populated_ratio: f64,
    #[serde(default = "crate::config::defaults::default_locate_min_probability")]
    pub locate_min_probability: f64,
    /// Signed offset applied to every timing record at ingest.
    #[serde(default)]
    pub offset_ms: i64,
    #[serde(default = "crate::config::defaults::default_tick_hz")]
    pub tick_hz: f64,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        AlignerConfig {
            context_radius: crate::config::defaults::default_context_radius(),
            search_radius: crate::config::defaults::default_search_radius(),
            word_weight: crate::config::defaults::default_word_weight(),
            context_weight: crate::config::defaults::default_context_weight(),
            set_overlap_weight: crate::config::defaults::default_set_overlap_weight(),
            positional_weight: crate::config::defaults::default_positional_weight(),
            exact_threshold: crate::config::defaults::default_exact_threshold(),
            fuzzy_threshold: crate::config::defaults::default_fuzzy_threshold(),
            lookahead_secs: crate::config::defaults::default_lookahead_secs(),
            fallback_words_per_sec: crate::config::defaults::default_fallback_words_per_sec(),
            gap_words_per_sec: crate::config::defaults::default_gap_words_per_sec(),
            min_gap_secs: crate::config::defaults::default_min_gap_secs(),
            end_flush_secs: crate::config::defaults::default_end_flush_secs(),
            initial_max_words: crate::config::defaults::default_initial_max_words(),
            forward_search_limit: crate::config::defaults::default_forward_search_limit(),
            locate_direct_weight: crate::config::defaults::default_locate_direct_weight(),
            locate_context_weight: crate::config::defaults::default_locate_context_weight(),
            min_populated_ratio: crate::config::defaults::default_min_populated_ratio(),
            locate_min_probability: crate::config::defaults::default_locate_min_probability(),
            offset_ms: 0,
            tick_hz: crate::config::defaults::default_tick_hz(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl AlignerConfig {
    /// Keep runtime values in bounds regardless of where the config came from.
    pub fn sanitized(mut self) -> Self {
        let defaults = AlignerConfig::default();

        self.context_radius = self.context_radius.max(1);
        self.search_radius = self.search_radius.max(1);
        for weight in [
            &mut self.word_weight,
            &mut self.context_weight,
            &mut self.set_overlap_weight,
            &mut self.positional_weight,
            &mut self.exact_threshold,
            &mut self.fuzzy_threshold,
            &mut self.locate_direct_weight,
            &mut self.locate_context_weight,
            &mut self.min_populated_ratio,
            &mut self.locate_min_probability,
        ] {
            *weight = if weight.is_finite() {
                weight.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        self.lookahead_secs = non_negative_or(self.lookahead_secs, defaults.lookahead_secs);
        self.min_gap_secs = non_negative_or(self.min_gap_secs, defaults.min_gap_secs);
        self.end_flush_secs = non_negative_or(self.end_flush_secs, defaults.end_flush_secs);
        self.fallback_words_per_sec =
            positive_or(self.fallback_words_per_sec, defaults.fallback_words_per_sec);
        self.gap_words_per_sec = positive_or(self.gap_words_per_sec, defaults.gap_words_per_sec);
        self.tick_hz = positive_or(self.tick_hz, defaults.tick_hz).clamp(1.0, 240.0);
        self
    }

    pub fn tick_interval_secs(&self) -> f64 {
        1.0 / self.tick_hz.max(1.0)
    }
}

fn non_negative_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_weights_and_rates() {
        let config = AlignerConfig {
            word_weight: 1.7,
            fuzzy_threshold: f64::NAN,
            fallback_words_per_sec: -2.0,
            context_radius: 0,
            tick_hz: 10_000.0,
            ..AlignerConfig::default()
        }
        .sanitized();

        assert_eq!(config.word_weight, 1.0);
        assert_eq!(config.fuzzy_threshold, 0.0);
        assert_eq!(config.fallback_words_per_sec, 2.5);
        assert_eq!(config.context_radius, 1);
        assert_eq!(config.tick_hz, 240.0);
    }

    #[test]
    fn default_tick_interval_is_twenty_hertz() {
        let config = AlignerConfig::default();
        assert!((config.tick_interval_secs() - 0.05).abs() < 1e-12);
    }
}
