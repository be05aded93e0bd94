use super::defaults;
use super::models::{AlignerConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    matching: MatchingConfig,
    #[serde(default)]
    highlight: HighlightConfig,
    #[serde(default)]
    locate: LocateConfig,
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AlignerConfig {
    fn from(tables: ConfigTables) -> Self {
        AlignerConfig {
            context_radius: tables.matching.context_radius,
            search_radius: tables.matching.search_radius,
            word_weight: tables.matching.word_weight,
            context_weight: tables.matching.context_weight,
            set_overlap_weight: tables.matching.set_overlap_weight,
            positional_weight: tables.matching.positional_weight,
            exact_threshold: tables.matching.exact_threshold,
            fuzzy_threshold: tables.matching.fuzzy_threshold,
            lookahead_secs: tables.highlight.lookahead_secs,
            fallback_words_per_sec: tables.highlight.fallback_words_per_sec,
            gap_words_per_sec: tables.highlight.gap_words_per_sec,
            min_gap_secs: tables.highlight.min_gap_secs,
            end_flush_secs: tables.highlight.end_flush_secs,
            initial_max_words: tables.highlight.initial_max_words,
            forward_search_limit: tables.highlight.forward_search_limit,
            locate_direct_weight: tables.locate.direct_weight,
            locate_context_weight: tables.locate.context_weight,
            min_populated_ratio: tables.locate.min_populated_ratio,
            locate_min_probability: tables.locate.min_probability,
            offset_ms: tables.timing.offset_ms,
            tick_hz: tables.playback.tick_hz,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AlignerConfig> for ConfigTables {
    fn from(config: &AlignerConfig) -> Self {
        ConfigTables {
            matching: MatchingConfig {
                context_radius: config.context_radius,
                search_radius: config.search_radius,
                word_weight: config.word_weight,
                context_weight: config.context_weight,
                set_overlap_weight: config.set_overlap_weight,
                positional_weight: config.positional_weight,
                exact_threshold: config.exact_threshold,
                fuzzy_threshold: config.fuzzy_threshold,
            },
            highlight: HighlightConfig {
                lookahead_secs: config.lookahead_secs,
                fallback_words_per_sec: config.fallback_words_per_sec,
                gap_words_per_sec: config.gap_words_per_sec,
                min_gap_secs: config.min_gap_secs,
                end_flush_secs: config.end_flush_secs,
                initial_max_words: config.initial_max_words,
                forward_search_limit: config.forward_search_limit,
            },
            locate: LocateConfig {
                direct_weight: config.locate_direct_weight,
                context_weight: config.locate_context_weight,
                min_populated_ratio: config.min_populated_ratio,
                min_probability: config.locate_min_probability,
            },
            timing: TimingConfig {
                offset_ms: config.offset_ms,
            },
            playback: PlaybackConfig {
                tick_hz: config.tick_hz,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct MatchingConfig {
    #[serde(default = "defaults::default_context_radius")]
    context_radius: usize,
    #[serde(default = "defaults::default_search_radius")]
    search_radius: usize,
    #[serde(default = "defaults::default_word_weight")]
    word_weight: f64,
    #[serde(default = "defaults::default_context_weight")]
    context_weight: f64,
    #[serde(default = "defaults::default_set_overlap_weight")]
    set_overlap_weight: f64,
    #[serde(default = "defaults::default_positional_weight")]
    positional_weight: f64,
    #[serde(default = "defaults::default_exact_threshold")]
    exact_threshold: f64,
    #[serde(default = "defaults::default_fuzzy_threshold")]
    fuzzy_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            context_radius: defaults::default_context_radius(),
            search_radius: defaults::default_search_radius(),
            word_weight: defaults::default_word_weight(),
            context_weight: defaults::default_context_weight(),
            set_overlap_weight: defaults::default_set_overlap_weight(),
            positional_weight: defaults::default_positional_weight(),
            exact_threshold: defaults::default_exact_threshold(),
            fuzzy_threshold: defaults::default_fuzzy_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct HighlightConfig {
    #[serde(default = "defaults::default_lookahead_secs")]
    lookahead_secs: f64,
    #[serde(default = "defaults::default_fallback_words_per_sec")]
    fallback_words_per_sec: f64,
    #[serde(default = "defaults::default_gap_words_per_sec")]
    gap_words_per_sec: f64,
    #[serde(default = "defaults::default_min_gap_secs")]
    min_gap_secs: f64,
    #[serde(default = "defaults::default_end_flush_secs")]
    end_flush_secs: f64,
    #[serde(default = "defaults::default_initial_max_words")]
    initial_max_words: usize,
    #[serde(default = "defaults::default_forward_search_limit")]
    forward_search_limit: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            lookahead_secs: defaults::default_lookahead_secs(),
            fallback_words_per_sec: defaults::default_fallback_words_per_sec(),
            gap_words_per_sec: defaults::default_gap_words_per_sec(),
            min_gap_secs: defaults::default_min_gap_secs(),
            end_flush_secs: defaults::default_end_flush_secs(),
            initial_max_words: defaults::default_initial_max_words(),
            forward_search_limit: defaults::default_forward_search_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LocateConfig {
    #[serde(default = "defaults::default_locate_direct_weight")]
    direct_weight: f64,
    #[serde(default = "defaults::default_locate_context_weight")]
    context_weight: f64,
    #[serde(default = "defaults::default_min_populated_ratio")]
    min_populated_ratio: f64,
    #[serde(default = "defaults::default_locate_min_probability")]
    min_probability: f64,
}

impl Default for LocateConfig {
    fn default() -> Self {
        LocateConfig {
            direct_weight: defaults::default_locate_direct_weight(),
            context_weight: defaults::default_locate_context_weight(),
            min_populated_ratio: defaults::default_min_populated_ratio(),
            min_probability: defaults::default_locate_min_probability(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
struct TimingConfig {
    #[serde(default)]
    offset_ms: i64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_tick_hz")]
    tick_hz: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            tick_hz: defaults::default_tick_hz(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
