pub(crate) fn default_context_radius() -> usize {
    5
}

pub(crate) fn default_search_radius() -> usize {
    10
}

pub(crate) fn default_word_weight() -> f64 {
    0.4
}

pub(crate) fn default_context_weight() -> f64 {
    0.6
}

pub(crate) fn default_set_overlap_weight() -> f64 {
    0.6
}

pub(crate) fn default_positional_weight() -> f64 {
    0.4
}

pub(crate) fn default_exact_threshold() -> f64 {
    0.2
}

pub(crate) fn default_fuzzy_threshold() -> f64 {
    0.3
}

pub(crate) fn default_lookahead_secs() -> f64 {
    0.1
}

pub(crate) fn default_fallback_words_per_sec() -> f64 {
    2.5
}

pub(crate) fn default_gap_words_per_sec() -> f64 {
    3.0
}

pub(crate) fn default_min_gap_secs() -> f64 {
    0.1
}

pub(crate) fn default_end_flush_secs() -> f64 {
    0.1
}

pub(crate) fn default_initial_max_words() -> usize {
    3
}

pub(crate) fn default_forward_search_limit() -> usize {
    10
}

pub(crate) fn default_locate_direct_weight() -> f64 {
    0.7
}

pub(crate) fn default_locate_context_weight() -> f64 {
    0.3
}

pub(crate) fn default_min_populated_ratio() -> f64 {
    0.5
}

pub(crate) fn default_locate_min_probability() -> f64 {
    0.4
}

pub(crate) fn default_tick_hz() -> f64 {
    20.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
