#![forbid(unsafe_code)]

//! Reactor configuration.
//!
//! Defaults suit tests and embedded use. `from_env` lets a host override the
//! limits without recompiling:
//!
//! | Variable                      | Field                  |
//! |-------------------------------|------------------------|
//! | `AEXPR_MAX_CASCADE_DEPTH`     | `max_cascade_depth`    |
//! | `AEXPR_MAX_EVAL_DEPTH`        | `max_eval_depth`       |
//! | `AEXPR_CATCH_HANDLER_PANICS`  | `catch_handler_panics` |

use aexpr_interp::DEFAULT_MAX_DEPTH;

/// Default bound on nested re-evaluations (see [`ReactorConfig::max_cascade_depth`]).
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorConfig {
    /// Maximum number of re-evaluations allowed to be in flight at once.
    ///
    /// A write performed inside a handler re-enters the notification
    /// protocol synchronously. An expression whose handler writes a property
    /// it depends on would otherwise recurse until the stack overflows.
    pub max_cascade_depth: usize,
    /// Maximum expression nesting inside a single evaluation.
    pub max_eval_depth: usize,
    /// Isolate panicking change handlers instead of unwinding through the
    /// triggering write.
    pub catch_handler_panics: bool,
    /// Define the `Math` global in new reactors.
    pub install_math: bool,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            max_eval_depth: DEFAULT_MAX_DEPTH,
            catch_handler_panics: true,
            install_math: true,
        }
    }
}

impl ReactorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `AEXPR_*` environment variables.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(depth) = lookup("AEXPR_MAX_CASCADE_DEPTH").and_then(|v| v.trim().parse().ok())
        {
            config.max_cascade_depth = depth;
        }
        if let Some(depth) = lookup("AEXPR_MAX_EVAL_DEPTH").and_then(|v| v.trim().parse().ok()) {
            config.max_eval_depth = depth;
        }
        if let Some(flag) = lookup("AEXPR_CATCH_HANDLER_PANICS").and_then(|v| parse_flag(&v)) {
            config.catch_handler_panics = flag;
        }
        config
    }

    #[must_use]
    pub fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_eval_depth(mut self, depth: usize) -> Self {
        self.max_eval_depth = depth;
        self
    }

    #[must_use]
    pub fn with_catch_handler_panics(mut self, catch: bool) -> Self {
        self.catch_handler_panics = catch;
        self
    }

    #[must_use]
    pub fn with_math(mut self, install: bool) -> Self {
        self.install_math = install;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
