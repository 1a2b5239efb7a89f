// SPDX-License-Identifier: MIT
//
// Runtime configuration from the environment.
//
//   RAWED_TAB_WIDTH       spaces inserted by Tab (1..=16, default 4)
//   RAWED_INPUT           key input backend: auto | unix | windows
//   RAWED_ESC_TIMEOUT_MS  wait after ESC for the rest of a sequence (default 25)
//   RAWED_LOG             log file path; no logging when unset
//   RUST_LOG              log filter (default `info`)
//
// Invalid values fall back to the default. The problems are kept in
// `warnings` and logged once logging is up, since the log file itself
// comes from this configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use rawed_term::input::{DEFAULT_ESCAPE_TIMEOUT, InputBackend};

pub const DEFAULT_TAB_WIDTH: usize = 4;
const TAB_WIDTH_RANGE: std::ops::RangeInclusive<usize> = 1..=16;
const ESC_TIMEOUT_MAX_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tab_width: usize,
    pub input: InputBackend,
    pub escape_timeout: Duration,
    pub log_file: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            input: InputBackend::Auto,
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            log_file: None,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("RAWED_TAB_WIDTH") {
            match raw.trim().parse::<usize>() {
                Ok(n) if TAB_WIDTH_RANGE.contains(&n) => config.tab_width = n,
                _ => config.warn("RAWED_TAB_WIDTH", &raw, "a number from 1 to 16"),
            }
        }

        if let Some(raw) = get("RAWED_INPUT") {
            match InputBackend::from_name(&raw) {
                Some(backend) => config.input = backend,
                None => config.warn("RAWED_INPUT", &raw, "auto, unix or windows"),
            }
        }

        if let Some(raw) = get("RAWED_ESC_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms <= ESC_TIMEOUT_MAX_MS => {
                    config.escape_timeout = Duration::from_millis(ms);
                }
                _ => config.warn("RAWED_ESC_TIMEOUT_MS", &raw, "milliseconds up to 2000"),
            }
        }

        config.log_file = get("RAWED_LOG").map(PathBuf::from);
        config
    }

    /// What the Tab key inserts.
    #[must_use]
    pub fn tab_text(&self) -> String {
        " ".repeat(self.tab_width)
    }

    fn warn(&mut self, key: &str, value: &str, expected: &str) {
        self.warnings
            .push(format!("ignoring {key}={value:?}: expected {expected}"));
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
