//! Console rendering of per-file cache status

use super::context::UiContext;
use crate::fingerprint::CacheKey;
use crate::pipeline::{CacheObserver, CacheStatus};
use console::style;

/// Prefix of every status line
const PREFIX: &str = "asset-cache:";

/// Prints `asset-cache: ✔ <key> (cached)` style lines to stderr
pub struct ConsoleReporter {
    ctx: UiContext,
}

impl ConsoleReporter {
    /// Create a reporter for the given UI context
    pub fn new(ctx: UiContext) -> Self {
        Self { ctx }
    }

    /// Render a status line without printing it
    pub fn format_line(&self, status: CacheStatus, key: &CacheKey) -> String {
        if self.ctx.use_fancy_output() {
            let symbol = match status {
                CacheStatus::Cached => style("✔").green(),
                CacheStatus::Uncached => style("✖").red(),
            };
            format!(
                "{} {} {} {}",
                PREFIX,
                symbol,
                key,
                style(format!("({})", status)).dim()
            )
        } else {
            let tag = match status {
                CacheStatus::Cached => "[CACHED]",
                CacheStatus::Uncached => "[UNCACHED]",
            };
            format!("{} {} {}", PREFIX, tag, key)
        }
    }
}

impl CacheObserver for ConsoleReporter {
    fn on_status(&self, status: CacheStatus, key: &CacheKey) {
        if self.ctx.is_quiet() {
            return;
        }
        eprintln!("{}", self.format_line(status, key));
    }
}
