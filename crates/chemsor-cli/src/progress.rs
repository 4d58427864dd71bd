//! Terminal progress for the enrichment passes.

use std::io::{self, IsTerminal};

use chemsor_enrich::EnrichProgress;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{msg:>18} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Progress bar drawn on stderr; hidden when stderr is not a terminal.
pub struct EnrichBar {
    bar: ProgressBar,
}

impl EnrichBar {
    pub fn for_stderr() -> Self {
        let bar = if io::stderr().is_terminal() {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl EnrichProgress for EnrichBar {
    fn start_pass(&self, pass: &'static str, total: usize) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(pass);
    }

    fn advance(&self) {
        self.bar.inc(1);
    }
}
