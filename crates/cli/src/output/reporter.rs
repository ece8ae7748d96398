//! Terminal rendering of sync progress events

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bs_core::{Phase, SyncEvents};

use super::{Formatter, OutputConfig, ProgressBar};

/// Title of the group wrapping both listing phases, which run concurrently
const LISTING_GROUP: &str = "List files";

#[derive(Debug, Default)]
struct State {
    open_listings: usize,
    bars: Vec<(Phase, ProgressBar)>,
}

/// Renders engine events as log groups and progress bars
#[derive(Debug)]
pub struct Reporter {
    config: OutputConfig,
    formatter: Formatter,
    state: Mutex<State>,
    skipped: AtomicUsize,
}

impl Reporter {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            formatter: Formatter::new(config.clone()),
            config,
            state: Mutex::new(State::default()),
            skipped: AtomicUsize::new(0),
        }
    }

    /// Number of local files rejected by the filter
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Clear remaining bars and close open groups after a failed run
    pub fn abort(&self) {
        let mut state = self.lock();
        for (_, bar) in state.bars.drain(..) {
            bar.finish_and_clear();
        }
        if state.open_listings > 0 {
            state.open_listings = 0;
            self.formatter.group_end();
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self, phase: Phase) {
        let state = self.lock();
        if let Some((_, bar)) = state.bars.iter().find(|(p, _)| *p == phase) {
            bar.inc(1);
        }
    }
}

fn is_listing(phase: Phase) -> bool {
    matches!(phase, Phase::ListLocal | Phase::ListRemote)
}

impl SyncEvents for Reporter {
    fn phase_started(&self, phase: Phase, total: Option<usize>) {
        let mut state = self.lock();

        if is_listing(phase) {
            if state.open_listings == 0 {
                self.formatter.group_start(LISTING_GROUP);
            }
            state.open_listings += 1;
        } else {
            self.formatter.group_start(phase.title());
        }

        let bar = match total {
            Some(total) => ProgressBar::new(&self.config, total as u64, phase.title()),
            None => ProgressBar::spinner(&self.config, phase.title()),
        };
        state.bars.push((phase, bar));
    }

    fn phase_finished(&self, phase: Phase) {
        let mut state = self.lock();

        if let Some(index) = state.bars.iter().position(|(p, _)| *p == phase) {
            let (_, bar) = state.bars.remove(index);
            bar.finish_and_clear();
        }

        if is_listing(phase) {
            state.open_listings = state.open_listings.saturating_sub(1);
            if state.open_listings == 0 {
                self.formatter.group_end();
            }
        } else {
            self.formatter.group_end();
        }
    }

    fn file_skipped(&self, _key: &str) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn file_uploaded(&self, _key: &str, _bytes: u64) {
        self.tick(Phase::Upload);
    }

    fn file_deleted(&self, _key: &str) {
        self.tick(Phase::Delete);
    }
}
