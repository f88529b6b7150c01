//! Typing Indicator
//!
//! Shows that an answer is on its way. While typing, a ticker task advances an
//! ellipsis through `"" → "." → ".." → "..." → ""` on a fixed period; stopping
//! aborts the ticker and clears the dots at once.
//!
//! # Lifecycle
//!
//! ```text
//! start() ──► ticker task (interval, first tick one period later)
//!   │             │ advance dots while typing
//! stop()  ──► abort ticker, is_typing = false, dots = ""
//! ```
//!
//! Each `start` bumps a generation counter so a ticker that is racing with a
//! `stop` (or a quick restart) never touches the newer state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::MAX_TYPING_TICK;

/// Default ticker period
pub const DEFAULT_TYPING_TICK: Duration = Duration::from_millis(500);

/// Prefix of the surface label
pub const TYPING_LABEL: &str = "AI is typing";

/// Next ellipsis frame
#[must_use]
pub fn advance_ellipsis(dots: &str) -> &'static str {
    match dots.len() {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "",
    }
}

#[derive(Debug, Default)]
struct TypingState {
    is_typing: bool,
    dots: &'static str,
    generation: u64,
}

/// Typing flag plus animated ellipsis
#[derive(Debug)]
pub struct TypingIndicator {
    tick: Duration,
    state: Arc<RwLock<TypingState>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TICK)
    }
}

impl TypingIndicator {
    /// Create an idle indicator that ticks every `tick` while typing
    ///
    /// Periods above [`MAX_TYPING_TICK`] are clamped.
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: tick.min(MAX_TYPING_TICK),
            state: Arc::new(RwLock::new(TypingState::default())),
            ticker: Mutex::new(None),
        }
    }

    /// Enter the typing state and start the ticker
    ///
    /// Must be called from within a Tokio runtime. Calling while already
    /// typing does nothing.
    pub fn start(&self) {
        let generation = {
            let mut state = self.state.write();
            if state.is_typing {
                return;
            }
            state.is_typing = true;
            state.dots = "";
            state.generation += 1;
            state.generation
        };

        let state = Arc::clone(&self.state);
        let period = self.tick;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let mut state = state.write();
                if !state.is_typing || state.generation != generation {
                    break;
                }
                state.dots = advance_ellipsis(state.dots);
            }
        });

        if let Some(previous) = self.ticker.lock().replace(handle) {
            previous.abort();
        }
        tracing::trace!(generation, tick_ms = self.tick.as_millis(), "Typing started");
    }

    /// Leave the typing state, stop the ticker and clear the dots
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
        let mut state = self.state.write();
        if state.is_typing {
            tracing::trace!(generation = state.generation, "Typing stopped");
        }
        state.is_typing = false;
        state.dots = "";
    }

    /// Whether an answer is being awaited
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.state.read().is_typing
    }

    /// Current ellipsis frame
    #[must_use]
    pub fn dots(&self) -> &'static str {
        self.state.read().dots
    }

    /// Text a surface shows while typing (`None` when idle)
    #[must_use]
    pub fn label(&self) -> Option<String> {
        let state = self.state.read();
        state
            .is_typing
            .then(|| format!("{TYPING_LABEL}{}", state.dots))
    }

    /// Ticker period
    #[must_use]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Start typing and return a guard that stops it when dropped
    pub fn guard(&self) -> TypingGuard<'_> {
        self.start();
        TypingGuard { indicator: self }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

/// Stops typing when dropped, whichever path the caller leaves by
#[must_use = "typing stops as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TypingGuard<'a> {
    indicator: &'a TypingIndicator,
}

impl Drop for TypingGuard<'_> {
    fn drop(&mut self) {
        self.indicator.stop();
    }
}
