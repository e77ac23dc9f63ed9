use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::timeline::{AnimationState, Ticker, Timed};

pub const LOADER_DURATION_MS: u64 = 3_000;
pub const PROGRESS_INTERVAL_MS: u64 = 50;
pub const NOISE_INTERVAL_MS: u64 = 100;
pub const NOISE_LEN: usize = 20;

const NOISE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `percent` as a zero-padded 7-bit binary string (`100` fits in 7 bits).
pub fn binary_progress(percent: u8) -> String {
    format!("{:07b}", percent.min(100))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    Progress { percent: u8, binary: String },
    Noise(String),
    Complete,
}

/// Snapshot of what the overlay shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderView {
    pub percent: u8,
    pub binary: String,
    pub noise: String,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct LoaderSequence {
    started_ms: u64,
    duration_ms: u64,
    progress: Ticker,
    noise: Ticker,
    rng: StdRng,
    view: LoaderView,
}

impl LoaderSequence {
    pub fn start(now_ms: u64) -> Self {
        Self::with_duration(now_ms, LOADER_DURATION_MS, None)
    }

    pub fn with_duration(now_ms: u64, duration_ms: u64, seed: Option<u64>) -> Self {
        let mut progress = Ticker::new(
            PROGRESS_INTERVAL_MS,
            duration_ms.div_ceil(PROGRESS_INTERVAL_MS) as u32,
        );
        progress.start(now_ms, 0);
        let mut noise = Ticker::new(NOISE_INTERVAL_MS, (duration_ms / NOISE_INTERVAL_MS) as u32);
        noise.start(now_ms, 0);

        let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
        let noise_line = random_line(&mut rng);
        Self {
            started_ms: now_ms,
            duration_ms,
            progress,
            noise,
            rng,
            view: LoaderView {
                percent: 0,
                binary: binary_progress(0),
                noise: noise_line,
                complete: duration_ms == 0,
            },
        }
    }

    pub fn view(&self) -> &LoaderView {
        &self.view
    }

    pub fn is_complete(&self) -> bool {
        self.view.complete
    }

    /// Stops both tickers without completing, as on unmount.
    pub fn cancel(&mut self) {
        self.progress.cancel();
        self.noise.cancel();
    }

    pub fn state(&self) -> AnimationState {
        if self.view.complete {
            AnimationState::Completed
        } else if self.progress.state() == AnimationState::Cancelled {
            AnimationState::Cancelled
        } else {
            AnimationState::Running
        }
    }

    /// Emits every event due up to `now_ms`, in time order.
    pub fn advance(&mut self, now_ms: u64) -> Vec<Timed<LoaderEvent>> {
        if self.state().is_finished() {
            return Vec::new();
        }

        let mut events = Vec::new();
        while let Some(tick) = self.progress.take_due(now_ms) {
            let elapsed = tick.at_ms - self.started_ms;
            let percent = (elapsed * 100 / self.duration_ms.max(1)).min(100) as u8;
            events.push(Timed {
                at_ms: tick.at_ms,
                frame: LoaderEvent::Progress {
                    percent,
                    binary: binary_progress(percent),
                },
            });
        }
        while let Some(tick) = self.noise.take_due(now_ms) {
            events.push(Timed {
                at_ms: tick.at_ms,
                frame: LoaderEvent::Noise(random_line(&mut self.rng)),
            });
        }

        let end_ms = self.started_ms + self.duration_ms;
        if now_ms >= end_ms {
            self.progress.cancel();
            self.noise.cancel();
            events.push(Timed {
                at_ms: end_ms,
                frame: LoaderEvent::Complete,
            });
        }
        events.sort_by_key(|event| event.at_ms);

        for event in &events {
            match &event.frame {
                LoaderEvent::Progress { percent, binary } => {
                    self.view.percent = *percent;
                    self.view.binary.clone_from(binary);
                }
                LoaderEvent::Noise(line) => self.view.noise.clone_from(line),
                LoaderEvent::Complete => {
                    tracing::debug!(at_ms = event.at_ms, "loader complete");
                    self.view.complete = true;
                }
            }
        }
        events
    }
}

fn random_line(rng: &mut StdRng) -> String {
    (0..NOISE_LEN)
        .map(|_| char::from(NOISE_ALPHABET[rng.random_range(0..NOISE_ALPHABET.len())]))
        .collect()
}
