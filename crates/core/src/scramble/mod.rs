use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::timeline::{Animation, AnimationState, Scheduler, Tick, Ticker, Timed};

/// Symbols drawn for unresolved positions.
pub const SCRAMBLE_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    '!', '@', '#', '$', '%', '&', '*', '<', '>', '[', ']', '{', '}',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrambleOptions {
    pub tick_interval_ms: u64,
    pub max_iterations: u32,
    pub reveal_divisor: u32,
    pub start_delay_ms: u64,
    /// Show an empty string until the first tick instead of the source.
    pub blank_while_pending: bool,
    /// Fixed RNG seed; `None` draws one per session.
    pub seed: Option<u64>,
}

impl Default for ScrambleOptions {
    fn default() -> Self {
        Self {
            tick_interval_ms: 40,
            max_iterations: 20,
            reveal_divisor: 2,
            start_delay_ms: 0,
            blank_while_pending: false,
            seed: None,
        }
    }
}

impl ScrambleOptions {
    /// Card text fields: staggered by `delay_ms`, blank until they start.
    pub fn card_field(delay_ms: u64) -> Self {
        Self {
            start_delay_ms: delay_ms,
            blank_while_pending: true,
            ..Self::default()
        }
    }

    pub fn back_button() -> Self {
        Self {
            max_iterations: 15,
            reveal_divisor: 3,
            ..Self::default()
        }
    }

    /// Navigation and call-to-action labels: 500 ms at 50 ms per tick.
    pub fn nav_label() -> Self {
        Self {
            tick_interval_ms: 50,
            max_iterations: 10,
            reveal_divisor: 3,
            ..Self::default()
        }
    }

    /// Header logo: one character every three 30 ms ticks.
    pub fn logo(char_count: usize) -> Self {
        Self {
            tick_interval_ms: 30,
            max_iterations: (char_count as u32).saturating_mul(3),
            reveal_divisor: 3,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.start_delay_ms = delay_ms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Tick interval as the ticker runs it; zero is treated as 1 ms.
    pub fn interval_ms(&self) -> u64 {
        self.tick_interval_ms.max(1)
    }

    fn divisor(&self) -> u32 {
        self.reveal_divisor.max(1)
    }
}

/// What a cancelled session leaves on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndPolicy {
    ResetToSource,
    FreezeAtLast,
}

/// Number of leading character positions resolved after `iteration`
/// completed iterations: index `k` is resolved once `k * reveal_divisor < iteration`.
pub fn revealed_prefix(iteration: u32, reveal_divisor: u32, len: usize) -> usize {
    let divisor = reveal_divisor.max(1);
    let revealed = iteration.div_ceil(divisor) as usize;
    revealed.min(len)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrambleFrame {
    pub iteration: u32,
    pub text: String,
    /// Leading positions shown as their source character.
    pub revealed: usize,
    pub is_final: bool,
}

/// One running scramble.
#[derive(Debug, Clone)]
pub struct ScrambleSession {
    source: Vec<char>,
    options: ScrambleOptions,
    ticker: Ticker,
    rng: StdRng,
    display: String,
}

impl ScrambleSession {
    pub fn start(text: &str, options: ScrambleOptions, now_ms: u64) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        let mut session = Self {
            source: text.chars().collect(),
            options,
            ticker: Ticker::new(options.interval_ms(), options.max_iterations),
            rng: StdRng::seed_from_u64(seed),
            display: String::new(),
        };
        session.restart(now_ms);
        session
    }

    /// Rewinds to iteration zero, keeping the RNG stream.
    pub fn restart(&mut self, now_ms: u64) {
        self.ticker.start(now_ms, self.options.start_delay_ms);
        self.display = if self.ticker.state() == AnimationState::Completed
            || !self.options.blank_while_pending
        {
            self.source_text()
        } else {
            String::new()
        };
        tracing::debug!(
            text = %self.source_text(),
            delay_ms = self.options.start_delay_ms,
            iterations = self.options.max_iterations,
            "scramble session started"
        );
    }

    pub fn source_text(&self) -> String {
        self.source.iter().collect()
    }

    pub fn options(&self) -> &ScrambleOptions {
        &self.options
    }

    /// Latest string to show.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn iterations_elapsed(&self) -> u32 {
        self.ticker.fired()
    }

    /// Stops the ticker and returns the string to leave on screen.
    pub fn finish(&mut self, policy: EndPolicy) -> String {
        if self.ticker.cancel() {
            tracing::debug!(text = %self.source_text(), ?policy, "scramble session cancelled");
        }
        if policy == EndPolicy::ResetToSource {
            self.display = self.source_text();
        }
        self.display.clone()
    }

    fn compose(&mut self, revealed: usize) -> String {
        let rng = &mut self.rng;
        self.source
            .iter()
            .enumerate()
            .map(|(index, &ch)| {
                if ch == ' ' || index < revealed {
                    ch
                } else {
                    SCRAMBLE_ALPHABET[rng.random_range(0..SCRAMBLE_ALPHABET.len())]
                }
            })
            .collect()
    }
}

impl Animation for ScrambleSession {
    type Frame = ScrambleFrame;

    fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }

    // Tick n composes with the n - 1 iterations completed before it.
    fn on_tick(&mut self, tick: Tick) -> ScrambleFrame {
        let revealed = if tick.is_last {
            tracing::debug!(text = %self.source_text(), "scramble session completed");
            self.source.len()
        } else {
            let completed = tick.index.saturating_sub(1);
            revealed_prefix(completed, self.options.divisor(), self.source.len())
        };
        self.display = if tick.is_last {
            self.source_text()
        } else {
            self.compose(revealed)
        };
        ScrambleFrame {
            iteration: tick.index,
            text: self.display.clone(),
            revealed,
            is_final: tick.is_last,
        }
    }
}

/// Lazy, clock-free iterator over every string a session would emit.
#[derive(Debug, Clone)]
pub struct ScrambleSequence {
    session: ScrambleSession,
    now_ms: u64,
}

impl ScrambleSequence {
    pub fn new(text: &str, options: ScrambleOptions) -> Self {
        Self {
            session: ScrambleSession::start(text, options, 0),
            now_ms: 0,
        }
    }
}

impl Iterator for ScrambleSequence {
    type Item = ScrambleFrame;

    fn next(&mut self) -> Option<ScrambleFrame> {
        self.now_ms = self.session.ticker().next_due()?;
        let tick = self.session.ticker_mut().take_due(self.now_ms)?;
        Some(self.session.on_tick(tick))
    }
}

/// Keyed scramble sessions; one live session per identity.
#[derive(Debug)]
pub struct ScrambleAnimator<K> {
    sessions: Scheduler<K, ScrambleSession>,
}

impl<K: Ord + Clone + std::fmt::Debug> Default for ScrambleAnimator<K> {
    fn default() -> Self {
        Self {
            sessions: Scheduler::new(),
        }
    }
}

impl<K: Ord + Clone + std::fmt::Debug> ScrambleAnimator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the session for `key` and returns its initial
    /// display string.
    pub fn start(&mut self, key: K, text: &str, options: ScrambleOptions, now_ms: u64) -> String {
        let session = ScrambleSession::start(text, options, now_ms);
        let initial = session.display().to_string();
        self.sessions.start(key, session);
        initial
    }

    /// Cancels the session for `key`; `None` if nothing was running.
    pub fn cancel(&mut self, key: &K, policy: EndPolicy) -> Option<String> {
        self.sessions
            .cancel(key)
            .map(|mut session| session.finish(policy))
    }

    pub fn cancel_all(&mut self, policy: EndPolicy) -> Vec<(K, String)> {
        self.sessions
            .cancel_all()
            .into_iter()
            .map(|(key, mut session)| {
                let text = session.finish(policy);
                (key, text)
            })
            .collect()
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.sessions.is_active(key)
    }

    pub fn display(&self, key: &K) -> Option<&str> {
        self.sessions.get(key).map(ScrambleSession::display)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn advance(&mut self, now_ms: u64) -> Vec<(K, Timed<ScrambleFrame>)> {
        self.sessions.advance(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{SimulatedClock, TickSource};

    fn options(max_iterations: u32, reveal_divisor: u32) -> ScrambleOptions {
        ScrambleOptions {
            max_iterations,
            reveal_divisor,
            seed: Some(7),
            ..ScrambleOptions::default()
        }
    }

    #[test]
    fn back_label_resolves_progressively() {
        let mut session = ScrambleSession::start("BACK", options(15, 3), 0);
        let frames = session.advance(5 * 40);
        assert_eq!(frames.len(), 5);

        let revealed: Vec<usize> = frames.iter().map(|timed| timed.frame.revealed).collect();
        assert_eq!(revealed, vec![0, 1, 1, 1, 2]);
        for timed in &frames[1..4] {
            assert!(timed.frame.text.starts_with('B'));
        }

        let fifth = &frames[4].frame;
        assert_eq!(fifth.iteration, 5);
        assert!(fifth.text.starts_with("BA"));
        assert!(fifth
            .text
            .chars()
            .skip(2)
            .all(|ch| SCRAMBLE_ALPHABET.contains(&ch)));

        let rest = session.advance(15 * 40);
        assert_eq!(rest.len(), 10);
        let last = rest.last().unwrap();
        assert!(last.frame.is_final);
        assert_eq!(last.frame.revealed, 4);
        assert_eq!(last.frame.text, "BACK");
        assert_eq!(session.state(), AnimationState::Completed);
    }

    #[test]
    fn first_frame_reveals_nothing() {
        let mut first_letters = Vec::new();
        for seed in 0..64 {
            let options = ScrambleOptions::back_button().with_seed(seed);
            let first = ScrambleSequence::new("BACK", options).next().unwrap();
            assert_eq!(first.iteration, 1);
            assert_eq!(first.revealed, 0);
            assert!(first.text.chars().all(|ch| SCRAMBLE_ALPHABET.contains(&ch)));
            first_letters.push(first.text.chars().next().unwrap());
        }
        assert!(first_letters.iter().any(|&ch| ch != 'B'));
    }

    #[test]
    fn presets_reveal_from_the_completed_iteration_count() {
        let text = "CONNECT TOKEN";
        let len = text.chars().count();
        for (name, preset, last_pending) in [
            ("default", ScrambleOptions::default(), 9),
            ("back", ScrambleOptions::back_button(), 5),
            ("nav", ScrambleOptions::nav_label(), 3),
            ("logo", ScrambleOptions::logo(len), 13),
            ("card", ScrambleOptions::card_field(120), 9),
        ] {
            let frames: Vec<_> = ScrambleSequence::new(text, preset.with_seed(3)).collect();
            let max = preset.max_iterations as usize;
            assert_eq!(frames.len(), max, "{name}");
            assert_eq!(frames[0].revealed, 0, "{name}");

            let pending = &frames[max - 2];
            assert!(!pending.is_final, "{name}");
            assert_eq!(pending.revealed, last_pending, "{name}");
            assert_eq!(
                pending.revealed,
                revealed_prefix(preset.max_iterations - 2, preset.reveal_divisor, len),
                "{name}"
            );
            assert!(text.starts_with(&pending.text[..pending.revealed]), "{name}");
        }
    }

    #[test]
    fn terminates_after_exact_budget_with_spaces_preserved() {
        for (text, iterations, divisor) in [
            ("HOW IT WORKS", 10, 3),
            ("  A B  ", 20, 2),
            ("", 15, 3),
            ("CONNECT TOKEN", 17, 2),
        ] {
            let frames: Vec<_> = ScrambleSequence::new(text, options(iterations, divisor)).collect();
            assert_eq!(frames.len(), iterations as usize, "{text:?}");
            for frame in &frames {
                assert_eq!(frame.text.chars().count(), text.chars().count());
                for (shown, source) in frame.text.chars().zip(text.chars()) {
                    if source == ' ' {
                        assert_eq!(shown, ' ');
                    }
                }
            }
            assert_eq!(frames.last().unwrap().text, text);
        }
    }

    #[test]
    fn reveal_is_monotonic() {
        let text = "GLITCH TERMINAL 2026";
        let frames: Vec<_> = ScrambleSequence::new(text, options(20, 2)).collect();
        let source: Vec<char> = text.chars().collect();

        for frame in &frames {
            let shown: Vec<char> = frame.text.chars().collect();
            assert_eq!(&shown[..frame.revealed], &source[..frame.revealed]);
        }
        for pair in frames.windows(2) {
            assert!(pair[1].revealed >= pair[0].revealed);
        }
    }

    #[test]
    fn zero_interval_runs_at_one_millisecond() {
        let zero = ScrambleOptions {
            tick_interval_ms: 0,
            ..options(10, 3)
        };
        assert_eq!(zero.interval_ms(), 1);

        let mut clock = SimulatedClock::new();
        let mut animator = ScrambleAnimator::new();
        animator.start("label", "NAV", zero, clock.now_ms());
        let mut frames = 0;
        while animator.is_running(&"label") {
            frames += animator.advance(clock.advance(zero.interval_ms())).len();
            assert!(clock.time_ms <= 10, "scramble never finished");
        }
        assert_eq!(frames, 10);
    }

    #[test]
    fn cancel_policies_choose_the_end_state() {
        let mut session = ScrambleSession::start("TOKENS", options(20, 2), 0);
        let frames = session.advance(80);
        let last = frames.last().unwrap().frame.text.clone();

        let mut frozen = session.clone();
        assert_eq!(frozen.finish(EndPolicy::FreezeAtLast), last);
        assert_eq!(session.finish(EndPolicy::ResetToSource), "TOKENS");
        assert!(session.advance(10_000).is_empty());
    }

    #[test]
    fn cancelled_session_emits_nothing_within_budget() {
        let mut clock = SimulatedClock::new();
        let mut animator = ScrambleAnimator::new();
        animator.start("title", "CONNECT", options(20, 2), clock.now_ms());

        clock.advance(120);
        assert_eq!(animator.advance(clock.now_ms()).len(), 3);
        assert_eq!(
            animator.cancel(&"title", EndPolicy::ResetToSource).as_deref(),
            Some("CONNECT")
        );

        for _ in 0..20 {
            clock.advance(40);
            assert!(animator.advance(clock.now_ms()).is_empty());
        }
        assert!(animator.cancel(&"title", EndPolicy::ResetToSource).is_none());
    }

    #[test]
    fn restart_under_same_key_keeps_a_single_ticker() {
        let mut animator = ScrambleAnimator::new();
        animator.start("nav", "TOKENS", ScrambleOptions::nav_label(), 0);
        animator.start("nav", "TOKENS", ScrambleOptions::nav_label(), 100);
        assert_eq!(animator.active_count(), 1);

        let frames = animator.advance(150);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1.frame.iteration, 1);
    }

    #[test]
    fn staggered_fields_start_blank_and_finish_independently() {
        let mut animator = ScrambleAnimator::new();
        let initial = animator.start("date", "2026-10-15", ScrambleOptions::card_field(200), 0);
        assert_eq!(initial, "");
        animator.start("id", "00000111", ScrambleOptions::card_field(0), 0);

        let frames = animator.advance(40);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, "id");
        assert_eq!(animator.display(&"date"), Some(""));

        let frames = animator.advance(200 + 20 * 40);
        let finals: Vec<_> = frames
            .iter()
            .filter(|(_, timed)| timed.frame.is_final)
            .map(|(key, timed)| (*key, timed.frame.text.clone()))
            .collect();
        assert_eq!(
            finals,
            vec![("id", "00000111".to_string()), ("date", "2026-10-15".to_string())]
        );
        assert_eq!(animator.active_count(), 0);
    }

    #[test]
    fn logo_preset_reveals_one_character_per_three_ticks() {
        let options = ScrambleOptions::logo(6);
        assert_eq!(options.max_iterations, 18);
        assert_eq!(revealed_prefix(3, options.reveal_divisor, 6), 1);
        assert_eq!(revealed_prefix(4, options.reveal_divisor, 6), 2);
    }
}
