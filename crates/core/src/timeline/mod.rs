use std::{collections::BTreeMap, time::Instant};

/// Source of monotonic milliseconds.
pub trait TickSource {
    fn now_ms(&self) -> u64;
}

/// Manually advanced clock.
#[derive(Debug, Default, Clone)]
pub struct SimulatedClock {
    pub time_ms: u64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.time_ms = 0;
    }

    pub fn advance(&mut self, delta_ms: u64) -> u64 {
        self.time_ms += delta_ms;
        self.time_ms
    }
}

impl TickSource for SimulatedClock {
    fn now_ms(&self) -> u64 {
        self.time_ms
    }
}

/// Wall clock measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl TickSource for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running,
    Cancelled,
    Completed,
}

impl AnimationState {
    pub fn is_finished(self) -> bool {
        matches!(self, AnimationState::Cancelled | AnimationState::Completed)
    }
}

/// One tick that became due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based tick number within the session.
    pub index: u32,
    pub at_ms: u64,
    /// Whether this is the final tick of the budget.
    pub is_last: bool,
}

/// Fixed-interval ticker with a start delay and a tick budget.
///
/// Tick `n` is due at `started + delay + n * interval`.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval_ms: u64,
    max_ticks: u32,
    origin_ms: u64,
    fired: u32,
    state: AnimationState,
}

impl Ticker {
    pub fn new(interval_ms: u64, max_ticks: u32) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            max_ticks,
            origin_ms: 0,
            fired: 0,
            state: AnimationState::Idle,
        }
    }

    pub fn start(&mut self, now_ms: u64, delay_ms: u64) {
        self.origin_ms = now_ms + delay_ms;
        self.fired = 0;
        self.state = if self.max_ticks == 0 {
            AnimationState::Completed
        } else {
            AnimationState::Running
        };
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Whether the start delay has elapsed at `now_ms`.
    pub fn has_begun(&self, now_ms: u64) -> bool {
        self.state != AnimationState::Idle && now_ms >= self.origin_ms
    }

    pub fn next_due(&self) -> Option<u64> {
        (self.state == AnimationState::Running)
            .then(|| self.origin_ms + u64::from(self.fired + 1) * self.interval_ms)
    }

    /// Pops the next tick if it is due at `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Option<Tick> {
        let at_ms = self.next_due()?;
        if at_ms > now_ms {
            return None;
        }

        self.fired += 1;
        let is_last = self.fired >= self.max_ticks;
        if is_last {
            self.state = AnimationState::Completed;
        }
        Some(Tick {
            index: self.fired,
            at_ms,
            is_last,
        })
    }

    /// Clears every pending tick. Returns `false` when the ticker had already
    /// finished.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_finished() {
            return false;
        }
        self.state = AnimationState::Cancelled;
        true
    }
}

/// A frame stamped with the tick time that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<F> {
    pub at_ms: u64,
    pub frame: F,
}

/// A ticker-driven effect producing one frame per tick.
pub trait Animation {
    type Frame;

    fn ticker(&self) -> &Ticker;

    fn ticker_mut(&mut self) -> &mut Ticker;

    /// Produces the frame for `tick`. Called exactly once per tick, in order.
    fn on_tick(&mut self, tick: Tick) -> Self::Frame;

    fn state(&self) -> AnimationState {
        self.ticker().state()
    }

    /// Emits every frame due up to `now_ms`.
    fn advance(&mut self, now_ms: u64) -> Vec<Timed<Self::Frame>> {
        let mut frames = Vec::new();
        while let Some(tick) = self.ticker_mut().take_due(now_ms) {
            let frame = self.on_tick(tick);
            frames.push(Timed {
                at_ms: tick.at_ms,
                frame,
            });
        }
        frames
    }

    fn cancel(&mut self) -> bool {
        self.ticker_mut().cancel()
    }
}

/// Keyed set of concurrently running animations.
///
/// At most one animation exists per key: starting a key that is already
/// running cancels the old session first.
#[derive(Debug)]
pub struct Scheduler<K, A> {
    sessions: BTreeMap<K, A>,
}

impl<K, A> Default for Scheduler<K, A> {
    fn default() -> Self {
        Self {
            sessions: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone + std::fmt::Debug, A: Animation> Scheduler<K, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `animation` under `key`, returning the cancelled predecessor.
    pub fn start(&mut self, key: K, animation: A) -> Option<A> {
        let previous = self.sessions.insert(key.clone(), animation);
        previous.map(|mut old| {
            if old.cancel() {
                tracing::debug!(?key, "restart cancelled running session");
            }
            old
        })
    }

    /// Cancels and removes the session under `key`.
    pub fn cancel(&mut self, key: &K) -> Option<A> {
        let mut session = self.sessions.remove(key)?;
        session.cancel();
        Some(session)
    }

    pub fn cancel_all(&mut self) -> Vec<(K, A)> {
        std::mem::take(&mut self.sessions)
            .into_iter()
            .map(|(key, mut session)| {
                session.cancel();
                (key, session)
            })
            .collect()
    }

    pub fn get(&self, key: &K) -> Option<&A> {
        self.sessions.get(key)
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drives every session to `now_ms`. Frames are ordered by tick time;
    /// ties keep key order. Completed sessions are dropped.
    pub fn advance(&mut self, now_ms: u64) -> Vec<(K, Timed<A::Frame>)> {
        let mut frames = Vec::new();
        for (key, session) in self.sessions.iter_mut() {
            frames.extend(
                session
                    .advance(now_ms)
                    .into_iter()
                    .map(|frame| (key.clone(), frame)),
            );
        }
        frames.sort_by_key(|(_, frame)| frame.at_ms);
        self.sessions
            .retain(|_, session| !session.state().is_finished());
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        ticker: Ticker,
        seen: Vec<u32>,
    }

    impl Counter {
        fn started(now_ms: u64, delay_ms: u64, interval_ms: u64, ticks: u32) -> Self {
            let mut ticker = Ticker::new(interval_ms, ticks);
            ticker.start(now_ms, delay_ms);
            Self {
                ticker,
                seen: Vec::new(),
            }
        }
    }

    impl Animation for Counter {
        type Frame = u32;

        fn ticker(&self) -> &Ticker {
            &self.ticker
        }

        fn ticker_mut(&mut self) -> &mut Ticker {
            &mut self.ticker
        }

        fn on_tick(&mut self, tick: Tick) -> u32 {
            self.seen.push(tick.index);
            tick.index
        }
    }

    #[test]
    fn ticker_fires_on_schedule_and_completes() {
        let mut counter = Counter::started(0, 100, 40, 3);
        assert!(counter.advance(139).is_empty());

        let frames = counter.advance(140);
        assert_eq!(frames, vec![Timed { at_ms: 140, frame: 1 }]);

        let frames = counter.advance(1_000);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].at_ms, 220);
        assert_eq!(counter.state(), AnimationState::Completed);
        assert!(counter.advance(5_000).is_empty());
    }

    #[test]
    fn cancellation_stops_all_further_ticks() {
        let mut clock = SimulatedClock::new();
        let mut counter = Counter::started(clock.now_ms(), 0, 40, 20);

        clock.advance(120);
        assert_eq!(counter.advance(clock.now_ms()).len(), 3);
        assert!(counter.cancel());
        assert!(!counter.cancel());

        for _ in 0..50 {
            clock.advance(40);
            assert!(counter.advance(clock.now_ms()).is_empty());
        }
        assert_eq!(counter.seen, vec![1, 2, 3]);
        assert_eq!(counter.state(), AnimationState::Cancelled);
    }

    #[test]
    fn scheduler_restart_cancels_previous_session() {
        let mut scheduler = Scheduler::new();
        scheduler.start("label", Counter::started(0, 0, 40, 10));
        let old = scheduler
            .start("label", Counter::started(80, 0, 40, 10))
            .expect("previous session");
        assert_eq!(old.state(), AnimationState::Cancelled);
        assert_eq!(scheduler.len(), 1);

        let frames = scheduler.advance(120);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1.at_ms, 120);
    }

    #[test]
    fn scheduler_interleaves_sessions_by_time_and_drops_completed() {
        let mut scheduler = Scheduler::new();
        scheduler.start("a", Counter::started(0, 0, 40, 2));
        scheduler.start("b", Counter::started(0, 10, 40, 2));

        let frames = scheduler.advance(200);
        let order: Vec<(&str, u64)> = frames.iter().map(|(k, f)| (*k, f.at_ms)).collect();
        assert_eq!(order, vec![("a", 40), ("b", 50), ("a", 80), ("b", 90)]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::start();
        let first = clock.now_ms();
        assert!(clock.now_ms() >= first);
    }

    #[test]
    fn zero_budget_completes_immediately() {
        let mut ticker = Ticker::new(40, 0);
        ticker.start(0, 0);
        assert_eq!(ticker.state(), AnimationState::Completed);
        assert!(ticker.take_due(1_000).is_none());
    }
}
