use crate::round::RoundId;
use crate::runtime::TICK_RATE_MS;

/// Notifications produced by a running countdown, tagged with the round that started it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { round: RoundId, remaining: u32 },
    Expired { round: RoundId },
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    round: RoundId,
    remaining: u32,
    ticks: u32,
}

/// One-second countdown driven by runtime ticks.
///
/// Seconds are counted in whole multiples of the runtime tick, so any delay in
/// delivering ticks accumulates as drift. Only one countdown is active at a time.
#[derive(Debug, Clone)]
pub struct RoundTimer {
    ticks_per_second: u32,
    active: Option<Countdown>,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self::with_ticks_per_second((1000 / TICK_RATE_MS) as u32)
    }

    pub fn with_ticks_per_second(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second: ticks_per_second.max(1),
            active: None,
        }
    }

    /// Begin a countdown, replacing any running one.
    /// The initial value is reported straight away; a zero-second countdown expires immediately.
    pub fn start(&mut self, seconds: u32, round: RoundId) -> Vec<TimerEvent> {
        self.cancel();

        let mut events = vec![TimerEvent::Tick {
            round,
            remaining: seconds,
        }];

        if seconds == 0 {
            events.push(TimerEvent::Expired { round });
        } else {
            self.active = Some(Countdown {
                round,
                remaining: seconds,
                ticks: 0,
            });
        }

        events
    }

    /// Advance by one runtime tick
    pub fn on_tick(&mut self) -> Vec<TimerEvent> {
        let Some(countdown) = self.active.as_mut() else {
            return vec![];
        };

        countdown.ticks += 1;
        if countdown.ticks < self.ticks_per_second {
            return vec![];
        }

        countdown.ticks = 0;
        countdown.remaining = countdown.remaining.saturating_sub(1);

        let round = countdown.round;
        let remaining = countdown.remaining;
        let mut events = vec![TimerEvent::Tick { round, remaining }];

        if remaining == 0 {
            events.push(TimerEvent::Expired { round });
            self.active = None;
        }

        events
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn remaining(&self) -> Option<u32> {
        self.active.map(|c| c.remaining)
    }
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(timer: &mut RoundTimer, ticks: usize) -> Vec<TimerEvent> {
        (0..ticks).flat_map(|_| timer.on_tick()).collect()
    }

    #[test]
    fn test_five_second_countdown_ticks_six_times_then_expires() {
        let round = RoundId::default().next();
        let mut timer = RoundTimer::with_ticks_per_second(1);

        let mut events = timer.start(5, round);
        events.extend(drain(&mut timer, 10));

        let remaining: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Tick { remaining, .. } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(events.last(), Some(&TimerEvent::Expired { round }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, TimerEvent::Expired { .. }))
                .count(),
            1
        );
        assert!(!timer.is_running());
    }

    #[test]
    fn test_ticks_accumulate_to_whole_seconds() {
        let round = RoundId::default().next();
        let mut timer = RoundTimer::with_ticks_per_second(10);
        timer.start(2, round);

        assert!(drain(&mut timer, 9).is_empty());
        assert_eq!(
            timer.on_tick(),
            vec![TimerEvent::Tick {
                round,
                remaining: 1
            }]
        );
        assert_eq!(timer.remaining(), Some(1));
    }

    #[test]
    fn test_zero_seconds_expires_immediately() {
        let round = RoundId::default().next();
        let mut timer = RoundTimer::with_ticks_per_second(1);
        let events = timer.start(0, round);

        assert_eq!(
            events,
            vec![
                TimerEvent::Tick {
                    round,
                    remaining: 0
                },
                TimerEvent::Expired { round }
            ]
        );
        assert!(!timer.is_running());
    }

    #[test]
    fn test_cancel_is_idempotent_and_silences_timer() {
        let mut timer = RoundTimer::with_ticks_per_second(1);
        timer.start(3, RoundId::default().next());
        timer.cancel();
        timer.cancel();

        assert!(drain(&mut timer, 5).is_empty());
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn test_restart_replaces_previous_countdown() {
        let first = RoundId::default().next();
        let second = first.next();
        let mut timer = RoundTimer::with_ticks_per_second(1);

        timer.start(2, first);
        timer.on_tick();
        timer.start(3, second);

        let events = drain(&mut timer, 5);
        assert!(events.iter().all(|e| match e {
            TimerEvent::Tick { round, .. } | TimerEvent::Expired { round } => *round == second,
        }));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_default_follows_runtime_tick_rate() {
        let mut timer = RoundTimer::new();
        timer.start(1, RoundId::default().next());
        let events = drain(&mut timer, (1000 / TICK_RATE_MS) as usize);
        assert!(events.contains(&TimerEvent::Expired {
            round: RoundId::default().next()
        }));
    }
}
