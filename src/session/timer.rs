use std::time::Duration;

use crate::session::controller::Effect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Gap between speech output ending and the microphone opening.
    Settle,
    /// Silence reminder while waiting for the learner.
    Watchdog,
    /// Pause after a pass before the next partner line.
    AdvancePause,
}

/// Handle for one arming of a timer. A firing only counts if its token is
/// still the armed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timer {
    pub kind: TimerKind,
    pub token: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub settle: Duration,
    pub watchdog: Duration,
    pub advance_pause: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(200),
            watchdog: Duration::from_secs(8),
            advance_pause: Duration::from_millis(700),
        }
    }
}

impl Timing {
    pub fn duration(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Settle => self.settle,
            TimerKind::Watchdog => self.watchdog,
            TimerKind::AdvancePause => self.advance_pause,
        }
    }
}

/// At most one armed timer per kind.
#[derive(Debug, Default)]
pub struct Timers {
    next_token: u64,
    settle: Option<Timer>,
    watchdog: Option<Timer>,
    advance: Option<Timer>,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<Timer> {
        match kind {
            TimerKind::Settle => &mut self.settle,
            TimerKind::Watchdog => &mut self.watchdog,
            TimerKind::AdvancePause => &mut self.advance,
        }
    }

    /// Arm `kind`, replacing (and cancelling) any earlier arming of it.
    pub fn arm(&mut self, kind: TimerKind, after: Duration, effects: &mut Vec<Effect>) -> Timer {
        self.cancel(kind, effects);
        self.next_token += 1;
        let timer = Timer {
            kind,
            token: self.next_token,
        };
        *self.slot(kind) = Some(timer);
        effects.push(Effect::ArmTimer { timer, after });
        timer
    }

    pub fn cancel(&mut self, kind: TimerKind, effects: &mut Vec<Effect>) {
        if let Some(timer) = self.slot(kind).take() {
            effects.push(Effect::CancelTimer(timer));
        }
    }

    pub fn cancel_all(&mut self, effects: &mut Vec<Effect>) {
        for kind in [TimerKind::Settle, TimerKind::Watchdog, TimerKind::AdvancePause] {
            self.cancel(kind, effects);
        }
    }

    /// Consume a firing. Returns false for stale or cancelled timers.
    pub fn fire(&mut self, timer: Timer) -> bool {
        let slot = self.slot(timer.kind);
        if *slot == Some(timer) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Settle => self.settle.is_some(),
            TimerKind::Watchdog => self.watchdog.is_some(),
            TimerKind::AdvancePause => self.advance.is_some(),
        }
    }
}
