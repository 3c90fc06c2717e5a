//! Turn-by-turn practice state machine.
//!
//! The controller never talks to audio hardware or clocks itself. Each input
//! (learner action, capability event, timer firing) returns the [`Effect`]s the
//! host must carry out, in order. Holding at most one speak request and one
//! recognition session at a time is enforced here: a new speak is always
//! preceded by [`Effect::StopSpeech`] when one is still outstanding, and
//! recognition is stopped before any state that must not listen.

use std::time::Duration;

use chrono::Utc;
use rust_i18n::t;

use crate::content::schema::Dialog;
use crate::engine::feedback::{Feedback, build_feedback};
use crate::engine::scoring::{Mode, ScoreResult, score};
use crate::session::navigator::next_partner_after;
use crate::session::result::{AttemptRecord, SessionSummary};
use crate::session::state::{Phase, SessionState};
use crate::session::timer::{Timer, TimerKind, Timers, Timing};
use crate::voice::{PracticeError, SpeechId, SpeechOutcome, SpeechRequest, VoiceEvent};

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Speak(SpeechRequest),
    StopSpeech,
    StartListening,
    StopListening,
    ArmTimer { timer: Timer, after: Duration },
    CancelTimer(Timer),
    Notify(Notice),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    Error(PracticeError),
    Scored {
        result: ScoreResult,
        feedback: Feedback,
    },
    Completed(SessionSummary),
}

#[derive(Debug, PartialEq)]
pub enum ExitOutcome {
    /// The session was started; ask the learner and call again with `confirmed`.
    NeedsConfirmation,
    Exited(Vec<Effect>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpeechPurpose {
    Intro,
    PartnerLine,
    Reminder,
    Correction,
    Playback,
}

#[derive(Clone, Copy, Debug)]
struct PendingSpeech {
    id: SpeechId,
    purpose: SpeechPurpose,
}

pub struct SessionController {
    timing: Timing,
    recognition_supported: bool,
    /// Survives dialog changes; only a new controller starts without it.
    intro_played: bool,
    preferred_mode: Mode,
    session: Option<SessionState>,
    next_speech: u64,
    speaking: Option<PendingSpeech>,
    listening: bool,
    timers: Timers,
}

impl SessionController {
    pub fn new(timing: Timing, recognition_supported: bool, mode: Mode) -> Self {
        Self {
            timing,
            recognition_supported,
            intro_played: false,
            preferred_mode: mode,
            session: None,
            next_speech: 0,
            speaking: None,
            listening: false,
            timers: Timers::default(),
        }
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.session.as_ref().map(|s| s.phase)
    }

    pub fn intro_played(&self) -> bool {
        self.intro_played
    }

    pub fn mode(&self) -> Mode {
        self.preferred_mode
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.is_some()
    }

    /// Replace the current session (if any) with a fresh one for `dialog`.
    pub fn select_dialog(&mut self, dialog: Dialog) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.teardown(&mut effects);
        tracing::info!(target: "session", "selected dialog {} ({} turns)", dialog.id, dialog.turns.len());
        self.session = Some(SessionState::new(dialog, self.preferred_mode));
        effects
    }

    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase() != Some(Phase::Idle) {
            tracing::debug!(target: "session", "start ignored in phase {}", self.phase().map_or("none", Phase::as_str));
            return effects;
        }
        if let Some(state) = self.session.as_mut() {
            state.started = true;
            state.started_at = Some(Utc::now());
            state.phase = Phase::Starting;
        }

        if !self.recognition_supported {
            effects.push(Effect::Notify(Notice::Error(PracticeError::RecognitionUnsupported)));
        }

        if self.intro_played {
            self.prompt(&mut effects);
        } else {
            self.intro_played = true;
            self.speak(t!("session.intro").into_owned(), SpeechPurpose::Intro, &mut effects);
        }
        effects
    }

    /// Jump to the next partner line without scoring the current pair.
    pub fn skip(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(state) = self.session.as_mut() else {
            return effects;
        };
        if !matches!(state.phase, Phase::Prompting | Phase::AwaitingLearner) {
            tracing::debug!(target: "session", "skip ignored in phase {}", state.phase);
            return effects;
        }

        let from = state.pair.learner.unwrap_or(state.position);
        let next = next_partner_after(state.turns(), from);
        if next >= state.turns().len() {
            tracing::debug!(target: "session", "skip: no partner line after {from}");
            return effects;
        }

        tracing::info!(target: "session", "skipping from turn {from} to {next}");
        state.move_to(next);
        self.prompt(&mut effects);
        effects
    }

    /// Leave the session. A started session needs `confirmed`.
    pub fn request_exit(&mut self, confirmed: bool) -> ExitOutcome {
        match &self.session {
            None => return ExitOutcome::Exited(Vec::new()),
            Some(state) if state.started && !confirmed => return ExitOutcome::NeedsConfirmation,
            Some(_) => {}
        }
        let mut effects = Vec::new();
        self.teardown(&mut effects);
        ExitOutcome::Exited(effects)
    }

    /// Takes effect from the next scored attempt.
    pub fn set_mode(&mut self, mode: Mode) {
        self.preferred_mode = mode;
        if let Some(state) = self.session.as_mut() {
            state.mode = mode;
        }
        tracing::info!(target: "session", "mode set to {mode}");
    }

    pub fn replay_partner(&mut self) -> Vec<Effect> {
        let line = self
            .playback_state()
            .and_then(|s| s.partner_line())
            .map(str::to_string);
        self.playback(line)
    }

    pub fn play_expected(&mut self) -> Vec<Effect> {
        let line = self
            .playback_state()
            .and_then(|s| s.expected_line())
            .map(str::to_string);
        self.playback(line)
    }

    /// Open the microphone again, e.g. after a recognition error.
    pub fn listen(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(state) = self.session.as_mut() else {
            return effects;
        };
        if state.phase != Phase::AwaitingLearner {
            return effects;
        }
        state.recognition_error = None;
        self.timers.cancel(TimerKind::Settle, &mut effects);
        self.start_listening(&mut effects);
        effects
    }

    pub fn handle_voice(&mut self, event: VoiceEvent) -> Vec<Effect> {
        match event {
            VoiceEvent::SpeechFinished { id, outcome } => self.on_speech_finished(id, outcome),
            VoiceEvent::Transcript(text) => self.on_transcript(&text),
            VoiceEvent::RecognitionError(reason) => self.on_recognition_error(reason),
            VoiceEvent::ListeningChanged(listening) => self.on_listening_changed(listening),
        }
    }

    pub fn on_speech_finished(&mut self, id: SpeechId, outcome: SpeechOutcome) -> Vec<Effect> {
        let mut effects = Vec::new();
        let purpose = match self.speaking {
            Some(pending) if pending.id == id => pending.purpose,
            _ => {
                tracing::debug!(target: "session", "ignoring completion of stale speech {id}");
                return effects;
            }
        };
        self.speaking = None;

        if let SpeechOutcome::Failed(reason) = outcome {
            tracing::warn!(target: "voice", "{}; continuing as if played", PracticeError::Speech(reason));
        }

        match (purpose, self.phase()) {
            (SpeechPurpose::Intro, Some(Phase::Starting)) => self.prompt(&mut effects),
            (SpeechPurpose::PartnerLine, Some(Phase::Prompting)) => {
                self.await_learner(true, &mut effects)
            }
            (SpeechPurpose::Correction, Some(Phase::Retrying)) => {
                self.await_learner(false, &mut effects)
            }
            _ => {}
        }
        effects
    }

    pub fn on_transcript(&mut self, text: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(state) = self.session.as_mut() else {
            return effects;
        };
        if state.phase != Phase::AwaitingLearner {
            tracing::debug!(target: "session", "transcript ignored in phase {}", state.phase);
            return effects;
        }
        let text = text.trim();
        if text.is_empty() {
            return effects;
        }
        let (Some(learner_idx), Some(expected)) = (state.pair.learner, state.learner_turn().cloned())
        else {
            return effects;
        };
        if expected.text.trim().is_empty() {
            return effects;
        }

        state.phase = Phase::Scoring;
        let result = score(text, &expected.text, &expected.keywords, state.mode);
        let feedback = build_feedback(text, &expected.text, &expected.keywords, &result);
        tracing::info!(
            target: "session",
            "turn {learner_idx}: score {} ({}) in {} mode",
            result.score,
            if result.pass { "pass" } else { "fail" },
            state.mode
        );

        state.transcript = Some(text.to_string());
        state.last_score = Some(result.clone());
        state.feedback = Some(feedback.clone());
        state.recognition_error = None;
        state.attempts.push(AttemptRecord {
            turn_index: learner_idx,
            transcript: text.to_string(),
            expected: expected.text.clone(),
            result: result.clone(),
            mode: state.mode,
            timestamp: Utc::now(),
        });
        let next = next_partner_after(state.turns(), learner_idx);
        let end = state.turns().len();

        effects.push(Effect::Notify(Notice::Scored {
            result: result.clone(),
            feedback,
        }));
        self.timers.cancel(TimerKind::Watchdog, &mut effects);
        self.timers.cancel(TimerKind::Settle, &mut effects);
        self.stop_listening(&mut effects);

        if !result.pass {
            self.set_phase(Phase::Retrying);
            let line = t!("session.correction", expected = expected.text).into_owned();
            self.speak(line, SpeechPurpose::Correction, &mut effects);
        } else if next >= end {
            self.complete(&mut effects);
        } else {
            if let Some(state) = self.session.as_mut() {
                state.phase = Phase::Advancing;
                state.pending_position = Some(next);
            }
            self.timers
                .arm(TimerKind::AdvancePause, self.timing.advance_pause, &mut effects);
        }
        effects
    }

    pub fn on_recognition_error(&mut self, reason: String) -> Vec<Effect> {
        tracing::warn!(target: "voice", "recognition error: {reason}");
        if let Some(state) = self.session.as_mut() {
            state.recognition_error = Some(reason.clone());
        }
        vec![Effect::Notify(Notice::Error(PracticeError::Recognition(reason)))]
    }

    pub fn on_listening_changed(&mut self, listening: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.listening = listening;
        if listening {
            return effects;
        }

        // Recognition ended on its own with nothing heard: reopen after the
        // settle delay. After an error the learner restarts it explicitly.
        let restart = self.session.as_ref().is_some_and(|s| {
            s.phase == Phase::AwaitingLearner
                && s.transcript.is_none()
                && s.recognition_error.is_none()
        });
        if restart && !self.timers.is_armed(TimerKind::Settle) {
            self.timers
                .arm(TimerKind::Settle, self.timing.settle, &mut effects);
        }
        effects
    }

    pub fn on_timer(&mut self, timer: Timer) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.timers.fire(timer) {
            tracing::debug!(target: "session", "ignoring stale {:?} timer", timer.kind);
            return effects;
        }
        let Some(state) = self.session.as_mut() else {
            return effects;
        };

        match timer.kind {
            TimerKind::Settle => {
                if state.phase == Phase::AwaitingLearner {
                    self.start_listening(&mut effects);
                }
            }
            TimerKind::Watchdog => {
                if state.phase == Phase::AwaitingLearner && state.transcript.is_none() {
                    tracing::info!(target: "session", "no answer heard, reminding learner");
                    self.speak(t!("session.reminder").into_owned(), SpeechPurpose::Reminder, &mut effects);
                }
            }
            TimerKind::AdvancePause => {
                if state.phase == Phase::Advancing {
                    if let Some(next) = state.pending_position.take() {
                        state.move_to(next);
                        self.prompt(&mut effects);
                    }
                }
            }
        }
        effects
    }

    /// Enter `Prompting` at the current position and speak the partner line.
    fn prompt(&mut self, effects: &mut Vec<Effect>) {
        self.timers.cancel_all(effects);
        self.stop_listening(effects);
        let Some(state) = self.session.as_mut() else {
            return;
        };
        state.phase = Phase::Prompting;
        state.is_learner_turn = false;
        state.pending_position = None;
        state.clear_attempt(true);
        tracing::debug!(target: "session", "prompting at turn {} ({:?})", state.position, state.pair);

        let line = state.partner_line().map(str::to_string);
        match line {
            Some(line) => self.speak(line, SpeechPurpose::PartnerLine, effects),
            None => self.await_learner(true, effects),
        }
    }

    /// Hand the turn to the learner: settle, then listen, with the watchdog running.
    fn await_learner(&mut self, clear_feedback: bool, effects: &mut Vec<Effect>) {
        let Some(state) = self.session.as_mut() else {
            return;
        };
        if state.pair.learner.is_none() {
            self.complete(effects);
            return;
        }

        state.is_learner_turn = true;
        state.clear_attempt(clear_feedback);
        if !self.recognition_supported {
            state.phase = Phase::Prompting;
            tracing::debug!(target: "session", "recognition unsupported, cannot listen");
            return;
        }

        state.phase = Phase::AwaitingLearner;
        self.timers.arm(TimerKind::Settle, self.timing.settle, effects);
        self.timers
            .arm(TimerKind::Watchdog, self.timing.watchdog, effects);
    }

    fn complete(&mut self, effects: &mut Vec<Effect>) {
        self.timers.cancel_all(effects);
        self.stop_listening(effects);
        let Some(state) = self.session.as_mut() else {
            return;
        };
        state.phase = Phase::Completed;
        state.is_learner_turn = false;
        state.pending_position = None;
        state.position = state.turns().len();
        tracing::info!(target: "session", "dialog {} completed", state.dialog.id);
        effects.push(Effect::Notify(Notice::Completed(state.summary())));
    }

    fn teardown(&mut self, effects: &mut Vec<Effect>) {
        if self.session.take().is_none() {
            return;
        }
        self.timers.cancel_all(effects);
        self.speaking = None;
        self.listening = false;
        effects.push(Effect::StopSpeech);
        effects.push(Effect::StopListening);
        tracing::info!(target: "session", "session closed");
    }

    fn playback_state(&self) -> Option<&SessionState> {
        self.session
            .as_ref()
            .filter(|s| matches!(s.phase, Phase::AwaitingLearner | Phase::Completed))
    }

    fn playback(&mut self, line: Option<String>) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(line) = line {
            self.speak(line, SpeechPurpose::Playback, &mut effects);
        }
        effects
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(state) = self.session.as_mut() {
            state.phase = phase;
        }
    }

    fn speak(&mut self, text: String, purpose: SpeechPurpose, effects: &mut Vec<Effect>) {
        if self.speaking.take().is_some() {
            effects.push(Effect::StopSpeech);
        }
        self.next_speech += 1;
        let id = SpeechId(self.next_speech);
        self.speaking = Some(PendingSpeech { id, purpose });
        effects.push(Effect::Speak(SpeechRequest { id, text }));
    }

    fn start_listening(&mut self, effects: &mut Vec<Effect>) {
        if !self.listening {
            self.listening = true;
            effects.push(Effect::StartListening);
        }
    }

    fn stop_listening(&mut self, effects: &mut Vec<Effect>) {
        if self.listening {
            self.listening = false;
            effects.push(Effect::StopListening);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::schema::Turn;

    fn dialog() -> Dialog {
        Dialog {
            id: "greet".to_string(),
            title: "Greetings".to_string(),
            level: None,
            turns: vec![
                Turn::partner("Hi! How are you today?"),
                Turn::learner("I'm good, thanks. And you?", &["good", "thanks", "you"]),
                Turn::partner("Have a great day."),
                Turn::learner("Thank you! You too.", &["thank", "you", "too"]),
            ],
        }
    }

    fn spoken(effects: &[Effect]) -> Vec<SpeechRequest> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Speak(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    fn armed(effects: &[Effect], kind: TimerKind) -> Option<Timer> {
        effects.iter().find_map(|e| match e {
            Effect::ArmTimer { timer, .. } if timer.kind == kind => Some(*timer),
            _ => None,
        })
    }

    fn finish(ctl: &mut SessionController, effects: &[Effect]) -> Vec<Effect> {
        let req = spoken(effects).pop().expect("expected a speak effect");
        ctl.on_speech_finished(req.id, SpeechOutcome::Finished)
    }

    /// Controller sitting in `AwaitingLearner` for the first pair, intro done.
    fn awaiting() -> (SessionController, Vec<Effect>) {
        let mut ctl = SessionController::new(Timing::default(), true, Mode::Normal);
        ctl.select_dialog(dialog());
        let effects = ctl.start();
        let effects = finish(&mut ctl, &effects); // intro
        let effects = finish(&mut ctl, &effects); // partner line
        assert_eq!(ctl.phase(), Some(Phase::AwaitingLearner));
        (ctl, effects)
    }

    #[test]
    fn test_start_speaks_intro_then_partner_line() {
        let mut ctl = SessionController::new(Timing::default(), true, Mode::Normal);
        ctl.select_dialog(dialog());

        let effects = ctl.start();
        assert_eq!(ctl.phase(), Some(Phase::Starting));
        assert!(ctl.intro_played());
        assert_eq!(spoken(&effects)[0].text, t!("session.intro"));

        let effects = finish(&mut ctl, &effects);
        assert_eq!(ctl.phase(), Some(Phase::Prompting));
        assert_eq!(spoken(&effects)[0].text, "Hi! How are you today?");

        let effects = finish(&mut ctl, &effects);
        let state = ctl.session().unwrap();
        assert_eq!(state.phase, Phase::AwaitingLearner);
        assert!(state.is_learner_turn);
        assert!(armed(&effects, TimerKind::Settle).is_some());
        assert!(armed(&effects, TimerKind::Watchdog).is_some());
        assert!(!effects.contains(&Effect::StartListening));
    }

    #[test]
    fn test_start_only_once() {
        let (mut ctl, _) = awaiting();
        assert!(ctl.start().is_empty());
    }

    #[test]
    fn test_intro_survives_dialog_change() {
        let (mut ctl, _) = awaiting();
        ctl.select_dialog(dialog());
        let effects = ctl.start();
        assert_eq!(ctl.phase(), Some(Phase::Prompting));
        assert_eq!(spoken(&effects)[0].text, "Hi! How are you today?");
    }

    #[test]
    fn test_settle_timer_opens_microphone() {
        let (mut ctl, effects) = awaiting();
        let settle = armed(&effects, TimerKind::Settle).unwrap();
        let effects = ctl.on_timer(settle);
        assert_eq!(effects, vec![Effect::StartListening]);
        assert!(ctl.is_listening());
    }

    #[test]
    fn test_pass_advances_after_pause() {
        let (mut ctl, effects) = awaiting();
        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());

        let effects = ctl.on_transcript("I am good thanks and you");
        assert_eq!(ctl.phase(), Some(Phase::Advancing));
        assert!(effects.contains(&Effect::StopListening));
        let pause = armed(&effects, TimerKind::AdvancePause).unwrap();

        let effects = ctl.on_timer(pause);
        let state = ctl.session().unwrap();
        assert_eq!(state.phase, Phase::Prompting);
        assert_eq!(state.position, 2);
        assert_eq!(state.pair.learner, Some(3));
        assert!(state.last_score.is_none());
        assert_eq!(spoken(&effects)[0].text, "Have a great day.");
    }

    #[test]
    fn test_fail_speaks_correction_then_listens_again() {
        let (mut ctl, effects) = awaiting();
        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());
        ctl.set_mode(Mode::Strict);

        let effects = ctl.on_transcript("good thanks you");
        assert_eq!(ctl.phase(), Some(Phase::Retrying));
        assert!(effects.contains(&Effect::StopListening));
        let correction = spoken(&effects);
        assert!(correction[0].text.ends_with("I'm good, thanks. And you?"));
        assert!(ctl.session().unwrap().feedback.is_some());

        let effects = ctl.on_speech_finished(correction[0].id, SpeechOutcome::Finished);
        let state = ctl.session().unwrap();
        assert_eq!(state.phase, Phase::AwaitingLearner);
        assert!(state.transcript.is_none());
        assert!(state.last_score.is_none());
        assert!(state.feedback.is_some());
        assert!(armed(&effects, TimerKind::Watchdog).is_some());
    }

    #[test]
    fn test_last_pass_completes() {
        let (mut ctl, _) = awaiting();
        let effects = ctl.skip();
        finish(&mut ctl, &effects);
        let effects = ctl.on_transcript("Thank you, you too");
        assert_eq!(ctl.phase(), Some(Phase::Completed));
        let summary = effects.iter().find_map(|e| match e {
            Effect::Notify(Notice::Completed(summary)) => Some(summary.clone()),
            _ => None,
        });
        assert_eq!(summary.map(|s| s.lines_passed), Some(1));
        assert_eq!(ctl.session().unwrap().position, 4);
    }

    #[test]
    fn test_watchdog_reminds_once() {
        let (mut ctl, effects) = awaiting();
        let watchdog = armed(&effects, TimerKind::Watchdog).unwrap();
        let effects = ctl.on_timer(watchdog);
        assert_eq!(spoken(&effects)[0].text, t!("session.reminder"));
        assert!(ctl.on_timer(watchdog).is_empty());
        // Listening is untouched by the reminder.
        assert!(!effects.contains(&Effect::StopListening));
    }

    #[test]
    fn test_speech_failure_treated_as_finished() {
        let mut ctl = SessionController::new(Timing::default(), true, Mode::Normal);
        ctl.select_dialog(dialog());
        let effects = ctl.start();
        let intro = spoken(&effects).pop().unwrap();
        ctl.on_speech_finished(intro.id, SpeechOutcome::Failed("no voices".to_string()));
        assert_eq!(ctl.phase(), Some(Phase::Prompting));
    }

    #[test]
    fn test_unsupported_recognition_noticed_and_never_listens() {
        let mut ctl = SessionController::new(Timing::default(), false, Mode::Normal);
        ctl.select_dialog(dialog());
        let effects = ctl.start();
        assert!(effects.contains(&Effect::Notify(Notice::Error(
            PracticeError::RecognitionUnsupported
        ))));
        let effects = finish(&mut ctl, &effects);
        let effects = finish(&mut ctl, &effects);
        assert_eq!(ctl.phase(), Some(Phase::Prompting));
        assert!(ctl.session().unwrap().is_learner_turn);
        assert!(armed(&effects, TimerKind::Settle).is_none());
    }

    #[test]
    fn test_exit_requires_confirmation_once_started() {
        let (mut ctl, _) = awaiting();
        assert_eq!(ctl.request_exit(false), ExitOutcome::NeedsConfirmation);
        assert!(ctl.session().is_some());

        let ExitOutcome::Exited(effects) = ctl.request_exit(true) else {
            panic!("expected exit");
        };
        assert!(effects.contains(&Effect::StopSpeech));
        assert!(effects.contains(&Effect::StopListening));
        assert!(ctl.session().is_none());
    }

    #[test]
    fn test_exit_before_start_needs_no_confirmation() {
        let mut ctl = SessionController::new(Timing::default(), true, Mode::Normal);
        ctl.select_dialog(dialog());
        assert!(matches!(ctl.request_exit(false), ExitOutcome::Exited(_)));
        assert!(ctl.session().is_none());
    }

    #[test]
    fn test_recognition_error_waits_for_listen() {
        let (mut ctl, effects) = awaiting();
        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());
        let effects = ctl.on_recognition_error("no-speech".to_string());
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::Error(PracticeError::Recognition(
                "no-speech".to_string()
            )))]
        );
        assert!(ctl.on_listening_changed(false).is_empty());
        assert_eq!(ctl.phase(), Some(Phase::AwaitingLearner));

        assert_eq!(ctl.listen(), vec![Effect::StartListening]);
        assert!(ctl.session().unwrap().recognition_error.is_none());
    }

    #[test]
    fn test_recognition_error_does_not_carry_into_next_turn() {
        let (mut ctl, effects) = awaiting();
        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());
        ctl.on_recognition_error("network".to_string());
        ctl.on_listening_changed(false);

        let effects = ctl.skip();
        let effects = finish(&mut ctl, &effects);
        assert_eq!(ctl.phase(), Some(Phase::AwaitingLearner));
        assert!(ctl.session().unwrap().recognition_error.is_none());

        assert_eq!(
            ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap()),
            vec![Effect::StartListening]
        );
        let effects = ctl.on_listening_changed(false);
        assert!(armed(&effects, TimerKind::Settle).is_some());
    }

    #[test]
    fn test_error_from_stopped_recognition_cleared_after_correction() {
        let (mut ctl, effects) = awaiting();
        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());
        let effects = ctl.on_transcript("banana");
        assert_eq!(ctl.phase(), Some(Phase::Retrying));
        // Stopping recognition mid-session can surface as an "aborted" error.
        ctl.on_recognition_error("aborted".to_string());
        ctl.on_listening_changed(false);

        let effects = finish(&mut ctl, &effects);
        assert_eq!(ctl.phase(), Some(Phase::AwaitingLearner));
        assert!(ctl.session().unwrap().recognition_error.is_none());

        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());
        let effects = ctl.on_listening_changed(false);
        assert!(armed(&effects, TimerKind::Settle).is_some());
    }

    #[test]
    fn test_silent_end_of_recognition_restarts_after_settle() {
        let (mut ctl, effects) = awaiting();
        ctl.on_timer(armed(&effects, TimerKind::Settle).unwrap());
        let effects = ctl.on_listening_changed(false);
        let settle = armed(&effects, TimerKind::Settle).unwrap();
        assert_eq!(ctl.on_timer(settle), vec![Effect::StartListening]);
    }

    #[test]
    fn test_playback_only_while_learner_turn() {
        let mut ctl = SessionController::new(Timing::default(), true, Mode::Normal);
        ctl.select_dialog(dialog());
        assert!(ctl.replay_partner().is_empty());

        let (mut ctl, _) = awaiting();
        let effects = ctl.play_expected();
        assert_eq!(spoken(&effects)[0].text, "I'm good, thanks. And you?");
        let effects = ctl.replay_partner();
        assert_eq!(effects[0], Effect::StopSpeech);
        assert_eq!(spoken(&effects)[0].text, "Hi! How are you today?");
    }

    #[test]
    fn test_mode_change_applies_to_next_attempt() {
        let (mut ctl, _) = awaiting();
        ctl.set_mode(Mode::Easy);
        ctl.on_transcript("good thanks and you");
        let attempt = &ctl.session().unwrap().attempts[0];
        assert_eq!(attempt.mode, Mode::Easy);
        assert!(attempt.result.pass);
    }

    #[test]
    fn test_transcript_outside_learner_turn_ignored() {
        let mut ctl = SessionController::new(Timing::default(), true, Mode::Normal);
        ctl.select_dialog(dialog());
        let effects = ctl.start();
        assert!(ctl.on_transcript("I'm good, thanks. And you?").is_empty());
        assert_eq!(ctl.phase(), Some(Phase::Starting));
        assert!(!effects.is_empty());
    }
}
