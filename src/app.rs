use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::Config;
use crate::content::schema::Dialog;
use crate::engine::feedback::Tone;
use crate::event::{AppEvent, Command, EventHandler};
use crate::session::controller::{Effect, ExitOutcome, Notice, SessionController};
use crate::session::result::SessionSummary;
use crate::session::state::Phase;
use crate::session::timer::Timer;
use crate::voice::{Recognizer, Speaker};

const HELP: &str = "\
  :skip          jump to the next partner line
  :replay        hear the partner line again
  :example       hear the line you should say
  :listen        open the microphone again
  :mode <m>      easy, normal or strict
  :quit          leave (asks to confirm once started)";

/// Console host: owns the capabilities and carries out controller effects.
pub struct App<S: Speaker, R: Recognizer> {
    pub config: Config,
    controller: SessionController,
    speaker: S,
    recognizer: R,
    timers: Vec<(Instant, Timer)>,
    confirming_exit: bool,
    shown_turn: Option<(Phase, bool)>,
    /// The learner has finished with the completed dialog.
    move_on: bool,
    summaries: Vec<SessionSummary>,
    should_quit: bool,
}

impl<S: Speaker, R: Recognizer> App<S, R> {
    pub fn new(config: Config, speaker: S, recognizer: R) -> Self {
        let controller =
            SessionController::new(config.timing(), recognizer.is_supported(), config.mode);
        Self {
            config,
            controller,
            speaker,
            recognizer,
            timers: Vec::new(),
            confirming_exit: false,
            shown_turn: None,
            move_on: false,
            summaries: Vec::new(),
            should_quit: false,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn summaries(&self) -> &[SessionSummary] {
        &self.summaries
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Practice `dialogs` in order until all are done or the learner leaves.
    pub fn run(&mut self, events: &EventHandler, dialogs: &[Dialog]) -> Result<()> {
        for dialog in dialogs {
            self.begin(dialog.clone());
            while !self.should_quit && !self.dialog_done() {
                let event = match self.until_next_timer() {
                    Some(wait) => events.next_timeout(wait)?,
                    None => Some(events.next()?),
                };
                if let Some(event) = event {
                    self.handle_event(event);
                }
                self.fire_due_timers(Instant::now());
            }
            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Completed and acknowledged, so the next dialog can start.
    pub fn dialog_done(&self) -> bool {
        self.move_on && self.controller.phase() == Some(Phase::Completed)
    }

    pub fn begin(&mut self, dialog: Dialog) {
        tracing::info!(target: "app", "starting dialog {}", dialog.id);
        self.move_on = false;
        println!();
        println!("── {} ──", dialog.title);
        let effects = self.controller.select_dialog(dialog);
        self.apply(effects);
        let effects = self.controller.start();
        self.apply(effects);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Voice(voice) => {
                let effects = self.controller.handle_voice(voice);
                self.apply(effects);
            }
            AppEvent::Command(command) => self.handle_command(command),
            AppEvent::Input(_) => {
                if self.controller.phase() == Some(Phase::Completed) {
                    self.move_on = true;
                } else if self.controller.is_speaking() {
                    println!("  (wait until the line has been spoken)");
                } else if self.controller.session().is_some_and(|s| s.is_learner_turn) {
                    println!("  (the microphone is closed; type :listen to open it)");
                } else {
                    println!("  (wait for your turn, or type :help)");
                }
            }
            AppEvent::Closed => {
                tracing::info!(target: "app", "input closed, leaving");
                if let ExitOutcome::Exited(effects) = self.controller.request_exit(true) {
                    self.apply(effects);
                }
                self.should_quit = true;
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        if self.confirming_exit && !matches!(command, Command::Yes | Command::No) {
            self.confirming_exit = false;
        }
        let effects = match command {
            Command::Skip => self.controller.skip(),
            Command::Replay => self.controller.replay_partner(),
            Command::Example => self.controller.play_expected(),
            Command::Listen => self.controller.listen(),
            Command::Quit => match self.controller.request_exit(false) {
                ExitOutcome::NeedsConfirmation => {
                    self.confirming_exit = true;
                    println!("  Leave this practice? :yes / :no");
                    Vec::new()
                }
                ExitOutcome::Exited(effects) => {
                    self.should_quit = true;
                    effects
                }
            },
            Command::Yes if self.confirming_exit => {
                self.confirming_exit = false;
                self.should_quit = true;
                match self.controller.request_exit(true) {
                    ExitOutcome::Exited(effects) => effects,
                    ExitOutcome::NeedsConfirmation => Vec::new(),
                }
            }
            Command::No if self.confirming_exit => {
                self.confirming_exit = false;
                println!("  Carrying on.");
                Vec::new()
            }
            Command::Yes | Command::No => Vec::new(),
            Command::Mode(mode) => {
                self.controller.set_mode(mode);
                self.config.mode = mode;
                println!("  Mode: {mode}");
                Vec::new()
            }
            Command::Help => {
                println!("{HELP}");
                Vec::new()
            }
            Command::Unknown(text) => {
                println!("  Unknown command :{text} (try :help)");
                Vec::new()
            }
        };
        self.apply(effects);
    }

    /// Carry out effects in order.
    pub fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Speak(request) => self.speaker.speak(request),
                Effect::StopSpeech => self.speaker.stop(),
                Effect::StartListening => self.recognizer.start(),
                Effect::StopListening => self.recognizer.stop(),
                Effect::ArmTimer { timer, after } => {
                    self.timers.push((Instant::now() + after, timer));
                }
                Effect::CancelTimer(timer) => self.timers.retain(|(_, t)| *t != timer),
                Effect::Notify(notice) => self.report(notice),
            }
        }
        self.show_turn();
    }

    /// Deliver every timer due at `now`, earliest first.
    pub fn fire_due_timers(&mut self, now: Instant) {
        loop {
            let due = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, (at, _))| *at <= now)
                .min_by_key(|(_, (at, _))| *at)
                .map(|(i, _)| i);
            let Some(index) = due else {
                break;
            };
            let (_, timer) = self.timers.remove(index);
            tracing::debug!(target: "app", "{:?} timer due", timer.kind);
            let effects = self.controller.on_timer(timer);
            self.apply(effects);
        }
    }

    fn until_next_timer(&self) -> Option<Duration> {
        let now = Instant::now();
        self.timers
            .iter()
            .map(|(at, _)| at.saturating_duration_since(now))
            .min()
    }

    fn report(&mut self, notice: Notice) {
        match notice {
            Notice::Error(err) => println!("  ! {err}"),
            Notice::Scored { result, feedback } => {
                let mark = match feedback.tone {
                    Tone::Good => "✓",
                    Tone::Bad => "✗",
                };
                println!("  {mark} {} (score {})", feedback.headline(), result.score);
                if feedback.tone == Tone::Good {
                    return;
                }
                for hint in &feedback.hints {
                    println!("    - {hint}");
                }
            }
            Notice::Completed(summary) => {
                println!(
                    "  Dialog complete: {} line(s) passed in {} attempt(s) ({:.0}% of attempts passed), average {:.0}, best {}.",
                    summary.lines_passed,
                    summary.attempts,
                    summary.pass_rate(),
                    summary.average_score,
                    summary.best_score
                );
                println!("  Press Enter to go on, or :replay / :example to listen again.");
                self.summaries.push(summary);
            }
        }
    }

    /// Highlight the learner's line when their turn begins.
    fn show_turn(&mut self) {
        let Some(state) = self.controller.session() else {
            self.shown_turn = None;
            return;
        };
        let turn = (state.phase, state.is_learner_turn);
        let learner_turn = matches!(state.phase, Phase::AwaitingLearner | Phase::Prompting)
            && state.is_learner_turn;
        if learner_turn && self.shown_turn != Some(turn) {
            if let Some(line) = state.expected_line() {
                println!("  ▶ Your line ({:.0}%): {line}", state.progress() * 100.0);
            }
        }
        self.shown_turn = Some(turn);
    }
}
