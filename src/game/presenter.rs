// Presentation hooks
//
// The core never reads anything back from these; they only observe.

use log::info;

use super::characters::ClipName;
use super::combat::{GameOverReport, TurnId};
use super::problems::Problem;
use super::relay::OpponentUpdate;

/// A frame change on an animation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEvent<'a> {
    pub clip: ClipName,
    pub frame_index: usize,
    /// `None` when the clip has no asset at this index: draw nothing
    pub frame_ref: Option<&'a str>,
}

/// Receives every frame change of one animation state machine
pub trait FrameSink {
    fn on_frame(&mut self, event: FrameEvent<'_>);
}

/// Short visual cue after a turn resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Success,
    Heal,
    Damage,
}

/// Receives HUD updates from the combat loop
///
/// Every method defaults to doing nothing so sinks only implement what
/// they draw.
pub trait HudSink {
    fn on_problem(&mut self, _turn: TurnId, _problem: &Problem) {}
    fn on_health(&mut self, _percent: f32) {}
    fn on_timer(&mut self, _percent: f32) {}
    fn on_streak(&mut self, _streak: u32) {}
    fn on_flash(&mut self, _flash: Flash) {}
    fn on_damage(&mut self, _amount: u32) {}
    fn on_message(&mut self, _text: &str) {}
    fn on_game_over(&mut self, _report: &GameOverReport) {}
    fn on_opponent(&mut self, _update: &OpponentUpdate) {}
}

/// Sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn on_frame(&mut self, _event: FrameEvent<'_>) {}
}

impl HudSink for NullSink {}

/// Presenter that writes the game to the log, one line per event
///
/// Frame changes go to `trace` since there are many of them.
#[derive(Debug, Default, Clone)]
pub struct LogPresenter {
    label: String,
}

impl LogPresenter {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl FrameSink for LogPresenter {
    fn on_frame(&mut self, event: FrameEvent<'_>) {
        log::trace!(
            "[{}] {} frame {} -> {}",
            self.label,
            event.clip,
            event.frame_index,
            event.frame_ref.unwrap_or("<none>")
        );
    }
}

impl HudSink for LogPresenter {
    fn on_problem(&mut self, turn: TurnId, problem: &Problem) {
        info!("[{}] turn {}: {} = ?", self.label, turn.0, problem.display_text);
    }

    fn on_health(&mut self, percent: f32) {
        info!("[{}] health {:.0}%", self.label, percent);
    }

    fn on_streak(&mut self, streak: u32) {
        info!("[{}] streak {}", self.label, streak);
    }

    fn on_flash(&mut self, flash: Flash) {
        log::debug!("[{}] flash {:?}", self.label, flash);
    }

    fn on_damage(&mut self, amount: u32) {
        info!("[{}] took {} damage", self.label, amount);
    }

    fn on_message(&mut self, text: &str) {
        info!("[{}] {}", self.label, text);
    }

    fn on_game_over(&mut self, report: &GameOverReport) {
        info!(
            "[{}] GAME OVER ({}) score {}{}",
            self.label,
            report.mode,
            report.score,
            if report.new_record { " - NEW RECORD!" } else { "" }
        );
    }

    fn on_opponent(&mut self, update: &OpponentUpdate) {
        info!(
            "[{}] opponent {} {:?} (score {})",
            self.label, update.username, update.action, update.score
        );
    }
}
