// Character animation state machine

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, trace};

use crate::engine::timer::Ticker;
use crate::game::presenter::{FrameEvent, FrameSink};
use crate::game::CombatError;

use super::state::ClipName;

/// Frame period used by clips that don't set their own
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(100);

/// A single animation clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationClip {
    pub name: ClipName,
    /// Ordered frame asset references
    pub frames: Vec<String>,
    /// Time each frame stays on screen, `None` for the library default
    pub frame_period: Option<Duration>,
}

impl AnimationClip {
    /// Create a clip from explicit frame references
    pub fn new(name: ClipName, frames: Vec<String>, frame_period: Option<Duration>) -> Self {
        Self {
            name,
            frames,
            frame_period,
        }
    }

    /// Create a clip whose frames are `{dir}/{stem}_{i}.png` for `i in 0..count`
    pub fn numbered(name: ClipName, dir: &str, stem: &str, count: usize, period_ms: u64) -> Self {
        let frames = (0..count)
            .map(|i| format!("{dir}/{stem}_{i}.png"))
            .collect();
        Self::new(name, frames, Some(Duration::from_millis(period_ms)))
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total time for one pass through the clip
    pub fn total_duration(&self, default_period: Duration) -> Duration {
        self.frame_period.unwrap_or(default_period) * self.frames.len() as u32
    }
}

/// Immutable set of clips a character can play
#[derive(Debug, Clone)]
pub struct ClipLibrary {
    clips: HashMap<ClipName, AnimationClip>,
    default_period: Duration,
}

impl Default for ClipLibrary {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_PERIOD)
    }
}

impl ClipLibrary {
    /// Create an empty library
    pub fn new(default_period: Duration) -> Self {
        Self {
            clips: HashMap::new(),
            default_period,
        }
    }

    /// The stock knight sprite set
    pub fn knight() -> Self {
        const DIR: &str = "assets/characters/knight";
        Self::default()
            .with_clip(AnimationClip::numbered(ClipName::Idle, DIR, "idle", 6, 150))
            .with_clip(AnimationClip::numbered(ClipName::Walk, DIR, "walk", 8, 150))
            .with_clip(AnimationClip::numbered(ClipName::Attack1, DIR, "attack1", 6, 120))
            .with_clip(AnimationClip::numbered(ClipName::Attack2, DIR, "attack2", 6, 120))
            .with_clip(AnimationClip::numbered(ClipName::Attack3, DIR, "attack3", 9, 100))
            .with_clip(AnimationClip::numbered(ClipName::Hurt, DIR, "hurt", 4, 150))
            .with_clip(AnimationClip::numbered(ClipName::Death, DIR, "death", 4, 300))
    }

    /// Add a clip, replacing any clip with the same name
    pub fn with_clip(mut self, clip: AnimationClip) -> Self {
        self.add_clip(clip);
        self
    }

    fn add_clip(&mut self, clip: AnimationClip) {
        self.clips.insert(clip.name, clip);
    }

    pub fn get(&self, name: ClipName) -> Option<&AnimationClip> {
        self.clips.get(&name)
    }

    /// Change the period used by clips without their own
    pub fn with_default_period(mut self, period: Duration) -> Self {
        self.default_period = period;
        self
    }

    pub fn default_period(&self) -> Duration {
        self.default_period
    }

    /// Frame period for a clip, falling back to the library default
    pub fn period_of(&self, clip: &AnimationClip) -> Duration {
        clip.frame_period.unwrap_or(self.default_period)
    }

    /// Override the period of an already registered clip
    pub fn set_period(&mut self, name: ClipName, period: Duration) {
        if let Some(clip) = self.clips.get_mut(&name) {
            clip.frame_period = Some(period);
        }
    }
}

/// Playback state, owned by one state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationState {
    pub current_clip: Option<ClipName>,
    pub frame_index: usize,
    pub playing: bool,
}

/// Result of a `play` request that named a known clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The clip restarted from frame 0
    Started,
    /// The same looping clip was already playing; nothing changed
    AlreadyLooping,
    /// A dead character can only be reset with a looping clip
    Locked,
}

/// Plays one clip at a time with loop, one-shot and terminal semantics
///
/// Looping clips wrap; one-shot clips hand over to `Walk` when they run
/// out; `Death` holds its last frame and refuses everything but a looping
/// clip. At most one frame ticker is pending at any time.
pub struct AnimationStateMachine {
    label: String,
    library: ClipLibrary,
    state: AnimationState,
    ticker: Option<Ticker>,
    sink: Box<dyn FrameSink>,
}

impl std::fmt::Debug for AnimationStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationStateMachine")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("ticker", &self.ticker)
            .finish_non_exhaustive()
    }
}

impl AnimationStateMachine {
    pub fn new(label: &str, library: ClipLibrary, sink: Box<dyn FrameSink>) -> Self {
        Self {
            label: label.to_string(),
            library,
            state: AnimationState::default(),
            ticker: None,
            sink,
        }
    }

    /// Play a clip by its string name (`"WALK"`, `"ATTACK2"`, ...)
    pub fn play_named(&mut self, name: &str) -> Result<PlayOutcome, CombatError> {
        let clip = ClipName::from_str(name)
            .map_err(|_| CombatError::UnknownAnimation(name.to_string()))?;
        self.play(clip)
    }

    /// Play a clip from its first frame
    ///
    /// Clips missing from the library are an `UnknownAnimation` error and
    /// leave the state untouched.
    pub fn play(&mut self, clip: ClipName) -> Result<PlayOutcome, CombatError> {
        let Some(animation) = self.library.get(clip) else {
            return Err(CombatError::UnknownAnimation(clip.to_string()));
        };

        if self.state.playing && self.state.current_clip == Some(clip) && clip.is_looping() {
            return Ok(PlayOutcome::AlreadyLooping);
        }

        if self.state.current_clip == Some(ClipName::Death) && !clip.clears_death() {
            debug!("[{}] {} rejected: character is dead", self.label, clip);
            return Ok(PlayOutcome::Locked);
        }

        let period = self.library.period_of(animation);

        self.ticker = None;
        self.state = AnimationState {
            current_clip: Some(clip),
            frame_index: 0,
            playing: true,
        };
        trace!("[{}] play {}", self.label, clip);
        self.emit_frame();
        self.ticker = Some(Ticker::new(period));

        Ok(PlayOutcome::Started)
    }

    /// Cancel the frame ticker, keeping the displayed frame
    pub fn stop(&mut self) {
        self.ticker = None;
        self.state.playing = false;
    }

    /// Advance playback by `dt`
    pub fn update(&mut self, dt: Duration) {
        let mut budget = dt;
        while let Some(ticker) = self.ticker.as_mut() {
            if !ticker.consume(&mut budget) {
                break;
            }
            self.on_tick();
        }
    }

    /// Time until the next scheduled frame advance, if any
    pub fn time_until_tick(&self) -> Option<Duration> {
        self.ticker.as_ref().map(Ticker::time_until_fire)
    }

    fn on_tick(&mut self) {
        let Some(clip) = self.state.current_clip else {
            self.ticker = None;
            return;
        };
        let frame_count = self.library.get(clip).map_or(0, AnimationClip::frame_count);

        self.state.frame_index += 1;
        if self.state.frame_index < frame_count {
            self.emit_frame();
            return;
        }

        if clip.is_looping() {
            self.state.frame_index = 0;
            self.emit_frame();
        } else if clip == ClipName::Death {
            // Hold the last frame; the machine stays in its terminal state
            self.state.frame_index = frame_count.saturating_sub(1);
            self.ticker = None;
        } else if clip.returns_to_walk() {
            if let Err(err) = self.play(ClipName::Walk) {
                debug!("[{}] no clip to return to after {}: {}", self.label, clip, err);
                self.stop();
            }
        }
    }

    fn emit_frame(&mut self) {
        let Some(clip) = self.state.current_clip else {
            return;
        };
        let frame_index = self.state.frame_index;
        let frame_ref = self
            .library
            .get(clip)
            .and_then(|c| c.frames.get(frame_index))
            .map(String::as_str);
        self.sink.on_frame(FrameEvent {
            clip,
            frame_index,
            frame_ref,
        });
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn current_clip(&self) -> Option<ClipName> {
        self.state.current_clip
    }

    pub fn frame_index(&self) -> usize {
        self.state.frame_index
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    /// Whether the death lock is engaged
    pub fn is_locked(&self) -> bool {
        self.state.current_clip == Some(ClipName::Death)
    }

    /// Whether a frame ticker is pending
    pub fn has_pending_tick(&self) -> bool {
        self.ticker.is_some()
    }

    /// Asset reference of the frame on display
    pub fn current_frame_ref(&self) -> Option<&str> {
        let clip = self.library.get(self.state.current_clip?)?;
        clip.frames.get(self.state.frame_index).map(String::as_str)
    }

    pub fn library(&self) -> &ClipLibrary {
        &self.library
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
