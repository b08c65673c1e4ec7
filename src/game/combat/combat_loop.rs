// The combat turn loop

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::GameConfig;
use crate::engine::input::{parse_answer, AnswerBuffer};
use crate::engine::rng::GameRng;
use crate::game::characters::state::ATTACK_VARIANTS;
use crate::game::characters::{AnimationStateMachine, ClipLibrary, ClipName, Hero, PlayOutcome};
use crate::game::presenter::{Flash, FrameSink, HudSink, NullSink};
use crate::game::problems::{MathEngine, OperationKind, Problem, ProblemSource};
use crate::game::relay::{NullRelay, OpponentUpdate, Relay, RelayAction, ScoreUpdate};
use crate::game::stats::{MemoryStats, StatsSnapshot, StatsStore};
use crate::game::CombatError;

use super::countdown::Countdown;
use super::match_state::{GameMode, MatchState, Phase};
use super::{FailureReason, GameOverReport, Resolution, TurnId, TurnOutcome, UpdateReport};

/// Runs one match at a time
///
/// Owns the hero, the match state and both animation state machines.
/// Everything is driven synchronously: player input through
/// `submit_answer`/`type_char`, time through `update`. The only implicit
/// turn resolution is the timed-mode countdown, and every path that
/// supersedes a turn cancels it first.
pub struct CombatLoop {
    config: GameConfig,
    hero: Hero,
    state: MatchState,
    turn: TurnId,
    current_problem: Option<Problem>,
    answer: AnswerBuffer,
    hero_anim: AnimationStateMachine,
    opponent_anim: AnimationStateMachine,
    last_opponent: Option<OpponentUpdate>,
    room_id: Option<String>,
    rng: GameRng,
    generator: Box<dyn ProblemSource>,
    stats: Box<dyn StatsStore>,
    hud: Box<dyn HudSink>,
    relay: Box<dyn Relay>,
}

impl std::fmt::Debug for CombatLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatLoop")
            .field("hero", &self.hero)
            .field("state", &self.state)
            .field("turn", &self.turn)
            .field("current_problem", &self.current_problem)
            .field("hero_anim", &self.hero_anim)
            .finish_non_exhaustive()
    }
}

/// A state machine resting on `Idle`, as characters stand before a match
fn standing_machine(
    label: &str,
    library: ClipLibrary,
    sink: Box<dyn FrameSink>,
) -> AnimationStateMachine {
    let mut machine = AnimationStateMachine::new(label, library, sink);
    if let Err(err) = machine.play(ClipName::Idle) {
        debug!("[{}] cannot idle: {}", label, err);
    }
    machine
}

impl CombatLoop {
    /// Create a combat loop with in-memory stats, no relay and no presenter.
    ///
    /// `seed` drives both the problems and the attack animations.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let library = config.clip_library();
        Self {
            hero: Hero::from_stats(&config.stats),
            state: MatchState::default(),
            turn: TurnId::default(),
            current_problem: None,
            answer: AnswerBuffer::new(),
            hero_anim: standing_machine("hero", library.clone(), Box::new(NullSink)),
            opponent_anim: standing_machine("opponent", library, Box::new(NullSink)),
            last_opponent: None,
            room_id: None,
            rng: GameRng::new(seed),
            generator: Box::new(MathEngine::new(GameRng::new(seed.wrapping_add(1)))),
            stats: Box::new(MemoryStats::new()),
            hud: Box::new(NullSink),
            relay: Box::new(NullRelay),
            config,
        }
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.state.mode = mode;
        self
    }

    pub fn with_generator(mut self, generator: impl ProblemSource + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_stats(mut self, stats: impl StatsStore + 'static) -> Self {
        self.stats = Box::new(stats);
        self
    }

    pub fn with_hud(mut self, hud: impl HudSink + 'static) -> Self {
        self.hud = Box::new(hud);
        self
    }

    pub fn with_relay(mut self, relay: impl Relay + 'static) -> Self {
        self.relay = Box::new(relay);
        self
    }

    pub fn with_hero_frames(mut self, sink: impl FrameSink + 'static) -> Self {
        let library = self.hero_anim.library().clone();
        self.hero_anim = standing_machine("hero", library, Box::new(sink));
        self
    }

    pub fn with_opponent_frames(mut self, sink: impl FrameSink + 'static) -> Self {
        let library = self.opponent_anim.library().clone();
        self.opponent_anim = standing_machine("opponent", library, Box::new(sink));
        self
    }

    // ------------------------------------------------------------------
    // Modes and screens
    // ------------------------------------------------------------------

    /// Switch mode; any running match is dropped
    pub fn set_mode(&mut self, mode: GameMode) {
        self.state.cancel_countdown();
        self.state.mode = mode;
        self.state.phase = Phase::NotStarted;
        self.current_problem = None;
        self.answer.clear();
        info!("Mode set to {}", mode);
        self.hud.on_timer(100.0);
        self.hud.on_message(mode.describe());
    }

    /// Join a multiplayer room; updates are relayed only once joined
    pub fn join_room(&mut self, room_id: &str) {
        info!("Joined room {}", room_id);
        self.room_id = Some(room_id.to_string());
    }

    /// Open the stats screen, abandoning any running match
    pub fn open_stats(&mut self) -> StatsSnapshot {
        self.state.cancel_countdown();
        if self.state.is_active() {
            info!("Match abandoned for the stats screen");
            self.state.phase = Phase::NotStarted;
            self.current_problem = None;
            self.answer.clear();
        }
        self.state.inspecting = true;
        self.stats.stats()
    }

    pub fn close_stats(&mut self) {
        self.state.inspecting = false;
    }

    /// Wipe all saved stats
    pub fn reset_stats(&mut self) {
        info!("Stats reset");
        self.stats.reset_data();
    }

    // ------------------------------------------------------------------
    // Match lifecycle
    // ------------------------------------------------------------------

    /// Start a new match in the current mode
    pub fn start(&mut self) -> Result<(), CombatError> {
        if self.state.inspecting {
            return Err(CombatError::IllegalTransition(
                "cannot start a match from the stats screen".to_string(),
            ));
        }
        if self.state.is_active() {
            return Err(CombatError::IllegalTransition(
                "a match is already running".to_string(),
            ));
        }

        self.hero.reset();
        self.play_hero(ClipName::Walk);
        self.state.phase = Phase::InTurn;
        info!("Match started ({})", self.state.mode);
        self.push_hero_hud();

        self.next_turn()?;
        Ok(())
    }

    /// Move to the next problem, or to game over if the hero is dead
    pub fn next_turn(&mut self) -> Result<Option<GameOverReport>, CombatError> {
        if !self.state.is_active() {
            return Err(CombatError::IllegalTransition(
                "no match is running".to_string(),
            ));
        }
        if self.hero.is_dead() {
            return Ok(Some(self.game_over()));
        }

        self.state.cancel_countdown();
        let streak = self.hero.streak();
        let problem = match self.generator.generate(streak) {
            Ok(problem) => problem,
            Err(err) => {
                warn!("Problem generation failed, match aborted: {}", err);
                self.state.phase = Phase::NotStarted;
                self.current_problem = None;
                return Err(err.into());
            }
        };

        self.turn = self.turn.next();
        self.answer.clear();
        debug!(
            "Turn {}: {} (streak {})",
            self.turn.0, problem.display_text, streak
        );
        self.hud.on_problem(self.turn, &problem);
        self.current_problem = Some(problem);

        if self.state.mode.is_timed() {
            let rules = self.config.timer;
            self.state.countdown = Some(Countdown::new(rules.turn_budget(streak), rules.tick()));
            self.hud.on_timer(100.0);
        }

        Ok(None)
    }

    // ------------------------------------------------------------------
    // Answers
    // ------------------------------------------------------------------

    /// Answer the current turn
    ///
    /// Non-integer input is `InvalidInput` and leaves the turn (and its
    /// countdown) running.
    pub fn submit_answer(&mut self, input: &str) -> Result<Resolution, CombatError> {
        if !self.state.is_active() {
            debug!("Answer {:?} ignored: no turn in progress", input);
            return Err(CombatError::IllegalTransition(
                "no turn in progress".to_string(),
            ));
        }
        let Some(value) = parse_answer(input) else {
            debug!("Answer {:?} ignored: not a number", input);
            return Err(CombatError::InvalidInput(input.to_string()));
        };
        self.resolve_answer(value)
    }

    /// Answer a specific turn; fails if that turn was already resolved
    pub fn submit_answer_for(
        &mut self,
        turn: TurnId,
        input: &str,
    ) -> Result<Resolution, CombatError> {
        if turn != self.turn || !self.state.is_active() {
            debug!("Answer for turn {} ignored: turn is over", turn.0);
            return Err(CombatError::IllegalTransition(format!(
                "turn {} is already resolved",
                turn.0
            )));
        }
        self.submit_answer(input)
    }

    /// Type one character of the answer
    ///
    /// In timed mode the turn resolves as soon as the typed text equals the
    /// expected answer.
    pub fn type_char(&mut self, c: char) -> Result<Option<Resolution>, CombatError> {
        if !self.state.is_active() {
            return Err(CombatError::IllegalTransition(
                "no turn in progress".to_string(),
            ));
        }
        if !self.answer.push(c) {
            return Err(CombatError::InvalidInput(c.to_string()));
        }

        if self.state.mode.is_timed() {
            let expected = self.current_problem.as_ref().map(|p| p.expected_answer);
            if let Some(value) = self.answer.parse().filter(|v| Some(*v) == expected) {
                return self.resolve_answer(value).map(Some);
            }
        }
        Ok(None)
    }

    pub fn backspace(&mut self) {
        self.answer.backspace();
    }

    /// Submit whatever has been typed so far
    pub fn submit_buffer(&mut self) -> Result<Resolution, CombatError> {
        let typed = self.answer.as_str().to_string();
        self.submit_answer(&typed)
    }

    fn resolve_answer(&mut self, value: i64) -> Result<Resolution, CombatError> {
        self.state.cancel_countdown();
        let turn = self.turn;
        let Some(problem) = self.current_problem.take() else {
            return Err(CombatError::IllegalTransition(
                "no problem on screen".to_string(),
            ));
        };

        let outcome = if value == problem.expected_answer {
            self.on_success(problem.operation)
        } else {
            self.on_failure(FailureReason::WrongAnswer)
        };
        let game_over = self.next_turn()?;

        Ok(Resolution {
            turn,
            outcome,
            game_over,
        })
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance the countdown and both animations by `dt`
    ///
    /// Reports the turns that timed out along the way. A generator failure
    /// while opening the turn after a timeout aborts the match; the rest of
    /// `dt` still reaches the animations.
    pub fn update(&mut self, dt: Duration) -> UpdateReport {
        let mut report = UpdateReport::default();
        let mut remaining = dt;

        while !remaining.is_zero() {
            // Step no further than the next countdown tick so the animations
            // see a timeout at the moment it happens
            let step = self
                .state
                .countdown
                .as_ref()
                .map_or(remaining, |c| c.time_until_tick().min(remaining));
            self.hero_anim.update(step);
            self.opponent_anim.update(step);
            remaining -= step;

            let Some(countdown) = self.state.countdown.as_mut() else {
                continue;
            };
            let mut budget = step;
            if !countdown.consume(&mut budget) {
                continue;
            }
            let percent = countdown.percent();
            let expired = countdown.is_expired();

            self.hud.on_timer(percent);
            if expired {
                let (resolution, next) = self.on_timeout();
                report.resolutions.push(resolution);
                if let Err(err) = next {
                    report.error = Some(err);
                }
            }
        }

        report
    }

    /// Resolve the current turn as a timeout, then open the next one
    fn on_timeout(&mut self) -> (Resolution, Result<(), CombatError>) {
        self.state.cancel_countdown();
        let turn = self.turn;
        self.current_problem = None;
        info!("Turn {} timed out", turn.0);

        let outcome = self.on_failure(FailureReason::Timeout);
        let (game_over, next) = match self.next_turn() {
            Ok(game_over) => (game_over, Ok(())),
            Err(err) => (None, Err(err)),
        };

        (
            Resolution {
                turn,
                outcome,
                game_over,
            },
            next,
        )
    }

    // ------------------------------------------------------------------
    // Outcomes
    // ------------------------------------------------------------------

    fn on_success(&mut self, kind: OperationKind) -> TurnOutcome {
        self.hero.register_correct();
        let streak = self.hero.streak();
        let mode = self.state.mode;

        let attack = self.random_attack();
        self.play_hero(attack);

        self.stats.register_correct_operation(kind);
        self.stats.update_max_streak(streak, mode);

        let healed = mode.is_timed() && self.config.stats.is_heal_milestone(streak);
        if healed {
            self.hero.heal(self.config.stats.heal_amount);
            self.hud.on_flash(Flash::Heal);
        } else {
            self.hud.on_flash(Flash::Success);
        }
        self.push_hero_hud();
        self.send_relay(RelayAction::Success);

        info!(
            "Correct! streak {}{}",
            streak,
            if healed { ", healed" } else { "" }
        );
        TurnOutcome::Success { streak, healed }
    }

    fn on_failure(&mut self, reason: FailureReason) -> TurnOutcome {
        let damage = self.config.stats.wrong_answer_damage;
        self.hero.register_miss();
        self.hero.take_damage(damage);
        self.play_hero(ClipName::Hurt);

        self.hud.on_damage(damage);
        self.hud.on_flash(Flash::Damage);
        self.push_hero_hud();
        self.send_relay(RelayAction::Failure);

        info!(
            "{:?}: -{} health, {} left",
            reason,
            damage,
            self.hero.current_health()
        );
        TurnOutcome::Failure { reason, damage }
    }

    fn game_over(&mut self) -> GameOverReport {
        self.state.cancel_countdown();
        self.state.phase = Phase::GameOver;
        self.current_problem = None;
        self.answer.clear();
        self.play_hero(ClipName::Death);

        let mode = self.state.mode;
        let score = self.hero.total_correct();
        let new_record = self.stats.update_high_score(mode, score);
        let report = GameOverReport {
            mode,
            score,
            new_record,
            high_score: self.stats.stats().high_score(mode),
        };

        info!(
            "Game over ({}): score {}{}",
            mode,
            score,
            if new_record { ", new record" } else { "" }
        );
        self.hud.on_game_over(&report);
        self.send_relay(RelayAction::GameOver);
        report
    }

    // ------------------------------------------------------------------
    // Multiplayer
    // ------------------------------------------------------------------

    fn send_relay(&mut self, action: RelayAction) {
        if self.state.mode != GameMode::Multiplayer {
            return;
        }
        let Some(room_id) = self.room_id.clone() else {
            debug!("Not in a room, {:?} not relayed", action);
            return;
        };
        let update = ScoreUpdate {
            room_id,
            score: self.hero.total_correct(),
            action,
        };
        if let Err(err) = self.relay.send_score(&update) {
            warn!("Failed to relay score: {}", err);
        }
    }

    /// Mirror an opponent update on the opponent's animation
    pub fn receive_opponent(&mut self, update: OpponentUpdate) {
        let clip = match update.action {
            RelayAction::Success => self.random_attack(),
            RelayAction::Failure => ClipName::Hurt,
            RelayAction::GameOver => ClipName::Death,
        };
        match self.opponent_anim.play(clip) {
            Ok(PlayOutcome::Locked) => debug!("Opponent is down, {} ignored", clip),
            Ok(_) => {}
            Err(err) => debug!("Opponent animation: {}", err),
        }
        self.hud.on_opponent(&update);
        self.last_opponent = Some(update);
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn random_attack(&mut self) -> ClipName {
        let variant = self.rng.range_inclusive(1, ATTACK_VARIANTS as i64);
        ClipName::attack(variant as u8).unwrap_or(ClipName::Attack1)
    }

    fn play_hero(&mut self, clip: ClipName) {
        match self.hero_anim.play(clip) {
            Ok(PlayOutcome::Locked) => debug!("Hero is down, {} ignored", clip),
            Ok(_) => {}
            Err(err) => debug!("Hero animation: {}", err),
        }
    }

    fn push_hero_hud(&mut self) {
        self.hud.on_health(self.hero.health_percent());
        self.hud.on_streak(self.hero.streak());
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn hero(&self) -> &Hero {
        &self.hero
    }

    pub fn match_state(&self) -> &MatchState {
        &self.state
    }

    pub fn mode(&self) -> GameMode {
        self.state.mode()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn current_turn(&self) -> TurnId {
        self.turn
    }

    pub fn current_problem(&self) -> Option<&Problem> {
        self.current_problem.as_ref()
    }

    pub fn typed_answer(&self) -> &str {
        self.answer.as_str()
    }

    pub fn hero_animation(&self) -> &AnimationStateMachine {
        &self.hero_anim
    }

    pub fn opponent_animation(&self) -> &AnimationStateMachine {
        &self.opponent_anim
    }

    pub fn last_opponent(&self) -> Option<&OpponentUpdate> {
        self.last_opponent.as_ref()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.stats()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::characters::animation::tests::FrameLog;
    use crate::game::characters::CharacterStats;
    use crate::game::problems::GeneratorError;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Always asks "2 + 2"
    struct AlwaysFour;

    impl ProblemSource for AlwaysFour {
        fn generate(&mut self, _streak: u32) -> Result<Problem, GeneratorError> {
            Ok(Problem {
                display_text: "2 + 2".to_string(),
                expected_answer: 4,
                operation: OperationKind::Addition,
            })
        }
    }

    /// Asks "2 + 2" `limit` times, then fails
    struct RunsDry {
        calls: u32,
        limit: u32,
    }

    impl ProblemSource for RunsDry {
        fn generate(&mut self, streak: u32) -> Result<Problem, GeneratorError> {
            self.calls += 1;
            if self.calls > self.limit {
                return Err(GeneratorError::Unavailable("out of problems".to_string()));
            }
            AlwaysFour.generate(streak)
        }
    }

    struct Broken;

    impl ProblemSource for Broken {
        fn generate(&mut self, _streak: u32) -> Result<Problem, GeneratorError> {
            Err(GeneratorError::Unavailable("offline".to_string()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum HudEvent {
        Problem(TurnId),
        Timer(f32),
        Flash(Flash),
        Damage(u32),
        GameOver(GameOverReport),
        Opponent(RelayAction),
    }

    #[derive(Clone, Default)]
    struct HudLog(Rc<RefCell<Vec<HudEvent>>>);

    impl HudSink for HudLog {
        fn on_problem(&mut self, turn: TurnId, _problem: &Problem) {
            self.0.borrow_mut().push(HudEvent::Problem(turn));
        }
        fn on_timer(&mut self, percent: f32) {
            self.0.borrow_mut().push(HudEvent::Timer(percent));
        }
        fn on_flash(&mut self, flash: Flash) {
            self.0.borrow_mut().push(HudEvent::Flash(flash));
        }
        fn on_damage(&mut self, amount: u32) {
            self.0.borrow_mut().push(HudEvent::Damage(amount));
        }
        fn on_game_over(&mut self, report: &GameOverReport) {
            self.0.borrow_mut().push(HudEvent::GameOver(*report));
        }
        fn on_opponent(&mut self, update: &OpponentUpdate) {
            self.0.borrow_mut().push(HudEvent::Opponent(update.action));
        }
    }

    impl HudLog {
        fn count(&self, pred: impl Fn(&HudEvent) -> bool) -> usize {
            self.0.borrow().iter().filter(|e| pred(e)).count()
        }
    }

    #[derive(Clone, Default)]
    struct RelayLog(Rc<RefCell<Vec<ScoreUpdate>>>);

    impl Relay for RelayLog {
        fn send_score(
            &mut self,
            update: &ScoreUpdate,
        ) -> Result<(), crate::game::relay::RelayError> {
            self.0.borrow_mut().push(update.clone());
            Ok(())
        }
    }

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn config_with_health(max_health: u32) -> GameConfig {
        GameConfig {
            stats: CharacterStats {
                max_health,
                ..CharacterStats::default()
            },
            ..GameConfig::default()
        }
    }

    fn arena(mode: GameMode) -> (CombatLoop, HudLog) {
        arena_with(GameConfig::default(), mode)
    }

    fn arena_with(config: GameConfig, mode: GameMode) -> (CombatLoop, HudLog) {
        let hud = HudLog::default();
        let combat = CombatLoop::new(config, 99)
            .with_mode(mode)
            .with_generator(AlwaysFour)
            .with_hud(hud.clone());
        (combat, hud)
    }

    #[test]
    fn test_start_opens_first_turn() {
        let (mut combat, hud) = arena(GameMode::Solo);
        assert_eq!(combat.phase(), Phase::NotStarted);
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Idle));

        combat.start().unwrap();
        assert_eq!(combat.phase(), Phase::InTurn);
        assert_eq!(combat.current_turn(), TurnId(1));
        assert_eq!(combat.current_problem().unwrap().expected_answer, 4);
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Walk));
        assert_eq!(hud.count(|e| *e == HudEvent::Problem(TurnId(1))), 1);
        // Solo has no clock
        assert_eq!(combat.match_state().remaining_time(), None);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (mut combat, _hud) = arena(GameMode::Solo);
        combat.start().unwrap();
        assert!(matches!(
            combat.start(),
            Err(CombatError::IllegalTransition(_))
        ));
        assert_eq!(combat.current_turn(), TurnId(1));
    }

    #[test]
    fn test_stats_screen_blocks_start() {
        let (mut combat, _hud) = arena(GameMode::Solo);
        combat.open_stats();
        assert!(matches!(
            combat.start(),
            Err(CombatError::IllegalTransition(_))
        ));
        assert_eq!(combat.phase(), Phase::NotStarted);

        combat.close_stats();
        combat.start().unwrap();
        assert_eq!(combat.phase(), Phase::InTurn);
    }

    #[test]
    fn test_stats_screen_abandons_timed_match() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        combat.open_stats();
        assert_eq!(combat.phase(), Phase::NotStarted);
        assert!(combat.update(secs(30)).resolutions.is_empty());
        assert_eq!(combat.hero().current_health(), 100);
    }

    #[test]
    fn test_correct_answer() {
        let (mut combat, hud) = arena(GameMode::Solo);
        combat.start().unwrap();

        let resolution = combat.submit_answer("4").unwrap();
        assert_eq!(resolution.turn, TurnId(1));
        assert_eq!(
            resolution.outcome,
            TurnOutcome::Success {
                streak: 1,
                healed: false
            }
        );
        assert_eq!(resolution.game_over, None);
        assert_eq!(combat.hero().streak(), 1);
        assert_eq!(combat.hero().total_correct(), 1);
        assert!(combat
            .hero_animation()
            .current_clip()
            .is_some_and(|c| c.is_attack()));
        assert_eq!(combat.current_turn(), TurnId(2));
        assert_eq!(hud.count(|e| *e == HudEvent::Flash(Flash::Success)), 1);
        assert_eq!(
            combat.stats().operation(OperationKind::Addition).count,
            1
        );
        assert_eq!(combat.stats().max_streak(GameMode::Solo), 1);
    }

    #[test]
    fn test_wrong_answer() {
        let (mut combat, hud) = arena(GameMode::Solo);
        combat.start().unwrap();
        combat.submit_answer("4").unwrap();

        let resolution = combat.submit_answer("5").unwrap();
        assert_eq!(
            resolution.outcome,
            TurnOutcome::Failure {
                reason: FailureReason::WrongAnswer,
                damage: 15
            }
        );
        assert_eq!(combat.hero().current_health(), 85);
        assert_eq!(combat.hero().streak(), 0);
        assert_eq!(combat.hero().total_correct(), 1);
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Hurt));
        assert_eq!(hud.count(|e| *e == HudEvent::Damage(15)), 1);
    }

    #[test]
    fn test_invalid_input_changes_nothing() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        combat.update(ms(500));

        assert!(matches!(
            combat.submit_answer("four"),
            Err(CombatError::InvalidInput(_))
        ));
        assert!(matches!(
            combat.submit_answer(""),
            Err(CombatError::InvalidInput(_))
        ));
        assert_eq!(combat.current_turn(), TurnId(1));
        assert_eq!(combat.hero().total_attempts(), 0);
        // The countdown kept running
        assert_eq!(combat.match_state().remaining_time(), Some(ms(9_500)));
    }

    #[test]
    fn test_timed_heal_on_tenth_streak() {
        let (mut combat, hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        combat.submit_answer("0").unwrap();
        assert_eq!(combat.hero().current_health(), 85);

        for _ in 0..9 {
            combat.submit_answer("4").unwrap();
        }
        assert_eq!(combat.hero().streak(), 9);
        assert_eq!(combat.hero().current_health(), 85);

        let resolution = combat.submit_answer("4").unwrap();
        assert_eq!(
            resolution.outcome,
            TurnOutcome::Success {
                streak: 10,
                healed: true
            }
        );
        assert_eq!(combat.hero().current_health(), 100);
        assert_eq!(hud.count(|e| *e == HudEvent::Flash(Flash::Heal)), 1);
    }

    #[test]
    fn test_solo_never_heals() {
        let (mut combat, _hud) = arena(GameMode::Solo);
        combat.start().unwrap();
        combat.submit_answer("0").unwrap();
        for _ in 0..10 {
            combat.submit_answer("4").unwrap();
        }
        assert_eq!(combat.hero().streak(), 10);
        assert_eq!(combat.hero().current_health(), 85);
    }

    #[test]
    fn test_turn_budget_follows_streak() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        assert_eq!(combat.match_state().max_time_for_turn(), Some(secs(10)));

        for _ in 0..25 {
            combat.submit_answer("4").unwrap();
        }
        assert_eq!(combat.match_state().max_time_for_turn(), Some(secs(8)));
    }

    #[test]
    fn test_timeout_resolves_turn_once() {
        let (mut combat, hud) = arena(GameMode::Timed);
        combat.start().unwrap();

        assert!(combat.update(ms(9_999)).resolutions.is_empty());
        let resolutions = combat.update(ms(1)).resolutions;
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].turn, TurnId(1));
        assert_eq!(
            resolutions[0].outcome,
            TurnOutcome::Failure {
                reason: FailureReason::Timeout,
                damage: 15
            }
        );
        assert_eq!(combat.hero().current_health(), 85);
        assert_eq!(combat.current_turn(), TurnId(2));
        assert_eq!(combat.match_state().remaining_time(), Some(secs(10)));
        assert_eq!(hud.count(|e| *e == HudEvent::Damage(15)), 1);
    }

    #[test]
    fn test_answer_after_timeout_is_stale() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        let first_turn = combat.current_turn();

        combat.update(secs(10));
        let result = combat.submit_answer_for(first_turn, "4");
        assert!(matches!(result, Err(CombatError::IllegalTransition(_))));
        assert_eq!(combat.hero().streak(), 0);
        assert_eq!(combat.hero().total_attempts(), 1);

        // The new turn still takes answers
        let current = combat.current_turn();
        assert!(combat.submit_answer_for(current, "4").is_ok());
    }

    #[test]
    fn test_manual_answer_cancels_countdown() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        combat.update(ms(9_900));
        combat.submit_answer("4").unwrap();

        assert_eq!(combat.match_state().remaining_time(), Some(secs(10)));
        assert!(combat.update(ms(200)).resolutions.is_empty());
        assert_eq!(combat.hero().current_health(), 100);
    }

    #[test]
    fn test_mode_switch_cancels_countdown() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        combat.update(secs(5));

        combat.set_mode(GameMode::Solo);
        assert_eq!(combat.phase(), Phase::NotStarted);
        assert_eq!(combat.match_state().remaining_time(), None);
        assert!(combat.update(secs(30)).resolutions.is_empty());
        assert_eq!(combat.hero().current_health(), 100);
        assert!(matches!(
            combat.submit_answer("4"),
            Err(CombatError::IllegalTransition(_))
        ));
    }

    #[test]
    fn test_fatal_wrong_answer_ends_match() {
        let (mut combat, hud) = arena_with(config_with_health(10), GameMode::Solo);
        combat.start().unwrap();

        let resolution = combat.submit_answer("3").unwrap();
        assert!(combat.hero().is_dead());
        let report = resolution.game_over.unwrap();
        assert_eq!(report.score, 0);
        assert!(!report.new_record);
        assert_eq!(combat.phase(), Phase::GameOver);
        assert!(combat.current_problem().is_none());
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Death));
        assert_eq!(hud.count(|e| matches!(e, HudEvent::GameOver(_))), 1);

        assert!(matches!(
            combat.submit_answer("4"),
            Err(CombatError::IllegalTransition(_))
        ));
        assert!(matches!(
            combat.next_turn(),
            Err(CombatError::IllegalTransition(_))
        ));
    }

    #[test]
    fn test_high_score_per_match() {
        let (mut combat, _hud) = arena_with(config_with_health(15), GameMode::Solo);
        combat.start().unwrap();
        combat.submit_answer("4").unwrap();
        combat.submit_answer("4").unwrap();
        let report = combat.submit_answer("1").unwrap().game_over.unwrap();
        assert_eq!(report.score, 2);
        assert!(report.new_record);
        assert_eq!(report.high_score, 2);

        combat.start().unwrap();
        combat.submit_answer("4").unwrap();
        let report = combat.submit_answer("1").unwrap().game_over.unwrap();
        assert_eq!(report.score, 1);
        assert!(!report.new_record);
        assert_eq!(report.high_score, 2);
    }

    #[test]
    fn test_timeouts_can_end_match() {
        let (mut combat, _hud) = arena_with(config_with_health(30), GameMode::Timed);
        combat.start().unwrap();

        let resolutions = combat.update(secs(25)).resolutions;
        assert_eq!(resolutions.len(), 2);
        assert!(resolutions[0].game_over.is_none());
        assert!(resolutions[1].game_over.is_some());
        assert_eq!(combat.phase(), Phase::GameOver);
        assert!(combat.match_state().countdown().is_none());
        assert!(combat.update(secs(30)).resolutions.is_empty());
    }

    #[test]
    fn test_zero_second_budget_still_times_out() {
        let mut config = GameConfig::default();
        config.timer.base_secs = 0;
        config.timer.min_secs = 0;
        let (mut combat, _hud) = arena_with(config, GameMode::Timed);
        combat.start().unwrap();
        assert_eq!(combat.match_state().max_time_for_turn(), Some(ms(100)));

        let resolutions = combat.update(ms(100)).resolutions;
        assert_eq!(resolutions.len(), 1);
        assert_eq!(
            resolutions[0].outcome,
            TurnOutcome::Failure {
                reason: FailureReason::Timeout,
                damage: 15
            }
        );
        assert_eq!(combat.hero().current_health(), 85);
    }

    #[test]
    fn test_timeouts_kept_when_generator_fails() {
        let mut combat = CombatLoop::new(GameConfig::default(), 3)
            .with_mode(GameMode::Timed)
            .with_generator(RunsDry { calls: 0, limit: 2 });
        combat.start().unwrap();

        let report = combat.update(secs(25));
        assert_eq!(report.resolutions.len(), 2);
        assert_eq!(report.resolutions[0].turn, TurnId(1));
        assert_eq!(report.resolutions[1].turn, TurnId(2));
        assert!(matches!(
            report.error,
            Some(CombatError::GeneratorFailure(_))
        ));
        assert_eq!(combat.hero().current_health(), 70);
        assert_eq!(combat.phase(), Phase::NotStarted);
        assert!(combat.match_state().countdown().is_none());
        // The time after the failure still played out HURT
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Walk));
    }

    #[test]
    fn test_restart_after_death() {
        let (mut combat, _hud) = arena_with(config_with_health(10), GameMode::Solo);
        combat.start().unwrap();
        combat.submit_answer("0").unwrap();
        assert!(combat.hero_animation().is_locked());

        combat.start().unwrap();
        assert_eq!(combat.hero().current_health(), 10);
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Walk));
        assert_eq!(combat.phase(), Phase::InTurn);
    }

    #[test]
    fn test_attack_returns_to_walk() {
        let (mut combat, _hud) = arena(GameMode::Solo);
        combat.start().unwrap();
        combat.submit_answer("4").unwrap();
        // Longest knight attack is 900ms
        combat.update(secs(1));
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Walk));
    }

    #[test]
    fn test_hero_frames_follow_match() {
        let frames = FrameLog::default();
        let mut combat = CombatLoop::new(config_with_health(15), 5)
            .with_generator(AlwaysFour)
            .with_hero_frames(frames.clone());
        assert_eq!(frames.starts_of(ClipName::Idle), 1);

        combat.start().unwrap();
        combat.submit_answer("9").unwrap();
        assert_eq!(frames.starts_of(ClipName::Walk), 1);
        assert_eq!(frames.starts_of(ClipName::Hurt), 1);
        assert_eq!(frames.starts_of(ClipName::Death), 1);

        // DEATH holds its last frame and ignores the clock
        combat.update(secs(5));
        let last = frames.0.borrow().last().copied();
        assert_eq!(last, Some((ClipName::Death, 3, true)));
        assert!(!combat.hero_animation().has_pending_tick());
    }

    #[test]
    fn test_timed_auto_validation() {
        let (mut combat, _hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        let resolution = combat.type_char('4').unwrap();
        assert!(matches!(
            resolution,
            Some(Resolution {
                outcome: TurnOutcome::Success { .. },
                ..
            })
        ));
        assert_eq!(combat.typed_answer(), "");
    }

    #[test]
    fn test_solo_needs_enter() {
        let (mut combat, _hud) = arena(GameMode::Solo);
        combat.start().unwrap();
        assert_eq!(combat.type_char('4').unwrap(), None);
        assert_eq!(combat.typed_answer(), "4");
        assert!(matches!(
            combat.type_char('x'),
            Err(CombatError::InvalidInput(_))
        ));

        let resolution = combat.submit_buffer().unwrap();
        assert!(matches!(resolution.outcome, TurnOutcome::Success { .. }));
        assert_eq!(combat.typed_answer(), "");
    }

    #[test]
    fn test_generator_failure_aborts_match() {
        let mut combat = CombatLoop::new(GameConfig::default(), 1).with_generator(Broken);
        assert!(matches!(
            combat.start(),
            Err(CombatError::GeneratorFailure(_))
        ));
        assert_eq!(combat.phase(), Phase::NotStarted);
        assert!(combat.current_problem().is_none());
    }

    #[test]
    fn test_multiplayer_relays_score() {
        let relay = RelayLog::default();
        let (combat, _hud) = arena(GameMode::Multiplayer);
        let mut combat = combat.with_relay(relay.clone());
        combat.join_room("room-1");
        combat.start().unwrap();

        combat.submit_answer("4").unwrap();
        combat.submit_answer("7").unwrap();

        let sent = relay.0.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            ScoreUpdate {
                room_id: "room-1".to_string(),
                score: 1,
                action: RelayAction::Success
            }
        );
        assert_eq!(sent[1].action, RelayAction::Failure);
        assert_eq!(sent[1].score, 1);
    }

    #[test]
    fn test_multiplayer_relays_game_over() {
        let relay = RelayLog::default();
        let (combat, _hud) = arena_with(config_with_health(10), GameMode::Multiplayer);
        let mut combat = combat.with_relay(relay.clone());
        combat.join_room("r");
        combat.start().unwrap();
        combat.submit_answer("1").unwrap();

        let actions: Vec<RelayAction> = relay.0.borrow().iter().map(|u| u.action).collect();
        assert_eq!(actions, vec![RelayAction::Failure, RelayAction::GameOver]);
    }

    #[test]
    fn test_single_player_does_not_relay() {
        let relay = RelayLog::default();
        let (combat, _hud) = arena(GameMode::Solo);
        let mut combat = combat.with_relay(relay.clone());
        combat.join_room("room-1");
        combat.start().unwrap();
        combat.submit_answer("4").unwrap();
        assert!(relay.0.borrow().is_empty());
    }

    #[test]
    fn test_opponent_updates_drive_opponent_animation() {
        let (mut combat, hud) = arena(GameMode::Multiplayer);
        let update = |action| OpponentUpdate {
            username: "rival".to_string(),
            score: 3,
            action,
        };

        combat.receive_opponent(update(RelayAction::Failure));
        assert_eq!(
            combat.opponent_animation().current_clip(),
            Some(ClipName::Hurt)
        );

        combat.receive_opponent(update(RelayAction::GameOver));
        assert_eq!(
            combat.opponent_animation().current_clip(),
            Some(ClipName::Death)
        );

        combat.receive_opponent(update(RelayAction::Success));
        assert_eq!(
            combat.opponent_animation().current_clip(),
            Some(ClipName::Death)
        );
        assert_eq!(combat.last_opponent().unwrap().score, 3);
        assert_eq!(hud.count(|e| matches!(e, HudEvent::Opponent(_))), 3);
        // The hero is untouched
        assert_eq!(combat.hero_animation().current_clip(), Some(ClipName::Idle));
    }

    #[test]
    fn test_timer_updates_reach_hud() {
        let (mut combat, hud) = arena(GameMode::Timed);
        combat.start().unwrap();
        combat.update(secs(1));
        // One reset to full at turn start, then one per 100ms tick
        assert_eq!(hud.count(|e| matches!(e, HudEvent::Timer(_))), 11);
        let last = hud.0.borrow().last().cloned();
        let Some(HudEvent::Timer(percent)) = last else {
            panic!("expected a timer update last, got {:?}", last);
        };
        assert_relative_eq!(percent, 90.0, epsilon = 1e-3);
    }
}
