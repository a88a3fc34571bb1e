use crate::config::Config;
use crate::generator;
use crate::TICK_RATE_MS;
use rand::Rng;

/// Observable phase of the round state machine. Finishing a round is
/// transient: scoring is applied and the engine is back in `Idle` before
/// the operation that finished it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Memorizing,
    AwaitingInput,
}

/// Result of a finished round, reported exactly once per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub won: bool,
    pub score: u64,
    pub high_score: u64,
    /// whether this round raised the high score; persisting it is the
    /// caller's explicit action
    pub high_score_beaten: bool,
}

/// The round/timer state machine. All operations must run on a single
/// thread of control; ticks and user submissions interleave on one event
/// queue, so whichever reaches the engine first finishes the round and
/// the other becomes a no-op.
#[derive(Debug)]
pub struct RoundEngine {
    phase: Phase,
    answer: Option<String>,
    memorize_ms_remaining: f64,
    seconds_remaining: Option<f64>,
    timeout_secs: i64,
    score: u64,
    high_score: u64,
}

impl RoundEngine {
    pub fn new(high_score: u64) -> Self {
        Self {
            phase: Phase::Idle,
            answer: None,
            memorize_ms_remaining: 0.0,
            seconds_remaining: None,
            timeout_secs: 0,
            score: 0,
            high_score,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The generated answer, present while a round is active.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    /// Whole seconds left on the input countdown, for display. `None`
    /// outside the input phase and when the timeout policy is disabled.
    pub fn seconds_remaining(&self) -> Option<u64> {
        self.seconds_remaining.map(|secs| secs.max(0.0).ceil() as u64)
    }

    /// Begins a round: generates the answer and snapshots the timing
    /// policy, so configuration edits never touch a running round.
    /// Returns false without side effects when a round is already active.
    pub fn start_round<R: Rng>(&mut self, config: &Config, rng: &mut R) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }

        self.answer = Some(generator::generate(config, rng));
        self.timeout_secs = config.timeout;
        self.memorize_ms_remaining = config.time_to_memorize as f64;

        if config.time_to_memorize == 0 {
            self.begin_input();
        } else {
            self.phase = Phase::Memorizing;
        }
        true
    }

    fn begin_input(&mut self) {
        self.phase = Phase::AwaitingInput;
        self.seconds_remaining = (self.timeout_secs > 0).then(|| self.timeout_secs as f64);
    }

    /// Advances the round timers by one tick. Returns the outcome when
    /// the input countdown expires, which counts as a failed submission.
    pub fn on_tick(&mut self) -> Option<RoundOutcome> {
        match self.phase {
            Phase::Idle => None,
            Phase::Memorizing => {
                self.memorize_ms_remaining -= TICK_RATE_MS as f64;
                if self.memorize_ms_remaining <= 0.0 {
                    self.begin_input();
                }
                None
            }
            Phase::AwaitingInput => {
                let secs = self.seconds_remaining.as_mut()?;
                *secs -= TICK_RATE_MS as f64 / 1000.0;
                if *secs <= 0.0 {
                    return Some(self.finish(false));
                }
                None
            }
        }
    }

    /// Evaluates a submission against the answer. A call outside the
    /// input phase (no active round, memorize phase, or a countdown that
    /// already expired) is a no-op.
    pub fn submit(&mut self, value: &str) -> Option<RoundOutcome> {
        if self.phase != Phase::AwaitingInput {
            return None;
        }
        let won = self.answer.as_deref() == Some(value.trim());
        Some(self.finish(won))
    }

    fn finish(&mut self, won: bool) -> RoundOutcome {
        self.phase = Phase::Idle;
        self.answer = None;
        self.seconds_remaining = None;

        let mut high_score_beaten = false;
        if won {
            self.score += 1;
            if self.score > self.high_score {
                self.high_score = self.score;
                high_score_beaten = true;
            }
        } else {
            self.score = 0;
        }

        RoundOutcome {
            won,
            score: self.score,
            high_score: self.high_score,
            high_score_beaten,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn config() -> Config {
        Config {
            time_to_memorize: 1000,
            timeout: 1,
            length: 4,
            ..Config::default()
        }
    }

    /// Ticks covering `ms` milliseconds of wall time.
    fn ticks_for_ms(ms: u64) -> u64 {
        ms.div_ceil(TICK_RATE_MS)
    }

    #[test]
    fn new_engine_is_idle() {
        let engine = RoundEngine::new(3);
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.answer(), None);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.high_score(), 3);
        assert_eq!(engine.seconds_remaining(), None);
    }

    #[test]
    fn start_round_enters_memorize_phase() {
        let mut engine = RoundEngine::new(0);
        assert!(engine.start_round(&config(), &mut rng()));

        assert_eq!(engine.phase(), Phase::Memorizing);
        let answer = engine.answer().unwrap();
        assert_eq!(answer.len(), 4);
        assert!(answer.chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn second_start_is_a_no_op() {
        let mut engine = RoundEngine::new(0);
        let mut rng = rng();
        assert!(engine.start_round(&config(), &mut rng));
        let answer = engine.answer().unwrap().to_string();

        assert!(!engine.start_round(&config(), &mut rng));
        assert_eq!(engine.answer(), Some(answer.as_str()));
        assert_eq!(engine.phase(), Phase::Memorizing);
    }

    #[test]
    fn zero_memorize_time_skips_straight_to_input() {
        let mut engine = RoundEngine::new(0);
        let config = Config {
            time_to_memorize: 0,
            ..config()
        };

        assert!(engine.start_round(&config, &mut rng()));
        assert_eq!(engine.phase(), Phase::AwaitingInput);
        assert_eq!(engine.seconds_remaining(), Some(1));
    }

    #[test]
    fn memorize_timer_elapses_into_input_phase() {
        let mut engine = RoundEngine::new(0);
        engine.start_round(&config(), &mut rng());

        for _ in 0..ticks_for_ms(1000) - 1 {
            assert_eq!(engine.on_tick(), None);
            assert_eq!(engine.phase(), Phase::Memorizing);
        }
        assert_eq!(engine.on_tick(), None);
        assert_eq!(engine.phase(), Phase::AwaitingInput);
        assert_eq!(engine.seconds_remaining(), Some(1));
    }

    #[test]
    fn countdown_expiry_is_a_loss() {
        let mut engine = RoundEngine::new(0);
        let config = Config {
            time_to_memorize: 0,
            timeout: 1,
            ..config()
        };
        engine.start_round(&config, &mut rng());

        let mut outcome = None;
        for _ in 0..=ticks_for_ms(1000) {
            outcome = engine.on_tick();
            if outcome.is_some() {
                break;
            }
        }

        let outcome = outcome.expect("countdown should have expired");
        assert!(!outcome.won);
        assert_eq!(outcome.score, 0);
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.answer(), None);
        assert_eq!(engine.seconds_remaining(), None);
    }

    #[test]
    fn correct_submission_wins_and_raises_high_score() {
        let mut engine = RoundEngine::new(0);
        let config = Config {
            time_to_memorize: 0,
            ..config()
        };
        engine.start_round(&config, &mut rng());
        let answer = engine.answer().unwrap().to_string();

        let outcome = engine.submit(&answer).unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.high_score, 1);
        assert!(outcome.high_score_beaten);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn submission_is_trimmed_before_comparison() {
        let mut engine = RoundEngine::new(0);
        let config = Config {
            time_to_memorize: 0,
            ..config()
        };
        engine.start_round(&config, &mut rng());
        let answer = engine.answer().unwrap().to_string();

        let outcome = engine.submit(&format!("  {answer} ")).unwrap();
        assert!(outcome.won);
    }

    #[test]
    fn wrong_submission_resets_score() {
        let mut engine = RoundEngine::new(5);
        let config = Config {
            time_to_memorize: 0,
            ..config()
        };

        engine.start_round(&config, &mut rng());
        let answer = engine.answer().unwrap().to_string();
        engine.submit(&answer).unwrap();
        assert_eq!(engine.score(), 1);

        engine.start_round(&config, &mut rng());
        let outcome = engine.submit("definitely wrong").unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.score, 0);
        // the high score survives a loss
        assert_eq!(outcome.high_score, 5);
    }

    #[test]
    fn winning_streak_accumulates() {
        let mut engine = RoundEngine::new(1);
        let config = Config {
            time_to_memorize: 0,
            ..config()
        };
        let mut rng = rng();

        for expected in 1..=3u64 {
            engine.start_round(&config, &mut rng);
            let answer = engine.answer().unwrap().to_string();
            let outcome = engine.submit(&answer).unwrap();
            assert_eq!(outcome.score, expected);
        }
        assert_eq!(engine.high_score(), 3);
    }

    #[test]
    fn submit_without_active_round_is_a_no_op() {
        let mut engine = RoundEngine::new(0);
        assert_eq!(engine.submit("0000"), None);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn submit_during_memorize_phase_is_a_no_op() {
        let mut engine = RoundEngine::new(0);
        engine.start_round(&config(), &mut rng());
        assert_eq!(engine.submit("0000"), None);
        assert_eq!(engine.phase(), Phase::Memorizing);
    }

    #[test]
    fn stray_submit_after_expiry_cannot_win() {
        let mut engine = RoundEngine::new(0);
        let config = Config {
            time_to_memorize: 0,
            timeout: 1,
            ..config()
        };
        engine.start_round(&config, &mut rng());
        let answer = engine.answer().unwrap().to_string();

        let mut expiry = None;
        for _ in 0..=ticks_for_ms(1000) {
            expiry = engine.on_tick();
            if expiry.is_some() {
                break;
            }
        }
        assert!(!expiry.expect("countdown should have expired").won);

        // the user's submit raced the timer and lost
        assert_eq!(engine.submit(&answer), None);
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn non_positive_timeout_disables_the_countdown() {
        let mut engine = RoundEngine::new(0);
        let config = Config {
            time_to_memorize: 0,
            timeout: 0,
            ..config()
        };
        engine.start_round(&config, &mut rng());

        assert_eq!(engine.seconds_remaining(), None);
        for _ in 0..ticks_for_ms(60_000) {
            assert_eq!(engine.on_tick(), None);
        }
        assert_eq!(engine.phase(), Phase::AwaitingInput);

        let answer = engine.answer().unwrap().to_string();
        assert!(engine.submit(&answer).unwrap().won);
    }

    #[test]
    fn config_changes_do_not_touch_a_running_round() {
        let mut engine = RoundEngine::new(0);
        let mut rng = rng();
        engine.start_round(&config(), &mut rng);
        let answer = engine.answer().unwrap().to_string();

        // the caller's configuration changes mid-round; the engine holds
        // its snapshot
        let _edited = Config {
            time_to_memorize: 50,
            timeout: 0,
            length: 2,
            ..Config::default()
        };

        for _ in 0..ticks_for_ms(1000) {
            engine.on_tick();
        }
        assert_eq!(engine.phase(), Phase::AwaitingInput);
        assert_eq!(engine.answer(), Some(answer.as_str()));
        assert_eq!(engine.seconds_remaining(), Some(1));
    }
}
