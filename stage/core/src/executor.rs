//! Action Executor
//!
//! Applies one catalog verb to a character state and reports how the step
//! must be paced. The executor never sleeps and never touches the stage; the
//! runner owns timing and the stage owns the state.

use std::time::Duration;

use rand::RngCore;

use crate::actions::{ActionVerb, EffectContext, StepTiming};
use crate::character::CharacterState;
use crate::playback::PlaybackConfig;

/// Result of applying one step
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    /// State after the step
    pub state: CharacterState,
    /// Pause before the next step may begin
    pub step_delay: Duration,
    /// When set, the message is cleared after this long (before `step_delay` starts)
    pub clear_after: Option<Duration>,
}

/// Applies verbs using the configured timing
#[derive(Clone, Debug)]
pub struct ActionExecutor {
    step_delay: Duration,
    transient_message_duration: Duration,
    random_extent: f64,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::from_config(&PlaybackConfig::default())
    }
}

impl ActionExecutor {
    /// Build an executor from playback configuration
    #[must_use]
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            step_delay: config.step_delay,
            transient_message_duration: config.transient_message_duration,
            random_extent: config.random_extent,
        }
    }

    /// Apply a verb to a copy of `state`
    ///
    /// `Repeat` is accepted and leaves the state untouched with no pacing;
    /// expanding it is the runner's job.
    pub fn apply<R: RngCore>(
        &self,
        verb: ActionVerb,
        state: &CharacterState,
        rng: &mut R,
    ) -> StepOutcome {
        let entry = verb.entry();
        let mut next = state.clone();
        let mut ctx = EffectContext {
            rng,
            random_extent: self.random_extent,
        };
        (entry.effect)(&mut next, &mut ctx);

        let (step_delay, clear_after) = match entry.timing {
            StepTiming::Standard => (self.step_delay, None),
            StepTiming::TransientMessage => {
                (self.step_delay, Some(self.transient_message_duration))
            }
            StepTiming::Control => (Duration::ZERO, None),
        };

        StepOutcome {
            state: next,
            step_delay,
            clear_after,
        }
    }

    /// Outcome for a token the catalog does not know: no change, normal pacing
    #[must_use]
    pub fn skip(&self, state: &CharacterState) -> StepOutcome {
        StepOutcome {
            state: state.clone(),
            step_delay: self.step_delay,
            clear_after: None,
        }
    }

    /// Configured inter-step delay
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Position, MIN_SIZE};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(verbs: &[ActionVerb]) -> CharacterState {
        let executor = ActionExecutor::default();
        let mut rng = StdRng::seed_from_u64(7);
        verbs.iter().fold(CharacterState::default(), |state, verb| {
            executor.apply(*verb, &state, &mut rng).state
        })
    }

    #[test]
    fn test_moves() {
        assert_eq!(run(&[ActionVerb::MoveX]).position, Position::new(50.0, 0.0));
        assert_eq!(run(&[ActionVerb::MoveY]).position, Position::new(0.0, 50.0));
        assert_eq!(run(&[ActionVerb::MoveXY]).position, Position::new(50.0, 50.0));
        assert_eq!(
            run(&[ActionVerb::MoveX, ActionVerb::MoveX]).position,
            Position::new(100.0, 0.0)
        );
    }

    #[test]
    fn test_go_to_origin_idempotent() {
        let state = run(&[
            ActionVerb::MoveXY,
            ActionVerb::GoToOrigin,
            ActionVerb::GoToOrigin,
        ]);
        assert_eq!(state.position, Position::ORIGIN);
    }

    #[test]
    fn test_random_position_in_bounds() {
        let executor = ActionExecutor::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut state = CharacterState::default();
        for _ in 0..1000 {
            state = executor.apply(ActionVerb::GoToRandom, &state, &mut rng).state;
            assert!((0.0..200.0).contains(&state.position.x));
            assert!((0.0..200.0).contains(&state.position.y));
        }
    }

    #[test]
    fn test_random_extent_from_config() {
        let config = PlaybackConfig {
            random_extent: 10.0,
            ..Default::default()
        };
        let executor = ActionExecutor::from_config(&config);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let state = executor
                .apply(ActionVerb::GoToRandom, &CharacterState::default(), &mut rng)
                .state;
            assert!(state.position.x < 10.0 && state.position.y < 10.0);
        }
    }

    #[test]
    fn test_size_never_below_min() {
        let mut verbs = vec![ActionVerb::IncreaseSize; 3];
        verbs.extend(vec![ActionVerb::DecreaseSize; 20]);
        verbs.push(ActionVerb::IncreaseSize);
        verbs.extend(vec![ActionVerb::DecreaseSize; 2]);

        let executor = ActionExecutor::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = CharacterState::default();
        for verb in verbs {
            state = executor.apply(verb, &state, &mut rng).state;
            assert!(state.size >= MIN_SIZE);
        }
        assert_eq!(state.size, MIN_SIZE);
    }

    #[test]
    fn test_rotation() {
        assert_eq!(run(&[ActionVerb::Rotate180]).rotation, 180.0);
        assert_eq!(run(&[ActionVerb::Rotate360]).rotation, 0.0);
        assert_eq!(
            run(&[ActionVerb::Rotate180, ActionVerb::Rotate360]).rotation,
            180.0
        );
    }

    #[test]
    fn test_say_hello_timing() {
        let executor = ActionExecutor::default();
        let mut rng = StdRng::seed_from_u64(0);
        let state = CharacterState::default();

        let plain = executor.apply(ActionVerb::SayHello, &state, &mut rng);
        assert_eq!(plain.state.message, "Hello");
        assert_eq!(plain.clear_after, None);
        assert_eq!(plain.step_delay, Duration::from_millis(500));

        let brief = executor.apply(ActionVerb::SayHelloBriefly, &state, &mut rng);
        assert_eq!(brief.state.message, "Hello");
        assert_eq!(brief.clear_after, Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_repeat_and_skip_leave_state() {
        let executor = ActionExecutor::default();
        let mut rng = StdRng::seed_from_u64(0);
        let state = run(&[ActionVerb::MoveX, ActionVerb::SayHello]);

        let repeat = executor.apply(ActionVerb::Repeat, &state, &mut rng);
        assert_eq!(repeat.state, state);
        assert_eq!(repeat.step_delay, Duration::ZERO);

        let skipped = executor.skip(&state);
        assert_eq!(skipped.state, state);
        assert_eq!(skipped.step_delay, executor.step_delay());
    }
}
