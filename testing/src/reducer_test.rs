//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable
//! Given-When-Then syntax, plus a harness for scenarios that only emerge
//! over many steps (lock countdowns, polling rounds).

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use moihub_core::{SmallVec, effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use moihub_testing::ReducerTest;
///
/// ReducerTest::new(SeatReducer::default())
///     .with_env(test_environment())
///     .given_state(BookingState::default())
///     .when_action(BookingAction::ToggleSeat { seat_number: "12".into() })
///     .then_state(|state| {
///         assert!(state.selection.is_some());
///     })
///     .then_effects(|effects| {
///         assert_eq!(effects.len(), 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    S: Clone,
    A: Clone,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        // Execute reducer
        let effects = self.reducer.reduce(&mut state, action, &env);

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Drives a reducer through a sequence of actions without a Store
///
/// Where [`ReducerTest`] checks a single transition, `ReducerHarness`
/// is for behavior that only emerges over many synchronous steps, like
/// walking a 300-tick seat-lock countdown to expiry or counting
/// consecutive polling failures up to the ceiling.
///
/// Effects are returned to the caller, never executed. To model the
/// feedback loop deterministically, feed an effect's action back with
/// another [`send`](Self::send).
///
/// # Example
///
/// ```ignore
/// let mut harness = ReducerHarness::new(reducer, state, env);
///
/// harness.send(BookingAction::SeatLocked { seat_number: "12".into() });
/// for _ in 0..300 {
///     harness.send(BookingAction::LockCountdownTicked { seq: 1 });
/// }
///
/// assert!(harness.state().selection.is_none());
/// ```
pub struct ReducerHarness<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    state: S,
    environment: E,
}

impl<R, S, A, E> ReducerHarness<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new harness with the given reducer, state, and environment
    #[must_use]
    pub const fn new(reducer: R, initial_state: S, environment: E) -> Self {
        Self {
            reducer,
            state: initial_state,
            environment,
        }
    }

    /// Run one action through the reducer and return the effects it produced
    pub fn send(&mut self, action: A) -> SmallVec<[Effect<A>; 4]> {
        self.reducer
            .reduce(&mut self.state, action, &self.environment)
    }

    /// Current state after all actions sent so far
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// The environment the harness reduces against
    ///
    /// Useful for inspecting mock recorders after a scenario.
    #[must_use]
    pub const fn environment(&self) -> &E {
        &self.environment
    }

    /// Consume the harness and return the final state
    #[must_use]
    pub fn into_state(self) -> S {
        self.state
    }
}

/// Helper assertions for effects
pub mod assertions {
    use moihub_core::effect::Effect;
    use std::time::Duration;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain at least one Delay effect
    ///
    /// Countdowns and polling intervals surface as `Effect::Delay`, so
    /// this is the assertion that a timer chain keeps itself alive.
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Delay { .. })),
            "Expected at least one Delay effect, but none found"
        );
    }

    /// Collect the durations of all top-level Delay effects
    ///
    /// Lets a test pin an interval exactly:
    ///
    /// ```ignore
    /// let effects = harness.send(BookingAction::PaymentInitiated { payment_id });
    /// assert_eq!(delay_durations(&effects), vec![Duration::from_secs(6)]);
    /// ```
    #[must_use]
    pub fn delay_durations<A>(effects: &[Effect<A>]) -> Vec<Duration> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Delay { duration, .. } => Some(*duration),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moihub_core::effect::Effect;
    use moihub_core::reducer::Reducer;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct CountdownState {
        remaining: u32,
        expired: bool,
    }

    #[derive(Clone, Debug)]
    enum CountdownAction {
        Arm { secs: u32 },
        Tick,
    }

    struct CountdownReducer;

    struct NoEnv;

    impl Reducer for CountdownReducer {
        type State = CountdownState;
        type Action = CountdownAction;
        type Environment = NoEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CountdownAction::Arm { secs } => {
                    state.remaining = secs;
                    state.expired = false;
                    moihub_core::smallvec![Effect::delay(
                        Duration::from_secs(1),
                        CountdownAction::Tick
                    )]
                },
                CountdownAction::Tick => {
                    if state.remaining == 0 {
                        return moihub_core::smallvec![Effect::None];
                    }
                    state.remaining -= 1;
                    if state.remaining == 0 {
                        state.expired = true;
                        moihub_core::smallvec![Effect::None]
                    } else {
                        moihub_core::smallvec![Effect::delay(
                            Duration::from_secs(1),
                            CountdownAction::Tick
                        )]
                    }
                },
            }
        }
    }

    #[test]
    fn test_reducer_test_arm() {
        ReducerTest::new(CountdownReducer)
            .with_env(NoEnv)
            .given_state(CountdownState {
                remaining: 0,
                expired: false,
            })
            .when_action(CountdownAction::Arm { secs: 300 })
            .then_state(|state| {
                assert_eq!(state.remaining, 300);
            })
            .then_effects(|effects| {
                assertions::assert_has_delay_effect(effects);
                assert_eq!(
                    assertions::delay_durations(effects),
                    vec![Duration::from_secs(1)]
                );
            })
            .run();
    }

    #[test]
    fn test_reducer_test_final_tick() {
        ReducerTest::new(CountdownReducer)
            .with_env(NoEnv)
            .given_state(CountdownState {
                remaining: 1,
                expired: false,
            })
            .when_action(CountdownAction::Tick)
            .then_state(|state| {
                assert!(state.expired);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_harness_walks_countdown_to_expiry() {
        let mut harness = ReducerHarness::new(
            CountdownReducer,
            CountdownState {
                remaining: 0,
                expired: false,
            },
            NoEnv,
        );

        harness.send(CountdownAction::Arm { secs: 3 });
        for _ in 0..2 {
            let effects = harness.send(CountdownAction::Tick);
            // Chain stays alive until the countdown reaches zero
            assertions::assert_has_delay_effect(&effects);
        }

        let effects = harness.send(CountdownAction::Tick);
        assertions::assert_no_effects(&effects);
        assert!(harness.state().expired);
        assert_eq!(harness.into_state().remaining, 0);
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<CountdownAction>(&[Effect::None]);
        assertions::assert_no_effects::<CountdownAction>(&[]);
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<CountdownAction>::None], 1);
        assertions::assert_effects_count::<CountdownAction>(&[], 0);
    }
}
