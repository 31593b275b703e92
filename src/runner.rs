//! Episode execution: drive the environment with a policy and record what happened

use log::trace;

use crate::{
    env::Environment,
    error::{Error, Result},
};

/// Default hard cap on the number of steps in one episode
pub const MAX_EPISODE_STEPS: usize = 1000;

/// Anything that maps a state to an action index
pub trait Policy<S> {
    fn act(&mut self, state: &S) -> Result<usize>;
}

/// One `(state, action, reward, next_state, done)` tuple
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub state: S,
    pub action: usize,
    pub reward: f32,
    pub next_state: S,
    pub done: bool,
}

/// Everything recorded during a single episode
#[derive(Debug, Clone)]
pub struct Episode<S> {
    pub transitions: Vec<Transition<S>>,
    pub total_reward: f32,
    /// The step cap ended the episode before the environment did
    pub truncated: bool,
}

impl<S> Episode<S> {
    pub fn steps(&self) -> usize {
        self.transitions.len()
    }
}

/// Run one episode from `reset` until `done` or `max_steps` steps
///
/// Rendering, when enabled, happens before every action.
pub fn run_episode<E, P>(
    env: &mut E,
    policy: &mut P,
    max_steps: usize,
    render: bool,
) -> Result<Episode<E::State>>
where
    E: Environment,
    P: Policy<E::State>,
{
    let mut state = env.reset()?;
    let mut transitions = Vec::new();
    let mut total_reward = 0.0;
    let mut done = false;

    while !done && transitions.len() < max_steps {
        if render {
            env.render()?;
        }

        let action = policy.act(&state)?;
        let env_action = <E::Action as TryFrom<usize>>::try_from(action)
            .map_err(|_| Error::InvalidAction(action))?;
        let step = env.step(env_action)?;

        total_reward += step.reward;
        done = step.done;

        let next_state = step.state;
        let previous = std::mem::replace(&mut state, next_state.clone());
        transitions.push(Transition {
            state: previous,
            action,
            reward: step.reward,
            next_state,
            done,
        });
    }

    trace!(
        "episode finished after {} steps, reward {:.2}",
        transitions.len(),
        total_reward
    );

    Ok(Episode {
        transitions,
        total_reward,
        truncated: !done,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::env::Step;

    /// Counts steps and never finishes on its own
    pub struct EndlessEnv {
        pub steps: usize,
        pub renders: usize,
    }

    impl Environment for EndlessEnv {
        type State = [f32; 8];
        type Action = usize;

        fn reset(&mut self) -> Result<Self::State> {
            self.steps = 0;
            Ok([0.0; 8])
        }

        fn step(&mut self, _action: usize) -> Result<Step<Self::State>> {
            self.steps += 1;
            Ok(Step {
                state: [self.steps as f32; 8],
                reward: -0.5,
                done: false,
            })
        }

        fn render(&mut self) -> Result<()> {
            self.renders += 1;
            Ok(())
        }
    }

    /// Always picks the same action
    pub struct FixedPolicy(pub usize);

    impl<S> Policy<S> for FixedPolicy {
        fn act(&mut self, _state: &S) -> Result<usize> {
            Ok(self.0)
        }
    }

    /// Finishes after a fixed number of steps with reward 1 each
    struct ShortEnv {
        length: usize,
        t: usize,
    }

    impl Environment for ShortEnv {
        type State = [f32; 8];
        type Action = usize;

        fn reset(&mut self) -> Result<Self::State> {
            self.t = 0;
            Ok([0.0; 8])
        }

        fn step(&mut self, _action: usize) -> Result<Step<Self::State>> {
            self.t += 1;
            Ok(Step {
                state: [self.t as f32; 8],
                reward: 1.0,
                done: self.t >= self.length,
            })
        }
    }

    #[test]
    fn test_episode_capped_at_max_steps() {
        let mut env = EndlessEnv { steps: 0, renders: 0 };
        let episode = run_episode(&mut env, &mut FixedPolicy(1), MAX_EPISODE_STEPS, false).unwrap();

        assert_eq!(episode.steps(), MAX_EPISODE_STEPS);
        assert!(episode.truncated);
        assert!(episode.transitions.iter().all(|t| !t.done));
        assert!((episode.total_reward + 500.0).abs() < 1e-3);
        assert_eq!(env.renders, 0);
    }

    #[test]
    fn test_episode_stops_on_done() {
        let mut env = ShortEnv { length: 3, t: 0 };
        let episode = run_episode(&mut env, &mut FixedPolicy(2), MAX_EPISODE_STEPS, false).unwrap();

        assert_eq!(episode.steps(), 3);
        assert!(!episode.truncated);
        assert_eq!(episode.total_reward, 3.0);
        assert!(episode.transitions[2].done);
        assert!(episode.transitions[..2].iter().all(|t| !t.done));
    }

    #[test]
    fn test_transitions_chain_states() {
        let mut env = ShortEnv { length: 4, t: 0 };
        let episode = run_episode(&mut env, &mut FixedPolicy(3), MAX_EPISODE_STEPS, false).unwrap();

        for pair in episode.transitions.windows(2) {
            assert_eq!(pair[0].next_state, pair[1].state);
        }
        assert_eq!(episode.transitions[0].state, [0.0; 8]);
        assert!(episode.transitions.iter().all(|t| t.action == 3));
    }

    #[test]
    fn test_render_called_every_step() {
        let mut env = EndlessEnv { steps: 0, renders: 0 };
        run_episode(&mut env, &mut FixedPolicy(0), 25, true).unwrap();
        assert_eq!(env.renders, 25);
    }
}
