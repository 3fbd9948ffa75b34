//! Episode generator capability.
//!
//! A generator turns an environment and a policy into a lazy, finite
//! sequence of transitions for one episode. The sequence is pulled one
//! transition at a time through [`RolloutEpisode::next_transition`], which
//! borrows the environment and policy only for the duration of the step.
//! Between steps the worker checks the kill switch, waits on the throttle
//! gate and collects policy summaries.

use crate::core::SignalHandle;
use crate::error::GeneratorError;

/// Parameters of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeRequest {
    /// Shared signals; generators may read the live global step.
    pub signals: SignalHandle,
    /// Maximum number of environment steps in the episode.
    pub episode_length: usize,
    /// Timesteps stacked into each transition.
    pub timesteps: usize,
    pub is_eval: bool,
    /// Deterministic seed for evaluation episodes.
    pub eval_seed: Option<u64>,
}

/// One episode in progress.
pub trait RolloutEpisode<E, P> {
    type Transition;

    /// Produce the next transition.
    ///
    /// `None` ends the episode. `Some(Err(GeneratorError::EpisodeComplete))`
    /// also ends it normally; any other error is fatal for the worker.
    fn next_transition(
        &mut self,
        env: &mut E,
        policy: &mut P,
    ) -> Option<Result<Self::Transition, GeneratorError>>;
}

/// Starts episodes for a given environment and policy type.
pub trait EpisodeGenerator<E, P>: Send + Sync {
    type Transition: Send + 'static;
    type Episode: RolloutEpisode<E, P, Transition = Self::Transition>;

    fn generate(&self, request: EpisodeRequest) -> Self::Episode;
}
