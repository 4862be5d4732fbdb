use candle_core::Result;
use oprl_core::{
    agents::OffPolicyAgent,
    collector::{CollectStats, Collector},
    env::Env,
};
use std::time::Duration;

/// Runs deterministic evaluation episodes with a trained agent, optionally rendering the first
/// env of the pool with a delay between vector steps.
pub fn run_episodes<E: Env, A: OffPolicyAgent>(
    collector: &mut Collector<E>,
    agent: &A,
    n_episodes: usize,
    render_delay: Option<Duration>,
) -> Result<CollectStats> {
    collector.reset()?;
    collector.collect_episodes(agent.policy(), n_episodes, render_delay)
}
