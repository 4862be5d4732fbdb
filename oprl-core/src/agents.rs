use crate::{policies::Policy, replay_buffer::TransitionBatch};
use candle_core::Result;
use std::path::Path;

/// Scalars reported by a single gradient update. The actor loss is absent on updates where the
/// agent only trained its critics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LearnStats {
    pub actor_loss: Option<f32>,
    pub critic_loss: f32,
}

pub trait OffPolicyAgent {
    type Policy: Policy;

    /// Retrieves the acting policy
    fn policy(&self) -> &Self::Policy;

    /// Runs one gradient update on a sampled minibatch
    fn learn(&mut self, batch: TransitionBatch) -> Result<LearnStats>;

    /// Persists the agent's networks under the given directory
    fn save(&self, dir: &Path) -> Result<()> {
        let _ = dir;
        Ok(())
    }
}
