pub mod agents;
pub mod collector;
pub mod env;
pub mod env_pools;
pub mod exploration;
pub mod off_policy_algorithm;
pub mod policies;
pub mod replay_buffer;
pub mod rng;
pub mod tensors;
pub mod thread_safe_sequential;
pub mod utils;

use candle_core::Result;

/// A learning algorithm. Currently only `OffPolicyAlgorithm` implements this trait, but an
/// on policy alternative would slot in here as well.
pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}
