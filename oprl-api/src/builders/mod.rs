pub mod env_pool;
pub mod off_policy_algo;
