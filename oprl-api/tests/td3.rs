use candle_core::{Device, Result};
use oprl_agents::td3::TD3Builder;
use oprl_api::builders::{
    env_pool::{EnvPoolBuilder, PoolType, TaskEnvBuilder},
    off_policy_algo::OffPolicyAlgorithmBuilder,
};
use oprl_core::{Algorithm, env_pools::EnvHolder, off_policy_algorithm::TrainerParams};

#[test]
fn closures_build_env_pools() -> Result<()> {
    let env_builder = |_env_idx: usize| oprl_envs::make("Pendulum-v1", Some(50));
    let holder = EnvPoolBuilder {
        pool_type: PoolType::Vec,
        num_envs: 3,
    }
    .build(&env_builder)?;
    assert_eq!(holder.num_envs(), 3);
    assert_eq!(holder.env_description().observation_size(), 3);
    Ok(())
}

#[test]
fn td3_trains_end_to_end() -> Result<()> {
    oprl_core::rng::set_seed(7);
    let mut algo = OffPolicyAlgorithmBuilder {
        device: Device::Cpu,
        num_train_envs: 2,
        num_test_envs: 2,
        train_pool_type: PoolType::Vec,
        test_pool_type: PoolType::Vec,
        buffer_size: 1000,
        trainer_params: TrainerParams {
            epochs: 2,
            step_per_epoch: 64,
            collect_per_step: 8,
            update_per_collect: 2,
            batch_size: 32,
            episode_per_test: 2,
        },
        td3: TD3Builder {
            hidden_layers: vec![16],
            ..Default::default()
        },
        stop_fn: None,
        checkpoint_dir: None,
    }
    .build(&TaskEnvBuilder {
        task: "Pendulum-v1".to_owned(),
        max_episode_steps: Some(50),
    })?;

    algo.train()?;

    assert_eq!(algo.report.epochs_run, 2);
    assert!(algo.report.env_steps >= 128);
    assert!(algo.report.gradient_steps > 0);
    assert_eq!(algo.hooks.eval_history.len(), 2);
    for returns in &algo.hooks.eval_history {
        assert_eq!(returns.len(), 2);
    }
    Ok(())
}

#[test]
fn thread_pools_train_too() -> Result<()> {
    oprl_core::rng::set_seed(11);
    let mut algo = OffPolicyAlgorithmBuilder {
        num_train_envs: 2,
        num_test_envs: 2,
        train_pool_type: PoolType::Thread,
        test_pool_type: PoolType::Thread,
        buffer_size: 500,
        trainer_params: TrainerParams {
            epochs: 1,
            step_per_epoch: 32,
            collect_per_step: 8,
            update_per_collect: 1,
            batch_size: 16,
            episode_per_test: 2,
        },
        td3: TD3Builder {
            hidden_layers: vec![16],
            ..Default::default()
        },
        ..Default::default()
    }
    .build(&TaskEnvBuilder {
        task: "Pendulum-v1".to_owned(),
        max_episode_steps: Some(25),
    })?;

    algo.train()?;
    assert_eq!(algo.report.epochs_run, 1);
    Ok(())
}
