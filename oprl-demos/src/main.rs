use anyhow::Result;
use candle_core::Device;
use clap::Parser;
use oprl_agents::td3::TD3Builder;
use oprl_api::{
    builders::{
        env_pool::{PoolType, TaskEnvBuilder},
        off_policy_algo::OffPolicyAlgorithmBuilder,
    },
    utils::evaluator::run_episodes,
};
use oprl_core::{Algorithm, env::Env, off_policy_algorithm::TrainerParams};
use std::{path::PathBuf, time::Duration};

/// Trains a TD3 agent on the point maze task and replays the result.
#[derive(Debug, Parser)]
#[command(name = "point-maze-td3")]
struct Args {
    #[arg(long, default_value = "PointMaze-v1")]
    task: String,

    #[arg(long, default_value_t = 1626)]
    seed: u64,

    #[arg(long, default_value_t = 20000)]
    buffer_size: usize,

    #[arg(long, default_value_t = 3e-5)]
    actor_lr: f64,

    #[arg(long, default_value_t = 1e-4)]
    critic_lr: f64,

    #[arg(long, default_value_t = 0.99)]
    gamma: f64,

    #[arg(long, default_value_t = 0.005)]
    tau: f64,

    #[arg(long, default_value_t = 0.1)]
    exploration_noise: f64,

    #[arg(long, default_value_t = 0.2)]
    policy_noise: f64,

    #[arg(long, default_value_t = 0.5)]
    noise_clip: f64,

    #[arg(long, default_value_t = 2)]
    update_actor_freq: usize,

    #[arg(long, default_value_t = 100)]
    epoch: usize,

    #[arg(long, default_value_t = 2400)]
    step_per_epoch: usize,

    /// Environment steps gathered before each round of gradient updates.
    #[arg(long, default_value_t = 10)]
    collect_per_step: usize,

    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// Number of 128 wide hidden layers in every network.
    #[arg(long, default_value_t = 1)]
    layer_num: usize,

    #[arg(long, default_value_t = 8)]
    training_num: usize,

    #[arg(long, default_value_t = 100)]
    test_num: usize,

    #[arg(long, default_value = "log")]
    logdir: PathBuf,

    /// Seconds between rendered frames during the final replay. Zero disables rendering.
    #[arg(long, default_value_t = 0.0)]
    render: f64,

    #[arg(long, default_value_t = 2000)]
    max_episode_steps: usize,

    /// Train on the cpu even when a cuda device is available.
    #[arg(long)]
    cpu: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let device = if args.cpu {
        Device::Cpu
    } else {
        Device::cuda_if_available(0)?
    };
    device.set_seed(args.seed)?;
    oprl_core::rng::set_seed(args.seed);

    let env_builder = TaskEnvBuilder {
        task: args.task.clone(),
        max_episode_steps: Some(args.max_episode_steps),
    };
    let reward_threshold = oprl_envs::make(&args.task, Some(args.max_episode_steps))?
        .env_description()
        .reward_threshold;

    let checkpoint_dir = args.logdir.join(&args.task).join("td3");
    let stop_fn: Option<Box<dyn Fn(f32) -> bool>> = reward_threshold.map(|threshold| {
        Box::new(move |best_reward: f32| best_reward >= threshold) as Box<dyn Fn(f32) -> bool>
    });

    let mut algo = OffPolicyAlgorithmBuilder {
        device: device.clone(),
        num_train_envs: args.training_num,
        num_test_envs: args.test_num,
        train_pool_type: PoolType::Thread,
        test_pool_type: PoolType::Thread,
        buffer_size: args.buffer_size,
        trainer_params: TrainerParams {
            epochs: args.epoch,
            step_per_epoch: args.step_per_epoch,
            collect_per_step: args.collect_per_step,
            update_per_collect: args.collect_per_step,
            batch_size: args.batch_size,
            episode_per_test: args.test_num,
        },
        td3: TD3Builder {
            actor_lr: args.actor_lr,
            critic_lr: args.critic_lr,
            gamma: args.gamma,
            tau: args.tau,
            exploration_noise: args.exploration_noise,
            policy_noise: args.policy_noise,
            noise_clip: args.noise_clip,
            update_actor_freq: args.update_actor_freq,
            hidden_layers: vec![128; args.layer_num],
            ..Default::default()
        },
        stop_fn,
        checkpoint_dir: Some(checkpoint_dir.clone()),
    }
    .build(&env_builder)?;

    algo.train()?;

    let report = algo.report;
    println!(
        "finished after {} epochs: best reward {:.2} at epoch {}, {} env steps, {} gradient steps",
        report.epochs_run,
        report.best_reward,
        report.best_epoch,
        report.env_steps,
        report.gradient_steps
    );

    std::fs::create_dir_all(&checkpoint_dir)?;
    let history = bincode::encode_to_vec(&algo.hooks.eval_history, bincode::config::standard())?;
    std::fs::write(checkpoint_dir.join("eval_history.bin"), history)?;

    if let Some(threshold) = reward_threshold {
        if report.best_reward < threshold {
            anyhow::bail!(
                "best reward {:.2} stayed below the solve threshold {:.2}",
                report.best_reward,
                threshold
            );
        }
    }

    let render_delay = (args.render > 0.).then(|| Duration::from_secs_f64(args.render));
    let eval = run_episodes(&mut algo.test_collector, &algo.agent, args.test_num, render_delay)?;
    println!(
        "final evaluation: mean reward {:.2} over {} episodes, mean length {:.1}",
        eval.mean_return(),
        eval.n_episodes,
        eval.mean_length()
    );
    Ok(())
}
