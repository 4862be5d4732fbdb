use crate::{
    Algorithm,
    agents::{LearnStats, OffPolicyAgent},
    collector::{CollectStats, Collector},
    env::Env,
};
use candle_core::{Device, Result};
use std::path::PathBuf;

macro_rules! break_on_hook_res {
    ($hook_res:expr) => {
        if $hook_res {
            break;
        }
    };
}

#[derive(Debug, Clone, Copy)]
pub struct TrainerParams {
    /// How many epochs to train for at most. One epoch is `step_per_epoch` environment steps
    /// followed by an evaluation pass.
    pub epochs: usize,
    pub step_per_epoch: usize,
    /// Environment steps gathered per collect call. One vector step of N envs counts as N.
    pub collect_per_step: usize,
    /// Gradient updates run after each collect call.
    pub update_per_collect: usize,
    pub batch_size: usize,
    /// Episodes per evaluation pass.
    pub episode_per_test: usize,
}

pub trait OffPolicyAlgorithmHooks {
    fn init_hook(&mut self) -> bool;

    fn post_collect_hook(&mut self, stats: &CollectStats) -> bool;

    fn post_update_hook(&mut self, stats: &LearnStats) -> bool;

    /// Runs after every evaluation pass. Returning true stops training.
    fn post_evaluation_hook(&mut self, epoch: usize, eval: &CollectStats, best_reward: f32)
    -> bool;

    fn shutdown_hook(&mut self) -> Result<()>;
}

type StopFn = Box<dyn Fn(f32) -> bool>;

/// The hooks the off policy trainer runs with unless the caller brings their own: a progress
/// line per epoch, an evaluation history, and an optional reward threshold stop predicate.
pub struct DefaultOffPolicyHooks {
    stop_fn: Option<StopFn>,
    pub eval_history: Vec<Vec<f32>>,
}

impl DefaultOffPolicyHooks {
    pub fn new() -> Self {
        Self {
            stop_fn: None,
            eval_history: vec![],
        }
    }

    pub fn with_stop_fn(stop_fn: StopFn) -> Self {
        Self {
            stop_fn: Some(stop_fn),
            eval_history: vec![],
        }
    }
}

impl Default for DefaultOffPolicyHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl OffPolicyAlgorithmHooks for DefaultOffPolicyHooks {
    fn init_hook(&mut self) -> bool {
        false
    }

    fn post_collect_hook(&mut self, _stats: &CollectStats) -> bool {
        false
    }

    fn post_update_hook(&mut self, _stats: &LearnStats) -> bool {
        false
    }

    fn post_evaluation_hook(
        &mut self,
        epoch: usize,
        eval: &CollectStats,
        best_reward: f32,
    ) -> bool {
        println!(
            "epoch: {:<3} test episodes: {:<4} mean reward: {:<8.2} mean length: {:<7.1} best reward: {:.2}",
            epoch,
            eval.n_episodes,
            eval.mean_return(),
            eval.mean_length(),
            best_reward
        );
        self.eval_history.push(eval.returns.clone());
        match &self.stop_fn {
            Some(stop_fn) => stop_fn(best_reward),
            None => false,
        }
    }

    fn shutdown_hook(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The final report of a training run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingReport {
    pub best_reward: f32,
    pub best_epoch: usize,
    pub epochs_run: usize,
    pub env_steps: usize,
    pub gradient_steps: usize,
}

pub struct OffPolicyAlgorithm<E: Env, A: OffPolicyAgent, H: OffPolicyAlgorithmHooks> {
    pub agent: A,
    pub train_collector: Collector<E>,
    pub test_collector: Collector<E>,
    pub params: TrainerParams,
    pub hooks: H,
    /// Where to persist the agent whenever the evaluation reward improves.
    pub checkpoint_dir: Option<PathBuf>,
    pub device: Device,
    pub report: TrainingReport,
}

impl<E: Env, A: OffPolicyAgent, H: OffPolicyAlgorithmHooks> OffPolicyAlgorithm<E, A, H> {
    fn update_phase(&mut self) -> Result<Option<LearnStats>> {
        let mut last_stats = None;
        for _ in 0..self.params.update_per_collect {
            let Some(buffer) = &self.train_collector.buffer else {
                candle_core::bail!("the train collector of an off policy algorithm needs a buffer")
            };
            if buffer.len() < self.params.batch_size {
                break;
            }
            let batch = buffer.sample(self.params.batch_size, &self.device)?;
            let stats = self.agent.learn(batch)?;
            self.report.gradient_steps += 1;
            last_stats = Some(stats);
        }
        Ok(last_stats)
    }

    fn evaluation_phase(&mut self, epoch: usize) -> Result<bool> {
        let eval = self.test_collector.collect_episodes(
            self.agent.policy(),
            self.params.episode_per_test,
            None,
        )?;
        let mean_return = eval.mean_return();
        if epoch == 1 || mean_return > self.report.best_reward {
            self.report.best_reward = mean_return;
            self.report.best_epoch = epoch;
            if let Some(dir) = &self.checkpoint_dir {
                self.agent.save(dir)?;
            }
        }
        Ok(self
            .hooks
            .post_evaluation_hook(epoch, &eval, self.report.best_reward))
    }
}

impl<E: Env, A: OffPolicyAgent, H: OffPolicyAlgorithmHooks> Algorithm
    for OffPolicyAlgorithm<E, A, H>
{
    fn train(&mut self) -> Result<()> {
        if self.hooks.init_hook() {
            return Ok(());
        }
        for epoch in 1..=self.params.epochs {
            self.report.epochs_run = epoch;
            let mut epoch_steps = 0;
            'collecting: while epoch_steps < self.params.step_per_epoch {
                // collect phase
                let stats = self
                    .train_collector
                    .collect_steps(self.agent.policy(), self.params.collect_per_step)?;
                epoch_steps += stats.n_steps;
                self.report.env_steps += stats.n_steps;
                if self.hooks.post_collect_hook(&stats) {
                    break 'collecting;
                }

                // learning phase
                if let Some(learn_stats) = self.update_phase()? {
                    if self.hooks.post_update_hook(&learn_stats) {
                        break 'collecting;
                    }
                }
            }
            break_on_hook_res!(self.evaluation_phase(epoch)?);
        }
        self.hooks.shutdown_hook()
    }
}
