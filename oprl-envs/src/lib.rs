pub mod pendulum;
pub mod point_maze;

use candle_core::{Result, Tensor};
use oprl_core::env::{Env, EnvironmentDescription, StepSnapshot};
use pendulum::Pendulum;
use point_maze::PointMaze;

/// The environments this crate registers, behind one type so callers can construct pools from a
/// task name alone.
pub enum NativeEnv {
    PointMaze(PointMaze),
    Pendulum(Pendulum),
}

impl Env for NativeEnv {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        match self {
            Self::PointMaze(env) => env.reset(seed),
            Self::Pendulum(env) => env.reset(seed),
        }
    }

    fn step(&mut self, action: &Tensor) -> Result<StepSnapshot> {
        match self {
            Self::PointMaze(env) => env.step(action),
            Self::Pendulum(env) => env.step(action),
        }
    }

    fn env_description(&self) -> EnvironmentDescription {
        match self {
            Self::PointMaze(env) => env.env_description(),
            Self::Pendulum(env) => env.env_description(),
        }
    }

    fn render(&mut self) {
        match self {
            Self::PointMaze(env) => env.render(),
            Self::Pendulum(env) => env.render(),
        }
    }
}

/// Instantiates a registered environment by its task id. The counterpart of `gym.make`.
pub fn make(task: &str, max_episode_steps: Option<usize>) -> Result<NativeEnv> {
    match task {
        "PointMaze-v1" => Ok(NativeEnv::PointMaze(PointMaze::new(
            max_episode_steps.unwrap_or(point_maze::DEFAULT_MAX_EPISODE_STEPS),
        ))),
        "Pendulum-v1" => Ok(NativeEnv::Pendulum(Pendulum::new(
            max_episode_steps.unwrap_or(pendulum::DEFAULT_MAX_EPISODE_STEPS),
        ))),
        _ => candle_core::bail!("no environment registered under the id {task}"),
    }
}
