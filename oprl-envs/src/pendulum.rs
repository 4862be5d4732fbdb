use candle_core::{Device, Result, Tensor};
use oprl_core::env::{Env, EnvironmentDescription, Space, StepSnapshot};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f32::consts::PI;

pub const DEFAULT_MAX_EPISODE_STEPS: usize = 200;

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// The classic continous control pendulum: keep the pole upright by applying torque. The state
/// is [cos(theta), sin(theta), theta_dot] to avoid the angle wrap discontinuity. Mostly useful
/// as a cheap environment for exercising agents in tests; it registers no reward threshold.
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_episode_steps: usize,
    rng: StdRng,
}

impl Pendulum {
    pub fn new(max_episode_steps: usize) -> Self {
        Self {
            theta: 0.,
            theta_dot: 0.,
            steps: 0,
            max_episode_steps,
            rng: StdRng::seed_from_u64(0),
        }
    }

    fn observation(&self) -> Result<Tensor> {
        let obs = [self.theta.cos(), self.theta.sin(), self.theta_dot];
        Tensor::from_slice(&obs, obs.len(), &Device::Cpu)
    }

    fn angle_normalize(x: f32) -> f32 {
        ((x + PI).rem_euclid(2. * PI)) - PI
    }
}

impl Env for Pendulum {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        self.rng = StdRng::seed_from_u64(seed);
        self.theta = self.rng.random_range(-PI..PI);
        self.theta_dot = self.rng.random_range(-1.0..1.0);
        self.steps = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<StepSnapshot> {
        let action: Vec<f32> = action.flatten_all()?.to_vec1()?;
        let torque = action[0].clamp(-MAX_TORQUE, MAX_TORQUE);

        let theta_acc = (3. * G / (2. * L)) * self.theta.sin() + (3. / (M * L * L)) * torque;
        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);

        let reward = -(Self::angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2));
        self.steps += 1;
        Ok(StepSnapshot {
            state: self.observation()?,
            reward,
            terminated: false,
            truncated: self.steps >= self.max_episode_steps,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let min = Tensor::from_slice(&[-MAX_TORQUE], 1, &Device::Cpu).unwrap();
        let max = Tensor::from_slice(&[MAX_TORQUE], 1, &Device::Cpu).unwrap();
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![3]),
            Space::Continous {
                min: Some(min),
                max: Some(max),
                size: 1,
            },
            None,
        )
    }

    fn render(&mut self) {
        println!(
            "step {:<4} theta {:>6.3} theta_dot {:>6.3}",
            self.steps, self.theta, self.theta_dot
        );
    }
}
