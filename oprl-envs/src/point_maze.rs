use candle_core::{Device, Result, Tensor};
use oprl_core::env::{Env, EnvironmentDescription, Space, StepSnapshot};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub const DEFAULT_MAX_EPISODE_STEPS: usize = 2000;

const ARENA: f32 = 4.0;
const DT: f32 = 0.1;
const MAX_SPEED: f32 = 1.0;
const POINT_RADIUS: f32 = 0.05;
const GOAL: [f32; 2] = [3.5, 3.5];
const GOAL_RADIUS: f32 = 0.3;
const GOAL_BONUS: f32 = 10.0;
const START: [f32; 2] = [0.5, 0.5];
const START_NOISE: f32 = 0.2;
const REWARD_THRESHOLD: f32 = 0.0;

#[derive(Debug, Clone, Copy)]
struct Wall {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl Wall {
    fn blocks(&self, x: f32, y: f32) -> bool {
        x + POINT_RADIUS > self.x0
            && x - POINT_RADIUS < self.x1
            && y + POINT_RADIUS > self.y0
            && y - POINT_RADIUS < self.y1
    }
}

// Two offset walls forming an S shaped corridor between the start and the goal corner.
const WALLS: [Wall; 2] = [
    Wall {
        x0: 1.0,
        y0: 0.0,
        x1: 1.2,
        y1: 3.0,
    },
    Wall {
        x0: 2.6,
        y0: 1.0,
        x1: 2.8,
        y1: 4.0,
    },
];

/// A point mass navigating a walled arena towards a goal region. Observations are the position,
/// the velocity and the vector pointing at the goal; actions are force commands in [-1, 1]^2.
/// The reward is a dense negative goal distance with a bonus on arrival, so episode returns
/// under a competent policy sit above zero while a wandering policy collects a large negative
/// score.
pub struct PointMaze {
    pos: [f32; 2],
    vel: [f32; 2],
    steps: usize,
    max_episode_steps: usize,
    rng: StdRng,
}

impl PointMaze {
    pub fn new(max_episode_steps: usize) -> Self {
        Self {
            pos: START,
            vel: [0., 0.],
            steps: 0,
            max_episode_steps,
            rng: StdRng::seed_from_u64(0),
        }
    }

    fn goal_distance(&self) -> f32 {
        let dx = GOAL[0] - self.pos[0];
        let dy = GOAL[1] - self.pos[1];
        (dx * dx + dy * dy).sqrt()
    }

    fn blocked(x: f32, y: f32) -> bool {
        if x - POINT_RADIUS < 0. || x + POINT_RADIUS > ARENA {
            return true;
        }
        if y - POINT_RADIUS < 0. || y + POINT_RADIUS > ARENA {
            return true;
        }
        WALLS.iter().any(|wall| wall.blocks(x, y))
    }

    /// Axis separated move: a collision along one axis cancels that component of the motion and
    /// kills the velocity along it, sliding along walls remains possible.
    fn integrate(&mut self, force: [f32; 2]) {
        for axis in 0..2 {
            self.vel[axis] = (self.vel[axis] + force[axis] * DT).clamp(-MAX_SPEED, MAX_SPEED);
        }
        let next_x = self.pos[0] + self.vel[0] * DT;
        if Self::blocked(next_x, self.pos[1]) {
            self.vel[0] = 0.;
        } else {
            self.pos[0] = next_x;
        }
        let next_y = self.pos[1] + self.vel[1] * DT;
        if Self::blocked(self.pos[0], next_y) {
            self.vel[1] = 0.;
        } else {
            self.pos[1] = next_y;
        }
    }

    fn observation(&self) -> Result<Tensor> {
        let obs = [
            self.pos[0],
            self.pos[1],
            self.vel[0],
            self.vel[1],
            GOAL[0] - self.pos[0],
            GOAL[1] - self.pos[1],
        ];
        Tensor::from_slice(&obs, obs.len(), &Device::Cpu)
    }
}

impl Env for PointMaze {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        self.rng = StdRng::seed_from_u64(seed);
        self.pos = [
            START[0] + self.rng.random_range(-START_NOISE..START_NOISE),
            START[1] + self.rng.random_range(-START_NOISE..START_NOISE),
        ];
        self.vel = [0., 0.];
        self.steps = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<StepSnapshot> {
        let action: Vec<f32> = action.flatten_all()?.to_vec1()?;
        let force = [action[0].clamp(-1., 1.), action[1].clamp(-1., 1.)];
        self.integrate(force);
        self.steps += 1;

        let distance = self.goal_distance();
        let control_cost = 0.001 * (force[0] * force[0] + force[1] * force[1]);
        let mut reward = -0.05 * distance - control_cost;
        let terminated = distance < GOAL_RADIUS;
        if terminated {
            reward += GOAL_BONUS;
        }
        let truncated = !terminated && self.steps >= self.max_episode_steps;
        Ok(StepSnapshot {
            state: self.observation()?,
            reward,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let min = Tensor::from_slice(&[-1f32, -1.], 2, &Device::Cpu).unwrap();
        let max = Tensor::from_slice(&[1f32, 1.], 2, &Device::Cpu).unwrap();
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![6]),
            Space::Continous {
                min: Some(min),
                max: Some(max),
                size: 2,
            },
            Some(REWARD_THRESHOLD),
        )
    }

    fn render(&mut self) {
        println!(
            "step {:<5} pos ({:>5.2}, {:>5.2}) vel ({:>5.2}, {:>5.2}) goal distance {:.2}",
            self.steps, self.pos[0], self.pos[1], self.vel[0], self.vel[1], self.goal_distance()
        );
    }
}
