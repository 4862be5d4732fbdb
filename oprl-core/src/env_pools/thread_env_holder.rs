use super::EnvHolder;
use crate::env::{Env, EnvironmentDescription, StepSnapshot};
use candle_core::{Error, Result, Tensor};
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::thread::JoinHandle;

enum WorkerTask {
    Reset { seed: u64 },
    Step { action: Tensor },
    Render,
    Shutdown,
}

enum WorkerReply {
    State(Tensor),
    Snapshot(StepSnapshot),
    Rendered,
}

struct WorkerThread<E: Env> {
    env: E,
    env_idx: usize,
    task_rx: Receiver<WorkerTask>,
    reply_tx: Sender<(usize, Result<WorkerReply>)>,
}

impl<E: Env> WorkerThread<E> {
    fn work(mut self) {
        while let Ok(task) = self.task_rx.recv() {
            let reply = match task {
                WorkerTask::Reset { seed } => self.env.reset(seed).map(WorkerReply::State),
                WorkerTask::Step { action } => self.env.step(&action).map(WorkerReply::Snapshot),
                WorkerTask::Render => {
                    self.env.render();
                    Ok(WorkerReply::Rendered)
                }
                WorkerTask::Shutdown => break,
            };
            if self.reply_tx.send((self.env_idx, reply)).is_err() {
                break;
            }
        }
    }
}

/// One OS thread per environment replica, talking over crossbeam channels. The in process
/// stand-in for a subprocess vector env: stepping the pool fans the actions out and joins the
/// snapshots back in.
pub struct ThreadEnvHolder {
    task_txs: Vec<Sender<WorkerTask>>,
    reply_rx: Receiver<(usize, Result<WorkerReply>)>,
    handles: Vec<JoinHandle<()>>,
    env_description: EnvironmentDescription,
}

impl ThreadEnvHolder {
    pub fn spawn<E: Env + 'static>(envs: Vec<E>) -> Result<Self> {
        if envs.is_empty() {
            candle_core::bail!("cannot spawn a thread env pool without environments")
        }
        let env_description = envs[0].env_description();
        let (reply_tx, reply_rx) = unbounded();
        let mut task_txs = vec![];
        let mut handles = vec![];
        for (env_idx, env) in envs.into_iter().enumerate() {
            let (task_tx, task_rx) = unbounded();
            let worker = WorkerThread {
                env,
                env_idx,
                task_rx,
                reply_tx: reply_tx.clone(),
            };
            handles.push(std::thread::spawn(move || worker.work()));
            task_txs.push(task_tx);
        }
        Ok(Self {
            task_txs,
            reply_rx,
            handles,
            env_description,
        })
    }

    fn request(&mut self, env_idx: usize, task: WorkerTask) -> Result<WorkerReply> {
        self.task_txs[env_idx].send(task).map_err(Error::wrap)?;
        let (idx, reply) = self.reply_rx.recv().map_err(Error::wrap)?;
        debug_assert!(idx == env_idx);
        reply
    }
}

impl EnvHolder for ThreadEnvHolder {
    fn num_envs(&self) -> usize {
        self.task_txs.len()
    }

    fn env_description(&self) -> EnvironmentDescription {
        self.env_description.clone()
    }

    fn reset_env(&mut self, env_idx: usize, seed: u64) -> Result<Tensor> {
        match self.request(env_idx, WorkerTask::Reset { seed })? {
            WorkerReply::State(state) => Ok(state),
            _ => candle_core::bail!("worker {env_idx} replied with the wrong variant to a reset"),
        }
    }

    fn step(&mut self, actions: Vec<(usize, Tensor)>) -> Result<Vec<(usize, StepSnapshot)>> {
        let expected = actions.len();
        for (env_idx, action) in actions {
            self.task_txs[env_idx]
                .send(WorkerTask::Step { action })
                .map_err(Error::wrap)?;
        }
        let mut snapshots = Vec::with_capacity(expected);
        for _ in 0..expected {
            let (env_idx, reply) = self.reply_rx.recv().map_err(Error::wrap)?;
            match reply? {
                WorkerReply::Snapshot(snapshot) => snapshots.push((env_idx, snapshot)),
                _ => {
                    candle_core::bail!("worker {env_idx} replied with the wrong variant to a step")
                }
            }
        }
        Ok(snapshots)
    }

    fn render_env(&mut self, env_idx: usize) -> Result<()> {
        match self.request(env_idx, WorkerTask::Render)? {
            WorkerReply::Rendered => Ok(()),
            _ => candle_core::bail!("worker {env_idx} replied with the wrong variant to a render"),
        }
    }
}

impl Drop for ThreadEnvHolder {
    fn drop(&mut self) {
        for tx in &self.task_txs {
            let _ = tx.send(WorkerTask::Shutdown);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
