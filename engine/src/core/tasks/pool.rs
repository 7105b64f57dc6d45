use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use log::{error, info};

use crate::{
    core::{
        error::ThreadError,
        profiler::{Profiler, profile_scope},
        thread::{Body, TAG, ThreadPriority, ThreadRegistry, WorkerRole, logged, panic_message},
    },
    sync::Queue,
};

/// A unit of work submitted to a pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Longest an idle pool worker waits on the queue before its next iteration.
const IDLE_WAIT: Duration = Duration::from_millis(1);

pub(crate) struct Pool {
    pub(crate) queue: Arc<Queue<Task>>,
    /// Names of the live workers serving `queue`
    pub(crate) workers: Vec<String>,
}

/// One iteration of a pool worker: run the next queued task, waiting up to
/// [`IDLE_WAIT`] for one. The worker wrapper supplies the loop, so pool workers can be paused and
/// stopped between tasks.
fn pool_body(pool: &str, queue: Arc<Queue<Task>>) -> Body {
    let section = format!("{pool}_Task");
    Box::new(move || {
        if let Some(task) = queue.pop_timeout(IDLE_WAIT) {
            let _scope = Profiler::global()
                .is_enabled()
                .then(|| profile_scope(section.clone()));
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                error!(target: TAG, "Panic in worker task: {}", panic_message(payload.as_ref()));
            }
        }
    })
}

impl ThreadRegistry {
    /// Spawn `size` looping workers named `<name>_Worker<i>` that serve a shared
    /// task queue. Either every worker starts or none is left behind.
    pub fn create_pool(&self, name: &str, size: usize, priority: ThreadPriority) -> Result<(), ThreadError> {
        let mut inner = self.lock();
        if !inner.initialized {
            drop(inner);
            return logged(ThreadError::NotInitialized);
        }
        if inner.pools.contains_key(name) {
            drop(inner);
            return logged(ThreadError::PoolExists(name.to_owned()));
        }
        if inner.workers.len() + size > inner.max_threads {
            let err = ThreadError::CapacityExceeded {
                requested: inner.workers.len() + size,
                max: inner.max_threads,
            };
            drop(inner);
            return logged(err);
        }

        let queue: Arc<Queue<Task>> = Arc::new(Queue::new());
        let mut spawned = Vec::with_capacity(size);
        for index in 0..size {
            let worker = format!("{name}_Worker{index}");
            let body = pool_body(name, Arc::clone(&queue));
            if let Err(err) = self.spawn_locked(&mut inner, &worker, body, WorkerRole::Looping, priority, Some(name)) {
                let partial: Vec<_> = spawned
                    .iter()
                    .filter_map(|started: &String| inner.workers.remove(started).map(|entry| (started.clone(), entry)))
                    .collect();
                drop(inner);
                for (worker, entry) in partial {
                    entry.stop_and_join(&worker);
                }
                error!(target: TAG, "Rolled back thread pool {name}");
                return logged(err);
            }
            spawned.push(worker);
        }

        inner.pools.insert(
            name.to_owned(),
            Pool {
                queue,
                workers: spawned,
            },
        );
        info!(target: TAG, "Created thread pool: {name} with {size} threads");
        Ok(())
    }

    /// Queue `task` on `pool`. No back-pressure.
    pub fn submit<F>(&self, pool: &str, task: F) -> Result<(), ThreadError>
    where
        F: FnOnce() + Send + 'static,
    {
        let queue = match self.lock().pools.get(pool) {
            Some(entry) => Arc::clone(&entry.queue),
            None => return logged(ThreadError::PoolNotFound(pool.to_owned())),
        };
        queue.push(Box::new(task));
        Ok(())
    }

    /// Tasks queued on `pool` and not yet picked up.
    pub fn pending_tasks(&self, pool: &str) -> Result<usize, ThreadError> {
        match self.lock().pools.get(pool) {
            Some(entry) => Ok(entry.queue.size()),
            None => logged(ThreadError::PoolNotFound(pool.to_owned())),
        }
    }

    pub fn pool_workers(&self, pool: &str) -> Result<Vec<String>, ThreadError> {
        match self.lock().pools.get(pool) {
            Some(entry) => Ok(entry.workers.clone()),
            None => logged(ThreadError::PoolNotFound(pool.to_owned())),
        }
    }

    pub fn has_pool(&self, pool: &str) -> bool {
        self.lock().pools.contains_key(pool)
    }
}
