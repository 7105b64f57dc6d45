use std::{
    collections::HashMap,
    mem,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};

use log::{error, info, warn};
use parking_lot::{Mutex, MutexGuard};

use super::{
    Body, TAG, ThreadPriority, ThreadStatus, WorkerRole, native,
    worker::{self, WorkerControl},
};
use crate::core::{error::ThreadError, tasks::Pool};

/// Process-scoped table of named workers and worker pools.
///
/// The table mutex is never held while a worker body runs or while a worker is
/// joined. Dropping the registry shuts it down.
pub struct ThreadRegistry {
    inner: Mutex<RegistryInner>,
    active: Arc<AtomicUsize>,
}

pub(crate) struct RegistryInner {
    pub(crate) initialized: bool,
    pub(crate) max_threads: usize,
    pub(crate) workers: HashMap<String, WorkerEntry>,
    pub(crate) pools: HashMap<String, Pool>,
}

pub(crate) struct WorkerEntry {
    control: Arc<WorkerControl>,
    /// Taken by whoever joins the thread.
    handle: Option<JoinHandle<()>>,
    role: WorkerRole,
    priority: ThreadPriority,
    pool: Option<String>,
}

impl WorkerEntry {
    /// Request a stop and return once the thread has been joined, by this
    /// call or by a concurrent one. Must be called without the registry lock
    /// held.
    pub(crate) fn stop_and_join(mut self, name: &str) {
        finish(name, &self.control, self.handle.take());
    }
}

/// Stop the worker behind `control`. The caller holding `handle` joins it;
/// every other caller waits until that join has completed.
fn finish(name: &str, control: &WorkerControl, handle: Option<JoinHandle<()>>) {
    control.request_stop();
    match handle {
        Some(handle) => {
            join(name, handle);
            control.mark_joined();
        }
        None => control.wait_joined(),
    }
}

fn join(name: &str, handle: JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        warn!(target: TAG, "Thread {name} cannot join itself; leaving it detached");
        return;
    }
    if handle.join().is_err() {
        error!(target: TAG, "Thread {name} terminated abnormally");
    }
}

/// Log `err` and return it.
pub(crate) fn logged<T>(err: ThreadError) -> Result<T, ThreadError> {
    match &err {
        ThreadError::InvalidStatus { .. } | ThreadError::Platform { .. } | ThreadError::AlreadyInitialized => {
            warn!(target: TAG, "{err}")
        }
        _ => error!(target: TAG, "{err}"),
    }
    Err(err)
}

impl ThreadRegistry {
    /// An uninitialized registry; call [`initialize`](Self::initialize) before use.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                initialized: false,
                max_threads: 0,
                workers: HashMap::new(),
                pools: HashMap::new(),
            }),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enable the registry with a cap on live workers. `0` uses the hardware
    /// concurrency, never less than 2.
    pub fn initialize(&self, max_threads: usize) -> Result<(), ThreadError> {
        let mut inner = self.inner.lock();
        if inner.initialized {
            return logged(ThreadError::AlreadyInitialized);
        }

        inner.max_threads = if max_threads == 0 {
            num_cpus::get().max(2)
        } else {
            max_threads
        };
        inner.initialized = true;
        info!(target: TAG, "Initialized with {} max threads", inner.max_threads);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Spawn a worker that runs `body` once.
    pub fn create_worker<F>(&self, name: &str, body: F, priority: ThreadPriority) -> Result<(), ThreadError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut body = Some(body);
        self.create_standalone(
            name,
            Box::new(move || {
                if let Some(body) = body.take() {
                    body();
                }
            }),
            WorkerRole::OneShot,
            priority,
        )
    }

    /// Spawn a worker that re-runs `body` until stopped.
    pub fn create_looping_worker<F>(&self, name: &str, body: F, priority: ThreadPriority) -> Result<(), ThreadError>
    where
        F: FnMut() + Send + 'static,
    {
        self.create_standalone(name, Box::new(body), WorkerRole::Looping, priority)
    }

    fn create_standalone(
        &self,
        name: &str,
        body: Body,
        role: WorkerRole,
        priority: ThreadPriority,
    ) -> Result<(), ThreadError> {
        let (result, reaped) = {
            let mut inner = self.inner.lock();
            let reaped = reap_finished(&mut inner);
            let result = self.spawn_locked(&mut inner, name, body, role, priority, None);
            (result, reaped)
        };

        for (finished, entry) in reaped {
            entry.stop_and_join(&finished);
        }
        result.or_else(logged)
    }

    /// Spawn a worker and record it. Does not log failures.
    pub(crate) fn spawn_locked(
        &self,
        inner: &mut MutexGuard<'_, RegistryInner>,
        name: &str,
        body: Body,
        role: WorkerRole,
        priority: ThreadPriority,
        pool: Option<&str>,
    ) -> Result<(), ThreadError> {
        if !inner.initialized {
            return Err(ThreadError::NotInitialized);
        }
        if inner.workers.contains_key(name) {
            return Err(ThreadError::NameTaken(name.to_owned()));
        }
        if inner.workers.len() >= inner.max_threads {
            return Err(ThreadError::CapacityExceeded {
                requested: inner.workers.len() + 1,
                max: inner.max_threads,
            });
        }

        let control = Arc::new(WorkerControl::new(name));
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn({
                let control = Arc::clone(&control);
                let active = Arc::clone(&self.active);
                move || worker::run(control, body, role, active)
            })
            .map_err(|source| ThreadError::Spawn {
                name: name.to_owned(),
                source,
            })?;

        if let Err(source) = native::set_priority(&handle, priority) {
            warn!(target: TAG, "Failed to set thread priority for {name}: {source}");
        }

        inner.workers.insert(
            name.to_owned(),
            WorkerEntry {
                control,
                handle: Some(handle),
                role,
                priority,
                pool: pool.map(str::to_owned),
            },
        );
        info!(target: TAG, "Created thread: {name}");
        Ok(())
    }

    /// Stop `name`, wait for its thread to exit and forget it.
    pub fn stop_worker(&self, name: &str) -> Result<(), ThreadError> {
        let (control, handle) = {
            let mut inner = self.inner.lock();
            match inner.workers.get_mut(name) {
                Some(entry) => (Arc::clone(&entry.control), entry.handle.take()),
                None => return logged(ThreadError::NotFound(name.to_owned())),
            }
        };

        let joiner = handle.is_some();
        finish(name, &control, handle);
        if !joiner {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        let ours = inner
            .workers
            .get(name)
            .is_some_and(|entry| Arc::ptr_eq(&entry.control, &control));
        let removed = if ours { inner.workers.remove(name) } else { None };
        if let Some(pool) = removed.and_then(|entry| entry.pool) {
            if let Some(pool) = inner.pools.get_mut(&pool) {
                pool.workers.retain(|worker| worker != name);
            }
        }
        info!(target: TAG, "Stopped thread: {name}");
        Ok(())
    }

    /// Park a running worker before its next iteration.
    pub fn pause_worker(&self, name: &str) -> Result<(), ThreadError> {
        let inner = self.inner.lock();
        let entry = match inner.workers.get(name) {
            Some(entry) => entry,
            None => return logged(ThreadError::NotFound(name.to_owned())),
        };

        let status = entry.control.status();
        if status != ThreadStatus::Running {
            return logged(ThreadError::InvalidStatus {
                name: name.to_owned(),
                status,
                action: "pause",
            });
        }
        entry.control.request_pause();
        info!(target: TAG, "Paused thread: {name}");
        Ok(())
    }

    pub fn resume_worker(&self, name: &str) -> Result<(), ThreadError> {
        let inner = self.inner.lock();
        let entry = match inner.workers.get(name) {
            Some(entry) => entry,
            None => return logged(ThreadError::NotFound(name.to_owned())),
        };

        let status = entry.control.status();
        if status != ThreadStatus::Paused {
            return logged(ThreadError::InvalidStatus {
                name: name.to_owned(),
                status,
                action: "resume",
            });
        }
        entry.control.request_resume();
        info!(target: TAG, "Resumed thread: {name}");
        Ok(())
    }

    pub fn status(&self, name: &str) -> Result<ThreadStatus, ThreadError> {
        match self.inner.lock().workers.get(name) {
            Some(entry) => Ok(entry.control.status()),
            None => logged(ThreadError::NotFound(name.to_owned())),
        }
    }

    pub fn role(&self, name: &str) -> Option<WorkerRole> {
        self.inner.lock().workers.get(name).map(|entry| entry.role)
    }

    pub fn priority(&self, name: &str) -> Option<ThreadPriority> {
        self.inner.lock().workers.get(name).map(|entry| entry.priority)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.inner.lock().workers.contains_key(name)
    }

    /// Workers currently `Running` or `Paused`.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn max_threads(&self) -> usize {
        self.inner.lock().max_threads
    }

    /// Names of every recorded worker, sorted.
    pub fn worker_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().workers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_priority(&self, name: &str, priority: ThreadPriority) -> Result<(), ThreadError> {
        let mut inner = self.inner.lock();
        let entry = match inner.workers.get_mut(name) {
            Some(entry) => entry,
            None => return logged(ThreadError::NotFound(name.to_owned())),
        };
        let Some(handle) = entry.handle.as_ref() else {
            return logged(ThreadError::InvalidStatus {
                name: name.to_owned(),
                status: entry.control.status(),
                action: "set priority",
            });
        };

        match native::set_priority(handle, priority) {
            Ok(()) => {
                entry.priority = priority;
                Ok(())
            }
            Err(source) => logged(ThreadError::Platform {
                name: name.to_owned(),
                what: "priority",
                source,
            }),
        }
    }

    /// Restrict `name` to the logical cores whose bits are set in `core_mask`.
    pub fn set_affinity(&self, name: &str, core_mask: u64) -> Result<(), ThreadError> {
        let inner = self.inner.lock();
        let entry = match inner.workers.get(name) {
            Some(entry) => entry,
            None => return logged(ThreadError::NotFound(name.to_owned())),
        };
        let Some(handle) = entry.handle.as_ref() else {
            return logged(ThreadError::InvalidStatus {
                name: name.to_owned(),
                status: entry.control.status(),
                action: "set affinity",
            });
        };

        native::set_affinity(handle, core_mask).or_else(|source| {
            logged(ThreadError::Platform {
                name: name.to_owned(),
                what: "affinity",
                source,
            })
        })
    }

    /// Stop and join every worker, drop every pool (queued tasks are discarded)
    /// and return to the uninitialized state. Idempotent.
    pub fn shutdown(&self) {
        let (workers, pools) = {
            let mut inner = self.inner.lock();
            if !inner.initialized {
                return;
            }
            inner.initialized = false;
            (mem::take(&mut inner.workers), mem::take(&mut inner.pools))
        };

        info!(target: TAG, "Shutting down");
        for entry in workers.values() {
            entry.control.request_stop();
        }
        for (name, entry) in workers {
            entry.stop_and_join(&name);
        }

        let discarded: usize = pools.values().map(|pool| pool.queue.drain().len()).sum();
        if discarded > 0 {
            warn!(target: TAG, "Discarded {discarded} queued tasks");
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock()
    }
}

/// Pull standalone workers whose body already returned out of the table.
fn reap_finished(inner: &mut RegistryInner) -> Vec<(String, WorkerEntry)> {
    let finished: Vec<String> = inner
        .workers
        .iter()
        .filter(|(_, entry)| entry.pool.is_none() && entry.control.status() == ThreadStatus::Stopped)
        .map(|(name, _)| name.clone())
        .collect();

    finished
        .into_iter()
        .filter_map(|name| inner.workers.remove(&name).map(|entry| (name, entry)))
        .collect()
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{Barrier, atomic::AtomicBool, mpsc},
        time::{Duration, Instant},
    };

    fn registry(max: usize) -> ThreadRegistry {
        let registry = ThreadRegistry::new();
        registry.initialize(max).unwrap();
        registry
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn zero_max_threads_uses_hardware_concurrency() {
        let registry = registry(0);
        assert_eq!(registry.max_threads(), num_cpus::get().max(2));
        assert!(matches!(registry.initialize(4), Err(ThreadError::AlreadyInitialized)));
    }

    #[test]
    fn shutdown_waits_for_a_worker_another_caller_is_joining() {
        let registry = Arc::new(registry(2));
        let busy = Arc::new(AtomicBool::new(false));
        {
            let busy = Arc::clone(&busy);
            registry
                .create_looping_worker(
                    "Slow",
                    move || {
                        busy.store(true, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(150));
                        busy.store(false, Ordering::SeqCst);
                    },
                    ThreadPriority::Normal,
                )
                .unwrap();
        }
        wait_until(|| busy.load(Ordering::SeqCst));

        let stopper = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.stop_worker("Slow"))
        };
        // Let the stopper take the handle and block in join.
        thread::sleep(Duration::from_millis(20));
        registry.shutdown();
        assert!(!busy.load(Ordering::SeqCst));
        assert_eq!(registry.active_count(), 0);
        let _ = stopper.join().unwrap();
    }

    #[test]
    fn uninitialized_registry_refuses_workers() {
        let registry = ThreadRegistry::new();
        let err = registry.create_worker("Early", || {}, ThreadPriority::Normal).unwrap_err();
        assert!(matches!(err, ThreadError::NotInitialized));
    }

    #[test]
    fn one_shot_worker_runs_and_reaches_stopped() {
        let registry = registry(4);
        let (tx, rx) = mpsc::channel();
        registry
            .create_worker("Loader", move || tx.send(42).unwrap(), ThreadPriority::Normal)
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 42);
        wait_until(|| registry.status("Loader").unwrap() == ThreadStatus::Stopped);
        assert_eq!(registry.role("Loader"), Some(WorkerRole::OneShot));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = registry(4);
        registry
            .create_looping_worker("Audio", || thread::sleep(Duration::from_millis(1)), ThreadPriority::Normal)
            .unwrap();
        let err = registry
            .create_looping_worker("Audio", || {}, ThreadPriority::Normal)
            .unwrap_err();
        assert!(matches!(err, ThreadError::NameTaken(name) if name == "Audio"));
    }

    #[test]
    fn cap_limits_live_workers() {
        let registry = registry(2);
        for name in ["A", "B"] {
            registry
                .create_looping_worker(name, || thread::sleep(Duration::from_millis(1)), ThreadPriority::Low)
                .unwrap();
        }
        let err = registry
            .create_looping_worker("C", || {}, ThreadPriority::Low)
            .unwrap_err();
        assert!(matches!(err, ThreadError::CapacityExceeded { requested: 3, max: 2 }));

        registry.stop_worker("A").unwrap();
        registry
            .create_looping_worker("C", || thread::sleep(Duration::from_millis(1)), ThreadPriority::Low)
            .unwrap();
        assert_eq!(registry.worker_names(), ["B", "C"]);
    }

    #[test]
    fn finished_one_shot_workers_free_their_slot_and_name() {
        let registry = registry(2);
        registry.create_worker("Once", || {}, ThreadPriority::Normal).unwrap();
        wait_until(|| registry.status("Once").unwrap() == ThreadStatus::Stopped);

        registry.create_worker("Once", || {}, ThreadPriority::Normal).unwrap();
        registry
            .create_looping_worker("Loop", || thread::sleep(Duration::from_millis(1)), ThreadPriority::Normal)
            .unwrap();
    }

    #[test]
    fn pause_and_resume_gate_progress() {
        let registry = registry(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::clone(&counter);
        registry
            .create_looping_worker(
                "Ticker",
                move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                },
                ThreadPriority::Normal,
            )
            .unwrap();

        wait_until(|| counter.load(Ordering::SeqCst) > 0);
        registry.pause_worker("Ticker").unwrap();
        wait_until(|| registry.status("Ticker").unwrap() == ThreadStatus::Paused);

        let parked_at = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), parked_at);
        assert_eq!(registry.active_count(), 1);

        registry.resume_worker("Ticker").unwrap();
        wait_until(|| counter.load(Ordering::SeqCst) > parked_at);

        registry.stop_worker("Ticker").unwrap();
        assert!(!registry.exists("Ticker"));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn pause_and_resume_require_matching_status() {
        let registry = registry(4);
        registry
            .create_looping_worker("Idle", || thread::sleep(Duration::from_millis(1)), ThreadPriority::Normal)
            .unwrap();
        wait_until(|| registry.status("Idle").unwrap() == ThreadStatus::Running);

        let err = registry.resume_worker("Idle").unwrap_err();
        assert!(matches!(
            err,
            ThreadError::InvalidStatus { status: ThreadStatus::Running, action: "resume", .. }
        ));

        registry.pause_worker("Idle").unwrap();
        wait_until(|| registry.status("Idle").unwrap() == ThreadStatus::Paused);
        let err = registry.pause_worker("Idle").unwrap_err();
        assert!(matches!(err, ThreadError::InvalidStatus { action: "pause", .. }));
    }

    #[test]
    fn stopping_a_paused_worker_unparks_it() {
        let registry = registry(4);
        registry
            .create_looping_worker("Sleeper", || thread::sleep(Duration::from_millis(1)), ThreadPriority::Normal)
            .unwrap();
        wait_until(|| registry.status("Sleeper").unwrap() == ThreadStatus::Running);
        registry.pause_worker("Sleeper").unwrap();
        wait_until(|| registry.status("Sleeper").unwrap() == ThreadStatus::Paused);

        registry.stop_worker("Sleeper").unwrap();
        assert!(!registry.exists("Sleeper"));
    }

    #[test]
    fn unknown_names_are_not_found() {
        let registry = registry(2);
        assert!(matches!(registry.stop_worker("ghost"), Err(ThreadError::NotFound(_))));
        assert!(matches!(registry.pause_worker("ghost"), Err(ThreadError::NotFound(_))));
        assert!(matches!(registry.status("ghost"), Err(ThreadError::NotFound(_))));
        assert!(matches!(
            registry.set_priority("ghost", ThreadPriority::High),
            Err(ThreadError::NotFound(_))
        ));
    }

    #[test]
    fn panicking_body_does_not_escape() {
        let registry = registry(2);
        registry
            .create_worker("Crash", || panic!("engine stalled"), ThreadPriority::Normal)
            .unwrap();
        wait_until(|| registry.status("Crash").unwrap() == ThreadStatus::Stopped);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn shutdown_stops_everything_and_is_idempotent() {
        let registry = registry(8);
        let barrier = Arc::new(Barrier::new(4));
        for i in 0..3 {
            let barrier = Arc::clone(&barrier);
            let mut first = true;
            registry
                .create_looping_worker(
                    &format!("Spinner{i}"),
                    move || {
                        if mem::take(&mut first) {
                            barrier.wait();
                        }
                        thread::sleep(Duration::from_millis(1));
                    },
                    ThreadPriority::Normal,
                )
                .unwrap();
        }
        barrier.wait();
        registry.pause_worker("Spinner0").unwrap();

        registry.shutdown();
        assert!(registry.worker_names().is_empty());
        assert_eq!(registry.active_count(), 0);
        assert!(!registry.is_initialized());

        registry.shutdown();
        registry.initialize(2).unwrap();
        assert_eq!(registry.max_threads(), 2);
    }

    #[test]
    fn set_priority_updates_recorded_priority() {
        let registry = registry(2);
        registry
            .create_looping_worker("Physics", || thread::sleep(Duration::from_millis(1)), ThreadPriority::Low)
            .unwrap();
        assert_eq!(registry.priority("Physics"), Some(ThreadPriority::Low));

        if registry.set_priority("Physics", ThreadPriority::Normal).is_ok() {
            assert_eq!(registry.priority("Physics"), Some(ThreadPriority::Normal));
        }
    }
}
