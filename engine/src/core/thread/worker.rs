use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use super::{TAG, ThreadStatus, WorkerRole};
use crate::sync::AtomicState;

/// Boxed worker body. One-shot bodies are adapted to this shape by the registry.
pub(crate) type Body = Box<dyn FnMut() + Send + 'static>;

/// Lifecycle state shared between the registry and the worker thread.
pub(crate) struct WorkerControl {
    name: String,
    status: AtomicState<ThreadStatus>,
    stop: AtomicBool,
    paused: Mutex<bool>,
    unpark: Condvar,
    /// Set by whoever joined the thread
    joined: Mutex<bool>,
    joined_signal: Condvar,
    thread: OnceLock<ThreadId>,
}

impl WorkerControl {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: AtomicState::new(ThreadStatus::Idle),
            stop: AtomicBool::new(false),
            paused: Mutex::new(false),
            unpark: Condvar::new(),
            joined: Mutex::new(false),
            joined_signal: Condvar::new(),
            thread: OnceLock::new(),
        }
    }

    pub(crate) fn status(&self) -> ThreadStatus {
        self.status.get()
    }

    /// Record that the thread has been joined and wake every
    /// [`wait_joined`](Self::wait_joined) caller.
    pub(crate) fn mark_joined(&self) {
        self.status.set(ThreadStatus::Stopped);
        *self.joined.lock() = true;
        self.joined_signal.notify_all();
    }

    /// Block until another caller has joined the thread. Returns at once when
    /// called from the worker itself.
    pub(crate) fn wait_joined(&self) {
        if self.thread.get() == Some(&thread::current().id()) {
            return;
        }
        let mut joined = self.joined.lock();
        while !*joined {
            self.joined_signal.wait(&mut joined);
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Ask the worker to exit and wake it if it is parked.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        let mut paused = self.paused.lock();
        *paused = false;
        self.unpark.notify_all();
    }

    pub(crate) fn request_pause(&self) {
        *self.paused.lock() = true;
    }

    pub(crate) fn request_resume(&self) {
        let mut paused = self.paused.lock();
        *paused = false;
        self.unpark.notify_all();
    }

    /// Park while a pause is pending. Returns `false` if the worker should exit.
    fn park_if_paused(&self) -> bool {
        let mut paused = self.paused.lock();
        if *paused {
            self.status.set(ThreadStatus::Paused);
            while *paused && !self.stop_requested() {
                self.unpark.wait(&mut paused);
            }
            self.status.set(ThreadStatus::Running);
        }
        !self.stop_requested()
    }
}

/// Wrapper protocol executed on every worker thread.
pub(crate) fn run(control: Arc<WorkerControl>, mut body: Body, role: WorkerRole, active: Arc<AtomicUsize>) {
    let _ = control.thread.set(thread::current().id());
    control.status.set(ThreadStatus::Running);
    active.fetch_add(1, Ordering::AcqRel);
    debug!(target: TAG, "Thread started: {}", control.name);

    while !control.stop_requested() {
        if !control.park_if_paused() {
            break;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body())) {
            error!(
                target: TAG,
                "Panic in thread {}: {}",
                control.name,
                panic_message(payload.as_ref())
            );
        }

        if role == WorkerRole::OneShot {
            break;
        }
    }

    control.status.set(ThreadStatus::Stopping);
    debug!(target: TAG, "Thread stopping: {}", control.name);
    active.fetch_sub(1, Ordering::AcqRel);
    control.status.set(ThreadStatus::Stopped);
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    fn spawn(role: WorkerRole, body: Body) -> (Arc<WorkerControl>, Arc<AtomicUsize>, thread::JoinHandle<()>) {
        let control = Arc::new(WorkerControl::new("Watcher"));
        let active = Arc::new(AtomicUsize::new(0));
        let handle = {
            let control = Arc::clone(&control);
            let active = Arc::clone(&active);
            thread::spawn(move || run(control, body, role, active))
        };
        (control, active, handle)
    }

    fn wait_for(control: &WorkerControl, status: ThreadStatus) {
        for _ in 0..500 {
            if control.status() == status {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("worker never reached {status:?}");
    }

    #[test]
    fn one_shot_body_runs_once_then_stops() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (control, active, handle) = spawn(
            WorkerRole::OneShot,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.join().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(control.status(), ThreadStatus::Stopped);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_looping_body_keeps_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (control, _active, handle) = spawn(
            WorkerRole::Looping,
            Box::new(move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first lap crash");
                }
                thread::sleep(Duration::from_millis(1));
            }),
        );

        while calls.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        control.request_stop();
        handle.join().unwrap();
        assert_eq!(control.status(), ThreadStatus::Stopped);
    }

    #[test]
    fn paused_worker_wakes_on_stop() {
        let (control, active, handle) = spawn(
            WorkerRole::Looping,
            Box::new(|| thread::sleep(Duration::from_millis(1))),
        );

        wait_for(&control, ThreadStatus::Running);
        control.request_pause();
        wait_for(&control, ThreadStatus::Paused);
        assert_eq!(active.load(Ordering::SeqCst), 1);

        control.request_stop();
        handle.join().unwrap();
        assert_eq!(control.status(), ThreadStatus::Stopped);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panic_payload_text() {
        let payload = panic::catch_unwind(|| panic!("lap {}", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "lap 3");
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");
    }
}
