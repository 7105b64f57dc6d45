//! Platform scheduling calls for spawned workers.

use std::{io, thread::JoinHandle};

use super::ThreadPriority;

/// POSIX scheduling for `priority`, given the thread's current `policy`, the
/// real-time policy to switch to, and a lookup of `(min, max)` priorities per
/// policy. Returns `(policy, sched_priority)`.
///
/// `Low`, `Normal` and `High` keep the current policy at its minimum, midpoint and
/// one below its maximum. `RealTime` switches to `realtime_policy` at its maximum.
pub fn posix_sched_param(
    priority: ThreadPriority,
    policy: i32,
    realtime_policy: i32,
    bounds: impl Fn(i32) -> (i32, i32),
) -> (i32, i32) {
    let (min, max) = bounds(policy);
    match priority {
        ThreadPriority::Low => (policy, min),
        ThreadPriority::Normal => (policy, (min + max) / 2),
        ThreadPriority::High => (policy, (max - 1).max(min)),
        ThreadPriority::RealTime => (realtime_policy, bounds(realtime_policy).1),
    }
}

#[cfg(unix)]
pub(super) fn set_priority(handle: &JoinHandle<()>, priority: ThreadPriority) -> io::Result<()> {
    use std::os::unix::thread::JoinHandleExt;

    let thread = handle.as_pthread_t();
    let mut policy: libc::c_int = 0;
    // SAFETY: zeroed is a valid bit pattern for the plain C struct.
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };

    // SAFETY: `thread` belongs to a live, unjoined `JoinHandle`.
    let rc = unsafe { libc::pthread_getschedparam(thread, &mut policy, &mut param) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }

    let (policy, sched_priority) = posix_sched_param(priority, policy, libc::SCHED_RR, |policy| {
        // SAFETY: pure queries with no pointer arguments.
        unsafe {
            (
                libc::sched_get_priority_min(policy),
                libc::sched_get_priority_max(policy),
            )
        }
    });
    param.sched_priority = sched_priority;

    // SAFETY: as above; `param` is fully initialized.
    let rc = unsafe { libc::pthread_setschedparam(thread, policy, &param) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

#[cfg(target_os = "linux")]
pub(super) fn set_affinity(handle: &JoinHandle<()>, core_mask: u64) -> io::Result<()> {
    use std::os::unix::thread::JoinHandleExt;

    if core_mask == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty core mask"));
    }

    // SAFETY: an all-zero cpu_set_t is the empty set.
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    for core in 0..u64::BITS as usize {
        if core_mask & (1 << core) != 0 {
            // SAFETY: `core` < 64, well inside CPU_SETSIZE.
            unsafe { libc::CPU_SET(core, &mut set) };
        }
    }

    // SAFETY: `set` outlives the call and the size matches its type.
    let rc = unsafe {
        libc::pthread_setaffinity_np(
            handle.as_pthread_t(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &set,
        )
    };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

#[cfg(all(unix, not(target_os = "linux")))]
pub(super) fn set_affinity(_handle: &JoinHandle<()>, _core_mask: u64) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread affinity is not supported on this platform",
    ))
}

#[cfg(windows)]
pub(super) fn set_priority(handle: &JoinHandle<()>, priority: ThreadPriority) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::System::Threading::{
        SetThreadPriority, THREAD_PRIORITY_ABOVE_NORMAL, THREAD_PRIORITY_BELOW_NORMAL,
        THREAD_PRIORITY_HIGHEST, THREAD_PRIORITY_NORMAL,
    };

    let value = match priority {
        ThreadPriority::Low => THREAD_PRIORITY_BELOW_NORMAL,
        ThreadPriority::Normal => THREAD_PRIORITY_NORMAL,
        ThreadPriority::High => THREAD_PRIORITY_ABOVE_NORMAL,
        ThreadPriority::RealTime => THREAD_PRIORITY_HIGHEST,
    };

    // SAFETY: the handle stays open for as long as `handle` is alive.
    if unsafe { SetThreadPriority(handle.as_raw_handle(), value) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
pub(super) fn set_affinity(handle: &JoinHandle<()>, core_mask: u64) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::System::Threading::SetThreadAffinityMask;

    // SAFETY: as in `set_priority`.
    if unsafe { SetThreadAffinityMask(handle.as_raw_handle(), core_mask as usize) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
pub(super) fn set_priority(_handle: &JoinHandle<()>, _priority: ThreadPriority) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread priority is not supported on this platform",
    ))
}

#[cfg(not(any(unix, windows)))]
pub(super) fn set_affinity(_handle: &JoinHandle<()>, _core_mask: u64) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread affinity is not supported on this platform",
    ))
}
