//! Scheduling priority of the input reader thread

use tracing::{debug, warn};

/// Nice value requested for the reader thread
#[cfg(target_os = "linux")]
const READER_NICE: libc::c_int = -10;

/// Raise the priority of the calling thread
///
/// Best effort: without CAP_SYS_NICE or a matching RLIMIT_NICE the kernel
/// refuses and the thread keeps its priority. Returns whether it worked.
#[cfg(target_os = "linux")]
pub fn boost_current_thread() -> bool {
    // On Linux PRIO_PROCESS with who=0 targets the calling thread only
    // SAFETY: setpriority has no memory-safety preconditions
    let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, READER_NICE) };
    if result == 0 {
        debug!("Reader thread running at nice {}", READER_NICE);
        true
    } else {
        warn!(
            "Unable to raise reader thread priority: {}",
            std::io::Error::last_os_error()
        );
        false
    }
}

/// Raise the priority of the calling thread
///
/// Not implemented on this platform; the reader runs at normal priority.
#[cfg(not(target_os = "linux"))]
pub fn boost_current_thread() -> bool {
    warn!(
        "Reader thread priority boost requested but not supported on {}, running at normal priority",
        std::env::consts::OS
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_boost_result_matches_thread_priority() {
        // own thread so the test runner's threads keep their nice value
        std::thread::spawn(|| {
            let before = unsafe { libc::getpriority(libc::PRIO_PROCESS, 0) };
            let boosted = boost_current_thread();
            let after = unsafe { libc::getpriority(libc::PRIO_PROCESS, 0) };
            if boosted {
                assert_eq!(after, READER_NICE);
            } else {
                assert_eq!(after, before);
            }
        })
        .join()
        .unwrap();
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_boost_unsupported_reports_false() {
        assert!(!boost_current_thread());
    }
}
