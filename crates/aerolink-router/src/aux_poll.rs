//! # Auxiliary Channel Poller
//!
//! Side-band firmware delivers telemetry on a secondary capture handle
//! per interface. The poller multiplexes readiness checks over all open
//! handles with a single bounded `select()` call, rate-limited so the
//! main loop never burns cycles polling faster than data can arrive.

use std::os::unix::io::RawFd;

/// Minimum spacing between readiness checks.
pub const AUX_POLL_FLOOR_MS: u64 = 50;

/// `select()` timeout. Bounds the longest the main loop blocks on aux I/O.
pub const AUX_POLL_TIMEOUT_US: i64 = 100;

/// Readiness poller over the per-interface auxiliary handles.
///
/// Owned by the main loop; no other thread touches the handle array or
/// the ready set. Calls between rate-limit windows return the previous
/// check's results, which is acceptable because the 50 ms floor bounds
/// staleness.
#[derive(Debug)]
pub struct AuxChannelPoller {
    handles: Vec<Option<RawFd>>,
    signaled: Vec<bool>,
    last_check_ms: Option<u64>,
    last_ready_count: usize,
}

impl AuxChannelPoller {
    pub fn new(interface_count: usize) -> Self {
        AuxChannelPoller {
            handles: vec![None; interface_count],
            signaled: vec![false; interface_count],
            last_check_ms: None,
            last_ready_count: 0,
        }
    }

    pub fn set_handle(&mut self, interface: usize, fd: RawFd) {
        if let Some(slot) = self.handles.get_mut(interface) {
            *slot = Some(fd);
        }
    }

    pub fn handle(&self, interface: usize) -> Option<RawFd> {
        self.handles.get(interface).copied().flatten()
    }

    pub fn take_handle(&mut self, interface: usize) -> Option<RawFd> {
        self.handles.get_mut(interface).and_then(|slot| slot.take())
    }

    /// Drop every handle reference without closing the fds. Closing is
    /// the backend's job.
    pub fn clear(&mut self) {
        for slot in &mut self.handles {
            *slot = None;
        }
        for s in &mut self.signaled {
            *s = false;
        }
        self.last_ready_count = 0;
    }

    /// Check which auxiliary handles have data ready. Returns the ready
    /// count; within the 50 ms floor of the previous check it returns
    /// the cached result without touching the kernel.
    pub fn check_readable(&mut self, now_ms: u64) -> usize {
        if let Some(last) = self.last_check_ms {
            if now_ms.saturating_sub(last) < AUX_POLL_FLOOR_MS {
                return self.last_ready_count;
            }
        }
        self.last_check_ms = Some(now_ms);

        for s in &mut self.signaled {
            *s = false;
        }
        self.last_ready_count = 0;

        let mut max_fd: RawFd = -1;
        let mut read_set: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe {
            libc::FD_ZERO(&mut read_set);
        }
        let mut any = false;
        for fd in self.handles.iter().flatten() {
            unsafe {
                libc::FD_SET(*fd, &mut read_set);
            }
            max_fd = max_fd.max(*fd);
            any = true;
        }
        if !any {
            return 0;
        }

        let mut timeout = libc::timeval {
            tv_sec: 0,
            tv_usec: AUX_POLL_TIMEOUT_US as libc::suseconds_t,
        };
        let ready = unsafe {
            libc::select(
                max_fd + 1,
                &mut read_set,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut timeout,
            )
        };
        // Negative (EINTR and friends) counts as nothing ready.
        if ready <= 0 {
            return 0;
        }

        for (i, fd) in self.handles.iter().enumerate() {
            if let Some(fd) = fd {
                if unsafe { libc::FD_ISSET(*fd, &read_set) } {
                    self.signaled[i] = true;
                }
            }
        }
        self.last_ready_count = ready as usize;
        self.last_ready_count
    }

    /// Whether `interface`'s handle was ready in the most recent check.
    pub fn is_signaled(&self, interface: usize) -> bool {
        self.signaled.get(interface).copied().unwrap_or(false)
    }
}
