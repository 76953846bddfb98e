use std::time::{Duration, Instant};

use bitflags::bitflags;

use super::Socket;
use crate::error::{Result, SocketError};

bitflags! {
	/// Readiness conditions for [`Socket::wait`].
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct WaitOption: libc::c_short {
		/// Data can be read, or a connection is pending on a listener.
		const READ = libc::POLLIN;
		/// Send buffer space is available.
		const WRITE = libc::POLLOUT;
	}
}

/// Converts a wait timeout to whole milliseconds for `poll()`.
///
/// Anything below a millisecond is dropped; anything above `c_int::MAX`
/// milliseconds is clamped.
fn timeout_millis(timeout: Duration) -> libc::c_int {
	timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int
}

impl Socket {
	/// Blocks until the socket satisfies `options` or `timeout` elapses.
	///
	/// Returns `Ok(true)` when the descriptor became ready and `Ok(false)` on
	/// timeout. With `retry_on_interrupt` an `EINTR` restarts the wait for
	/// whatever is left of `timeout` instead of being reported.
	pub fn wait(&self, options: WaitOption, timeout: Duration, retry_on_interrupt: bool) -> Result<bool> {
		let mut pfd = libc::pollfd {
			fd: self.as_raw_fd(),
			events: options.bits(),
			revents: 0,
		};
		let deadline = Instant::now().checked_add(timeout);
		let mut millis = timeout_millis(timeout);

		loop {
			match syscall!(poll(&mut pfd, 1, millis)) {
				Ok(0) => return Ok(false),
				Ok(_) => return Ok(true),
				Err(SocketError::System { errno: libc::EINTR, .. }) if retry_on_interrupt => {
					trace!("poll() on fd {} interrupted, retrying", pfd.fd);
					pfd.revents = 0;
					if let Some(deadline) = deadline {
						millis = timeout_millis(deadline.saturating_duration_since(Instant::now()));
					}
				}
				Err(err) => return Err(err),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flags_map_onto_poll_events() {
		assert_eq!(WaitOption::READ.bits(), libc::POLLIN);
		assert_eq!(WaitOption::WRITE.bits(), libc::POLLOUT);
		let both = WaitOption::READ | WaitOption::WRITE;
		assert!(both.contains(WaitOption::READ) && both.contains(WaitOption::WRITE));
	}

	#[test]
	fn sub_millisecond_timeouts_truncate() {
		assert_eq!(timeout_millis(Duration::from_micros(999)), 0);
		assert_eq!(timeout_millis(Duration::from_millis(100)), 100);
		assert_eq!(timeout_millis(Duration::from_secs_f64(0.1)), 100);
		assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), libc::c_int::MAX);
	}
}
