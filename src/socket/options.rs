use std::marker::PhantomData;
use std::mem::size_of;
use std::time::Duration;

use super::Socket;
use crate::error::{Result, SocketError};

/// A value that can be passed to `setsockopt()` and read back from
/// `getsockopt()`.
///
/// The implementation owns the wire layout, so call sites never deal with
/// sizes or casts.
pub trait OptionValue: Sized {
	/// Calls `f` with the bytes the kernel expects for this value.
	fn with_wire<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;

	/// Decodes what `getsockopt()` wrote. `None` if the size is unexpected.
	fn from_wire(bytes: &[u8]) -> Option<Self>;
}

/// Booleans travel as a 4-byte `int`.
///
/// `setsockopt()` reads an `int` for flag options; a one-byte `true` followed by
/// whatever happens to be next in memory is not a reliable 1.
impl OptionValue for bool {
	fn with_wire<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		let val: libc::c_int = if *self { 1 } else { 0 };
		f(&val.to_ne_bytes())
	}

	fn from_wire(bytes: &[u8]) -> Option<Self> {
		match bytes.len() {
			// A few IP-level options answer with a single byte.
			1 => Some(bytes[0] != 0),
			_ => libc::c_int::from_wire(bytes).map(|val| val != 0),
		}
	}
}

impl OptionValue for libc::c_int {
	fn with_wire<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		f(&self.to_ne_bytes())
	}

	fn from_wire(bytes: &[u8]) -> Option<Self> {
		bytes.try_into().ok().map(libc::c_int::from_ne_bytes)
	}
}

/// Seconds and microseconds in the native `timeval` layout.
///
/// Used for the `SO_RCVTIMEO`/`SO_SNDTIMEO` timeouts. Readiness waits take a
/// `Duration` instead and only see whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeValue {
	pub seconds: i64,
	pub microseconds: i64,
}

impl TimeValue {
	pub fn new(seconds: i64, microseconds: i64) -> Self {
		Self { seconds, microseconds }
	}

	fn to_timeval(self) -> libc::timeval {
		libc::timeval {
			tv_sec: self.seconds as libc::time_t,
			tv_usec: self.microseconds as libc::suseconds_t,
		}
	}
}

impl From<Duration> for TimeValue {
	fn from(duration: Duration) -> Self {
		Self {
			seconds: duration.as_secs().min(i64::MAX as u64) as i64,
			microseconds: duration.subsec_micros() as i64,
		}
	}
}

impl From<TimeValue> for Duration {
	fn from(value: TimeValue) -> Self {
		Duration::from_secs(value.seconds.max(0) as u64)
			+ Duration::from_micros(value.microseconds.max(0) as u64)
	}
}

impl OptionValue for TimeValue {
	fn with_wire<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		let raw = self.to_timeval();
		f(bytes_of(&raw))
	}

	fn from_wire(bytes: &[u8]) -> Option<Self> {
		let raw: libc::timeval = read_from(bytes)?;
		Some(Self {
			seconds: raw.tv_sec as i64,
			microseconds: raw.tv_usec as i64,
		})
	}
}

/// Behavior of `close()` with unsent data (`SO_LINGER`).
///
/// - `Off`: close returns at once, the kernel keeps sending in the background
/// - `Seconds(0)`: hard reset, unsent data is dropped
/// - `Seconds(n)`: close blocks up to `n` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linger {
	Off,
	Seconds(u32),
}

impl OptionValue for Linger {
	fn with_wire<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		let raw = match self {
			Linger::Off => libc::linger { l_onoff: 0, l_linger: 0 },
			Linger::Seconds(seconds) => libc::linger {
				l_onoff: 1,
				l_linger: *seconds as libc::c_int,
			},
		};
		f(bytes_of(&raw))
	}

	fn from_wire(bytes: &[u8]) -> Option<Self> {
		let raw: libc::linger = read_from(bytes)?;
		if raw.l_onoff == 0 {
			Some(Linger::Off)
		} else {
			Some(Linger::Seconds(raw.l_linger.max(0) as u32))
		}
	}
}

fn bytes_of<T: Copy>(value: &T) -> &[u8] {
	unsafe { std::slice::from_raw_parts(value as *const T as *const u8, size_of::<T>()) }
}

fn read_from<T: Copy>(bytes: &[u8]) -> Option<T> {
	if bytes.len() != size_of::<T>() {
		return None;
	}
	Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

/// A socket option key: level, name and the type of its value.
///
/// Any platform option can be described with [`SocketOption::new`]:
///
/// ```
/// use sockline::SocketOption;
///
/// const RECV_LOW_WATER: SocketOption<i32> =
///     SocketOption::new(libc::SOL_SOCKET, libc::SO_RCVLOWAT, "SO_RCVLOWAT");
/// ```
pub struct SocketOption<T> {
	level: libc::c_int,
	name: libc::c_int,
	label: &'static str,
	_value: PhantomData<fn() -> T>,
}

impl<T> SocketOption<T> {
	pub const fn new(level: libc::c_int, name: libc::c_int, label: &'static str) -> Self {
		Self { level, name, label, _value: PhantomData }
	}

	pub fn level(&self) -> libc::c_int {
		self.level
	}

	pub fn name(&self) -> libc::c_int {
		self.name
	}

	/// The option's C name, used in error messages.
	pub fn label(&self) -> &'static str {
		self.label
	}
}

impl<T> Clone for SocketOption<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for SocketOption<T> {}

impl<T> std::fmt::Debug for SocketOption<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label)
	}
}

/// Allows binding to an address still in TIME_WAIT. Essential for server restarts.
pub const REUSE_ADDRESS: SocketOption<bool> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_REUSEADDR, "SO_REUSEADDR");

/// Lets several sockets bind the same port.
pub const REUSE_PORT: SocketOption<bool> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_REUSEPORT, "SO_REUSEPORT");

/// Kernel probes idle connections to detect dead peers.
pub const KEEP_ALIVE: SocketOption<bool> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_KEEPALIVE, "SO_KEEPALIVE");

pub const BROADCAST: SocketOption<bool> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_BROADCAST, "SO_BROADCAST");

/// Disables Nagle's algorithm.
pub const NO_DELAY: SocketOption<bool> =
	SocketOption::new(libc::IPPROTO_TCP, libc::TCP_NODELAY, "TCP_NODELAY");

/// Receive buffer size in bytes. Linux doubles the value internally.
pub const RECV_BUFFER: SocketOption<libc::c_int> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_RCVBUF, "SO_RCVBUF");

/// Send buffer size in bytes. Linux doubles the value internally.
pub const SEND_BUFFER: SocketOption<libc::c_int> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_SNDBUF, "SO_SNDBUF");

pub const RECV_TIMEOUT: SocketOption<TimeValue> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_RCVTIMEO, "SO_RCVTIMEO");

pub const SEND_TIMEOUT: SocketOption<TimeValue> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_SNDTIMEO, "SO_SNDTIMEO");

pub const LINGER: SocketOption<Linger> =
	SocketOption::new(libc::SOL_SOCKET, libc::SO_LINGER, "SO_LINGER");

impl Socket {
	/// Sets a socket option.
	pub fn set_option<T: OptionValue>(&self, option: SocketOption<T>, value: T) -> Result<()> {
		let fd = self.as_raw_fd();
		value.with_wire(|bytes| {
			syscall!(setsockopt(
				fd,
				option.level,
				option.name,
				bytes.as_ptr() as *const libc::c_void,
				bytes.len() as libc::socklen_t,
			))
		})?;
		Ok(())
	}

	/// Reads a socket option back.
	pub fn option<T: OptionValue>(&self, option: SocketOption<T>) -> Result<T> {
		// Large enough for every value type defined here.
		let mut buf = [0u8; 32];
		let mut len = buf.len() as libc::socklen_t;
		syscall!(getsockopt(
			self.as_raw_fd(),
			option.level,
			option.name,
			buf.as_mut_ptr() as *mut libc::c_void,
			&mut len,
		))?;
		let len = (len as usize).min(buf.len());
		T::from_wire(&buf[..len]).ok_or(SocketError::OptionLength { option: option.label, len })
	}
}
