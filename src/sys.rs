//! Syscall plumbing and everything that depends on the platform's layout.
//!
//! Every descriptor-touching call in the crate goes through [`cvt`], usually
//! via the `syscall!` macro, so a `-1` result and its errno are turned into a
//! [`SocketError::System`] in one place.

use std::mem::size_of;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use crate::error::{Result, SocketError, errno};

/// Integer results that use `-1` as their failure sentinel.
pub(crate) trait Sentinel: Copy {
	fn is_failure(self) -> bool;
}

impl Sentinel for i32 {
	#[inline]
	fn is_failure(self) -> bool {
		self == -1
	}
}

impl Sentinel for isize {
	#[inline]
	fn is_failure(self) -> bool {
		self == -1
	}
}

/// Runs `f` once and converts the failure sentinel into an error.
///
/// errno is read straight after `f` returns, before anything else can
/// overwrite it.
#[inline]
pub(crate) fn cvt<T: Sentinel, F: FnOnce() -> T>(call: &'static str, f: F) -> Result<T> {
	let result = f();
	if result.is_failure() {
		Err(SocketError::System { call, errno: errno() })
	} else {
		Ok(result)
	}
}

/// `syscall!(bind(fd, ptr, len))` calls `libc::bind` through [`cvt`], naming
/// the error after the function.
macro_rules! syscall {
	($fn:ident ( $($arg:expr),* $(,)? )) => {
		$crate::sys::cvt(stringify!($fn), || unsafe { libc::$fn($($arg),*) })
	};
}

/// Bytes needed before the family tag of a socket address can be read.
pub(crate) const FAMILY_HEADER_LEN: usize =
	std::mem::offset_of!(libc::sockaddr, sa_family) + size_of::<libc::sa_family_t>();

/// Reads the family tag from the front of a raw socket address.
pub(crate) fn family_tag(bytes: &[u8]) -> Option<libc::c_int> {
	if bytes.len() < FAMILY_HEADER_LEN {
		return None;
	}
	let offset = std::mem::offset_of!(libc::sockaddr, sa_family);
	let mut tag = [0u8; size_of::<libc::sa_family_t>()];
	tag.copy_from_slice(&bytes[offset..FAMILY_HEADER_LEN]);
	Some(libc::sa_family_t::from_ne_bytes(tag) as libc::c_int)
}

/// Builds a native `sockaddr_in`. `ip` is in network order.
pub(crate) fn sockaddr_in(port: u16, ip: [u8; 4]) -> libc::sockaddr_in {
	let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
	#[cfg(any(
		target_os = "macos",
		target_os = "ios",
		target_os = "freebsd",
		target_os = "openbsd",
		target_os = "netbsd",
		target_os = "dragonfly"
	))]
	{
		raw.sin_len = size_of::<libc::sockaddr_in>() as u8;
	}
	raw.sin_family = libc::AF_INET as libc::sa_family_t;
	raw.sin_port = port.to_be();
	raw.sin_addr = libc::in_addr { s_addr: u32::from_ne_bytes(ip) };
	raw
}

/// Builds a native `sockaddr_in6` with zero flow info.
pub(crate) fn sockaddr_in6(port: u16, ip: [u8; 16], scope_id: u32) -> libc::sockaddr_in6 {
	let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
	#[cfg(any(
		target_os = "macos",
		target_os = "ios",
		target_os = "freebsd",
		target_os = "openbsd",
		target_os = "netbsd",
		target_os = "dragonfly"
	))]
	{
		raw.sin6_len = size_of::<libc::sockaddr_in6>() as u8;
	}
	raw.sin6_family = libc::AF_INET6 as libc::sa_family_t;
	raw.sin6_port = port.to_be();
	raw.sin6_addr = libc::in6_addr { s6_addr: ip };
	raw.sin6_scope_id = scope_id;
	raw
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
pub(crate) const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub(crate) const SEND_FLAGS: libc::c_int = 0;

/// Opens a close-on-exec socket.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
pub(crate) fn socket(family: libc::c_int, ty: libc::c_int, protocol: libc::c_int) -> Result<OwnedFd> {
	let fd = syscall!(socket(family, ty | libc::SOCK_CLOEXEC, protocol))?;
	Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub(crate) fn socket(family: libc::c_int, ty: libc::c_int, protocol: libc::c_int) -> Result<OwnedFd> {
	let fd = syscall!(socket(family, ty, protocol))?;
	let fd = unsafe { OwnedFd::from_raw_fd(fd) };
	set_cloexec(std::os::fd::AsRawFd::as_raw_fd(&fd))?;
	Ok(fd)
}

/// Accepts a pending connection as a close-on-exec descriptor.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
pub(crate) fn accept(fd: RawFd) -> Result<OwnedFd> {
	let accepted = syscall!(accept4(fd, std::ptr::null_mut(), std::ptr::null_mut(), libc::SOCK_CLOEXEC))?;
	Ok(unsafe { OwnedFd::from_raw_fd(accepted) })
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub(crate) fn accept(fd: RawFd) -> Result<OwnedFd> {
	let accepted = syscall!(accept(fd, std::ptr::null_mut(), std::ptr::null_mut()))?;
	let accepted = unsafe { OwnedFd::from_raw_fd(accepted) };
	set_cloexec(std::os::fd::AsRawFd::as_raw_fd(&accepted))?;
	Ok(accepted)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn set_cloexec(fd: RawFd) -> Result<()> {
	syscall!(fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cvt_passes_through_success() {
		assert_eq!(cvt("test", || 7i32).unwrap(), 7);
		assert_eq!(cvt("test", || 0isize).unwrap(), 0);
	}

	#[test]
	fn cvt_captures_errno_of_failing_call() {
		let err = syscall!(close(-1)).unwrap_err();
		match err {
			SocketError::System { call, errno } => {
				assert_eq!(call, "close");
				assert_eq!(errno, libc::EBADF);
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn family_tag_needs_full_header() {
		let raw = sockaddr_in(80, [10, 0, 0, 1]);
		let bytes = unsafe {
			std::slice::from_raw_parts(&raw as *const _ as *const u8, size_of::<libc::sockaddr_in>())
		};
		assert_eq!(family_tag(bytes), Some(libc::AF_INET));
		assert_eq!(family_tag(&bytes[..FAMILY_HEADER_LEN - 1]), None);
	}

	#[test]
	fn sockaddr_in_is_network_order() {
		let raw = sockaddr_in(0x1f90, [127, 0, 0, 1]);
		assert_eq!(raw.sin_port.to_ne_bytes(), [0x1f, 0x90]);
		assert_eq!(raw.sin_addr.s_addr.to_ne_bytes(), [127, 0, 0, 1]);
	}
}
