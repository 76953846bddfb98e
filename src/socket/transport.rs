//! The transport-security hook.
//!
//! This crate does not implement TLS. A session type implements
//! [`SecureTransport`] on top of the raw descriptor, and a configuration type
//! implementing [`TlsConfig`] builds one for [`Socket::start_tls`].
//!
//! [`Socket::start_tls`]: crate::Socket::start_tls

use std::os::fd::RawFd;

use crate::error::{Result, SocketError, TlsError};
use crate::sys;

/// An encrypted session running over a socket's descriptor.
///
/// Once attached, every `read`/`write` on the socket goes through the
/// session instead of the descriptor.
pub trait SecureTransport: Send {
	fn handshake(&mut self) -> std::result::Result<(), TlsError>;

	fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TlsError>;

	fn write(&mut self, buf: &[u8]) -> std::result::Result<usize, TlsError>;

	/// Session shutdown. Runs before the descriptor is closed; failures are
	/// the session's business.
	fn close(&mut self);
}

/// Builds sessions for [`Socket::start_tls`](crate::Socket::start_tls).
///
/// The session uses the descriptor for as long as the socket lives but does
/// not own it: the socket closes it after [`SecureTransport::close`].
pub trait TlsConfig {
	type Session: SecureTransport + 'static;

	fn session(&self, fd: RawFd) -> std::result::Result<Self::Session, TlsError>;
}

/// Where a socket's bytes go.
pub(crate) enum Transport {
	Raw,
	Secure(Box<dyn SecureTransport>),
}

impl Transport {
	pub(crate) fn is_secure(&self) -> bool {
		matches!(self, Transport::Secure(_))
	}

	pub(crate) fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> Result<usize> {
		match self {
			Transport::Raw => {
				let n = syscall!(recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0))?;
				Ok(n as usize)
			}
			Transport::Secure(session) => session.read(buf).map_err(SocketError::Tls),
		}
	}

	pub(crate) fn write(&mut self, fd: RawFd, buf: &[u8]) -> Result<usize> {
		match self {
			Transport::Raw => {
				let n = syscall!(send(
					fd,
					buf.as_ptr() as *const libc::c_void,
					buf.len(),
					sys::SEND_FLAGS,
				))?;
				// -1 was handled above; 0 is still a failed send.
				if n <= 0 {
					return Err(SocketError::WriteZero);
				}
				Ok(n as usize)
			}
			Transport::Secure(session) => session.write(buf).map_err(SocketError::Tls),
		}
	}

	/// Shuts the session down, if any, and falls back to raw.
	pub(crate) fn close(&mut self) {
		if let Transport::Secure(mut session) = std::mem::replace(self, Transport::Raw) {
			session.close();
		}
	}
}
