mod builder;
mod kind;
mod stream;
mod transport;
mod wait;
pub mod options;

pub use self::builder::{BufferConfig, ConnectorBuilder, ListenerBuilder, ReuseConfig, TcpConfig};
pub use self::kind::SocketKind;
pub use self::options::{Linger, OptionValue, SocketOption, TimeValue};
pub use self::transport::{SecureTransport, TlsConfig};
pub use self::wait::WaitOption;

use std::mem::ManuallyDrop;
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use crate::addr::{Address, Family};
use crate::error::{Result, SocketError};
use crate::sys;
use self::transport::Transport;

/// Pending-connection queue length used when none is given.
pub const MAX_BACKLOG: i32 = libc::SOMAXCONN;

/// Socket type passed to `socket()`.
///
/// - `Stream`: reliable, ordered byte stream (TCP-like)
/// - `Datagram`: unreliable, unordered packets (UDP-like)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SockType {
	#[default]
	Stream,
	Datagram,
	Raw,
	Other(libc::c_int),
}

impl SockType {
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			SockType::Stream => libc::SOCK_STREAM,
			SockType::Datagram => libc::SOCK_DGRAM,
			SockType::Raw => libc::SOCK_RAW,
			SockType::Other(raw) => raw,
		}
	}
}

/// Protocol passed to `socket()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
	/// Let the kernel pick the protocol for the family and type.
	Default,
	#[default]
	Tcp,
	Udp,
	Other(libc::c_int),
}

impl Protocol {
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Protocol::Default => 0,
			Protocol::Tcp => libc::IPPROTO_TCP,
			Protocol::Udp => libc::IPPROTO_UDP,
			Protocol::Other(raw) => raw,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
	Read,      // SHUT_RD
	Write,     // SHUT_WR
	ReadWrite, // SHUT_RDWR
}

/// A blocking socket.
///
/// Owns its descriptor and, after [`Socket::start_tls`], the security session
/// running over it. Dropping the socket (or calling [`Socket::close`]) shuts
/// the session down first and then closes the descriptor, exactly once.
///
/// Every call blocks the calling thread. There is no way to cancel a
/// `read`, `write`, `connect` or `accept` once it has been issued; use
/// [`Socket::wait`] with a timeout first if the caller must not hang.
pub struct Socket {
	fd: RawFd,
	transport: Transport,
}

impl Socket {
	/// Asks the kernel for a new descriptor.
	///
	/// The descriptor is created close-on-exec.
	pub fn create(family: Family, ty: SockType, protocol: Protocol) -> Result<Self> {
		let fd = sys::socket(family.raw(), ty.raw(), protocol.raw())?;
		let socket = Self::wrap(fd);
		trace!("created fd {} ({}, {:?}, {:?})", socket.fd, family, ty, protocol);
		Ok(socket)
	}

	/// A TCP stream socket for `family`.
	pub fn tcp(family: Family) -> Result<Self> {
		Self::create(family, SockType::Stream, Protocol::Tcp)
	}

	/// Takes ownership of an open descriptor. It is not validated.
	pub fn wrap(fd: OwnedFd) -> Self {
		Self {
			fd: fd.into_raw_fd(),
			transport: Transport::Raw,
		}
	}

	/// Returns the raw file descriptor.
	///
	/// Used internally for syscalls. Does not transfer ownership.
	#[inline]
	pub fn as_raw_fd(&self) -> RawFd {
		self.fd
	}

	/// True once a security session is attached.
	pub fn is_secure(&self) -> bool {
		self.transport.is_secure()
	}

	pub fn bind(&self, address: &Address) -> Result<()> {
		syscall!(bind(self.fd, address.as_ptr(), address.socklen()))?;
		Ok(())
	}

	/// Encodes the address and binds to it.
	pub fn bind_to(&self, family: Family, port: u16, address: Option<&str>) -> Result<()> {
		self.bind(&Address::encode(family, port, address)?)
	}

	pub fn connect(&self, address: &Address) -> Result<()> {
		syscall!(connect(self.fd, address.as_ptr(), address.socklen()))?;
		Ok(())
	}

	/// Encodes the address and connects to it.
	pub fn connect_to(&self, family: Family, port: u16, address: Option<&str>) -> Result<()> {
		self.connect(&Address::encode(family, port, address)?)
	}

	/// Marks the socket as passive.
	///
	/// `backlog` is the pending-connection queue size; [`MAX_BACKLOG`] is the
	/// platform maximum.
	pub fn listen(&self, backlog: i32) -> Result<()> {
		syscall!(listen(self.fd, backlog))?;
		Ok(())
	}

	/// Blocks until a connection is pending and accepts it.
	///
	/// To get the caller's own wrapper type back, use
	/// [`SocketKind::accept`].
	pub fn accept(&self) -> Result<Socket> {
		let fd = sys::accept(self.fd)?;
		let socket = Self::wrap(fd);
		debug!("accepted fd {} on fd {}", socket.fd, self.fd);
		Ok(socket)
	}

	/// Creates a TCP socket, enables address reuse, binds and listens.
	///
	/// Reuse is set strictly before bind. `backlog` defaults to
	/// [`MAX_BACKLOG`].
	pub fn tcp_listening(port: u16, family: Family, address: Option<&str>, backlog: Option<i32>) -> Result<Self> {
		ListenerBuilder::new()
			.backlog(backlog.unwrap_or(MAX_BACKLOG))
			.bind_to(family, port, address)
	}

	/// Attaches a security session and runs its handshake.
	///
	/// From here on `read`/`write` go through the session. If the handshake
	/// fails the session stays attached, so closing the socket still shuts it
	/// down; the caller should close.
	///
	/// A session that is already attached is shut down before the new one is
	/// built, so nothing it sends can follow the new handshake.
	pub fn start_tls<C: TlsConfig>(&mut self, config: &C) -> Result<()> {
		self.transport.close();
		let mut session = Box::new(config.session(self.fd).map_err(SocketError::Handshake)?);
		let handshake = session.handshake();
		self.transport = Transport::Secure(session);
		handshake.map_err(SocketError::Handshake)?;
		debug!("TLS established on fd {}", self.fd);
		Ok(())
	}

	/// The address the socket is bound to.
	pub fn local_address(&self) -> Result<Address> {
		let mut address = Address::empty();
		let (ptr, len) = address.as_mut_parts();
		syscall!(getsockname(self.fd, ptr, len))?;
		Ok(address)
	}

	/// The address of the connected peer.
	pub fn peer_address(&self) -> Result<Address> {
		let mut address = Address::empty();
		let (ptr, len) = address.as_mut_parts();
		syscall!(getpeername(self.fd, ptr, len))?;
		Ok(address)
	}

	/// Local port in host byte order.
	///
	/// After binding to port 0 this is the port the kernel picked.
	pub fn port(&self) -> Result<u16> {
		self.local_address()?.port()
	}

	pub fn shutdown(&self, how: Shutdown) -> Result<()> {
		let how = match how {
			Shutdown::Read => libc::SHUT_RD,
			Shutdown::Write => libc::SHUT_WR,
			Shutdown::ReadWrite => libc::SHUT_RDWR,
		};
		syscall!(shutdown(self.fd, how))?;
		Ok(())
	}

	/// Closes the security session, then the descriptor.
	///
	/// Errors from `close()` are not reported and never retried: the
	/// descriptor is released either way, and closing it again could hit a
	/// descriptor reused by another thread. They are logged at warn level.
	pub fn close(self) {
		drop(self)
	}
}

impl Drop for Socket {
	fn drop(&mut self) {
		self.transport.close();
		match syscall!(close(self.fd)) {
			Ok(_) => trace!("closed fd {}", self.fd),
			Err(err) => warn!("closing fd {}: {}", self.fd, err),
		}
	}
}

impl std::os::fd::AsRawFd for Socket {
	fn as_raw_fd(&self) -> RawFd {
		self.fd
	}
}

impl AsFd for Socket {
	fn as_fd(&self) -> BorrowedFd<'_> {
		unsafe { BorrowedFd::borrow_raw(self.fd) }
	}
}

impl FromRawFd for Socket {
	/// # Safety
	/// `fd` must be open and owned by nobody else.
	unsafe fn from_raw_fd(fd: RawFd) -> Self {
		Self::wrap(unsafe { OwnedFd::from_raw_fd(fd) })
	}
}

impl IntoRawFd for Socket {
	/// Releases ownership. An attached security session is shut down first.
	fn into_raw_fd(self) -> RawFd {
		let mut this = ManuallyDrop::new(self);
		this.transport.close();
		this.fd
	}
}

impl From<OwnedFd> for Socket {
	fn from(fd: OwnedFd) -> Self {
		Self::wrap(fd)
	}
}

impl std::fmt::Debug for Socket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Socket")
			.field("fd", &self.fd)
			.field("secure", &self.is_secure())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_tcp_stream() {
		assert_eq!(SockType::default(), SockType::Stream);
		assert_eq!(Protocol::default(), Protocol::Tcp);
		assert_eq!(SockType::default().raw(), libc::SOCK_STREAM);
		assert_eq!(Protocol::Default.raw(), 0);
	}

	#[test]
	fn create_reports_unsupported_combinations() {
		let err = Socket::create(Family::Inet, SockType::Datagram, Protocol::Tcp).unwrap_err();
		assert_eq!(err.errno(), Some(libc::EPROTONOSUPPORT));
	}

	#[test]
	fn into_raw_fd_skips_close() {
		let socket = Socket::tcp(Family::Inet).unwrap();
		let fd = socket.into_raw_fd();
		// Still open: take it back so it gets closed.
		let socket = unsafe { Socket::from_raw_fd(fd) };
		assert_eq!(socket.as_raw_fd(), fd);
		assert!(!socket.is_secure());
	}

	#[test]
	fn unbound_socket_has_wildcard_address() {
		let socket = Socket::tcp(Family::Inet).unwrap();
		assert_eq!(socket.port().unwrap(), 0);
	}
}
