//! Address families and the socket-address codec.
//!
//! An [`Address`] is the byte image of the platform's native socket address
//! structure. It is built from a family, a port and an optional textual
//! address, and can be handed straight to `bind()`/`connect()`.
//!
//! Construction supports two families:
//! - `Inet`: Internet Protocol version 4
//! - `Inet6`: Internet Protocol version 6
//!
//! Any other family tag is still carried as data and reported by
//! [`Address::family`].

mod ipv4;
mod ipv6;

use std::fmt;
use std::mem::size_of;
use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, SocketError};
use crate::sys;

/// Protocol family of a socket or socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
	Inet,
	Inet6,
	Unix,
	/// Any other `AF_*` value the platform knows about.
	Other(libc::c_int),
}

impl Family {
	/// Returns the libc constant for this family.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Family::Inet => libc::AF_INET,
			Family::Inet6 => libc::AF_INET6,
			Family::Unix => libc::AF_UNIX,
			Family::Other(raw) => raw,
		}
	}

	pub fn from_raw(raw: libc::c_int) -> Self {
		match raw {
			libc::AF_INET => Family::Inet,
			libc::AF_INET6 => Family::Inet6,
			libc::AF_UNIX => Family::Unix,
			other => Family::Other(other),
		}
	}
}

impl fmt::Display for Family {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Family::Inet => f.write_str("IPv4"),
			Family::Inet6 => f.write_str("IPv6"),
			Family::Unix => f.write_str("Unix"),
			Family::Other(raw) => write!(f, "family {}", raw),
		}
	}
}

/// Reads the family tag from a raw socket-address buffer.
///
/// Fails with [`SocketError::AddressLength`] when the buffer cannot hold the
/// family header.
pub fn family(bytes: &[u8]) -> Result<Family> {
	sys::family_tag(bytes)
		.map(Family::from_raw)
		.ok_or(SocketError::AddressLength { len: bytes.len() })
}

/// A socket address in the platform's native layout.
#[derive(Clone, Copy)]
pub struct Address {
	storage: libc::sockaddr_storage,
	len: libc::socklen_t,
}

impl Address {
	/// Builds an address for `family` and `port`.
	///
	/// With no textual address the address field is all zeros, which binds to
	/// every interface. A malformed address gives
	/// [`SocketError::InvalidAddress`]; families other than IPv4/IPv6 give
	/// [`SocketError::UnsupportedFamily`].
	pub fn encode(family: Family, port: u16, address: Option<&str>) -> Result<Self> {
		match family {
			Family::Inet => ipv4::encode(port, address),
			Family::Inet6 => ipv6::encode(port, address),
			other => Err(SocketError::UnsupportedFamily { family: other.raw() }),
		}
	}

	/// Copies a raw socket-address buffer of any family.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		if bytes.len() > size_of::<libc::sockaddr_storage>() {
			return Err(SocketError::AddressLength { len: bytes.len() });
		}
		let mut address = Self::empty();
		address.storage_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
		address.len = bytes.len() as libc::socklen_t;
		Ok(address)
	}

	/// Wraps a native address structure.
	///
	/// `T` must be one of the `sockaddr_*` types.
	pub(crate) fn from_raw<T: Copy>(raw: T) -> Self {
		debug_assert!(size_of::<T>() <= size_of::<libc::sockaddr_storage>());
		let bytes = unsafe {
			std::slice::from_raw_parts(&raw as *const T as *const u8, size_of::<T>())
		};
		let mut address = Self::empty();
		address.storage_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
		address.len = bytes.len() as libc::socklen_t;
		address
	}

	/// Zeroed storage with the full capacity as length, ready to be filled by
	/// `getsockname()` and friends.
	pub(crate) fn empty() -> Self {
		Self {
			storage: unsafe { std::mem::zeroed() },
			len: size_of::<libc::sockaddr_storage>() as libc::socklen_t,
		}
	}

	pub(crate) fn as_mut_parts(&mut self) -> (*mut libc::sockaddr, &mut libc::socklen_t) {
		(&mut self.storage as *mut _ as *mut libc::sockaddr, &mut self.len)
	}

	#[inline]
	pub(crate) fn as_ptr(&self) -> *const libc::sockaddr {
		&self.storage as *const _ as *const libc::sockaddr
	}

	#[inline]
	pub(crate) fn socklen(&self) -> libc::socklen_t {
		self.len
	}

	/// The encoded bytes.
	pub fn as_bytes(&self) -> &[u8] {
		let len = (self.len as usize).min(size_of::<libc::sockaddr_storage>());
		unsafe { std::slice::from_raw_parts(self.as_ptr() as *const u8, len) }
	}

	pub fn len(&self) -> usize {
		self.as_bytes().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// The family tag stored at the front of the buffer.
	pub fn family(&self) -> Result<Family> {
		family(self.as_bytes())
	}

	/// Port in host byte order.
	pub fn port(&self) -> Result<u16> {
		self.to_socket_addr().map(|addr| addr.port())
	}

	/// The IP part, without the port.
	pub fn ip(&self) -> Result<IpAddr> {
		self.to_socket_addr().map(|addr| addr.ip())
	}

	/// Decodes an IPv4 or IPv6 address.
	pub fn to_socket_addr(&self) -> Result<SocketAddr> {
		match self.family()? {
			Family::Inet => {
				let raw = self.cast::<libc::sockaddr_in>()?;
				Ok(SocketAddr::V4(ipv4::decode(raw)))
			}
			Family::Inet6 => {
				let raw = self.cast::<libc::sockaddr_in6>()?;
				Ok(SocketAddr::V6(ipv6::decode(raw)))
			}
			other => Err(SocketError::UnsupportedFamily { family: other.raw() }),
		}
	}

	fn cast<T>(&self) -> Result<&T> {
		if (self.len as usize) < size_of::<T>() {
			return Err(SocketError::AddressLength { len: self.len as usize });
		}
		// sockaddr_storage is aligned for every sockaddr type.
		Ok(unsafe { &*(&self.storage as *const _ as *const T) })
	}

	fn storage_bytes_mut(&mut self) -> &mut [u8] {
		unsafe {
			std::slice::from_raw_parts_mut(
				&mut self.storage as *mut _ as *mut u8,
				size_of::<libc::sockaddr_storage>(),
			)
		}
	}
}

impl From<SocketAddr> for Address {
	fn from(addr: SocketAddr) -> Self {
		match addr {
			SocketAddr::V4(v4) => Address::from_raw(sys::sockaddr_in(v4.port(), v4.ip().octets())),
			SocketAddr::V6(v6) => {
				Address::from_raw(sys::sockaddr_in6(v6.port(), v6.ip().octets(), v6.scope_id()))
			}
		}
	}
}

impl TryFrom<&Address> for SocketAddr {
	type Error = SocketError;

	fn try_from(addr: &Address) -> Result<Self> {
		addr.to_socket_addr()
	}
}

impl PartialEq for Address {
	fn eq(&self, other: &Self) -> bool {
		self.as_bytes() == other.as_bytes()
	}
}

impl Eq for Address {}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.to_socket_addr() {
			Ok(addr) => write!(f, "Address({})", addr),
			Err(_) => f.debug_struct("Address").field("bytes", &self.as_bytes()).finish(),
		}
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (self.to_socket_addr(), self.family()) {
			(Ok(addr), _) => write!(f, "{}", addr),
			(Err(_), Ok(family)) => write!(f, "<{} address, {} bytes>", family, self.len()),
			(Err(_), Err(_)) => write!(f, "<{} bytes>", self.len()),
		}
	}
}
