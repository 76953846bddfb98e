use std::net::{Ipv6Addr, SocketAddrV6};

use super::Address;
use crate::error::{Result, SocketError};
use crate::sys;

/// Builds a `sockaddr_in6`. No text means `in6addr_any`.
///
/// Flow info and scope id are left at zero; use `From<SocketAddr>` when a
/// link-local scope is needed.
pub(super) fn encode(port: u16, address: Option<&str>) -> Result<Address> {
	let ip = match address {
		Some(text) => text
			.parse::<Ipv6Addr>()
			.map_err(|_| SocketError::invalid_address(text, "IPv6"))?,
		None => Ipv6Addr::UNSPECIFIED,
	};
	Ok(Address::from_raw(sys::sockaddr_in6(port, ip.octets(), 0)))
}

pub(super) fn decode(raw: &libc::sockaddr_in6) -> SocketAddrV6 {
	SocketAddrV6::new(
		Ipv6Addr::from(raw.sin6_addr.s6_addr),
		u16::from_be(raw.sin6_port),
		raw.sin6_flowinfo,
		raw.sin6_scope_id,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::addr::Family;

	#[test]
	fn loopback_round_trips() {
		let address = encode(443, Some("::1")).unwrap();
		assert_eq!(address.len(), std::mem::size_of::<libc::sockaddr_in6>());
		assert_eq!(address.family().unwrap(), Family::Inet6);
		assert_eq!(address.to_socket_addr().unwrap(), "[::1]:443".parse().unwrap());
	}

	#[test]
	fn mapped_ipv4_is_accepted() {
		let address = encode(1, Some("::ffff:10.0.0.1")).unwrap();
		let ip = address.to_socket_addr().unwrap().ip();
		assert_eq!(ip, "::ffff:10.0.0.1".parse::<std::net::IpAddr>().unwrap());
	}

	#[test]
	fn ipv4_text_is_not_an_ipv6_address() {
		let err = encode(1, Some("127.0.0.1")).unwrap_err();
		assert!(matches!(err, SocketError::InvalidAddress { family: "IPv6", .. }));
	}
}
