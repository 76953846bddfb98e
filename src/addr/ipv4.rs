use std::net::{Ipv4Addr, SocketAddrV4};

use super::Address;
use crate::error::{Result, SocketError};
use crate::sys;

/// Builds a `sockaddr_in`. No text means `INADDR_ANY`.
pub(super) fn encode(port: u16, address: Option<&str>) -> Result<Address> {
	let ip = match address {
		Some(text) => text
			.parse::<Ipv4Addr>()
			.map_err(|_| SocketError::invalid_address(text, "IPv4"))?,
		None => Ipv4Addr::UNSPECIFIED,
	};
	Ok(Address::from_raw(sys::sockaddr_in(port, ip.octets())))
}

pub(super) fn decode(raw: &libc::sockaddr_in) -> SocketAddrV4 {
	SocketAddrV4::new(
		Ipv4Addr::from(raw.sin_addr.s_addr.to_ne_bytes()),
		u16::from_be(raw.sin_port),
	)
}

/*
sockaddr_in on Linux:
  sin_family: AF_INET (2)
  sin_port:   port, big-endian
  sin_addr:   4 bytes, network order
  sin_zero:   8 bytes of padding
BSDs put a one-byte sin_len in front and shrink sin_family to a byte;
sys::sockaddr_in is the only place that knows.
*/

#[cfg(test)]
mod tests {
	use super::*;
	use crate::addr::Family;

	#[test]
	fn loopback_is_stored_in_network_order() {
		let address = encode(8080, Some("127.0.0.1")).unwrap();
		assert_eq!(address.len(), std::mem::size_of::<libc::sockaddr_in>());
		assert_eq!(address.family().unwrap(), Family::Inet);

		let decoded = address.to_socket_addr().unwrap();
		assert_eq!(decoded, "127.0.0.1:8080".parse().unwrap());
	}

	#[test]
	fn missing_text_is_the_wildcard() {
		let address = encode(0, None).unwrap();
		assert_eq!(address.to_socket_addr().unwrap(), "0.0.0.0:0".parse().unwrap());
	}

	#[test]
	fn garbage_is_an_error_not_a_panic() {
		for text in ["256.0.0.1", "localhost", "", "::1", "1.2.3"] {
			let err = encode(80, Some(text)).unwrap_err();
			assert!(matches!(err, SocketError::InvalidAddress { family: "IPv4", .. }), "{text}");
		}
	}
}
