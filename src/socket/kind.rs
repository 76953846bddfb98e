use super::Socket;
use crate::addr::Family;
use crate::error::Result;

/// A type built around a [`Socket`].
///
/// Implementing it lets `accept` and `tcp_listening` hand back the wrapper
/// type instead of a bare `Socket`:
///
/// ```no_run
/// use sockline::{Family, Socket, SocketKind};
///
/// struct EchoSocket(Socket);
///
/// impl SocketKind for EchoSocket {
///     fn from_socket(socket: Socket) -> Self {
///         EchoSocket(socket)
///     }
///
///     fn as_socket(&self) -> &Socket {
///         &self.0
///     }
/// }
///
/// let listener = EchoSocket::tcp_listening(7, Family::Inet, None, None)?;
/// let peer: EchoSocket = listener.accept()?;
/// # Ok::<(), sockline::SocketError>(())
/// ```
pub trait SocketKind: Sized {
	fn from_socket(socket: Socket) -> Self;

	fn as_socket(&self) -> &Socket;

	/// Accepts a connection as another `Self`.
	fn accept(&self) -> Result<Self> {
		self.as_socket().accept().map(Self::from_socket)
	}

	/// [`Socket::tcp_listening`], returning `Self`.
	fn tcp_listening(port: u16, family: Family, address: Option<&str>, backlog: Option<i32>) -> Result<Self> {
		Socket::tcp_listening(port, family, address, backlog).map(Self::from_socket)
	}
}

impl SocketKind for Socket {
	fn from_socket(socket: Socket) -> Self {
		socket
	}

	fn as_socket(&self) -> &Socket {
		self
	}
}
