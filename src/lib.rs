//! Blocking sockets over the host's socket syscalls.
//!
//! [`Socket`] owns a descriptor and wraps `socket()`, `bind()`, `listen()`,
//! `connect()`, `accept()`, `recv()`/`send()`, `poll()` and `setsockopt()`
//! with typed errors. An optional security session can take over reads and
//! writes through [`SecureTransport`].

#[macro_use]
mod logging;
#[macro_use]
mod sys;

pub mod socket;
mod addr;
mod error;

pub use self::error::{Result, SocketError, TlsError, errno};
pub use self::addr::{Address, Family, family};
pub use self::socket::{Socket, SockType, Protocol, Shutdown, SocketKind, MAX_BACKLOG,
					   WaitOption, SecureTransport, TlsConfig,
					   SocketOption, OptionValue, TimeValue, Linger,
					   ListenerBuilder, ConnectorBuilder, ReuseConfig, BufferConfig, TcpConfig};
pub use self::socket::options;
