use crate::addr::{Address, Family};
use crate::error::Result;
use super::options::{self, Linger};
use super::{Protocol, SockType, Socket, MAX_BACKLOG};

// ============================================================================
// Shared Configuration Structs
// ============================================================================

/// Buffer size configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferConfig {
	pub recv: Option<i32>,
	pub send: Option<i32>,
}

impl BufferConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn recv(mut self, size: i32) -> Self {
		self.recv = Some(size);
		self
	}

	pub fn send(mut self, size: i32) -> Self {
		self.send = Some(size);
		self
	}

	pub fn both(mut self, size: i32) -> Self {
		self.recv = Some(size);
		self.send = Some(size);
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if let Some(size) = self.recv {
			socket.set_option(options::RECV_BUFFER, size)?;
		}
		if let Some(size) = self.send {
			socket.set_option(options::SEND_BUFFER, size)?;
		}
		Ok(())
	}
}

/// Address reuse configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReuseConfig {
	pub addr: bool,
	pub port: bool,
}

impl Default for ReuseConfig {
	fn default() -> Self {
		Self {
			addr: true, // servers want to rebind straight after a restart
			port: false,
		}
	}
}

impl ReuseConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn addr(mut self, enable: bool) -> Self {
		self.addr = enable;
		self
	}

	pub fn port(mut self, enable: bool) -> Self {
		self.port = enable;
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if self.addr {
			socket.set_option(options::REUSE_ADDRESS, true)?;
		}
		if self.port {
			socket.set_option(options::REUSE_PORT, true)?;
		}
		Ok(())
	}
}

/// TCP-level configuration. Nothing is set unless asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConfig {
	pub nodelay: Option<bool>,
	pub keepalive: Option<bool>,
	pub linger: Option<Linger>,
}

impl TcpConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn nodelay(mut self, enable: bool) -> Self {
		self.nodelay = Some(enable);
		self
	}

	pub fn keepalive(mut self, enable: bool) -> Self {
		self.keepalive = Some(enable);
		self
	}

	pub fn linger(mut self, linger: Linger) -> Self {
		self.linger = Some(linger);
		self
	}

	fn apply(&self, socket: &Socket) -> Result<()> {
		if let Some(enable) = self.nodelay {
			socket.set_option(options::NO_DELAY, enable)?;
		}
		if let Some(enable) = self.keepalive {
			socket.set_option(options::KEEP_ALIVE, enable)?;
		}
		if let Some(linger) = self.linger {
			socket.set_option(options::LINGER, linger)?;
		}
		Ok(())
	}
}

// ============================================================================
// Listener Builder
// ============================================================================

/// Builder for listening TCP sockets.
///
/// Options are applied before `bind()`, then the socket listens.
///
/// # Example
/// ```no_run
/// use sockline::{Family, ListenerBuilder, ReuseConfig};
///
/// let listener = ListenerBuilder::new()
///     .reuse(ReuseConfig::new().port(true))
///     .backlog(4096)
///     .bind_to(Family::Inet, 8080, None)?;
/// # Ok::<(), sockline::SocketError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ListenerBuilder {
	reuse: ReuseConfig,
	tcp: TcpConfig,
	buffers: BufferConfig,
	backlog: i32,
}

impl Default for ListenerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ListenerBuilder {
	pub fn new() -> Self {
		Self {
			reuse: ReuseConfig::default(),
			tcp: TcpConfig::default(),
			buffers: BufferConfig::default(),
			backlog: MAX_BACKLOG,
		}
	}

	/// Set address reuse options. Default: `SO_REUSEADDR` only.
	pub fn reuse(mut self, config: ReuseConfig) -> Self {
		self.reuse = config;
		self
	}

	/// Set TCP options, inherited by accepted sockets on most platforms.
	pub fn tcp(mut self, config: TcpConfig) -> Self {
		self.tcp = config;
		self
	}

	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	/// Set listen backlog. Default: [`MAX_BACKLOG`].
	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	/// Creates the socket, applies the options, binds and listens.
	pub fn bind(self, address: &Address) -> Result<Socket> {
		let socket = Socket::create(address.family()?, SockType::Stream, Protocol::Tcp)?;

		self.reuse.apply(&socket)?;
		self.tcp.apply(&socket)?;
		self.buffers.apply(&socket)?;

		socket.bind(address)?;
		socket.listen(self.backlog)?;
		debug!("listening on {} (fd {}, backlog {})", address, socket.as_raw_fd(), self.backlog);
		Ok(socket)
	}

	pub fn bind_to(self, family: Family, port: u16, address: Option<&str>) -> Result<Socket> {
		self.bind(&Address::encode(family, port, address)?)
	}
}

// ============================================================================
// Connector Builder
// ============================================================================

/// Builder for outgoing TCP connections.
///
/// # Example
/// ```no_run
/// use sockline::{BufferConfig, ConnectorBuilder, Family, TcpConfig};
///
/// let conn = ConnectorBuilder::new()
///     .tcp(TcpConfig::new().nodelay(true))
///     .buffers(BufferConfig::new().both(65536))
///     .connect_to(Family::Inet, 8080, Some("127.0.0.1"))?;
/// # Ok::<(), sockline::SocketError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorBuilder {
	tcp: TcpConfig,
	buffers: BufferConfig,
}

impl ConnectorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn tcp(mut self, config: TcpConfig) -> Self {
		self.tcp = config;
		self
	}

	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	/// Creates the socket, applies the options and connects.
	pub fn connect(self, address: &Address) -> Result<Socket> {
		let socket = Socket::create(address.family()?, SockType::Stream, Protocol::Tcp)?;

		self.tcp.apply(&socket)?;
		self.buffers.apply(&socket)?;

		socket.connect(address)?;
		Ok(socket)
	}

	pub fn connect_to(self, family: Family, port: u16, address: Option<&str>) -> Result<Socket> {
		self.connect(&Address::encode(family, port, address)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn listener_defaults() {
		let builder = ListenerBuilder::new();
		assert!(builder.reuse.addr);
		assert!(!builder.reuse.port);
		assert_eq!(builder.backlog, MAX_BACKLOG);
		assert!(builder.tcp.nodelay.is_none());
	}

	#[test]
	fn listener_sets_reuse_before_bind() {
		let listener = ListenerBuilder::new().bind_to(Family::Inet, 0, Some("127.0.0.1")).unwrap();
		assert!(listener.option(options::REUSE_ADDRESS).unwrap());
		assert_ne!(listener.port().unwrap(), 0);
	}

	#[test]
	fn connector_applies_tcp_options() {
		let listener = ListenerBuilder::new().bind_to(Family::Inet, 0, Some("127.0.0.1")).unwrap();
		let port = listener.port().unwrap();

		let conn = ConnectorBuilder::new()
			.tcp(TcpConfig::new().nodelay(true).keepalive(true))
			.connect_to(Family::Inet, port, Some("127.0.0.1"))
			.unwrap();
		assert!(conn.option(options::NO_DELAY).unwrap());
		assert!(conn.option(options::KEEP_ALIVE).unwrap());
	}

	#[test]
	fn bad_address_fails_before_creating_a_socket() {
		let err = ListenerBuilder::new().bind_to(Family::Inet, 0, Some("nope")).unwrap_err();
		assert!(matches!(err, crate::SocketError::InvalidAddress { .. }));
	}
}
