/// Boxed error produced by a transport-security session.
pub type TlsError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, SocketError>;

/// Every failure a socket operation can report.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("{call}() failed: {}", errno_to_str(*.errno))]
    System { call: &'static str, errno: i32 },

    #[error("address buffer of {len} bytes is too short to hold a family tag")]
    AddressLength { len: usize },

    #[error("invalid {family} address: {address:?}")]
    InvalidAddress { address: String, family: &'static str },

    #[error("address family {family} is not supported here")]
    UnsupportedFamily { family: i32 },

    #[error("getsockopt({option}) returned {len} bytes")]
    OptionLength { option: &'static str, len: usize },

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] TlsError),

    #[error("TLS session failed: {0}")]
    Tls(#[source] TlsError),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("connection closed after {received} of {expected} bytes")]
    ShortRead { expected: usize, received: usize },

    #[error("send() wrote zero bytes")]
    WriteZero,
}

impl SocketError {
    /// Platform error code, if the failure came from a syscall.
    pub fn errno(&self) -> Option<i32> {
        match self {
            SocketError::System { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            SocketError::System { errno, .. } => errno_to_kind(*errno),
            SocketError::AddressLength { .. }
            | SocketError::InvalidAddress { .. }
            | SocketError::OptionLength { .. } => std::io::ErrorKind::InvalidInput,
            SocketError::UnsupportedFamily { .. } => std::io::ErrorKind::Unsupported,
            SocketError::Handshake(_) | SocketError::Tls(_) => std::io::ErrorKind::Other,
            SocketError::ConnectionClosed | SocketError::ShortRead { .. } => {
                std::io::ErrorKind::UnexpectedEof
            }
            SocketError::WriteZero => std::io::ErrorKind::WriteZero,
        }
    }

    pub(crate) fn invalid_address(address: &str, family: &'static str) -> Self {
        SocketError::InvalidAddress { address: address.to_owned(), family }
    }
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOPROTOOPT => "protocol option not available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::EPROTONOSUPPORT => "protocol not supported".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl From<SocketError> for std::io::Error {
    fn from(err: SocketError) -> Self {
        match err {
            // Keep the raw code so callers can still match on it.
            SocketError::System { errno, .. } => std::io::Error::from_raw_os_error(errno),
            other => std::io::Error::new(other.kind(), other),
        }
    }
}
