use super::Socket;
use crate::error::{Result, SocketError};

/// Calls `write_once` until all of `buf` is written.
///
/// Each attempt may take only part of what it is given; the rest is offered
/// again. The first failure stops the loop.
pub(crate) fn write_fully<F>(mut buf: &[u8], mut write_once: F) -> Result<()>
where
	F: FnMut(&[u8]) -> Result<usize>,
{
	while !buf.is_empty() {
		let n = write_once(buf)?;
		if n == 0 {
			return Err(SocketError::WriteZero);
		}
		buf = &buf[n.min(buf.len())..];
	}
	Ok(())
}

/// Reads exactly `size` bytes with `read_once`.
///
/// `None` when the first attempt sees end of stream. A stream that ends
/// part way through is a [`SocketError::ShortRead`].
pub(crate) fn read_chunk<F>(size: usize, mut read_once: F) -> Result<Option<Vec<u8>>>
where
	F: FnMut(&mut [u8]) -> Result<usize>,
{
	let mut buf = vec![0u8; size];
	if size == 0 {
		return Ok(Some(buf));
	}

	let mut filled = read_once(&mut buf)?;
	if filled == 0 {
		return Ok(None);
	}
	while filled < size {
		let n = read_once(&mut buf[filled..])?;
		if n == 0 {
			return Err(SocketError::ShortRead { expected: size, received: filled });
		}
		filled += n;
	}
	Ok(Some(buf))
}

impl Socket {
	/// One receive attempt.
	///
	/// Returns how many bytes arrived, possibly fewer than `buf.len()`. `0`
	/// means the peer closed the connection.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		self.transport.read(self.fd, buf)
	}

	/// Reads a single byte. End of stream is [`SocketError::ConnectionClosed`].
	pub fn read_byte(&mut self) -> Result<u8> {
		let mut byte = [0u8; 1];
		match self.read(&mut byte)? {
			0 => Err(SocketError::ConnectionClosed),
			_ => Ok(byte[0]),
		}
	}

	/// Reads exactly `size` bytes.
	///
	/// Returns `None` if the peer closed the connection before sending
	/// anything. Short receives are retried until the chunk is complete.
	pub fn read_sized(&mut self, size: usize) -> Result<Option<Vec<u8>>> {
		let fd = self.fd;
		let transport = &mut self.transport;
		read_chunk(size, |buf| transport.read(fd, buf))
	}

	/// One send attempt. Returns how many bytes the kernel (or the security
	/// session) took.
	pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
		self.transport.write(self.fd, buf)
	}

	/// Writes all of `buf`, however many attempts that takes.
	pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
		let fd = self.fd;
		let transport = &mut self.transport;
		write_fully(buf, |rest| transport.write(fd, rest))
	}
}

impl std::io::Read for Socket {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		Socket::read(self, buf).map_err(Into::into)
	}
}

impl std::io::Write for Socket {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		Socket::write(self, buf).map_err(Into::into)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(()) // nothing is buffered at this level
	}
}
