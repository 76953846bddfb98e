//! Security-session delegation, using a toy XOR "cipher" as the session.

use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use sockline::{Family, SecureTransport, Socket, SocketError, TlsConfig, TlsError};

const HELLO: u8 = 0x5a;
const KEY: u8 = 0x3c;
const BYE: u8 = 0xb0;
const LOCALHOST: Option<&str> = Some("127.0.0.1");

fn send_raw(fd: RawFd, buf: &[u8]) -> std::io::Result<usize> {
    let n = unsafe { libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
    if n < 0 { Err(std::io::Error::last_os_error()) } else { Ok(n as usize) }
}

fn recv_raw(fd: RawFd, buf: &mut [u8]) -> std::io::Result<usize> {
    let n = unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
    if n < 0 { Err(std::io::Error::last_os_error()) } else { Ok(n as usize) }
}

fn fd_is_open(fd: RawFd) -> bool {
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}

#[derive(Default, Clone)]
struct CloseLog {
    closed: Arc<AtomicBool>,
    fd_open_at_close: Arc<AtomicBool>,
}

struct XorSession {
    fd: RawFd,
    hello: u8,
    farewell: bool,
    close_log: CloseLog,
}

impl SecureTransport for XorSession {
    fn handshake(&mut self) -> Result<(), TlsError> {
        send_raw(self.fd, &[self.hello])?;
        let mut reply = [0u8; 1];
        if recv_raw(self.fd, &mut reply)? == 0 {
            return Err("peer closed during handshake".into());
        }
        if reply[0] != HELLO {
            return Err(format!("unexpected hello {:#x}", reply[0]).into());
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        let n = recv_raw(self.fd, buf)?;
        buf[..n].iter_mut().for_each(|b| *b ^= KEY);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError> {
        let sealed: Vec<u8> = buf.iter().map(|b| b ^ KEY).collect();
        Ok(send_raw(self.fd, &sealed)?)
    }

    fn close(&mut self) {
        if self.farewell {
            let _ = send_raw(self.fd, &[BYE]);
        }
        self.close_log.fd_open_at_close.store(fd_is_open(self.fd), Ordering::SeqCst);
        self.close_log.closed.store(true, Ordering::SeqCst);
    }
}

struct XorConfig {
    hello: u8,
    farewell: bool,
    close_log: CloseLog,
    refuse: bool,
}

impl XorConfig {
    fn new() -> Self {
        Self { hello: HELLO, farewell: false, close_log: CloseLog::default(), refuse: false }
    }
}

impl TlsConfig for XorConfig {
    type Session = XorSession;

    fn session(&self, fd: RawFd) -> Result<XorSession, TlsError> {
        if self.refuse {
            return Err("no certificate configured".into());
        }
        Ok(XorSession { fd, hello: self.hello, farewell: self.farewell, close_log: self.close_log.clone() })
    }
}

fn pair() -> (Socket, Socket) {
    let listener = Socket::tcp_listening(0, Family::Inet, LOCALHOST, None).unwrap();
    let port = listener.port().unwrap();
    let client = Socket::tcp(Family::Inet).unwrap();
    client.connect_to(Family::Inet, port, LOCALHOST).unwrap();
    let server = listener.accept().unwrap();
    (client, server)
}

#[test]
fn secure_sockets_talk_through_the_session() {
    let (mut client, mut server) = pair();

    let server = thread::spawn(move || {
        server.start_tls(&XorConfig::new()).unwrap();
        let request = server.read_sized(4).unwrap().unwrap();
        server.write_all(&request.iter().rev().copied().collect::<Vec<u8>>()).unwrap();
    });

    client.start_tls(&XorConfig::new()).unwrap();
    assert!(client.is_secure());
    client.write_all(b"abcd").unwrap();
    assert_eq!(client.read_sized(4).unwrap().as_deref(), Some(&b"dcba"[..]));

    server.join().unwrap();
}

#[test]
fn raw_peer_sees_sealed_bytes() {
    let (mut client, mut server) = pair();

    let peer = thread::spawn(move || {
        assert_eq!(server.read_byte().unwrap(), HELLO);
        server.write_all(&[HELLO]).unwrap();
        server.read_sized(3).unwrap().unwrap()
    });

    client.start_tls(&XorConfig::new()).unwrap();
    client.write_all(b"hey").unwrap();

    let on_wire = peer.join().unwrap();
    let expected: Vec<u8> = b"hey".iter().map(|b| b ^ KEY).collect();
    assert_eq!(on_wire, expected);
}

#[test]
fn failed_handshake_propagates_and_session_is_closed_first() {
    let (mut client, mut server) = pair();
    let config = XorConfig::new();
    let close_log = config.close_log.clone();

    let peer = thread::spawn(move || {
        server.read_byte().unwrap();
        server.write_all(&[0x00]).unwrap();
    });

    let err = client.start_tls(&config).unwrap_err();
    peer.join().unwrap();

    assert!(matches!(err, SocketError::Handshake(_)));
    assert!(err.to_string().contains("unexpected hello"));
    assert!(client.is_secure());

    client.close();
    assert!(close_log.closed.load(Ordering::SeqCst));
    assert!(close_log.fd_open_at_close.load(Ordering::SeqCst));
}

#[test]
fn restarting_tls_shuts_the_old_session_down_first() {
    let (mut client, mut server) = pair();
    let config = XorConfig { farewell: true, ..XorConfig::new() };

    let peer = thread::spawn(move || {
        let mut seen = Vec::new();
        while seen.len() < 3 {
            let byte = server.read_byte().unwrap();
            if byte == HELLO {
                server.write_all(&[HELLO]).unwrap();
            }
            seen.push(byte);
        }
        (seen, server)
    });

    client.start_tls(&config).unwrap();
    client.start_tls(&config).unwrap();
    assert!(client.is_secure());

    let (seen, server) = peer.join().unwrap();
    assert_eq!(seen, [HELLO, BYE, HELLO]);
    client.close();
    drop(server);
}

#[test]
fn session_that_cannot_be_built_leaves_socket_raw() {
    let (mut client, _server) = pair();
    let config = XorConfig { refuse: true, ..XorConfig::new() };

    let err = client.start_tls(&config).unwrap_err();
    assert!(matches!(err, SocketError::Handshake(_)));
    assert!(!client.is_secure());
}

#[test]
fn secure_end_of_stream_is_none() {
    let (mut client, server) = pair();

    let peer = thread::spawn(move || {
        let mut server = server;
        server.read_byte().unwrap();
        server.write_all(&[HELLO]).unwrap();
    });
    client.start_tls(&XorConfig::new()).unwrap();
    peer.join().unwrap();

    // Peer is gone; the session reports end of stream as zero bytes.
    assert_eq!(client.read_sized(8).unwrap(), None);
}

struct Broken;

impl SecureTransport for Broken {
    fn handshake(&mut self) -> Result<(), TlsError> {
        Ok(())
    }

    fn read(&mut self, _: &mut [u8]) -> Result<usize, TlsError> {
        Err("bad record mac".into())
    }

    fn write(&mut self, _: &[u8]) -> Result<usize, TlsError> {
        Err("session expired".into())
    }

    fn close(&mut self) {}
}

impl TlsConfig for Broken {
    type Session = Broken;

    fn session(&self, _: RawFd) -> Result<Broken, TlsError> {
        Ok(Broken)
    }
}

#[test]
fn session_errors_are_passed_through() {
    let (mut client, _server) = pair();
    client.start_tls(&Broken).unwrap();

    let mut buf = [0u8; 4];
    let err = client.read(&mut buf).unwrap_err();
    assert!(matches!(&err, SocketError::Tls(source) if source.to_string() == "bad record mac"));

    let err = client.write_all(b"data").unwrap_err();
    assert!(matches!(&err, SocketError::Tls(source) if source.to_string() == "session expired"));
}
