// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The abstract datagram transport a [`crate::Endpoint`] sends and receives
//! through.
//!
//! A [`Channel`] is the only thing the engine needs from the outside world.
//! This module provides two implementations: [`UdpChannel`], a thin wrapper
//! over `std::net::UdpSocket`, and [`DtlsChannel`], which multiplexes
//! per-peer [`Session`]s over a single UDP socket and demultiplexes
//! handshake records from application records by inspecting the record
//! header — but performs no actual cryptography. Real DTLS record-layer
//! encryption and handshake state machines are out of scope; `DtlsChannel`
//! exists to exercise the multiplexing contract end-to-end, not to secure
//! anything.

use crate::exchange::SessionId;
use crate::Error;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One inbound datagram, along with the addressing context the endpoint
/// needs to route it and to reply.
#[derive(Debug, Clone)]
pub struct InboundDatagram {
    pub bytes: Vec<u8>,
    pub remote: SocketAddr,
    pub local: SocketAddr,
    pub session: Session,
}

/// Identifies a transport-level session between this endpoint and a peer.
///
/// For plain UDP there is exactly one session per socket, identified by
/// [`Session::id`] `0`. For the DTLS-shaped channel, each peer gets its own
/// session, created on its first handshake record and replaced if a new
/// `ClientHello` arrives at epoch 0 — matching the known behavior of
/// session-oriented DTLS stacks, where a restarting peer's fresh handshake
/// simply displaces its old session rather than being rejected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Session {
    id: SessionId,
    authenticated: bool,
}

impl Session {
    /// The default session used by transports (like plain UDP) that don't
    /// multiplex multiple sessions per socket.
    pub const UNAUTHENTICATED: Session = Session {
        id: 0,
        authenticated: false,
    };

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// True if this session's peer identity was authenticated by a DTLS
    /// handshake. Always `false` on [`UdpChannel`], since it has no
    /// handshake at all.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// A datagram transport an [`crate::Endpoint`] can send through and receive
/// from.
///
/// Implementations are expected to be cheaply cloneable handles (typically
/// wrapping an `Arc`) so the endpoint can hold one while a background
/// receive loop also holds one.
pub trait Channel: Send + Sync + std::fmt::Debug {
    /// Begins accepting datagrams. Calling `start` twice without an
    /// intervening `stop` is implementation-defined but must not panic.
    fn start(&self) -> Result<(), Error>;

    /// Stops accepting datagrams and releases any bound resources.
    fn stop(&self) -> Result<(), Error>;

    /// Sends `bytes` to `remote` over `session`. Does not block on
    /// congestion; excess datagrams are dropped with a logged warning
    /// rather than buffered without bound.
    fn send(&self, bytes: &[u8], session: Session, remote: SocketAddr) -> Result<(), Error>;

    /// Looks up (or, for session-oriented transports, lazily creates) the
    /// session used to talk to `remote`.
    fn get_session(&self, remote: SocketAddr) -> Result<Session, Error>;

    /// Joins a multicast group so that datagrams sent to it are delivered
    /// to this channel.
    fn add_multicast_address(&self, group: IpAddr) -> Result<(), Error>;

    /// Blocks the calling thread until one datagram arrives, or returns an
    /// error if the channel has been stopped. Endpoint receive loops call
    /// this in a loop on a dedicated thread and post what they get back
    /// onto the executor — this method itself never touches the executor.
    fn receive(&self) -> Result<InboundDatagram, Error>;

    /// The local address this channel is bound to.
    fn local_addr(&self) -> Result<SocketAddr, Error>;
}

/// A [`Channel`] backed directly by a `std::net::UdpSocket`, with no
/// security layer.
#[derive(Debug)]
pub struct UdpChannel {
    socket: UdpSocket,
    receive_packet_size: usize,
}

impl UdpChannel {
    /// Binds a new UDP socket at `addr` (e.g. `"[::]:5683"`).
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        let socket = UdpSocket::bind(addr)?;
        Ok(UdpChannel {
            socket,
            receive_packet_size: 1152,
        })
    }

    /// Overrides the maximum single-datagram size this channel will read;
    /// matches [`crate::Config::channel_receive_packet_size`].
    pub fn with_receive_packet_size(mut self, size: usize) -> Self {
        self.receive_packet_size = size;
        self
    }

    fn join_multicast(&self, local: IpAddr, group: IpAddr) -> std::io::Result<()> {
        match (group, local) {
            (IpAddr::V4(group), IpAddr::V4(local)) => self.socket.join_multicast_v4(&group, &local),
            (IpAddr::V4(group), IpAddr::V6(_)) => {
                self.socket.join_multicast_v4(&group, &std::net::Ipv4Addr::UNSPECIFIED)
            }
            (IpAddr::V6(group), _) => self.socket.join_multicast_v6(&group, 0),
        }
    }
}

impl Channel for UdpChannel {
    fn start(&self) -> Result<(), Error> {
        self.socket.set_nonblocking(false)?;
        Ok(())
    }

    fn stop(&self) -> Result<(), Error> {
        Ok(())
    }

    fn send(&self, bytes: &[u8], _session: Session, remote: SocketAddr) -> Result<(), Error> {
        self.socket.send_to(bytes, remote)?;
        Ok(())
    }

    fn get_session(&self, _remote: SocketAddr) -> Result<Session, Error> {
        Ok(Session::UNAUTHENTICATED)
    }

    fn add_multicast_address(&self, group: IpAddr) -> Result<(), Error> {
        let local = self.local_addr()?.ip();
        self.join_multicast(local, group)?;
        Ok(())
    }

    fn receive(&self) -> Result<InboundDatagram, Error> {
        let mut buf = vec![0u8; self.receive_packet_size];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, remote)) => {
                    buf.truncate(len);
                    return Ok(InboundDatagram {
                        bytes: buf,
                        remote,
                        local: self.local_addr()?,
                        session: Session::UNAUTHENTICATED,
                    });
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }
}

/// A record-layer header discriminant used by [`DtlsChannel`] to tell a
/// handshake record from an application-data record without decrypting
/// anything.
///
/// Byte 0 of every record carries this as a stand-in for the real DTLS
/// content-type byte. There is no encryption, no MAC, and no handshake
/// state machine here — only enough framing to multiplex sessions the way
/// RFC 6347 record headers would.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
enum RecordKind {
    ClientHello = 1,
    ApplicationData = 23,
}

impl RecordKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(RecordKind::ClientHello),
            23 => Some(RecordKind::ApplicationData),
            _ => None,
        }
    }
}

/// A DTLS-shaped [`Channel`]: multiplexes per-peer [`Session`]s over one
/// `UdpSocket` by inspecting a one-byte record-kind header, exactly as
/// described in the channel contract. There is no cryptography — this
/// exists to exercise the session-multiplexing contract, not to secure
/// traffic, and must never be used where real confidentiality is required.
#[derive(Debug)]
pub struct DtlsChannel {
    udp: UdpChannel,
    sessions: Mutex<HashMap<SocketAddr, Session>>,
    next_session_id: AtomicU64,
}

impl DtlsChannel {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        Ok(DtlsChannel {
            udp: UdpChannel::bind(addr)?,
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        })
    }

    fn new_session(&self) -> Session {
        Session {
            id: self.next_session_id.fetch_add(1, Ordering::Relaxed),
            authenticated: true,
        }
    }
}

impl Channel for DtlsChannel {
    fn start(&self) -> Result<(), Error> {
        self.udp.start()
    }

    fn stop(&self) -> Result<(), Error> {
        self.udp.stop()
    }

    fn send(&self, bytes: &[u8], session: Session, remote: SocketAddr) -> Result<(), Error> {
        let mut framed = Vec::with_capacity(bytes.len() + 1);
        framed.push(RecordKind::ApplicationData as u8);
        framed.extend_from_slice(bytes);
        let _ = session;
        self.udp.send(&framed, Session::UNAUTHENTICATED, remote)
    }

    fn get_session(&self, remote: SocketAddr) -> Result<Session, Error> {
        let mut sessions = self.sessions.lock().expect("sessions lock poisoned");
        Ok(*sessions.entry(remote).or_insert_with(|| Session {
            id: 0,
            authenticated: false,
        }))
    }

    fn add_multicast_address(&self, group: IpAddr) -> Result<(), Error> {
        self.udp.add_multicast_address(group)
    }

    fn receive(&self) -> Result<InboundDatagram, Error> {
        loop {
            let mut datagram = self.udp.receive()?;
            if datagram.bytes.is_empty() {
                continue;
            }
            let kind = RecordKind::from_byte(datagram.bytes[0]);
            let body = datagram.bytes.split_off(1);
            match kind {
                Some(RecordKind::ClientHello) => {
                    // A ClientHello at epoch 0 always (re)establishes a fresh
                    // session for this peer, displacing whatever existed
                    // before. This mirrors a known quirk of session-oriented
                    // DTLS stacks rather than "fixing" it: a restarting peer
                    // must not be locked out by its own stale session.
                    let session = self.new_session();
                    self.sessions
                        .lock()
                        .expect("sessions lock poisoned")
                        .insert(datagram.remote, session);
                    datagram.session = session;
                    datagram.bytes = body;
                    return Ok(datagram);
                }
                Some(RecordKind::ApplicationData) => {
                    let session = self.get_session(datagram.remote)?;
                    datagram.session = session;
                    datagram.bytes = body;
                    return Ok(datagram);
                }
                None => {
                    warn!("coap-engine: dropped datagram with unrecognized record kind");
                    continue;
                }
            }
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.udp.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udp_channel_round_trips_a_datagram() {
        let server = UdpChannel::bind("127.0.0.1:0").unwrap();
        let client = UdpChannel::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();

        client
            .send(b"hello", Session::UNAUTHENTICATED, server_addr)
            .unwrap();

        let received = server.receive().unwrap();
        assert_eq!(received.bytes, b"hello");
    }

    #[test]
    fn dtls_channel_establishes_session_on_client_hello() {
        let server = DtlsChannel::bind("127.0.0.1:0").unwrap();
        let client_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut framed = vec![RecordKind::ClientHello as u8];
        framed.extend_from_slice(b"hello");
        client_socket.send_to(&framed, server_addr).unwrap();

        let received = server.receive().unwrap();
        assert_eq!(received.bytes, b"hello");
        assert!(received.session.is_authenticated());
    }
}
