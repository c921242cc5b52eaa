use anyhow::{Context, Result};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use pid_link::protocol;
use pid_link::{GainMailbox, Gains, ParameterChannel};
use std::cell::Cell;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State shared between the link and its receive task
struct LinkState {
    mailbox: GainMailbox,
    /// Peer that sent the last valid gains datagram
    peer: Mutex<CriticalSectionRawMutex, Cell<Option<SocketAddr>>>,
}

impl LinkState {
    fn peer(&self) -> Option<SocketAddr> {
        self.peer.lock(|peer| peer.get())
    }

    fn set_peer(&self, addr: Option<SocketAddr>) {
        self.peer.lock(|peer| peer.set(addr));
    }
}

/// Parameter channel over UDP
///
/// Inbound: 12-byte gains datagrams (Kp, Ki, Kd as little-endian f32). The
/// sender of the last valid one becomes the attached peer; an empty datagram
/// from that peer detaches it. Outbound: 4-byte telemetry datagrams to the
/// attached peer, or 8-byte measurement + output reports.
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    state: Arc<LinkState>,
    receiver: Option<JoinHandle<()>>,
}

impl UdpLink {
    /// Bind the link socket
    ///
    /// # Arguments
    /// * `addr` - Local address (e.g., "127.0.0.1:9750", port 0 for any)
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind UDP socket on {}", addr))?;

        info!("Parameter link bound to {}", socket.local_addr()?);

        Ok(Self {
            socket: Arc::new(socket),
            state: Arc::new(LinkState {
                mailbox: GainMailbox::new(),
                peer: Mutex::new(Cell::new(None)),
            }),
            receiver: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .context("Failed to read local socket address")
    }

    /// Currently attached peer
    pub fn peer(&self) -> Option<SocketAddr> {
        self.state.peer()
    }

    /// Check if the receive task is running
    pub fn is_started(&self) -> bool {
        self.receiver.is_some()
    }

    fn send_to_peer(&self, data: &[u8]) {
        let Some(peer) = self.state.peer() else {
            return;
        };

        if let Err(e) = self.socket.try_send_to(data, peer) {
            debug!("Telemetry to {} dropped: {}", peer, e);
        }
    }
}

impl ParameterChannel for UdpLink {
    fn send(&mut self, value: f32) {
        self.send_to_peer(&protocol::encode_telemetry(value));
    }

    fn send_report(&mut self, measurement: f32, output: f32) {
        self.send_to_peer(&protocol::encode_report(measurement, output));
    }

    fn poll_gains(&mut self) -> Option<Gains> {
        self.state.mailbox.take()
    }

    /// Spawn the receive task (requires a tokio runtime)
    fn start(&mut self) {
        if self.receiver.is_some() {
            return;
        }

        let socket = Arc::clone(&self.socket);
        let state = Arc::clone(&self.state);
        self.receiver = Some(tokio::spawn(receive_loop(socket, state)));
    }

    fn stop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }
        if let Some(peer) = self.state.peer() {
            info!("Detaching peer {}", peer);
        }
        self.state.set_peer(None);
        // Updates from a stopped session must not leak into the next one
        self.state.mailbox.clear();
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, state: Arc<LinkState>) {
    let mut buf = [0u8; 64];

    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                // e.g. ICMP port unreachable after sending to a vanished peer
                warn!("Receive error: {}", e);
                continue;
            }
        };

        if len == 0 {
            if state.peer() == Some(from) {
                info!("Peer {} disconnected", from);
                state.set_peer(None);
            }
            continue;
        }

        let Some(gains) = protocol::parse_gains(&buf[..len]) else {
            debug!("Dropped {}-byte datagram from {}", len, from);
            continue;
        };

        if state.peer() != Some(from) {
            info!("Peer {} attached", from);
            state.set_peer(Some(from));
        }
        state.mailbox.post(gains);
    }
}
