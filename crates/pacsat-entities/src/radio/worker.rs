//! TNC worker thread: holds the TCP connection to a KISS TNC and moves frames
//! between it and the radio entity

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use pacsat_config::CfgRadio;
use pacsat_core::ChannelId;

use crate::radio::kiss::{self, KissDecoder};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_millis(20);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Events the worker sends to the radio entity
#[derive(Debug)]
pub enum RadioEvent {
    Connected,
    Disconnected(String),
    Frame { channel: ChannelId, data: Vec<u8> },
}

/// Commands the radio entity sends to the worker
#[derive(Debug)]
pub enum RadioCommand {
    Send { channel: ChannelId, data: Vec<u8> },
    /// Close the connection and stop the worker
    Shutdown,
}

/// Why a connection ended
enum Exit {
    Shutdown,
    Lost(String),
}

pub struct KissTcpWorker {
    cfg: CfgRadio,
    event_sender: Sender<RadioEvent>,
    command_receiver: Receiver<RadioCommand>,
    decoder: KissDecoder,
}

impl KissTcpWorker {
    pub fn new(cfg: CfgRadio, event_sender: Sender<RadioEvent>, command_receiver: Receiver<RadioCommand>) -> Self {
        Self { cfg, event_sender, command_receiver, decoder: KissDecoder::new() }
    }

    /// Worker entry point. Reconnects until told to shut down or the entity goes away.
    pub fn run(&mut self) {
        tracing::info!("KissTcpWorker starting, TNC at {}:{}", self.cfg.host, self.cfg.port);

        loop {
            let reason = match self.connect() {
                Ok(stream) => {
                    let _ = self.event_sender.send(RadioEvent::Connected);
                    match self.serve(stream) {
                        Exit::Shutdown => break,
                        Exit::Lost(reason) => reason,
                    }
                }
                Err(e) => e,
            };
            tracing::error!("KissTcpWorker: {}", reason);
            let _ = self.event_sender.send(RadioEvent::Disconnected(reason));

            // Wait before reconnecting, but stay responsive to a shutdown
            tracing::info!("KissTcpWorker: reconnecting in {:?}", RECONNECT_DELAY);
            match self.command_receiver.recv_timeout(RECONNECT_DELAY) {
                Ok(RadioCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(RadioCommand::Send { .. }) => tracing::debug!("KissTcpWorker: not connected, dropping frame"),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        tracing::info!("KissTcpWorker stopped");
    }

    fn connect(&self) -> Result<TcpStream, String> {
        let addr = format!("{}:{}", self.cfg.host, self.cfg.port);
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| format!("resolve {} failed: {}", addr, e))?
            .next()
            .ok_or_else(|| format!("no addresses found for {}", addr))?;

        let stream = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT).map_err(|e| format!("connect to {} failed: {}", addr, e))?;
        stream.set_read_timeout(Some(READ_TIMEOUT)).map_err(|e| format!("set read timeout: {}", e))?;
        stream.set_nodelay(true).map_err(|e| format!("set nodelay: {}", e))?;
        tracing::info!("KissTcpWorker: connected to {}", addr);
        Ok(stream)
    }

    fn serve(&mut self, mut stream: TcpStream) -> Exit {
        self.decoder = KissDecoder::new();
        let mut buf = [0u8; 1024];

        loop {
            loop {
                match self.command_receiver.try_recv() {
                    Ok(RadioCommand::Send { channel, data }) => {
                        tracing::trace!("KissTcpWorker: tx ch {} {} bytes", channel, data.len());
                        if let Err(e) = stream.write_all(&kiss::encode(channel, &data)) {
                            return Exit::Lost(format!("write failed: {}", e));
                        }
                    }
                    Ok(RadioCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                        let _ = stream.shutdown(std::net::Shutdown::Both);
                        return Exit::Shutdown;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            match stream.read(&mut buf) {
                Ok(0) => return Exit::Lost("connection closed by TNC".to_string()),
                Ok(n) => {
                    for (channel, data) in self.decoder.push(&buf[..n]) {
                        tracing::trace!("KissTcpWorker: rx ch {} {} bytes", channel, data.len());
                        match self.event_sender.try_send(RadioEvent::Frame { channel, data }) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => tracing::warn!("KissTcpWorker: rx queue full, dropping frame"),
                            Err(TrySendError::Disconnected(_)) => return Exit::Shutdown,
                        }
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(e) => return Exit::Lost(format!("read failed: {}", e)),
            }
        }
    }
}
