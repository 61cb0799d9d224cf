use std::collections::VecDeque;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use pacsat_config::{RadioBackend, SharedConfig};
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::{PacsatTime, Sap};
use pacsat_saps::lm::{LmRawInd, LmTxReq};
use pacsat_saps::{SapMsg, SapMsgInner};

use crate::radio::worker::{KissTcpWorker, RadioCommand, RadioEvent};
use crate::{MessageQueue, PacsatEntityTrait};

/// Edge of the stack towards the TNC. Received frames are drained at the start of a
/// tick; frames to send are gathered during the tick and handed to the worker at its end,
/// link control traffic first.
pub struct RadioEntity {
    config: SharedConfig,
    event_receiver: Receiver<RadioEvent>,
    command_sender: Sender<RadioCommand>,
    expedited: VecDeque<LmTxReq>,
    normal: VecDeque<LmTxReq>,
    connected: bool,
    /// Frames dropped on a full transmit queue
    pub tx_dropped: usize,
    worker_handle: Option<thread::JoinHandle<()>>,
}

impl RadioEntity {
    /// Starts the TNC worker for the configured backend. Without a backend the entity
    /// only drops what it is asked to send.
    pub fn new(config: SharedConfig) -> Self {
        let cfg = config.config().radio.clone();
        let (event_sender, event_receiver) = bounded::<RadioEvent>(cfg.rx_queue_len);
        let (command_sender, command_receiver) = bounded::<RadioCommand>(cfg.tx_queue_len);

        let worker_handle = match cfg.backend {
            RadioBackend::KissTcp => {
                let handle = thread::Builder::new()
                    .name("kiss-tcp-worker".to_string())
                    .spawn(move || {
                        let mut worker = KissTcpWorker::new(cfg, event_sender, command_receiver);
                        worker.run();
                    })
                    .expect("failed to spawn KissTcpWorker thread");
                Some(handle)
            }
            RadioBackend::None => {
                tracing::info!("RadioEntity: no radio backend configured");
                None
            }
        };

        let mut entity = Self::with_channels(config, event_receiver, command_sender);
        entity.worker_handle = worker_handle;
        entity
    }

    /// Entity bound to the given worker channels, without starting a worker
    pub fn with_channels(config: SharedConfig, event_receiver: Receiver<RadioEvent>, command_sender: Sender<RadioCommand>) -> Self {
        Self {
            config,
            event_receiver,
            command_sender,
            expedited: VecDeque::new(),
            normal: VecDeque::new(),
            connected: false,
            tx_dropped: 0,
            worker_handle: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn process_events(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        let num_channels = self.config.config().radio.num_channels;
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                RadioEvent::Connected => {
                    tracing::info!("RadioEntity: TNC connected");
                    self.connected = true;
                }
                RadioEvent::Disconnected(reason) => {
                    tracing::warn!("RadioEntity: TNC disconnected: {}", reason);
                    self.connected = false;
                }
                RadioEvent::Frame { channel, data } => {
                    if channel >= num_channels {
                        tracing::debug!("RadioEntity: dropping frame on unused channel {}", channel);
                        continue;
                    }
                    queue.push_back(SapMsg {
                        sap: Sap::LmSap,
                        src: PacsatEntity::Radio,
                        dest: PacsatEntity::Classifier,
                        ts,
                        msg: SapMsgInner::LmRawInd(LmRawInd { channel, data }),
                    });
                }
            }
        }
    }

    fn rx_lm_tx_req(&mut self, message: SapMsg) {
        tracing::trace!("rx_lm_tx_req");
        let SapMsgInner::LmTxReq(prim) = message.msg else {panic!()};
        if prim.expedited {
            self.expedited.push_back(prim);
        } else {
            self.normal.push_back(prim);
        }
    }

    /// Hands the gathered frames to the worker. Returns whether any was sent.
    fn flush(&mut self) -> bool {
        let mut sent = false;
        while let Some(req) = self.expedited.pop_front().or_else(|| self.normal.pop_front()) {
            match self.command_sender.try_send(RadioCommand::Send { channel: req.channel, data: req.data }) {
                Ok(()) => sent = true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(ch = req.channel, "RadioEntity: tx queue full, dropping frame");
                    self.tx_dropped += 1;
                }
                Err(TrySendError::Disconnected(_)) => {
                    let pending = 1 + self.expedited.len() + self.normal.len();
                    tracing::warn!("RadioEntity: radio worker gone, dropping {} frames", pending);
                    self.expedited.clear();
                    self.normal.clear();
                    self.tx_dropped += pending;
                }
            }
        }
        sent
    }
}

impl PacsatEntityTrait for RadioEntity {
    fn entity(&self) -> PacsatEntity {
        PacsatEntity::Radio
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        self.process_events(queue, ts);
    }

    fn tick_end(&mut self, _queue: &mut MessageQueue, _ts: PacsatTime) -> bool {
        self.flush()
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("rx_prim: {}", message.msg);

        assert!(message.sap == Sap::LmSap);

        match message.msg {
            SapMsgInner::LmTxReq(_) => {
                self.rx_lm_tx_req(message);
            }
            _ => {
                panic!();
            }
        }
    }
}

impl Drop for RadioEntity {
    fn drop(&mut self) {
        let _ = self.command_sender.try_send(RadioCommand::Shutdown);
        if let Some(handle) = self.worker_handle.take() {
            let timeout = std::time::Duration::from_secs(3);
            let start = std::time::Instant::now();
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    tracing::info!("RadioEntity: worker thread joined");
                    break;
                }
                if start.elapsed() >= timeout {
                    tracing::warn!("RadioEntity: worker thread did not finish in time, abandoning");
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
        }
    }
}
