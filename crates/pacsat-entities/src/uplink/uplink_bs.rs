use pacsat_config::SharedConfig;
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::{ByteBuffer, Callsign, ChannelId, FileId, PacsatTime, Sap, UnixTime};
use pacsat_pdus::ftl0::enums::ftl0_error::Ftl0Error;
use pacsat_pdus::ftl0::enums::ftl0_packet_type::Ftl0PacketType;
use pacsat_pdus::ftl0::ftl0_header::{FTL0_HEADER_LEN, Ftl0Header};
use pacsat_pdus::ftl0::pdus::login_resp::{LOGIN_FLAGS_PFH_REQUIRED, LoginResp};
use pacsat_pdus::ftl0::pdus::ul_go_resp::UlGoResp;
use pacsat_pdus::ftl0::pdus::ul_status_resp::UlStatusResp;
use pacsat_pdus::ftl0::pdus::upload_cmd::UploadCmd;
use pacsat_pdus::pfh::MAX_BYTES_IN_PACSAT_FILE_HEADER;
use pacsat_pdus::pfh::pfh_header::PfhHeader;
use pacsat_pdus::pfh::pfh_patch::body_checksum;
use pacsat_saps::dl::{DlDataReq, DlDisconnectReq, DlErrorCode};
use pacsat_saps::{SapMsg, SapMsgInner};

use crate::dir::file_store::{file_name, parse_file_name, read_prefix, tmp_file_name};
use crate::dir::{DirErr, Directory, SharedDir};
use crate::uplink::components::ul_session::{UlSession, UlState};
use crate::uplink::components::upload_table::{UploadRecord, UploadTable};
use crate::{MessageQueue, PacsatEntityTrait};

/// FTL0 upload server. One session per data link channel, file bytes go straight
/// to temporary files in the directory's store.
pub struct UplinkBs {
    config: SharedConfig,
    dir: SharedDir,
    sessions: Vec<UlSession>,
    uploads: UploadTable,
    next_maintenance: Option<PacsatTime>,
}

impl UplinkBs {
    pub fn new(config: SharedConfig, dir: SharedDir) -> Self {
        let cfg = config.config();
        let sessions = (0..cfg.radio.num_channels).map(UlSession::new).collect();
        let uploads = UploadTable::new(cfg.uplink.max_upload_records);
        Self { config, dir, sessions, uploads, next_maintenance: None }
    }

    pub fn session(&self, channel: usize) -> Option<&UlSession> {
        self.sessions.get(channel)
    }

    pub fn uploads(&self) -> &UploadTable {
        &self.uploads
    }

    /// Files currently being written by a logged-in station
    fn active_file_ids(&self) -> Vec<FileId> {
        self.sessions.iter().filter(|s| s.file_id != 0).map(|s| s.file_id).collect()
    }

    // ─── Output ───────────────────────────────────────────────────

    fn send_packet(queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId, data: Vec<u8>) {
        queue.push_back(SapMsg {
            sap: Sap::DlSap,
            src: PacsatEntity::Uplink,
            dest: PacsatEntity::DataLink,
            ts,
            msg: SapMsgInner::DlDataReq(DlDataReq { channel, data }),
        });
    }

    fn send_status(queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId, resp: UlStatusResp) {
        tracing::debug!(ch = channel, "-> {}", resp);
        Self::send_packet(queue, ts, channel, resp.to_bytes());
    }

    fn disconnect(queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId) {
        tracing::debug!(ch = channel, "-> disconnect");
        queue.push_back(SapMsg {
            sap: Sap::DlSap,
            src: PacsatEntity::Uplink,
            dest: PacsatEntity::DataLink,
            ts,
            msg: SapMsgInner::DlDisconnectReq(DlDisconnectReq { channel }),
        });
    }

    /// Protocol violation: drop the link. The session is evicted once the data link
    /// reports the disconnect.
    fn abort(&mut self, queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId) {
        Self::disconnect(queue, ts, channel);
        self.sessions[channel as usize].state = UlState::Abort;
    }

    // ─── Link events ──────────────────────────────────────────────

    fn rx_dl_connect(&mut self, queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId, callsign: Callsign, confirm: bool) {
        tracing::trace!("rx_dl_connect");
        let state = self.sessions[channel as usize].state;
        match state {
            UlState::Uninit => self.connection_received(queue, ts, channel, callsign),
            UlState::CmdOk if confirm => {
                tracing::debug!(ch = channel, "link re-established with {}", callsign);
            }
            UlState::CmdOk => {
                // The station may have missed our LOGIN_RESP and connected again
                self.sessions[channel as usize].evict(ts.unix_secs());
                self.connection_received(queue, ts, channel, callsign);
            }
            UlState::DataRx | UlState::Abort => {
                tracing::info!(ch = channel, "unexpected connect from {} in {:?}", callsign, state);
                self.abort(queue, ts, channel);
            }
        }
    }

    /// Admits the station and sends LOGIN_RESP, or refuses it with a disconnect
    fn connection_received(&mut self, queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId, callsign: Callsign) {
        if !self.config.state_read().uplink_enabled {
            tracing::info!(ch = channel, "uplink closed, refusing {}", callsign);
            Self::disconnect(queue, ts, channel);
            return;
        }
        let elsewhere = self
            .sessions
            .iter()
            .any(|s| s.channel != channel && s.is_active() && s.callsign.as_ref() == Some(&callsign));
        if elsewhere {
            tracing::info!(ch = channel, "{} is already on the uplink", callsign);
            Self::disconnect(queue, ts, channel);
            return;
        }

        let now = ts.unix_secs();
        tracing::info!(ch = channel, "{} logged in", callsign);
        self.sessions[channel as usize].login(callsign, now);

        let login = LoginResp { login_time: now, login_flags: LOGIN_FLAGS_PFH_REQUIRED };
        tracing::debug!(ch = channel, "-> {}", login);
        Self::send_packet(queue, ts, channel, login.to_bytes());
    }

    fn rx_dl_disconnect(&mut self, ts: PacsatTime, channel: ChannelId) {
        tracing::trace!("rx_dl_disconnect");
        let session = &mut self.sessions[channel as usize];
        if session.is_active() {
            session.evict(ts.unix_secs());
        }
    }

    fn rx_dl_error_ind(&mut self, channel: ChannelId, code: DlErrorCode) {
        tracing::trace!("rx_dl_error_ind");
        let session = &mut self.sessions[channel as usize];
        match code {
            DlErrorCode::F if matches!(session.state, UlState::CmdOk | UlState::DataRx) => {
                tracing::info!(ch = channel, "data link reset, back to CmdOk");
                session.reset_transfer();
            }
            _ => tracing::debug!(ch = channel, "data link error {}", code),
        }
    }

    fn rx_dl_data_ind(&mut self, queue: &mut MessageQueue, ts: PacsatTime, channel: ChannelId, data: Vec<u8>) {
        tracing::trace!("rx_dl_data_ind");

        let state = self.sessions[channel as usize].state;
        if matches!(state, UlState::Uninit | UlState::Abort) {
            tracing::debug!(ch = channel, "ignoring {} bytes in {:?}", data.len(), state);
            return;
        }

        let header = match Ftl0Header::from_buf(&mut ByteBuffer::from_bytes(&data)) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!(ch = channel, "bad FTL0 packet: {}", e);
                Self::send_status(queue, ts, channel, UlStatusResp::error(Ftl0Error::IllFormedCmd));
                self.abort(queue, ts, channel);
                return;
            }
        };
        let Some(packet_type) = header.get_type() else {
            tracing::warn!(ch = channel, "unknown FTL0 packet type {}", header.packet_type);
            Self::send_status(queue, ts, channel, UlStatusResp::error(Ftl0Error::IllFormedCmd));
            self.abort(queue, ts, channel);
            return;
        };
        tracing::debug!(ch = channel, "<- {} len {} in {:?}", packet_type, header.length, state);

        match (state, packet_type) {
            (UlState::CmdOk, Ftl0PacketType::UploadCmd) => {
                match self.process_upload_cmd(ts, channel, &data) {
                    Ok(go) => {
                        tracing::debug!(ch = channel, "-> {:?}", go);
                        Self::send_packet(queue, ts, channel, go.to_bytes());
                        self.sessions[channel as usize].state = UlState::DataRx;
                    }
                    Err(e) => {
                        // The station may try another file
                        Self::send_status(queue, ts, channel, UlStatusResp::error(e));
                        self.sessions[channel as usize].reset_transfer();
                    }
                }
            }
            (UlState::DataRx, Ftl0PacketType::Data) => {
                match self.process_data(ts, channel, &header, &data) {
                    Ok(()) => {}
                    Err(Ftl0Error::NoRoom) => {
                        Self::send_status(queue, ts, channel, UlStatusResp::nak(Ftl0Error::NoRoom));
                    }
                    Err(e) => {
                        Self::send_status(queue, ts, channel, UlStatusResp::error(e));
                    }
                }
            }
            (UlState::DataRx, Ftl0PacketType::DataEnd) => {
                let file_id = self.sessions[channel as usize].file_id;
                let resp = match self.process_data_end(ts, &header, file_id) {
                    Ok(()) => UlStatusResp::ack(),
                    Err(e) => UlStatusResp::nak(e),
                };
                Self::send_status(queue, ts, channel, resp);
                self.uploads.remove(file_id);
                self.sessions[channel as usize].reset_transfer();
            }
            _ => {
                tracing::info!(ch = channel, "{} out of sequence in {:?}", packet_type, state);
                self.abort(queue, ts, channel);
            }
        }
    }

    // ─── FTL0 commands ────────────────────────────────────────────

    fn process_upload_cmd(&mut self, ts: PacsatTime, channel: ChannelId, data: &[u8]) -> Result<UlGoResp, Ftl0Error> {
        let cmd = match UploadCmd::from_buf(&mut ByteBuffer::from_bytes(data)) {
            Ok(cmd) => {
                tracing::debug!(ch = channel, "<- {:?}", cmd);
                cmd
            }
            Err(e) => {
                tracing::warn!(ch = channel, "bad UPLOAD_CMD: {}", e);
                return Err(Ftl0Error::IllFormedCmd);
            }
        };
        if cmd.file_length == 0 {
            return Err(Ftl0Error::IllFormedCmd);
        }

        let now = ts.unix_secs();
        let callsign = self.sessions[channel as usize].callsign.clone().ok_or(Ftl0Error::IllFormedCmd)?;
        let (file_id, offset) = if cmd.continue_file_id == 0 {
            (self.start_new_upload(now, &callsign, cmd.file_length)?, 0)
        } else {
            let offset = self.continue_upload(cmd.continue_file_id, &callsign, cmd.file_length)?;
            (cmd.continue_file_id, offset)
        };

        let session = &mut self.sessions[channel as usize];
        session.file_id = file_id;
        session.length = cmd.file_length;
        session.offset = offset;
        tracing::info!(ch = channel, "{} uploading {:04x}, {} of {} bytes", callsign, file_id, offset, cmd.file_length);
        Ok(UlGoResp { server_file_id: file_id, byte_offset: offset })
    }

    fn start_new_upload(&mut self, now: UnixTime, callsign: &Callsign, length: u32) -> Result<FileId, Ftl0Error> {
        let cfg = self.config.config();
        if length > cfg.uplink.max_file_size {
            tracing::info!("start_new_upload: {} bytes is over the limit", length);
            return Err(Ftl0Error::NoRoom);
        }

        let active = self.active_file_ids();
        let mut dir = self.dir.write();
        let free = dir.store().free_space();
        let needed = length as u64 + self.uploads.reserved_bytes() + cfg.uplink.space_margin;
        if needed > free {
            tracing::info!("start_new_upload: need {} bytes, {} free", needed, free);
            return Err(Ftl0Error::NoRoom);
        }

        let Some(file_id) = dir.next_file_id() else {
            tracing::warn!("start_new_upload: no file id available");
            return Err(Ftl0Error::NoRoom);
        };
        if let Err(e) = dir.store_mut().create(&tmp_file_name(file_id)) {
            tracing::warn!("start_new_upload: cannot create {}: {}", tmp_file_name(file_id), e);
            return Err(Ftl0Error::NoRoom);
        }

        let record = UploadRecord { file_id, callsign: callsign.clone(), length, offset: 0, request_time: now };
        match self.uploads.add(record, &active) {
            Ok(Some(evicted)) => remove_quietly(&mut dir, &tmp_file_name(evicted.file_id)),
            Ok(None) => {}
            // The upload still works, it just cannot be continued
            Err(e) => tracing::warn!("start_new_upload: no upload record for {:04x}: {}", file_id, e),
        }
        Ok(file_id)
    }

    /// Returns the offset to continue from
    fn continue_upload(&self, file_id: FileId, callsign: &Callsign, length: u32) -> Result<u32, Ftl0Error> {
        let dir = self.dir.read();
        let store = dir.store();

        // Complete already, the station missed our ACK
        if store.size(&file_name(file_id)).is_ok_and(|size| size == length as u64) {
            return Err(Ftl0Error::FileComplete);
        }

        let Some(record) = self.uploads.get(file_id) else {
            tracing::info!("continue_upload: no record for {:04x}", file_id);
            return Err(Ftl0Error::NoSuchFileNumber);
        };
        if record.length != length || &record.callsign != callsign {
            tracing::info!("continue_upload: {:04x} belongs to {} with length {}", file_id, record.callsign, record.length);
            return Err(Ftl0Error::BadContinue);
        }

        match store.size(&tmp_file_name(file_id)) {
            Ok(size) => Ok(size as u32),
            Err(e) => {
                tracing::info!("continue_upload: {}: {}", tmp_file_name(file_id), e);
                Err(Ftl0Error::NoSuchFileNumber)
            }
        }
    }

    fn process_data(&mut self, ts: PacsatTime, channel: ChannelId, header: &Ftl0Header, data: &[u8]) -> Result<(), Ftl0Error> {
        let len = header.length as usize;
        if len == 0 || len > data.len() - FTL0_HEADER_LEN {
            tracing::info!(ch = channel, "DATA length {} with {} bytes present", len, data.len() - FTL0_HEADER_LEN);
            return Err(Ftl0Error::BadHeader);
        }
        let payload = &data[FTL0_HEADER_LEN..FTL0_HEADER_LEN + len];

        let session = &mut self.sessions[channel as usize];
        if session.offset as u64 + len as u64 > session.length as u64 {
            tracing::info!(ch = channel, "DATA past the declared length {}", session.length);
            return Err(Ftl0Error::NoRoom);
        }
        if let Err(e) = self.dir.write().store_mut().write_at(&tmp_file_name(session.file_id), session.offset as u64, payload) {
            tracing::warn!(ch = channel, "write to {:04x} failed: {}", session.file_id, e);
            return Err(Ftl0Error::NoRoom);
        }
        session.offset += len as u32;

        if let Some(record) = self.uploads.get_mut(session.file_id) {
            record.offset = session.offset;
            record.request_time = ts.unix_secs();
        }
        Ok(())
    }

    /// Checks the finished upload and commits it to the directory. The temporary
    /// file is gone afterwards either way.
    fn process_data_end(&mut self, ts: PacsatTime, header: &Ftl0Header, file_id: FileId) -> Result<(), Ftl0Error> {
        let mut dir = self.dir.write();
        let tmp = tmp_file_name(file_id);
        if header.length != 0 {
            remove_quietly(&mut dir, &tmp);
            return Err(Ftl0Error::BadHeader);
        }

        let checked = check_upload(&dir, file_id);
        let result = checked.and_then(|()| {
            dir.commit_upload(file_id, ts.unix_secs()).map(|_| ()).map_err(|e| {
                tracing::warn!("process_data_end: commit of {:04x} failed: {}", file_id, e);
                match e {
                    // The header decoded but cannot be stamped
                    DirErr::Header(_) | DirErr::BadChecksum(_) => Ftl0Error::BadHeader,
                    _ => Ftl0Error::NoRoom,
                }
            })
        });
        if let Err(e) = result {
            tracing::info!("process_data_end: {:04x} rejected: {}", file_id, e);
            remove_quietly(&mut dir, &tmp);
        }
        result
    }

    // ─── Maintenance ──────────────────────────────────────────────

    /// Drops stale upload records and their files, orphaned temporary files and
    /// expired directory entries
    fn maintenance(&mut self, ts: PacsatTime) {
        let cfg = self.config.config();
        let now = ts.unix_secs();
        let active = self.active_file_ids();
        let mut dir = self.dir.write();

        for record in self.uploads.purge(now, cfg.uplink.max_upload_age_secs, &active) {
            tracing::info!("maintenance: upload {:04x} from {} timed out", record.file_id, record.callsign);
            remove_quietly(&mut dir, &tmp_file_name(record.file_id));
        }

        match dir.store().list() {
            Ok(names) => {
                for name in names {
                    let Some((id, true)) = parse_file_name(&name) else { continue };
                    if self.uploads.get(id).is_none() && !active.contains(&id) {
                        tracing::info!("maintenance: removing orphaned {}", name);
                        remove_quietly(&mut dir, &name);
                    }
                }
            }
            Err(e) => tracing::warn!("maintenance: cannot list store: {}", e),
        }

        for entry in dir.expire(now, cfg.storage.max_file_age_secs) {
            remove_quietly(&mut dir, &entry.name);
        }
    }
}

/// Validates the header and body of a finished temporary file
fn check_upload(dir: &Directory, file_id: FileId) -> Result<(), Ftl0Error> {
    let tmp = tmp_file_name(file_id);
    let store = dir.store();
    let hdr_bytes = read_prefix(store, &tmp, MAX_BYTES_IN_PACSAT_FILE_HEADER).map_err(|_| Ftl0Error::BadHeader)?;
    let hdr = match PfhHeader::decode(&hdr_bytes) {
        Ok((hdr, _, true)) => hdr,
        Ok((_, _, false)) => {
            tracing::info!("check_upload: {:04x} header checksum mismatch", file_id);
            return Err(Ftl0Error::BadHeader);
        }
        Err(e) => {
            tracing::info!("check_upload: {:04x} header: {}", file_id, e);
            return Err(Ftl0Error::BadHeader);
        }
    };

    let size = store.size(&tmp).map_err(|_| Ftl0Error::BadHeader)?;
    if hdr.file_size as u64 != size {
        tracing::info!("check_upload: {:04x} header says {} bytes, have {}", file_id, hdr.file_size, size);
        return Err(Ftl0Error::HeaderCheck);
    }

    let body_len = (size as usize).saturating_sub(hdr.body_offset as usize);
    let mut body = vec![0u8; body_len];
    let n = store.read_at(&tmp, hdr.body_offset as u64, &mut body).map_err(|_| Ftl0Error::BodyCheck)?;
    if n != body_len || body_checksum(&body) != hdr.body_checksum {
        tracing::info!("check_upload: {:04x} body checksum mismatch", file_id);
        return Err(Ftl0Error::BodyCheck);
    }
    Ok(())
}

fn remove_quietly(dir: &mut Directory, name: &str) {
    if dir.store().exists(name) {
        if let Err(e) = dir.store_mut().remove(name) {
            tracing::warn!("could not remove {}: {}", name, e);
        }
    }
}

impl PacsatEntityTrait for UplinkBs {
    fn entity(&self) -> PacsatEntity {
        PacsatEntity::Uplink
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn tick_start(&mut self, _queue: &mut MessageQueue, ts: PacsatTime) {
        let period = self.config.config().uplink.maintenance_period_secs;
        match self.next_maintenance {
            None => self.next_maintenance = Some(ts.add_secs(period)),
            Some(deadline) if ts >= deadline => {
                self.maintenance(ts);
                self.next_maintenance = Some(ts.add_secs(period));
            }
            Some(_) => {}
        }
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("rx_prim: {}", message.msg);

        assert!(message.sap == Sap::DlSap);

        let ts = message.ts;
        let channel = match &message.msg {
            SapMsgInner::DlConnectInd(p) => p.channel,
            SapMsgInner::DlConnectConf(p) => p.channel,
            SapMsgInner::DlDisconnectInd(p) => p.channel,
            SapMsgInner::DlDisconnectConf(p) => p.channel,
            SapMsgInner::DlDataInd(p) => p.channel,
            SapMsgInner::DlErrorInd(p) => p.channel,
            _ => panic!(),
        };
        if channel as usize >= self.sessions.len() {
            tracing::warn!("rx_prim: unknown channel {}", channel);
            return;
        }

        match message.msg {
            SapMsgInner::DlConnectInd(prim) => {
                self.rx_dl_connect(queue, ts, channel, prim.callsign, false);
            }
            SapMsgInner::DlConnectConf(prim) => {
                self.rx_dl_connect(queue, ts, channel, prim.callsign, true);
            }
            SapMsgInner::DlDisconnectInd(_) | SapMsgInner::DlDisconnectConf(_) => {
                self.rx_dl_disconnect(ts, channel);
            }
            SapMsgInner::DlDataInd(prim) => {
                self.rx_dl_data_ind(queue, ts, channel, prim.data);
            }
            SapMsgInner::DlErrorInd(prim) => {
                self.rx_dl_error_ind(channel, prim.code);
            }
            _ => {
                panic!();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pacsat_config::CfgIdentity;
    use pacsat_core::debug;
    use pacsat_saps::dl::{DlConnectInd, DlDataInd, DlDisconnectConf, DlDisconnectInd, DlErrorInd};

    use crate::dir::MemFileStore;

    use super::*;

    fn setup() -> (UplinkBs, SharedDir) {
        let dir = SharedDir::new(Directory::new(Box::new(MemFileStore::new(1 << 20))));
        (UplinkBs::new(SharedConfig::new(CfgIdentity::default()), dir.clone()), dir)
    }

    fn dl(msg: SapMsgInner) -> SapMsg {
        SapMsg::new(Sap::DlSap, PacsatEntity::DataLink, PacsatEntity::Uplink, PacsatTime::new(1_700_000_000), msg)
    }

    fn call() -> Callsign {
        Callsign::parse("N0CALL").unwrap()
    }

    fn data_ind(channel: ChannelId, data: Vec<u8>) -> SapMsg {
        dl(SapMsgInner::DlDataInd(DlDataInd { channel, callsign: call(), data }))
    }

    /// Payloads of the DlDataReqs in the queue, and whether a disconnect was requested
    fn drain(queue: &mut MessageQueue) -> (Vec<Vec<u8>>, bool) {
        let mut packets = Vec::new();
        let mut disconnect = false;
        while let Some(msg) = queue.pop_front() {
            match msg.msg {
                SapMsgInner::DlDataReq(req) => packets.push(req.data),
                SapMsgInner::DlDisconnectReq(_) => disconnect = true,
                _ => panic!(),
            }
        }
        (packets, disconnect)
    }

    fn status(bytes: &[u8]) -> UlStatusResp {
        UlStatusResp::from_buf(&mut ByteBuffer::from_bytes(bytes)).unwrap()
    }

    #[test]
    fn test_login_and_duplicate_station() {
        debug::setup_logging_verbose();
        let (mut ul, _) = setup();
        let mut queue = MessageQueue::new();

        ul.rx_prim(&mut queue, dl(SapMsgInner::DlConnectInd(DlConnectInd { channel: 0, callsign: call() })));
        let (packets, disconnect) = drain(&mut queue);
        assert!(!disconnect);
        let login = LoginResp::from_buf(&mut ByteBuffer::from_bytes(&packets[0])).unwrap();
        assert_eq!(login.login_flags, LOGIN_FLAGS_PFH_REQUIRED);
        assert_eq!(login.login_time, 1_700_000_000);
        assert_eq!(ul.session(0).unwrap().state, UlState::CmdOk);

        // Same station on a second channel is refused
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlConnectInd(DlConnectInd { channel: 1, callsign: call() })));
        let (packets, disconnect) = drain(&mut queue);
        assert!(packets.is_empty());
        assert!(disconnect);
        assert_eq!(ul.session(1).unwrap().state, UlState::Uninit);

        ul.rx_prim(&mut queue, dl(SapMsgInner::DlDisconnectInd(DlDisconnectInd { channel: 0, callsign: call() })));
        assert_eq!(ul.session(0).unwrap().state, UlState::Uninit);
    }

    #[test]
    fn test_upload_cmd_errors() {
        debug::setup_logging_verbose();
        let (mut ul, _) = setup();
        let mut queue = MessageQueue::new();
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlConnectInd(DlConnectInd { channel: 0, callsign: call() })));
        drain(&mut queue);

        let cases = [
            (UploadCmd { continue_file_id: 0, file_length: 0 }, Ftl0Error::IllFormedCmd),
            (UploadCmd { continue_file_id: 0, file_length: 1 << 21 }, Ftl0Error::NoRoom),
            (UploadCmd { continue_file_id: 0x77, file_length: 100 }, Ftl0Error::NoSuchFileNumber),
        ];
        for (cmd, expected) in cases {
            ul.rx_prim(&mut queue, data_ind(0, cmd.to_bytes()));
            let (packets, disconnect) = drain(&mut queue);
            assert!(!disconnect);
            let resp = status(&packets[0]);
            assert_eq!(resp.packet_type, Ftl0PacketType::UlErrorResp);
            assert_eq!(resp.error, expected);
            assert_eq!(ul.session(0).unwrap().state, UlState::CmdOk);
        }

        // DATA before UPLOAD_CMD is out of sequence
        ul.rx_prim(&mut queue, data_ind(0, Ftl0Header::encode_packet(Ftl0PacketType::Data, &[1, 2, 3])));
        let (_, disconnect) = drain(&mut queue);
        assert!(disconnect);
        assert_eq!(ul.session(0).unwrap().state, UlState::Abort);

        // Ignored until the link is down
        ul.rx_prim(&mut queue, data_ind(0, UploadCmd { continue_file_id: 0, file_length: 10 }.to_bytes()));
        assert!(queue.is_empty());
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlDisconnectConf(DlDisconnectConf { channel: 0, callsign: call() })));
        assert_eq!(ul.session(0).unwrap().state, UlState::Uninit);
    }

    #[test]
    fn test_data_errors_keep_session() {
        debug::setup_logging_verbose();
        let (mut ul, dir) = setup();
        let mut queue = MessageQueue::new();
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlConnectInd(DlConnectInd { channel: 0, callsign: call() })));
        ul.rx_prim(&mut queue, data_ind(0, UploadCmd { continue_file_id: 0, file_length: 4 }.to_bytes()));
        let (packets, _) = drain(&mut queue);
        let go = UlGoResp::from_buf(&mut ByteBuffer::from_bytes(&packets[1])).unwrap();
        assert_eq!(go.byte_offset, 0);
        assert!(dir.read().store().exists(&tmp_file_name(go.server_file_id)));
        assert_eq!(ul.uploads().reserved_bytes(), 4);

        // Declared length larger than what is present
        let mut short = Ftl0Header::encode_packet(Ftl0PacketType::Data, &[1, 2, 3]);
        short.truncate(3);
        ul.rx_prim(&mut queue, data_ind(0, short));
        let (packets, disconnect) = drain(&mut queue);
        assert!(!disconnect);
        assert_eq!(status(&packets[0]).error, Ftl0Error::BadHeader);

        // More than was announced
        ul.rx_prim(&mut queue, data_ind(0, Ftl0Header::encode_packet(Ftl0PacketType::Data, &[0; 5])));
        let (packets, _) = drain(&mut queue);
        let resp = status(&packets[0]);
        assert_eq!((resp.packet_type, resp.error), (Ftl0PacketType::UlNakResp, Ftl0Error::NoRoom));
        assert_eq!(ul.session(0).unwrap().state, UlState::DataRx);

        // Link reset by the peer
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlErrorInd(DlErrorInd { channel: 0, callsign: call(), code: DlErrorCode::F })));
        assert_eq!(ul.session(0).unwrap().state, UlState::CmdOk);
        assert_eq!(ul.session(0).unwrap().file_id, 0);
    }

    #[test]
    fn test_maintenance_removes_stale_uploads() {
        debug::setup_logging_verbose();
        let (mut ul, dir) = setup();
        let mut queue = MessageQueue::new();
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlConnectInd(DlConnectInd { channel: 0, callsign: call() })));
        ul.rx_prim(&mut queue, data_ind(0, UploadCmd { continue_file_id: 0, file_length: 100 }.to_bytes()));
        ul.rx_prim(&mut queue, dl(SapMsgInner::DlDisconnectInd(DlDisconnectInd { channel: 0, callsign: call() })));
        drain(&mut queue);
        assert_eq!(ul.uploads().len(), 1);
        dir.write().store_mut().create(&tmp_file_name(0x99)).unwrap();

        let cfg = ul.config.config();
        let ts = PacsatTime::new(1_700_000_000);
        ul.tick_start(&mut queue, ts);
        // Too early for the record, the orphan goes
        ul.tick_start(&mut queue, ts.add_secs(cfg.uplink.maintenance_period_secs));
        assert_eq!(ul.uploads().len(), 1);
        assert!(!dir.read().store().exists(&tmp_file_name(0x99)));

        ul.tick_start(&mut queue, ts.add_secs(cfg.uplink.max_upload_age_secs + cfg.uplink.maintenance_period_secs + 1));
        assert!(ul.uploads().is_empty());
        assert!(dir.read().store().list().unwrap().is_empty());
    }
}
