use pacsat_config::SharedConfig;
use pacsat_core::pacsat_entities::PacsatEntity;
use pacsat_core::{Callsign, PacsatTime, Sap, UnixTime};
use pacsat_pdus::ax25::enums::frame_type::Ax25FrameType;
use pacsat_pdus::ax25::enums::pid::Ax25Pid;
use pacsat_pdus::ax25::frame::Ax25Frame;
use pacsat_pdus::ax25::well_known;
use pacsat_pdus::pb::enums::pb_error::PbError;
use pacsat_pdus::pb::enums::pb_file_req_mode::PbFileReqMode;
use pacsat_pdus::pb::pdus::dir_broadcast::DirBroadcast;
use pacsat_pdus::pb::pdus::dir_request::DirRequest;
use pacsat_pdus::pb::pdus::file_broadcast::FileBroadcast;
use pacsat_pdus::pb::pdus::file_request::FileRequest;
use pacsat_pdus::pb::pdus::pb_response::PbResponse;
use pacsat_pdus::pb::{MAX_DIR_PFH_LENGTH, MAX_FILE_HOLES, PB_FILE_DEFAULT_BLOCK_SIZE, PB_FLAG_E, PB_FLAG_N};
use pacsat_saps::lm::LmTxReq;
use pacsat_saps::{SapMsg, SapMsgInner};

use crate::dir::{DirEntry, Directory, SharedDir};
use crate::pb::components::pb_list::{PbEntry, PbKind, PbList};
use crate::{MessageQueue, PacsatEntityTrait};

/// What servicing an entry did to it
enum Step {
    /// Entry stays, move on to the next one
    Keep,
    /// Entry is done or dead
    Remove,
}

/// PACSAT broadcast queue. Serves directory and file requests round-robin,
/// one broadcast frame per service slot.
pub struct PbBs {
    config: SharedConfig,
    dir: SharedDir,
    list: PbList,
    ticks: u64,
    next_status: Option<PacsatTime>,
}

impl PbBs {
    pub fn new(config: SharedConfig, dir: SharedDir) -> Self {
        let max_entries = config.config().broadcast.max_entries;
        Self { config, dir, list: PbList::new(max_entries), ticks: 0, next_status: None }
    }

    pub fn list(&self) -> &PbList {
        &self.list
    }

    fn send_ui(&self, queue: &mut MessageQueue, ts: PacsatTime, dest: Callsign, pid: Ax25Pid, info: Vec<u8>) {
        let broadcast = self.config.config().identity.broadcast.clone();
        let frame = Ax25Frame::new_ui(dest, broadcast, pid, info);
        tracing::debug!("-> {}", frame);
        queue.push_back(SapMsg {
            sap: Sap::LmSap,
            src: PacsatEntity::Pb,
            dest: PacsatEntity::Radio,
            ts,
            msg: SapMsgInner::LmTxReq(LmTxReq { channel: 0, data: frame.to_bytes(), expedited: false }),
        });
    }

    fn send_response(&self, queue: &mut MessageQueue, ts: PacsatTime, resp: PbResponse) {
        let dest = match &resp {
            PbResponse::Ok(call) | PbResponse::No(_, call) => call.clone(),
        };
        tracing::debug!("send_response: {:?}", resp);
        self.send_ui(queue, ts, dest, Ax25Pid::File, resp.to_bytes());
    }

    /// Adds an entry, replacing any entry of the same station. Pins the file of a file request.
    fn add_entry(&mut self, entry: PbEntry) -> Result<(), PbError> {
        if !self.config.state_read().pb_enabled {
            tracing::debug!("add_entry: PB shut, refusing {}", entry.callsign);
            return Err(PbError::Temporary);
        }
        if let Some(pos) = self.list.position(&entry.callsign) {
            tracing::debug!("add_entry: {} supersedes its earlier request", entry.callsign);
            self.remove_entry(pos);
        }
        let file_id = entry.file_id();
        let callsign = entry.callsign.clone();
        if let Err(e) = self.list.add(entry) {
            tracing::info!("add_entry: refusing {}: {}", callsign, e);
            return Err(PbError::Temporary);
        }
        if let Some(id) = file_id {
            self.dir.write().pin(id);
        }
        tracing::info!("add_entry: {} added, {} on the PB", callsign, self.list.len());
        Ok(())
    }

    fn remove_entry(&mut self, pos: usize) {
        let Some(entry) = self.list.remove(pos) else {
            return;
        };
        if let Some(id) = entry.file_id() {
            self.dir.write().unpin(id);
        }
        tracing::debug!("remove_entry: {} removed, {} on the PB", entry.callsign, self.list.len());
    }

    fn rx_lm_frame_ind(&mut self, queue: &mut MessageQueue, mut message: SapMsg) {
        tracing::trace!("rx_lm_frame_ind");
        let SapMsgInner::LmFrameInd(prim) = &mut message.msg else {panic!()};
        let frame = &prim.frame;

        if frame.frame_type != Ax25FrameType::Ui {
            tracing::debug!("rx_lm_frame_ind: ignoring {} to broadcast address", frame);
            return;
        }

        let result = match frame.pid.map(|pid| Ax25Pid::try_from(pid as u64)) {
            Some(Ok(Ax25Pid::Directory)) => self.dir_request(frame.src.clone(), &frame.info, message.ts),
            Some(Ok(Ax25Pid::File)) => self.file_request(frame.src.clone(), &frame.info, message.ts),
            _ => {
                tracing::debug!("rx_lm_frame_ind: ignoring pid {:?} from {}", frame.pid, frame.src);
                return;
            }
        };
        match result {
            Ok(true) => self.send_response(queue, message.ts, PbResponse::Ok(frame.src.clone())),
            Ok(false) => {}
            Err(e) => self.send_response(queue, message.ts, PbResponse::No(e, frame.src.clone())),
        }
    }

    fn dir_request(&mut self, callsign: Callsign, info: &[u8], ts: PacsatTime) -> Result<bool, PbError> {
        let req = DirRequest::from_bytes(info).map_err(|e| {
            tracing::info!("dir_request: bad request from {}: {}", callsign, e);
            PbError::InvalidPacket
        })?;
        tracing::info!("dir_request: {} {}", callsign, req);
        self.add_entry(PbEntry::new_dir(callsign, req.holes, ts.unix_secs()))?;
        Ok(true)
    }

    /// Handles a file request. Returns whether an OK is due; a stop request is not answered.
    fn file_request(&mut self, callsign: Callsign, info: &[u8], ts: PacsatTime) -> Result<bool, PbError> {
        let req = FileRequest::from_bytes(info).map_err(|e| {
            tracing::info!("file_request: bad request from {}: {}", callsign, e);
            PbError::InvalidPacket
        })?;
        tracing::info!("file_request: {} {}", callsign, req);

        if self.dir.read().find_by_id(req.file_id).is_none() {
            return Err(PbError::FileNotAvailable);
        }

        match req.mode() {
            Some(PbFileReqMode::StartSending) => {
                self.add_entry(PbEntry::new_file(callsign, req.file_id, Vec::new(), ts.unix_secs()))?;
                Ok(true)
            }
            Some(PbFileReqMode::StopSending) => {
                if let Some(pos) = self.list.position(&callsign) {
                    if self.list.get(pos).and_then(|e| e.file_id()) == Some(req.file_id) {
                        self.remove_entry(pos);
                    }
                }
                Ok(false)
            }
            Some(PbFileReqMode::HoleList) => {
                if req.holes.is_empty() || req.holes.len() > MAX_FILE_HOLES {
                    return Err(PbError::InvalidPacket);
                }
                self.add_entry(PbEntry::new_file(callsign, req.file_id, req.holes, ts.unix_secs()))?;
                Ok(true)
            }
            None => Err(PbError::InvalidPacket),
        }
    }

    /// Sends one frame for the current entry, then moves the pointer on
    fn next_action(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        let Some(pos) = self.list.current() else {
            return;
        };
        let now = ts.unix_secs();
        let max_age = self.config.config().broadcast.max_age_secs;
        let config = self.config.clone();
        let dir = self.dir.clone();

        let step = {
            let Some(entry) = self.list.get_mut(pos) else {
                return;
            };
            if (now.saturating_sub(entry.request_time) as u64) > max_age {
                tracing::info!("next_action: {} timed out", entry.callsign);
                Step::Remove
            } else if entry.is_dir() {
                let dir = dir.read();
                Self::dir_step(entry, &dir, |data| Self::queue_broadcast(queue, &config, ts, Ax25Pid::Directory, data))
            } else {
                let mut dir = dir.write();
                Self::file_step(entry, &mut dir, now, |data| Self::queue_broadcast(queue, &config, ts, Ax25Pid::File, data))
            }
        };

        match step {
            Step::Keep => self.list.advance(),
            Step::Remove => self.remove_entry(pos),
        }
    }

    fn queue_broadcast(queue: &mut MessageQueue, config: &SharedConfig, ts: PacsatTime, pid: Ax25Pid, data: Vec<u8>) {
        let broadcast = config.config().identity.broadcast.clone();
        let frame = Ax25Frame::new_ui(well_known::qst(), broadcast, pid, data);
        tracing::trace!("-> {}", frame);
        queue.push_back(SapMsg {
            sap: Sap::LmSap,
            src: PacsatEntity::Pb,
            dest: PacsatEntity::Radio,
            ts,
            msg: SapMsgInner::LmTxReq(LmTxReq { channel: 0, data: frame.to_bytes(), expedited: false }),
        });
    }

    /// Broadcasts the next PFH chunk for a directory entry.
    ///
    /// The entries of the current hole are sent oldest first. When a hole holds no entry
    /// at all, the nearest entry outside it is sent once so that its t_old/t_new tell the
    /// station the range is empty.
    fn dir_step(entry: &mut PbEntry, dir: &Directory, mut send: impl FnMut(Vec<u8>)) -> Step {
        let PbKind::Dir { holes, after, current } = &mut entry.kind else {
            return Step::Remove;
        };
        let Some(hole) = holes.get(entry.hole).copied() else {
            return Step::Remove;
        };

        let target = match current.and_then(|t| dir.find_by_upload_time(t)) {
            Some(e) => Some(e),
            None => {
                *current = None;
                entry.offset = 0;
                dir.find_by_date_range(hole.start, hole.end, *after)
                    .or_else(|| if after.is_none() { dir.find_nearest(hole.start, hole.end) } else { None })
            }
        };

        let mut hole_done = true;
        if let Some(target) = target {
            match Self::dir_frame(dir, target, entry.offset) {
                Ok((bytes, sent_to)) => {
                    send(bytes);
                    if sent_to < u32::from(target.body_offset) {
                        *current = Some(target.upload_time);
                        entry.offset = sent_to;
                        hole_done = false;
                    } else {
                        *current = None;
                        entry.offset = 0;
                        let more = hole.contains(target.upload_time)
                            && dir.next(target.upload_time).is_some_and(|n| n.upload_time <= hole.end);
                        *after = Some(target.upload_time);
                        hole_done = !more;
                    }
                }
                Err(e) => {
                    tracing::warn!("dir_step: cannot read header of {:04x}: {}", target.file_id, e);
                    *current = None;
                    entry.offset = 0;
                    *after = Some(target.upload_time);
                    hole_done = !hole.contains(target.upload_time);
                }
            }
        }

        if hole_done {
            entry.hole += 1;
            entry.offset = 0;
            *after = None;
            *current = None;
            if entry.hole >= holes.len() {
                tracing::debug!("dir_step: all holes sent to {}", entry.callsign);
                return Step::Remove;
            }
        }
        Step::Keep
    }

    /// Builds a directory broadcast frame from `offset` of the entry's PFH.
    /// Returns the frame bytes and the PFH offset just past the chunk.
    fn dir_frame(dir: &Directory, target: &DirEntry, offset: u32) -> Result<(Vec<u8>, u32), crate::dir::DirErr> {
        let header = dir.read_header_bytes(target)?;
        let start = usize::min(offset as usize, header.len());
        let end = usize::min(start + MAX_DIR_PFH_LENGTH, header.len());

        let mut flags = 0;
        if end == header.len() {
            flags |= PB_FLAG_E;
        }
        let t_old = dir.prev(target.upload_time).map(|p| p.upload_time + 1).unwrap_or(0);
        let t_new = match dir.next(target.upload_time) {
            Some(n) => n.upload_time - 1,
            None => {
                flags |= PB_FLAG_N;
                target.upload_time
            }
        };
        let frame = DirBroadcast {
            flags,
            file_id: target.file_id,
            offset: start as u32,
            t_old,
            t_new,
            data: header[start..end].to_vec(),
        };
        Ok((frame.to_bytes(), end as u32))
    }

    /// Broadcasts the next chunk of a file entry, whole file or current hole.
    /// A completed whole-file broadcast is stamped into the file's header.
    fn file_step(entry: &mut PbEntry, dir: &mut Directory, now: UnixTime, mut send: impl FnMut(Vec<u8>)) -> Step {
        let PbKind::File { file_id, holes } = &entry.kind else {
            return Step::Remove;
        };
        let file_id = *file_id;
        let Some(target) = dir.find_by_id(file_id).cloned() else {
            tracing::info!("file_step: {:04x} no longer in the directory", file_id);
            return Step::Remove;
        };

        let (hole_end, whole_file) = match holes.get(entry.hole) {
            Some(h) => (u32::min(h.offset + h.length as u32, target.file_size), false),
            None if holes.is_empty() => (target.file_size, true),
            None => return Step::Remove,
        };
        let remaining = hole_end.saturating_sub(entry.offset) as usize;
        if remaining == 0 {
            return Self::next_file_hole(entry);
        }

        let data = match dir.read_chunk(&target, entry.offset, usize::min(remaining, PB_FILE_DEFAULT_BLOCK_SIZE)) {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => return Step::Remove,
            Err(e) => {
                tracing::warn!("file_step: cannot read {:04x}: {}", file_id, e);
                return Step::Remove;
            }
        };

        let end = entry.offset + data.len() as u32;
        let frame = FileBroadcast {
            flags: if end >= target.file_size { PB_FLAG_E } else { 0 },
            file_id,
            file_type: target.file_type,
            offset: entry.offset,
            data,
        };
        send(frame.to_bytes());
        entry.offset = end;

        if end < hole_end {
            return Step::Keep;
        }
        if whole_file {
            tracing::info!("file_step: {:04x} sent to {}", file_id, entry.callsign);
            if let Err(e) = dir.stamp_download(file_id, now) {
                tracing::warn!("file_step: cannot stamp download time of {:04x}: {}", file_id, e);
            }
            return Step::Remove;
        }
        Self::next_file_hole(entry)
    }

    fn next_file_hole(entry: &mut PbEntry) -> Step {
        let PbKind::File { holes, .. } = &entry.kind else {
            return Step::Remove;
        };
        entry.hole += 1;
        match holes.get(entry.hole) {
            Some(h) => {
                entry.offset = h.offset;
                Step::Keep
            }
            None => Step::Remove,
        }
    }

    fn send_status(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        let period = self.config.config().broadcast.status_period_secs;
        let Some(deadline) = self.next_status else {
            self.next_status = Some(ts.add_secs(period));
            return;
        };
        if ts < deadline {
            return;
        }
        self.next_status = Some(ts.add_secs(period));

        if !self.config.state_read().pb_enabled {
            self.send_ui(queue, ts, well_known::pb_shut(), Ax25Pid::NoProtocol, b"PB Closed.".to_vec());
            return;
        }
        let dest = if self.list.is_full() { well_known::pb_full() } else { well_known::pb_list() };
        self.send_ui(queue, ts, dest, Ax25Pid::NoProtocol, self.list.status_text().into_bytes());
    }
}

impl PacsatEntityTrait for PbBs {
    fn entity(&self) -> PacsatEntity {
        PacsatEntity::Pb
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, ts: PacsatTime) {
        self.send_status(queue, ts);

        self.ticks += 1;
        let service_ticks = self.config.config().broadcast.service_ticks.max(1);
        if self.ticks % service_ticks == 0 {
            self.next_action(queue, ts);
        }
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("rx_prim: {}", message.msg);

        assert!(message.sap == Sap::LmSap);

        match message.msg {
            SapMsgInner::LmFrameInd(_) => {
                self.rx_lm_frame_ind(queue, message);
            }
            _ => {
                panic!();
            }
        }
    }
}
