use core::fmt::Display;

use pacsat_core::PacsatTime;
use pacsat_core::Sap;
use pacsat_core::pacsat_entities::PacsatEntity;

use super::dl::*;
use super::lm::*;

/// Exhaustive list of primitives exchanged between entities
#[derive(Debug)]
pub enum SapMsgInner {
    // LM-SAP
    LmRawInd(LmRawInd),
    LmFrameInd(LmFrameInd),
    LmTxReq(LmTxReq),

    // DL-SAP, DataLink -> Uplink
    DlConnectInd(DlConnectInd),
    DlConnectConf(DlConnectConf),
    DlDisconnectInd(DlDisconnectInd),
    DlDisconnectConf(DlDisconnectConf),
    DlDataInd(DlDataInd),
    DlErrorInd(DlErrorInd),

    // DL-SAP, Uplink -> DataLink
    DlDataReq(DlDataReq),
    DlDisconnectReq(DlDisconnectReq),
}

impl Display for SapMsgInner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SapMsgInner::LmRawInd(_) => write!(f, "LmRawInd"),
            SapMsgInner::LmFrameInd(_) => write!(f, "LmFrameInd"),
            SapMsgInner::LmTxReq(_) => write!(f, "LmTxReq"),
            SapMsgInner::DlConnectInd(_) => write!(f, "DlConnectInd"),
            SapMsgInner::DlConnectConf(_) => write!(f, "DlConnectConf"),
            SapMsgInner::DlDisconnectInd(_) => write!(f, "DlDisconnectInd"),
            SapMsgInner::DlDisconnectConf(_) => write!(f, "DlDisconnectConf"),
            SapMsgInner::DlDataInd(_) => write!(f, "DlDataInd"),
            SapMsgInner::DlErrorInd(_) => write!(f, "DlErrorInd"),
            SapMsgInner::DlDataReq(_) => write!(f, "DlDataReq"),
            SapMsgInner::DlDisconnectReq(_) => write!(f, "DlDisconnectReq"),
        }
    }
}

#[derive(Debug)]
pub struct SapMsg {
    pub sap: Sap,
    pub src: PacsatEntity,
    pub dest: PacsatEntity,
    /// Router time at which the message was submitted
    pub ts: PacsatTime,
    pub msg: SapMsgInner,
}

impl SapMsg {
    pub fn new(sap: Sap, src: PacsatEntity, dest: PacsatEntity, ts: PacsatTime, msg: SapMsgInner) -> Self {
        Self { sap, src, dest, ts, msg }
    }

    pub fn get_source(&self) -> &PacsatEntity {
        &self.src
    }
    pub fn get_dest(&self) -> &PacsatEntity {
        &self.dest
    }
    pub fn get_sap(&self) -> &Sap {
        &self.sap
    }
}
