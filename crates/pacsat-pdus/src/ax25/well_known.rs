//! Destination addresses with a fixed meaning in the PACSAT protocols

use pacsat_core::Callsign;

/// PB status: list has entries (or is empty)
pub fn pb_list() -> Callsign { Callsign::well_known("PBLIST", 0) }

/// PB status: list is full
pub fn pb_full() -> Callsign { Callsign::well_known("PBFULL", 0) }

/// PB status: broadcast service shut down
pub fn pb_shut() -> Callsign { Callsign::well_known("PBSHUT", 0) }

/// Destination of directory and file broadcast frames
pub fn qst() -> Callsign { Callsign::well_known("QST", 1) }

/// Destination of the uplink status beacon
pub fn bbs_stat() -> Callsign { Callsign::well_known("BBSTAT", 0) }
