use core::fmt;

use pacsat_core::{Callsign, FileId, UnixTime};
use pacsat_pdus::pb::pdus::dir_request::DirHole;
use pacsat_pdus::pb::pdus::file_request::FileHole;

/// What a broadcast entry is sending
#[derive(Debug, Clone, PartialEq)]
pub enum PbKind {
    Dir {
        holes: Vec<DirHole>,
        /// Upload time of the last entry fully sent for the current hole
        after: Option<UnixTime>,
        /// Upload time of the entry whose PFH is partly sent
        current: Option<UnixTime>,
    },
    File {
        file_id: FileId,
        /// Empty for the whole file
        holes: Vec<FileHole>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbEntry {
    pub callsign: Callsign,
    pub kind: PbKind,
    /// Index into the hole list
    pub hole: usize,
    /// Next byte to send, within the PFH for a directory entry, the file otherwise
    pub offset: u32,
    pub request_time: UnixTime,
}

impl PbEntry {
    pub fn new_dir(callsign: Callsign, holes: Vec<DirHole>, now: UnixTime) -> Self {
        Self {
            callsign,
            kind: PbKind::Dir { holes, after: None, current: None },
            hole: 0,
            offset: 0,
            request_time: now,
        }
    }

    pub fn new_file(callsign: Callsign, file_id: FileId, holes: Vec<FileHole>, now: UnixTime) -> Self {
        let offset = holes.first().map(|h| h.offset).unwrap_or(0);
        Self {
            callsign,
            kind: PbKind::File { file_id, holes },
            hole: 0,
            offset,
            request_time: now,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, PbKind::Dir { .. })
    }

    pub fn file_id(&self) -> Option<FileId> {
        match self.kind {
            PbKind::File { file_id, .. } => Some(file_id),
            PbKind::Dir { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbListErr {
    Full,
    AlreadyListed,
}

impl fmt::Display for PbListErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PbListErr::Full => write!(f, "broadcast list full"),
            PbListErr::AlreadyListed => write!(f, "station already on the broadcast list"),
        }
    }
}

/// Broadcast list, serviced round-robin from `current`
pub struct PbList {
    entries: Vec<PbEntry>,
    max_entries: usize,
    current: usize,
}

impl PbList {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: Vec::with_capacity(max_entries), max_entries, current: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PbEntry> {
        self.entries.iter()
    }

    pub fn get(&self, pos: usize) -> Option<&PbEntry> {
        self.entries.get(pos)
    }

    pub fn get_mut(&mut self, pos: usize) -> Option<&mut PbEntry> {
        self.entries.get_mut(pos)
    }

    pub fn position(&self, callsign: &Callsign) -> Option<usize> {
        self.entries.iter().position(|e| &e.callsign == callsign)
    }

    /// Position of the entry to service next
    pub fn current(&self) -> Option<usize> {
        if self.entries.is_empty() { None } else { Some(self.current) }
    }

    pub fn add(&mut self, entry: PbEntry) -> Result<(), PbListErr> {
        if self.is_full() {
            return Err(PbListErr::Full);
        }
        if self.position(&entry.callsign).is_some() {
            return Err(PbListErr::AlreadyListed);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes the entry at `pos`. The current pointer keeps pointing at the same
    /// entry, or at the one that took the removed entry's place.
    pub fn remove(&mut self, pos: usize) -> Option<PbEntry> {
        if pos >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(pos);
        if pos < self.current {
            self.current -= 1;
        }
        if self.current >= self.entries.len() {
            self.current = 0;
        }
        Some(entry)
    }

    /// Moves the pointer to the next entry, wrapping around
    pub fn advance(&mut self) {
        self.current += 1;
        if self.current >= self.entries.len() {
            self.current = 0;
        }
    }

    /// Status text: `PB Empty.` or `PB ` followed by each station, directory requests marked `/D`
    pub fn status_text(&self) -> String {
        if self.entries.is_empty() {
            return "PB Empty.".to_string();
        }
        let mut text = "PB ".to_string();
        for e in &self.entries {
            text.push_str(&e.callsign.to_string());
            text.push_str(if e.is_dir() { "/D " } else { " " });
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(call: &str) -> PbEntry {
        PbEntry::new_dir(Callsign::parse(call).unwrap(), vec![DirHole { start: 0, end: 100 }], 1000)
    }

    #[test]
    fn test_admission() {
        let mut list = PbList::new(3);
        assert_eq!(list.current(), None);
        list.add(entry("A1A")).unwrap();
        list.add(entry("B1B")).unwrap();
        assert_eq!(list.add(entry("a1a")), Err(PbListErr::AlreadyListed));
        list.add(entry("C1C")).unwrap();
        assert!(list.is_full());
        assert_eq!(list.add(entry("D1D")), Err(PbListErr::Full));
        assert_eq!(list.len(), 3);
        assert_eq!(list.position(&Callsign::parse("C1C").unwrap()), Some(2));
    }

    #[test]
    fn test_remove_adjusts_pointer() {
        let mut list = PbList::new(10);
        for call in ["A1A", "B1B", "C1C", "D1D"] {
            list.add(entry(call)).unwrap();
        }
        list.advance();
        list.advance();
        assert_eq!(list.current(), Some(2));

        // Before the pointer: pointer follows its entry
        list.remove(0);
        assert_eq!(list.get(list.current().unwrap()).unwrap().callsign.call(), "C1C");

        // At the pointer: the next entry takes its place
        list.remove(1);
        assert_eq!(list.get(list.current().unwrap()).unwrap().callsign.call(), "D1D");

        // At the pointer, last entry: wrap around
        list.remove(1);
        assert_eq!(list.current(), Some(0));
        assert_eq!(list.get(0).unwrap().callsign.call(), "B1B");

        list.remove(0);
        assert_eq!(list.current(), None);
        assert_eq!(list.remove(0), None);
    }

    #[test]
    fn test_status_text() {
        let mut list = PbList::new(10);
        assert_eq!(list.status_text(), "PB Empty.");
        list.add(entry("G0ABC")).unwrap();
        list.add(PbEntry::new_file(Callsign::parse("N0CALL-2").unwrap(), 0x12, vec![], 1000)).unwrap();
        assert_eq!(list.status_text(), "PB G0ABC/D N0CALL-2 ");
    }
}
