//! In-place edits of an encoded header. Items before the patched one keep their
//! positions, so a body following the header is never touched.

use pacsat_core::PduParseErr;

use crate::pfh::PFH_ITEM_HDR_LEN;
use crate::pfh::enums::pfh_item_id::PfhItemId;
use crate::pfh::pfh_header::{PfhItem, walk_items};

/// Additive 16-bit checksum, as used for PFH bodies
pub fn body_checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Additive checksum over header bytes, leaving out the data of the HEADER_CHECKSUM item
pub(crate) fn header_checksum(header: &[u8], items: &[PfhItem]) -> u16 {
    let mut sum = body_checksum(header);
    for item in items.iter().filter(|i| i.id as u64 == PfhItemId::HeaderChecksum.into_raw()) {
        sum = sum.wrapping_sub(body_checksum(&header[item.data_range()]));
    }
    sum
}

pub(crate) fn put_le(bytes: &mut [u8], pos: usize, value: u64, num_bytes: usize) {
    for i in 0..num_bytes {
        bytes[pos + i] = (value >> (8 * i)) as u8;
    }
}

/// Rewrites a 4-byte item (such as UPLOAD_TIME or DOWNLOAD_TIME) and recomputes the
/// header checksum. `bytes` may extend past the header.
pub fn patch_u32(bytes: &mut [u8], item_id: PfhItemId, value: u32) -> Result<(), PduParseErr> {
    let (items, consumed) = walk_items(bytes)?;

    let Some(target) = items.iter().find(|i| i.id as u64 == item_id.into_raw()) else {
        return Err(PduParseErr::FieldNotPresent { field: Some("patched item") });
    };
    if target.len != 4 {
        return Err(PduParseErr::InconsistentLength { expected: 4, found: target.len as usize });
    }
    let Some(checksum) = items.iter().find(|i| i.id as u64 == PfhItemId::HeaderChecksum.into_raw()) else {
        return Err(PduParseErr::FieldNotPresent { field: Some("header_checksum") });
    };
    if checksum.len != 2 {
        return Err(PduParseErr::InconsistentLength { expected: 2, found: checksum.len as usize });
    }

    put_le(bytes, target.pos + PFH_ITEM_HDR_LEN, value as u64, 4);
    let sum = header_checksum(&bytes[..consumed], &items);
    put_le(bytes, checksum.pos + PFH_ITEM_HDR_LEN, sum as u64, 2);
    Ok(())
}
