//! crates/metadata/src/sddl/binary.rs
//!
//! Self-relative security descriptor encoding.
//!
//! Layout: a 20-byte header (revision, padding, control word, then owner,
//! group, SACL and DACL offsets) followed by the referenced SIDs and ACLs.
//! Every multi-byte field is little-endian except the SID identifier
//! authority.

use super::ace::{Ace, read_u32};
use super::sid::{Sid, Trustee};
use super::{Dacl, DaclFlag, SddlError, SecurityDescriptor};

const HEADER_LEN: usize = 20;
const ACL_HEADER_LEN: usize = 8;
const DESCRIPTOR_REVISION: u8 = 1;
const ACL_REVISION: u8 = 2;
const ACL_REVISION_DS: u8 = 4;

const SE_DACL_PRESENT: u16 = 0x0004;
const SE_SELF_RELATIVE: u16 = 0x8000;

/// Control bits mapped to DACL flags, in the order they are rendered.
const DACL_CONTROL_FLAGS: [DaclFlag; 3] = [
    DaclFlag::Protected,
    DaclFlag::AutoInheritRequired,
    DaclFlag::AutoInherited,
];

impl SecurityDescriptor {
    /// Decodes a self-relative binary descriptor.
    ///
    /// The SACL, if present, is skipped. Flags and rights are spelled the way
    /// the platform renders them: DACL flags as `P`, `AR`, `AI` in that order,
    /// ACE flags in ascending bit order, and rights per
    /// [`AccessRights::from_mask`](super::AccessRights::from_mask).
    pub fn from_self_relative(data: &[u8]) -> Result<Self, SddlError> {
        if data.len() < HEADER_LEN {
            return Err(SddlError::Truncated("security descriptor header"));
        }
        if data[0] != DESCRIPTOR_REVISION {
            return Err(SddlError::UnsupportedRevision(data[0]));
        }
        let control = u16::from_le_bytes([data[2], data[3]]);
        if control & SE_SELF_RELATIVE == 0 {
            return Err(SddlError::InvalidBinary("descriptor is not self-relative"));
        }

        let owner = read_sid_at(data, read_offset(data, 4)?)?;
        let group = read_sid_at(data, read_offset(data, 8)?)?;

        let dacl = if control & SE_DACL_PRESENT == 0 {
            None
        } else {
            let offset = read_offset(data, 16)?;
            if offset == 0 {
                Some(Dacl::null())
            } else {
                let flags = DACL_CONTROL_FLAGS
                    .into_iter()
                    .filter(|flag| flag.control_bit().is_some_and(|bit| control & bit != 0))
                    .collect();
                Some(Dacl::new(flags, read_acl(data, offset)?))
            }
        };

        Ok(Self::new(owner, group, dacl))
    }

    /// Encodes the descriptor in self-relative form.
    ///
    /// Domain-relative aliases are expanded with `resolve`.
    pub fn to_self_relative(
        &self,
        resolve: &dyn Fn(&str) -> Option<Sid>,
    ) -> Result<Vec<u8>, SddlError> {
        let mut control = SE_SELF_RELATIVE;
        let mut out = vec![0u8; HEADER_LEN];
        out[0] = DESCRIPTOR_REVISION;

        let owner_offset = write_trustee(&mut out, self.owner(), resolve)?;
        let group_offset = write_trustee(&mut out, self.group(), resolve)?;

        let mut dacl_offset = 0;
        if let Some(dacl) = self.dacl() {
            control |= SE_DACL_PRESENT;
            for bit in dacl.flags().iter().filter_map(|flag| flag.control_bit()) {
                control |= bit;
            }
            if !dacl.is_null() {
                dacl_offset = offset_u32(out.len())?;
                write_acl(&mut out, dacl.aces(), resolve)?;
            }
        }

        out[2..4].copy_from_slice(&control.to_le_bytes());
        out[4..8].copy_from_slice(&owner_offset.to_le_bytes());
        out[8..12].copy_from_slice(&group_offset.to_le_bytes());
        out[16..20].copy_from_slice(&dacl_offset.to_le_bytes());
        Ok(out)
    }
}

fn read_offset(data: &[u8], at: usize) -> Result<usize, SddlError> {
    let offset = read_u32(data, at)?;
    usize::try_from(offset).map_err(|_| SddlError::InvalidBinary("offset out of range"))
}

fn read_sid_at(data: &[u8], offset: usize) -> Result<Option<Trustee>, SddlError> {
    if offset == 0 {
        return Ok(None);
    }
    let slice = data
        .get(offset..)
        .ok_or(SddlError::InvalidBinary("SID offset past end of descriptor"))?;
    let (sid, _) = Sid::from_bytes(slice)?;
    Ok(Some(Trustee::from_sid(sid)))
}

fn read_acl(data: &[u8], offset: usize) -> Result<Vec<Ace>, SddlError> {
    let header = data
        .get(offset..offset + ACL_HEADER_LEN)
        .ok_or(SddlError::Truncated("ACL header"))?;
    let revision = header[0];
    if revision != ACL_REVISION && revision != ACL_REVISION_DS {
        return Err(SddlError::UnsupportedRevision(revision));
    }
    let size = usize::from(u16::from_le_bytes([header[2], header[3]]));
    let count = usize::from(u16::from_le_bytes([header[4], header[5]]));
    if size < ACL_HEADER_LEN {
        return Err(SddlError::InvalidBinary("ACL size smaller than its header"));
    }
    let acl = data
        .get(offset..offset + size)
        .ok_or(SddlError::Truncated("ACL entries"))?;

    let mut aces = Vec::with_capacity(count);
    let mut cursor = ACL_HEADER_LEN;
    for _ in 0..count {
        let (ace, consumed) = Ace::from_bytes(&acl[cursor..])?;
        aces.push(ace);
        cursor += consumed;
    }
    Ok(aces)
}

fn write_trustee(
    out: &mut Vec<u8>,
    trustee: Option<&Trustee>,
    resolve: &dyn Fn(&str) -> Option<Sid>,
) -> Result<u32, SddlError> {
    let Some(trustee) = trustee else {
        return Ok(0);
    };
    let offset = offset_u32(out.len())?;
    trustee.to_sid(resolve)?.write_bytes(out);
    Ok(offset)
}

fn write_acl(
    out: &mut Vec<u8>,
    aces: &[Ace],
    resolve: &dyn Fn(&str) -> Option<Sid>,
) -> Result<(), SddlError> {
    let start = out.len();
    let revision = if aces.iter().any(|ace| ace.ace_type.is_object()) {
        ACL_REVISION_DS
    } else {
        ACL_REVISION
    };
    let count =
        u16::try_from(aces.len()).map_err(|_| SddlError::InvalidBinary("too many ACEs"))?;
    out.extend_from_slice(&[revision, 0, 0, 0]);
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    for ace in aces {
        ace.write_bytes(out, resolve)?;
    }
    let size = u16::try_from(out.len() - start)
        .map_err(|_| SddlError::InvalidBinary("ACL larger than 64 KiB"))?;
    out[start + 2..start + 4].copy_from_slice(&size.to_le_bytes());
    Ok(())
}

fn offset_u32(len: usize) -> Result<u32, SddlError> {
    u32::try_from(len).map_err(|_| SddlError::InvalidBinary("descriptor too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `O:BAG:SYD:PAI(A;OICI;FA;;;SY)` as stored by Windows.
    fn sample() -> Vec<u8> {
        let mut bytes = vec![
            0x01, 0x00, 0x04, 0x94, // revision, sbz, control = SR | P | AI | DACL_PRESENT
            0x14, 0x00, 0x00, 0x00, // owner at 20
            0x24, 0x00, 0x00, 0x00, // group at 36
            0x00, 0x00, 0x00, 0x00, // no SACL
            0x30, 0x00, 0x00, 0x00, // DACL at 48
        ];
        // S-1-5-32-544
        bytes.extend_from_slice(&[1, 2, 0, 0, 0, 0, 0, 5, 0x20, 0, 0, 0, 0x20, 0x02, 0, 0]);
        // S-1-5-18
        bytes.extend_from_slice(&[1, 1, 0, 0, 0, 0, 0, 5, 0x12, 0, 0, 0]);
        // ACL: revision 2, size 28, one ACE
        bytes.extend_from_slice(&[2, 0, 28, 0, 1, 0, 0, 0]);
        // ACE: allowed, OI|CI, size 20, mask FA, S-1-5-18
        bytes.extend_from_slice(&[0, 0x03, 20, 0, 0xFF, 0x01, 0x1F, 0x00]);
        bytes.extend_from_slice(&[1, 1, 0, 0, 0, 0, 0, 5, 0x12, 0, 0, 0]);
        bytes
    }

    #[test]
    fn decodes_windows_layout() {
        let descriptor = SecurityDescriptor::from_self_relative(&sample()).unwrap();
        assert_eq!(descriptor.to_string(), "O:BAG:SYD:PAI(A;OICI;FA;;;SY)");
    }

    #[test]
    fn encodes_to_same_bytes() {
        let descriptor: SecurityDescriptor = "O:BAG:SYD:PAI(A;OICI;FA;;;SY)".parse().unwrap();
        assert_eq!(descriptor.to_self_relative(&|_| None).unwrap(), sample());
    }

    #[test]
    fn sacl_is_ignored() {
        let mut bytes = sample();
        // Mark a SACL as present at the DACL's offset; decoding must not care.
        bytes[2] |= 0x10;
        bytes[12] = 0x30;
        let descriptor = SecurityDescriptor::from_self_relative(&bytes).unwrap();
        assert_eq!(descriptor.to_string(), "O:BAG:SYD:PAI(A;OICI;FA;;;SY)");
    }

    #[test]
    fn null_and_absent_dacls() {
        let mut bytes = sample();
        bytes[16] = 0;
        let null = SecurityDescriptor::from_self_relative(&bytes).unwrap();
        assert_eq!(null.to_string(), "O:BAG:SYD:NO_ACCESS_CONTROL");

        bytes[2] &= !0x04;
        let absent = SecurityDescriptor::from_self_relative(&bytes).unwrap();
        assert_eq!(absent.to_string(), "O:BAG:SY");
    }

    #[test]
    fn rejects_malformed_input() {
        let bytes = sample();
        assert!(matches!(
            SecurityDescriptor::from_self_relative(&bytes[..10]),
            Err(SddlError::Truncated(_))
        ));
        assert!(SecurityDescriptor::from_self_relative(&bytes[..50]).is_err());

        let mut absolute = bytes.clone();
        absolute[3] &= 0x7F;
        assert!(matches!(
            SecurityDescriptor::from_self_relative(&absolute),
            Err(SddlError::InvalidBinary(_))
        ));

        let mut bad_revision = bytes;
        bad_revision[0] = 9;
        assert_eq!(
            SecurityDescriptor::from_self_relative(&bad_revision),
            Err(SddlError::UnsupportedRevision(9))
        );
    }

    #[test]
    fn domain_aliases_need_resolver_to_encode() {
        let descriptor: SecurityDescriptor = "O:DA".parse().unwrap();
        assert!(matches!(
            descriptor.to_self_relative(&|_| None),
            Err(SddlError::UnresolvedAlias(_))
        ));
    }
}
