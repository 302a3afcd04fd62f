//! crates/metadata/src/sddl/sid.rs
//!
//! Security identifiers in binary, numeric (`S-1-...`) and alias form.

use std::fmt;
use std::str::FromStr;

use super::SddlError;

/// Largest number of sub-authorities a SID may carry.
pub const MAX_SUB_AUTHORITIES: usize = 15;

/// Identifier authorities are 48-bit values.
const MAX_AUTHORITY: u64 = (1 << 48) - 1;

/// Aliases whose SID is the same on every machine.
///
/// The table is the SDDL alias set for built-in principals. Rendering from
/// binary uses it to produce the short form; portable strings use it to
/// expand aliases back to numeric SIDs.
pub const WELL_KNOWN_ALIASES: &[(&str, &str)] = &[
    ("WD", "S-1-1-0"),
    ("CO", "S-1-3-0"),
    ("CG", "S-1-3-1"),
    ("OW", "S-1-3-4"),
    ("NU", "S-1-5-2"),
    ("IU", "S-1-5-4"),
    ("SU", "S-1-5-6"),
    ("AN", "S-1-5-7"),
    ("ED", "S-1-5-9"),
    ("PS", "S-1-5-10"),
    ("AU", "S-1-5-11"),
    ("RC", "S-1-5-12"),
    ("SY", "S-1-5-18"),
    ("LS", "S-1-5-19"),
    ("NS", "S-1-5-20"),
    ("WR", "S-1-5-33"),
    ("BA", "S-1-5-32-544"),
    ("BU", "S-1-5-32-545"),
    ("BG", "S-1-5-32-546"),
    ("PU", "S-1-5-32-547"),
    ("AO", "S-1-5-32-548"),
    ("SO", "S-1-5-32-549"),
    ("PO", "S-1-5-32-550"),
    ("BO", "S-1-5-32-551"),
    ("RE", "S-1-5-32-552"),
    ("RU", "S-1-5-32-554"),
    ("RD", "S-1-5-32-555"),
    ("NO", "S-1-5-32-556"),
    ("MU", "S-1-5-32-558"),
    ("LU", "S-1-5-32-559"),
    ("IS", "S-1-5-32-568"),
    ("CY", "S-1-5-32-569"),
    ("ER", "S-1-5-32-573"),
    ("CD", "S-1-5-32-574"),
    ("RA", "S-1-5-32-575"),
    ("ES", "S-1-5-32-576"),
    ("MS", "S-1-5-32-577"),
    ("HA", "S-1-5-32-578"),
    ("AA", "S-1-5-32-579"),
    ("RM", "S-1-5-32-580"),
    ("UD", "S-1-5-84-0-0-0-0-0"),
    ("AC", "S-1-15-2-1"),
    ("LW", "S-1-16-4096"),
    ("ME", "S-1-16-8192"),
    ("MP", "S-1-16-8448"),
    ("HI", "S-1-16-12288"),
    ("SI", "S-1-16-16384"),
    ("AS", "S-1-18-1"),
    ("SS", "S-1-18-2"),
];

/// Aliases relative to the machine or domain SID. They can be parsed and
/// re-rendered, but expanding them needs the host's help.
pub const DOMAIN_RELATIVE_ALIASES: &[&str] = &[
    "RO", "LA", "LG", "DA", "DU", "DG", "DC", "DD", "CA", "SA", "EA", "PA", "CN", "AP", "KA",
    "EK", "RS",
];

/// A binary security identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sid {
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    /// SID revision; the only one defined.
    pub const REVISION: u8 = 1;

    /// Builds a SID from its identifier authority and sub-authorities.
    pub fn new(authority: u64, sub_authorities: Vec<u32>) -> Result<Self, SddlError> {
        if authority > MAX_AUTHORITY || sub_authorities.len() > MAX_SUB_AUTHORITIES {
            return Err(SddlError::InvalidSid(format!(
                "authority {authority} with {} sub-authorities",
                sub_authorities.len()
            )));
        }
        Ok(Self {
            authority,
            sub_authorities,
        })
    }

    /// Identifier authority (48-bit).
    #[must_use]
    pub const fn authority(&self) -> u64 {
        self.authority
    }

    /// Sub-authority values in order.
    #[must_use]
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Size of the binary encoding in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + 4 * self.sub_authorities.len()
    }

    /// Decodes a SID at the start of `data`.
    ///
    /// Returns the SID together with the number of bytes consumed.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), SddlError> {
        if data.len() < 8 {
            return Err(SddlError::Truncated("SID header"));
        }
        if data[0] != Self::REVISION {
            return Err(SddlError::InvalidBinary("unsupported SID revision"));
        }
        let count = usize::from(data[1]);
        if count > MAX_SUB_AUTHORITIES {
            return Err(SddlError::InvalidBinary("too many SID sub-authorities"));
        }
        let len = 8 + 4 * count;
        if data.len() < len {
            return Err(SddlError::Truncated("SID sub-authorities"));
        }

        // The identifier authority is stored big-endian, unlike everything else.
        let authority = data[2..8]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        let sub_authorities = data[8..len]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok((
            Self {
                authority,
                sub_authorities,
            },
            len,
        ))
    }

    /// Appends the binary encoding to `out`.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        out.push(Self::REVISION);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in &self.sub_authorities {
            out.extend_from_slice(&sub.to_le_bytes());
        }
    }

    /// Returns the machine-independent alias for this SID, if it has one.
    #[must_use]
    pub fn well_known_alias(&self) -> Option<&'static str> {
        let rendered = self.to_string();
        WELL_KNOWN_ALIASES
            .iter()
            .find(|(_, sid)| *sid == rendered)
            .map(|(alias, _)| *alias)
    }

    /// Looks up the SID behind a machine-independent alias.
    #[must_use]
    pub fn from_well_known_alias(alias: &str) -> Option<Self> {
        WELL_KNOWN_ALIASES
            .iter()
            .find(|(name, _)| *name == alias)
            .and_then(|(_, sid)| sid.parse().ok())
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-", Self::REVISION)?;
        if self.authority >> 32 == 0 {
            write!(f, "{}", self.authority)?;
        } else {
            write!(f, "0x{:012X}", self.authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for Sid {
    type Err = SddlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SddlError::InvalidSid(s.to_owned());
        let mut parts = s.split('-');
        if parts.next() != Some("S") || parts.next() != Some("1") {
            return Err(invalid());
        }
        let authority_text = parts.next().ok_or_else(invalid)?;
        let authority = if let Some(hex) = authority_text
            .strip_prefix("0x")
            .or_else(|| authority_text.strip_prefix("0X"))
        {
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            u64::from_str_radix(hex, 16).map_err(|_| invalid())?
        } else {
            parse_decimal(authority_text).ok_or_else(invalid)?
        };
        let sub_authorities = parts
            .map(|part| {
                parse_decimal(part)
                    .and_then(|value| u32::try_from(value).ok())
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(authority, sub_authorities).map_err(|_| invalid())
    }
}

fn parse_decimal(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// The principal named in an owner, group or ACE field.
///
/// The spelling found in text is kept so that a parsed descriptor renders
/// back to the same string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Trustee {
    /// Machine-independent alias such as `SY` or `BA`.
    WellKnown(&'static str),
    /// Alias relative to the local machine or domain, such as `DA` or `LA`.
    DomainRelative(&'static str),
    /// Numeric SID.
    Sid(Sid),
}

impl Trustee {
    /// Chooses the rendering used for a SID decoded from binary: the
    /// well-known alias when one exists, the numeric form otherwise.
    #[must_use]
    pub fn from_sid(sid: Sid) -> Self {
        match sid.well_known_alias() {
            Some(alias) => Self::WellKnown(alias),
            None => Self::Sid(sid),
        }
    }

    /// Returns the numeric SID, expanding well-known aliases.
    ///
    /// Domain-relative aliases are handed to `resolve`; `None` from the
    /// resolver is reported as [`SddlError::UnresolvedAlias`].
    pub fn to_sid(&self, resolve: &dyn Fn(&str) -> Option<Sid>) -> Result<Sid, SddlError> {
        match self {
            Self::WellKnown(alias) => Sid::from_well_known_alias(alias)
                .ok_or_else(|| SddlError::UnresolvedAlias((*alias).to_owned())),
            Self::DomainRelative(alias) => {
                resolve(alias).ok_or_else(|| SddlError::UnresolvedAlias((*alias).to_owned()))
            }
            Self::Sid(sid) => Ok(sid.clone()),
        }
    }
}

impl fmt::Display for Trustee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WellKnown(alias) | Self::DomainRelative(alias) => f.write_str(alias),
            Self::Sid(sid) => write!(f, "{sid}"),
        }
    }
}

impl FromStr for Trustee {
    type Err = SddlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("S-") {
            return s.parse().map(Self::Sid);
        }
        if let Some((alias, _)) = WELL_KNOWN_ALIASES.iter().find(|(alias, _)| *alias == s) {
            return Ok(Self::WellKnown(*alias));
        }
        if let Some(alias) = DOMAIN_RELATIVE_ALIASES.iter().find(|alias| **alias == s) {
            return Ok(Self::DomainRelative(*alias));
        }
        Err(SddlError::UnknownAlias(s.to_owned()))
    }
}
