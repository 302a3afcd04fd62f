//! crates/metadata/src/sddl/ace.rs
//!
//! Access control entries: types, inheritance flags, access rights and
//! object GUIDs, in both their SDDL and binary shapes.

use std::fmt;
use std::str::FromStr;

use super::SddlError;
use super::sid::{Sid, Trustee};

/// ACE types allowed in a DACL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AceType {
    /// `A`: access allowed.
    AccessAllowed,
    /// `D`: access denied.
    AccessDenied,
    /// `OA`: object-specific access allowed.
    ObjectAccessAllowed,
    /// `OD`: object-specific access denied.
    ObjectAccessDenied,
}

impl AceType {
    /// Binary `AceType` header value.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::AccessAllowed => 0x00,
            Self::AccessDenied => 0x01,
            Self::ObjectAccessAllowed => 0x05,
            Self::ObjectAccessDenied => 0x06,
        }
    }

    /// Maps a binary header value back to a type.
    pub const fn from_code(code: u8) -> Result<Self, SddlError> {
        match code {
            0x00 => Ok(Self::AccessAllowed),
            0x01 => Ok(Self::AccessDenied),
            0x05 => Ok(Self::ObjectAccessAllowed),
            0x06 => Ok(Self::ObjectAccessDenied),
            other => Err(SddlError::UnsupportedAceType(other)),
        }
    }

    /// SDDL token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::AccessAllowed => "A",
            Self::AccessDenied => "D",
            Self::ObjectAccessAllowed => "OA",
            Self::ObjectAccessDenied => "OD",
        }
    }

    /// Object ACEs carry optional object-type GUIDs.
    #[must_use]
    pub const fn is_object(self) -> bool {
        matches!(self, Self::ObjectAccessAllowed | Self::ObjectAccessDenied)
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "A" => Some(Self::AccessAllowed),
            "D" => Some(Self::AccessDenied),
            "OA" => Some(Self::ObjectAccessAllowed),
            "OD" => Some(Self::ObjectAccessDenied),
            _ => None,
        }
    }
}

/// A single ACE inheritance or audit flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AceFlag {
    /// `OI`: inherited by files.
    ObjectInherit,
    /// `CI`: inherited by directories.
    ContainerInherit,
    /// `NP`: inheritance stops at direct children.
    NoPropagateInherit,
    /// `IO`: applies to children only.
    InheritOnly,
    /// `ID`: the ACE was inherited.
    Inherited,
    /// `SA`: audit successful access.
    SuccessfulAccess,
    /// `FA`: audit failed access.
    FailedAccess,
}

impl AceFlag {
    /// Flags in ascending bit order, which is also the rendering order.
    pub const ALL: [Self; 7] = [
        Self::ObjectInherit,
        Self::ContainerInherit,
        Self::NoPropagateInherit,
        Self::InheritOnly,
        Self::Inherited,
        Self::SuccessfulAccess,
        Self::FailedAccess,
    ];

    /// Bit in the binary `AceFlags` byte.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::ObjectInherit => 0x01,
            Self::ContainerInherit => 0x02,
            Self::NoPropagateInherit => 0x04,
            Self::InheritOnly => 0x08,
            Self::Inherited => 0x10,
            Self::SuccessfulAccess => 0x40,
            Self::FailedAccess => 0x80,
        }
    }

    /// SDDL token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::ObjectInherit => "OI",
            Self::ContainerInherit => "CI",
            Self::NoPropagateInherit => "NP",
            Self::InheritOnly => "IO",
            Self::Inherited => "ID",
            Self::SuccessfulAccess => "SA",
            Self::FailedAccess => "FA",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.token() == token)
    }
}

/// Ordered ACE flags, as spelled in text or derived from binary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AceFlags(Vec<AceFlag>);

impl AceFlags {
    /// Expands a binary flag byte. Unknown bits are rejected.
    pub fn from_bits(bits: u8) -> Result<Self, SddlError> {
        let flags: Vec<AceFlag> = AceFlag::ALL
            .into_iter()
            .filter(|flag| bits & flag.bit() != 0)
            .collect();
        let known = flags.iter().fold(0u8, |acc, flag| acc | flag.bit());
        if known != bits {
            return Err(SddlError::InvalidBinary("unknown ACE flag bits"));
        }
        Ok(Self(flags))
    }

    /// Binary flag byte.
    #[must_use]
    pub fn bits(&self) -> u8 {
        self.0.iter().fold(0, |acc, flag| acc | flag.bit())
    }

    /// Returns `true` when `flag` is present.
    #[must_use]
    pub fn contains(&self, flag: AceFlag) -> bool {
        self.0.contains(&flag)
    }

    fn parse(text: &str) -> Result<Self, SddlError> {
        let invalid = || SddlError::InvalidAceFlags(text.to_owned());
        if text.len() % 2 != 0 || !text.is_ascii() {
            return Err(invalid());
        }
        let mut flags = Vec::with_capacity(text.len() / 2);
        for start in (0..text.len()).step_by(2) {
            let flag = AceFlag::from_token(&text[start..start + 2]).ok_or_else(invalid)?;
            if flags.contains(&flag) {
                return Err(invalid());
            }
            flags.push(flag);
        }
        Ok(Self(flags))
    }
}

impl fmt::Display for AceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|flag| f.write_str(flag.token()))
    }
}

/// Named access right tokens with their mask values.
///
/// Single-bit rights are listed in ascending bit order, which is the order
/// used when a mask is decomposed for rendering.
const SINGLE_BIT_RIGHTS: &[(&str, u32)] = &[
    ("CC", 0x0000_0001),
    ("DC", 0x0000_0002),
    ("LC", 0x0000_0004),
    ("SW", 0x0000_0008),
    ("RP", 0x0000_0010),
    ("WP", 0x0000_0020),
    ("DT", 0x0000_0040),
    ("LO", 0x0000_0080),
    ("CR", 0x0000_0100),
    ("SD", 0x0001_0000),
    ("RC", 0x0002_0000),
    ("WD", 0x0004_0000),
    ("WO", 0x0008_0000),
    ("GA", 0x1000_0000),
    ("GX", 0x2000_0000),
    ("GW", 0x4000_0000),
    ("GR", 0x8000_0000),
];

/// Composite file and registry rights.
const COMPOSITE_RIGHTS: &[(&str, u32)] = &[
    ("FA", 0x001F_01FF),
    ("FR", 0x0012_0089),
    ("FW", 0x0012_0116),
    ("FX", 0x0012_00A0),
    ("KA", 0x000F_003F),
    ("KR", 0x0002_0019),
    ("KW", 0x0002_0006),
    ("KX", 0x0002_0019),
];

/// Composite rights a file descriptor is rendered with when its mask matches
/// exactly.
const FILE_COMPOSITES: &[&str] = &["FA", "FR", "FW", "FX"];

fn right_value(token: &str) -> Option<u32> {
    SINGLE_BIT_RIGHTS
        .iter()
        .chain(COMPOSITE_RIGHTS)
        .find(|(name, _)| *name == token)
        .map(|(_, value)| *value)
}

/// How an access mask is spelled in text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum RightsSpelling {
    Hex,
    Tokens(Vec<&'static str>),
}

/// An ACE access mask together with its SDDL spelling.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccessRights {
    mask: u32,
    spelling: RightsSpelling,
}

impl AccessRights {
    /// Chooses the spelling the platform uses for a mask read from binary:
    /// an exact file composite, else single-bit tokens when they cover every
    /// bit, else hexadecimal.
    #[must_use]
    pub fn from_mask(mask: u32) -> Self {
        if let Some(token) = FILE_COMPOSITES
            .iter()
            .find(|token| right_value(token) == Some(mask))
        {
            return Self {
                mask,
                spelling: RightsSpelling::Tokens(vec![*token]),
            };
        }

        let mut remaining = mask;
        let mut tokens = Vec::new();
        for (name, bit) in SINGLE_BIT_RIGHTS {
            if remaining & bit != 0 {
                tokens.push(*name);
                remaining &= !bit;
            }
        }
        let spelling = if remaining == 0 {
            RightsSpelling::Tokens(tokens)
        } else {
            RightsSpelling::Hex
        };
        Self { mask, spelling }
    }

    /// Numeric access mask.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    fn parse(text: &str) -> Result<Self, SddlError> {
        let invalid = || SddlError::InvalidRights(text.to_owned());
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let mask = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
            return Ok(Self {
                mask,
                spelling: RightsSpelling::Hex,
            });
        }

        if text.len() % 2 != 0 || !text.is_ascii() {
            return Err(invalid());
        }
        let mut mask = 0u32;
        let mut tokens = Vec::with_capacity(text.len() / 2);
        for start in (0..text.len()).step_by(2) {
            let piece = &text[start..start + 2];
            let (name, value) = SINGLE_BIT_RIGHTS
                .iter()
                .chain(COMPOSITE_RIGHTS)
                .find(|(name, _)| *name == piece)
                .ok_or_else(invalid)?;
            mask |= value;
            tokens.push(*name);
        }
        Ok(Self {
            mask,
            spelling: RightsSpelling::Tokens(tokens),
        })
    }
}

impl fmt::Display for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.spelling {
            RightsSpelling::Hex => write!(f, "{:#x}", self.mask),
            RightsSpelling::Tokens(tokens) => tokens.iter().try_for_each(|t| f.write_str(t)),
        }
    }
}

/// An object-type GUID in an object ACE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Guid([u8; 16]);

impl Guid {
    /// Wraps the 16-byte binary encoding.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The 16-byte binary encoding (mixed-endian, as stored in an ACE).
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        let data1 = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        let data2 = u16::from_le_bytes([b[4], b[5]]);
        let data3 = u16::from_le_bytes([b[6], b[7]]);
        write!(
            f,
            "{data1:08x}-{data2:04x}-{data3:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl FromStr for Guid {
    type Err = SddlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SddlError::InvalidGuid(s.to_owned());
        let groups: Vec<&str> = s.split('-').collect();
        let lengths = [8, 4, 4, 4, 12];
        if groups.len() != lengths.len()
            || groups
                .iter()
                .zip(lengths)
                .any(|(group, len)| group.len() != len || !group.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            return Err(invalid());
        }

        let data1 = u32::from_str_radix(groups[0], 16).map_err(|_| invalid())?;
        let data2 = u16::from_str_radix(groups[1], 16).map_err(|_| invalid())?;
        let data3 = u16::from_str_radix(groups[2], 16).map_err(|_| invalid())?;
        let tail = format!("{}{}", groups[3], groups[4]);

        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&data3.to_le_bytes());
        for (index, slot) in bytes[8..].iter_mut().enumerate() {
            *slot = u8::from_str_radix(&tail[index * 2..index * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

/// One access control entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ace {
    /// Allow or deny, plain or object-specific.
    pub ace_type: AceType,
    /// Inheritance flags.
    pub flags: AceFlags,
    /// Access mask.
    pub rights: AccessRights,
    /// Object type GUID (object ACEs only).
    pub object_type: Option<Guid>,
    /// Inherited object type GUID (object ACEs only).
    pub inherited_object_type: Option<Guid>,
    /// Principal the entry applies to.
    pub trustee: Trustee,
}

impl Ace {
    /// Parses the text between the parentheses of an ACE string.
    pub(crate) fn parse(body: &str) -> Result<Self, SddlError> {
        let invalid = |reason: &'static str| SddlError::InvalidAce {
            ace: body.to_owned(),
            reason,
        };
        let fields: Vec<&str> = body.split(';').collect();
        if fields.len() != 6 {
            return Err(invalid("expected six ';'-separated fields"));
        }

        let ace_type = AceType::from_token(fields[0]).ok_or_else(|| invalid("unsupported ACE type"))?;
        let flags = AceFlags::parse(fields[1])?;
        let rights = AccessRights::parse(fields[2])?;
        let object_type = parse_optional_guid(fields[3])?;
        let inherited_object_type = parse_optional_guid(fields[4])?;
        if !ace_type.is_object() && (object_type.is_some() || inherited_object_type.is_some()) {
            return Err(invalid("object GUIDs on a non-object ACE"));
        }
        if fields[5].is_empty() {
            return Err(invalid("missing trustee"));
        }
        let trustee = fields[5].parse()?;

        Ok(Self {
            ace_type,
            flags,
            rights,
            object_type,
            inherited_object_type,
            trustee,
        })
    }

    /// Decodes one ACE at the start of `data`; returns it with its size.
    pub(crate) fn from_bytes(data: &[u8]) -> Result<(Self, usize), SddlError> {
        if data.len() < 8 {
            return Err(SddlError::Truncated("ACE header"));
        }
        let ace_type = AceType::from_code(data[0])?;
        let flags = AceFlags::from_bits(data[1])?;
        let size = usize::from(u16::from_le_bytes([data[2], data[3]]));
        if size < 8 || size > data.len() {
            return Err(SddlError::InvalidBinary("ACE size out of range"));
        }
        let body = &data[..size];
        let mask = read_u32(body, 4)?;
        let mut offset = 8;

        let (mut object_type, mut inherited_object_type) = (None, None);
        if ace_type.is_object() {
            let present = read_u32(body, offset)?;
            offset += 4;
            if present & ACE_OBJECT_TYPE_PRESENT != 0 {
                object_type = Some(read_guid(body, offset)?);
                offset += 16;
            }
            if present & ACE_INHERITED_OBJECT_TYPE_PRESENT != 0 {
                inherited_object_type = Some(read_guid(body, offset)?);
                offset += 16;
            }
        }

        let (sid, _) = Sid::from_bytes(body.get(offset..).unwrap_or_default())?;
        Ok((
            Self {
                ace_type,
                flags,
                rights: AccessRights::from_mask(mask),
                object_type,
                inherited_object_type,
                trustee: Trustee::from_sid(sid),
            },
            size,
        ))
    }

    /// Appends the binary encoding, resolving the trustee with `resolve`.
    pub(crate) fn write_bytes(
        &self,
        out: &mut Vec<u8>,
        resolve: &dyn Fn(&str) -> Option<Sid>,
    ) -> Result<(), SddlError> {
        let sid = self.trustee.to_sid(resolve)?;
        let start = out.len();
        out.push(self.ace_type.code());
        out.push(self.flags.bits());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&self.rights.mask().to_le_bytes());
        if self.ace_type.is_object() {
            let mut present = 0u32;
            if self.object_type.is_some() {
                present |= ACE_OBJECT_TYPE_PRESENT;
            }
            if self.inherited_object_type.is_some() {
                present |= ACE_INHERITED_OBJECT_TYPE_PRESENT;
            }
            out.extend_from_slice(&present.to_le_bytes());
            for guid in [self.object_type, self.inherited_object_type].into_iter().flatten() {
                out.extend_from_slice(guid.as_bytes());
            }
        }
        sid.write_bytes(out);
        let size = u16::try_from(out.len() - start)
            .map_err(|_| SddlError::InvalidBinary("ACE larger than 64 KiB"))?;
        out[start + 2..start + 4].copy_from_slice(&size.to_le_bytes());
        Ok(())
    }
}

impl fmt::Display for Ace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({};{};{};", self.ace_type.token(), self.flags, self.rights)?;
        if let Some(guid) = self.object_type {
            write!(f, "{guid}")?;
        }
        f.write_str(";")?;
        if let Some(guid) = self.inherited_object_type {
            write!(f, "{guid}")?;
        }
        write!(f, ";{})", self.trustee)
    }
}

const ACE_OBJECT_TYPE_PRESENT: u32 = 0x1;
const ACE_INHERITED_OBJECT_TYPE_PRESENT: u32 = 0x2;

fn parse_optional_guid(text: &str) -> Result<Option<Guid>, SddlError> {
    if text.is_empty() {
        Ok(None)
    } else {
        text.parse().map(Some)
    }
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32, SddlError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(SddlError::Truncated("32-bit field"))
}

fn read_guid(data: &[u8], offset: usize) -> Result<Guid, SddlError> {
    let bytes: [u8; 16] = data
        .get(offset..offset + 16)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(SddlError::Truncated("object type GUID"))?;
    Ok(Guid::from_bytes(bytes))
}
