//! crates/metadata/src/sddl/mod.rs
//!
//! Security Descriptor Definition Language (SDDL) model.
//!
//! A [`SecurityDescriptor`] holds the owner, primary group and discretionary
//! ACL of a file. It is parsed from and rendered to SDDL text, decoded from
//! and encoded to the self-relative binary layout stored by SMB servers, and
//! rendered in a portable form where every alias is expanded to a numeric
//! SID so that another host can interpret it without a local account
//! database.
//!
//! Only the owner (`O:`), group (`G:`) and DACL (`D:`) components are
//! modelled. A text descriptor carrying a SACL (`S:`) is rejected, and the
//! SACL of a binary descriptor is ignored. Parsed text keeps its spelling:
//! the order of ACE flags and DACL flags, hexadecimal versus token rights,
//! and aliases versus numeric SIDs survive a parse/render cycle unchanged.

mod ace;
mod binary;
mod sid;

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

pub use ace::{AccessRights, Ace, AceFlag, AceFlags, AceType, Guid};
pub use sid::{DOMAIN_RELATIVE_ALIASES, MAX_SUB_AUTHORITIES, Sid, Trustee, WELL_KNOWN_ALIASES};

/// Errors produced while parsing, decoding or encoding security descriptors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SddlError {
    /// The descriptor text was empty.
    #[error("empty security descriptor")]
    Empty,
    /// Text that is not a recognised `X:` component.
    #[error("unexpected security descriptor component '{0}'")]
    UnexpectedComponent(String),
    /// A component tag appeared twice.
    #[error("duplicate '{0}:' component")]
    DuplicateComponent(char),
    /// System ACLs are outside the supported subset.
    #[error("system ACL (S:) components are not supported")]
    SaclNotSupported,
    /// A malformed ACE string.
    #[error("invalid ACE '({ace})': {reason}")]
    InvalidAce {
        /// Text between the parentheses.
        ace: String,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// Unknown access-right token or malformed hex mask.
    #[error("invalid access rights '{0}'")]
    InvalidRights(String),
    /// Unknown or repeated ACE flag.
    #[error("invalid ACE flags '{0}'")]
    InvalidAceFlags(String),
    /// Unknown DACL flag.
    #[error("invalid DACL flags '{0}'")]
    InvalidDaclFlags(String),
    /// Malformed object-type GUID.
    #[error("invalid GUID '{0}'")]
    InvalidGuid(String),
    /// Binary ACE type outside the supported set.
    #[error("unsupported ACE type {0:#04x}")]
    UnsupportedAceType(u8),
    /// Binary descriptor or ACL revision that is not understood.
    #[error("unsupported revision {0}")]
    UnsupportedRevision(u8),
    /// Malformed SID string or encoding.
    #[error("invalid SID '{0}'")]
    InvalidSid(String),
    /// Two-letter token that is not a known alias.
    #[error("unknown SID alias '{0}'")]
    UnknownAlias(String),
    /// Domain-relative alias with no resolver able to expand it.
    #[error("SID alias '{0}' cannot be resolved on this host")]
    UnresolvedAlias(String),
    /// Binary input ended early.
    #[error("truncated {0}")]
    Truncated(&'static str),
    /// Binary input is structurally invalid.
    #[error("malformed security descriptor: {0}")]
    InvalidBinary(&'static str),
}

impl From<SddlError> for io::Error {
    fn from(error: SddlError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}

/// Flags on a discretionary ACL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DaclFlag {
    /// `P`: inheritance from the parent is blocked.
    Protected,
    /// `AR`: auto-inheritance requested.
    AutoInheritRequired,
    /// `AI`: entries were auto-inherited.
    AutoInherited,
    /// `NO_ACCESS_CONTROL`: the DACL is null and grants everyone full access.
    NoAccessControl,
}

impl DaclFlag {
    const SE_DACL_AUTO_INHERIT_REQ: u16 = 0x0100;
    const SE_DACL_AUTO_INHERITED: u16 = 0x0400;
    const SE_DACL_PROTECTED: u16 = 0x1000;

    /// SDDL token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Protected => "P",
            Self::AutoInheritRequired => "AR",
            Self::AutoInherited => "AI",
            Self::NoAccessControl => "NO_ACCESS_CONTROL",
        }
    }

    /// Bit in the descriptor control word, if the flag has one.
    #[must_use]
    pub const fn control_bit(self) -> Option<u16> {
        match self {
            Self::Protected => Some(Self::SE_DACL_PROTECTED),
            Self::AutoInheritRequired => Some(Self::SE_DACL_AUTO_INHERIT_REQ),
            Self::AutoInherited => Some(Self::SE_DACL_AUTO_INHERITED),
            Self::NoAccessControl => None,
        }
    }
}

/// A discretionary access control list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dacl {
    flags: Vec<DaclFlag>,
    aces: Vec<Ace>,
}

impl Dacl {
    /// Builds a DACL from flags and entries.
    #[must_use]
    pub const fn new(flags: Vec<DaclFlag>, aces: Vec<Ace>) -> Self {
        Self { flags, aces }
    }

    /// The null DACL, spelled `D:NO_ACCESS_CONTROL`.
    #[must_use]
    pub fn null() -> Self {
        Self::new(vec![DaclFlag::NoAccessControl], Vec::new())
    }

    /// Flags in their original order.
    #[must_use]
    pub fn flags(&self) -> &[DaclFlag] {
        &self.flags
    }

    /// Entries in order.
    #[must_use]
    pub fn aces(&self) -> &[Ace] {
        &self.aces
    }

    /// Returns `true` for a null DACL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.flags.contains(&DaclFlag::NoAccessControl)
    }

    fn parse(text: &str) -> Result<Self, SddlError> {
        let (flag_text, mut rest) = text.find('(').map_or((text, ""), |at| text.split_at(at));

        let mut flags = Vec::new();
        let mut remaining = flag_text;
        while !remaining.is_empty() {
            let flag = [
                DaclFlag::NoAccessControl,
                DaclFlag::AutoInheritRequired,
                DaclFlag::AutoInherited,
                DaclFlag::Protected,
            ]
            .into_iter()
            .find(|flag| remaining.starts_with(flag.token()))
            .ok_or_else(|| SddlError::InvalidDaclFlags(flag_text.to_owned()))?;
            if flags.contains(&flag) {
                return Err(SddlError::InvalidDaclFlags(flag_text.to_owned()));
            }
            flags.push(flag);
            remaining = &remaining[flag.token().len()..];
        }

        let mut aces = Vec::new();
        while !rest.is_empty() {
            let Some(body_and_tail) = rest.strip_prefix('(') else {
                return Err(SddlError::UnexpectedComponent(rest.to_owned()));
            };
            let close = body_and_tail.find(')').ok_or_else(|| SddlError::InvalidAce {
                ace: body_and_tail.to_owned(),
                reason: "missing ')'",
            })?;
            let body = &body_and_tail[..close];
            if body.contains('(') {
                return Err(SddlError::InvalidAce {
                    ace: body.to_owned(),
                    reason: "conditional expressions are not supported",
                });
            }
            aces.push(Ace::parse(body)?);
            rest = &body_and_tail[close + 1..];
        }

        if flags.contains(&DaclFlag::NoAccessControl) && !aces.is_empty() {
            return Err(SddlError::InvalidDaclFlags(flag_text.to_owned()));
        }
        Ok(Self { flags, aces })
    }
}

impl fmt::Display for Dacl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in &self.flags {
            f.write_str(flag.token())?;
        }
        self.aces.iter().try_for_each(|ace| write!(f, "{ace}"))
    }
}

/// Owner, group and DACL of a file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SecurityDescriptor {
    owner: Option<Trustee>,
    group: Option<Trustee>,
    dacl: Option<Dacl>,
}

impl SecurityDescriptor {
    /// Assembles a descriptor from its parts.
    #[must_use]
    pub const fn new(owner: Option<Trustee>, group: Option<Trustee>, dacl: Option<Dacl>) -> Self {
        Self { owner, group, dacl }
    }

    /// Owner (`O:`).
    #[must_use]
    pub const fn owner(&self) -> Option<&Trustee> {
        self.owner.as_ref()
    }

    /// Primary group (`G:`).
    #[must_use]
    pub const fn group(&self) -> Option<&Trustee> {
        self.group.as_ref()
    }

    /// Discretionary ACL (`D:`).
    #[must_use]
    pub const fn dacl(&self) -> Option<&Dacl> {
        self.dacl.as_ref()
    }

    /// Renders the descriptor with every alias expanded to its numeric SID.
    ///
    /// Domain-relative aliases cannot be expanded without knowing the
    /// domain and fail with [`SddlError::UnresolvedAlias`]; use
    /// [`to_portable_string_with`](Self::to_portable_string_with) to supply
    /// a resolver.
    pub fn to_portable_string(&self) -> Result<String, SddlError> {
        self.to_portable_string_with(&|_| None)
    }

    /// Renders the descriptor with every alias expanded, consulting `resolve`
    /// for domain-relative aliases.
    pub fn to_portable_string_with(
        &self,
        resolve: &dyn Fn(&str) -> Option<Sid>,
    ) -> Result<String, SddlError> {
        let expand = |trustee: &Trustee| trustee.to_sid(resolve).map(Trustee::Sid);
        let owner = self.owner.as_ref().map(expand).transpose()?;
        let group = self.group.as_ref().map(expand).transpose()?;
        let dacl = match &self.dacl {
            Some(dacl) => {
                let aces = dacl
                    .aces
                    .iter()
                    .map(|ace| {
                        Ok(Ace {
                            trustee: expand(&ace.trustee)?,
                            ..ace.clone()
                        })
                    })
                    .collect::<Result<Vec<_>, SddlError>>()?;
                Some(Dacl::new(dacl.flags.clone(), aces))
            }
            None => None,
        };
        Ok(Self::new(owner, group, dacl).to_string())
    }
}

impl fmt::Display for SecurityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "O:{owner}")?;
        }
        if let Some(group) = &self.group {
            write!(f, "G:{group}")?;
        }
        if let Some(dacl) = &self.dacl {
            write!(f, "D:{dacl}")?;
        }
        Ok(())
    }
}

impl FromStr for SecurityDescriptor {
    type Err = SddlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(SddlError::Empty);
        }

        let tags = component_starts(text);
        match tags.first() {
            Some(&(0, _)) => {}
            Some(&(at, _)) => return Err(SddlError::UnexpectedComponent(text[..at].to_owned())),
            None => return Err(SddlError::UnexpectedComponent(text.to_owned())),
        }

        let mut descriptor = Self::default();
        for (index, &(start, tag)) in tags.iter().enumerate() {
            let end = tags.get(index + 1).map_or(text.len(), |&(next, _)| next);
            let value = &text[start + 2..end];
            match tag {
                'O' => set_once(&mut descriptor.owner, 'O', || value.parse())?,
                'G' => set_once(&mut descriptor.group, 'G', || value.parse())?,
                'D' => set_once(&mut descriptor.dacl, 'D', || Dacl::parse(value))?,
                _ => return Err(SddlError::SaclNotSupported),
            }
        }
        Ok(descriptor)
    }
}

fn set_once<T>(
    slot: &mut Option<T>,
    tag: char,
    parse: impl FnOnce() -> Result<T, SddlError>,
) -> Result<(), SddlError> {
    if slot.is_some() {
        return Err(SddlError::DuplicateComponent(tag));
    }
    *slot = Some(parse()?);
    Ok(())
}

/// Byte offsets of `O:`, `G:`, `D:` and `S:` tags outside parentheses.
fn component_starts(text: &str) -> Vec<(usize, char)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut starts = Vec::new();
    for (index, &byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'O' | b'G' | b'D' | b'S' if depth == 0 && bytes.get(index + 1) == Some(&b':') => {
                starts.push((index, char::from(byte)));
            }
            _ => {}
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPICAL: &str = "O:BAG:SYD:PAI(A;OICI;FA;;;SY)(A;OICI;FA;;;BA)(A;OICI;0x1200a9;;;BU)";

    #[test]
    fn parses_and_renders_typical_descriptor() {
        let descriptor: SecurityDescriptor = TYPICAL.parse().unwrap();
        assert_eq!(descriptor.owner().unwrap().to_string(), "BA");
        assert_eq!(descriptor.group().unwrap().to_string(), "SY");
        let dacl = descriptor.dacl().unwrap();
        assert_eq!(dacl.flags(), [DaclFlag::Protected, DaclFlag::AutoInherited]);
        assert_eq!(dacl.aces().len(), 3);
        assert_eq!(descriptor.to_string(), TYPICAL);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let descriptor: SecurityDescriptor = format!("  {TYPICAL}\n").parse().unwrap();
        assert_eq!(descriptor.to_string(), TYPICAL);
    }

    #[test]
    fn dacl_flag_order_is_preserved() {
        let text = "D:AIP(A;;FA;;;WD)";
        assert_eq!(text.parse::<SecurityDescriptor>().unwrap().to_string(), text);
    }

    #[test]
    fn components_are_optional() {
        for text in ["O:SY", "G:BU", "D:(D;;FW;;;AN)", "D:"] {
            assert_eq!(text.parse::<SecurityDescriptor>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn aliases_ending_in_tag_letters_do_not_split_components() {
        let text = "O:DAG:DUD:(A;;FA;;;CO)";
        let descriptor: SecurityDescriptor = text.parse().unwrap();
        assert_eq!(descriptor.owner().unwrap().to_string(), "DA");
        assert_eq!(descriptor.group().unwrap().to_string(), "DU");
        assert_eq!(descriptor.to_string(), text);
    }

    #[test]
    fn null_dacl_round_trips() {
        let descriptor: SecurityDescriptor = "O:SYD:NO_ACCESS_CONTROL".parse().unwrap();
        assert!(descriptor.dacl().unwrap().is_null());
        assert_eq!(descriptor.to_string(), "O:SYD:NO_ACCESS_CONTROL");
        assert!("D:NO_ACCESS_CONTROL(A;;FA;;;SY)".parse::<SecurityDescriptor>().is_err());
    }

    #[test]
    fn rejects_sacl_and_conditional_aces() {
        assert_eq!(
            "O:SYS:(AU;SA;FA;;;WD)".parse::<SecurityDescriptor>(),
            Err(SddlError::SaclNotSupported)
        );
        let conditional = "D:(XA;;FX;;;WD;(Member_of {SID(BA)}))";
        assert!(conditional.parse::<SecurityDescriptor>().is_err());
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!("".parse::<SecurityDescriptor>(), Err(SddlError::Empty));
        assert_eq!("   ".parse::<SecurityDescriptor>(), Err(SddlError::Empty));
        assert!(matches!(
            "junk O:SY".parse::<SecurityDescriptor>(),
            Err(SddlError::UnexpectedComponent(_))
        ));
        assert_eq!(
            "O:SYO:BA".parse::<SecurityDescriptor>(),
            Err(SddlError::DuplicateComponent('O'))
        );
        assert!("D:(A;;FA;;SY)".parse::<SecurityDescriptor>().is_err());
        assert!("D:(A;;FA;;;SY".parse::<SecurityDescriptor>().is_err());
        assert!("D:XY(A;;FA;;;SY)".parse::<SecurityDescriptor>().is_err());
        assert!("O:QQ".parse::<SecurityDescriptor>().is_err());
    }

    #[test]
    fn portable_string_expands_aliases() {
        let descriptor: SecurityDescriptor = "O:BAG:SYD:(A;ID;FA;;;WD)".parse().unwrap();
        assert_eq!(
            descriptor.to_portable_string().unwrap(),
            "O:S-1-5-32-544G:S-1-5-18D:(A;ID;FA;;;S-1-1-0)"
        );
    }

    #[test]
    fn portable_string_requires_resolver_for_domain_aliases() {
        let descriptor: SecurityDescriptor = "O:DAD:(A;;FA;;;DU)".parse().unwrap();
        assert!(matches!(
            descriptor.to_portable_string(),
            Err(SddlError::UnresolvedAlias(_))
        ));

        let domain = [21, 1_004_336_348, 1_177_238_915, 682_003_330];
        let resolve = |alias: &str| {
            let rid = match alias {
                "DA" => 512,
                "DU" => 513,
                _ => return None,
            };
            let mut sub = domain.to_vec();
            sub.push(rid);
            Sid::new(5, sub).ok()
        };
        assert_eq!(
            descriptor.to_portable_string_with(&resolve).unwrap(),
            "O:S-1-5-21-1004336348-1177238915-682003330-512\
             D:(A;;FA;;;S-1-5-21-1004336348-1177238915-682003330-513)"
        );
    }

    #[test]
    fn errors_convert_to_invalid_data() {
        let error: io::Error = SddlError::Truncated("ACL header").into();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
