//! Property tests for the SDDL text and binary forms.
//!
//! Any descriptor this crate renders must parse back to the same text, and
//! encoding to self-relative binary and decoding again must not change it.

use metadata::sddl::{SddlError, SecurityDescriptor};
use proptest::prelude::*;

const TRUSTEES: &[&str] = &["SY", "BA", "BU", "WD", "AU", "CO", "S-1-5-21-1004336348-1177238915-682003330-1001"];
const RIGHTS: &[&str] = &["FA", "FR", "FW", "FX"];
const ACE_FLAGS: &[&str] = &["OI", "CI", "NP", "IO", "ID"];
const DACL_FLAGS: &[&str] = &["P", "AR", "AI"];

fn ordered_subset(tokens: &'static [&'static str]) -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), tokens.len()).prop_map(move |mask| {
        tokens
            .iter()
            .zip(mask)
            .filter_map(|(token, keep)| keep.then_some(*token))
            .collect()
    })
}

fn ace() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["A", "D"]),
        ordered_subset(ACE_FLAGS),
        prop::sample::select(RIGHTS.to_vec()),
        prop::sample::select(TRUSTEES.to_vec()),
    )
        .prop_map(|(kind, flags, rights, trustee)| format!("({kind};{flags};{rights};;;{trustee})"))
}

fn descriptor() -> impl Strategy<Value = String> {
    (
        proptest::option::of(prop::sample::select(TRUSTEES.to_vec())),
        proptest::option::of(prop::sample::select(TRUSTEES.to_vec())),
        proptest::option::of((ordered_subset(DACL_FLAGS), proptest::collection::vec(ace(), 0..5))),
    )
        .prop_map(|(owner, group, dacl)| {
            let mut text = String::new();
            if let Some(owner) = owner {
                text.push_str(&format!("O:{owner}"));
            }
            if let Some(group) = group {
                text.push_str(&format!("G:{group}"));
            }
            if let Some((flags, aces)) = dacl {
                text.push_str(&format!("D:{flags}{}", aces.concat()));
            }
            text
        })
}

proptest! {
    #[test]
    fn text_round_trips(text in descriptor()) {
        prop_assume!(!text.is_empty());
        let parsed: SecurityDescriptor = text.parse().expect("generated text parses");
        prop_assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn binary_round_trips(text in descriptor()) {
        prop_assume!(!text.is_empty());
        let parsed: SecurityDescriptor = text.parse().expect("generated text parses");
        let binary = parsed.to_self_relative(&|_| None).expect("encode");
        let decoded = SecurityDescriptor::from_self_relative(&binary).expect("decode");
        prop_assert_eq!(decoded.to_string(), text);
    }

    #[test]
    fn portable_form_has_no_aliases(text in descriptor()) {
        prop_assume!(!text.is_empty());
        let parsed: SecurityDescriptor = text.parse().expect("generated text parses");
        let portable = parsed.to_portable_string().expect("expand");
        let reparsed: SecurityDescriptor = portable.parse().expect("portable text parses");
        prop_assert_eq!(reparsed.to_string(), portable.clone());
        for alias in ["SY", "BA", "BU", "WD", "AU", "CO"] {
            let as_trustee = format!(";{alias})");
            let as_owner = format!("O:{alias}");
            prop_assert!(!portable.contains(&as_trustee));
            prop_assert!(!portable.contains(&as_owner));
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = SecurityDescriptor::from_self_relative(&bytes);
    }
}

#[test]
fn truncated_binary_is_an_error() {
    let parsed: SecurityDescriptor = "O:BAG:SYD:(A;;FA;;;SY)".parse().expect("parse");
    let binary = parsed.to_self_relative(&|_| None).expect("encode");
    for len in 0..binary.len() {
        assert!(
            matches!(
                SecurityDescriptor::from_self_relative(&binary[..len]),
                Err(SddlError::Truncated(_) | SddlError::InvalidBinary(_))
            ),
            "prefix of {len} bytes decoded"
        );
    }
}
