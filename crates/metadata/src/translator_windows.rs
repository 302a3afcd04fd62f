//! crates/metadata/src/translator_windows.rs
//!
//! Win32 security descriptor access. Descriptors are fetched with
//! `GetNamedSecurityInfoW`, rendered by the OS with
//! `ConvertSecurityDescriptorToStringSecurityDescriptorW`, and
//! domain-relative aliases are expanded with `ConvertStringSidToSidW`, which
//! knows the machine and domain SIDs.

#![allow(unsafe_code)]

use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows::Win32::Foundation::{ERROR_SUCCESS, HLOCAL, LocalFree};
use windows::Win32::Security::Authorization::{
    ConvertSecurityDescriptorToStringSecurityDescriptorW, ConvertSidToStringSidW,
    ConvertStringSidToSidW, GetNamedSecurityInfoW, SDDL_REVISION_1, SE_FILE_OBJECT,
};
use windows::Win32::Security::{
    GetSecurityDescriptorLength, IsValidSecurityDescriptor, OBJECT_SECURITY_INFORMATION,
    PSECURITY_DESCRIPTOR, PSID,
};
use windows::core::{PCWSTR, PWSTR};

use crate::error::MetadataError;
use crate::sddl::{SddlError, Sid};
use crate::translator::{SECURITY_INFORMATION, SecurityDescriptorTranslator};

/// Translator backed by the Win32 security API.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostTranslator;

impl HostTranslator {
    /// Creates the translator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Security descriptors can be read on this host.
#[must_use]
pub const fn is_supported() -> bool {
    true
}

fn requested_information() -> OBJECT_SECURITY_INFORMATION {
    OBJECT_SECURITY_INFORMATION(SECURITY_INFORMATION.bits())
}

fn wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(std::iter::once(0)).collect()
}

/// Frees memory returned by the security API when dropped.
struct LocalAlloc(*mut core::ffi::c_void);

impl Drop for LocalAlloc {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer was allocated by the OS with LocalAlloc and
            // is freed exactly once.
            unsafe {
                let _ = LocalFree(Some(HLOCAL(self.0)));
            }
        }
    }
}

/// Reads a NUL-terminated wide string returned by the OS.
///
/// # Safety
///
/// `text` must point to a valid NUL-terminated UTF-16 string.
unsafe fn take_wide(text: PWSTR) -> String {
    // SAFETY: guaranteed by the caller.
    let units = unsafe { text.as_wide() };
    String::from_utf16_lossy(units)
}

impl SecurityDescriptorTranslator for HostTranslator {
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, MetadataError> {
        let name = wide(path.as_os_str());
        let mut descriptor = PSECURITY_DESCRIPTOR::default();
        // SAFETY: `name` is NUL-terminated and outlives the call; the
        // descriptor pointer is freed by the guard below.
        let status = unsafe {
            GetNamedSecurityInfoW(
                PCWSTR(name.as_ptr()),
                SE_FILE_OBJECT,
                requested_information(),
                None,
                None,
                None,
                None,
                &mut descriptor,
            )
        };
        let _guard = LocalAlloc(descriptor.0);
        if status != ERROR_SUCCESS {
            return Err(MetadataError::new(
                "read security descriptor",
                path,
                io::Error::from_raw_os_error(status.0 as i32),
            ));
        }

        // SAFETY: the OS returned a valid self-relative descriptor.
        let length = unsafe { GetSecurityDescriptorLength(descriptor) } as usize;
        // SAFETY: the descriptor spans `length` bytes.
        let bytes = unsafe { std::slice::from_raw_parts(descriptor.0.cast::<u8>(), length) };
        Ok(bytes.to_vec())
    }

    fn binary_to_string(&self, raw: &[u8]) -> Result<String, SddlError> {
        if raw.is_empty() {
            return Err(SddlError::Truncated("security descriptor header"));
        }
        let descriptor = PSECURITY_DESCRIPTOR(raw.as_ptr().cast_mut().cast());
        // SAFETY: `raw` stays borrowed for the duration of both calls.
        if !unsafe { IsValidSecurityDescriptor(descriptor) }.as_bool() {
            return Err(SddlError::InvalidBinary("rejected by IsValidSecurityDescriptor"));
        }
        let mut text = PWSTR::null();
        // SAFETY: as above; `text` is freed by the guard.
        unsafe {
            ConvertSecurityDescriptorToStringSecurityDescriptorW(
                descriptor,
                SDDL_REVISION_1,
                requested_information(),
                &mut text,
                None,
            )
        }
        .map_err(|_| SddlError::InvalidBinary("ConvertSecurityDescriptorToStringSecurityDescriptorW failed"))?;
        let _guard = LocalAlloc(text.0.cast());
        // SAFETY: the OS returned a NUL-terminated string.
        Ok(unsafe { take_wide(text) })
    }

    fn resolve_alias(&self, alias: &str) -> Option<Sid> {
        let name = wide(OsStr::new(alias));
        let mut sid = PSID::default();
        // SAFETY: `name` is NUL-terminated; `sid` is freed by the guard.
        unsafe { ConvertStringSidToSidW(PCWSTR(name.as_ptr()), &mut sid) }.ok()?;
        let _sid_guard = LocalAlloc(sid.0);

        let mut text = PWSTR::null();
        // SAFETY: `sid` is valid until the guard drops.
        unsafe { ConvertSidToStringSidW(sid, &mut text) }.ok()?;
        let _text_guard = LocalAlloc(text.0.cast());
        // SAFETY: the OS returned a NUL-terminated string.
        unsafe { take_wide(text) }.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::portable_security_descriptor;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_descriptor_of_new_file() {
        let dir = tempdir().expect("create temp dir");
        let file = dir.path().join("owned.txt");
        fs::write(&file, b"data").expect("write file");

        let portable = portable_security_descriptor(&HostTranslator::new(), &file)
            .expect("descriptor of a file we created");
        assert!(portable.starts_with("O:S-1-"));
        assert!(portable.contains("D:"));
    }

    #[test]
    fn resolves_builtin_alias_through_os() {
        let sid = HostTranslator::new().resolve_alias("BA").expect("builtin admins");
        assert_eq!(sid.to_string(), "S-1-5-32-544");
    }
}
