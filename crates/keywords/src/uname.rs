//! uid to user-name resolution through the system user database.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::io;
use std::mem::MaybeUninit;
use std::ptr;

/// Looks up the login name for a numeric uid.
///
/// Returns `Ok(None)` when the uid has no user database entry. Uses
/// `getpwuid_r` so concurrent lookups are safe.
#[cfg(unix)]
pub(crate) fn lookup_user_name(uid: u32) -> Result<Option<String>, io::Error> {
    let mut buffer = vec![0_u8; 1024];
    loop {
        let mut pwd = MaybeUninit::<libc::passwd>::zeroed();
        let mut result: *mut libc::passwd = ptr::null_mut();
        // SAFETY: all pointers are valid for the duration of the call;
        // `buffer` provides the scratch space `getpwuid_r` writes through.
        let errno = unsafe {
            libc::getpwuid_r(
                uid as libc::uid_t,
                pwd.as_mut_ptr(),
                buffer.as_mut_ptr() as *mut libc::c_char,
                buffer.len(),
                &mut result,
            )
        };

        if errno == 0 {
            if result.is_null() {
                return Ok(None);
            }
            // SAFETY: a non-null result means `pwd` was initialized and
            // `pw_name` points at a NUL-terminated string inside `buffer`.
            let name = unsafe { CStr::from_ptr(pwd.assume_init().pw_name) };
            return Ok(Some(name.to_string_lossy().into_owned()));
        }

        if errno == libc::ERANGE {
            buffer.resize(buffer.len().saturating_mul(2), 0);
            continue;
        }

        return Err(io::Error::from_raw_os_error(errno));
    }
}
