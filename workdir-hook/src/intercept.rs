//! Pass-through for `getcwd` with an observational side channel.

use std::ffi::CStr;

use libc::{c_char, size_t};

use crate::errno::ErrnoGuard;
use crate::sink::BestEffortSink;

/// `char *getcwd(char *buf, size_t size)`
pub type GetcwdFn = unsafe extern "C" fn(buf: *mut c_char, size: size_t) -> *mut c_char;

/// Calls `original` with the caller's arguments and hands a successful result
/// to `sink`.
///
/// The returned pointer is exactly what `original` returned, including a
/// buffer it allocated when `buf` is null. On failure nothing is recorded and
/// `errno` is left as `original` set it; on success `errno` is restored after
/// recording.
///
/// # Safety
///
/// Same contract as `getcwd(3)`: `buf` must be null or valid for `size`
/// writable bytes, and `original` must implement that contract.
pub unsafe fn forward_getcwd<S>(
    original: GetcwdFn,
    sink: &S,
    buf: *mut c_char,
    size: size_t,
) -> *mut c_char
where
    S: BestEffortSink + ?Sized,
{
    // SAFETY: arguments are forwarded untouched under the caller's contract.
    let result = unsafe { original(buf, size) };
    if result.is_null() {
        return result;
    }

    let _errno = ErrnoGuard::save();
    // SAFETY: a non-null getcwd result is a nul-terminated path.
    sink.record(unsafe { CStr::from_ptr(result) });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno;
    use crate::sink::FileSink;
    use std::ffi::CString;
    use std::fs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded(Mutex<Vec<CString>>);

    impl BestEffortSink for Recorded {
        fn record(&self, cwd: &CStr) {
            self.0.lock().unwrap().push(cwd.to_owned());
        }
    }

    impl Recorded {
        fn lines(&self) -> Vec<CString> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Sink that clobbers errno the way a failing open would.
    struct Clobbering;

    impl BestEffortSink for Clobbering {
        fn record(&self, _cwd: &CStr) {
            errno::set(libc::ENOENT);
        }
    }

    const PROJECT: &[u8] = b"/home/alice/project\0";

    unsafe extern "C" fn fake_getcwd(buf: *mut c_char, size: size_t) -> *mut c_char {
        if size < PROJECT.len() {
            errno::set(libc::ERANGE);
            return std::ptr::null_mut();
        }
        // SAFETY: caller provided `size` writable bytes.
        unsafe { std::ptr::copy_nonoverlapping(PROJECT.as_ptr().cast(), buf, PROJECT.len()) };
        errno::set(libc::EINTR);
        buf
    }

    fn real_getcwd() -> GetcwdFn {
        libc::getcwd
    }

    #[test]
    fn success_returns_caller_buffer_and_records() {
        let sink = Recorded::default();
        let mut buf = vec![0 as c_char; 64];

        let result = unsafe { forward_getcwd(fake_getcwd, &sink, buf.as_mut_ptr(), buf.len()) };

        assert_eq!(result, buf.as_mut_ptr());
        assert_eq!(sink.lines(), vec![CString::new("/home/alice/project").unwrap()]);
    }

    #[test]
    fn failure_is_relayed_without_recording() {
        let sink = Recorded::default();
        let mut buf = vec![0 as c_char; 4];

        let result = unsafe { forward_getcwd(fake_getcwd, &sink, buf.as_mut_ptr(), buf.len()) };

        assert!(result.is_null());
        assert_eq!(errno::get(), libc::ERANGE);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn errno_survives_recording() {
        let mut buf = vec![0 as c_char; 64];

        let result =
            unsafe { forward_getcwd(fake_getcwd, &Clobbering, buf.as_mut_ptr(), buf.len()) };

        assert!(!result.is_null());
        assert_eq!(errno::get(), libc::EINTR);
    }

    #[test]
    fn matches_unintercepted_getcwd() {
        let sink = Recorded::default();
        let mut direct = vec![0 as c_char; libc::PATH_MAX as usize];
        let mut forwarded = vec![0 as c_char; libc::PATH_MAX as usize];

        let expected = unsafe { libc::getcwd(direct.as_mut_ptr(), direct.len()) };
        let result = unsafe {
            forward_getcwd(real_getcwd(), &sink, forwarded.as_mut_ptr(), forwarded.len())
        };

        assert!(!expected.is_null());
        assert_eq!(result, forwarded.as_mut_ptr());
        let expected = unsafe { CStr::from_ptr(expected) }.to_owned();
        let actual = unsafe { CStr::from_ptr(result) }.to_owned();
        assert_eq!(actual, expected);
        assert_eq!(sink.lines(), vec![expected]);
    }

    #[test]
    fn too_small_buffer_matches_unintercepted_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("game_workdir.log");
        let sink = FileSink::at(&log);
        let mut buf = [0 as c_char; 1];

        let direct = unsafe { libc::getcwd(buf.as_mut_ptr(), buf.len()) };
        let direct_errno = errno::get();
        let result = unsafe { forward_getcwd(real_getcwd(), &sink, buf.as_mut_ptr(), buf.len()) };

        assert!(direct.is_null());
        assert!(result.is_null());
        assert_eq!(errno::get(), direct_errno);
        assert_eq!(errno::get(), libc::ERANGE);
        assert!(!log.exists(), "failed call must not create the log");
    }

    #[test]
    fn null_buffer_is_allocated_by_original() {
        let sink = Recorded::default();

        let result = unsafe { forward_getcwd(real_getcwd(), &sink, std::ptr::null_mut(), 0) };

        assert!(!result.is_null());
        let cwd = unsafe { CStr::from_ptr(result) }.to_owned();
        unsafe { libc::free(result.cast()) };
        assert_eq!(
            cwd.to_str().unwrap(),
            std::env::current_dir().unwrap().to_str().unwrap()
        );
        assert_eq!(sink.lines(), vec![cwd]);
    }

    #[test]
    fn records_into_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("game_workdir.log");
        let sink = FileSink::at(&log);
        let mut buf = vec![0 as c_char; 64];

        unsafe { forward_getcwd(fake_getcwd, &sink, buf.as_mut_ptr(), buf.len()) };

        assert_eq!(
            fs::read_to_string(&log).unwrap(),
            "GETCWD: /home/alice/project\n"
        );
    }
}
