// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Kernel error kinds and their POSIX `errno` codes.
//!
//! Every fallible kernel operation returns [`KResult`]. The system call layer
//! converts a [`KError`] into the `-1` return value plus the calling thread's
//! last-error cell using [`KError::code`].
#![cfg_attr(not(test), no_std)]

use core::fmt;

use linux_raw_sys::errno;

macro_rules! define_errors {
    ($( $(#[$doc:meta])* $name:ident => $errno:ident, $msg:literal; )*) => {
        /// Error kinds produced by kernel operations.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum KError {
            $( $(#[$doc])* $name, )*
        }

        /// Raw POSIX error numbers, one per [`KError`] kind.
        #[repr(i32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr, strum::IntoStaticStr)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum LinuxError {
            $( $errno = errno::$errno as i32, )*
        }

        impl KError {
            /// Returns the errno code reported to userspace.
            pub const fn code(self) -> LinuxError {
                match self {
                    $( Self::$name => LinuxError::$errno, )*
                }
            }

            /// Returns a short human readable description.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$name => $msg, )*
                }
            }
        }

        impl From<LinuxError> for KError {
            fn from(e: LinuxError) -> Self {
                match e {
                    $( LinuxError::$errno => Self::$name, )*
                }
            }
        }
    };
}

define_errors! {
    /// The descriptor is not open, or not open for the requested access.
    BadFileDescriptor => EBADF, "Bad file descriptor";
    /// A path component or the target is not a directory.
    NotADirectory => ENOTDIR, "Not a directory";
    /// The operation is not valid on a directory.
    IsADirectory => EISDIR, "Is a directory";
    /// The node is not a terminal.
    NotATty => ENOTTY, "Inappropriate ioctl for device";
    /// The node cannot be seeked (pipes, sockets, terminals).
    IllegalSeek => ESPIPE, "Illegal seek";
    /// An argument is invalid.
    InvalidInput => EINVAL, "Invalid argument";
    /// A result is out of range.
    OutOfRange => ERANGE, "Result out of range";
    /// The operation would block.
    WouldBlock => EAGAIN, "Resource temporarily unavailable";
    /// A blocking wait was interrupted by a signal.
    Interrupted => EINTR, "Interrupted system call";
    /// The operation is not implemented.
    NoSys => ENOSYS, "Function not implemented";
    /// The operation is not supported by this object.
    Unsupported => EOPNOTSUPP, "Operation not supported";
    /// A value does not fit in the destination type.
    Overflow => EOVERFLOW, "Value too large for defined data type";
    /// No process matches the given id.
    NoSuchProcess => ESRCH, "No such process";
    /// The caller has no matching child process.
    NoChildProcess => ECHILD, "No child processes";
    /// Memory could not be allocated.
    NoMemory => ENOMEM, "Cannot allocate memory";
    /// The descriptor table is full.
    TooManyOpenFiles => EMFILE, "Too many open files";
    /// No entry with the given name exists.
    NotFound => ENOENT, "No such file or directory";
    /// An entry with the given name already exists.
    AlreadyExists => EEXIST, "File exists";
    /// The directory still has entries.
    DirectoryNotEmpty => ENOTEMPTY, "Directory not empty";
    /// The caller lacks access permission.
    PermissionDenied => EACCES, "Permission denied";
    /// The caller lacks the privilege for the operation.
    OperationNotPermitted => EPERM, "Operation not permitted";
    /// A buffer could not be copied to or from the caller.
    BadAddress => EFAULT, "Bad address";
    /// The other end of a pipe is closed.
    BrokenPipe => EPIPE, "Broken pipe";
    /// The node is not a socket.
    NotASocket => ENOTSOCK, "Socket operation on non-socket";
    /// Too many symbolic links were followed.
    FilesystemLoop => ELOOP, "Too many levels of symbolic links";
    /// A path component is too long.
    NameTooLong => ENAMETOOLONG, "File name too long";
    /// The object is in use.
    ResourceBusy => EBUSY, "Device or resource busy";
    /// A link would cross filesystems.
    CrossesDevices => EXDEV, "Invalid cross-device link";
}

/// A specialized [`Result`] for kernel operations.
pub type KResult<T = ()> = Result<T, KError>;

impl KError {
    /// Returns the positive errno value.
    pub const fn errno(self) -> i32 {
        self.code() as i32
    }

    /// Looks up the error kind for a raw errno value.
    pub fn from_errno(code: i32) -> Option<Self> {
        LinuxError::from_repr(code).map(Self::from)
    }
}

impl LinuxError {
    /// Returns the symbolic name, e.g. `"EBADF"`.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for KError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LinuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl core::error::Error for KError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values_match_linux() {
        assert_eq!(KError::BadFileDescriptor.errno(), 9);
        assert_eq!(KError::WouldBlock.errno(), 11);
        assert_eq!(KError::InvalidInput.errno(), 22);
        assert_eq!(KError::IllegalSeek.errno(), 29);
        assert_eq!(KError::NoSys.errno(), 38);
    }

    #[test]
    fn test_round_trip_through_linux_error() {
        for err in [
            KError::NotADirectory,
            KError::Interrupted,
            KError::Overflow,
            KError::NoChildProcess,
            KError::FilesystemLoop,
        ] {
            assert_eq!(KError::from(err.code()), err);
            assert_eq!(KError::from_errno(err.errno()), Some(err));
        }
        assert_eq!(KError::from_errno(0), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(KError::IsADirectory.to_string(), "Is a directory");
        assert_eq!(LinuxError::ENOTTY.to_string(), "ENOTTY");
    }
}
