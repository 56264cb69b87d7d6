// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use core::{fmt, ops};

/// Signal numbers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[allow(clippy::upper_case_acronyms)]
pub enum Signo {
    SIGHUP    = 1,
    SIGINT    = 2,
    SIGQUIT   = 3,
    SIGILL    = 4,
    SIGTRAP   = 5,
    SIGABRT   = 6,
    SIGBUS    = 7,
    SIGFPE    = 8,
    SIGKILL   = 9,
    SIGUSR1   = 10,
    SIGSEGV   = 11,
    SIGUSR2   = 12,
    SIGPIPE   = 13,
    SIGALRM   = 14,
    SIGTERM   = 15,
    SIGSTKFLT = 16,
    SIGCHLD   = 17,
    SIGCONT   = 18,
    SIGSTOP   = 19,
    SIGTSTP   = 20,
    SIGTTIN   = 21,
    SIGTTOU   = 22,
    SIGURG    = 23,
    SIGXCPU   = 24,
    SIGXFSZ   = 25,
    SIGVTALRM = 26,
    SIGPROF   = 27,
    SIGWINCH  = 28,
    SIGIO     = 29,
    SIGPWR    = 30,
    SIGSYS    = 31,
}

impl Signo {
    /// Returns whether the signal can be blocked by a signal mask.
    pub const fn is_maskable(self) -> bool {
        !matches!(self, Self::SIGKILL | Self::SIGSTOP)
    }

    /// Parses a raw signal number.
    pub fn from_raw(signo: u32) -> Option<Self> {
        u8::try_from(signo).ok().and_then(Self::from_repr)
    }
}

/// A set of signals, one bit per signal number.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SignalSet(u64);

impl SignalSet {
    /// Signals that can never be blocked.
    pub const UNMASKABLE: Self = Self((1 << (Signo::SIGKILL as u64 - 1)) | (1 << (Signo::SIGSTOP as u64 - 1)));

    /// Creates a set from its raw bit representation.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bit representation.
    pub const fn bits(self) -> u64 {
        self.0
    }

    const fn bit(signo: Signo) -> u64 {
        1 << (signo as u64 - 1)
    }

    /// Adds a signal; returns `false` if it was already present.
    pub fn add(&mut self, signo: Signo) -> bool {
        let had = self.has(signo);
        self.0 |= Self::bit(signo);
        !had
    }

    /// Removes a signal; returns `false` if it was absent.
    pub fn remove(&mut self, signo: Signo) -> bool {
        let had = self.has(signo);
        self.0 &= !Self::bit(signo);
        had
    }

    pub const fn has(&self, signo: Signo) -> bool {
        self.0 & Self::bit(signo) != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Removes and returns the lowest-numbered signal that is also in `mask`.
    pub fn dequeue(&mut self, mask: &SignalSet) -> Option<Signo> {
        let bits = self.0 & mask.0;
        if bits == 0 {
            return None;
        }
        let signo = Signo::from_raw(bits.trailing_zeros() + 1)?;
        self.remove(signo);
        Some(signo)
    }
}

impl ops::Not for SignalSet {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl ops::BitAnd for SignalSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl ops::BitOr for SignalSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalSet({:#x})", self.0)
    }
}
