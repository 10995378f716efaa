//! Utility types for trait definitions.
use std::fmt::{Debug, Display};

use bytemuck::Pod;
#[cfg(feature = "mpi")]
use mpi::traits::Equivalence;
use num::PrimInt;

/// Rank of the process that holds the dataset before scattering and after gathering.
pub const COORDINATOR_RANK: usize = 0;

/// Type to handle bucket sort related errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration, detected identically on every process before any collective is issued.
    #[error("Configuration Error: {0}")]
    Configuration(String),

    /// Malformed arguments or payloads for a collective operation.
    #[error("Transport Error: {0}")]
    Transport(String),

    /// A peer issued a different collective than this process at the same point in program order.
    #[error("Rank {rank} expected collective '{expected}' but received '{received}'")]
    Desynchronised {
        /// Rank observing the mismatch
        rank: usize,
        /// Collective issued by this rank
        expected: String,
        /// Collective issued by the peer
        received: String,
    },

    /// A peer stopped participating before completing a collective.
    #[error("Rank {rank} lost peer {peer} during a collective")]
    Disconnected {
        /// Rank observing the disconnection
        rank: usize,
        /// Rank of the departed peer
        peer: usize,
    },

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result Type
pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can be moved by a collective operation, keys as well as counts and timings.
#[cfg(not(feature = "mpi"))]
pub trait Payload: Pod + Default + Send + Sync + 'static {}

#[cfg(not(feature = "mpi"))]
impl<T: Pod + Default + Send + Sync + 'static> Payload for T {}

/// Anything that can be moved by a collective operation, keys as well as counts and timings.
#[cfg(feature = "mpi")]
pub trait Payload: Pod + Default + Send + Sync + Equivalence + 'static {}

#[cfg(feature = "mpi")]
impl<T: Pod + Default + Send + Sync + Equivalence + 'static> Payload for T {}

/// Fixed width, totally ordered sort keys.
pub trait Key: Payload + PrimInt + Debug + Display {
    /// Lossless conversion used for range arithmetic.
    fn widen(self) -> i128;

    /// Inverse of [`Key::widen`], `None` if `value` is not representable.
    fn narrow(value: i128) -> Option<Self>;
}

macro_rules! impl_key {
    ($($t:ty),*) => {
        $(
            impl Key for $t {
                #[inline]
                fn widen(self) -> i128 {
                    self as i128
                }

                #[inline]
                fn narrow(value: i128) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Identity of one process among the cooperating processes, passed explicitly to every component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    /// Zero based index of this process
    pub rank: usize,

    /// Number of cooperating processes
    pub size: usize,
}

impl ExecutionContext {
    /// Constructor
    pub fn new(rank: usize, size: usize) -> Self {
        Self { rank, size }
    }

    /// Whether this process is the coordinator
    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }
}
