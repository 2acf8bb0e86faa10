//! API for modchain users
use serde::{Deserialize, Serialize};
use tracing::error;

pub type ChainResult<T> = Result<T, ChainError>;
pub type BytesVec = Vec<u8>;

/// Failure kinds surfaced by chain construction and table queries.
/// Diagnostic detail travels through the log, not the error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    /// Invalid len/m/resolution/platform combination at construction.
    BadParameter,
    /// A prime generator ran out of candidates of the requested shape.
    Exhausted,
    /// A table query found no entry in range nor in the one-bit slack window.
    NoFeasibleSet,
    /// A deserialization stream was missing framing or truncated.
    MalformedStream,
}

/// Largest bit-length of a single-precision modulus: products of two such
/// moduli must fit a u128 intermediate with headroom, matching the bound
/// used by 64-bit NTL builds.
pub const SP_NBITS: u32 = 60;

/// Explicit platform capability passed into constructors in place of
/// process-wide constants, so tests can parameterize the bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    sp_nbits: u32,
}

impl Platform {
    pub fn native() -> Self {
        Self { sp_nbits: SP_NBITS }
    }

    pub fn with_sp_nbits(sp_nbits: u32) -> ChainResult<Self> {
        if !(2..=SP_NBITS).contains(&sp_nbits) {
            error!("sp_nbits {} not in [2, {}]", sp_nbits, SP_NBITS);
            return Err(ChainError::BadParameter);
        }
        Ok(Self { sp_nbits })
    }

    pub fn sp_nbits(&self) -> u32 {
        self.sp_nbits
    }

    pub fn sp_bound(&self) -> u64 {
        1 << self.sp_nbits
    }
}

/// Expose modchain's versioned (de)serialization helpers
/// that use the appropriate bincode config options.
pub use super::wire_bytes::{decode, encode};
