use serde::{Deserialize, Serialize};

use crate::{sdk::api::ChainResult, sizes::ModuliSizes};

pub use super::builder::{add_ctxt_primes, add_small_primes, add_special_primes};
pub use super::context::{Context, CycloParams};

/// Bootstrapping parameters consumed by the special-prime pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaE {
    pub alpha: f64,
    pub e: u64,
    pub e_prime: u64,
}

/// Oracle deriving (alpha, e, e') from the chain under construction.
/// Supplying one to [build_mod_chain] marks the chain bootstrappable.
pub trait BootstrapOracle {
    fn alpha_e(&self, context: &Context) -> ChainResult<AlphaE>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModChainParams {
    /// Bits of ciphertext modulus to accumulate.
    pub n_bits: u32,
    /// Requested key-switching digit count, clamped to [1, |ctxtPrimes|].
    pub n_dgts: usize,
    /// Small-prime granularity in bits; values outside [1, 10] fall back to 3.
    pub resolution: u32,
}

/// Run the three chain-building passes in order, then materialize the
/// sizes table for runtime set selection.
pub fn build_mod_chain(
    context: &mut Context,
    params: &ModChainParams,
    bootstrap: Option<&dyn BootstrapOracle>,
) -> ChainResult<ModuliSizes> {
    add_small_primes(context, params.resolution)?;
    add_ctxt_primes(context, params.n_bits)?;
    add_special_primes(context, params.n_dgts, bootstrap)?;
    ModuliSizes::init(context)
}
