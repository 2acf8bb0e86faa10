//! The three chain-building passes: small, ctxt, and special primes
use std::f64::consts::LN_2;
use tracing::{debug, error};

use crate::{
    collections::IndexSet,
    primes::PrimeGenerator,
    sdk::api::{ChainError, ChainResult},
};

use super::{api::BootstrapOracle, context::Context};

/// Largest cyclotomic order the small-prime pass accepts.
const MAX_M: u64 = 1 << 20;

/// Substituted when the caller passes a resolution outside [1, 10].
const DEFAULT_RESOLUTION: u32 = 3;

/// Populate the `smallPrimes` role: a family of coarse floor-size primes plus
/// a ladder of sizes descending from SP_NBITS at the given bit resolution,
/// so that subset products can approximate arbitrary log-sizes.
pub fn add_small_primes(context: &mut Context, resolution: u32) -> ChainResult<()> {
    let m = context.cyclo().m();
    if m == 0 || m > MAX_M {
        error!("cyclotomic order {} not in (0, {}]", m, MAX_M);
        return Err(ChainError::BadParameter);
    }
    let resolution = if (1..=10).contains(&resolution) {
        resolution
    } else {
        DEFAULT_RESOLUTION
    };
    let sp_nbits = context.platform().sp_nbits();

    let floor_size: u32 = if sp_nbits >= 60 {
        40
    } else if sp_nbits >= 50 {
        35
    } else if sp_nbits >= 30 {
        22
    } else {
        error!("platform sp_nbits {} below minimum 30", sp_nbits);
        return Err(ChainError::BadParameter);
    };

    let mut sizes: Vec<u32> = vec![floor_size, floor_size];
    if sp_nbits < 50 {
        sizes.push(floor_size);
    }

    let mut delta = resolution;
    while sp_nbits > floor_size + delta {
        sizes.push(sp_nbits - delta);
        delta *= 2;
    }
    if sp_nbits > floor_size + 3 * resolution {
        sizes.push(sp_nbits - 3 * resolution);
    }
    if resolution == 1 && sp_nbits > floor_size + 11 {
        sizes.push(sp_nbits - 11);
    }
    sizes.sort_unstable();

    // one generator per size bucket, reused while the size repeats
    let mut generator = PrimeGenerator::new(sizes[0], m, context.platform())?;
    let mut last_size = sizes[0];
    for &size in &sizes {
        if size != last_size {
            generator = PrimeGenerator::new(size, m, context.platform())?;
            last_size = size;
        }
        context.add_small_prime(generator.next()?)?;
    }
    debug!(
        "registered {} small primes for sizes {:?}",
        sizes.len(),
        sizes
    );
    Ok(())
}

/// Populate the `ctxtPrimes` role with SP_NBITS-sized primes until their
/// product holds at least `n_bits` bits.
pub fn add_ctxt_primes(context: &mut Context, n_bits: u32) -> ChainResult<()> {
    let mut generator = PrimeGenerator::new(
        context.platform().sp_nbits(),
        context.cyclo().m(),
        context.platform(),
    )?;
    let mut bits_so_far = 0.0;
    while bits_so_far < n_bits as f64 {
        let q = generator.next()?;
        context.add_ctxt_prime(q)?;
        bits_so_far += (q as f64).log2();
    }
    Ok(())
}

/// Partition the ctxt primes into `n_dgts` key-switching digits and populate
/// the `specialPrimes` role with enough log-mass to cover the largest digit
/// plus the noise terms of key-switching.
pub fn add_special_primes(
    context: &mut Context,
    n_dgts: usize,
    bootstrap: Option<&dyn BootstrapOracle>,
) -> ChainResult<()> {
    let m = context.cyclo().m();
    let p = context.cyclo().p();

    // effective plaintext power p^r (times p^{e-e'} when bootstrappable),
    // tracked in log space: the integer power overflows u64 for large e
    let mut log_p2e = context.cyclo().log_p_pow_r();
    if let Some(oracle) = bootstrap {
        let alpha_e = oracle.alpha_e(context)?;
        if alpha_e.e < alpha_e.e_prime {
            error!(
                "bootstrapping exponents e {} < e' {}",
                alpha_e.e, alpha_e.e_prime
            );
            return Err(ChainError::BadParameter);
        }
        log_p2e += (alpha_e.e - alpha_e.e_prime) as f64 * (p as f64).ln();
    }

    let ctxt_primes = context.ctxt_primes().clone();
    let n_ctxt = ctxt_primes.card();
    if n_ctxt == 0 {
        error!("no ctxt primes registered before the special-prime pass");
        return Err(ChainError::BadParameter);
    }
    let mut n_dgts = n_dgts.clamp(1, n_ctxt);

    let mut digits: Vec<IndexSet> = Vec::with_capacity(n_dgts);
    if n_dgts == 1 {
        digits.push(ctxt_primes.clone());
    } else {
        // grow each of the first n_dgts-1 digits until the cumulative log
        // crosses its share of the total, remainder forms the last digit
        let dlog = context.log_of_product(&ctxt_primes)? / n_dgts as f64;
        let mut members = ctxt_primes.iter().peekable();
        let mut log_so_far = 0.0;
        let mut target = dlog;
        for _ in 0..n_dgts - 1 {
            let mut digit = IndexSet::new();
            while let Some(&index) = members.peek() {
                if digit.is_empty() || log_so_far < target {
                    digit.insert(index);
                    log_so_far += context.log_of_prime(index)?;
                    members.next();
                } else {
                    break;
                }
            }
            digits.push(digit);
            target += dlog;
        }
        let last: IndexSet = members.collect();
        if last.is_empty() {
            n_dgts -= 1;
        } else {
            digits.push(last);
        }
    }

    let mut max_digit_log = 0.0f64;
    for digit in &digits {
        max_digit_log = max_digit_log.max(context.log_of_product(digit)?);
    }

    let log_of_special_primes =
        max_digit_log + (n_dgts as f64).ln() + (2.0 * context.stdev()).ln() + log_p2e;

    let sp_nbits = context.platform().sp_nbits();
    let total_bits = log_of_special_primes / LN_2;
    let num_primes = (total_bits / sp_nbits as f64).ceil().max(1.0);
    let nbits = (((total_bits / num_primes).ceil() as u32) + 1).min(sp_nbits);
    debug!(
        "special primes: {} digits, log mass {}, bucket {} bits",
        n_dgts, log_of_special_primes, nbits
    );

    context.set_digits(digits);

    let mut generator = PrimeGenerator::new(nbits, m, context.platform())?;
    let mut log_so_far = 0.0;
    while log_so_far < log_of_special_primes {
        let q = generator.next()?;
        // nbits may coincide with an earlier bucket, so repeats are possible
        if context.in_chain(q) {
            continue;
        }
        context.add_special_prime(q)?;
        log_so_far += (q as f64).ln();
    }
    Ok(())
}
