use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    collections::IndexSet,
    sdk::api::{ChainError, ChainResult, Platform},
};

/// Gaussian sampling width used when sizing the key-switching primes.
const DEFAULT_STDEV: f64 = 3.2;

/// Cyclotomic ring and plaintext-space parameters: ring order m, plaintext
/// prime p, Hensel lifting exponent r.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycloParams {
    m: u64,
    p: u64,
    r: u64,
}

impl CycloParams {
    pub fn new(m: u64, p: u64, r: u64) -> ChainResult<Self> {
        if m == 0 || p < 2 || r == 0 {
            error!("invalid cyclotomic parameters (m, p, r): ({}, {}, {})", m, p, r);
            return Err(ChainError::BadParameter);
        }
        Ok(Self { m, p, r })
    }

    pub fn m(&self) -> u64 {
        self.m
    }
    pub fn p(&self) -> u64 {
        self.p
    }
    pub fn r(&self) -> u64 {
        self.r
    }

    /// log(p^r), the plaintext-space modulus in log space.
    pub fn log_p_pow_r(&self) -> f64 {
        self.r as f64 * (self.p as f64).ln()
    }
}

/// A registered prime and its cached natural log. The transform context over
/// the m-th cyclotomic ring is realized by the NTT layer, keyed by (m, q).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Modulus {
    q: u64,
    log_q: f64,
}

/// Owner of the modulus chain: registered primes in registration order plus
/// the three disjoint role sets and the key-switching digit partition.
///
/// Built once, single-threaded, then treated as immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    cyclo: CycloParams,
    platform: Platform,
    stdev: f64,
    moduli: Vec<Modulus>,
    small_primes: IndexSet,
    ctxt_primes: IndexSet,
    special_primes: IndexSet,
    digits: Vec<IndexSet>,
}

impl Context {
    pub fn new(cyclo: CycloParams, platform: Platform) -> ChainResult<Self> {
        if cyclo.m() >= platform.sp_bound() {
            error!(
                "cyclotomic order {} at or above platform bound {}",
                cyclo.m(),
                platform.sp_bound()
            );
            return Err(ChainError::BadParameter);
        }
        Ok(Self {
            cyclo,
            platform,
            stdev: DEFAULT_STDEV,
            moduli: Vec::new(),
            small_primes: IndexSet::new(),
            ctxt_primes: IndexSet::new(),
            special_primes: IndexSet::new(),
            digits: Vec::new(),
        })
    }

    pub fn with_stdev(mut self, stdev: f64) -> ChainResult<Self> {
        if !(stdev > 0.0) {
            error!("stdev {} not positive", stdev);
            return Err(ChainError::BadParameter);
        }
        self.stdev = stdev;
        Ok(self)
    }

    pub fn in_chain(&self, q: u64) -> bool {
        self.moduli.iter().any(|modulus| modulus.q == q)
    }

    pub fn add_small_prime(&mut self, q: u64) -> ChainResult<()> {
        let index = self.register(q)?;
        self.small_primes.insert(index);
        Ok(())
    }

    pub fn add_ctxt_prime(&mut self, q: u64) -> ChainResult<()> {
        let index = self.register(q)?;
        self.ctxt_primes.insert(index);
        Ok(())
    }

    pub fn add_special_prime(&mut self, q: u64) -> ChainResult<()> {
        let index = self.register(q)?;
        self.special_primes.insert(index);
        Ok(())
    }

    fn modulus(&self, index: usize) -> ChainResult<&Modulus> {
        self.moduli.get(index).ok_or_else(|| {
            error!("prime index {} out of range (have {})", index, self.moduli.len());
            ChainError::BadParameter
        })
    }

    pub fn ith_prime(&self, index: usize) -> ChainResult<u64> {
        Ok(self.modulus(index)?.q)
    }

    pub fn log_of_prime(&self, index: usize) -> ChainResult<f64> {
        Ok(self.modulus(index)?.log_q)
    }

    /// Natural log of the product of the primes indexed by `set`.
    pub fn log_of_product(&self, set: &IndexSet) -> ChainResult<f64> {
        let mut sum = 0.0;
        for index in set.iter() {
            sum += self.log_of_prime(index)?;
        }
        Ok(sum)
    }

    pub fn num_primes(&self) -> usize {
        self.moduli.len()
    }
    pub fn small_primes(&self) -> &IndexSet {
        &self.small_primes
    }
    pub fn ctxt_primes(&self) -> &IndexSet {
        &self.ctxt_primes
    }
    pub fn special_primes(&self) -> &IndexSet {
        &self.special_primes
    }
    pub fn digits(&self) -> &[IndexSet] {
        &self.digits
    }
    pub fn stdev(&self) -> f64 {
        self.stdev
    }
    pub fn cyclo(&self) -> &CycloParams {
        &self.cyclo
    }
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub(super) fn set_digits(&mut self, digits: Vec<IndexSet>) {
        self.digits = digits;
    }

    /// Register q at the next free index. Indices are never reused; a prime
    /// may be registered under exactly one role.
    fn register(&mut self, q: u64) -> ChainResult<usize> {
        if self.in_chain(q) {
            error!("prime {} already registered", q);
            return Err(ChainError::BadParameter);
        }
        self.moduli.push(Modulus {
            q,
            log_q: (q as f64).ln(),
        });
        Ok(self.moduli.len() - 1)
    }
}
