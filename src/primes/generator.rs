use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::error;

use crate::sdk::api::{ChainError, ChainResult, Platform};

use super::primality;

/// Miller–Rabin iteration count at generation time: composite slip-through
/// probability at most 2^-120 per candidate.
const MR_ITERATIONS: u32 = 60;

/// Stateful generator of primes p = 2^k·t·m + 1 (t odd) with bit-length in
/// [len - log2(4/3), len), i.e. (3/4)·2^len <= p < 2^len.
///
/// Candidates are scanned with t increasing within each k and k strictly
/// decreasing, so one generator never emits the same prime twice.
pub struct PrimeGenerator {
    len: u32,
    m: u64,
    k: u32,
    t: u64,
    rng: ChaCha20Rng,
}

impl PrimeGenerator {
    pub fn new(len: u32, m: u64, platform: Platform) -> ChainResult<Self> {
        if len < 2 || len > platform.sp_nbits() {
            error!("prime bit-length {} not in [2, {}]", len, platform.sp_nbits());
            return Err(ChainError::BadParameter);
        }
        if m == 0 || m >= platform.sp_bound() {
            error!("cyclotomic order {} not in (0, {})", m, platform.sp_bound());
            return Err(ChainError::BadParameter);
        }

        // smallest k with 2^k * m > 2^{len-2}
        let mut k = 0;
        while (m << k) <= (1u64 << (len - 2)) {
            k += 1;
        }

        // t starts above the first window's upper bound, so the first call to
        // next() immediately steps k down to its true starting value
        Ok(Self {
            len,
            m,
            k,
            t: 8,
            rng: ChaCha20Rng::from_entropy(),
        })
    }

    /// Produce the next prime of the required shape, or `Exhausted` when the
    /// window [(3/4)·2^len, 2^len) holds no further candidates.
    pub fn next(&mut self) -> ChainResult<u64> {
        // p = 2^k·t·m + 1 must be even in 2^k·t·m, so odd m forces k >= 1
        let klb = if self.m % 2 == 0 { 0 } else { 1 };
        loop {
            // t ranges over [tlb, tub) for the current k
            let mut tub = ((1u64 << self.len) - 1).div_ceil(self.m << self.k);
            self.t += 1;
            if self.t >= tub {
                if self.k <= klb {
                    error!(
                        "no primes of shape 2^k·t·{} + 1 left in [{}, 2^{})",
                        self.m,
                        3u64 << (self.len - 2),
                        self.len
                    );
                    return Err(ChainError::Exhausted);
                }
                self.k -= 1;
                self.t = (3 * (1u64 << (self.len - 2)) - 1).div_ceil(self.m << self.k);
                tub = ((1u64 << self.len) - 1).div_ceil(self.m << self.k);
                debug_assert!(self.t < tub);
            }
            if self.t % 2 == 0 {
                continue;
            }

            let candidate = (self.m << self.k) * self.t + 1;
            debug_assert!(candidate >= 3 * (1u64 << (self.len - 2)));
            debug_assert!(candidate < 1u64 << self.len);

            if primality::is_prime(candidate, MR_ITERATIONS, &mut self.rng) {
                return Ok(candidate);
            }
        }
    }
}
