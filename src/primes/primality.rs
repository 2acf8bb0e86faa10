//! Modular arithmetic and probabilistic primality testing
use rand::Rng;

/// a·b mod n using a u128 intermediate to avoid overflow.
pub fn mul_mod(a: u64, b: u64, n: u64) -> u64 {
    ((a as u128 * b as u128) % n as u128) as u64
}

/// base^exp mod n.
pub fn pow_mod(mut base: u64, mut exp: u64, n: u64) -> u64 {
    if n == 1 {
        return 0;
    }
    let mut result: u64 = 1;
    base %= n;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, n);
        }
        exp >>= 1;
        base = mul_mod(base, base, n);
    }
    result
}

const SMALL_PRIMES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Miller–Rabin with `iterations` uniformly random witness bases.
/// Error probability is at most 4^-iterations for composite n.
pub fn is_prime(n: u64, iterations: u32, rng: &mut impl Rng) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &SMALL_PRIMES {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    // n odd and > 37: write n-1 = 2^s * d with d odd
    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;

    'witness: for _ in 0..iterations {
        let a = rng.gen_range(2..n - 1);
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..s - 1 {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
