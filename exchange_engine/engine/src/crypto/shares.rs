//! Shamir secret sharing of 32-byte data keys over GF(256), byte by byte.

use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{ExchangeError, Result};

pub const SECRET_LEN: usize = 32;

/// One evaluation point of the sharing polynomial.
#[derive(Clone)]
pub struct Share {
    /// x coordinate, the committee index of the holder (never 0)
    pub x: u8,
    pub value: [u8; SECRET_LEN],
}

impl Drop for Share {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

mod gf256 {
    /// Multiplication modulo the AES polynomial x^8 + x^4 + x^3 + x + 1.
    pub fn mul(mut a: u8, mut b: u8) -> u8 {
        let mut product = 0u8;
        while b != 0 {
            if b & 1 != 0 {
                product ^= a;
            }
            let carry = a & 0x80;
            a <<= 1;
            if carry != 0 {
                a ^= 0x1b;
            }
            b >>= 1;
        }
        product
    }

    /// a^254 = a^-1 for non-zero a.
    pub fn inv(a: u8) -> u8 {
        let mut result = 1u8;
        let mut base = a;
        let mut exp = 254u8;
        while exp != 0 {
            if exp & 1 != 0 {
                result = mul(result, base);
            }
            base = mul(base, base);
            exp >>= 1;
        }
        result
    }

    pub fn div(a: u8, b: u8) -> u8 {
        mul(a, inv(b))
    }
}

/// Splits `secret` so that any `threshold` of the returned shares recover it.
/// One share per entry of `xs`, in the same order.
pub fn split_secret(secret: &[u8; SECRET_LEN], threshold: usize, xs: &[u8]) -> Result<Vec<Share>> {
    check_points(xs)?;
    if threshold == 0 || threshold > xs.len() {
        return Err(ExchangeError::InvalidPolicy {
            t: threshold,
            n: xs.len(),
        });
    }

    let mut rng = rand::thread_rng();
    let mut shares: Vec<Share> = xs
        .iter()
        .map(|x| Share {
            x: *x,
            value: [0u8; SECRET_LEN],
        })
        .collect();

    let mut coeffs = vec![0u8; threshold];
    for byte_idx in 0..SECRET_LEN {
        // f(x) = secret + a1*x + ... + a_{t-1}*x^{t-1}
        coeffs[0] = secret[byte_idx];
        rng.fill_bytes(&mut coeffs[1..]);

        for share in shares.iter_mut() {
            // Horner from the highest coefficient down.
            let mut y = 0u8;
            for coeff in coeffs.iter().rev() {
                y = gf256::mul(y, share.x) ^ coeff;
            }
            share.value[byte_idx] = y;
        }
    }
    coeffs.zeroize();

    Ok(shares)
}

/// Lagrange interpolation at x = 0 over exactly the shares given.
pub fn combine_shares(shares: &[Share]) -> Result<[u8; SECRET_LEN]> {
    if shares.is_empty() {
        return Err(ExchangeError::InsufficientShares { have: 0, need: 1 });
    }
    let xs: Vec<u8> = shares.iter().map(|s| s.x).collect();
    check_points(&xs)?;

    let mut secret = [0u8; SECRET_LEN];
    for (i, share_i) in shares.iter().enumerate() {
        // L_i(0) = prod_{j != i} x_j / (x_i - x_j); subtraction is xor in GF(2^8)
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, share_j) in shares.iter().enumerate() {
            if i != j {
                numerator = gf256::mul(numerator, share_j.x);
                denominator = gf256::mul(denominator, share_i.x ^ share_j.x);
            }
        }
        let basis = gf256::div(numerator, denominator);

        for (byte, y) in secret.iter_mut().zip(share_i.value.iter()) {
            *byte ^= gf256::mul(*y, basis);
        }
    }

    Ok(secret)
}

fn check_points(xs: &[u8]) -> Result<()> {
    let mut seen = [false; 256];
    for x in xs {
        if *x == 0 || seen[*x as usize] {
            return Err(ExchangeError::Crypto(format!(
                "share coordinates must be distinct and non-zero: {xs:?}"
            )));
        }
        seen[*x as usize] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gf256_inverse() {
        for a in 1..=255u8 {
            assert_eq!(gf256::mul(a, gf256::inv(a)), 1, "a = {a}");
        }
    }

    #[test]
    fn test_any_threshold_subset_recovers() {
        let secret = [0x5au8; SECRET_LEN];
        let shares = split_secret(&secret, 3, &[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(combine_shares(&shares[0..3]).unwrap(), secret);
        assert_eq!(combine_shares(&shares[2..5]).unwrap(), secret);
        let scattered = vec![shares[4].clone(), shares[0].clone(), shares[3].clone()];
        assert_eq!(combine_shares(&scattered).unwrap(), secret);
    }

    #[test]
    fn test_below_threshold_does_not_recover() {
        let mut secret = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        let shares = split_secret(&secret, 3, &[1, 2, 3]).unwrap();
        assert_ne!(combine_shares(&shares[0..2]).unwrap(), secret);
    }

    #[test]
    fn test_invalid_points_rejected() {
        let secret = [1u8; SECRET_LEN];
        assert!(split_secret(&secret, 2, &[0, 1, 2]).is_err());
        assert!(split_secret(&secret, 2, &[1, 1, 2]).is_err());
        assert!(split_secret(&secret, 4, &[1, 2, 3]).is_err());
    }
}
