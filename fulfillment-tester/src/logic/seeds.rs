use anyhow::{Context, Result, bail};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

pub const DEFAULT_SEED: u64 = 1337;
const SWEEP_PREFIX: &str = "sweep:";
const MAX_SWEEP: usize = 10_000;

/// Resolve CLI seed tokens into a deduplicated list of seeds.
///
/// Accepts decimal integers (negative values use their magnitude),
/// `0x`-prefixed hex, and `sweep:N`, which expands to `N` seeds drawn from a
/// ChaCha stream keyed by `N` so the same sweep always yields the same seeds.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut pending = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Some(count) = token.strip_prefix(SWEEP_PREFIX) {
            let count: usize = count
                .parse()
                .with_context(|| format!("invalid sweep size in {token}"))?;
            if count == 0 || count > MAX_SWEEP {
                bail!("sweep size must be between 1 and {MAX_SWEEP}, got {count}");
            }
            pending.extend(sweep_seeds(count));
            continue;
        }

        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            let value = u64::from_str_radix(hex, 16)
                .with_context(|| format!("invalid hex seed {token}"))?;
            pending.push(value);
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(value.unsigned_abs());
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(value);
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut seen = HashSet::new();
    pending.retain(|seed| seen.insert(*seed));

    if pending.is_empty() {
        pending.push(DEFAULT_SEED);
    }

    Ok(pending)
}

fn sweep_seeds(count: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(u64::try_from(count).unwrap_or(u64::MAX));
    (0..count).map(|_| rng.next_u64()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_decimal_hex_and_negative_seeds() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "0xff", "-7"])).unwrap();
        assert_eq!(seeds, vec![42, 255, 7]);
    }

    #[test]
    fn duplicates_are_removed_in_order() {
        let seeds = resolve_seed_inputs(&tokens(&["5", "0x5", "6", "5"])).unwrap();
        assert_eq!(seeds, vec![5, 6]);
    }

    #[test]
    fn empty_input_falls_back_to_default() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn sweeps_are_reproducible() {
        let a = resolve_seed_inputs(&tokens(&["sweep:8"])).unwrap();
        let b = resolve_seed_inputs(&tokens(&["sweep:8"])).unwrap();
        assert_eq!(a.len(), 8);
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert!(resolve_seed_inputs(&tokens(&["banana"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["sweep:0"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["0xZZ"])).is_err());
    }
}
