// storefront/src/services/order_code.rs

//! Human-readable order codes: two uppercase letters followed by six digits (e.g. `TZ482913`).
//! The code is the only credential needed to read an order's public tracking view.

use rand::Rng;

pub const ORDER_CODE_LEN: usize = 8;
/// Inserts attempted before placement gives up on finding an unused code.
pub const MAX_ORDER_CODE_ATTEMPTS: u32 = 3;

/// Source of candidate order codes. Uniqueness is enforced by the store, not here.
pub trait OrderCodeSource: Send + Sync {
  fn next_code(&self) -> String;
}

/// Letters uniform over A-Z, digits uniform over 100000..=999999.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderCodes;

impl OrderCodeSource for RandomOrderCodes {
  fn next_code(&self) -> String {
    generate_order_code(&mut rand::thread_rng())
  }
}

pub fn generate_order_code<R: Rng + ?Sized>(rng: &mut R) -> String {
  let letters: String = (0..2).map(|_| char::from(b'A' + rng.gen_range(0..26u8))).collect();
  let digits: u32 = rng.gen_range(100_000..=999_999);
  format!("{letters}{digits}")
}

/// Checks `[A-Z]{2}[0-9]{6}` on an already normalized code.
pub fn is_well_formed(code: &str) -> bool {
  let bytes = code.as_bytes();
  bytes.len() == ORDER_CODE_LEN
    && bytes[..2].iter().all(u8::is_ascii_uppercase)
    && bytes[2..].iter().all(u8::is_ascii_digit)
}

/// Trims and uppercases user input before lookup.
pub fn normalize(raw: &str) -> String {
  raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  #[test]
  fn generated_codes_are_well_formed() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2_000 {
      let code = generate_order_code(&mut rng);
      assert!(is_well_formed(&code), "bad code {code}");
      assert_ne!(code.as_bytes()[2], b'0', "digits never start with zero: {code}");
    }
  }

  #[test]
  fn generated_codes_spread_over_the_code_space() {
    let mut rng = StdRng::seed_from_u64(11);
    let codes: HashSet<String> = (0..1_000).map(|_| generate_order_code(&mut rng)).collect();
    assert!(codes.len() > 990);
  }

  #[test]
  fn well_formedness_is_strict() {
    assert!(is_well_formed("TZ482913"));
    assert!(!is_well_formed("tz482913"));
    assert!(!is_well_formed("TZ48291"));
    assert!(!is_well_formed("T2482913"));
    assert!(!is_well_formed("TZ4829133"));
  }

  #[test]
  fn normalize_trims_and_uppercases() {
    assert_eq!(normalize("  tz482913\n"), "TZ482913");
  }
}
