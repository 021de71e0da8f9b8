use rand::Rng;

use crate::error::LedgerError;
use crate::ledger::{Amount, EDU_SCALE};

const FRACTIONAL_DIGITS: usize = 8; // EDU_SCALE = 10^8

/// Generate a mock wallet address: `0x` followed by 40 lowercase hex
/// characters. Used when no real wallet extension is available.
pub fn mock_address<R: Rng>(rng: &mut R) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for _ in 0..40 {
        out.push(HEX[rng.gen_range(0..HEX.len())] as char);
    }
    out
}

/// Middle-truncated display form of an address (`0x4f2a...a8f3`).
///
/// Empty input stays empty; anything too short to truncate is returned
/// whole.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    match (address.get(..6), address.get(address.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => address.to_string(),
    }
}

/// Render base units as a decimal EDU amount, trimming trailing zeros.
pub fn format_edu(amount: Amount) -> String {
    let whole = amount / EDU_SCALE;
    let frac = amount % EDU_SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let mut frac_str = format!("{frac:0width$}", width = FRACTIONAL_DIGITS);
    while frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{whole}.{frac_str}")
}

/// Parse a decimal EDU amount (`"12"`, `"12.5"`, up to 8 fractional
/// digits) into base units.
pub fn parse_edu(text: &str) -> Result<Amount, LedgerError> {
    let trimmed = text.trim();
    let invalid = || LedgerError::Validation(format!("invalid EDU amount {trimmed:?}"));
    let (whole_str, frac_str) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if frac_str.len() > FRACTIONAL_DIGITS {
        return Err(LedgerError::Validation(format!(
            "EDU amounts carry at most {FRACTIONAL_DIGITS} fractional digits: {trimmed:?}"
        )));
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let whole: Amount = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().map_err(|_| invalid())?
    };
    let mut frac: Amount = 0;
    if !frac_str.is_empty() {
        frac = frac_str.parse().map_err(|_| invalid())?;
        for _ in frac_str.len()..FRACTIONAL_DIGITS {
            frac *= 10;
        }
    }
    whole
        .checked_mul(EDU_SCALE)
        .and_then(|base| base.checked_add(frac))
        .ok_or_else(|| LedgerError::Validation(format!("EDU amount out of range: {trimmed:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn mock_addresses_have_the_expected_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let address = mock_address(&mut rng);
        assert_eq!(address.len(), 42);
        assert!(address.starts_with("0x"));
        assert!(address[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn format_address_truncates_the_middle() {
        assert_eq!(
            format_address("0x4f2accb6c94f2e1f1c22296ed60b0e9dacbca8f3"),
            "0x4f2a...a8f3"
        );
        assert_eq!(format_address(""), "");
        assert_eq!(format_address("0xabcd"), "0xabcd");
    }

    #[test]
    fn edu_formatting_round_trips() {
        for text in ["0", "1", "10", "1000", "12.5", "0.00000001", "99.00000001"] {
            let base = parse_edu(text).unwrap();
            assert_eq!(format_edu(base), text, "round trip of {text}");
        }
        assert_eq!(parse_edu(" 42 ").unwrap(), 42 * EDU_SCALE);
        assert_eq!(parse_edu("0.5").unwrap(), EDU_SCALE / 2);
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        for text in ["", ".", "-1", "1.2.3", "abc", "1e5", "0.000000001"] {
            assert!(parse_edu(text).is_err(), "{text:?} should be rejected");
        }
    }
}
