use crate::error::AnalysisError;

/// Collapse a 9-digit SA2 main code into the 5-digit SA2 code.
///
/// Keeps the first digit (the state) and the last four digits of the decimal
/// representation, e.g. `206041122` becomes `21122`. Inputs shorter than five
/// characters cannot carry both parts and are rejected.
pub fn normalize_region_key(code: &str) -> Result<i64, AnalysisError> {
    let code = code.trim();
    let chars: Vec<char> = code.chars().collect();
    if chars.len() < 5 {
        return Err(AnalysisError::InvalidData(format!(
            "Region code '{code}' is shorter than 5 characters"
        )));
    }

    let mut short = String::with_capacity(5);
    short.push(chars[0]);
    short.extend(&chars[chars.len() - 4..]);

    short.parse::<i64>().map_err(|_| {
        AnalysisError::InvalidData(format!("Region code '{code}' is not numeric"))
    })
}

/// Integer flavour of [`normalize_region_key`].
pub fn normalize_region_code(code: i64) -> Result<i64, AnalysisError> {
    normalize_region_key(&code.to_string())
}

/// Normalize every key, preserving order.
pub fn normalize_all(codes: &[i64]) -> Result<Vec<i64>, AnalysisError> {
    codes.iter().map(|&c| normalize_region_code(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(s: &str) -> i64 {
        format!("{}{}", &s[..1], &s[s.len() - 4..]).parse().unwrap()
    }

    #[test]
    fn keeps_first_and_last_four_digits() {
        assert_eq!(normalize_region_key("206041122").unwrap(), 21122);
        assert_eq!(normalize_region_code(801011001).unwrap(), 81001);
    }

    #[test]
    fn matches_reference_for_edge_digit_strings() {
        for s in ["000000000", "999999999", "123456789", "100000001", "905550042"] {
            assert_eq!(normalize_region_key(s).unwrap(), reference(s), "input {s}");
        }
        assert_eq!(normalize_region_key("000000000").unwrap(), 0);
        assert_eq!(normalize_region_key("999999999").unwrap(), 99999);
    }

    #[test]
    fn five_digit_codes_are_unchanged() {
        assert_eq!(normalize_region_key("21122").unwrap(), 21122);
    }

    #[test]
    fn short_or_non_numeric_codes_are_rejected() {
        assert!(matches!(
            normalize_region_key("1234"),
            Err(AnalysisError::InvalidData(_))
        ));
        assert!(normalize_region_key("2060A1x22").is_err());
    }

    #[test]
    fn normalize_all_preserves_order() {
        let out = normalize_all(&[206041122, 801011001]).unwrap();
        assert_eq!(out, vec![21122, 81001]);
    }
}
