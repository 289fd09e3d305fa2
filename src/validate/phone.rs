use crate::types::CheckStatus;

/// Recognized country calling codes, longest first so prefix matching is
/// unambiguous (e.g. +971 before +97 does not exist, but +91 vs +9 does).
const COUNTRY_CODES: &[&str] = &[
    "971", "972", "973", "974", "975", "976", "977", "880", "886", "960", "961", "962", "963",
    "964", "965", "966", "968", "994", "995", "996", "998", "20", "27", "30", "31", "32", "33",
    "34", "36", "39", "40", "41", "43", "44", "45", "46", "47", "48", "49", "51", "52", "53",
    "54", "55", "56", "57", "58", "60", "61", "62", "63", "64", "65", "66", "81", "82", "84",
    "86", "90", "91", "92", "93", "94", "95", "98", "1", "7",
];

/// Plausibility check on an E.164-attempted phone: the country code must be
/// in the known table and the total digit count inside [7, 15].
pub fn check_phone(phone: &str) -> CheckStatus {
    let digits = match phone.strip_prefix('+') {
        Some(rest) => rest,
        None => return CheckStatus::Invalid,
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return CheckStatus::Invalid;
    }
    if !(7..=15).contains(&digits.len()) {
        return CheckStatus::Invalid;
    }

    let code_known = COUNTRY_CODES.iter().any(|code| {
        // National part must still be non-trivial after the code
        digits.starts_with(code) && digits.len() >= code.len() + 6
    });
    if !code_known {
        return CheckStatus::Invalid;
    }

    CheckStatus::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indian_mobile_number_is_valid() {
        assert_eq!(check_phone("+919876543210"), CheckStatus::Valid);
    }

    #[test]
    fn us_number_is_valid() {
        assert_eq!(check_phone("+12125551234"), CheckStatus::Valid);
    }

    #[test]
    fn unknown_country_code_is_invalid() {
        assert_eq!(check_phone("+9991234567890"), CheckStatus::Invalid);
    }

    #[test]
    fn digit_count_outside_bounds_is_invalid() {
        assert_eq!(check_phone("+91123"), CheckStatus::Invalid);
        assert_eq!(check_phone("+911234567890123456"), CheckStatus::Invalid);
    }

    #[test]
    fn missing_plus_prefix_is_invalid() {
        assert_eq!(check_phone("919876543210"), CheckStatus::Invalid);
    }
}
