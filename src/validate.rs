use once_cell::sync::Lazy;
use regex::Regex;

// ASCII-only, permits the common RFC 5322 unquoted local-part characters;
// domain labels may not start or end with a hyphen.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn digits_of(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Valid iff the input has 10 to 15 digits after stripping everything else.
pub fn is_valid_phone(number: &str) -> bool {
    let count = digits_of(number).len();
    (10..=15).contains(&count)
}

/// Reformat a phone number as `+XX(XX)XXXX-XXXX`.
///
/// Slicing is purely positional: with 12 or more digits the first 12 are
/// used and the rest dropped, with no validation of the country or area
/// code values. 10- and 11-digit inputs are assumed to be Brazilian local
/// numbers and get a `+55` prefix. Anything else is returned unchanged.
pub fn format_phone(number: &str) -> String {
    let digits = digits_of(number);

    if digits.len() >= 12 {
        format!(
            "+{}({}){}-{}",
            &digits[0..2],
            &digits[2..4],
            &digits[4..8],
            &digits[8..12]
        )
    } else if digits.len() == 10 || digits.len() == 11 {
        let split = if digits.len() == 11 { 7 } else { 6 };
        format!(
            "+55({}){}-{}",
            &digits[0..2],
            &digits[2..split],
            &digits[split..]
        )
    } else {
        number.to_string()
    }
}
