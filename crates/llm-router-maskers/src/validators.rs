//! Checksum and structural validators for masking candidates
//!
//! Every validator is a pure `fn(&str) -> bool`. Input that cannot be parsed
//! simply validates `false`; none of these functions panic.

/// Parse ASCII digits, returning `None` on any other character
fn digits_of(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

/// Copy of `s` without the given separator characters
fn strip(s: &str, separators: impl Fn(char) -> bool) -> String {
    s.chars().filter(|c| !separators(*c)).collect()
}

fn weighted_sum(digits: &[u32], weights: &[u32]) -> u32 {
    digits.iter().zip(weights).map(|(d, w)| d * w).sum()
}

fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

// ---------------------------------------------------------------------------
// Polish identification numbers
// ---------------------------------------------------------------------------

/// PESEL: 11 digits, weights 1-3-7-9 repeated, check digit `(10 - sum % 10) % 10`
pub fn is_valid_pesel(pesel: &str) -> bool {
    let Some(d) = digits_of(pesel) else {
        return false;
    };
    if d.len() != 11 {
        return false;
    }

    const WEIGHTS: [u32; 10] = [1, 3, 7, 9, 1, 3, 7, 9, 1, 3];
    let check = (10 - weighted_sum(&d[..10], &WEIGHTS) % 10) % 10;
    check == d[10]
}

/// NIP: 10 digits (hyphens and spaces ignored), weighted sum mod 11 equals the last digit
pub fn is_valid_nip(raw: &str) -> bool {
    let cleaned = strip(raw, |c| c == '-' || c.is_whitespace());
    let Some(d) = digits_of(&cleaned) else {
        return false;
    };
    if d.len() != 10 {
        return false;
    }

    const WEIGHTS: [u32; 9] = [6, 5, 7, 2, 3, 4, 5, 6, 7];
    weighted_sum(&d[..9], &WEIGHTS) % 11 == d[9]
}

/// KRS: 10 digits, weighted sum mod 11 is the control digit; remainder 10 is invalid
pub fn is_valid_krs(raw: &str) -> bool {
    let cleaned = strip(raw, |c| c == '-' || c.is_whitespace());
    let Some(d) = digits_of(&cleaned) else {
        return false;
    };
    if d.len() != 10 {
        return false;
    }

    const WEIGHTS: [u32; 9] = [2, 3, 4, 5, 6, 7, 8, 9, 2];
    let control = weighted_sum(&d[..9], &WEIGHTS) % 11;
    control != 10 && control == d[9]
}

/// REGON: 9 or 14 digits (whitespace ignored); remainder 10 maps to 0.
///
/// The 14-digit form must also carry a valid 9-digit prefix.
pub fn is_valid_regon(raw: &str) -> bool {
    let cleaned = strip(raw, char::is_whitespace);
    let Some(d) = digits_of(&cleaned) else {
        return false;
    };

    fn checksum(digits: &[u32], weights: &[u32]) -> u32 {
        match weighted_sum(digits, weights) % 11 {
            10 => 0,
            r => r,
        }
    }

    const W9: [u32; 8] = [8, 9, 2, 3, 4, 5, 6, 7];
    const W14: [u32; 13] = [2, 3, 4, 5, 6, 7, 8, 9, 2, 3, 4, 5, 6];

    match d.len() {
        9 => checksum(&d[..8], &W9) == d[8],
        14 => checksum(&d[..8], &W9) == d[8] && checksum(&d[..13], &W14) == d[13],
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Financial numbers
// ---------------------------------------------------------------------------

fn luhn_sum(digits: &[u32]) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum()
}

/// Credit card: 13-19 digits after removing spaces and dashes, Luhn mod 10
pub fn is_valid_credit_card(number: &str) -> bool {
    let cleaned = strip(number, |c| c == ' ' || c == '-');
    let Some(d) = digits_of(&cleaned) else {
        return false;
    };
    (13..=19).contains(&d.len()) && luhn_sum(&d) % 10 == 0
}

/// NRB: 26 digits, whitespace ignored
pub fn is_valid_nrb(nrb: &str) -> bool {
    let cleaned = strip(nrb, char::is_whitespace);
    cleaned.len() == 26 && cleaned.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Vehicle and transport
// ---------------------------------------------------------------------------

const VIN_WEIGHTS: [u32; 17] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];
const VIN_LETTERS: &str = "ABCDEFGHJKLMNPRSTUVWXYZ";

fn vin_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    VIN_LETTERS
        .find(c)
        .map(|idx| idx as u32 + 1)
}

/// VIN: 17 characters without I, O, Q; check character at position 9
pub fn is_valid_vin(vin: &str) -> bool {
    let upper = vin.to_ascii_uppercase();
    let chars: Vec<char> = upper.chars().collect();
    if chars.len() != 17 {
        return false;
    }

    let mut total = 0;
    for (c, w) in chars.iter().zip(VIN_WEIGHTS) {
        match vin_value(*c) {
            Some(v) => total += v * w,
            None => return false,
        }
    }

    let expected = match total % 11 {
        10 => 'X',
        r => char::from_digit(r, 10).unwrap_or('?'),
    };
    chars[8] == expected
}

/// Car plate: 2-3 letters, optional whitespace, 2-5 digits, 0-2 letters
pub fn is_valid_car_plate(plate: &str) -> bool {
    let upper = plate.to_uppercase();
    let mut rest = upper.as_str();

    let letters = rest.chars().take_while(|c| c.is_ascii_uppercase()).count();
    if !(2..=3).contains(&letters) {
        return false;
    }
    rest = &rest[letters..];

    if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
        rest = &rest[c.len_utf8()..];
    }

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if !(2..=5).contains(&digits) {
        return false;
    }
    rest = &rest[digits..];

    rest.len() <= 2 && rest.chars().all(|c| c.is_ascii_uppercase())
}

// ---------------------------------------------------------------------------
// International identification
// ---------------------------------------------------------------------------

/// SSN: `AAA-GG-SSSS`, format only
pub fn is_valid_ssn(ssn: &str) -> bool {
    let parts: Vec<&str> = ssn.split('-').collect();
    matches!(parts.as_slice(), [a, g, s]
        if a.len() == 3 && g.len() == 2 && s.len() == 4
            && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())))
}

/// EU VAT: two-letter prefix, 8-12 alphanumerics with at least six digits
pub fn is_valid_eu_vat(vat: &str) -> bool {
    let upper = vat.to_ascii_uppercase();
    let mut chars = upper.chars();
    let prefix_ok = chars.by_ref().take(2).filter(|c| c.is_ascii_uppercase()).count() == 2;
    if !prefix_ok {
        return false;
    }

    let body: Vec<char> = chars.collect();
    if !(8..=12).contains(&body.len()) {
        return false;
    }
    if !body.iter().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return false;
    }
    body.iter().filter(|c| c.is_ascii_digit()).count() >= 6
}

// ---------------------------------------------------------------------------
// Network and security
// ---------------------------------------------------------------------------

/// MAC address: six hex pairs, optionally separated by `:` or `-`
pub fn is_valid_mac(mac: &str) -> bool {
    let chars: Vec<char> = mac.chars().collect();
    let mut i = 0;

    for pair in 0..6 {
        if i + 2 > chars.len() || !is_hex(chars[i]) || !is_hex(chars[i + 1]) {
            return false;
        }
        i += 2;
        if pair < 5 && i < chars.len() && (chars[i] == ':' || chars[i] == '-') {
            i += 1;
        }
    }
    i == chars.len()
}

fn is_base64url(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// JWT: three base64url parts; header and payload at least 20 characters
pub fn is_possible_jwt(jwt: &str) -> bool {
    let parts: Vec<&str> = jwt.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts.iter().enumerate().all(|(i, p)| is_base64url(p) && (i == 2 || p.len() >= 20))
}

/// SIM card ICCID: 19 or 20 digits, whitespace ignored
pub fn is_valid_sim_iccid(iccid: &str) -> bool {
    let cleaned = strip(iccid, char::is_whitespace);
    (19..=20).contains(&cleaned.len()) && cleaned.chars().all(|c| c.is_ascii_digit())
}

/// SSL certificate serial: 16-40 hex characters
pub fn is_valid_ssl_serial(serial: &str) -> bool {
    (16..=40).contains(&serial.len()) && serial.chars().all(is_hex)
}

// ---------------------------------------------------------------------------
// Business identifiers
// ---------------------------------------------------------------------------

/// Transaction reference: 8-64 characters containing at least one digit
pub fn is_possible_transaction_ref(reference: &str) -> bool {
    let len = reference.chars().count();
    (8..=64).contains(&len) && reference.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pesel() {
        assert!(is_valid_pesel("44051401359"));
        assert!(!is_valid_pesel("44051401358"));
        assert!(!is_valid_pesel("4405140135"));
        assert!(!is_valid_pesel("4405140135a"));
        assert!(!is_valid_pesel(""));
    }

    #[test]
    fn test_nip() {
        assert!(is_valid_nip("5260250274"));
        assert!(is_valid_nip("526-025-02-74"));
        assert!(!is_valid_nip("5260250275"));
        assert!(!is_valid_nip("526025027"));
    }

    #[test]
    fn test_krs() {
        assert!(is_valid_krs("0000123452"));
        assert!(is_valid_krs("000-012-34-52"));
        assert!(!is_valid_krs("0000123453"));
        // weighted sum 10 (mod 11) has no valid control digit
        assert!(!is_valid_krs("0000000050"));
        assert!(!is_valid_krs("0000000051"));
    }

    #[test]
    fn test_regon() {
        assert!(is_valid_regon("123456785"));
        assert!(is_valid_regon("12 345 6785"));
        assert!(!is_valid_regon("123456786"));
        // remainder 10 maps to a zero check digit
        assert!(is_valid_regon("000000030"));
        assert!(is_valid_regon("12345678500008"));
        assert!(!is_valid_regon("12345678500009"));
        assert!(!is_valid_regon("1234567850000"));
    }

    #[test]
    fn test_credit_card() {
        assert!(is_valid_credit_card("4111111111111111"));
        assert!(is_valid_credit_card("4111 1111 1111 1111"));
        assert!(is_valid_credit_card("4111-1111-1111-1111"));
        assert!(!is_valid_credit_card("4111111111111112"));
        assert!(!is_valid_credit_card("411111111111"));
        assert!(!is_valid_credit_card("4111x11111111111"));
    }

    #[test]
    fn test_nrb() {
        assert!(is_valid_nrb("61109010140000071219812874"));
        assert!(is_valid_nrb("61 1090 1014 0000 0712 1981 2874"));
        assert!(!is_valid_nrb("6110901014000007121981287"));
    }

    #[test]
    fn test_vin() {
        assert!(is_valid_vin("11111111111111111"));
        assert!(is_valid_vin("AAAAAAAA1AAAAAAAA"));
        assert!(is_valid_vin("aaaaaaaa1aaaaaaaa"));
        assert!(is_valid_vin("40000000X00000000"));
        assert!(!is_valid_vin("40000000000000000"));
        assert!(!is_valid_vin("IIIIIIII1IIIIIIII"));
        assert!(!is_valid_vin("1111111111111111"));
    }

    #[test]
    fn test_car_plate() {
        assert!(is_valid_car_plate("WA 12345"));
        assert!(is_valid_car_plate("KR1234AB"));
        assert!(!is_valid_car_plate("W 12345"));
        assert!(!is_valid_car_plate("WA 1"));
        assert!(!is_valid_car_plate("WA 12345ABC"));
    }

    #[test]
    fn test_ssn_and_vat() {
        assert!(is_valid_ssn("123-45-6789"));
        assert!(!is_valid_ssn("123-456-789"));
        assert!(is_valid_eu_vat("PL1234567890"));
        assert!(!is_valid_eu_vat("Configuration"));
        assert!(!is_valid_eu_vat("PLABCDEFGH12"));
    }

    #[test]
    fn test_mac() {
        assert!(is_valid_mac("00:1A:2B:3C:4D:5E"));
        assert!(is_valid_mac("00-1a-2b-3c-4d-5e"));
        assert!(is_valid_mac("001A2B3C4D5E"));
        assert!(!is_valid_mac("00:1A:2B:3C:4D"));
        assert!(!is_valid_mac("00:1A:2B:3C:4D:5E:"));
    }

    #[test]
    fn test_jwt() {
        assert!(is_possible_jwt(
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0NTY3ODkwIn0.sig"
        ));
        assert!(!is_possible_jwt("short.parts.here"));
        assert!(!is_possible_jwt("only.two"));
    }

    #[test]
    fn test_sim_ssl_and_refs() {
        assert!(is_valid_sim_iccid("8948 0000 0000 0000 000"));
        assert!(!is_valid_sim_iccid("8948 0000 0000 0000"));
        assert!(is_valid_ssl_serial("0123456789abcdef"));
        assert!(!is_valid_ssl_serial("0123456789abcdeg"));
        assert!(is_possible_transaction_ref("TRX-20231125-001"));
        assert!(!is_possible_transaction_ref("TRX-ABC"));
    }
}
