//! Check-digit validation for Brazilian national identifiers.

const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_WEIGHTS_FIRST: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_WEIGHTS_SECOND: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];

/// Validate a CNPJ (company registry number), masked or not.
///
/// ```
/// use tablecheck::validation::is_valid_cnpj;
///
/// assert!(is_valid_cnpj("11.444.777/0001-61"));
/// assert!(!is_valid_cnpj("00.000.000/0000-00"));
/// ```
pub fn is_valid_cnpj(value: &str) -> bool {
    let Some(digits) = digits_of(value, 14) else {
        return false;
    };
    digits[12] == check_digit(&digits[..12], &CNPJ_WEIGHTS_FIRST)
        && digits[13] == check_digit(&digits[..13], &CNPJ_WEIGHTS_SECOND)
}

/// Validate a CPF (individual taxpayer number), masked or not.
///
/// ```
/// use tablecheck::validation::is_valid_cpf;
///
/// assert!(is_valid_cpf("123.456.789-09"));
/// assert!(!is_valid_cpf("111.111.111-11"));
/// ```
pub fn is_valid_cpf(value: &str) -> bool {
    let Some(digits) = digits_of(value, 11) else {
        return false;
    };
    digits[9] == check_digit(&digits[..9], &CPF_WEIGHTS_FIRST)
        && digits[10] == check_digit(&digits[..10], &CPF_WEIGHTS_SECOND)
}

/// Decimal digits of `value`, ignoring mask characters. `None` unless there
/// are exactly `len` digits that are not all the same.
fn digits_of(value: &str, len: usize) -> Option<Vec<u32>> {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != len || digits.iter().all(|&d| d == digits[0]) {
        return None;
    }
    Some(digits)
}

/// Modulo-11 check digit.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cnpj() {
        assert!(is_valid_cnpj("11.444.777/0001-61"));
        assert!(is_valid_cnpj("11444777000161"));
        assert!(!is_valid_cnpj("11.444.777/0001-62"));
        assert!(!is_valid_cnpj("00.000.000/0000-00"));
        assert!(!is_valid_cnpj("11111111111111"));
        assert!(!is_valid_cnpj("1144477700016"));
        assert!(!is_valid_cnpj(""));
    }

    #[test]
    fn test_cpf() {
        assert!(is_valid_cpf("123.456.789-09"));
        assert!(is_valid_cpf("12345678909"));
        assert!(!is_valid_cpf("123.456.789-00"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("1234567890"));
        assert!(!is_valid_cpf("abc"));
    }

    #[test]
    fn test_mask_does_not_change_verdict() {
        for (masked, plain) in [
            ("11.444.777/0001-61", "11444777000161"),
            ("11.444.777/0001-60", "11444777000160"),
        ] {
            assert_eq!(is_valid_cnpj(masked), is_valid_cnpj(plain));
        }
        for (masked, plain) in [("123.456.789-09", "12345678909"), ("529.982.247-25", "52998224725")] {
            assert_eq!(is_valid_cpf(masked), is_valid_cpf(plain));
        }
    }
}
