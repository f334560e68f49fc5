//! Fuzz target for the CNPJ and CPF check-digit validators.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tablecheck::validation::{is_valid_cnpj, is_valid_cpf};

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = std::str::from_utf8(data) {
        let cpf = is_valid_cpf(value);
        let cnpj = is_valid_cnpj(value);
        // A valid document always has exactly 11 or 14 digits.
        let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
        assert!(!cpf || digits == 11);
        assert!(!cnpj || digits == 14);
    }
});
