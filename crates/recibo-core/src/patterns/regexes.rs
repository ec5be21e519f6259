//! Regex patterns for Brazilian financial documents.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// CNPJ (Brazilian company tax ID): 12.345.678/0001-95.
    pub static ref CNPJ: Regex = Regex::new(
        r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}"
    ).unwrap();

    /// Brazilian currency: R$ 1.234,56 (dot thousands, comma decimals).
    pub static ref CURRENCY: Regex = Regex::new(
        r"R\$\s?(\d{1,3}(?:\.\d{3})*,\d{2})"
    ).unwrap();

    /// Brazilian date: DD/MM/YYYY or DD-MM-YYYY.
    pub static ref DATE_BR: Regex = Regex::new(
        r"\b(\d{2})[/-](\d{2})[/-](\d{4})\b"
    ).unwrap();

    /// Boleto digit line (linha digitável), 47 digits in the standard
    /// five-group layout.
    pub static ref BOLETO_LINE: Regex = Regex::new(
        r"\d{5}\.\d{5}\s+\d{5}\.\d{6}\s+\d{5}\.\d{6}\s+\d\s+\d{14}"
    ).unwrap();

    /// Merchant header heuristic: a line starting with 5+ consecutive
    /// uppercase (accented) letters and spaces.
    pub static ref MERCHANT_HEADER: Regex = Regex::new(
        r"^[A-ZÁÂÃÀÇÉÊÍÓÔÕÚÜ][A-ZÁÂÃÀÇÉÊÍÓÔÕÚÜ ]{4,}"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_requires_comma_decimals() {
        assert!(CURRENCY.is_match("R$ 10,00"));
        assert!(CURRENCY.is_match("R$ 1.250,50"));
        assert!(!CURRENCY.is_match("R$ 10.00"));
        assert!(!CURRENCY.is_match("US$ 10,00x"));
    }

    #[test]
    fn merchant_header_rejects_short_or_lowercase() {
        assert!(MERCHANT_HEADER.is_match("PADARIA DO ZÉ"));
        assert!(!MERCHANT_HEADER.is_match("Padaria do Zé"));
        assert!(!MERCHANT_HEADER.is_match("LOJA"));
    }
}
