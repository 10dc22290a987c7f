//! Format checks for contact fields.

use regex::Regex;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 ()./-]{5,19}$";

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254
        && Regex::new(EMAIL_PATTERN)
            .map(|re| re.is_match(email))
            .unwrap_or(false)
}

pub fn is_valid_phone(phone: &str) -> bool {
    Regex::new(PHONE_PATTERN)
        .map(|re| re.is_match(phone))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("ana@bloodbank.test"));
        assert!(is_valid_email("first.last+tag@example.co"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn test_phone_format() {
        assert!(is_valid_phone("+44 20 7946 0958"));
        assert!(is_valid_phone("0712-345-678"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone("12"));
    }
}
