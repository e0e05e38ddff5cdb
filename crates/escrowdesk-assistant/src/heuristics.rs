//! Keyword heuristics over a lower-cased message

use std::sync::LazyLock;

use escrowdesk_types::{Amount, PartyId};
use regex::Regex;

use crate::types::BookingSlots;

static SERVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(haircut|clean|dog)").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(today|tomorrow|\d{1,2}/?\d{1,2})").unwrap());
static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)0x[a-f0-9]{40}").unwrap());
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d*)?|\.\d+)\s*eth\b").unwrap());

/// Whether the message names a known service
pub fn mentions_service(text: &str) -> bool {
    SERVICE_RE.is_match(text)
}

/// Whether the message names a day or a numeric date such as `12`,
/// `3/4` or `12/25`
pub fn mentions_date(text: &str) -> bool {
    DATE_RE.is_match(text)
}

/// First `0x`-prefixed 40-hex-digit run in the message
pub fn find_address(text: &str) -> Option<PartyId> {
    ADDRESS_RE
        .find_iter(text)
        .find_map(|m| PartyId::parse(m.as_str()).ok())
}

/// An amount written as `0.3 eth` or `0.3eth`
pub fn find_amount(text: &str) -> Option<Amount> {
    AMOUNT_RE.captures_iter(text).find_map(|caps| {
        Amount::parse_decimal(&caps[1])
            .ok()
            .filter(Amount::is_positive)
    })
}

/// Extract every slot the message fills
pub fn extract_slots(text: &str) -> BookingSlots {
    let text = text.to_lowercase();
    BookingSlots {
        seller: find_address(&text),
        amount: find_amount(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services() {
        assert!(mentions_service("haircut please"));
        assert!(mentions_service("house cleaning"));
        assert!(mentions_service("dog walking"));
        assert!(!mentions_service("massage"));
    }

    #[test]
    fn test_dates() {
        assert!(mentions_date("tomorrow"));
        assert!(mentions_date("today at noon"));
        assert!(mentions_date("on 12/25"));
        assert!(mentions_date("on 3/4"));
        assert!(mentions_date("at 10"));
        assert!(!mentions_date("at 2pm"));
        assert!(!mentions_date("sometime"));
        assert!(mentions_date("friday 19"));
        assert!(!mentions_date("friday 9"));
    }

    #[test]
    fn test_address() {
        let addr = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        let found = find_address(&format!("seller is {} thanks", addr)).unwrap();
        assert_eq!(found.to_string(), addr);

        assert!(find_address("0x1234").is_none());
        assert!(find_address(&format!("pay{}", addr)).is_some());
        assert!(find_address("no address here").is_none());
    }

    #[test]
    fn test_amount() {
        assert_eq!(
            find_amount("pay 0.3 eth"),
            Some(Amount::parse_decimal("0.3").unwrap())
        );
        assert_eq!(
            find_amount("lock 2eth now"),
            Some(Amount::parse_decimal("2").unwrap())
        );
        assert_eq!(find_amount("0 eth"), None);
        assert_eq!(find_amount("eth"), None);
        assert_eq!(find_amount("about 5 dollars"), None);
        assert_eq!(find_amount("5 ethereum"), None);
        assert_eq!(
            find_amount("send 0.25eth, please"),
            Some(Amount::parse_decimal("0.25").unwrap())
        );
    }

    #[test]
    fn test_extract_slots_is_case_insensitive() {
        let slots = extract_slots("Seller 0x8BA1F109551BD432803012645AC136DDD64DBA72, 1.5 ETH");
        assert!(slots.seller.is_some());
        assert_eq!(slots.amount, Some(Amount::parse_decimal("1.5").unwrap()));
    }
}
