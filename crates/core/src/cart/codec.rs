//! Compact text form of a [`CartLedger`].
//!
//! The encoded form is comma-joined `productId:quantity` pairs, e.g.
//! `couscous:2,brik:1`. It is what travels in the `cart` query parameter
//! between the menu and the cart page. Product ids are percent-encoded, so
//! an id containing `,` or `:` survives the trip.
//!
//! Decoding never fails: malformed segments are skipped so that a hand-edited
//! or truncated URL still yields whatever part of the cart is readable.

use tracing::debug;

use super::{CartLedger, parse_quantity, positive_quantity};
use crate::types::ProductId;

/// Separator between entries.
pub const ENTRY_SEPARATOR: char = ',';

/// Separator between a product id and its quantity.
pub const QUANTITY_SEPARATOR: char = ':';

/// Encode a ledger as `id:qty` pairs joined by `,`, in product id order.
///
/// An empty ledger encodes to the empty string.
#[must_use]
pub fn encode(ledger: &CartLedger) -> String {
    ledger
        .iter()
        .map(|(id, qty)| {
            format!(
                "{}{QUANTITY_SEPARATOR}{qty}",
                urlencoding::encode(id.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string())
}

/// Decode the text form back into a ledger.
///
/// Empty segments are discarded. Each remaining segment is split on `:`;
/// anything after a second `:` is ignored. The quantity is read as the
/// leading integer of its text. Segments with an empty or badly escaped id,
/// a missing or unparsable quantity, or a quantity `<= 0` are dropped. When
/// the same id appears more than once the last segment wins.
#[must_use]
pub fn decode(text: &str) -> CartLedger {
    let mut entries = Vec::new();

    for segment in text.split(ENTRY_SEPARATOR).filter(|s| !s.is_empty()) {
        let mut parts = segment.split(QUANTITY_SEPARATOR);
        let id = parts
            .next()
            .and_then(|raw| urlencoding::decode(raw).ok())
            .filter(|id| !id.is_empty());
        let quantity = parts
            .next()
            .and_then(parse_quantity)
            .and_then(positive_quantity);

        match (id, quantity) {
            (Some(id), Some(quantity)) => {
                entries.push((ProductId::new(id.into_owned()), quantity));
            }
            _ => debug!(segment, "Skipping malformed cart segment"),
        }
    }

    entries.into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ledger(pairs: &[(&str, u32)]) -> CartLedger {
        pairs
            .iter()
            .map(|&(id, q)| (ProductId::from(id), q))
            .collect()
    }

    #[test]
    fn test_encode_joins_pairs() {
        let l = ledger(&[("couscous", 2), ("brik", 1)]);
        assert_eq!(encode(&l), "brik:1,couscous:2");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&CartLedger::new()), "");
    }

    #[test]
    fn test_decode_recovers_encoded_ledger() {
        let l = ledger(&[("A", 2), ("B", 1), ("mloukhia-42", 13)]);
        assert_eq!(decode(&encode(&l)), l);
    }

    #[test]
    fn test_ids_with_separators_survive() {
        let l = ledger(&[("menu:7", 2), ("b,c", 1), ("50%-off", 4)]);
        let encoded = encode(&l);
        assert_eq!(encoded.matches(ENTRY_SEPARATOR).count(), 2);
        assert_eq!(encoded.matches(QUANTITY_SEPARATOR).count(), 3);
        assert_eq!(decode(&encoded), l);
    }

    #[test]
    fn test_decode_skips_badly_escaped_id() {
        assert_eq!(decode("%FF%FE:2,A:1"), ledger(&[("A", 1)]));
    }

    #[test]
    fn test_decode_skips_malformed_segments() {
        let l = decode("A:2,,B,C:x,:4,D:0,E:-1,F:3");
        assert_eq!(l, ledger(&[("A", 2), ("F", 3)]));
    }

    #[test]
    fn test_decode_leading_integer_quantity() {
        let l = decode("A:2abc,B:5:9");
        assert_eq!(l, ledger(&[("A", 2), ("B", 5)]));
    }

    #[test]
    fn test_decode_last_segment_wins() {
        assert_eq!(decode("A:2,A:7"), ledger(&[("A", 7)]));
    }

    #[test]
    fn test_decode_empty_text() {
        assert!(decode("").is_empty());
        assert!(decode(",,,").is_empty());
    }
}
