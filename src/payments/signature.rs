//! Notification signature (`VPSSignature`) verification
//!
//! The gateway signs each notification with an MD5 digest over a fixed,
//! ordered list of fields. Two of them never appear in the notification:
//! `Vendor` comes from our original request and `SecurityKey` from the
//! gateway's response when the transaction was registered.
//!
//! MD5 is mandated by the protocol and must not be swapped for a stronger
//! hash without breaking compatibility. It only protects against forged
//! notifications under the protocol's own weak-hash model; deployments that
//! need stronger guarantees should also restrict the notification endpoint
//! to the gateway's addresses.

use crate::payments::types::{FieldMap, TransactionRecord};

/// Fields hashed into `VPSSignature`, in signing order
pub const HASH_FIELDS: [&str; 17] = [
    "VPSTxId",
    "VendorTxCode",
    "Status",
    "TxAuthNo",
    "Vendor",
    "AVSCV2",
    "SecurityKey",
    "AddressResult",
    "PostCodeResult",
    "CV2Result",
    "GiftAid",
    "3DSecureStatus",
    "CAVV",
    "AddressStatus",
    "PayerStatus",
    "CardType",
    "Last4Digits",
];

pub const SIGNATURE_FIELD: &str = "VPSSignature";

/// Compute the expected signature, upper-case hex
pub fn compute_signature(request: &FieldMap, response: &FieldMap, notification: &FieldMap) -> String {
    let mut input = String::new();
    for field in HASH_FIELDS {
        let source = match field {
            "Vendor" => request,
            "SecurityKey" => response,
            _ => notification,
        };
        // Absent fields hash as the empty string
        if let Some(value) = source.get(field) {
            input.push_str(value);
        }
    }
    hex::encode_upper(md5::compute(input.as_bytes()).0)
}

/// Check a notification's `VPSSignature` against the stored transaction
pub fn is_valid_signature(record: &TransactionRecord, notification: &FieldMap) -> bool {
    let Some(provided) = notification.get(SIGNATURE_FIELD) else {
        return false;
    };
    let expected = compute_signature(record.request(), record.response(), notification);
    signatures_match(&expected, provided.trim())
}

/// Case-insensitive comparison that does not short-circuit on the first
/// differing byte
fn signatures_match(expected: &str, provided: &str) -> bool {
    if expected.len() != provided.len() {
        return false;
    }

    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0, |acc, (a, b)| {
            acc | (a.to_ascii_uppercase() ^ b.to_ascii_uppercase())
        })
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::ExtraData;

    const REFERENCE_SIGNATURE: &str = "1FDCC392F6ECF162DF6A4379CAC802CF";

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn record() -> TransactionRecord {
        TransactionRecord::new(
            "a1b2c3d4e5f60718293a4b5c6d7e8f90",
            fields(&[("Vendor", "testvendor"), ("Amount", "10.00")]),
            fields(&[("Status", "OK"), ("SecurityKey", "ZQ4KXC8R1N")]),
            ExtraData::default(),
        )
    }

    fn notification() -> FieldMap {
        fields(&[
            ("VPSProtocol", "2.23"),
            ("TxType", "PAYMENT"),
            ("VPSTxId", "{73A2E7A6-1F4E-4C3C-9D5B-8E1F2A3B4C5D}"),
            ("VendorTxCode", "a1b2c3d4e5f60718293a4b5c6d7e8f90"),
            ("Status", "OK"),
            ("StatusDetail", "0000 : The Authorisation was Successful."),
            ("TxAuthNo", "7349"),
            ("AVSCV2", "ALL MATCH"),
            ("AddressResult", "MATCHED"),
            ("PostCodeResult", "MATCHED"),
            ("CV2Result", "MATCHED"),
            ("GiftAid", "0"),
            ("3DSecureStatus", "OK"),
            ("CAVV", "AAABARR5kwAAAAAAAAAAAAAAAAA="),
            ("CardType", "VISA"),
            ("Last4Digits", "0006"),
            ("VPSSignature", REFERENCE_SIGNATURE),
        ])
    }

    #[test]
    fn test_compute_signature_matches_reference() {
        let rec = record();
        assert_eq!(
            compute_signature(rec.request(), rec.response(), &notification()),
            REFERENCE_SIGNATURE
        );
    }

    #[test]
    fn test_valid_signature() {
        assert!(is_valid_signature(&record(), &notification()));
    }

    #[test]
    fn test_signature_comparison_is_case_insensitive() {
        let mut data = notification();
        data.insert(
            "VPSSignature".to_string(),
            REFERENCE_SIGNATURE.to_lowercase(),
        );
        assert!(is_valid_signature(&record(), &data));
    }

    #[test]
    fn test_any_hashed_field_change_invalidates() {
        let rec = record();
        for field in HASH_FIELDS {
            if field == "Vendor" || field == "SecurityKey" {
                continue;
            }
            let mut data = notification();
            let altered = format!("{}x", data.get(field).cloned().unwrap_or_default());
            data.insert(field.to_string(), altered);
            assert!(
                !is_valid_signature(&rec, &data),
                "altering {} should invalidate the signature",
                field
            );
        }
    }

    #[test]
    fn test_vendor_and_security_key_come_from_record() {
        // Values injected into the notification are ignored
        let mut data = notification();
        data.insert("Vendor".to_string(), "attacker".to_string());
        data.insert("SecurityKey".to_string(), "guessed".to_string());
        assert!(is_valid_signature(&record(), &data));

        let tampered = TransactionRecord::new(
            "a1b2c3d4e5f60718293a4b5c6d7e8f90",
            fields(&[("Vendor", "testvendor")]),
            fields(&[("SecurityKey", "OTHERKEY00")]),
            ExtraData::default(),
        );
        assert!(!is_valid_signature(&tampered, &notification()));
    }

    #[test]
    fn test_missing_signature_is_invalid() {
        let mut data = notification();
        data.remove("VPSSignature");
        assert!(!is_valid_signature(&record(), &data));

        data.insert("VPSSignature".to_string(), String::new());
        assert!(!is_valid_signature(&record(), &data));
    }

    #[test]
    fn test_missing_fields_hash_as_empty() {
        let empty = FieldMap::new();
        // MD5 of the empty string
        assert_eq!(
            compute_signature(&empty, &empty, &empty),
            "D41D8CD98F00B204E9800998ECF8427E"
        );
    }
}
