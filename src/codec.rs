//! Record codec
//!
//! Records travel as JSON text (`uuid`, `doc`, `hashes`, `hash`) framed in
//! standard padded base64 so the payload is safe for any byte-oriented
//! transport. [`encode`]/[`decode`] handle the JSON form; [`encode_payload`]
//! and [`decode_payload`] add the transport framing used on both stream
//! directions.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::errors::{RecordError, RecordResult};
use crate::models::Datum;

/// Serialize a record to its JSON form.
pub fn encode(datum: &Datum) -> RecordResult<Vec<u8>> {
    serde_json::to_vec(datum).map_err(RecordError::Serialization)
}

/// Deserialize a record from its JSON form.
///
/// `uuid`, `doc` and `hashes` are required; `hash` may be absent or null.
/// Unknown fields are ignored.
pub fn decode(bytes: &[u8]) -> RecordResult<Datum> {
    serde_json::from_slice(bytes).map_err(RecordError::malformed)
}

/// Serialize a record and frame it as base64 transport text.
pub fn encode_payload(datum: &Datum) -> RecordResult<Vec<u8>> {
    Ok(STANDARD.encode(encode(datum)?).into_bytes())
}

/// Decode a base64 transport payload into a record.
///
/// Surrounding ASCII whitespace is tolerated.
pub fn decode_payload(payload: &[u8]) -> RecordResult<Datum> {
    let json = STANDARD.decode(payload.trim_ascii())?;
    decode(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn decode_value(value: serde_json::Value) -> RecordResult<Datum> {
        decode(value.to_string().as_bytes())
    }

    #[test]
    fn test_encode_carries_all_four_fields() {
        let datum = Datum::new("id-1", "abc", 2);
        let value: serde_json::Value = serde_json::from_slice(&encode(&datum).unwrap()).unwrap();

        assert_eq!(
            value,
            json!({ "uuid": "id-1", "doc": "abc", "hashes": 2, "hash": null })
        );
    }

    #[test]
    fn test_absent_and_null_hash_decode_to_unset() {
        let absent = decode_value(json!({ "uuid": "a", "doc": "d", "hashes": 1 })).unwrap();
        let null = decode_value(json!({ "uuid": "a", "doc": "d", "hashes": 1, "hash": null }))
            .unwrap();

        assert_eq!(absent.digest(), None);
        assert_eq!(absent, null);
    }

    #[test]
    fn test_string_null_is_a_value_not_unset() {
        let datum =
            decode_value(json!({ "uuid": "a", "doc": "d", "hashes": 1, "hash": "null" })).unwrap();
        assert_eq!(datum.digest(), Some("null"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let datum = decode_value(json!({
            "uuid": "a", "doc": "d", "hashes": 1, "hash": "H", "extra": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(datum, Datum::with_digest("a", "d", 1, "H"));
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        let cases = [
            json!({ "doc": "d", "hashes": 1 }),
            json!({ "uuid": "a", "hashes": 1 }),
            json!({ "uuid": "a", "doc": "d" }),
            json!({ "uuid": "a", "doc": "d", "hashes": -1 }),
            json!({ "uuid": "a", "doc": "d", "hashes": 1.5 }),
            json!({ "uuid": "a", "doc": "d", "hashes": "1" }),
            json!({ "uuid": 7, "doc": "d", "hashes": 1 }),
            json!({ "uuid": "a", "doc": "d", "hashes": 1, "hash": 42 }),
            json!("just a string"),
        ];

        for case in cases {
            let result = decode_value(case.clone());
            assert!(
                matches!(result, Err(RecordError::Malformed { .. })),
                "expected malformed for {case}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_payload_framing() {
        let datum = Datum::with_digest("id-1", "abc", 1, "DIGEST");
        let payload = encode_payload(&datum).unwrap();

        assert!(payload.iter().all(|b| b.is_ascii()));
        assert_eq!(decode_payload(&payload).unwrap(), datum);

        let mut with_newline = payload.clone();
        with_newline.push(b'\n');
        assert_eq!(decode_payload(&with_newline).unwrap(), datum);
    }

    #[test]
    fn test_payload_errors_are_classified() {
        assert!(matches!(
            decode_payload(b"not base64!"),
            Err(RecordError::InvalidTransportEncoding(_))
        ));

        let not_json = STANDARD.encode("plain text").into_bytes();
        assert!(matches!(
            decode_payload(&not_json),
            Err(RecordError::Malformed { .. })
        ));

        let not_utf8 = STANDARD.encode([0xff, 0xfe, 0xfd]).into_bytes();
        assert!(matches!(
            decode_payload(&not_utf8),
            Err(RecordError::Malformed { .. })
        ));
    }

    proptest! {
        #[test]
        fn test_payload_round_trip(
            id in ".{0,40}",
            document in ".{0,200}",
            iterations in any::<u32>(),
            digest in proptest::option::of("[0-9A-F]{0,128}"),
        ) {
            let datum = match digest {
                Some(digest) => Datum::with_digest(id, document, iterations, digest),
                None => Datum::new(id, document, iterations),
            };
            prop_assert_eq!(decode(&encode(&datum).unwrap()).unwrap(), datum.clone());
            prop_assert_eq!(decode_payload(&encode_payload(&datum).unwrap()).unwrap(), datum);
        }
    }
}
