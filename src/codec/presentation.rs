// src/codec/presentation.rs
//! Presentation codec: compact QR payloads and extended metadata blobs.
//!
//! Pure data transformation, no I/O. Encoding is canonical JSON (object keys
//! sorted, no insignificant whitespace), so encoding the same presentation
//! always yields the same bytes. Decoding never panics on hostile input: it
//! distinguishes unreadable bytes (`MalformedPayload`) from readable JSON of
//! the wrong shape (`SchemaViolation`).

use crate::errors::PresentationError;
use crate::models::presentation::{CompactPresentation, ExtendedPresentation};
use crate::utils::crypto::{digest_hex, format_address};
use ethers_core::types::Address;
use serde_json::{json, Map, Value};
use std::str::FromStr;

const CONTENT_REF: &str = "contentRef";
const SIGNATURE: &str = "signature";
const ISSUER_IDENTITY: &str = "issuerIdentity";
const CREDENTIAL_ID: &str = "credentialId";
const HOLDER_IDENTITY: &str = "holderIdentity";
const TIMESTAMP: &str = "timestamp";

/// Serializes a compact presentation to canonical JSON bytes.
pub fn encode(presentation: &CompactPresentation) -> Vec<u8> {
    let mut object = Map::new();
    object.insert(CONTENT_REF.into(), json!(presentation.content_ref));
    object.insert(SIGNATURE.into(), json!(presentation.signature));
    object.insert(
        ISSUER_IDENTITY.into(),
        json!(format_address(&presentation.issuer_identity)),
    );
    object.insert(CREDENTIAL_ID.into(), json!(presentation.credential_id));
    object.insert(
        HOLDER_IDENTITY.into(),
        json!(format_address(&presentation.holder_identity)),
    );
    if let Some(timestamp) = presentation.timestamp {
        object.insert(TIMESTAMP.into(), json!(timestamp));
    }
    Value::Object(object).to_string().into_bytes()
}

/// Parses a compact presentation.
///
/// # Errors
/// - `MalformedPayload` if the bytes are empty, not UTF-8 JSON, or not a
///   JSON object
/// - `SchemaViolation` if a required field is missing, has the wrong JSON
///   type, is an empty string, or is not a valid identity / non-negative id
pub fn decode(bytes: &[u8]) -> Result<CompactPresentation, PresentationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(PresentationError::MalformedPayload("empty payload".into()));
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PresentationError::MalformedPayload(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| PresentationError::MalformedPayload("expected a JSON object".into()))?;
    parse_fields(object)
}

/// Convenience wrapper for payloads scanned as text.
pub fn decode_str(payload: &str) -> Result<CompactPresentation, PresentationError> {
    decode(payload.as_bytes())
}

/// Cheap predicate: is `value` plausibly a compact presentation?
///
/// Applies exactly the field checks of [`decode`], without building the
/// result, so a scanner can discard foreign QR codes early.
pub fn validate_shape(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |object| parse_fields(object).is_ok())
}

fn parse_fields(object: &Map<String, Value>) -> Result<CompactPresentation, PresentationError> {
    let content_ref = non_empty_string(object, CONTENT_REF)?;
    let signature = non_empty_string(object, SIGNATURE)?;
    let issuer_identity = identity(object, ISSUER_IDENTITY)?;
    let holder_identity = identity(object, HOLDER_IDENTITY)?;

    let credential_id = match object.get(CREDENTIAL_ID) {
        None => return Err(missing(CREDENTIAL_ID)),
        Some(value) => value.as_u64().ok_or_else(|| PresentationError::SchemaViolation {
            field: CREDENTIAL_ID,
            reason: format!("expected a non-negative integer, got {}", value),
        })?,
    };

    let timestamp = match object.get(TIMESTAMP) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_u64().ok_or_else(|| PresentationError::SchemaViolation {
            field: TIMESTAMP,
            reason: format!("expected a non-negative integer, got {}", value),
        })?),
    };

    Ok(CompactPresentation {
        content_ref,
        signature,
        issuer_identity,
        credential_id,
        holder_identity,
        timestamp,
    })
}

fn missing(field: &'static str) -> PresentationError {
    PresentationError::SchemaViolation {
        field,
        reason: "required field is missing".into(),
    }
}

fn non_empty_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, PresentationError> {
    match object.get(field) {
        None => Err(missing(field)),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(PresentationError::SchemaViolation {
            field,
            reason: "must not be empty".into(),
        }),
        Some(other) => Err(PresentationError::SchemaViolation {
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn identity(object: &Map<String, Value>, field: &'static str) -> Result<Address, PresentationError> {
    let raw = non_empty_string(object, field)?;
    let bare = raw.strip_prefix("0x").unwrap_or(&raw);
    Address::from_str(bare).map_err(|e| PresentationError::SchemaViolation {
        field,
        reason: format!("not an account address: {}", e),
    })
}

/// Serializes extended metadata to canonical JSON bytes.
///
/// These are the exact bytes pinned to the content store and covered by the
/// issuer's signature.
pub fn encode_extended(metadata: &ExtendedPresentation) -> Result<Vec<u8>, PresentationError> {
    // Round-tripping through `Value` sorts object keys
    let value = serde_json::to_value(metadata)
        .map_err(|e| PresentationError::MalformedPayload(e.to_string()))?;
    Ok(value.to_string().into_bytes())
}

/// Parses extended metadata fetched from the content store.
pub fn decode_extended(bytes: &[u8]) -> Result<ExtendedPresentation, PresentationError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PresentationError::MalformedPayload(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| PresentationError::SchemaViolation {
        field: "extendedMetadata",
        reason: e.to_string(),
    })
}

/// Canonical bytes the issuer signs for a presentation.
///
/// Binds every compact field except the signature itself, plus the digest
/// of the extended metadata, so neither half can be swapped independently.
pub fn signing_payload(presentation: &CompactPresentation, metadata: &[u8]) -> Vec<u8> {
    json!({
        CONTENT_REF: presentation.content_ref,
        CREDENTIAL_ID: presentation.credential_id,
        HOLDER_IDENTITY: format_address(&presentation.holder_identity),
        ISSUER_IDENTITY: format_address(&presentation.issuer_identity),
        "metadataDigest": digest_hex(metadata),
        TIMESTAMP: presentation.timestamp,
    })
    .to_string()
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::presentation::CredentialSnapshot;
    use proptest::prelude::*;

    fn sample() -> CompactPresentation {
        CompactPresentation {
            content_ref: "0xabc123".into(),
            signature: "0xdeadbeef".into(),
            issuer_identity: Address::repeat_byte(0xa1),
            credential_id: 7,
            holder_identity: Address::repeat_byte(0x40),
            timestamp: Some(1_700_000_000),
        }
    }

    fn sample_json() -> Value {
        serde_json::from_slice(&encode(&sample())).unwrap()
    }

    fn assert_schema_violation(bytes: &[u8], expected_field: &str) {
        match decode(bytes) {
            Err(PresentationError::SchemaViolation { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected schema violation on {}, got {:?}", expected_field, other),
        }
    }

    #[test]
    fn test_encode_is_canonical() {
        let encoded = String::from_utf8(encode(&sample())).unwrap();
        assert_eq!(
            encoded,
            format!(
                "{{\"contentRef\":\"0xabc123\",\"credentialId\":7,\"holderIdentity\":\"0x{}\",\
                 \"issuerIdentity\":\"0x{}\",\"signature\":\"0xdeadbeef\",\"timestamp\":1700000000}}",
                "40".repeat(20),
                "a1".repeat(20)
            )
        );
        assert_eq!(encode(&sample()), encode(&sample().clone()));
    }

    #[test]
    fn test_timestamp_is_optional() {
        let mut presentation = sample();
        presentation.timestamp = None;
        let encoded = encode(&presentation);

        assert!(!String::from_utf8(encoded.clone()).unwrap().contains("timestamp"));
        assert_eq!(decode(&encoded).unwrap(), presentation);

        let mut with_null = sample_json();
        with_null[TIMESTAMP] = Value::Null;
        assert_eq!(decode(with_null.to_string().as_bytes()).unwrap().timestamp, None);
    }

    #[test]
    fn test_decode_accepts_checksummed_addresses() {
        let mut value = sample_json();
        value[ISSUER_IDENTITY] = json!("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
        let decoded = decode(value.to_string().as_bytes()).unwrap();
        assert_eq!(
            format_address(&decoded.issuer_identity),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_malformed_payloads() {
        let encoded = encode(&sample());
        let truncated = &encoded[..encoded.len() / 2];
        let cases: [&[u8]; 8] = [b"", b"   ", b"{", b"not json", truncated, &[0xff, 0xfe, 0x00], b"[1,2]", b"42"];
        for bytes in cases {
            assert!(
                matches!(decode(bytes), Err(PresentationError::MalformedPayload(_))),
                "expected malformed for {:?}",
                bytes
            );
        }
    }

    #[test]
    fn test_missing_required_fields() {
        for field in [CONTENT_REF, SIGNATURE, ISSUER_IDENTITY, CREDENTIAL_ID, HOLDER_IDENTITY] {
            let mut value = sample_json();
            value.as_object_mut().unwrap().remove(field);
            assert_schema_violation(value.to_string().as_bytes(), field);
            assert!(!validate_shape(&value));
        }
    }

    #[test]
    fn test_wrong_field_shapes() {
        let cases = [
            (CONTENT_REF, json!("")),
            (SIGNATURE, json!(12)),
            (ISSUER_IDENTITY, json!("0x1234")),
            (HOLDER_IDENTITY, json!("not-an-address-at-all-not-an-address-at")),
            (CREDENTIAL_ID, json!(-1)),
            (CREDENTIAL_ID, json!(1.5)),
            (CREDENTIAL_ID, json!("7")),
            (TIMESTAMP, json!("yesterday")),
        ];
        for (field, bad) in cases {
            let mut value = sample_json();
            value[field] = bad;
            assert_schema_violation(value.to_string().as_bytes(), field);
            assert!(!validate_shape(&value));
        }
    }

    #[test]
    fn test_validate_shape() {
        assert!(validate_shape(&sample_json()));
        assert!(!validate_shape(&json!("https://example.com")));
        assert!(!validate_shape(&json!({})));
        assert!(!validate_shape(&Value::Null));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut value = sample_json();
        value["extra"] = json!({"nested": true});
        assert_eq!(decode(value.to_string().as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_extended_round_trip_and_errors() {
        let metadata = ExtendedPresentation {
            credential_snapshot: CredentialSnapshot {
                id: 7,
                credential_type: "Degree".into(),
                subject: "BSc".into(),
                recipient: Address::repeat_byte(0x40),
                recipient_name: "Hana".into(),
                issuer: Address::repeat_byte(0xa1),
                issuer_name: "Acme U".into(),
                issued_at: 1,
                valid_until: 0,
                additional_data: json!({"gpa": "3.9"}),
            },
            presentation_id: "urn:uuid:1".into(),
            created_at: 2,
            purpose: "screening".into(),
            verification_method: "EcdsaSecp256k1RecoverySignature".into(),
            challenge: None,
            domain: Some("verifier.example".into()),
        };
        let bytes = encode_extended(&metadata).unwrap();
        assert_eq!(bytes, encode_extended(&metadata).unwrap());
        assert_eq!(decode_extended(&bytes).unwrap(), metadata);

        assert!(matches!(
            decode_extended(b"garbage"),
            Err(PresentationError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode_extended(b"{\"purpose\":\"x\"}"),
            Err(PresentationError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_signing_payload_binds_metadata_and_fields() {
        let base = signing_payload(&sample(), b"metadata");
        assert_eq!(base, signing_payload(&sample(), b"metadata"));
        assert_ne!(base, signing_payload(&sample(), b"other metadata"));

        let mut other_holder = sample();
        other_holder.holder_identity = Address::repeat_byte(0x41);
        assert_ne!(base, signing_payload(&other_holder, b"metadata"));

        // The signature itself is not part of what is signed
        let mut resigned = sample();
        resigned.signature = "0x00".into();
        assert_eq!(base, signing_payload(&resigned, b"metadata"));
    }

    fn arb_presentation() -> impl Strategy<Value = CompactPresentation> {
        (
            "[a-zA-Z0-9]{1,64}",
            "0x[0-9a-f]{2,130}",
            any::<[u8; 20]>(),
            any::<u64>(),
            any::<[u8; 20]>(),
            proptest::option::of(any::<u64>()),
        )
            .prop_map(|(content_ref, signature, issuer, id, holder, timestamp)| {
                CompactPresentation {
                    content_ref,
                    signature,
                    issuer_identity: Address::from(issuer),
                    credential_id: id,
                    holder_identity: Address::from(holder),
                    timestamp,
                }
            })
    }

    proptest! {
        /// decode(encode(x)) == x for every well-formed presentation.
        #[test]
        fn decode_inverts_encode(presentation in arb_presentation()) {
            prop_assert_eq!(decode(&encode(&presentation)).unwrap(), presentation);
        }

        /// Arbitrary bytes never panic the decoder.
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&bytes);
        }
    }
}
