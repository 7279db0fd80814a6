//! Golden test vectors for deterministic verification.
//!
//! Each vector pins the exact canonical bytes of a small record, so any
//! producer or verifier can check that it hashes and signs the same bytes.

use serde_json::Value;

use chorus_core::{canonical_bytes, content_address, Blake3Hash};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The record, as JSON text in arbitrary key order.
    pub record: &'static str,
    /// Expected canonical bytes (hex).
    pub expected_canonical: &'static str,
}

impl GoldenVector {
    /// Parse the vector's record.
    pub fn record(&self) -> Value {
        serde_json::from_str(self.record).unwrap_or(Value::Null)
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "minimal person",
            record: r#"{"@type":"Person","name":"A"}"#,
            // "name" (4 bytes) sorts before "@type" (5 bytes)
            expected_canonical: "a2646e616d65614165407479706566506572736f6e",
        },
        GoldenVector {
            name: "album with links",
            record: r#"{"@context":"http://schema.org","@type":"MusicAlbum","name":"Kind of Blue","byArtist":{"@id":"1111111111111111111111111111111111111111111111111111111111111111"},"publisher":{"@id":"2222222222222222222222222222222222222222222222222222222222222222"}}"#,
            expected_canonical: concat!(
                "a5646e616d656c4b696e64206f6620426c75656540747970656a4d7573696341",
                "6c62756d6840636f6e7465787471687474703a2f2f736368656d612e6f726768",
                "6279417274697374a16340696478403131313131313131313131313131313131",
                "3131313131313131313131313131313131313131313131313131313131313131",
                "313131313131313131313131313131697075626c6973686572a1634069647840",
                "3232323232323232323232323232323232323232323232323232323232323232",
                "3232323232323232323232323232323232323232323232323232323232323232"
            ),
        },
        GoldenVector {
            name: "integers, booleans and null",
            record: r#"{"usage":null,"count":500,"offset":-25,"flags":[true,false]}"#,
            expected_canonical: "a465636f756e741901f465666c61677382f5f4657573616765f6666f66667365743818",
        },
        GoldenVector {
            name: "non-ascii text",
            record: r#"{"name":"Sigur Rós"}"#,
            expected_canonical: "a1646e616d656a53696775722052c3b373",
        },
        GoldenVector {
            name: "nested arrays keep order",
            record: r#"{"territory":["US","GB","JP"],"member":[{"@id":"abababababababababababababababababababababababababababababababab"}]}"#,
            expected_canonical: concat!(
                "a2666d656d62657281a163406964784061626162616261626162616261626162",
                "6162616261626162616261626162616261626162616261626162616261626162",
                "61626162616261626162616261626162616261626162697465727269746f7279",
                "83625553624742624a50"
            ),
        },
    ]
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches, actual canonical hex, content address hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let record = v.record();
            let hex = canonical_bytes(&record).map(hex::encode).unwrap_or_default();
            let id = content_address(&record)
                .map(|id| id.to_hex())
                .unwrap_or_default();
            (v.name.to_string(), hex == v.expected_canonical, hex, id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_match() {
        for (name, matches, actual, _) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {actual}");
        }
    }

    #[test]
    fn test_vector_records_parse() {
        for vector in all_vectors() {
            assert!(vector.record().is_object(), "vector '{}'", vector.name);
        }
    }

    #[test]
    fn test_content_address_is_hash_of_vector_bytes() {
        for vector in all_vectors() {
            let bytes = hex::decode(vector.expected_canonical).unwrap();
            let id = content_address(&vector.record()).unwrap();
            assert_eq!(id.0, Blake3Hash::hash(&bytes).0, "vector '{}'", vector.name);
        }
    }
}
