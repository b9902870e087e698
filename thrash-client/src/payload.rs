//! Incidental payload synthesis for creation calls

use base64::Engine as _;
use rand::Rng;
use serde_json::{json, Value as JsonValue};

/// Length of generated object names
const NAME_LEN: usize = 8;
/// Length of the random blob stuffed into each object
const BLOB_LEN: usize = 4096;

/// Return a string of random lowercase letters
pub fn random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| rng.random_range(b'a'..=b'z') as char)
        .collect()
}

/// Generate a Secret-shaped object with a random name and a base64 blob,
/// labeled so generated objects can be swept up afterwards
pub fn secret(namespace: &str) -> JsonValue {
    let blob = base64::engine::general_purpose::STANDARD.encode(random_string(BLOB_LEN));
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "labels": { "generated": "true" },
            "name": random_string(NAME_LEN),
            "namespace": namespace,
        },
        "type": "Opaque",
        "data": { "helloworld": blob },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_is_lowercase_ascii() {
        let s = random_string(64);
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn secret_is_well_formed() {
        let obj = secret("loadtest");
        assert_eq!(obj["kind"], "Secret");
        assert_eq!(obj["metadata"]["namespace"], "loadtest");
        assert_eq!(obj["metadata"]["name"].as_str().unwrap().len(), NAME_LEN);
        assert!(obj["data"]["helloworld"].as_str().unwrap().len() > BLOB_LEN);
    }

    #[test]
    fn names_are_not_repeated() {
        // Two draws colliding would mean the generator is broken, not unlucky.
        assert_ne!(random_string(NAME_LEN), random_string(NAME_LEN));
    }
}
