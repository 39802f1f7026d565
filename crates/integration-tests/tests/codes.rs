//! Integration tests for shareable slugs and tracking codes.

use std::collections::HashSet;

use gomflow_core::types::code::{CODE_LENGTH, SLUG_ALPHABET, TRACKING_ALPHABET, TRACKING_PREFIX};
use gomflow_core::{ShareableSlug, TrackingCode};

#[test]
fn test_generated_slugs_have_length_and_alphabet() {
    let mut rng = rand::rng();
    for _ in 0..500 {
        let slug = ShareableSlug::generate(&mut rng);
        assert_eq!(slug.as_str().len(), CODE_LENGTH);
        assert!(slug.as_str().bytes().all(|b| SLUG_ALPHABET.contains(&b)));
        assert_eq!(ShareableSlug::parse(slug.as_str()).ok(), Some(slug));
    }
}

#[test]
fn test_generated_tracking_codes_have_prefix_length_and_alphabet() {
    let mut rng = rand::rng();
    for _ in 0..500 {
        let code = TrackingCode::generate(&mut rng);
        assert_eq!(code.as_str().len(), TrackingCode::LENGTH);
        let body = code.as_str().strip_prefix(TRACKING_PREFIX);
        assert!(body.is_some_and(|b| b.bytes().all(|c| TRACKING_ALPHABET.contains(&c))));
    }
}

#[test]
fn test_tracking_code_input_is_case_insensitive() {
    let code = TrackingCode::generate(&mut rand::rng());
    let typed = format!("  {}  ", code.as_str().to_ascii_lowercase());
    assert_eq!(TrackingCode::parse(&typed).ok(), Some(code));
}

#[test]
fn test_generated_codes_rarely_repeat() {
    let mut rng = rand::rng();
    let codes: HashSet<_> = (0..1000)
        .map(|_| TrackingCode::generate(&mut rng))
        .collect();
    // 36^8 possibilities; a repeat in 1000 draws is vanishingly unlikely
    assert!(codes.len() > 995);
}
