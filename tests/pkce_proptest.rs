//! Property tests for the PKCE and redirect-URI-matching invariants that
//! the example-based tests in `oauth_flow_test.rs` only sample a few points
//! of.

use proptest::prelude::*;

use mcp_gateway_auth::models::Client;
use mcp_gateway_auth::utils::pkce::{compute_s256_challenge, validate_code_challenge, verify_pkce};

fn verifier_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._~-]{43,128}"
}

fn client_with_redirect_uris(uris: Vec<String>) -> Client {
    Client {
        client_id: "prop-test-client".to_string(),
        client_secret_hash: None,
        registration_access_token_hash: String::new(),
        redirect_uris: uris,
        client_name: None,
        client_uri: None,
        logo_uri: None,
        contacts: None,
        tos_uri: None,
        policy_uri: None,
        software_id: None,
        software_version: None,
        grant_types: vec!["authorization_code".to_string()],
        response_types: vec!["code".to_string()],
        token_endpoint_auth_method: "none".to_string(),
        created_at: 0,
        client_secret_expires_at: 0,
        extra: Default::default(),
    }
}

proptest! {
    /// Every verifier validates against its own S256 challenge.
    #[test]
    fn verifier_always_matches_its_own_challenge(verifier in verifier_strategy()) {
        let challenge = compute_s256_challenge(&verifier);
        prop_assert!(verify_pkce(&verifier, &challenge));
    }

    /// Two distinct verifiers never validate against the same challenge.
    #[test]
    fn distinct_verifiers_do_not_cross_validate(a in verifier_strategy(), b in verifier_strategy()) {
        prop_assume!(a != b);
        let challenge = compute_s256_challenge(&a);
        prop_assert!(!verify_pkce(&b, &challenge));
    }

    /// Any base64url string of length 43-128 is an acceptable code_challenge.
    #[test]
    fn code_challenge_accepts_the_full_43_to_128_range(len in 43usize..=128) {
        let challenge = "a".repeat(len);
        prop_assert!(validate_code_challenge(&challenge));
    }

    /// Lengths just outside the 43-128 range are always rejected.
    #[test]
    fn code_challenge_rejects_below_the_range(len in 1usize..43) {
        prop_assert!(!validate_code_challenge(&"a".repeat(len)));
    }

    #[test]
    fn code_challenge_rejects_above_the_range(len in 129usize..300) {
        prop_assert!(!validate_code_challenge(&"a".repeat(len)));
    }

    /// A registered redirect_uri always matches itself exactly.
    #[test]
    fn registered_redirect_uri_matches_itself(path in "[a-z/]{1,20}") {
        let uri = format!("https://client.example/{path}");
        let client = client_with_redirect_uris(vec![uri.clone()]);
        prop_assert!(client.has_redirect_uri(&uri));
    }

    /// Appending a single character to a registered redirect_uri must never
    /// match — prefix matching would let an attacker graft an open redirect
    /// onto a trusted path.
    #[test]
    fn redirect_uri_matching_rejects_suffix_extension(path in "[a-z/]{1,20}", extra in "[a-z]{1,5}") {
        let uri = format!("https://client.example/{path}");
        let client = client_with_redirect_uris(vec![uri.clone()]);
        prop_assert!(!client.has_redirect_uri(&format!("{uri}{extra}")));
    }
}
