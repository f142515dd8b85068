pub mod client_registry;
pub mod idp_federator;
pub mod oauth_engine;
pub mod verifier;

pub use client_registry::ClientRegistry;
pub use idp_federator::{IdpFederator, UserProfile};
pub use oauth_engine::{AuthorizeOutcome, CallbackOutcome, ClientAuth, OAuthEngine};
pub use verifier::{verify_request, VerifiedIdentity};
