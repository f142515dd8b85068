pub mod discovery;
pub mod oauth;
pub mod register;

pub use discovery::DiscoveryDocument;
pub use oauth::{
    AuthorizationRequest, IntrospectRequest, IntrospectResponse, RevokeRequest, TokenRequest,
    TokenResponse,
};
pub use register::{ClientMetadata, ClientRegistrationResponse};
