pub mod authorization_code;
pub mod client;
pub mod flow_state;
pub mod refresh_token;
pub mod token;

pub use authorization_code::AuthorizationCode;
pub use client::Client;
pub use flow_state::FlowState;
pub use refresh_token::RefreshTokenRecord;
pub use token::{AccessClaims, TokenRecord, AUDIENCE};
