pub mod signer;

pub use signer::{
    authorization_header, rfc1123_timestamp, sign, sign_request, sign_request_at, signature,
    signing_string, Method, SignedRequest,
};
