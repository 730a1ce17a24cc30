//! HTTP middleware: Basic authentication, permit rules, request tracking

pub mod basic_auth;
pub mod request_tracking;
pub mod route_matcher;

pub use basic_auth::{basic_header_value, extract_basic_credentials, BasicAuth};
pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer, REQUEST_ID_HEADER,
    SENSITIVE_HEADERS,
};
pub use route_matcher::AccessRules;
