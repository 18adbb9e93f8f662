//! Registry Module
//!
//! Container registry availability checks over the distribution API.

mod challenge;
mod client;
mod reference;
mod transport;

pub use challenge::AuthChallenge;
pub use client::{RegistryClient, DEFAULT_TAG, MANIFEST_MEDIA_TYPES};
pub use reference::{ImageReference, DEFAULT_REGISTRY};
pub use transport::{
    ClientOptions, HttpTransport, Method, ReqwestTransport, TransportRequest, TransportResponse,
    DEFAULT_TIMEOUT, MAX_BODY_BYTES,
};
