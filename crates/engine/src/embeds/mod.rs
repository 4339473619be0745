// ABOUTME: Third-party embed handling: canonicalization, facade placeholders, and the payload codec.
// ABOUTME: The kinds module is the single source of the placeholder naming contract.

pub mod codec;
pub mod facade;
pub mod kinds;
pub mod normalize;

pub use codec::{decode_payload, encode_payload, CodecError};
pub use kinds::{FacadeKind, Loader, Trigger};
