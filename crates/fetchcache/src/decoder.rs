//! # Decoder
//!
//! Turns the resolved bytes into whatever in-memory representation the
//! caller needs. Decoding is supplied by the caller; failures are opaque to
//! the fetcher and are reported as [`FetchError::Decode`](crate::FetchError::Decode).

use bytes::Bytes;

use crate::error::BoxError;

pub trait Decoder: Send + Sync + 'static {
    /// The decoded representation
    type Output: Send + 'static;

    fn decode(&self, bytes: Bytes) -> Result<Self::Output, BoxError>;
}

impl<F, T, E> Decoder for F
where
    F: Fn(Bytes) -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Into<BoxError>,
{
    type Output = T;

    fn decode(&self, bytes: Bytes) -> Result<T, BoxError> {
        self(bytes).map_err(Into::into)
    }
}

/// Decoder that hands the bytes back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    type Output = Bytes;

    fn decode(&self, bytes: Bytes) -> Result<Bytes, BoxError> {
        Ok(bytes)
    }
}
