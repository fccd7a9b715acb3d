//! # Resource Request
//!
//! The immutable description of a resource to resolve. Two requests are the
//! same resource when their identifier and scale match; headers only shape
//! the outgoing HTTP request and take no part in identity.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::cache::CacheKey;
use crate::error::FetchError;

#[derive(Debug, Clone)]
pub struct ResourceRequest {
    identifier: String,
    scale: f64,
    headers: BTreeMap<String, String>,
}

impl ResourceRequest {
    /// Request for `identifier` at scale 1.0 with no extra headers.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            scale: 1.0,
            headers: BTreeMap::new(),
        }
    }

    /// Set the scale; it must be finite and strictly positive.
    pub fn with_scale(mut self, scale: f64) -> Result<Self, FetchError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(FetchError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Add a header sent with the network request for this resource.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Disk cache key for this request. Derived from the identifier alone.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_identifier(&self.identifier)
    }

    /// Convert the request headers into a [`HeaderMap`].
    pub fn header_map(&self) -> Result<HeaderMap, FetchError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(format!("name '{name}'")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidHeader(format!("value for '{name}'")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl PartialEq for ResourceRequest {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.scale.to_bits() == other.scale.to_bits()
    }
}

impl Eq for ResourceRequest {}

impl Hash for ResourceRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.scale.to_bits().hash(state);
    }
}
