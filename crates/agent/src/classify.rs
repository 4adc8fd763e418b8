//! Scope filter and strategy choice for intercepted requests.

use obx_core::url::same_origin;
use obx_core::{Request, RequestMode};
use url::Url;

/// What to do with an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not ours: let the request go to the network untouched.
    OutOfScope,
    /// Top-level page load, served network-first.
    Navigation,
    /// Any other same-origin GET, served stale-while-revalidate.
    Asset,
}

/// Decides scope and strategy from method, origin and mode alone.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    origin: Url,
}

impl RequestClassifier {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn classify(&self, request: &Request) -> Classification {
        if request.method != "GET" || !same_origin(&request.url, &self.origin) {
            return Classification::OutOfScope;
        }

        match request.mode {
            RequestMode::Navigate => Classification::Navigation,
            _ => Classification::Asset,
        }
    }
}
