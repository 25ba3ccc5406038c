//! Built-in catalog of known OAuth services
//!
//! Maps a canonical service name to its protocol and handshake endpoints.
//! Configuration can add services or override the built-in endpoints.

use crate::model::{ProtocolVersion, ProviderEndpoints};
use crate::registry::canonical_name;
use std::collections::HashMap;

/// Known services and their endpoints
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: HashMap<String, ProviderEndpoints>,
}

impl ServiceCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the built-in services
    pub fn builtin() -> Self {
        let mut catalog = Self::new();

        catalog.insert("twitter", oauth1(
            "https://api.twitter.com/oauth/request_token",
            "https://api.twitter.com/oauth/authenticate",
            "https://api.twitter.com/oauth/access_token",
            &[],
        ));
        catalog.insert("bitbucket", oauth1(
            "https://bitbucket.org/api/1.0/oauth/request_token",
            "https://bitbucket.org/api/1.0/oauth/authenticate",
            "https://bitbucket.org/api/1.0/oauth/access_token",
            &[],
        ));
        catalog.insert("etsy", oauth1(
            "https://openapi.etsy.com/v2/oauth/request_token",
            "https://www.etsy.com/oauth/signin",
            "https://openapi.etsy.com/v2/oauth/access_token",
            &[],
        ));
        // Flickr only grants write/delete access when asked for explicitly
        catalog.insert("flickr", oauth1(
            "https://www.flickr.com/services/oauth/request_token",
            "https://www.flickr.com/services/oauth/authorize",
            "https://www.flickr.com/services/oauth/access_token",
            &[("perms", "delete")],
        ));
        catalog.insert("github", oauth2(
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
        ));
        catalog.insert("google", oauth2(
            "https://accounts.google.com/o/oauth2/auth",
            "https://accounts.google.com/o/oauth2/token",
        ));
        catalog.insert("facebook", oauth2(
            "https://www.facebook.com/dialog/oauth",
            "https://graph.facebook.com/oauth/access_token",
        ));
        catalog.insert("dropbox", oauth2(
            "https://www.dropbox.com/1/oauth2/authorize",
            "https://api.dropbox.com/1/oauth2/token",
        ));

        catalog
    }

    /// Add or replace a service
    pub fn insert(&mut self, name: &str, endpoints: ProviderEndpoints) {
        self.services.insert(canonical_name(name), endpoints);
    }

    /// Look up a service by any case variant of its name
    pub fn lookup(&self, name: &str) -> Option<&ProviderEndpoints> {
        self.services.get(&canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

fn oauth1(
    request_token_url: &str,
    authorization_url: &str,
    access_token_url: &str,
    extra: &[(&str, &str)],
) -> ProviderEndpoints {
    ProviderEndpoints {
        protocol: ProtocolVersion::OAuth1,
        request_token_url: Some(request_token_url.to_string()),
        authorization_url: authorization_url.to_string(),
        access_token_url: access_token_url.to_string(),
        authorization_params: extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn oauth2(authorization_url: &str, access_token_url: &str) -> ProviderEndpoints {
    ProviderEndpoints {
        protocol: ProtocolVersion::OAuth2,
        request_token_url: None,
        authorization_url: authorization_url.to_string(),
        access_token_url: access_token_url.to_string(),
        authorization_params: Vec::new(),
    }
}
