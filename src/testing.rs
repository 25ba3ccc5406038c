//! Test doubles and on-disk fixtures
//!
//! Shared by unit tests and the integration tests in `tests/`:
//! - [`ScriptedFactory`] / [`ScriptedService`]: providers that answer the
//!   handshake and API calls from a script instead of the network
//! - [`VersionFixture`]: a throwaway versions directory with installed tags
//! - [`zip_archive`]: in-memory archives shaped like source-host zipballs

use crate::model::{
    AccessToken, ApiRequest, ApiResponse, ProtocolVersion, ProviderDescriptor, RequestToken,
};
use crate::provider::{
    AuthenticatedTransport, Capability, OAuth1Service, OAuth2Service, ProviderService,
    ServiceFactory,
};
use crate::version::{VersionLayout, VersionTag};
use crate::{ConsoleError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Behaviour shared by every service a [`ScriptedFactory`] creates
#[derive(Debug, Clone)]
pub struct Script {
    pub request_token: RequestToken,
    pub access_token: AccessToken,
    pub fail_request_token: bool,
    pub fail_exchange: bool,
    pub response: ApiResponse,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            request_token: RequestToken {
                token: "request-token".to_string(),
                secret: "request-secret".to_string(),
            },
            access_token: AccessToken::with_secret("access-token", "access-secret"),
            fail_request_token: false,
            fail_exchange: false,
            response: ApiResponse {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: Bytes::from_static(br#"{"ok":true}"#),
            },
        }
    }
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    requests: Mutex<Vec<(String, ApiRequest)>>,
    exchanges: AtomicUsize,
    created: AtomicUsize,
}

/// Factory producing [`ScriptedService`]s that share one script
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    shared: Arc<Shared>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the script seen by every service
    pub fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.shared.script.lock());
    }

    /// Respond to API calls with `status` and `body`
    pub fn respond_with(&self, status: u16, content_type: Option<&str>, body: &[u8]) {
        self.script(|s| {
            s.response = ApiResponse {
                status,
                content_type: content_type.map(|c| c.to_string()),
                body: Bytes::copy_from_slice(body),
            }
        });
    }

    /// API calls received so far, tagged with the provider name
    pub fn requests(&self) -> Vec<(String, ApiRequest)> {
        self.shared.requests.lock().clone()
    }

    /// Number of successful token exchanges
    pub fn exchanges(&self) -> usize {
        self.shared.exchanges.load(Ordering::SeqCst)
    }

    /// Number of services created
    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }
}

impl ServiceFactory for ScriptedFactory {
    fn create(
        &self,
        descriptor: Arc<ProviderDescriptor>,
        redirect_uri: &str,
    ) -> Result<Arc<dyn ProviderService>> {
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedService {
            descriptor,
            redirect_uri: redirect_uri.to_string(),
            shared: self.shared.clone(),
        }))
    }
}

/// Provider answering from a [`Script`]
pub struct ScriptedService {
    descriptor: Arc<ProviderDescriptor>,
    redirect_uri: String,
    shared: Arc<Shared>,
}

impl ScriptedService {
    fn exchange(&self) -> Result<AccessToken> {
        let script = self.shared.script.lock();
        if script.fail_exchange {
            return Err(ConsoleError::authorization(
                &self.descriptor.name,
                "scripted exchange failure",
            ));
        }
        self.shared.exchanges.fetch_add(1, Ordering::SeqCst);
        Ok(script.access_token.clone())
    }

    fn authorize_url(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut url = url::Url::parse(&self.descriptor.endpoints.authorization_url)
            .map_err(|e| ConsoleError::config(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            for (k, v) in &self.descriptor.endpoints.authorization_params {
                query.append_pair(k, v);
            }
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl OAuth1Service for ScriptedService {
    async fn request_request_token(&self) -> Result<RequestToken> {
        let script = self.shared.script.lock();
        if script.fail_request_token {
            return Err(ConsoleError::upstream("scripted request token failure"));
        }
        Ok(script.request_token.clone())
    }

    fn authorization_url(&self, request_token: &str) -> Result<String> {
        self.authorize_url(&[("oauth_token", request_token)])
    }

    async fn request_access_token(
        &self,
        _request_token: &RequestToken,
        _verifier: &str,
    ) -> Result<AccessToken> {
        self.exchange()
    }
}

#[async_trait]
impl OAuth2Service for ScriptedService {
    fn authorization_url(&self, csrf_state: &str) -> Result<String> {
        let scopes = self.descriptor.scopes.join(" ");
        self.authorize_url(&[
            ("client_id", self.descriptor.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", scopes.as_str()),
            ("state", csrf_state),
        ])
    }

    async fn request_access_token(&self, _code: &str) -> Result<AccessToken> {
        self.exchange()
    }
}

#[async_trait]
impl AuthenticatedTransport for ScriptedService {
    async fn send(&self, _token: &AccessToken, request: &ApiRequest) -> Result<ApiResponse> {
        self.shared
            .requests
            .lock()
            .push((self.descriptor.name.clone(), request.clone()));
        Ok(self.shared.script.lock().response.clone())
    }
}

impl ProviderService for ScriptedService {
    fn capability(&self) -> Capability<'_> {
        match self.descriptor.protocol_version {
            ProtocolVersion::OAuth1 => Capability::OAuth1(self),
            ProtocolVersion::OAuth2 => Capability::OAuth2(self),
        }
    }
}

/// Temporary versions directory with installed tags
pub struct VersionFixture {
    _temp_dir: TempDir,
    layout: VersionLayout,
}

impl VersionFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let layout = VersionLayout::new(temp_dir.path().join("versions"));
        std::fs::create_dir_all(layout.releases_dir())?;
        Ok(Self {
            _temp_dir: temp_dir,
            layout,
        })
    }

    /// Fixture with each tag installed and holding a marker file
    pub fn with_versions(tags: &[&str]) -> Result<Self> {
        let fixture = Self::new()?;
        for tag in tags {
            fixture.install(tag, &[("README.md", tag.as_bytes())])?;
        }
        Ok(fixture)
    }

    pub fn layout(&self) -> &VersionLayout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Create `releases/<tag>` with the given files
    pub fn install(&self, tag: &str, files: &[(&str, &[u8])]) -> Result<()> {
        let tag = VersionTag::parse(tag)?;
        let dir = self.layout.release_dir(&tag);
        std::fs::create_dir_all(&dir)?;
        for (name, contents) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Read a file from an installed version
    pub fn read(&self, tag: &str, file: &str) -> Result<Vec<u8>> {
        let tag = VersionTag::parse(tag)?;
        Ok(std::fs::read(self.layout.release_dir(&tag).join(file))?)
    }
}

/// Build a zip archive whose entries all live under `top_dir/`
pub fn zip_archive(top_dir: &str, files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        writer
            .add_directory(format!("{}/", top_dir), options)
            .map_err(|e| ConsoleError::Other(e.into()))?;
        for (name, contents) in files {
            writer
                .start_file(format!("{}/{}", top_dir, name), options)
                .map_err(|e| ConsoleError::Other(e.into()))?;
            writer.write_all(contents)?;
        }
        writer.finish().map_err(|e| ConsoleError::Other(e.into()))?;
    }
    Ok(buffer.into_inner())
}
