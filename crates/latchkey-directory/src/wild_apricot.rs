//! Wild Apricot REST client.
//!
//! # Flow
//!
//! ```text
//! POST {auth_url}                     Basic APIKEY:<key>  -> bearer token
//! GET  {api_url}/v2.1/accounts        Bearer              -> account, "Contacts" resource URL
//! GET  <contacts>?$async=false&$filter=RFID eq <rfid>     -> {"Contacts": [...]}
//! GET  <avatar url>?asBase64=true                          -> base64 text
//! ```
//!
//! The token is requested lazily before a lookup whenever none is held (or
//! the held one has expired). A 401 on lookup drops the token and the lookup
//! is retried once after re-authenticating.
//!
//! Every request is bounded by [`DirectoryConfig::timeout`]; a timeout is a
//! transport failure like any other and yields
//! [`LookupOutcome::NetworkUnavailable`].

use std::time::{Duration, Instant};

use latchkey_core::constants::{DEFAULT_API_URL, DEFAULT_AUTH_URL, DEFAULT_HTTP_TIMEOUT_MS};
use latchkey_core::{Avatar, Connectivity, Rfid};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::directory::{LookupOutcome, MembershipDirectory};
use crate::error::{DirectoryError, Result};
use crate::record::AccessRecord;

const TOKEN_REQUEST_BODY: &str = "grant_type=client_credentials&scope=auto";
const CONTACTS_RESOURCE: &str = "Contacts";

/// Tokens are renewed this long before the service expires them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Connection settings for the Wild Apricot API.
#[derive(Clone)]
pub struct DirectoryConfig {
    pub api_key: String,
    pub auth_url: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl DirectoryConfig {
    /// Settings for the public service with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        }
    }

    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("api_key", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Account {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Resource {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContactsResponse {
    #[serde(default)]
    contacts: Vec<Value>,
}

#[derive(Debug)]
struct Session {
    token: String,
    expires_at: Option<Instant>,
    contacts_url: String,
}

impl Session {
    fn is_valid(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Membership directory backed by a Wild Apricot account.
///
/// # Examples
///
/// ```no_run
/// use latchkey_core::{Connectivity, Rfid};
/// use latchkey_directory::{DirectoryConfig, LookupOutcome, MembershipDirectory, WildApricotClient};
///
/// # async fn example() -> latchkey_directory::Result<()> {
/// let config = DirectoryConfig::new("api-key");
/// let mut client = WildApricotClient::new(config, Connectivity::new())?;
///
/// match client.find_by_rfid(&Rfid::new("1234").unwrap()).await {
///     LookupOutcome::Found(record) => println!("{} active={}", record.display_name, record.is_active()),
///     LookupOutcome::NotFound => println!("unknown card"),
///     LookupOutcome::NetworkUnavailable => println!("offline"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct WildApricotClient {
    http: Client,
    config: DirectoryConfig,
    session: Option<Session>,
    connectivity: Connectivity,
}

impl WildApricotClient {
    /// Create a client. No request is made until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: DirectoryConfig, connectivity: Connectivity) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| DirectoryError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session: None,
            connectivity,
        })
    }

    /// Authenticate now instead of on the first lookup.
    ///
    /// Updates the connectivity flag like a lookup would.
    pub async fn connect(&mut self) -> bool {
        match self.ensure_session().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Directory authentication failed");
                self.connectivity.set(false);
                false
            }
        }
    }

    async fn ensure_session(&mut self) -> Result<()> {
        if self.session.as_ref().is_some_and(Session::is_valid) {
            return Ok(());
        }
        self.session = None;

        let token = self.request_token().await?;
        let contacts_url = self.contacts_url(&token.access_token).await?;

        let expires_at = token
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(TOKEN_EXPIRY_MARGIN));

        self.session = Some(Session {
            token: token.access_token,
            expires_at,
            contacts_url,
        });
        self.connectivity.set(true);
        info!("Authenticated with membership directory");
        Ok(())
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.auth_url)
            .basic_auth("APIKEY", Some(&self.config.api_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(TOKEN_REQUEST_BODY)
            .send()
            .await?;

        let response = check_status(response)?;
        Ok(response.json().await?)
    }

    async fn contacts_url(&self, token: &str) -> Result<String> {
        let url = format!("{}/v2.1/accounts", self.config.api_url.trim_end_matches('/'));
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let accounts: Vec<Account> = check_status(response)?.json().await?;

        let account = accounts
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::invalid_response("API key has no accounts"))?;

        account
            .resources
            .into_iter()
            .find(|r| r.name == CONTACTS_RESOURCE)
            .map(|r| r.url)
            .ok_or_else(|| DirectoryError::invalid_response("account has no Contacts resource"))
    }

    async fn query_contacts(&self, rfid: &Rfid) -> Result<Vec<Value>> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| DirectoryError::invalid_response("no session"))?;

        let mut url = Url::parse(&session.contacts_url)
            .map_err(|e| DirectoryError::invalid_response(format!("bad Contacts URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("$async", "false")
            .append_pair("$filter", &format!("RFID eq {rfid}"));

        let response = self
            .http
            .get(url)
            .bearer_auth(&session.token)
            .send()
            .await?;
        let body: ContactsResponse = check_status(response)?.json().await?;
        Ok(body.contacts)
    }

    async fn lookup(&mut self, rfid: &Rfid) -> Result<Option<AccessRecord>> {
        self.ensure_session().await?;

        let contacts = match self.query_contacts(rfid).await {
            Err(DirectoryError::Unauthorized { url }) => {
                debug!(url = %url, "Token rejected, re-authenticating");
                self.session = None;
                self.ensure_session().await?;
                self.query_contacts(rfid).await?
            }
            other => other?,
        };

        Ok(contacts.into_iter().next().map(AccessRecord::from_contact))
    }

    async fn download_avatar(&self, url: &str) -> Result<String> {
        let mut url = Url::parse(url)
            .map_err(|e| DirectoryError::invalid_response(format!("bad avatar URL: {e}")))?;
        url.query_pairs_mut().append_pair("asBase64", "true");

        let mut request = self.http.get(url);
        if let Some(session) = &self.session {
            request = request.bearer_auth(&session.token);
        }

        let response = check_status(request.send().await?)?;
        Ok(response.text().await?.trim().to_string())
    }
}

impl MembershipDirectory for WildApricotClient {
    async fn find_by_rfid(&mut self, rfid: &Rfid) -> LookupOutcome {
        match self.lookup(rfid).await {
            Ok(Some(record)) => {
                self.connectivity.set(true);
                debug!(rfid = %rfid, member = %record.display_name, "Directory match");
                LookupOutcome::Found(record)
            }
            Ok(None) => {
                self.connectivity.set(true);
                LookupOutcome::NotFound
            }
            Err(e) => {
                warn!(rfid = %rfid, error = %e, "Directory lookup failed");
                self.connectivity.set(false);
                LookupOutcome::NetworkUnavailable
            }
        }
    }

    async fn fetch_avatar(&mut self, record: &AccessRecord) -> Option<Avatar> {
        let avatar = record.avatar.as_ref()?;

        match self.download_avatar(&avatar.url).await {
            Ok(base64) => Some(Avatar {
                file_id: avatar.file_id.clone(),
                base64,
            }),
            Err(e) => {
                warn!(member = %record.display_name, error = %e, "Avatar fetch failed");
                self.connectivity.set(false);
                None
            }
        }
    }

    fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    if status == StatusCode::UNAUTHORIZED {
        Err(DirectoryError::Unauthorized { url })
    } else {
        Err(DirectoryError::Status {
            status: status.as_u16(),
            url,
        })
    }
}
