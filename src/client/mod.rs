use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub mod cache;

static SESSION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<sessionId>([^<]+)</sessionId>").unwrap());
static SERVER_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<serverUrl>([^<]+)</serverUrl>").unwrap());
static FAULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<faultstring>([^<]*)</faultstring>").unwrap());

/// Credential tuple identifying one CRM org login.
///
/// Doubles as the cache key for [`cache::ClientCache`], so two sessions are
/// shared only when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub security_token: String,
    pub domain: String,
}

impl Credentials {
    /// All fields are trimmed; pasted credentials routinely carry whitespace.
    pub fn new(username: &str, password: &str, security_token: &str, domain: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            password: password.trim().to_string(),
            security_token: security_token.trim().to_string(),
            domain: domain.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.security_token.is_empty()
    }

    /// Login host: "login" and "test" are the standard instances, anything
    /// else is treated as a custom subdomain (e.g. "acme-compliance.my").
    pub fn login_host(&self) -> String {
        let domain = if self.domain.is_empty() {
            "login"
        } else {
            &self.domain
        };
        format!("{domain}.salesforce.com")
    }
}

/// Capability to fetch one raw analytics report document by id.
///
/// The normalizer consumes the returned document as-is; implementations own
/// authentication and transport.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch_report(&self, report_id: &str) -> Result<Value>;
}

/// Authenticated REST client for the analytics API.
pub struct RestClient {
    http: reqwest::Client,
    instance_url: String,
    session_id: String,
    api_version: String,
    pub authenticated_at: DateTime<Utc>,
}

impl RestClient {
    /// Performs the SOAP username + password+token login and returns a client
    /// bound to the org instance the login response points at.
    #[instrument(skip(credentials), fields(username = %credentials.username, domain = %credentials.domain))]
    pub async fn login(
        credentials: &Credentials,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let login_url = format!(
            "https://{}/services/Soap/u/{}",
            credentials.login_host(),
            api_version
        );
        let envelope = login_envelope(credentials);

        debug!("Sending login request to {}", login_url);
        let response = http
            .post(&login_url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(envelope)
            .send()
            .await?;

        let ok = response.status().is_success();
        let body = response.text().await?;
        let (session_id, server_url) = parse_login_response(ok, &body)?;
        let instance_url = instance_from_server_url(&server_url);

        info!("Authenticated against {}", instance_url);
        Ok(Self {
            http,
            instance_url,
            session_id,
            api_version: api_version.to_string(),
            authenticated_at: Utc::now(),
        })
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }
}

#[async_trait]
impl ReportFetcher for RestClient {
    async fn fetch_report(&self, report_id: &str) -> Result<Value> {
        let url = format!(
            "{}/services/data/v{}/analytics/reports/{}",
            self.instance_url, self.api_version, report_id
        );
        debug!("Fetching report {}", report_id);
        let document = self
            .http
            .get(&url)
            .bearer_auth(&self.session_id)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(document)
    }
}

fn login_envelope(credentials: &Credentials) -> String {
    // The security token is appended to the password, as the partner API expects.
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <urn:login>
      <urn:username>{}</urn:username>
      <urn:password>{}{}</urn:password>
    </urn:login>
  </soapenv:Body>
</soapenv:Envelope>"#,
        xml_escape(&credentials.username),
        xml_escape(&credentials.password),
        xml_escape(&credentials.security_token),
    )
}

/// Pulls (session id, server url) out of a raw SOAP login response.
///
/// Invalid credentials come back as a SOAP fault; that is surfaced as
/// an authentication failure, never as a structure or HTTP error.
fn parse_login_response(status_ok: bool, body: &str) -> Result<(String, String)> {
    if let Some(fault) = FAULT_RE.captures(body).and_then(|c| c.get(1)) {
        return Err(DashboardError::Auth {
            message: fault.as_str().to_string(),
        });
    }
    if !status_ok {
        return Err(DashboardError::Auth {
            message: "login endpoint rejected the request".to_string(),
        });
    }

    let session_id = SESSION_ID_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let server_url = SERVER_URL_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    match (session_id, server_url) {
        (Some(sid), Some(url)) => Ok((sid, url)),
        _ => Err(DashboardError::Auth {
            message: "login response did not contain a session".to_string(),
        }),
    }
}

/// The login response's serverUrl points at the SOAP endpoint of the org
/// instance; the REST base is its scheme + host.
fn instance_from_server_url(server_url: &str) -> String {
    match server_url.find("/services") {
        Some(idx) => server_url[..idx].to_string(),
        None => server_url.trim_end_matches('/').to_string(),
    }
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
