//! Azure Blob Storage over its REST API
//!
//! Requests are signed with the account's shared key (HMAC-SHA256 over the
//! canonical request) or carry a SAS token, depending on the connection
//! string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use sha2::Sha256;
use std::collections::BTreeMap;

use super::BlobStore;
use crate::error::SyncError;

pub const API_VERSION: &str = "2021-08-06";

const DEV_ACCOUNT: &str = "devstoreaccount1";
const DEV_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::SharedKey { account, .. } => {
                f.debug_struct("SharedKey").field("account", account).finish_non_exhaustive()
            }
            Credentials::Sas(_) => f.write_str("Sas(..)"),
        }
    }
}

/// Parsed `Key=Value;...` storage connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub blob_endpoint: Url,
    pub credentials: Credentials,
}

fn invalid(reason: impl Into<String>) -> SyncError {
    SyncError::InvalidConnectionString(reason.into())
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected Key=Value, got '{}'", part)))?;
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        let get = |k: &str| fields.get(k).map(String::as_str).filter(|v| !v.is_empty());

        if get("usedevelopmentstorage").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return Ok(Self {
                blob_endpoint: Url::parse(DEV_ENDPOINT).map_err(|e| invalid(e.to_string()))?,
                credentials: Credentials::SharedKey {
                    account: DEV_ACCOUNT.to_string(),
                    key: STANDARD.decode(DEV_KEY).map_err(|e| invalid(e.to_string()))?,
                },
            });
        }

        let account = get("accountname");
        let endpoint = match (get("blobendpoint"), account) {
            (Some(endpoint), _) => endpoint.to_string(),
            (None, Some(account)) => format!(
                "{}://{}.blob.{}",
                get("defaultendpointsprotocol").unwrap_or("https"),
                account,
                get("endpointsuffix").unwrap_or("core.windows.net")
            ),
            (None, None) => return Err(invalid("missing AccountName or BlobEndpoint")),
        };
        let blob_endpoint =
            Url::parse(&endpoint).map_err(|e| invalid(format!("bad endpoint '{}': {}", endpoint, e)))?;

        let credentials = match (account, get("accountkey"), get("sharedaccesssignature")) {
            (Some(account), Some(key), _) => Credentials::SharedKey {
                account: account.to_string(),
                key: STANDARD
                    .decode(key)
                    .map_err(|e| invalid(format!("AccountKey is not base64: {}", e)))?,
            },
            (_, _, Some(sas)) => Credentials::Sas(sas.trim_start_matches('?').to_string()),
            _ => return Err(invalid("missing AccountKey or SharedAccessSignature")),
        };

        Ok(Self {
            blob_endpoint,
            credentials,
        })
    }
}

/// Canonicalized resource: `/<account><path>` plus sorted, lowercased query
/// parameters, one per line.
fn canonical_resource(account: &str, url: &Url) -> String {
    let mut out = format!("/{}{}", account, url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        out.push_str(&format!("\n{}:{}", name, values.join(",")));
    }
    out
}

/// Shared-key string to sign for the Blob service.
///
/// `ms_headers` must hold every `x-ms-*` header sent with the request.
pub fn string_to_sign(
    method: &Method,
    content_length: usize,
    content_type: &str,
    ms_headers: &[(&str, String)],
    account: &str,
    url: &Url,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim()))
        .collect();
    headers.sort();
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    // Encoding, language, length, MD5, type, date, then four conditionals and range
    format!(
        "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}{}",
        method.as_str(),
        length,
        content_type,
        canonical_headers,
        canonical_resource(account, url)
    )
}

pub fn sign(key: &[u8], string_to_sign: &str) -> Result<String, SyncError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|e| invalid(format!("unusable AccountKey: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Blob names from one `List Blobs` page, plus the continuation marker
pub fn parse_blob_list(xml: &str) -> Result<(Vec<String>, Option<String>), SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut names = Vec::new();
    let mut marker = None;
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => path.push(e.name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| SyncError::Xml(e.to_string()))?;
                match path.last().map(Vec::as_slice) {
                    Some(b"Name") if path.len() >= 2 && path[path.len() - 2] == b"Blob" => {
                        names.push(text.into_owned());
                    }
                    Some(b"NextMarker") if !text.is_empty() => marker = Some(text.into_owned()),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SyncError::Xml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    Ok((names, marker))
}

fn service_error(response: Response) -> SyncError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    let message = parse_error_code(&body).unwrap_or(body);
    SyncError::Service { status, message }
}

/// `<Code>` from an error body, if there is one
fn parse_error_code(body: &str) -> Option<String> {
    let start = body.find("<Code>")? + "<Code>".len();
    let end = body[start..].find("</Code>")? + start;
    Some(body[start..end].to_string())
}

/// Blob store client for one storage account
pub struct AzureBlobStore {
    http: Client,
    conn: ConnectionString,
}

impl AzureBlobStore {
    pub fn new(conn: ConnectionString) -> Result<Self, SyncError> {
        let http = Client::builder()
            .user_agent(concat!("mdm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Http(e.to_string()))?;
        Ok(Self { http, conn })
    }

    pub fn from_connection_string(raw: &str) -> Result<Self, SyncError> {
        Self::new(ConnectionString::parse(raw)?)
    }

    /// URL for a container, or a blob in it when `key` is given
    fn url(&self, container: &str, key: Option<&str>, query: &[(&str, &str)]) -> Url {
        let mut url = self.conn.blob_endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(container);
            if let Some(key) = key {
                segments.extend(key.split('/'));
            }
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    fn send(
        &self,
        method: Method,
        mut url: Url,
        body: Option<Vec<u8>>,
        extra: &[(&str, String)],
    ) -> Result<Response, SyncError> {
        let mut ms_headers: Vec<(&str, String)> = vec![
            ("x-ms-date", rfc1123_now()),
            ("x-ms-version", API_VERSION.to_string()),
        ];
        ms_headers.extend(extra.iter().cloned());
        let content_type = if body.is_some() { "application/octet-stream" } else { "" };
        let length = body.as_ref().map_or(0, Vec::len);

        let authorization = match &self.conn.credentials {
            Credentials::SharedKey { account, key } => {
                let to_sign = string_to_sign(&method, length, content_type, &ms_headers, account, &url);
                Some(format!("SharedKey {}:{}", account, sign(key, &to_sign)?))
            }
            Credentials::Sas(token) => {
                let query = match url.query() {
                    Some(q) => format!("{}&{}", q, token),
                    None => token.clone(),
                };
                url.set_query(Some(&query));
                None
            }
        };

        log::debug!("{} {}", method, url.path());
        let mut request: RequestBuilder = self.http.request(method, url);
        for (name, value) in &ms_headers {
            request = request.header(*name, value);
        }
        if let Some(auth) = authorization {
            request = request.header("Authorization", auth);
        }
        if let Some(body) = body {
            request = request.header("Content-Type", content_type).body(body);
        }

        request.send().map_err(|e| SyncError::Http(e.to_string()))
    }
}

impl BlobStore for AzureBlobStore {
    fn create_container(&self, container: &str) -> Result<(), SyncError> {
        let url = self.url(container, None, &[("restype", "container")]);
        let response = self.send(Method::PUT, url, None, &[])?;
        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT => Err(SyncError::ContainerAlreadyExists(container.to_string())),
            _ => Err(service_error(response)),
        }
    }

    fn container_exists(&self, container: &str) -> Result<bool, SyncError> {
        let url = self.url(container, None, &[("restype", "container")]);
        let response = self.send(Method::HEAD, url, None, &[])?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(service_error(response)),
        }
    }

    fn list_blobs(&self, container: &str) -> Result<Vec<String>, SyncError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![("restype", "container"), ("comp", "list")];
            if let Some(m) = marker.as_deref() {
                query.push(("marker", m));
            }
            let url = self.url(container, None, &query);
            let response = self.send(Method::GET, url, None, &[])?;
            if !response.status().is_success() {
                return Err(service_error(response));
            }

            let body = response.text().map_err(|e| SyncError::Http(e.to_string()))?;
            let (page, next) = parse_blob_list(&body)?;
            log::debug!("listed {} blobs in '{}'", page.len(), container);
            names.extend(page);

            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    fn upload_blob(&self, container: &str, key: &str, data: &[u8]) -> Result<(), SyncError> {
        let url = self.url(container, Some(key), &[]);
        let extra = [("x-ms-blob-type", "BlockBlob".to_string())];
        let response = self.send(Method::PUT, url, Some(data.to_vec()), &extra)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(service_error(response))
        }
    }

    fn download_blob(&self, container: &str, key: &str) -> Result<Vec<u8>, SyncError> {
        let url = self.url(container, Some(key), &[]);
        let response = self.send(Method::GET, url, None, &[])?;
        if !response.status().is_success() {
            return Err(service_error(response));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| SyncError::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_key_string() {
        let conn = ConnectionString::parse(
            "DefaultEndpointsProtocol=https;AccountName=myacct;AccountKey=a2V5;EndpointSuffix=core.windows.net",
        )
        .unwrap();
        assert_eq!(conn.blob_endpoint.as_str(), "https://myacct.blob.core.windows.net/");
        assert_eq!(
            conn.credentials,
            Credentials::SharedKey {
                account: "myacct".into(),
                key: b"key".to_vec()
            }
        );
    }

    #[test]
    fn parses_sas_with_endpoint() {
        let conn = ConnectionString::parse(
            "BlobEndpoint=https://acct.blob.core.windows.net;SharedAccessSignature=?sv=2021&sig=abc",
        )
        .unwrap();
        assert_eq!(conn.credentials, Credentials::Sas("sv=2021&sig=abc".into()));
    }

    #[test]
    fn parses_development_storage() {
        let conn = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        assert_eq!(conn.blob_endpoint.as_str(), DEV_ENDPOINT);
        assert!(matches!(
            conn.credentials,
            Credentials::SharedKey { ref account, .. } if account == DEV_ACCOUNT
        ));
    }

    #[test]
    fn rejects_incomplete_strings() {
        for raw in [
            "",
            "conn_str",
            "AccountName=only",
            "AccountName=a;AccountKey=not base64!",
        ] {
            assert!(
                matches!(
                    ConnectionString::parse(raw),
                    Err(SyncError::InvalidConnectionString(_))
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn debug_hides_secrets() {
        let creds = Credentials::SharedKey {
            account: "acct".into(),
            key: b"secret".to_vec(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    fn store() -> AzureBlobStore {
        AzureBlobStore::from_connection_string("AccountName=acct;AccountKey=a2V5").unwrap()
    }

    #[test]
    fn urls_encode_segments() {
        let store = store();
        assert_eq!(
            store.url("fyiai-docs", None, &[("restype", "container"), ("comp", "list")]).as_str(),
            "https://acct.blob.core.windows.net/fyiai-docs?restype=container&comp=list"
        );
        assert_eq!(
            store.url("fyiai-docs", Some("sub dir/a b.md"), &[]).as_str(),
            "https://acct.blob.core.windows.net/fyiai-docs/sub%20dir/a%20b.md"
        );
    }

    #[test]
    fn canonical_resource_sorts_query() {
        let url = Url::parse("https://acct.blob.core.windows.net/c?restype=container&comp=list&marker=m1").unwrap();
        assert_eq!(
            canonical_resource("acct", &url),
            "/acct/c\ncomp:list\nmarker:m1\nrestype:container"
        );
    }

    #[test]
    fn string_to_sign_layout() {
        let url = Url::parse("https://acct.blob.core.windows.net/c/a.md").unwrap();
        let headers = [
            ("x-ms-version", API_VERSION.to_string()),
            ("x-ms-date", "Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
            ("x-ms-blob-type", "BlockBlob".to_string()),
        ];
        let s = string_to_sign(&Method::PUT, 5, "application/octet-stream", &headers, "acct", &url);
        assert_eq!(
            s,
            "PUT\n\n\n5\n\napplication/octet-stream\n\n\n\n\n\n\n\
             x-ms-blob-type:BlockBlob\n\
             x-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /acct/c/a.md"
        );

        let empty = string_to_sign(&Method::GET, 0, "", &[], "acct", &url);
        assert_eq!(empty, "GET\n\n\n\n\n\n\n\n\n\n\n\n/acct/c/a.md");
    }

    #[test]
    fn signature_matches_reference() {
        let signature = sign(b"key", "GET\n\n\n\n\n\n\n\n\n\n\n\n/acct/c/a.md").unwrap();
        assert_eq!(signature, "cZqMFWztGkQ0456itAMUZD0zxXQ5sZHaZqUQPa7oqQc=");
    }

    #[test]
    fn parses_listing_pages() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="c">
  <Blobs>
    <Blob><Name>a.md</Name><Properties><Content-Length>1</Content-Length></Properties></Blob>
    <Blob><Name>sub/b &amp; c.md</Name><Properties /></Blob>
  </Blobs>
  <NextMarker>2!token</NextMarker>
</EnumerationResults>"#;
        let (names, marker) = parse_blob_list(xml).unwrap();
        assert_eq!(names, vec!["a.md", "sub/b & c.md"]);
        assert_eq!(marker.as_deref(), Some("2!token"));
    }

    #[test]
    fn last_page_has_no_marker() {
        let xml = "<EnumerationResults><Blobs /><NextMarker /></EnumerationResults>";
        let (names, marker) = parse_blob_list(xml).unwrap();
        assert!(names.is_empty());
        assert_eq!(marker, None);
    }

    #[test]
    fn error_code_is_extracted() {
        let body = "<?xml version=\"1.0\"?><Error><Code>AuthenticationFailed</Code><Message>x</Message></Error>";
        assert_eq!(parse_error_code(body).as_deref(), Some("AuthenticationFailed"));
        assert_eq!(parse_error_code("plain"), None);
    }
}
