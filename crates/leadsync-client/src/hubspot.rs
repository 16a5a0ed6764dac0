use leadsync_core::config::{CrmConfig, HttpConfig};
use leadsync_core::error::AppError;
use leadsync_core::{ChunkOutcome, ContactUpserter, Record, UpsertResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const CONTACTS_PATH: &str = "crm/v3/objects/contacts";
const BATCH_UPSERT_PATH: &str = "crm/v3/objects/contacts/batch/upsert";

/// The contact property the CRM upserts on.
const ID_PROPERTY: &str = "email";

/// Contact properties as the CRM names them.
#[derive(Serialize, Debug, PartialEq)]
struct ContactProperties<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    firstname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lastname: Option<&'a str>,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company: Option<&'a str>,
}

impl<'a> From<&'a Record> for ContactProperties<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            firstname: record.first_name.as_deref(),
            lastname: record.last_name.as_deref(),
            email: &record.email,
            phone: record.phone.as_deref(),
            company: record.company.as_deref(),
        }
    }
}

/// Request body for the batch upsert endpoint.
///
/// ```json
/// {
///     "inputs": [
///         {"properties": {"email": "a@x.com"}, "id": "a@x.com", "idProperty": "email"}
///     ]
/// }
/// ```
#[derive(Serialize)]
struct BatchUpsertRequest<'a> {
    inputs: Vec<UpsertInput<'a>>,
}

#[derive(Serialize)]
struct UpsertInput<'a> {
    properties: ContactProperties<'a>,
    id: &'a str,
    #[serde(rename = "idProperty")]
    id_property: &'static str,
}

/// Request body for single contact creation.
#[derive(Serialize)]
struct CreateContactRequest<'a> {
    properties: ContactProperties<'a>,
}

impl<'a> BatchUpsertRequest<'a> {
    fn new(chunk: &'a [Record]) -> Self {
        Self {
            inputs: chunk
                .iter()
                .map(|record| UpsertInput {
                    properties: ContactProperties::from(record),
                    id: &record.email,
                    id_property: ID_PROPERTY,
                })
                .collect(),
        }
    }
}

/// HTTP client for HubSpot's CRM contacts API.
///
/// The client gets its base URL, token and timeout from the caller and keeps
/// them for its lifetime. It never retries: each call is made once and any
/// failure is handed back to the caller.
///
/// # Examples
///
/// ```no_run
/// use leadsync_client::HubSpotClient;
/// use leadsync_core::{CrmConfig, HttpConfig, Record};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let crm = CrmConfig::new("https://api.hubapi.com", "pat-na1-...");
/// let client = HubSpotClient::new(&crm, &HttpConfig::default())?;
///
/// let outcome = client.upsert_chunk(vec![Record::new("ada@example.com")]).await;
/// println!("success: {}", outcome.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HubSpotClient {
    client: Client,
    base_url: Url,
    access_token: String,
    timeout: Duration,
}

impl HubSpotClient {
    /// Creates a client for the CRM described by `crm`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the base URL cannot be parsed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(crm: &CrmConfig, http: &HttpConfig) -> Result<Self, AppError> {
        // A trailing slash makes `join` append to the base path instead of
        // replacing its last segment.
        let normalized = format!("{}/", crm.base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|_| AppError::InvalidUrl(crm.base_url.clone()))?;

        let client = Client::builder()
            .user_agent("LeadSync/0.1 (contact-sync)")
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            access_token: crm.access_token.clone(),
            timeout: http.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))
    }

    /// Upserts one chunk of contacts keyed by email.
    ///
    /// A response carrying a `results` list is a success, whatever the HTTP
    /// status (the CRM answers partial successes with 207). Anything else is
    /// a failure that keeps the raw payload: the JSON body as-is, a non-JSON
    /// body as a string, or `{"kind", "message"}` for transport errors and
    /// timeouts.
    pub async fn upsert_chunk(&self, chunk: Vec<Record>) -> ChunkOutcome {
        let url = match self.endpoint(BATCH_UPSERT_PATH) {
            Ok(url) => url,
            Err(e) => {
                return ChunkOutcome::failure(
                    chunk,
                    json!({"kind": "invalid_url", "message": e.to_string()}),
                )
            }
        };

        debug!("POST {} with {} contacts", url, chunk.len());

        let sent = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&BatchUpsertRequest::new(&chunk))
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!("Batch upsert of {} contacts failed: {}", chunk.len(), e);
                let payload = self.transport_error_payload(&e);
                return ChunkOutcome::failure(chunk, payload);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Reading batch upsert response failed: {}", e);
                let payload = self.transport_error_payload(&e);
                return ChunkOutcome::failure(chunk, payload);
            }
        };

        debug!("Batch upsert answered HTTP {}", status.as_u16());
        classify_response(chunk, &body)
    }

    /// Creates a single contact, bypassing validation and dedup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UpstreamRejected` for non-success statuses and
    /// transport variants (`Timeout`, `NetworkError`, `ClientError`) when the
    /// request cannot complete.
    pub async fn create_contact(&self, record: &Record) -> Result<Value, AppError> {
        let url = self.endpoint(CONTACTS_PATH)?;
        let body = CreateContactRequest {
            properties: ContactProperties::from(record),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        self.read_json(response).await
    }

    /// Lists up to `limit` contacts, as returned by the CRM.
    pub async fn list_contacts(&self, limit: usize) -> Result<Value, AppError> {
        let mut url = self.endpoint(CONTACTS_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        self.read_json(response).await
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, AppError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(AppError::UpstreamRejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout.as_secs())
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {}", e))
        } else {
            AppError::ClientError(e.to_string())
        }
    }

    fn transport_error_payload(&self, e: &reqwest::Error) -> Value {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connect"
        } else if e.is_body() || e.is_decode() {
            "body"
        } else {
            "request"
        };

        let mut payload = json!({"kind": kind, "message": e.to_string()});
        if e.is_timeout() {
            payload["timeout_ms"] = json!(self.timeout.as_millis() as u64);
        }
        payload
    }
}

impl ContactUpserter for HubSpotClient {
    fn upsert_chunk(&self, chunk: Vec<Record>) -> impl Future<Output = ChunkOutcome> + Send {
        HubSpotClient::upsert_chunk(self, chunk)
    }
}

/// Turns a batch upsert response body into an outcome for `chunk`.
fn classify_response(chunk: Vec<Record>, body: &str) -> ChunkOutcome {
    let payload: Value = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(_) => return ChunkOutcome::failure(chunk, Value::String(body.to_string())),
    };

    let entries = match payload.get("results") {
        Some(Value::Array(entries)) => entries,
        _ => return ChunkOutcome::failure(chunk, payload),
    };

    // Unreadable entries are dropped; the records they stood for are
    // reported as missing results.
    let results = entries
        .iter()
        .filter_map(|entry| match UpsertResult::deserialize(entry) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Skipping unreadable upstream result: {}", e);
                None
            }
        })
        .collect();

    ChunkOutcome::success(chunk, results)
}
