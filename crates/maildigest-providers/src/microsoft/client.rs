//! Microsoft Graph mail client.
//!
//! Covers the two Graph calls the digest needs: listing Inbox messages in a
//! time window (following `@odata.nextLink`) and `sendMail`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use maildigest_core::TimeWindow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::OutgoingMessage;
use crate::raw_message::RawMessage;

/// Fields selected when listing messages.
pub const MESSAGE_FIELDS: &str =
    "id,subject,from,sender,replyTo,receivedDateTime,bodyPreview,conversationId";

/// One page of a Graph collection response.
#[derive(Debug, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub value: Vec<RawMessage>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Body of a `sendMail` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest<'a> {
    message: SendMailMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: Vec<SendRecipient<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRecipient<'a> {
    email_address: SendAddress<'a>,
}

#[derive(Debug, Serialize)]
struct SendAddress<'a> {
    address: &'a str,
}

impl<'a> SendMailRequest<'a> {
    pub fn new(message: &'a OutgoingMessage) -> Self {
        Self {
            message: SendMailMessage {
                subject: &message.subject,
                body: ItemBody {
                    content_type: "HTML",
                    content: &message.html_body,
                },
                to_recipients: vec![SendRecipient {
                    email_address: SendAddress {
                        address: &message.to,
                    },
                }],
            },
            save_to_sent_items: true,
        }
    }
}

/// Formats a timestamp the way Graph `$filter` expects it.
pub fn graph_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Builds the query parameters for listing Inbox messages in `window`.
pub fn message_query(window: &TimeWindow, page_size: u32) -> Vec<(&'static str, String)> {
    vec![
        ("$select", MESSAGE_FIELDS.to_string()),
        (
            "$filter",
            format!(
                "receivedDateTime ge {} and receivedDateTime lt {}",
                graph_timestamp(window.start),
                graph_timestamp(window.end)
            ),
        ),
        ("$orderby", "receivedDateTime desc".to_string()),
        ("$top", page_size.to_string()),
    ]
}

/// Microsoft Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GraphClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {e}")).with_source(e)
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Lists Inbox messages received in `window`, newest first, across all pages.
    pub async fn list_inbox_messages(
        &self,
        window: &TimeWindow,
        page_size: u32,
    ) -> ProviderResult<Vec<RawMessage>> {
        let first_url = format!("{}/me/mailFolders/Inbox/messages", self.base_url);
        let mut page = self.get_page(&first_url, Some(message_query(window, page_size))).await?;
        let mut messages = std::mem::take(&mut page.value);
        let mut pages = 1;

        while let Some(next) = page.next_link.take() {
            page = self.get_page(&next, None).await?;
            messages.append(&mut page.value);
            pages += 1;
        }

        debug!(count = messages.len(), pages, "fetched inbox messages");
        Ok(messages)
    }

    async fn get_page(
        &self,
        url: &str,
        query: Option<Vec<(&'static str, String)>>,
    ) -> ProviderResult<MessagePage> {
        let mut request = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json");
        if let Some(query) = query {
            request = request.query(&query);
        }

        let response = request.send().await.map_err(map_send_error)?;
        let response = check_status(response, "list messages").await?;

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse message list: {e}"))
        })
    }

    /// Sends an HTML message via `POST /me/sendMail`.
    pub async fn send_mail(&self, message: &OutgoingMessage) -> ProviderResult<()> {
        let url = format!("{}/me/sendMail", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&SendMailRequest::new(message))
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response, "send mail").await?;
        Ok(())
    }
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {e}"))
    } else {
        ProviderError::network(format!("request failed: {e}"))
    }
}

/// Maps non-success statuses to provider errors.
async fn check_status(response: reqwest::Response, action: &str) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "{action}: rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, action, &body))
}

fn status_error(status: reqwest::StatusCode, action: &str, body: &str) -> ProviderError {
    let detail = graph_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            ProviderError::authentication(format!("{action}: access token expired or invalid"))
        }
        reqwest::StatusCode::FORBIDDEN => {
            ProviderError::authorization(format!("{action}: access denied: {detail}"))
        }
        reqwest::StatusCode::BAD_REQUEST => {
            ProviderError::bad_request(format!("{action}: {detail}"))
        }
        _ => ProviderError::server(format!("{action}: API error ({status}): {detail}")),
    }
}

/// Extracts `error.message` from a Graph error body.
fn graph_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        code: Option<String>,
        message: Option<String>,
    }

    let envelope: Envelope = serde_json::from_str(body).ok()?;
    match (envelope.error.code, envelope.error.message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (None, Some(message)) => Some(message),
        (Some(code), None) => Some(code),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 3, 11, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn query_parameters() {
        let query = message_query(&window(), 500);
        assert_eq!(query[0], ("$select", MESSAGE_FIELDS.to_string()));
        assert_eq!(
            query[1].1,
            "receivedDateTime ge 2025-03-11T14:00:00Z and receivedDateTime lt 2025-03-12T09:00:00Z"
        );
        assert_eq!(query[2].1, "receivedDateTime desc");
        assert_eq!(query[3], ("$top", "500".to_string()));
    }

    #[test]
    fn parse_page_with_next_link() {
        let json = r#"{
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('me')/mailFolders('Inbox')/messages",
            "value": [
                {"id": "1", "conversationId": "c1", "subject": "Hi"},
                {"id": "2", "conversationId": "c1"}
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/mailFolders/Inbox/messages?$skip=2"
        }"#;
        let page: MessagePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 2);
        assert!(page.next_link.unwrap().ends_with("$skip=2"));
    }

    #[test]
    fn parse_last_page() {
        let page: MessagePage = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn send_mail_payload_shape() {
        let msg = OutgoingMessage::new("me@example.com", "📬 Daily Email Digest – March 12, 2025", "<html/>");
        let json = serde_json::to_value(SendMailRequest::new(&msg)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": {
                    "subject": "📬 Daily Email Digest – March 12, 2025",
                    "body": {"contentType": "HTML", "content": "<html/>"},
                    "toRecipients": [{"emailAddress": {"address": "me@example.com"}}]
                },
                "saveToSentItems": true
            })
        );
    }

    #[test]
    fn status_mapping() {
        use reqwest::StatusCode;
        let code = |s| status_error(s, "list messages", "").code();
        assert_eq!(code(StatusCode::UNAUTHORIZED), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(code(StatusCode::FORBIDDEN), ProviderErrorCode::AuthorizationFailed);
        assert_eq!(code(StatusCode::BAD_REQUEST), ProviderErrorCode::BadRequest);
        assert_eq!(code(StatusCode::BAD_GATEWAY), ProviderErrorCode::ServerError);
    }

    #[test]
    fn graph_error_body_is_summarized() {
        let body = r#"{"error": {"code": "ErrorAccessDenied", "message": "Access is denied."}}"#;
        let err = status_error(reqwest::StatusCode::FORBIDDEN, "send mail", body);
        assert_eq!(err.message(), "send mail: access denied: ErrorAccessDenied: Access is denied.");
        assert!(graph_error_message("not json").is_none());
    }
}
