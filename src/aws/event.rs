//! CloudTrail activity of a service account identity
//!
//! Web identity role sessions started from a projected service account token
//! are recorded with the username `system:serviceaccount:<ns>:<name>`, which
//! is the only key shared with Kubernetes.

use super::{request_error, to_chrono};
use crate::error::{Iam4saError, Result};
use crate::k8s::service_account_username;
use async_trait::async_trait;
use aws_sdk_cloudtrail::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudtrail::types::{LookupAttribute, LookupAttributeKey};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lookback window for event history
pub const EVENTS_HOURS: i64 = 12;

/// CloudTrail event as returned by LookupEvents, detail still JSON encoded
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEvent {
    pub event_time: Option<DateTime<Utc>>,
    pub event_id: String,
    pub event_source: String,
    pub event_name: String,
    pub username: String,
    pub cloud_trail_event: String,
}

/// One LookupEvents page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    pub next_token: Option<String>,
}

/// CloudTrail writes `null` for absent strings; read it as empty
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserIdentity {
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_empty")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub principal_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub user_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub identity_provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestParameters {
    #[serde(deserialize_with = "null_as_empty")]
    pub role_arn: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub role_session_name: String,
}

/// Fields recovered from the JSON detail of an event
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EventDetail {
    #[serde(deserialize_with = "null_as_empty")]
    error_code: String,
    #[serde(deserialize_with = "null_as_empty")]
    error_message: String,
    user_identity: Option<UserIdentity>,
    #[serde(rename = "awsRegion")]
    #[serde(deserialize_with = "null_as_empty")]
    region: String,
    #[serde(rename = "sourceIPAddress")]
    #[serde(deserialize_with = "null_as_empty")]
    source_ip: String,
    #[serde(deserialize_with = "null_as_empty")]
    user_agent: String,
    request_parameters: Option<RequestParameters>,
    #[serde(rename = "requestID")]
    #[serde(deserialize_with = "null_as_empty")]
    request_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    event_type: String,
}

/// CloudTrail event attributed to an assumed role session
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Event {
    pub event_time: Option<DateTime<Utc>>,
    pub event_id: String,
    pub event_source: String,
    pub event_name: String,
    pub username: String,
    /// Set when the call failed
    pub error_code: String,
    /// Set when the call failed
    pub error_message: String,
    pub user_identity: UserIdentity,
    pub region: String,
    pub source_ip: String,
    pub user_agent: String,
    pub request_parameters: RequestParameters,
    pub request_id: String,
    pub event_type: String,
}

impl Event {
    /// Parse the JSON detail of `raw`
    ///
    /// The top level fields are kept even when the detail does not parse, so
    /// the event still counts and shows up with what is known about it.
    pub fn from_raw(raw: RawEvent) -> Self {
        let detail = if raw.cloud_trail_event.is_empty() {
            EventDetail::default()
        } else {
            serde_json::from_str::<EventDetail>(&raw.cloud_trail_event).unwrap_or_else(|e| {
                tracing::warn!(event_id = %raw.event_id, error = %e, "unmarshal event detail failed");
                EventDetail::default()
            })
        };

        Self {
            event_time: raw.event_time,
            event_id: raw.event_id,
            event_source: raw.event_source,
            event_name: raw.event_name,
            username: raw.username,
            error_code: detail.error_code,
            error_message: detail.error_message,
            user_identity: detail.user_identity.unwrap_or_default(),
            region: detail.region,
            source_ip: detail.source_ip,
            user_agent: detail.user_agent,
            request_parameters: detail.request_parameters.unwrap_or_default(),
            request_id: detail.request_id,
            event_type: detail.event_type,
        }
    }

    pub fn is_failed(&self) -> bool {
        !self.error_code.is_empty() || !self.error_message.is_empty()
    }
}

/// Events in the order CloudTrail returned them (newest first)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EventLog(Vec<Event>);

impl EventLog {
    pub fn new(events: Vec<Event>) -> Self {
        Self(events)
    }

    /// Events with an error code or message, order preserved
    pub fn failed(&self) -> EventLog {
        EventLog(self.0.iter().filter(|e| e.is_failed()).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Event> {
        self.0
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// CloudTrail event history
#[async_trait]
pub trait TrailApi: Send + Sync {
    /// One LookupEvents page for `username` between `start` and `end`
    async fn lookup_events_page(
        &self,
        username: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        next_token: Option<String>,
    ) -> Result<EventPage>;
}

fn to_aws(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(time.timestamp())
}

#[async_trait]
impl TrailApi for aws_sdk_cloudtrail::Client {
    async fn lookup_events_page(
        &self,
        username: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        next_token: Option<String>,
    ) -> Result<EventPage> {
        let request = format!("events for {username} user");
        let attribute = LookupAttribute::builder()
            .attribute_key(LookupAttributeKey::Username)
            .attribute_value(username)
            .build()
            .map_err(|e| Iam4saError::Aws {
                request: request.clone(),
                message: e.to_string(),
            })?;

        let out = self
            .lookup_events()
            .lookup_attributes(attribute)
            .start_time(to_aws(start))
            .end_time(to_aws(end))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| request_error(e, request))?;

        let events = out
            .events()
            .iter()
            .map(|e| RawEvent {
                event_time: e.event_time().and_then(to_chrono),
                event_id: e.event_id().unwrap_or_default().to_string(),
                event_source: e.event_source().unwrap_or_default().to_string(),
                event_name: e.event_name().unwrap_or_default().to_string(),
                username: e.username().unwrap_or_default().to_string(),
                cloud_trail_event: e.cloud_trail_event().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(EventPage {
            events,
            next_token: out.next_token().filter(|t| !t.is_empty()).map(String::from),
        })
    }
}

/// Events of the `namespace/name` service account over the last [`EVENTS_HOURS`]
///
/// Every page is read before returning; the failed event count is only
/// meaningful over the complete window.
pub async fn lookup_events<T: TrailApi + ?Sized>(
    trail: &T,
    namespace: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<EventLog> {
    let username = service_account_username(namespace, name);
    let start = now - Duration::hours(EVENTS_HOURS);

    let mut raw = Vec::new();
    let mut next_token = None;
    loop {
        let page = trail
            .lookup_events_page(&username, start, now, next_token)
            .await?;
        tracing::debug!(%username, events = page.events.len(), "event page");
        raw.extend(page.events);
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(raw.into_iter().map(Event::from_raw).collect())
}
