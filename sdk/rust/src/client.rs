use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("Portal returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl SdkError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub roll_number: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

pub struct PortalClient {
    client: Client,
    base_url: String,
    admin_key: Option<String>,
}

impl PortalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_key: None,
        }
    }

    pub fn with_admin_key(mut self, key: &str) -> Self {
        self.admin_key = Some(key.to_string());
        self
    }

    /// Raw GET against any portal path; returns the JSON body.
    pub async fn get(&self, path: &str) -> Result<Value, SdkError> {
        send(self.client.get(format!("{}{}", self.base_url, path))).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, SdkError> {
        send(
            self.client
                .post(format!("{}{}", self.base_url, path))
                .json(body),
        )
        .await
    }

    /// POST and return the entity under `key` of the success envelope.
    async fn mutate(&self, path: &str, key: &str, body: &Value) -> Result<Value, SdkError> {
        let mut envelope = self.post(path, body).await?;
        envelope
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| SdkError::Decode(format!("missing '{}' in response", key)))
    }

    pub async fn health(&self) -> Result<Value, SdkError> {
        self.get("/health").await
    }

    pub async fn register_user(&self, user: &NewUser) -> Result<Value, SdkError> {
        let body = serde_json::to_value(user).map_err(|e| SdkError::Decode(e.to_string()))?;
        self.mutate("/api/register", "user", &body).await
    }

    pub async fn register_faculty(
        &self,
        name: &str,
        email: &str,
        department: Option<&str>,
    ) -> Result<Value, SdkError> {
        let body = json!({ "name": name, "email": email, "department": department });
        self.mutate("/api/faculty/register", "faculty", &body).await
    }

    pub async fn register_course(&self, user_id: i64, course_id: i64) -> Result<Value, SdkError> {
        let body = json!({ "user_id": user_id, "course_id": course_id });
        self.mutate("/api/course", "registration", &body).await
    }

    pub async fn issue_certificate(&self, user_id: i64, course_id: i64) -> Result<Value, SdkError> {
        let body = json!({ "user_id": user_id, "course_id": course_id });
        self.mutate("/api/certificate", "certificate", &body).await
    }

    pub async fn pay_fees(
        &self,
        user_id: i64,
        semester_id: i64,
        amount: &str,
    ) -> Result<Value, SdkError> {
        let body = json!({ "user_id": user_id, "semester_id": semester_id, "amount": amount });
        self.mutate("/api/fees", "payment", &body).await
    }

    /// `starts_at`/`ends_at` are RFC 3339 timestamps.
    pub async fn book_room(
        &self,
        room_id: i64,
        user_id: i64,
        starts_at: &str,
        ends_at: &str,
    ) -> Result<Value, SdkError> {
        let body = json!({ "user_id": user_id, "starts_at": starts_at, "ends_at": ends_at });
        self.mutate(&format!("/api/rooms/{}/book", room_id), "booking", &body)
            .await
    }

    pub async fn join_event(&self, event_id: i64, user_id: i64) -> Result<Value, SdkError> {
        let body = json!({ "user_id": user_id });
        self.mutate(&format!("/api/events/{}/join", event_id), "booking", &body)
            .await
    }

    pub async fn assign_grade(
        &self,
        faculty_id: i64,
        user_id: i64,
        course_id: i64,
        grade: i64,
    ) -> Result<Value, SdkError> {
        let body = json!({ "user_id": user_id, "course_id": course_id, "grade": grade });
        self.mutate(
            &format!("/api/faculty/{}/grades", faculty_id),
            "registration",
            &body,
        )
        .await
    }

    pub async fn user(&self, user_id: i64) -> Result<Value, SdkError> {
        self.get(&format!("/api/users/{}", user_id)).await
    }

    pub async fn user_transactions(&self, user_id: i64) -> Result<Value, SdkError> {
        self.get(&format!("/api/users/{}/transactions", user_id)).await
    }

    pub async fn user_fees(&self, user_id: i64) -> Result<Value, SdkError> {
        self.get(&format!("/api/users/{}/fees", user_id)).await
    }

    pub async fn user_certificates(&self, user_id: i64) -> Result<Value, SdkError> {
        self.get(&format!("/api/users/{}/certificates", user_id)).await
    }

    pub async fn admin_status(&self) -> Result<Value, SdkError> {
        send(self.admin(self.client.get(format!("{}/admin/status", self.base_url)))).await
    }

    /// Create reference data: `kind` is `courses`, `semesters`, `rooms` or `events`.
    pub async fn admin_create(&self, kind: &str, body: &Value) -> Result<Value, SdkError> {
        let key = kind.trim_end_matches('s');
        let request = self
            .client
            .post(format!("{}/admin/{}", self.base_url, kind))
            .json(body);
        let mut envelope = send(self.admin(request)).await?;
        envelope
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| SdkError::Decode(format!("missing '{}' in response", key)))
    }

    fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.admin_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

async fn send(request: RequestBuilder) -> Result<Value, SdkError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        return Err(SdkError::Api { status, message });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = PortalClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_new_user_omits_empty_optionals() {
        let user = NewUser {
            roll_number: "1".into(),
            name: "A".into(),
            email: "a@b.c".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("dob").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_portal_is_http_error() {
        let client = PortalClient::new("http://127.0.0.1:1");
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, SdkError::Http(_)));
        assert!(err.status().is_none());
    }
}
