use super::ApiError;
use crate::auth::{MIN_PASSWORD_LEN, ProfileUpdate, SessionToken, UserProfile};
use crate::config::ClientConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// HTTP client for the GymTrack API.
///
/// Clones share the same default header map, so a token applied through one
/// handle authenticates requests made through every other handle.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    default_headers: Arc<RwLock<HeaderMap>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::from_config(&ClientConfig::for_url(base_url))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.api_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base_url,
            http,
            default_headers: Arc::new(RwLock::new(HeaderMap::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    // ------------------------------------------------------------------
    // Default headers
    // ------------------------------------------------------------------

    /// Header value for `token`, checked before anything is committed.
    pub(crate) fn bearer_value(token: &SessionToken) -> Result<HeaderValue, ApiError> {
        let mut value = HeaderValue::from_str(&token.bearer())
            .map_err(|_| ApiError::InvalidResponse("token is not a valid header value".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Send `Authorization: <value>` with every subsequent request.
    ///
    /// Only the session manager calls this; nothing else in the crate may
    /// write the authorization entry.
    pub(crate) fn set_authorization(&self, value: HeaderValue) {
        let mut headers = self
            .default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.insert(AUTHORIZATION, value);
    }

    pub(crate) fn clear_authorization(&self) {
        let mut headers = self
            .default_headers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        headers.remove(AUTHORIZATION);
    }

    /// Current value of the authorization entry, if any.
    pub fn authorization(&self) -> Option<String> {
        self.default_headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Snapshot of the headers sent with every request.
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // ------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------

    /// `POST /sessions` with the user's credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResponse, ApiError> {
        let request = self
            .request(Method::POST, &["sessions"])?
            .json(&SignInRequest { email, password });
        self.send_json(request).await
    }

    /// `POST /users` to register a new account.
    pub async fn sign_up(&self, account: &SignUpRequest) -> Result<(), ApiError> {
        let request = self.request(Method::POST, &["users"])?.json(account);
        self.send_empty(request).await
    }

    /// `PUT /users` with the mutable profile fields.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let request = self.request(Method::PUT, &["users"])?.json(update);
        self.send_empty(request).await
    }

    /// `GET /groups`: names of the muscle groups.
    pub async fn groups(&self) -> Result<Vec<String>, ApiError> {
        let request = self.request(Method::GET, &["groups"])?;
        self.send_json(request).await
    }

    /// `GET /exercises/bygroup/{group}`.
    pub async fn exercises_by_group(&self, group: &str) -> Result<Vec<ExerciseSummary>, ApiError> {
        let request = self.request(Method::GET, &["exercises", "bygroup", group])?;
        self.send_json(request).await
    }

    /// Public URL of the user's avatar image.
    pub fn avatar_url(&self, profile: &UserProfile) -> Option<String> {
        let avatar = profile.avatar.as_deref().filter(|a| !a.is_empty())?;
        self.endpoint(&["avatar", avatar]).ok().map(String::from)
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("{} {}", method, url);
        Ok(self.http.request(method, url).headers(self.default_headers()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::debug!("Request failed with status {}", status);
            return Err(ApiError::from_status(status, &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body of a successful `POST /sessions`.
///
/// Both fields are optional on the wire so that a response missing one of
/// them can be reported as such instead of as a parse failure.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    /// Same checks the registration form applies.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err("E-mail is required.".to_string());
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err("Invalid e-mail.".to_string()),
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub id: String,
    pub name: String,
    /// Demonstration animation file name
    #[serde(default)]
    pub demo: String,
    pub group: String,
    #[serde(default)]
    pub series: u32,
    #[serde(default)]
    pub repetitions: u32,
    /// Thumbnail file name
    #[serde(default)]
    pub thumb: String,
    #[serde(default, alias = "update_at")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_is_shared_between_clones() {
        let client = ApiClient::new("http://localhost:3333").unwrap();
        let other = client.clone();

        let value = ApiClient::bearer_value(&SessionToken::new("abc123").unwrap()).unwrap();
        client.set_authorization(value);
        assert_eq!(other.authorization().as_deref(), Some("Bearer abc123"));

        other.clear_authorization();
        assert_eq!(client.authorization(), None);
    }

    #[test]
    fn test_token_with_line_break_is_rejected() {
        let token = SessionToken::new("abc\r\nX-Injected: 1").unwrap();
        assert!(ApiClient::bearer_value(&token).is_err());
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_segments() {
        let client = ApiClient::new("https://gym.example.com/api/").unwrap();
        let url = client.endpoint(&["exercises", "bygroup", "antebraço"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gym.example.com/api/exercises/bygroup/antebra%C3%A7o"
        );
    }

    #[test]
    fn test_avatar_url() {
        let client = ApiClient::new("http://localhost:3333").unwrap();
        let mut profile = UserProfile {
            id: "1".to_string(),
            name: "Lucas".to_string(),
            email: "lucass.mark@gmail.com".to_string(),
            avatar: None,
        };
        assert_eq!(client.avatar_url(&profile), None);

        profile.avatar = Some("lucas.png".to_string());
        assert_eq!(
            client.avatar_url(&profile).as_deref(),
            Some("http://localhost:3333/avatar/lucas.png")
        );
    }

    #[test]
    fn test_sign_up_validation() {
        let mut account = SignUpRequest {
            name: "Lucas".to_string(),
            email: "lucass.mark@gmail.com".to_string(),
            password: "123456".to_string(),
        };
        assert!(account.validate().is_ok());

        account.email = "lucas".to_string();
        assert_eq!(account.validate().unwrap_err(), "Invalid e-mail.");

        account.email = "lucass.mark@gmail.com".to_string();
        account.password = "123".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
