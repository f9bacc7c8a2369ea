use crate::{
    consts::{FUNCTIONS_ENDPOINT, FUNCTION_ENDPOINT},
    types::{FunctionDeployment, FunctionStatus},
};
use reqwest::{Error as ReqwestError, RequestBuilder, StatusCode};
use thiserror::Error as ThisError;
use url::{ParseError as UrlParseError, Url};

pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

pub type FaasResult<T> = Result<T, FaasError>;

#[derive(ThisError, Debug)]
pub enum FaasError {
    #[error("Invalid URL: {0}")]
    Url(
        #[source]
        #[from]
        UrlParseError,
    ),
    #[error("HTTP error: {0}")]
    HttpError(#[source] ReqwestError),
    #[error("Faas: bad request: {0}")]
    BadRequest(String),
    #[error("Faas: unauthorized: {0}")]
    Unauthorized(String),
    #[error("Faas: not found: {0}")]
    NotFound(String),
    #[error("Faas: conflict: {0}")]
    Conflict(String),
    #[error("Faas: internal server error: {0}")]
    InternalServerError(String),
    #[error("Faas: unknown status code {0}: {1}")]
    UnknownStatusCode(u16, String),
}

impl FaasError {
    fn from_response(status_code: StatusCode, message: String) -> Self {
        match status_code {
            StatusCode::BAD_REQUEST => FaasError::BadRequest(message),
            StatusCode::UNAUTHORIZED => FaasError::Unauthorized(message),
            StatusCode::NOT_FOUND => FaasError::NotFound(message),
            StatusCode::CONFLICT => FaasError::Conflict(message),
            StatusCode::INTERNAL_SERVER_ERROR => FaasError::InternalServerError(message),
            _ => FaasError::UnknownStatusCode(status_code.as_u16(), message),
        }
    }
}

/// Client for the provider's function endpoints.
pub struct FaasClient {
    client: reqwest::Client,
    /// Base URL of the provider
    /// e.g. http://127.0.0.1:8081
    base_url: Url,
    basic_auth: Option<BasicAuth>,
}

impl FaasClient {
    pub fn new(base_url: Url, basic_auth: Option<BasicAuth>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            basic_auth,
        }
    }

    fn url(&self, path: &str, namespace: Option<&str>) -> FaasResult<Url> {
        let mut url = self.base_url.join(path)?;

        if let Some(namespace) = namespace {
            url.query_pairs_mut().append_pair("namespace", namespace);
        }

        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.basic_auth {
            Some(basic_auth) => builder.basic_auth(&basic_auth.username, Some(&basic_auth.password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> FaasResult<reqwest::Response> {
        let resp = self
            .authorize(builder)
            .send()
            .await
            .map_err(FaasError::HttpError)?;

        let status_code = resp.status();
        if status_code.is_success() {
            return Ok(resp);
        }

        let message = resp.text().await.unwrap_or_default();
        Err(FaasError::from_response(status_code, message))
    }

    pub async fn update_function(
        &self,
        function_deployment: &FunctionDeployment,
        namespace: Option<&str>,
    ) -> FaasResult<()> {
        let url = self.url(FUNCTIONS_ENDPOINT, namespace)?;

        self.send(self.client.put(url).json(function_deployment))
            .await?;

        Ok(())
    }

    pub async fn list_functions(&self, namespace: Option<&str>) -> FaasResult<Vec<FunctionStatus>> {
        let url = self.url(FUNCTIONS_ENDPOINT, namespace)?;

        self.send(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(FaasError::HttpError)
    }

    pub async fn get_function(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> FaasResult<FunctionStatus> {
        let url = self.url(&format!("{FUNCTION_ENDPOINT}/{name}"), namespace)?;

        self.send(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(FaasError::HttpError)
    }
}
