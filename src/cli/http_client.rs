use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::credentials::{Credentials, try_load_credentials};

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Response data together with any soft warnings the server reported.
#[derive(Debug)]
pub struct Reply<T> {
    pub data: T,
    pub warnings: Vec<String>,
}

impl ApiClient {
    pub fn new(server_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_credentials(creds: &Credentials) -> anyhow::Result<Self> {
        Self::new(&creds.server_url, Some(creds.token.clone()))
    }

    /// Client for read-only commands. Uses stored credentials when present;
    /// `server` overrides the URL and drops the token if it points elsewhere.
    pub fn connect(server: Option<&str>) -> anyhow::Result<Self> {
        let creds = try_load_credentials()?;
        match (server, creds) {
            (Some(server), Some(creds)) => {
                let server = normalize_server_url(server);
                let token = (server == creds.server_url).then_some(creds.token);
                Self::new(&server, token)
            }
            (Some(server), None) => Self::new(&normalize_server_url(server), None),
            (None, Some(creds)) => Self::from_credentials(&creds),
            (None, None) => {
                anyhow::bail!("Not logged in. Pass --server or run 'devmarks auth login' first.")
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let resp = self.authorize(self.client.get(self.url(path))).send()?;
        Ok(self.handle_response(resp)?.data)
    }

    pub fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> anyhow::Result<T> {
        let resp = self
            .authorize(self.client.get(self.url(path)))
            .query(query)
            .send()?;
        Ok(self.handle_response(resp)?.data)
    }

    pub fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<Reply<T>> {
        let resp = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()?;
        self.handle_response(resp)
    }

    pub fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<Reply<T>> {
        let resp = self
            .authorize(self.client.patch(self.url(path)))
            .json(body)
            .send()?;
        self.handle_response(resp)
    }

    /// POST for endpoints that answer with no body.
    pub fn post_empty(&self, path: &str) -> anyhow::Result<()> {
        let resp = self.authorize(self.client.post(self.url(path))).send()?;
        self.check_status(resp)
    }

    pub fn delete(&self, path: &str) -> anyhow::Result<()> {
        let resp = self.authorize(self.client.delete(self.url(path))).send()?;
        self.check_status(resp)
    }

    fn check_status(&self, resp: Response) -> anyhow::Result<()> {
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from(resp))
        }
    }

    fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> anyhow::Result<Reply<T>> {
        if resp.status().is_success() {
            let api_resp: ApiResponse<T> = resp.json()?;
            let data = api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("Server returned an empty response"))?;
            Ok(Reply {
                data,
                warnings: api_resp.warnings,
            })
        } else {
            Err(error_from(resp))
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn error_from(resp: Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ApiResponse<()>>() {
        Ok(api_resp) => anyhow::anyhow!(
            api_resp
                .error
                .unwrap_or_else(|| format!("Server error ({status})"))
        ),
        Err(_) => anyhow::anyhow!("Server error ({status})"),
    }
}

pub fn normalize_server_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    // Strip trailing API paths to avoid duplication when constructing request URLs
    let url = url
        .trim_end_matches("/api/v1")
        .trim_end_matches("/api")
        .trim_end_matches('/');

    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
        format!("http://{url}")
    } else {
        format!("https://{url}")
    }
}
