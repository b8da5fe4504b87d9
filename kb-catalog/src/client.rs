use anyhow::Result;
use async_trait::async_trait;
use kb_core::{CatalogApi, CatalogError, Resource, Subject, SubjectId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.kaizenklass.me";

const RESOURCE_TITLE_FALLBACK: &str = "No Title";
const RESOURCE_URL_FALLBACK: &str = "#";
const RESOURCE_POSTER_FALLBACK: &str = "Unknown";

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn subjects_url(&self) -> String {
        format!("{}/api/v1/get-subjects", self.base_url)
    }

    fn resources_url(&self, subject_id: &SubjectId, page: u32) -> String {
        format!(
            "{}/api/v2/get/subjects/{}/resources?page={page}",
            self.base_url, subject_id
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::UpstreamUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read error body: {e}>"));
            return Err(CatalogError::UpstreamUnavailable(format!(
                "status={status} body={body}"
            )));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| CatalogError::UpstreamUnavailable(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| CatalogError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_subjects(&self) -> Result<Vec<Subject>, CatalogError> {
        let envelope: SubjectsEnvelope = self.get_json(&self.subjects_url()).await?;
        tracing::debug!(subjects = envelope.subjects.len(), "fetched subject list");
        Ok(envelope.subjects.into_iter().map(Subject::from).collect())
    }

    async fn list_resources(&self, subject_id: &SubjectId) -> Result<Vec<Resource>, CatalogError> {
        let mut all = Vec::new();
        let mut page: u32 = 1;
        loop {
            let envelope: ResourcesEnvelope = self
                .get_json(&self.resources_url(subject_id, page))
                .await?;
            let resource_page = envelope.subject_resources;
            all.extend(resource_page.data.into_iter().map(Resource::from));
            if page >= resource_page.last_page {
                break;
            }
            page += 1;
        }
        tracing::debug!(
            %subject_id,
            resources = all.len(),
            pages = page,
            "fetched resource list"
        );
        Ok(all)
    }
}

#[derive(Debug, Deserialize)]
struct SubjectsEnvelope {
    subjects: Vec<SubjectRecord>,
}

#[derive(Debug, Deserialize)]
struct SubjectRecord {
    subject_uuid: String,
    subject: String,
}

impl From<SubjectRecord> for Subject {
    fn from(record: SubjectRecord) -> Self {
        Subject {
            id: SubjectId::new(record.subject_uuid),
            name: record.subject,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResourcesEnvelope {
    subject_resources: ResourcePage,
}

#[derive(Debug, Deserialize)]
struct ResourcePage {
    #[serde(default)]
    data: Vec<ResourceRecord>,
    #[serde(default = "default_last_page")]
    last_page: u32,
}

fn default_last_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<ResourceRecord> for Resource {
    fn from(record: ResourceRecord) -> Self {
        Resource {
            title: record
                .title
                .unwrap_or_else(|| RESOURCE_TITLE_FALLBACK.to_string()),
            content_url: record
                .content
                .unwrap_or_else(|| RESOURCE_URL_FALLBACK.to_string()),
            posted_by: record
                .name
                .unwrap_or_else(|| RESOURCE_POSTER_FALLBACK.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection, in order.
    async fn serve_canned(responses: Vec<(u16, String)>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut sock, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let reason = match status {
                    200 => "OK",
                    500 => "Internal Server Error",
                    _ => "Error",
                };
                let resp = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
            }
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> CatalogClient {
        CatalogClient::new(&format!("http://{addr}")).expect("client")
    }

    fn resource_page(titles: &[&str], last_page: u32) -> String {
        let data: Vec<serde_json::Value> = titles
            .iter()
            .map(|t| serde_json::json!({"title": t, "content": "https://example.com", "name": "poster"}))
            .collect();
        serde_json::json!({"subject_resources": {"data": data, "last_page": last_page}}).to_string()
    }

    #[tokio::test]
    async fn lists_subjects_from_the_wire_payload() {
        let body = serde_json::json!({
            "subjects": [
                {"subject_uuid": "u1", "subject": "Math"},
                {"subject_uuid": "u2", "subject": "Physics"},
            ]
        })
        .to_string();
        let addr = serve_canned(vec![(200, body)]).await;

        let subjects = client_for(addr).list_subjects().await.expect("subjects");
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].id.as_str(), "u1");
        assert_eq!(subjects[1].name, "Physics");
    }

    #[tokio::test]
    async fn non_2xx_subjects_fetch_is_upstream_unavailable() {
        let addr = serve_canned(vec![(500, "{}".to_string())]).await;
        let err = client_for(addr).list_subjects().await.expect_err("error");
        assert!(matches!(err, CatalogError::UpstreamUnavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn missing_subjects_key_is_malformed() {
        let addr = serve_canned(vec![(200, r#"{"count": 3}"#.to_string())]).await;
        let err = client_for(addr).list_subjects().await.expect_err("error");
        assert!(matches!(err, CatalogError::MalformedResponse(_)), "{err}");
    }

    #[tokio::test]
    async fn resources_concatenate_every_page_in_server_order() {
        let addr = serve_canned(vec![
            (200, resource_page(&["r1", "r2"], 3)),
            (200, resource_page(&["r3"], 3)),
            (200, resource_page(&["r4"], 3)),
        ])
        .await;

        let resources = client_for(addr)
            .list_resources(&SubjectId::new("u1"))
            .await
            .expect("resources");
        let titles: Vec<&str> = resources.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["r1", "r2", "r3", "r4"]);
    }

    #[tokio::test]
    async fn mid_pagination_failure_yields_no_partial_list() {
        let addr = serve_canned(vec![
            (200, resource_page(&["r1"], 3)),
            (500, "{}".to_string()),
        ])
        .await;

        let err = client_for(addr)
            .list_resources(&SubjectId::new("u1"))
            .await
            .expect_err("page 2 failure fails the call");
        assert!(matches!(err, CatalogError::UpstreamUnavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn single_page_resources_default_last_page() {
        let body =
            serde_json::json!({"subject_resources": {"data": [{"title": "only"}]}}).to_string();
        let addr = serve_canned(vec![(200, body)]).await;

        let resources = client_for(addr)
            .list_resources(&SubjectId::new("u1"))
            .await
            .expect("resources");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].content_url, RESOURCE_URL_FALLBACK);
        assert_eq!(resources[0].posted_by, RESOURCE_POSTER_FALLBACK);
    }
}
