//! Mock repository endpoints for wiremock-backed tests.

use std::time::Duration;

use plugin_mirror::MirrorConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One `<idea-plugin>` entry of a listing.
#[derive(Debug, Clone, Copy)]
pub struct ListedPlugin<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub size: u64,
}

impl<'a> ListedPlugin<'a> {
    pub fn new(id: &'a str, version: &'a str, size: u64) -> Self {
        Self {
            id,
            name: id,
            version,
            size,
        }
    }
}

/// Renders a `plugin-repository` document with one category.
pub fn listing_xml(category: &str, plugins: &[ListedPlugin<'_>]) -> String {
    let entries: String = plugins
        .iter()
        .map(|p| {
            format!(
                r#"<idea-plugin downloads="1" size="{}"><name>{}</name><id>{}</id><version>{}</version><idea-version since-build="191.0"/></idea-plugin>"#,
                p.size, p.name, p.id, p.version
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><plugin-repository><category name="{category}">{entries}</category></plugin-repository>"#
    )
}

/// Serves `body` as the listing for `build`.
pub async fn mount_listing(server: &MockServer, build: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/plugins/list"))
        .and(query_param("build", build))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves `content` as the artifact of `id`/`version`, named via Content-Disposition.
pub async fn mount_artifact(server: &MockServer, id: &str, version: &str, filename: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/plugin/download"))
        .and(query_param("pluginId", id))
        .and(query_param("version", version))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    format!(r#"attachment; filename="{filename}""#).as_str(),
                )
                .set_body_bytes(content.to_vec()),
        )
        .mount(server)
        .await;
}

/// Number of artifact requests the server has seen.
pub async fn artifact_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/plugin/download")
        .count()
}

/// Config pointed at `server`, with limits relaxed for tests.
pub fn test_config(server: &MockServer, output: &std::path::Path, builds: &[&str]) -> MirrorConfig {
    let mut config = MirrorConfig::new(output, builds.iter().map(ToString::to_string).collect());
    config.base_url = server.uri();
    config.rate_limit = 0;
    config.retry_base_delay = Duration::from_millis(10);
    config.request_timeout = Duration::from_secs(5);
    config
}
