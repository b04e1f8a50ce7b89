use super::types::{
    BucketObject, BucketVersioningResponse, DeleteFile, ListObjectsResponse, PutObjectTagsRequest,
    RewindResponse,
};
use super::{query_string, ConsoleClient};
use crate::errors::ConsoleResult;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, Response};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ListObjectsParams {
    pub prefix: Option<String>,
    pub recursive: bool,
    pub with_versions: bool,
    pub with_metadata: bool,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteObjectParams {
    pub prefix: String,
    pub version_id: Option<String>,
    pub recursive: bool,
    pub all_versions: bool,
    pub non_current_versions: bool,
    pub bypass: bool,
}

fn bucket_path(bucket: &str, rest: &str) -> String {
    format!("/buckets/{}{}", urlencoding::encode(bucket), rest)
}

fn with_query(url: String, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        url
    } else {
        format!("{}?{}", url, query_string(params))
    }
}

impl ConsoleClient {
    pub async fn list_objects(
        &self,
        bucket: &str,
        params: &ListObjectsParams,
    ) -> ConsoleResult<Vec<BucketObject>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(prefix) = &params.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if params.recursive {
            query.push(("recursive", "true".to_string()));
        }
        if params.with_versions {
            query.push(("with_versions", "true".to_string()));
        }
        if params.with_metadata {
            query.push(("with_metadata", "true".to_string()));
        }
        if let Some(limit) = params.limit {
            query.push(("limit", limit.to_string()));
        }

        let url = with_query(self.api_url(&bucket_path(bucket, "/objects")), &query);
        let response: ListObjectsResponse =
            self.send_json(self.request(Method::GET, &url)).await?;
        Ok(response.objects.unwrap_or_default())
    }

    /// Objects in `bucket` as they were at `date`
    pub async fn get_bucket_rewind(
        &self,
        bucket: &str,
        date: &DateTime<Utc>,
        prefix: Option<&str>,
    ) -> ConsoleResult<Vec<BucketObject>> {
        let date = date.to_rfc3339_opts(SecondsFormat::Secs, true);
        let path = bucket_path(bucket, &format!("/rewind/{}", date));
        let query: Vec<(&str, String)> = prefix
            .map(|p| vec![("prefix", p.to_string())])
            .unwrap_or_default();

        let url = with_query(self.api_url(&path), &query);
        let response: RewindResponse = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(response
            .objects
            .unwrap_or_default()
            .into_iter()
            .map(BucketObject::from)
            .collect())
    }

    pub async fn get_bucket_versioning(
        &self,
        bucket: &str,
    ) -> ConsoleResult<BucketVersioningResponse> {
        let url = self.api_url(&bucket_path(bucket, "/versioning"));
        self.send_json(self.request(Method::GET, &url)).await
    }

    pub async fn delete_object(
        &self,
        bucket: &str,
        params: &DeleteObjectParams,
    ) -> ConsoleResult<()> {
        let mut query: Vec<(&str, String)> = vec![("prefix", params.prefix.clone())];
        if let Some(version_id) = &params.version_id {
            query.push(("version_id", version_id.clone()));
        }
        for (flag, enabled) in [
            ("recursive", params.recursive),
            ("all_versions", params.all_versions),
            ("non_current_versions", params.non_current_versions),
            ("bypass", params.bypass),
        ] {
            if enabled {
                query.push((flag, "true".to_string()));
            }
        }

        let url = with_query(self.api_url(&bucket_path(bucket, "/objects")), &query);
        self.send_empty(self.request(Method::DELETE, &url)).await
    }

    pub async fn delete_multiple_objects(
        &self,
        bucket: &str,
        files: &[DeleteFile],
        all_versions: bool,
        bypass: bool,
    ) -> ConsoleResult<()> {
        let mut query: Vec<(&str, String)> = vec![("all_versions", all_versions.to_string())];
        if bypass {
            query.push(("bypass", "true".to_string()));
        }
        let url = with_query(self.api_url(&bucket_path(bucket, "/delete-objects")), &query);
        let request = self.json_body(self.request(Method::POST, &url), &files)?;
        self.send_empty(request).await
    }

    pub async fn put_object_tags(
        &self,
        bucket: &str,
        prefix: &str,
        version_id: &str,
        tags: HashMap<String, String>,
    ) -> ConsoleResult<()> {
        let query = [
            ("prefix", prefix.to_string()),
            ("version_id", version_id.to_string()),
        ];
        let url = with_query(self.api_url(&bucket_path(bucket, "/objects/tags")), &query);
        let request =
            self.json_body(self.request(Method::PUT, &url), &PutObjectTagsRequest { tags })?;
        self.send_empty(request).await
    }

    /// Make `version_id` the current version of `prefix`
    pub async fn put_object_restore(
        &self,
        bucket: &str,
        prefix: &str,
        version_id: &str,
    ) -> ConsoleResult<()> {
        let query = [
            ("prefix", prefix.to_string()),
            ("version_id", version_id.to_string()),
        ];
        let url = with_query(self.api_url(&bucket_path(bucket, "/objects/restore")), &query);
        self.send_empty(self.request(Method::PUT, &url)).await
    }

    /// Ask the server to bundle `objects` into one zip; the caller stores the body.
    pub async fn download_multiple_objects(
        &self,
        bucket: &str,
        objects: &[String],
    ) -> ConsoleResult<Response> {
        let url = self.api_url(&bucket_path(bucket, "/objects/download-multiple"));
        let request = self.json_body(self.request(Method::POST, &url), &objects)?;
        self.send_checked(request).await
    }

    pub async fn license_acknowledge(&self) -> ConsoleResult<()> {
        let url = self.api_url("/license/acknowledge");
        self.send_empty(self.request(Method::GET, &url)).await
    }

    pub fn upload_url(&self, bucket: &str, key: &str) -> String {
        with_query(
            self.api_url(&bucket_path(bucket, "/objects/upload")),
            &[("prefix", key.to_string())],
        )
    }

    pub fn download_url(
        &self,
        bucket: &str,
        prefix: &str,
        version_id: Option<&str>,
        override_file_name: Option<&str>,
    ) -> String {
        let mut query: Vec<(&str, String)> = vec![("prefix", prefix.to_string())];
        if let Some(name) = override_file_name.filter(|n| !n.trim().is_empty()) {
            query.push(("override_file_name", name.to_string()));
        }
        if let Some(version_id) = version_id.filter(|v| !v.is_empty()) {
            query.push(("version_id", version_id.to_string()));
        }
        with_query(self.api_url(&bucket_path(bucket, "/objects/download")), &query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn download_url_skips_blank_override_and_empty_version() {
        let client = ConsoleClient::new("http://host", None, false).unwrap();
        assert_eq!(
            client.download_url("my bucket", "dir/a.txt", Some(""), Some("  ")),
            "http://host/api/v1/buckets/my%20bucket/objects/download?prefix=dir%2Fa.txt"
        );
        assert_eq!(
            client.download_url("b", "a.txt", Some("v1"), Some("b.txt")),
            "http://host/api/v1/buckets/b/objects/download?prefix=a.txt&override_file_name=b.txt&version_id=v1"
        );
    }

    #[tokio::test]
    async fn list_objects_sends_flags_and_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/buckets/photos/objects"))
            .and(query_param("prefix", "2024/"))
            .and(query_param("with_versions", "true"))
            .and(header("cookie", "token=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objects": [{"name": "2024/a.jpg", "size": 10, "last_modified": "2024-01-01T00:00:00Z"}],
                "total": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ConsoleClient::new(server.uri(), Some("abc".into()), false).unwrap();
        let objects = client
            .list_objects(
                "photos",
                &ListObjectsParams {
                    prefix: Some("2024/".into()),
                    with_versions: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].size, 10);
    }

    #[tokio::test]
    async fn rewind_listing_maps_delete_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/buckets/b/rewind/2024-03-01T10:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objects": [{"name": "gone.txt", "delete_flag": true, "version_id": "v9"}]
            })))
            .mount(&server)
            .await;

        let client = ConsoleClient::new(server.uri(), None, false).unwrap();
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let objects = client.get_bucket_rewind("b", &date, None).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].delete_flag);
    }

    #[tokio::test]
    async fn download_multiple_posts_json_list_with_anonymous_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/buckets/b/objects/download-multiple"))
            .and(header("X-Anonymous", "1"))
            .and(body_json(serde_json::json!(["a.txt", "dir/"])))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ConsoleClient::new(server.uri(), None, true).unwrap();
        let response = client
            .download_multiple_objects("b", &["a.txt".to_string(), "dir/".to_string()])
            .await
            .unwrap();
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"PK");
    }

    #[tokio::test]
    async fn http_errors_keep_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/buckets/b/objects/restore"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"detailedMessage":"Access Denied."}"#),
            )
            .mount(&server)
            .await;

        let client = ConsoleClient::new(server.uri(), None, false).unwrap();
        let err = client.put_object_restore("b", "a.txt", "v1").await.unwrap_err();
        match err {
            crate::errors::ConsoleError::Http { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Access Denied."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
