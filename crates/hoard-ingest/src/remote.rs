//! Single-item ingestion from a remote URL.

use crate::batch::enforce_after_write;
use crate::ids::IdGenerator;
use crate::persist::{PendingUpload, Persister};
use crate::quota::QuotaService;
use crate::ssrf::{validate_parsed, validate_url};
use hoard_core::constants::DEFAULT_DOWNLOAD_FILENAME;
use hoard_core::models::{Account, Provenance, QuotaPolicy, UploadRecord, UsageSnapshot};
use hoard_core::{AppError, FetchError, QuotaError, RemoteFetchConfig};
use hoard_db::UploadRepository;
use hoard_storage::Storage;
use percent_encoding::percent_decode_str;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Method, Response, Url};
use std::sync::Arc;

/// Optional inputs for a remote fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Sent as the `Authorization` header, only to the original host.
    pub authorization: Option<String>,
    /// Display filename; derived from the URL when absent.
    pub filename: Option<String>,
}

/// Downloaded body plus what the server said about it.
struct Download {
    /// Where the body came from after redirects.
    url: Url,
    data: Vec<u8>,
    declared_content_type: Option<String>,
}

/// Fetches a URL and ingests the body as one upload.
#[derive(Clone)]
pub struct RemoteFetchIngestor {
    client: Client,
    config: RemoteFetchConfig,
    quota: QuotaService,
    uploads: Arc<dyn UploadRepository>,
    persister: Persister,
}

impl RemoteFetchIngestor {
    pub fn new(
        config: RemoteFetchConfig,
        quota: QuotaService,
        uploads: Arc<dyn UploadRepository>,
        storage: Arc<dyn Storage>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, AppError> {
        // Redirects are followed by hand so every hop gets validated.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            quota,
            persister: Persister::new(uploads.clone(), storage, ids),
            uploads,
        })
    }

    /// Download `url` and store it for `account`.
    #[tracing::instrument(skip(self, options), fields(user_id = %account.id, url = %url))]
    pub async fn ingest_from_url(
        &self,
        account: &Account,
        url: &str,
        provenance: Provenance,
        options: FetchOptions,
    ) -> Result<UploadRecord, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidInput("Missing url parameter".to_string()));
        }

        let origin = validate_url(url, &self.config).await.map_err(|e| {
            tracing::warn!(error = %e, "URL validation failed");
            e
        })?;
        let policy = self.quota.resolve_policy(account)?;
        let authorization = options.authorization.as_deref();

        self.precheck(account, &policy, &origin, authorization).await?;

        let download = self.fetch(&origin, authorization, &policy).await?;
        let size = download.data.len() as i64;

        let filename = options
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| filename_from_url(&download.url));

        tracing::info!(
            filename = %filename,
            size_bytes = size,
            "Downloaded remote file"
        );

        let used = self.quota.current_usage(account.id).await?;
        if used.saturating_add(size) > policy.max_total_storage_bytes {
            return Err(QuotaError::StorageQuotaExceeded {
                usage: UsageSnapshot::new(used, &policy),
            }
            .into());
        }

        let record = self
            .persister
            .persist(PendingUpload {
                user_id: account.id,
                filename: &filename,
                declared_content_type: download.declared_content_type.as_deref(),
                data: download.data,
                provenance,
                original_url: Some(url.to_string()),
            })
            .await?;

        enforce_after_write(&self.quota, self.uploads.as_ref(), account, &policy, record).await
    }

    /// Headers-only request, following redirects like the download does.
    /// Any failure or missing length skips the check.
    async fn precheck(
        &self,
        account: &Account,
        policy: &QuotaPolicy,
        url: &Url,
        authorization: Option<&str>,
    ) -> Result<(), AppError> {
        let response = match self.follow(Method::HEAD, url, authorization).await {
            Ok((_, response)) => response,
            Err(e) => {
                tracing::debug!(error = %e, "HEAD pre-check skipped");
                return Ok(());
            }
        };

        let Some(length) = declared_length(&response) else {
            return Ok(());
        };

        if length > policy.max_file_size_bytes {
            return Err(QuotaError::FileTooLarge {
                size: length,
                limit: policy.max_file_size_bytes,
            }
            .into());
        }

        let used = self.quota.current_usage(account.id).await?;
        if used.saturating_add(length) > policy.max_total_storage_bytes {
            return Err(QuotaError::WouldExceedQuota {
                remaining: policy.remaining(used),
            }
            .into());
        }

        Ok(())
    }

    /// Send `method` to `origin`, following at most `max_redirects` validated
    /// hops. Returns the final URL and its successful response.
    async fn follow(
        &self,
        method: Method,
        origin: &Url,
        authorization: Option<&str>,
    ) -> Result<(Url, Response), FetchError> {
        let mut current = origin.clone();
        let mut last_location: Option<String> = None;
        let mut hops = 0usize;

        loop {
            let mut request = self.client.request(method.clone(), current.clone());
            if let Some(auth) = authorization.filter(|_| same_origin(origin, &current)) {
                request = request.header(AUTHORIZATION, auth);
            }

            let response = request.send().await.map_err(|e| transport_error(&current, e))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                let Some(location) = location else {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        location: last_location,
                    });
                };

                if hops >= self.config.max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        status: status.as_u16(),
                        location: Some(location),
                        limit: self.config.max_redirects,
                    });
                }

                let next = current.join(&location).map_err(|e| {
                    FetchError::InvalidUrl(format!("redirect to {}: {}", location, e))
                })?;
                validate_parsed(&next, &self.config).await?;

                tracing::debug!(from = %current, to = %next, status = status.as_u16(), %method, "Following redirect");
                last_location = Some(location);
                current = next;
                hops += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    location: last_location,
                });
            }

            return Ok((current, response));
        }
    }

    /// GET with validated redirects, streaming the body and giving up once it
    /// passes the per-file limit.
    async fn fetch(
        &self,
        origin: &Url,
        authorization: Option<&str>,
        policy: &QuotaPolicy,
    ) -> Result<Download, AppError> {
        let (current, mut response) = self
            .follow(Method::GET, origin, authorization)
            .await
            .map_err(|e| {
                if let FetchError::Status { status, .. } = &e {
                    tracing::warn!(status, url = %origin, "Remote fetch failed");
                }
                e
            })?;

        let declared_content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let declared_size = declared_length(&response);

        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(&current, e))?
        {
            data.extend_from_slice(&chunk);
            if data.len() as i64 > policy.max_file_size_bytes {
                return Err(QuotaError::FileTooLarge {
                    size: declared_size.unwrap_or(data.len() as i64),
                    limit: policy.max_file_size_bytes,
                }
                .into());
            }
        }

        Ok(Download {
            url: current,
            data,
            declared_content_type,
        })
    }
}

fn declared_length(response: &Response) -> Option<i64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|len| *len >= 0)
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn transport_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Last non-empty path segment, percent-decoded.
fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::Fixture;
    use std::io::Write;

    const PNG: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    ];

    #[test]
    fn derives_filename_from_path() {
        let url = Url::parse("https://example.com/files/My%20Report.pdf?x=1").unwrap();
        assert_eq!(filename_from_url(&url), "My Report.pdf");

        let url = Url::parse("https://example.com/a/b/").unwrap();
        assert_eq!(filename_from_url(&url), "b");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&url), "download");
    }

    #[test]
    fn origin_comparison_includes_port() {
        let a = Url::parse("https://example.com/a").unwrap();
        assert!(same_origin(&a, &Url::parse("https://example.com:443/b").unwrap()));
        assert!(!same_origin(&a, &Url::parse("https://cdn.example.com/a").unwrap()));
        assert!(!same_origin(&a, &Url::parse("http://example.com/a").unwrap()));
    }

    #[tokio::test]
    async fn downloads_and_sniffs_content() {
        let mut server = mockito::Server::new_async().await;
        let get = server
            .mock("GET", "/images/cat%20pic.png")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(PNG)
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        let url = format!("{}/images/cat%20pic.png", server.url());
        let record = fx
            .remote()
            .ingest_from_url(&fx.account, &url, Provenance::UrlFetch, FetchOptions::default())
            .await
            .unwrap();

        get.assert_async().await;
        assert_eq!(record.original_filename, "cat_pic.png");
        assert_eq!(record.content_type, "image/png");
        assert_eq!(record.file_size, PNG.len() as i64);
        assert_eq!(record.provenance, Provenance::UrlFetch);
        assert_eq!(record.original_url.as_deref(), Some(url.as_str()));
        assert!(record.storage_key.ends_with("/cat_pic.png"));
        assert!(fx.storage.has_file(&record.storage_key));
    }

    #[tokio::test]
    async fn declared_type_is_used_when_bytes_are_unknown() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data")
            .with_status(200)
            .with_header("content-type", "Application/JSON; charset=utf-8")
            .with_body(r#"{"a":1}"#)
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        let record = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/data", server.url()),
                Provenance::Api,
                FetchOptions {
                    filename: Some("export".to_string()),
                    ..FetchOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.original_filename, "export");
        assert_eq!(record.content_type, "application/json");
    }

    #[tokio::test]
    async fn oversized_file_is_refused_before_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/big.bin")
            .with_status(200)
            .with_header("content-length", "5000")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/big.bin")
            .with_status(200)
            .with_body(vec![0u8; 5000])
            .expect(0)
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1_000_000);
        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/big.bin", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();

        get.assert_async().await;
        assert!(matches!(
            err,
            AppError::Quota(QuotaError::FileTooLarge {
                size: 5000,
                limit: 1000
            })
        ));
        assert_eq!(fx.storage.file_count(), 0);
    }

    #[tokio::test]
    async fn declared_size_beyond_headroom_skips_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/a.bin")
            .with_status(200)
            .with_header("content-length", "100")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/a.bin")
            .with_status(200)
            .with_body(vec![0u8; 100])
            .expect(0)
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        fx.repo
            .seed(fx.account.id, "existing.bin", 950, Provenance::Web);

        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/a.bin", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();

        get.assert_async().await;
        assert!(matches!(
            err,
            AppError::Quota(QuotaError::WouldExceedQuota { remaining: 50 })
        ));
        assert_eq!(fx.storage.file_count(), 0);
    }

    #[tokio::test]
    async fn size_check_follows_redirected_head() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/old")
            .with_status(302)
            .with_header("location", "/new.bin")
            .create_async()
            .await;
        server
            .mock("HEAD", "/new.bin")
            .with_status(200)
            .with_header("content-length", "5000")
            .create_async()
            .await;
        let get_old = server
            .mock("GET", "/old")
            .with_status(302)
            .with_header("location", "/new.bin")
            .expect(0)
            .create_async()
            .await;
        let get_new = server
            .mock("GET", "/new.bin")
            .with_status(200)
            .with_body(vec![0u8; 5000])
            .expect(0)
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1_000_000);
        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/old", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();

        get_old.assert_async().await;
        get_new.assert_async().await;
        assert!(matches!(
            err,
            AppError::Quota(QuotaError::FileTooLarge { size: 5000, .. })
        ));
    }

    #[tokio::test]
    async fn oversized_body_without_length_aborts_mid_stream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stream.bin")
            .with_status(200)
            .with_chunked_body(|w| w.write_all(&[0u8; 5000]))
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1_000_000);
        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/stream.bin", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Quota(QuotaError::FileTooLarge { limit: 1000, .. })
        ));
        assert_eq!(fx.storage.file_count(), 0);
    }

    #[tokio::test]
    async fn failed_head_is_ignored() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/a.txt")
            .with_status(405)
            .create_async()
            .await;
        server
            .mock("GET", "/a.txt")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        let record = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/a.txt", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(record.file_size, 5);
    }

    #[tokio::test]
    async fn redirect_budget_exhaustion_reports_status_and_location() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        for hop in 0..3 {
            server
                .mock("GET", format!("/r{}", hop).as_str())
                .with_status(302)
                .with_header("location", &format!("{}/r{}", base, hop + 1))
                .create_async()
                .await;
        }

        let fx = Fixture::new(1000, 1000);
        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/r0", base),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::RemoteFetch(FetchError::TooManyRedirects {
                status,
                location,
                limit,
            }) => {
                assert_eq!(status, 302);
                assert_eq!(limit, 2);
                assert_eq!(location, Some(format!("{}/r3", base)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.storage.file_count(), 0);
    }

    #[tokio::test]
    async fn follows_redirects_within_budget() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new/report.txt")
            .create_async()
            .await;
        server
            .mock("GET", "/new/report.txt")
            .with_status(200)
            .with_body("quarterly numbers")
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        let record = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/old", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(record.file_size, 17);
        assert_eq!(record.original_filename, "report.txt");
    }

    #[tokio::test]
    async fn error_status_fails_the_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/gone", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::RemoteFetch(FetchError::Status {
                status: 404,
                location: None
            })
        ));
    }

    #[tokio::test]
    async fn authorization_is_forwarded() {
        let mut server = mockito::Server::new_async().await;
        let get = server
            .mock("GET", "/private.txt")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        fx.remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/private.txt", server.url()),
                Provenance::Integration,
                FetchOptions {
                    authorization: Some("Bearer secret".to_string()),
                    ..FetchOptions::default()
                },
            )
            .await
            .unwrap();
        get.assert_async().await;
    }

    #[tokio::test]
    async fn concurrent_overage_destroys_fetched_upload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/late.txt")
            .with_status(200)
            .with_body(vec![b'a'; 100])
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        // Usage reads: before the write, then after it.
        fx.repo.commit_concurrently_before_sum(2, 950);

        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/late.txt", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Quota(QuotaError::StorageQuotaExceeded { usage }) => {
                assert_eq!(usage.storage_used_bytes, 950);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.storage.file_count(), 0);
    }

    #[tokio::test]
    async fn over_budget_download_never_reaches_storage() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/a.txt")
            .with_status(200)
            .with_body(vec![b'a'; 100])
            .create_async()
            .await;

        let fx = Fixture::new(1000, 1000);
        fx.repo
            .seed(fx.account.id, "existing.bin", 950, Provenance::Web);

        let err = fx
            .remote()
            .ingest_from_url(
                &fx.account,
                &format!("{}/a.txt", server.url()),
                Provenance::UrlFetch,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_quota());
        assert_eq!(fx.storage.file_count(), 0);
    }

    #[tokio::test]
    async fn blank_and_blocked_urls_are_rejected() {
        let fx = Fixture::new(1000, 1000);
        let err = fx
            .remote()
            .ingest_from_url(&fx.account, "  ", Provenance::Api, FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let strict = fx.remote_with(RemoteFetchConfig::default());
        let err = strict
            .ingest_from_url(
                &fx.account,
                "http://127.0.0.1:9/x",
                Provenance::Api,
                FetchOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteFetch(FetchError::Blocked(_))));
    }
}
