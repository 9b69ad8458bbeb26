//! Torrent submission and status reads.

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::DelugeClient;
use crate::error::{DelugeError, DelugeResult};
use crate::models::{STATUS_FIELDS, TorrentRecord};
use crate::options::TorrentConfig;
use crate::protocol::{
    UPLOAD_ENDPOINT, UploadResponse, WEB_ADD_TORRENTS, WEB_DOWNLOAD_TORRENT_FROM_URL,
    WEB_UPDATE_UI,
};
use crate::source::{ResolvedSource, TorrentSource, classify};
use crate::transport::{COOKIE_HEADER, HttpRequest, MultipartFile, RequestBody, Transport};

impl<T: Transport> DelugeClient<T> {
    /// Fetch the torrent table, filters and session stats exactly as the daemon returns them.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::Authentication`] when the session cannot be
    /// established, or any error raised by the `web.update_ui` call.
    pub async fn get_torrent_record_raw(&self) -> DelugeResult<Value> {
        self.ensure_authenticated().await?;
        self.call(WEB_UPDATE_UI, vec![json!(STATUS_FIELDS), json!({})])
            .await
    }

    /// Fetch the torrent table and decode it into a [`TorrentRecord`].
    ///
    /// # Errors
    ///
    /// As [`DelugeClient::get_torrent_record_raw`], plus [`DelugeError::Decode`]
    /// when the payload does not match the expected shape.
    pub async fn get_torrent_record(&self) -> DelugeResult<TorrentRecord> {
        let raw = self.get_torrent_record_raw().await?;
        serde_json::from_value(raw).map_err(|source| DelugeError::Decode {
            method: WEB_UPDATE_UI.to_string(),
            source,
        })
    }

    /// Add a torrent from content, a stream, a URL or a server-side path.
    ///
    /// `config` may be a [`TorrentConfig`] or a bare download location. Returns
    /// the daemon's `web.add_torrents` result verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::Authentication`] when the session cannot be
    /// established, [`DelugeError::UploadFailed`] when the daemon refuses the
    /// upload, and any error raised by the intermediate calls. Nothing is added
    /// once a step fails.
    pub async fn add_torrent(
        &self,
        source: impl Into<TorrentSource>,
        config: impl Into<TorrentConfig>,
    ) -> DelugeResult<Value> {
        let mut config = config.into();
        let source = source.into();
        self.ensure_authenticated().await?;

        let kind = source.kind();
        let path = match classify(source).await? {
            ResolvedSource::Upload(file) => self.upload(file).await?,
            ResolvedSource::Url(url) => {
                let cookie = config.take_cookie().map_or(Value::Null, Value::String);
                self.call(WEB_DOWNLOAD_TORRENT_FROM_URL, vec![Value::String(url), cookie])
                    .await?
            }
            ResolvedSource::Path(path) => Value::String(path),
        };

        let options = config.merged();
        info!(source = kind, path = %path, "submitting torrent to deluge");
        let entry = json!({ "path": path, "options": options });
        self.call(WEB_ADD_TORRENTS, vec![Value::Array(vec![entry])])
            .await
    }

    /// Upload torrent content and return the server-side path assigned to it.
    async fn upload(&self, file: MultipartFile) -> DelugeResult<Value> {
        let file_name = file.file_name.clone();
        let cookie = self.session.lock().await.cookie().to_string();
        let request = HttpRequest {
            url: self.upload_url.clone(),
            headers: vec![(COOKIE_HEADER.to_string(), cookie)],
            body: RequestBody::Multipart(file),
        };
        debug!(file_name = %file_name, "uploading torrent content");

        let response = self.send(request, UPLOAD_ENDPOINT).await?;
        let upload: UploadResponse =
            serde_json::from_value(response.body).map_err(|_| DelugeError::MalformedResponse {
                endpoint: UPLOAD_ENDPOINT,
                reason: "upload response is not an object",
            })?;
        if !upload.success {
            warn!(file_name = %file_name, "deluge rejected torrent upload");
            return Err(DelugeError::UploadFailed { file_name });
        }
        upload
            .files
            .into_iter()
            .next()
            .ok_or(DelugeError::MalformedResponse {
                endpoint: UPLOAD_ENDPOINT,
                reason: "upload response listed no files",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AUTH_CHECK_SESSION, AUTH_LOGIN};
    use crate::testing::{CallLog, RecordedCall, StubTransport, rpc_ok, stub_client};
    use crate::transport::HttpResponse;
    use anyhow::Result;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn default_options() -> Value {
        json!({
            "file_priorities": [],
            "add_paused": false,
            "compact_allocation": true,
            "max_connections": -1,
            "max_download_speed": -1,
            "max_upload_slots": -1,
            "max_upload_speed": -1,
            "prioritize_first_last_pieces": false
        })
    }

    /// Daemon with a live session that answers every submission step.
    fn daemon(call: &RecordedCall) -> HttpResponse {
        match call.method.as_str() {
            AUTH_CHECK_SESSION => rpc_ok(json!(true)),
            UPLOAD_ENDPOINT => StubTransport::json(
                200,
                json!({"success": true, "files": ["/tmp/delugeweb-x1/upload.torrent"]}),
            ),
            WEB_DOWNLOAD_TORRENT_FROM_URL => rpc_ok(json!("/tmp/delugeweb-x2/fetched.torrent")),
            WEB_ADD_TORRENTS | WEB_UPDATE_UI => rpc_ok(json!(true)),
            other => panic!("unexpected call {other}"),
        }
    }

    fn add_call(log: &CallLog) -> RecordedCall {
        log.calls()
            .into_iter()
            .find(|call| call.method == WEB_ADD_TORRENTS)
            .expect("add call issued")
    }

    #[tokio::test]
    async fn url_sources_are_fetched_then_added_with_defaults() -> Result<()> {
        let (client, log) = stub_client(daemon);
        let url = "https://releases.example.org/debian.torrent";

        let result = client.add_torrent(url, TorrentConfig::default()).await?;

        assert_eq!(result, json!(true));
        assert_eq!(
            log.methods(),
            vec![AUTH_CHECK_SESSION, WEB_DOWNLOAD_TORRENT_FROM_URL, WEB_ADD_TORRENTS]
        );
        let calls = log.calls();
        assert_eq!(calls[1].params, json!([url, null]));
        assert_eq!(
            calls[2].params,
            json!([[{
                "path": "/tmp/delugeweb-x2/fetched.torrent",
                "options": default_options()
            }]])
        );
        Ok(())
    }

    #[tokio::test]
    async fn url_fetch_cookie_is_used_once_and_not_forwarded() -> Result<()> {
        let (client, log) = stub_client(daemon);
        let config = TorrentConfig {
            cookie: Some("uid=42; pass=abc".to_string()),
            ..TorrentConfig::default()
        };

        client
            .add_torrent("magnet:?xt=urn:btih:0123456789abcdef", config)
            .await?;

        let calls = log.calls();
        assert_eq!(
            calls[1].params,
            json!(["magnet:?xt=urn:btih:0123456789abcdef", "uid=42; pass=abc"])
        );
        assert!(add_call(&log).params[0][0]["options"].get("cookie").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn byte_sources_are_uploaded_before_the_add_call() -> Result<()> {
        let (client, log) = stub_client(daemon);
        client
            .session
            .lock()
            .await
            .set_cookie("_session_id=live".to_string());

        client
            .add_torrent(b"d8:announce3:urle".to_vec(), "/data")
            .await?;

        assert_eq!(
            log.methods(),
            vec![AUTH_CHECK_SESSION, UPLOAD_ENDPOINT, WEB_ADD_TORRENTS]
        );
        let upload = log.calls()[1].upload.clone().expect("upload recorded");
        assert_eq!(upload.field, "file");
        assert_eq!(upload.file_name, "upload.torrent");
        assert_eq!(upload.bytes, b"d8:announce3:urle".to_vec());
        assert_eq!(log.calls()[1].cookie, "_session_id=live");

        let mut expected = default_options();
        expected["download_location"] = json!("/data");
        let add = add_call(&log);
        assert_eq!(add.params[0][0]["path"], json!("/tmp/delugeweb-x1/upload.torrent"));
        assert_eq!(add.params[0][0]["options"], expected);
        Ok(())
    }

    #[tokio::test]
    async fn stream_and_pending_sources_take_the_upload_path() -> Result<()> {
        let (client, log) = stub_client(daemon);

        client
            .add_torrent(
                TorrentSource::stream(std::io::Cursor::new(b"stream-bytes".to_vec())),
                TorrentConfig::default(),
            )
            .await?;
        client
            .add_torrent(
                TorrentSource::pending(async { Ok(b"pending-bytes".to_vec()) }),
                TorrentConfig::default(),
            )
            .await?;

        let uploads: Vec<Vec<u8>> = log
            .calls()
            .into_iter()
            .filter_map(|call| call.upload.map(|upload| upload.bytes))
            .collect();
        assert_eq!(uploads, vec![b"stream-bytes".to_vec(), b"pending-bytes".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn resolved_paths_skip_upload_and_fetch() -> Result<()> {
        let (client, log) = stub_client(daemon);
        let config = TorrentConfig {
            max_connections: Some(5),
            ..TorrentConfig::default()
        };

        client.add_torrent("/already/resolved/path", config).await?;

        assert_eq!(log.methods(), vec![AUTH_CHECK_SESSION, WEB_ADD_TORRENTS]);
        let add = add_call(&log);
        assert_eq!(add.params[0][0]["path"], json!("/already/resolved/path"));
        assert_eq!(add.params[0][0]["options"]["max_connections"], json!(5));
        assert_eq!(add.params[0][0]["options"]["max_upload_slots"], json!(-1));
        Ok(())
    }

    #[tokio::test]
    async fn failed_upload_stops_before_add() {
        let (client, log) = stub_client(|call| match call.method.as_str() {
            UPLOAD_ENDPOINT => StubTransport::json(200, json!({"success": false})),
            _ => daemon(call),
        });

        let err = client
            .add_torrent(TorrentSource::file("bad.torrent", vec![0]), TorrentConfig::default())
            .await
            .expect_err("upload rejected");

        assert!(matches!(err, DelugeError::UploadFailed { file_name } if file_name == "bad.torrent"));
        assert_eq!(log.methods(), vec![AUTH_CHECK_SESSION, UPLOAD_ENDPOINT]);
    }

    #[tokio::test]
    async fn failed_login_blocks_submission_and_status() {
        let (client, log) = stub_client(|_| rpc_ok(json!(false)));

        let err = client
            .add_torrent("/already/resolved/path", TorrentConfig::default())
            .await
            .expect_err("auth failure");
        assert!(err.is_authentication());
        assert_eq!(log.methods(), vec![AUTH_CHECK_SESSION, AUTH_LOGIN]);

        let err = client.get_torrent_record().await.expect_err("auth failure");
        assert!(err.is_authentication());
        assert_eq!(
            log.methods(),
            vec![AUTH_CHECK_SESSION, AUTH_LOGIN, AUTH_CHECK_SESSION, AUTH_LOGIN]
        );
    }

    #[tokio::test]
    async fn failed_login_never_reads_pending_sources() {
        let (client, _) = stub_client(|_| rpc_ok(json!(false)));
        let polled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&polled);
        let err = client
            .add_torrent(
                TorrentSource::pending(async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(vec![1])
                }),
                TorrentConfig::default(),
            )
            .await
            .expect_err("auth failure");
        assert!(err.is_authentication());
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn status_requests_fixed_field_projection() -> Result<()> {
        let record = json!({
            "connected": true,
            "torrents": {"a1b2": {"name": "debian.iso", "state": "Seeding", "progress": 100.0}},
            "filters": {"state": [["All", 1]], "tracker_host": []},
            "stats": {"num_connections": 3}
        });
        let reply = record.clone();
        let (client, log) = stub_client(move |call| match call.method.as_str() {
            AUTH_CHECK_SESSION => rpc_ok(json!(true)),
            WEB_UPDATE_UI => rpc_ok(reply.clone()),
            other => panic!("unexpected call {other}"),
        });

        assert_eq!(client.get_torrent_record_raw().await?, record);
        let typed = client.get_torrent_record().await?;
        assert_eq!(
            typed.torrents.expect("torrents")["a1b2"].state.as_deref(),
            Some("Seeding")
        );

        let calls = log.calls();
        assert_eq!(calls[1].method, WEB_UPDATE_UI);
        assert_eq!(calls[1].params[0].as_array().map(Vec::len), Some(23));
        assert_eq!(calls[1].params[0][0], json!("distributed_copies"));
        assert_eq!(calls[1].params[0][22], json!("upload_payload_rate"));
        assert_eq!(calls[1].params[1], json!({}));
        Ok(())
    }
}
