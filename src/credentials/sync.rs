//! Remote refresh of the candidate network list

use super::store::CredentialStore;
use crate::transport::HttpClient;
use tracing::{debug, info, warn};
use tracker_shared::codec::{self, CodecError};
use tracker_shared::{ConnectionState, CredentialList};

/// Errors from a directory fetch
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no network link")]
    NoLink,

    #[error("directory answered HTTP {0}")]
    Status(u16),

    #[error("directory request failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("directory returned a malformed list: {0}")]
    Parse(#[from] CodecError),
}

/// Directory endpoint settings
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub url: String,
    pub api_key: String,
}

/// Fetches the candidate list from the remote directory service
pub struct CredentialSync<H: HttpClient> {
    client: H,
    config: DirectoryConfig,
}

impl<H: HttpClient> CredentialSync<H> {
    pub fn new(client: H, config: DirectoryConfig) -> Self {
        Self { client, config }
    }

    /// GET the list. No request is made unless `link` is Connected.
    pub async fn fetch_remote_list(&self, link: ConnectionState) -> Result<CredentialList, SyncError> {
        if link != ConnectionState::Connected {
            return Err(SyncError::NoLink);
        }

        let query = codec::directory_query(&self.config.api_key);
        let response = self
            .client
            .get(&self.config.url, &query)
            .await
            .map_err(SyncError::Transport)?;

        if !response.is_success() {
            return Err(SyncError::Status(response.status));
        }

        Ok(codec::decode_credentials(&response.body)?)
    }

    /// Fetch the list, and on success replace `list` and persist it.
    ///
    /// On any failure `list` and the stored document are left untouched.
    /// Returns the number of networks now in `list`.
    pub async fn refresh(
        &self,
        link: ConnectionState,
        list: &mut CredentialList,
        store: &CredentialStore,
    ) -> Result<usize, SyncError> {
        let fetched = match self.fetch_remote_list(link).await {
            Ok(fetched) => fetched,
            Err(SyncError::NoLink) => {
                debug!("[SYNC] Skipping directory fetch: no link");
                return Err(SyncError::NoLink);
            }
            Err(e) => {
                warn!("[SYNC] Failed to fetch network list: {}", e);
                return Err(e);
            }
        };

        info!("[SYNC] Fetched {} networks from directory", fetched.len());
        *list = fetched;

        if let Err(e) = store.save(list).await {
            warn!("[SYNC] Failed to persist network list: {}", e);
        }

        Ok(list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHttp;
    use tracker_shared::NetworkCredential;

    const URL: &str = "http://directory.test/wifi";

    fn sync(http: &FakeHttp) -> CredentialSync<FakeHttp> {
        CredentialSync::new(
            http.clone(),
            DirectoryConfig {
                url: URL.into(),
                api_key: "k3y".into(),
            },
        )
    }

    fn existing() -> CredentialList {
        vec![NetworkCredential::new("old", "list")]
    }

    #[tokio::test]
    async fn test_no_link_makes_no_request() {
        let http = FakeHttp::new();
        let result = sync(&http).fetch_remote_list(ConnectionState::Backoff).await;

        assert!(matches!(result, Err(SyncError::NoLink)));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_sends_key() {
        let http = FakeHttp::new();
        http.respond(URL, 200, br#"[{"ssid":"a","password":"b"}]"#);

        let list = sync(&http)
            .fetch_remote_list(ConnectionState::Connected)
            .await
            .expect("fetch");

        assert_eq!(list, vec![NetworkCredential::new("a", "b")]);
        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, URL);
        assert_eq!(requests[0].query, vec![("key", "k3y".to_string())]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join("wifi.json"));
        let http = FakeHttp::new();
        http.respond(
            URL,
            200,
            br#"[{"ssid":"north","password":"1"},{"ssid":"south","password":"2"}]"#,
        );

        let mut list = existing();
        let count = sync(&http)
            .refresh(ConnectionState::Connected, &mut list, &store)
            .await
            .expect("refresh");

        let expected = vec![
            NetworkCredential::new("north", "1"),
            NetworkCredential::new("south", "2"),
        ];
        assert_eq!(count, 2);
        assert_eq!(list, expected);
        assert_eq!(store.load().await, expected);
    }

    #[tokio::test]
    async fn test_malformed_response_leaves_list_and_storage_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wifi.json");
        let store = CredentialStore::new(&path);
        let http = FakeHttp::new();
        http.respond(URL, 200, br#"[{"ssid":"north"}"#);

        let mut list = existing();
        let result = sync(&http)
            .refresh(ConnectionState::Connected, &mut list, &store)
            .await;

        assert!(matches!(result, Err(SyncError::Parse(_))));
        assert_eq!(list, existing());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_error_status_leaves_list_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join("wifi.json"));
        let http = FakeHttp::new();
        http.respond(URL, 503, br#"[{"ssid":"north","password":"1"}]"#);

        let mut list = existing();
        let result = sync(&http)
            .refresh(ConnectionState::Connected, &mut list, &store)
            .await;

        assert!(matches!(result, Err(SyncError::Status(503))));
        assert_eq!(list, existing());
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_list_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join("wifi.json"));
        let http = FakeHttp::new();
        http.fail(URL);

        let mut list = existing();
        let result = sync(&http)
            .refresh(ConnectionState::Connected, &mut list, &store)
            .await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
        assert_eq!(list, existing());
    }

    #[tokio::test]
    async fn test_empty_remote_list_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::new(dir.path().join("wifi.json"));
        let http = FakeHttp::new();
        http.respond(URL, 200, b"[]");

        let mut list = existing();
        let count = sync(&http)
            .refresh(ConnectionState::Connected, &mut list, &store)
            .await
            .expect("refresh");

        assert_eq!(count, 0);
        assert!(list.is_empty());
        assert!(matches!(store.try_load().await, Ok(Some(l)) if l.is_empty()));
    }
}
