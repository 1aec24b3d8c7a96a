use crate::rpc::{
    Ignored, RpcRequest, RpcResponse, TorrentAddArgs, TorrentAddResult, TorrentGetArgs,
    TorrentGetResult, TorrentIdsArgs, TorrentRemoveArgs, TORRENT_FIELDS,
};
use reqwest::{Client, StatusCode};
use seedgate_core::{
    AddedTorrent, CoreError, TorrentClient, TorrentClientError, TorrentRecord,
    TransmissionSettings,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// JSON-RPC client for a Transmission daemon.
#[derive(Debug)]
pub struct TransmissionClient {
    http_client: Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    /// Builds the client; no request is made until the first call.
    pub fn connect(settings: &TransmissionSettings) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(Self {
            http_client,
            endpoint: settings.endpoint(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            session_id: RwLock::new(None),
        })
    }

    async fn call<A, R>(&self, method: &str, arguments: A) -> Result<R, CoreError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest { method, arguments };

        // The first 409 hands out the session id, so one retry is enough.
        for _ in 0..2 {
            let mut builder = self.http_client.post(&self.endpoint).json(&request);
            if let Some(session_id) = self.session_id.read().await.as_deref() {
                builder = builder.header(SESSION_ID_HEADER, session_id);
            }
            if let Some(username) = &self.username {
                builder = builder.basic_auth(username, self.password.as_deref());
            }

            debug!("Calling Transmission RPC method {}", method);
            let response = builder.send().await.map_err(|e| self.transport_error(e))?;

            match response.status() {
                StatusCode::CONFLICT => {
                    let session_id = response
                        .headers()
                        .get(SESSION_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .ok_or_else(|| TorrentClientError::SessionHandshakeFailed {
                            reason: "409 response without a session id".to_string(),
                        })?;
                    debug!("Received new Transmission session id");
                    *self.session_id.write().await = Some(session_id.to_string());
                    continue;
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    error!("Transmission rejected credentials for {}", method);
                    return Err(TorrentClientError::AuthenticationFailed.into());
                }
                status if status.is_server_error() => {
                    return Err(TorrentClientError::ServerError {
                        status_code: status.as_u16(),
                    }
                    .into());
                }
                status if !status.is_success() => {
                    return Err(TorrentClientError::InvalidResponse {
                        details: format!("unexpected HTTP status {} for {}", status, method),
                    }
                    .into());
                }
                _ => {}
            }

            let envelope: RpcResponse<R> = response.json().await.map_err(|e| {
                TorrentClientError::InvalidResponse {
                    details: format!("failed to decode {} response: {}", method, e),
                }
            })?;

            if envelope.result != "success" {
                return Err(TorrentClientError::RpcFailed {
                    method: method.to_string(),
                    result: envelope.result,
                }
                .into());
            }

            return envelope.arguments.ok_or_else(|| {
                TorrentClientError::InvalidResponse {
                    details: format!("{} response has no arguments", method),
                }
                .into()
            });
        }

        Err(TorrentClientError::SessionHandshakeFailed {
            reason: "session id rejected twice in a row".to_string(),
        }
        .into())
    }

    async fn fetch_torrents(&self, ids: Option<Vec<i64>>) -> Result<Vec<TorrentRecord>, CoreError> {
        let result: TorrentGetResult = self
            .call(
                "torrent-get",
                TorrentGetArgs {
                    fields: TORRENT_FIELDS,
                    ids,
                },
            )
            .await?;

        Ok(result.torrents.into_iter().map(TorrentRecord::from).collect())
    }

    fn transport_error(&self, error: reqwest::Error) -> CoreError {
        if error.is_connect() || error.is_timeout() {
            TorrentClientError::Connectivity {
                endpoint: self.endpoint.clone(),
                reason: error.to_string(),
            }
            .into()
        } else {
            CoreError::Network(error)
        }
    }
}

impl TorrentClient for TransmissionClient {
    async fn probe(&self) -> Result<(), CoreError> {
        match self.call::<_, Ignored>("session-stats", json!({})).await {
            Ok(_) => {
                info!("Connected to Transmission at {}", self.endpoint);
                Ok(())
            }
            Err(CoreError::TorrentClient(TorrentClientError::Connectivity { endpoint, reason })) => {
                Err(TorrentClientError::Connectivity { endpoint, reason }.into())
            }
            Err(e) => Err(TorrentClientError::Connectivity {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn add(&self, link: &str) -> Result<AddedTorrent, CoreError> {
        let result: TorrentAddResult = self
            .call(
                "torrent-add",
                TorrentAddArgs {
                    filename: link,
                    paused: true,
                },
            )
            .await
            .map_err(|e| TorrentClientError::AddTorrentFailed {
                link: link.to_string(),
                reason: e.to_string(),
            })?;

        let added = match (result.added, result.duplicate) {
            (Some(torrent), _) => AddedTorrent {
                id: torrent.id,
                name: torrent.name,
                duplicate: false,
            },
            (None, Some(torrent)) => {
                warn!("Transmission already knows {} as torrent {}", link, torrent.id);
                AddedTorrent {
                    id: torrent.id,
                    name: torrent.name,
                    duplicate: true,
                }
            }
            (None, None) => {
                return Err(TorrentClientError::AddTorrentFailed {
                    link: link.to_string(),
                    reason: "response names neither an added nor a duplicate torrent".to_string(),
                }
                .into())
            }
        };

        info!("Added torrent: {} (id {})", link, added.id);
        Ok(added)
    }

    async fn get(&self, id: i64) -> Result<TorrentRecord, CoreError> {
        self.fetch_torrents(Some(vec![id]))
            .await?
            .into_iter()
            .find(|torrent| torrent.id == id)
            .ok_or_else(|| TorrentClientError::TorrentNotFound { id }.into())
    }

    async fn list(&self) -> Result<Vec<TorrentRecord>, CoreError> {
        self.fetch_torrents(None).await
    }

    async fn start(&self, id: i64) -> Result<(), CoreError> {
        self.call::<_, Ignored>("torrent-start", TorrentIdsArgs { ids: vec![id] })
            .await?;
        debug!("Started torrent {}", id);
        Ok(())
    }

    async fn remove(&self, id: i64, delete_data: bool) -> Result<(), CoreError> {
        self.call::<_, Ignored>(
            "torrent-remove",
            TorrentRemoveArgs {
                ids: vec![id],
                delete_local_data: delete_data,
            },
        )
        .await?;
        info!("Removed torrent {} from Transmission", id);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
