use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::config::CosmosConfig;
use crate::error::{RecipebotError, Result};
use crate::gremlin::protocol::{status, RequestMessage, ResponseMessage};
use crate::gremlin::{GremlinTransport, Traversal};

/// Connection settings for a Gremlin endpoint
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Deadline for connecting and for each submitted traversal.
    pub timeout: Duration,
}

impl ConnectionSettings {
    /// Settings for a Cosmos DB Gremlin account.
    ///
    /// `https://` endpoints are rewritten to `wss://`; the SASL username is
    /// `/dbs/{database}/colls/{graph}`.
    pub fn from_cosmos(cosmos: &CosmosConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: websocket_url(&cosmos.endpoint)?,
            username: cosmos.username(),
            password: cosmos.key.clone(),
            timeout,
        })
    }
}

fn websocket_url(endpoint: &str) -> Result<String> {
    let mut url = url::Url::parse(endpoint)
        .map_err(|e| RecipebotError::Config(format!("Invalid COSMOSDB_ENDPOINT '{}': {}", endpoint, e)))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(RecipebotError::Config(format!(
                "Unsupported COSMOSDB_ENDPOINT scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RecipebotError::Config(format!("Cannot use scheme {} for {}", scheme, endpoint)))?;
    Ok(url.to_string())
}

struct Pending {
    items: Vec<Value>,
    reply: oneshot::Sender<Result<Vec<Value>>>,
}

type PendingMap = Arc<Mutex<HashMap<Uuid, Pending>>>;

/// One open WebSocket, multiplexed across callers by request id.
struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl Connection {
    async fn open(settings: &ConnectionSettings) -> Result<Self> {
        let connect = tokio_tungstenite::connect_async(settings.url.as_str());
        let (socket, _response) = tokio::time::timeout(settings.timeout, connect)
            .await
            .map_err(|_| RecipebotError::timeout("Gremlin connect", settings.timeout))?
            .map_err(|e| {
                RecipebotError::GraphConnection(format!("Failed to connect to {}: {}", settings.url, e))
            })?;

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let writer_alive = Arc::clone(&alive);
        // Exits once every sender is gone and the queue is drained, so a final Close still goes out.
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    log::error!("Gremlin socket write failed: {}", e);
                    writer_alive.store(false, Ordering::SeqCst);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_alive = Arc::clone(&alive);
        let reader_outbound = outbound.clone();
        let username = settings.username.clone();
        let password = settings.password.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let bytes = match frame {
                    Ok(Message::Text(text)) => text.into_bytes(),
                    Ok(Message::Binary(bytes)) => bytes,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        log::error!("Gremlin socket read failed: {}", e);
                        break;
                    }
                };
                match ResponseMessage::parse(&bytes) {
                    Ok(response) => {
                        dispatch(&reader_pending, &reader_outbound, &username, &password, response)
                    }
                    Err(e) => log::warn!("Dropping unreadable Gremlin frame: {}", e),
                }
            }
            reader_alive.store(false, Ordering::SeqCst);
            fail_all(&reader_pending, "Gremlin connection closed");
        });

        Ok(Self {
            outbound,
            pending,
            alive,
            reader,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    async fn submit(&self, traversal: &Traversal, timeout: Duration) -> Result<Vec<Value>> {
        let request = RequestMessage::eval(traversal);
        let request_id = request.request_id;
        let frame = request.to_frame()?;

        let (reply, receiver) = oneshot::channel();
        lock(&self.pending).insert(
            request_id,
            Pending {
                items: Vec::new(),
                reply,
            },
        );

        if self.outbound.send(Message::Binary(frame)).is_err() {
            lock(&self.pending).remove(&request_id);
            self.alive.store(false, Ordering::SeqCst);
            return Err(RecipebotError::GraphConnection(
                "Gremlin connection is closed".to_string(),
            ));
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RecipebotError::GraphConnection(
                "Gremlin connection dropped before a response arrived".to_string(),
            )),
            Err(_) => {
                lock(&self.pending).remove(&request_id);
                Err(RecipebotError::timeout("Gremlin submit", timeout))
            }
        }
    }

    fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
        self.alive.store(false, Ordering::SeqCst);
        self.reader.abort();
        fail_all(&self.pending, "Gremlin connection closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn lock(pending: &PendingMap) -> std::sync::MutexGuard<'_, HashMap<Uuid, Pending>> {
    // Recover from poisoning.
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Route one response to its waiting caller.
fn dispatch(
    pending: &PendingMap,
    outbound: &mpsc::UnboundedSender<Message>,
    username: &str,
    password: &str,
    response: ResponseMessage,
) {
    let Some(request_id) = response.request_uuid() else {
        log::warn!("Gremlin response without request id (status {})", response.status.code);
        return;
    };

    match response.status.code {
        status::AUTHENTICATE => {
            let auth = RequestMessage::authentication(request_id, username, password);
            match auth.to_frame() {
                Ok(frame) => {
                    let _ = outbound.send(Message::Binary(frame));
                }
                Err(e) => complete(pending, request_id, Err(e)),
            }
        }
        status::PARTIAL_CONTENT => {
            let mut map = lock(pending);
            if let Some(entry) = map.get_mut(&request_id) {
                entry.items.extend(response.into_items());
            }
        }
        status::SUCCESS | status::NO_CONTENT => {
            let items = response.into_items();
            let entry = lock(pending).remove(&request_id);
            if let Some(mut entry) = entry {
                entry.items.extend(items);
                let _ = entry.reply.send(Ok(entry.items));
            }
        }
        code => {
            let message = response.status.message;
            complete(pending, request_id, Err(RecipebotError::Graph { code, message }));
        }
    }
}

fn complete(pending: &PendingMap, request_id: Uuid, result: Result<Vec<Value>>) {
    if let Some(entry) = lock(pending).remove(&request_id) {
        let _ = entry.reply.send(result);
    }
}

fn fail_all(pending: &PendingMap, reason: &str) {
    let drained: Vec<Pending> = lock(pending).drain().map(|(_, p)| p).collect();
    for entry in drained {
        let _ = entry
            .reply
            .send(Err(RecipebotError::GraphConnection(reason.to_string())));
    }
}

/// Process-wide Gremlin client
///
/// Holds at most one live connection. The connection is opened eagerly with
/// [`GremlinClient::open`] or lazily by the first submission, and reopened on
/// the next submission after it drops.
pub struct GremlinClient {
    settings: ConnectionSettings,
    connection: tokio::sync::Mutex<Option<Arc<Connection>>>,
}

impl GremlinClient {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            connection: tokio::sync::Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Open the connection now instead of on first use.
    pub async fn open(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Close the connection; a later submission reconnects.
    pub async fn close(&self) {
        if let Some(conn) = self.connection.lock().await.take() {
            conn.close();
            log::info!("Gremlin connection closed");
        }
    }

    async fn connection(&self) -> Result<Arc<Connection>> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            if conn.is_alive() {
                return Ok(Arc::clone(conn));
            }
            log::warn!("Gremlin connection lost, reconnecting to {}", self.settings.url);
        }
        let conn = Arc::new(Connection::open(&self.settings).await?);
        log::info!("Connected to Gremlin endpoint {}", self.settings.url);
        *guard = Some(Arc::clone(&conn));
        Ok(conn)
    }
}

#[async_trait]
impl GremlinTransport for GremlinClient {
    async fn submit(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        let start = std::time::Instant::now();
        let result = match self.connection().await {
            Ok(conn) => conn.submit(traversal, self.settings.timeout).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(items) => log::debug!(
                "Gremlin query \"{}\" returned {} items in {:?}",
                traversal.to_inline_script(),
                items.len(),
                start.elapsed()
            ),
            Err(e) => log::error!(
                "Error executing Gremlin query \"{}\": {}",
                traversal.to_inline_script(),
                e
            ),
        }
        result
    }
}
