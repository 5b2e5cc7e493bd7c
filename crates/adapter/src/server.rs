//! TCP server for the remote adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking; the game state itself never crosses into
//! this module except through [`build_observation`].

use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::core::GameState;
use crate::protocol::*;
use crate::runtime::{InboundCommand, InboundPayload, OutboundMessage};
use crate::types::{LockEvent, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH};

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_pending_commands: usize,
    /// Append every wire line to this JSONL file.
    pub log_path: Option<String>,
    /// Board size announced in `welcome`.
    pub board: BoardSize,
    pub disabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            max_pending_commands: 10,
            log_path: None,
            board: BoardSize {
                width: DEFAULT_BOARD_WIDTH,
                height: DEFAULT_BOARD_HEIGHT,
            },
            disabled: false,
        }
    }
}

impl ServerConfig {
    /// Create from `BLOCKFALL_REMOTE_*` environment variables.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("BLOCKFALL_REMOTE_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = env::var("BLOCKFALL_REMOTE_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);
        let max_pending_commands = env::var("BLOCKFALL_REMOTE_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);
        let log_path = env::var("BLOCKFALL_REMOTE_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let disabled = env::var("BLOCKFALL_REMOTE_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            host,
            port,
            max_pending_commands,
            log_path,
            board: defaults.board,
            disabled,
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    handshaken: bool,
    stream_observations: bool,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ClientHandle {
    /// Record `seq` if it is strictly greater than the last one seen.
    fn accept_seq(&mut self, seq: u64) -> bool {
        if self.last_seq.is_some_and(|prev| seq <= prev) {
            return false;
        }
        self.last_seq = Some(seq);
        true
    }
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    /// Id of the controlling client. Lock before `clients` when taking both.
    controller: RwLock<Option<usize>>,
}

/// A message queued for one client's writer task.
#[derive(Debug, Clone)]
enum Outbound {
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(Arc<ObservationMessage>),
}

impl Outbound {
    fn encode(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        match self {
            Outbound::Welcome(m) => serde_json::to_writer(&mut *buf, m),
            Outbound::Ack(m) => serde_json::to_writer(&mut *buf, m),
            Outbound::Error(m) => serde_json::to_writer(&mut *buf, m),
            Outbound::Observation(m) => serde_json::to_writer(&mut *buf, m.as_ref()),
        }
    }
}

type WireLog = mpsc::UnboundedSender<Vec<u8>>;

/// Append wire lines to `path` from a dedicated task. Open or write failures
/// silently stop logging.
fn spawn_wire_log(path: String) -> WireLog {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path).await else {
            return;
        };
        while let Some(line) = rx.recv().await {
            if file.write_all(&line).await.is_err() {
                break;
            }
        }
        let _ = file.flush().await;
    });
    tx
}

/// Start the TCP server
///
/// Runs until the listener fails. `ready_tx` receives the bound address,
/// which is how callers using port 0 learn the real port.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log = config.log_path.clone().map(spawn_wire_log);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let bound = listener.local_addr()?;
    eprintln!("[Adapter] TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState {
        config,
        clients: RwLock::new(Vec::new()),
        controller: RwLock::new(None),
    });

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                let send_to = |client_id: usize, out: Outbound| {
                    if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                        let _ = c.tx.send(out);
                    }
                };
                match msg {
                    OutboundMessage::Ack { client_id, ack } => send_to(client_id, Outbound::Ack(ack)),
                    OutboundMessage::Error { client_id, err } => {
                        send_to(client_id, Outbound::Error(err))
                    }
                    OutboundMessage::Observation { client_id, obs } => {
                        send_to(client_id, Outbound::Observation(Arc::new(obs)))
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        let obs = Arc::new(obs);
                        for c in clients.iter().filter(|c| c.handshaken && c.stream_observations) {
                            let _ = c.tx.send(Outbound::Observation(Arc::clone(&obs)));
                        }
                    }
                }
            }
        });
    }

    let mut client_id_counter = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        eprintln!("[Adapter] Client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log = wire_log.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, state, command_tx, wire_log).await {
                eprintln!("[Adapter] Client {} error: {}", client_id, e);
            }
            eprintln!("[Adapter] Client {} disconnected", client_id);
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log: Option<WireLog>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    state.clients.write().await.push(ClientHandle {
        id: client_id,
        handshaken: false,
        stream_observations: false,
        last_seq: None,
        tx: tx.clone(),
    });

    let wire_log_out = wire_log.clone();
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if msg.encode(&mut buf).is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if let Some(log) = wire_log_out.as_ref() {
                let _ = log.send(buf.clone());
            }
        }
    });

    let result = read_loop(&mut reader, client_id, &state, &tx, &command_tx, wire_log.as_ref()).await;

    // Remove the client and release the controller role if it held it.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;
        clients.retain(|c| c.id != client_id);
        if *controller == Some(client_id) {
            *controller = None;
            eprintln!("[Adapter] Controller {} released", client_id);
        }
    }

    drop(tx);
    let _ = write_task.await;
    result
}

async fn read_loop(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    client_id: usize,
    state: &ServerState,
    tx: &mpsc::UnboundedSender<Outbound>,
    command_tx: &mpsc::Sender<InboundCommand>,
    wire_log: Option<&WireLog>,
) -> anyhow::Result<()> {
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        let raw = line.trim_end_matches(['\r', '\n']);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(log) = wire_log {
            let mut bytes = raw.as_bytes().to_vec();
            bytes.push(b'\n');
            let _ = log.send(bytes);
        }

        let keep_open = match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                on_hello(state, client_id, hello, tx, command_tx).await
            }
            Ok(ParsedMessage::Command(cmd)) => {
                on_command(state, client_id, cmd, tx, command_tx).await;
                true
            }
            Ok(ParsedMessage::Unknown(m)) => {
                let err = create_error(m.seq, ErrorCode::InvalidCommand, "Unknown message type");
                let _ = tx.send(Outbound::Error(err));
                true
            }
            Err(e) => {
                let seq = extract_seq(trimmed).unwrap_or(0);
                let err = create_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {}", e),
                );
                let _ = tx.send(Outbound::Error(err));
                true
            }
        };

        if !keep_open {
            return Ok(());
        }
    }
}

/// Returns false when the connection should be closed.
async fn on_hello(
    state: &ServerState,
    client_id: usize,
    hello: HelloMessage,
    tx: &mpsc::UnboundedSender<Outbound>,
    command_tx: &mpsc::Sender<InboundCommand>,
) -> bool {
    if !is_compatible_version(&hello.protocol_version) {
        let err = create_error(
            hello.seq,
            ErrorCode::ProtocolMismatch,
            &format!("Protocol version {} not supported", hello.protocol_version),
        );
        let _ = tx.send(Outbound::Error(err));
        return false;
    }

    let mut controller = state.controller.write().await;
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return false;
    };

    if client.handshaken && !client.accept_seq(hello.seq) {
        let err = create_error(
            hello.seq,
            ErrorCode::InvalidCommand,
            "seq must be strictly increasing",
        );
        let _ = tx.send(Outbound::Error(err));
        return true;
    }

    client.handshaken = true;
    client.last_seq = Some(hello.seq);
    client.stream_observations = hello.requested.stream_observations;

    // First client to hello becomes controller.
    if controller.is_none() {
        *controller = Some(client_id);
        eprintln!("[Adapter] Client {} is now controller", client_id);
    }
    let role = if *controller == Some(client_id) {
        AssignedRole::Controller
    } else {
        AssignedRole::Observer
    };

    let welcome = create_welcome(
        hello.seq,
        client_id as u64,
        role,
        (*controller).map(|id| id as u64),
        state.config.board,
    );
    let _ = tx.send(Outbound::Welcome(welcome));

    // Queued after the welcome, so the first observation follows it.
    if client.stream_observations {
        let request = InboundCommand {
            client_id,
            seq: hello.seq,
            payload: InboundPayload::SnapshotRequest,
        };
        if command_tx.try_send(request).is_err() {
            let err = create_error(
                hello.seq,
                ErrorCode::Backpressure,
                "Command queue is full; no initial observation",
            );
            let _ = tx.send(Outbound::Error(err));
        }
    }
    true
}

async fn on_command(
    state: &ServerState,
    client_id: usize,
    cmd: CommandMessage,
    tx: &mpsc::UnboundedSender<Outbound>,
    command_tx: &mpsc::Sender<InboundCommand>,
) {
    let rejected = {
        let controller = state.controller.read().await;
        let mut clients = state.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return;
        };

        if !client.handshaken {
            Some((ErrorCode::HandshakeRequired, "Send hello before command"))
        } else if !client.accept_seq(cmd.seq) {
            Some((ErrorCode::InvalidCommand, "seq must be strictly increasing"))
        } else if *controller != Some(client_id) {
            Some((ErrorCode::NotController, "Only the controller may send commands"))
        } else {
            None
        }
    };

    if let Some((code, message)) = rejected {
        let _ = tx.send(Outbound::Error(create_error(cmd.seq, code, message)));
        return;
    }

    // Backpressure: bounded queue. The game loop acks after applying.
    let inbound = InboundCommand {
        client_id,
        seq: cmd.seq,
        payload: InboundPayload::Actions(cmd.actions.0),
    };
    if command_tx.try_send(inbound).is_err() {
        let err = create_error(cmd.seq, ErrorCode::Backpressure, "Command queue is full");
        let _ = tx.send(Outbound::Error(err));
    }
}

/// Hash of everything an observer can see, excluding timers.
pub fn state_hash(game_state: &GameState) -> u64 {
    let mut hasher = Fnv1aHasher::new();
    game_state.board().cells().hash(&mut hasher);
    game_state.active().hash(&mut hasher);
    game_state.phase().hash(&mut hasher);
    game_state.score().hash(&mut hasher);
    game_state.episode_id().hash(&mut hasher);
    game_state.piece_id().hash(&mut hasher);
    hasher.finish()
}

/// Build observation message from game state
pub fn build_observation(
    game_state: &GameState,
    seq: u64,
    last_event: Option<LockEvent>,
) -> ObservationMessage {
    let board = game_state.board();
    let phase = game_state.phase();

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        phase: phase.into(),
        playable: phase.is_running(),
        episode_id: game_state.episode_id(),
        piece_id: game_state.piece_id(),
        score: game_state.score(),
        board: BoardSnapshot {
            width: board.width(),
            height: board.height(),
            cells: board.rows().map(<[u8]>::to_vec).collect(),
        },
        active: game_state.active().map(|piece| ActivePieceSnapshot {
            kind: piece.kind.into(),
            x: piece.pos.x,
            y: piece.pos.y,
            shape: piece.shape.rows().map(<[u8]>::to_vec).collect(),
        }),
        last_event: last_event.map(LastEvent::from),
        state_hash: StateHash(state_hash(game_state)),
    }
}
