//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server. The server
//! only queues commands; they are applied on the game loop's thread, so the
//! session keeps a single writer.

use anyhow::Context;
use arrayvec::ArrayVec;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::core::{GameDriver, GameObserver, GameState, Scheduler};
use crate::protocol::{
    create_ack, AckMessage, BoardSize, ErrorMessage, ObservationMessage, MAX_ACTIONS,
};
use crate::server::{build_observation, run_server, state_hash, ServerConfig};
use crate::types::GameAction;

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Actions(ArrayVec<GameAction, MAX_ACTIONS>),
    /// A client just said hello and wants the current state.
    SnapshotRequest,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Ack { client_id: usize, ack: AckMessage },
    Error { client_id: usize, err: ErrorMessage },
    Observation { client_id: usize, obs: ObservationMessage },
    BroadcastObservation { obs: ObservationMessage },
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Option<Runtime>,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    obs_seq: u64,
    last_hash: Option<u64>,
}

impl Adapter {
    /// Start the adapter from `BLOCKFALL_REMOTE_*` environment variables.
    ///
    /// Returns `Ok(None)` if `BLOCKFALL_REMOTE_DISABLED` is set.
    pub fn start_from_env(board: BoardSize) -> anyhow::Result<Option<Self>> {
        let config = ServerConfig::from_env();
        if config.disabled {
            eprintln!("[Adapter] Remote control disabled via BLOCKFALL_REMOTE_DISABLED");
            return Ok(None);
        }
        Self::start(ServerConfig { board, ..config }).map(Some)
    }

    /// Spawn the server on a private tokio runtime.
    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(config.max_pending_commands.max(1));
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();

        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("blockfall-adapter")
            .enable_all()
            .build()
            .context("failed to create tokio runtime")?;
        rt.spawn(async move {
            if let Err(e) = run_server(config, cmd_tx, out_rx, None).await {
                eprintln!("[Adapter] Server stopped: {:#}", e);
            }
        });

        let mut adapter = Self::from_channels(cmd_rx, out_tx);
        adapter._rt = Some(rt);
        Ok(adapter)
    }

    /// Wrap existing channels, e.g. ones connected to a server the caller runs.
    pub fn from_channels(
        cmd_rx: mpsc::Receiver<InboundCommand>,
        out_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        Self {
            _rt: None,
            cmd_rx,
            out_tx,
            obs_seq: 0,
            last_hash: None,
        }
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    fn next_seq(&mut self) -> u64 {
        self.obs_seq += 1;
        self.obs_seq
    }

    /// Apply every queued command through the driver. Each command is acked
    /// after its actions have been applied. Returns the number handled.
    pub fn apply_pending<S: Scheduler>(
        &mut self,
        driver: &mut GameDriver<S>,
        now_ms: u64,
        observer: &mut impl GameObserver,
    ) -> usize {
        let mut handled = 0;
        while let Some(cmd) = self.try_recv() {
            match cmd.payload {
                InboundPayload::Actions(actions) => {
                    for action in actions {
                        driver.handle_action(action, now_ms, observer);
                    }
                    self.send(OutboundMessage::Ack {
                        client_id: cmd.client_id,
                        ack: create_ack(cmd.seq),
                    });
                }
                InboundPayload::SnapshotRequest => {
                    let seq = self.next_seq();
                    let obs = build_observation(driver.state(), seq, None);
                    self.send(OutboundMessage::Observation {
                        client_id: cmd.client_id,
                        obs,
                    });
                }
            }
            handled += 1;
        }
        handled
    }

    /// Broadcast an observation if anything visible changed since the last one.
    /// Consumes the session's pending lock event.
    pub fn broadcast_if_changed(&mut self, state: &mut GameState) -> bool {
        let hash = state_hash(state);
        if self.last_hash == Some(hash) {
            return false;
        }
        self.last_hash = Some(hash);

        let seq = self.next_seq();
        let last_event = state.take_last_event();
        let obs = build_observation(state, seq, last_event);
        self.send(OutboundMessage::BroadcastObservation { obs });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FrameScheduler, GameConfig, NullObserver};
    use crate::protocol::AckStatus;

    fn adapter() -> (
        Adapter,
        mpsc::Sender<InboundCommand>,
        mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (Adapter::from_channels(cmd_rx, out_tx), cmd_tx, out_rx)
    }

    fn driver() -> GameDriver<FrameScheduler> {
        let state = GameState::new(GameConfig::default().with_seed(5)).unwrap();
        GameDriver::new(state, FrameScheduler::new())
    }

    #[test]
    fn actions_are_applied_then_acked() {
        let (mut adapter, cmd_tx, mut out_rx) = adapter();
        let mut d = driver();

        let actions = [GameAction::Start, GameAction::MoveLeft]
            .into_iter()
            .collect();
        cmd_tx
            .try_send(InboundCommand {
                client_id: 3,
                seq: 7,
                payload: InboundPayload::Actions(actions),
            })
            .unwrap();

        assert_eq!(adapter.apply_pending(&mut d, 0, &mut NullObserver), 1);
        assert!(d.state().phase().is_running());

        match out_rx.try_recv().unwrap() {
            OutboundMessage::Ack { client_id, ack } => {
                assert_eq!(client_id, 3);
                assert_eq!(ack.seq, 7);
                assert_eq!(ack.status, AckStatus::Ok);
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_request_answers_one_client() {
        let (mut adapter, cmd_tx, mut out_rx) = adapter();
        let mut d = driver();
        cmd_tx
            .try_send(InboundCommand {
                client_id: 2,
                seq: 1,
                payload: InboundPayload::SnapshotRequest,
            })
            .unwrap();

        adapter.apply_pending(&mut d, 0, &mut NullObserver);
        match out_rx.try_recv().unwrap() {
            OutboundMessage::Observation { client_id, obs } => {
                assert_eq!(client_id, 2);
                assert_eq!(obs.seq, 1);
            }
            other => panic!("expected observation, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_only_on_change() {
        let (mut adapter, _cmd_tx, mut out_rx) = adapter();
        let mut d = driver();
        d.start(0);

        assert!(adapter.broadcast_if_changed(d.state_mut()));
        assert!(!adapter.broadcast_if_changed(d.state_mut()));
        d.state_mut().apply_action(GameAction::MoveRight);
        assert!(adapter.broadcast_if_changed(d.state_mut()));

        let mut seqs = Vec::new();
        while let Ok(OutboundMessage::BroadcastObservation { obs }) = out_rx.try_recv() {
            seqs.push(obs.seq);
        }
        assert_eq!(seqs, vec![1, 2]);
    }
}
