use crate::engine::{PeerConnection, SignalSink};
use crate::media::MediaTrack;
use crate::mesh::coordinator::MeshNotice;
use huddle_core::{ClientMessage, UserId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const LINK_QUEUE_DEPTH: usize = 64;

/// Per-link negotiation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    Connected,
    Closed,
}

/// Inbound work for one link, processed strictly in arrival order by the
/// link's worker task. This is what keeps local/remote description
/// updates on a single link from racing.
#[derive(Debug)]
pub(crate) enum LinkCommand {
    /// We are the designated initiator toward this peer: attach tracks,
    /// create an offer and send it.
    Initiate,
    RemoteOffer(Value),
    RemoteAnswer(Value),
    RemoteCandidate(Value),
    ReplaceVideoTrack(Arc<MediaTrack>),
    Close,
}

/// Coordinator-side handle to a link worker.
#[derive(Clone)]
pub struct LinkHandle {
    remote: UserId,
    tx: mpsc::Sender<LinkCommand>,
    state: watch::Receiver<NegotiationState>,
}

impl LinkHandle {
    pub fn remote(&self) -> &UserId {
        &self.remote
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    /// Block until the link reaches `target` (or its worker is gone).
    pub async fn wait_for(&self, target: NegotiationState) {
        let mut rx = self.state.clone();
        loop {
            if *rx.borrow_and_update() == target {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub(crate) async fn send(&self, cmd: LinkCommand) -> bool {
        if self.tx.send(cmd).await.is_err() {
            debug!(remote = %self.remote, "link worker already gone; dropping command");
            return false;
        }
        true
    }
}

pub(crate) struct PeerLink;

impl PeerLink {
    /// Spawn the worker that owns the peer connection for `remote`.
    pub(crate) fn spawn(
        local: UserId,
        remote: UserId,
        pc: Box<dyn PeerConnection>,
        sink: Arc<dyn SignalSink>,
        tracks: Vec<Arc<MediaTrack>>,
        notices: mpsc::UnboundedSender<MeshNotice>,
    ) -> LinkHandle {
        let (tx, rx) = mpsc::channel(LINK_QUEUE_DEPTH);
        let (state_tx, state_rx) = watch::channel(NegotiationState::Idle);

        let worker = LinkWorker {
            local,
            remote: remote.clone(),
            pc,
            sink,
            state_tx,
            rx,
            tracks,
            tracks_attached: false,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            notices,
        };
        tokio::spawn(worker.run());

        LinkHandle {
            remote,
            tx,
            state: state_rx,
        }
    }
}

struct LinkWorker {
    local: UserId,
    remote: UserId,
    pc: Box<dyn PeerConnection>,
    sink: Arc<dyn SignalSink>,
    state_tx: watch::Sender<NegotiationState>,
    rx: mpsc::Receiver<LinkCommand>,
    /// Local track snapshot taken when the link was created.
    tracks: Vec<Arc<MediaTrack>>,
    tracks_attached: bool,
    remote_description_set: bool,
    /// Candidates that arrived before the remote description; applied in
    /// arrival order the moment it lands.
    pending_candidates: Vec<Value>,
    notices: mpsc::UnboundedSender<MeshNotice>,
}

impl LinkWorker {
    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            if matches!(cmd, LinkCommand::Close) {
                break;
            }
            self.handle(cmd).await;
        }

        self.pc.close().await;
        self.set_state(NegotiationState::Closed);
        debug!(remote = %self.remote, "peer link closed");
    }

    async fn handle(&mut self, cmd: LinkCommand) {
        match cmd {
            LinkCommand::Initiate => self.initiate().await,
            LinkCommand::RemoteOffer(offer) => self.on_offer(offer).await,
            LinkCommand::RemoteAnswer(answer) => self.on_answer(answer).await,
            LinkCommand::RemoteCandidate(candidate) => self.on_candidate(candidate).await,
            LinkCommand::ReplaceVideoTrack(track) => self.replace_video(track).await,
            LinkCommand::Close => unreachable!("Close is handled by the run loop"),
        }
    }

    async fn initiate(&mut self) {
        if self.state() != NegotiationState::Idle {
            warn!(remote = %self.remote, state = ?self.state(), "ignoring duplicate initiate");
            return;
        }
        if !self.attach_tracks().await {
            return;
        }

        let offer = match self.pc.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                warn!(remote = %self.remote, error = %e, "failed to create offer");
                return;
            }
        };
        if let Err(e) = self.pc.set_local_description(offer.clone()).await {
            warn!(remote = %self.remote, error = %e, "failed to set local offer");
            return;
        }

        self.sink
            .send(ClientMessage::WebrtcOffer {
                offer,
                target_user_id: self.remote.clone(),
                from_user_id: self.local.clone(),
            })
            .await;
        self.set_state(NegotiationState::OfferSent);
        info!(remote = %self.remote, "offer sent");
    }

    async fn on_offer(&mut self, offer: Value) {
        if self.state() == NegotiationState::OfferSent {
            // The initiator rule makes this unreachable absent a protocol
            // bug on the far side; answer it anyway rather than deadlock.
            warn!(remote = %self.remote, "offer received while our own offer is in flight");
        }
        self.set_state(NegotiationState::OfferReceived);

        if !self.attach_tracks().await {
            return;
        }
        if let Err(e) = self.pc.set_remote_description(offer).await {
            warn!(remote = %self.remote, error = %e, "failed to set remote offer");
            return;
        }
        self.mark_remote_description_set().await;

        let answer = match self.pc.create_answer().await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(remote = %self.remote, error = %e, "failed to create answer");
                return;
            }
        };
        if let Err(e) = self.pc.set_local_description(answer.clone()).await {
            warn!(remote = %self.remote, error = %e, "failed to set local answer");
            return;
        }

        self.sink
            .send(ClientMessage::WebrtcAnswer {
                answer,
                target_user_id: self.remote.clone(),
                from_user_id: self.local.clone(),
            })
            .await;
        self.set_state(NegotiationState::Connected);
        info!(remote = %self.remote, "answered offer, link connected");
    }

    async fn on_answer(&mut self, answer: Value) {
        if let Err(e) = self.pc.set_remote_description(answer).await {
            warn!(remote = %self.remote, error = %e, "failed to set remote answer");
            return;
        }
        self.mark_remote_description_set().await;
        self.set_state(NegotiationState::Connected);
        info!(remote = %self.remote, "answer applied, link connected");
    }

    async fn on_candidate(&mut self, candidate: Value) {
        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return;
        }
        if let Err(e) = self.pc.add_ice_candidate(candidate).await {
            warn!(remote = %self.remote, error = %e, "failed to add ICE candidate");
        }
    }

    /// Flush queued candidates in their original arrival order.
    async fn mark_remote_description_set(&mut self) {
        self.remote_description_set = true;
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.pc.add_ice_candidate(candidate).await {
                warn!(remote = %self.remote, error = %e, "failed to apply queued ICE candidate");
            }
        }
    }

    async fn replace_video(&mut self, track: Arc<MediaTrack>) {
        if self.pc.replace_video_track(track.clone()).await.is_ok() {
            return;
        }
        // One retry, then the link keeps running with degraded video.
        // No network message exists for this condition.
        if let Err(e) = self.pc.replace_video_track(track).await {
            warn!(remote = %self.remote, error = %e, "track replacement failed twice; video degraded");
            let _ = self.notices.send(MeshNotice::LinkVideoDegraded {
                remote: self.remote.clone(),
            });
        }
    }

    async fn attach_tracks(&mut self) -> bool {
        if self.tracks_attached {
            return true;
        }
        for track in self.tracks.clone() {
            if let Err(e) = self.pc.attach_track(track).await {
                warn!(remote = %self.remote, error = %e, "failed to attach local track");
                return false;
            }
        }
        self.tracks_attached = true;
        true
    }

    fn state(&self) -> NegotiationState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: NegotiationState) {
        let _ = self.state_tx.send(state);
    }
}
