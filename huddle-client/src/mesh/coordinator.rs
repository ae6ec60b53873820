use crate::engine::{MediaEngine, SignalSink};
use crate::media::{MediaTrack, VideoPublisher};
use crate::mesh::link::{LinkCommand, LinkHandle, NegotiationState, PeerLink};
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{ServerMessage, UserId};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Local-only conditions the application may want to surface. None of
/// these produce network traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshNotice {
    /// Track replacement failed twice on this link; it keeps publishing
    /// frozen or no video.
    LinkVideoDegraded { remote: UserId },
}

/// Client-side owner of the full-mesh peer links: one per other room
/// member, each negotiated independently and worked by its own task.
///
/// Initiator rule: when we are told a *new* participant joined, we (the
/// already-present side) offer toward them. The newcomer only ever
/// answers. For any pair exactly one side offers, so simultaneous offers
/// cannot happen.
pub struct MeshCoordinator {
    local: UserId,
    engine: Arc<dyn MediaEngine>,
    sink: Arc<dyn SignalSink>,
    links: DashMap<UserId, LinkHandle>,
    tracks: Mutex<Vec<Arc<MediaTrack>>>,
    notices: mpsc::UnboundedSender<MeshNotice>,
}

impl MeshCoordinator {
    pub fn new(
        local: UserId,
        engine: Arc<dyn MediaEngine>,
        sink: Arc<dyn SignalSink>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<MeshNotice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                local,
                engine,
                sink,
                links: DashMap::new(),
                tracks: Mutex::new(Vec::new()),
                notices,
            }),
            notice_rx,
        )
    }

    pub fn local_user(&self) -> &UserId {
        &self.local
    }

    /// Set the tracks every subsequently created link will publish.
    pub fn set_local_tracks(&self, tracks: Vec<Arc<MediaTrack>>) {
        *self.tracks.lock().expect("track snapshot poisoned") = tracks;
    }

    /// Route one inbound signaling event to the mesh.
    pub async fn handle_signal(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::UserJoined { user_id, user_name } => {
                self.on_user_joined(user_id, user_name).await;
            }
            ServerMessage::UserLeft { user_id } => self.on_user_left(user_id).await,
            ServerMessage::WebrtcOffer {
                offer,
                target_user_id,
                from_user_id,
            } => {
                if self.addressed_to_us(&target_user_id) {
                    self.on_offer(from_user_id, offer).await;
                }
            }
            ServerMessage::WebrtcAnswer {
                answer,
                target_user_id,
                from_user_id,
            } => {
                if self.addressed_to_us(&target_user_id) {
                    self.on_answer(from_user_id, answer).await;
                }
            }
            ServerMessage::IceCandidate {
                candidate,
                target_user_id,
                from_user_id,
            } => {
                if self.addressed_to_us(&target_user_id) {
                    self.on_candidate(from_user_id, candidate).await;
                }
            }
            // Chat rides the same socket but is not the mesh's business.
            ServerMessage::ChatMessage { .. } => {}
        }
    }

    /// A newcomer appeared: we initiate toward them.
    async fn on_user_joined(&self, user_id: UserId, user_name: String) {
        if user_id == self.local {
            return;
        }
        if self.links.contains_key(&user_id) {
            warn!(remote = %user_id, "link already exists for joining user; keeping it");
            return;
        }
        info!(remote = %user_id, name = %user_name, "new participant, initiating link");

        let Some(link) = self.create_link(user_id.clone()).await else {
            return;
        };
        link.send(LinkCommand::Initiate).await;
    }

    /// Inbound offer: we are the newcomer side for this pair and answer.
    async fn on_offer(&self, from: UserId, offer: serde_json::Value) {
        let link = match self.links.get(&from) {
            Some(existing) => existing.value().clone(),
            None => match self.create_link(from.clone()).await {
                Some(link) => link,
                None => return,
            },
        };
        link.send(LinkCommand::RemoteOffer(offer)).await;
    }

    /// An answer for a link we never offered on is a protocol violation;
    /// non-fatal, logged and dropped.
    async fn on_answer(&self, from: UserId, answer: serde_json::Value) {
        let Some(link) = self.links.get(&from).map(|l| l.value().clone()) else {
            warn!(remote = %from, "protocol violation: answer for unknown link, dropping");
            return;
        };
        link.send(LinkCommand::RemoteAnswer(answer)).await;
    }

    async fn on_candidate(&self, from: UserId, candidate: serde_json::Value) {
        let Some(link) = self.links.get(&from).map(|l| l.value().clone()) else {
            // Routine after a leave; candidates straggle.
            debug!(remote = %from, "candidate for unknown link, dropping");
            return;
        };
        link.send(LinkCommand::RemoteCandidate(candidate)).await;
    }

    async fn on_user_left(&self, user_id: UserId) {
        let Some((_, link)) = self.links.remove(&user_id) else {
            return;
        };
        info!(remote = %user_id, "participant left, closing link");
        link.send(LinkCommand::Close).await;
    }

    /// Swap the outgoing video track on every live link, in place. Audio
    /// is untouched and no link is closed or renegotiated.
    pub async fn replace_video_track(&self, track: Arc<MediaTrack>) {
        {
            let mut tracks = self.tracks.lock().expect("track snapshot poisoned");
            tracks.retain(|t| !t.is_video());
            tracks.push(track.clone());
        }

        let links: Vec<LinkHandle> = self.links.iter().map(|e| e.value().clone()).collect();
        for link in links {
            link.send(LinkCommand::ReplaceVideoTrack(track.clone())).await;
        }
    }

    /// Close every link. Used when leaving the room and on reconnect:
    /// mesh state is never carried across a signaling gap.
    pub async fn shutdown(&self) {
        let drained: Vec<(UserId, LinkHandle)> = {
            let mut out = Vec::new();
            let keys: Vec<UserId> = self.links.iter().map(|e| e.key().clone()).collect();
            for key in keys {
                if let Some(entry) = self.links.remove(&key) {
                    out.push(entry);
                }
            }
            out
        };
        for (user, link) in drained {
            debug!(remote = %user, "closing link on shutdown");
            link.send(LinkCommand::Close).await;
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link(&self, user: &UserId) -> Option<LinkHandle> {
        self.links.get(user).map(|l| l.value().clone())
    }

    pub fn link_states(&self) -> Vec<(UserId, NegotiationState)> {
        self.links
            .iter()
            .map(|e| (e.key().clone(), e.value().state()))
            .collect()
    }

    fn addressed_to_us(&self, target: &UserId) -> bool {
        if target == &self.local {
            return true;
        }
        debug!(target = %target, "misrouted directed message, dropping");
        false
    }

    async fn create_link(&self, remote: UserId) -> Option<LinkHandle> {
        let pc = match self.engine.create_connection().await {
            Ok(pc) => pc,
            Err(e) => {
                warn!(remote = %remote, error = %e, "engine failed to create connection");
                return None;
            }
        };
        let tracks = self.tracks.lock().expect("track snapshot poisoned").clone();
        let link = PeerLink::spawn(
            self.local.clone(),
            remote.clone(),
            pc,
            self.sink.clone(),
            tracks,
            self.notices.clone(),
        );
        self.links.insert(remote, link.clone());
        Some(link)
    }
}

#[async_trait]
impl VideoPublisher for MeshCoordinator {
    async fn replace_video_track(&self, track: Arc<MediaTrack>) {
        MeshCoordinator::replace_video_track(self, track).await;
    }
}
