//! Room table for the relay
//!
//! One room per meeting, holding the outbound channel of every connected
//! peer. A room exists only while it has peers.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use tether_core::{ids, AccessError};

use crate::messages::ServerMessage;

/// Outbound queue of one peer connection
pub type PeerSender = mpsc::UnboundedSender<ServerMessage>;

/// Connected peers of one meeting
#[derive(Default)]
pub struct Room {
    peers: HashMap<String, PeerSender>,
}

impl Room {
    /// Deliver to every peer except `except`
    ///
    /// Peers whose connection has gone away are skipped without error.
    pub fn broadcast(&self, msg: &ServerMessage, except: Option<&str>) -> usize {
        self.peers
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != except)
            .filter(|(_, tx)| tx.send(msg.clone()).is_ok())
            .count()
    }

    pub fn peer_ids(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    fn mint_peer_id(&self) -> Result<String, AccessError> {
        loop {
            let id = ids::peer_id()?;
            if !self.peers.contains_key(&id) {
                return Ok(id);
            }
        }
    }
}

/// All rooms by meeting id
#[derive(Default)]
pub struct Rooms {
    rooms: DashMap<String, Room>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer to a meeting's room, creating the room if needed
    ///
    /// The new peer is sent `hello` listing the others, and the others are
    /// sent `peer-join`. Id minting, insertion and both notifications happen
    /// under the room's lock, so a concurrent join can never reach the new
    /// peer ahead of its `hello`.
    pub fn join(&self, meeting_id: &str, tx: PeerSender) -> Result<String, AccessError> {
        let joined = {
            let mut room = self.rooms.entry(meeting_id.to_string()).or_default();
            room.mint_peer_id().map(|peer_id| {
                let peers = room.peer_ids();
                let _ = tx.send(ServerMessage::Hello {
                    peer_id: peer_id.clone(),
                    peers,
                });
                room.peers.insert(peer_id.clone(), tx);
                room.broadcast(
                    &ServerMessage::PeerJoin {
                        peer_id: peer_id.clone(),
                    },
                    Some(&peer_id),
                );
                peer_id
            })
        };

        match &joined {
            Ok(peer_id) => info!("Peer {} joined room for meeting {}", peer_id, meeting_id),
            Err(_) => self.drop_if_empty(meeting_id),
        }
        joined
    }

    /// Remove a peer and tell the rest of the room
    pub fn leave(&self, meeting_id: &str, peer_id: &str) -> bool {
        let removed = match self.rooms.get_mut(meeting_id) {
            Some(mut room) => {
                let removed = room.peers.remove(peer_id).is_some();
                if removed {
                    room.broadcast(
                        &ServerMessage::PeerLeave {
                            peer_id: peer_id.to_string(),
                        },
                        None,
                    );
                }
                removed
            }
            None => false,
        };

        if removed {
            info!("Peer {} left room for meeting {}", peer_id, meeting_id);
            self.drop_if_empty(meeting_id);
        }
        removed
    }

    /// Deliver to one peer in a room. Returns false if it isn't there.
    pub fn send_to(&self, meeting_id: &str, peer_id: &str, msg: ServerMessage) -> bool {
        self.rooms
            .get(meeting_id)
            .and_then(|room| room.peers.get(peer_id).map(|tx| tx.send(msg).is_ok()))
            .unwrap_or(false)
    }

    /// Number of rooms with at least one peer
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of connected peers across all rooms
    pub fn peer_count(&self) -> usize {
        self.rooms.iter().map(|r| r.peer_count()).sum()
    }

    fn drop_if_empty(&self, meeting_id: &str) {
        if self.rooms.remove_if(meeting_id, |_, r| r.is_empty()).is_some() {
            debug!("Room for meeting {} removed (empty)", meeting_id);
        }
    }
}
