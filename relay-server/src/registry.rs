//! Room registry: the PIN rendezvous.
//!
//! The registry owns the only shared mutable state in the relay: which
//! session occupies which slot of which room. Rooms live in a `DashMap`
//! keyed by [`Pin`]; every check-and-bind runs while holding that PIN's
//! entry guard, so two sessions racing for the same slot are serialized and
//! exactly one wins. A reverse map from [`SessionId`] to [`Binding`] makes
//! teardown a direct lookup.
//!
//! Lock order is always rooms, then bindings. Notifications to peers are
//! queued while the room guard is held so a peer observes joins and leaves
//! for its room in the order they happened.

use crate::error::{Rejection, RoutingError};
use crate::session::{SessionHandle, SessionId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_types::{DeviceRole, Message, Pin, RoomRequest};
use std::sync::atomic::{AtomicU64, Ordering};

/// Where a session is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Room the session belongs to.
    pub pin: Pin,
    /// Slot it occupies.
    pub role: DeviceRole,
}

/// Both slots of one room.
#[derive(Debug, Default)]
struct Room {
    server: Option<SessionHandle>,
    client: Option<SessionHandle>,
}

impl Room {
    fn slot(&self, role: DeviceRole) -> Option<&SessionHandle> {
        match role {
            DeviceRole::Server => self.server.as_ref(),
            DeviceRole::Client => self.client.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: DeviceRole) -> &mut Option<SessionHandle> {
        match role {
            DeviceRole::Server => &mut self.server,
            DeviceRole::Client => &mut self.client,
        }
    }

    fn is_empty(&self) -> bool {
        self.server.is_none() && self.client.is_none()
    }
}

/// Process-wide PIN to room map.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<Pin, Room>,
    bindings: DashMap<SessionId, Binding>,
    rooms_created: AtomicU64,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session` into the room named by `request`.
    ///
    /// Validation happens before any lookup: a malformed PIN or an unknown
    /// role never touches the maps. A session that is already bound is
    /// refused. On success the requester gets `ROOM_CREATED` (server) or
    /// `CONNECTED` (client), and the server learns about its client with
    /// `CLIENT_CONNECTED`.
    pub fn create_or_join(
        &self,
        session: &SessionHandle,
        request: &RoomRequest,
    ) -> Result<Binding, Rejection> {
        let pin = Pin::parse(&request.pin)?;
        let role: DeviceRole = request
            .device_type
            .parse()
            .map_err(|_| RoutingError::InvalidDeviceType)?;

        if self.bindings.contains_key(&session.id()) {
            return Err(RoutingError::AlreadyInRoom.into());
        }

        let binding = match role {
            DeviceRole::Server => self.bind_server(session, pin)?,
            DeviceRole::Client => self.bind_client(session, pin)?,
        };
        Ok(binding)
    }

    fn bind_server(&self, session: &SessionHandle, pin: Pin) -> Result<Binding, RoutingError> {
        let mut room = match self.rooms.entry(pin.clone()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                self.rooms_created.fetch_add(1, Ordering::Relaxed);
                entry.insert(Room::default())
            }
        };
        if room.server.is_some() {
            return Err(RoutingError::ServerSlotTaken);
        }

        room.server = Some(session.clone());
        let binding = self.record(session.id(), &pin, DeviceRole::Server);

        notify(session, Message::RoomCreated {
            pin: pin.to_string(),
        });
        if room.client.is_some() {
            notify(session, Message::ClientConnected);
        }

        tracing::info!("{} bound as SERVER in room {}", session.id(), pin);
        Ok(binding)
    }

    fn bind_client(&self, session: &SessionHandle, pin: Pin) -> Result<Binding, RoutingError> {
        let mut room = self.rooms.get_mut(&pin).ok_or(RoutingError::NoServer)?;
        let server = room.server.clone().ok_or(RoutingError::NoServer)?;
        if room.client.is_some() {
            return Err(RoutingError::ClientSlotTaken);
        }

        room.client = Some(session.clone());
        let binding = self.record(session.id(), &pin, DeviceRole::Client);

        notify(session, Message::Connected {
            pin: pin.to_string(),
        });
        notify(&server, Message::ClientConnected);

        tracing::info!("{} bound as CLIENT in room {}", session.id(), pin);
        Ok(binding)
    }

    fn record(&self, id: SessionId, pin: &Pin, role: DeviceRole) -> Binding {
        let binding = Binding {
            pin: pin.clone(),
            role,
        };
        self.bindings.insert(id, binding.clone());
        binding
    }

    /// Tear down whatever `id` was bound to.
    ///
    /// Clears the session's slot (only if it still holds this session),
    /// notifies the surviving peer and deletes the room once both slots are
    /// empty. Unbound sessions are a no-op.
    pub fn remove_session(&self, id: SessionId) -> Option<Binding> {
        let (_, binding) = self.bindings.remove(&id)?;

        if let Entry::Occupied(mut entry) = self.rooms.entry(binding.pin.clone()) {
            let room = entry.get_mut();
            let slot = room.slot_mut(binding.role);
            if slot.as_ref().is_some_and(|s| s.id() == id) {
                *slot = None;
                if let Some(peer) = room.slot(binding.role.peer()) {
                    let notice = match binding.role {
                        DeviceRole::Server => Message::ServerDisconnected,
                        DeviceRole::Client => Message::ClientDisconnected,
                    };
                    notify(peer, notice);
                }
            }
            if room.is_empty() {
                entry.remove();
                tracing::debug!("Room {} removed", binding.pin);
            }
        }

        tracing::info!("{} left room {} ({})", id, binding.pin, binding.role);
        Some(binding)
    }

    /// Where `id` is bound, if anywhere.
    pub fn binding(&self, id: SessionId) -> Option<Binding> {
        self.bindings.get(&id).map(|b| b.value().clone())
    }

    /// Run `f` against the occupant of `role` in room `pin` while the room
    /// is locked.
    ///
    /// Returns `None` when the room does not exist; `f` receives `None` when
    /// the slot is empty.
    pub fn with_occupant<R>(
        &self,
        pin: &Pin,
        role: DeviceRole,
        f: impl FnOnce(Option<&SessionHandle>) -> R,
    ) -> Option<R> {
        self.rooms.get(pin).map(|room| f(room.slot(role)))
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of sessions bound to a slot.
    pub fn bound_sessions(&self) -> usize {
        self.bindings.len()
    }

    /// Rooms created since startup.
    pub fn rooms_created_total(&self) -> u64 {
        self.rooms_created.load(Ordering::Relaxed)
    }
}

fn notify(session: &SessionHandle, message: Message) {
    let kind = message.message_type();
    if let Err(e) = session.send(message) {
        tracing::debug!("Dropped {} for {}: {}", kind, session.id(), e);
    }
}
