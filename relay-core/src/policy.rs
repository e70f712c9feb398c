//! Role policies.
//!
//! The camera and the controller run the same [`crate::PeerState`] engine;
//! a [`RolePolicy`] supplies everything that differs between them: how the
//! peer registers, which relay notifications mean "paired" and "peer left",
//! and which payload types flow in and out.

use relay_types::{DeviceRole, Message, MessageType, Pin, RoomRequest};

/// Role-specific protocol rules.
pub trait RolePolicy {
    /// The role this policy registers as.
    fn role(&self) -> DeviceRole;

    /// Registration envelope type sent after the transport opens.
    fn registration_type(&self) -> MessageType;

    /// Relay acknowledgement of a successful registration.
    fn ack_type(&self) -> MessageType;

    /// Whether the acknowledgement already implies the peer is present.
    fn paired_on_ack(&self) -> bool;

    /// Notification that the peer joined, if the role receives one.
    fn peer_joined_type(&self) -> Option<MessageType>;

    /// Notification that the peer left.
    fn peer_left_type(&self) -> MessageType;

    /// Payload types this role receives from its peer.
    fn inbound_payloads(&self) -> &'static [MessageType];

    /// Payload types this role may send to its peer.
    fn outbound_payloads(&self) -> &'static [MessageType];

    /// Build the registration message for `pin`.
    fn registration(&self, pin: &Pin) -> Message {
        let request = RoomRequest {
            pin: pin.to_string(),
            device_type: self.role().as_str().to_string(),
        };
        match self.registration_type() {
            MessageType::JoinRoom => Message::JoinRoom(request),
            _ => Message::CreateRoom(request),
        }
    }

    /// Whether an inbound message type means anything to this role.
    fn accepts(&self, kind: MessageType) -> bool {
        kind == self.ack_type()
            || kind == self.peer_left_type()
            || kind == MessageType::Error
            || self.peer_joined_type() == Some(kind)
            || self.inbound_payloads().contains(&kind)
    }

    /// Whether this role may send `kind` to its peer.
    fn may_send(&self, kind: MessageType) -> bool {
        self.outbound_payloads().contains(&kind)
    }

    /// Whether sends are allowed while the peer slot looks empty.
    ///
    /// A role that is never told when its peer returns must keep sending
    /// and let the relay answer.
    fn sends_while_waiting(&self) -> bool {
        false
    }
}

/// The capability-providing side (SERVER): receives commands, sends
/// responses and images.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraPolicy;

impl RolePolicy for CameraPolicy {
    fn role(&self) -> DeviceRole {
        DeviceRole::Server
    }

    fn registration_type(&self) -> MessageType {
        MessageType::CreateRoom
    }

    fn ack_type(&self) -> MessageType {
        MessageType::RoomCreated
    }

    fn paired_on_ack(&self) -> bool {
        false
    }

    fn peer_joined_type(&self) -> Option<MessageType> {
        Some(MessageType::ClientConnected)
    }

    fn peer_left_type(&self) -> MessageType {
        MessageType::ClientDisconnected
    }

    fn inbound_payloads(&self) -> &'static [MessageType] {
        &[MessageType::Command]
    }

    fn outbound_payloads(&self) -> &'static [MessageType] {
        &[MessageType::Response, MessageType::Image]
    }
}

/// The controlling side (CLIENT): sends commands, receives responses and
/// images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerPolicy;

impl RolePolicy for ControllerPolicy {
    fn role(&self) -> DeviceRole {
        DeviceRole::Client
    }

    fn registration_type(&self) -> MessageType {
        MessageType::JoinRoom
    }

    fn ack_type(&self) -> MessageType {
        MessageType::Connected
    }

    // The relay only acknowledges a client when the room has a server.
    fn paired_on_ack(&self) -> bool {
        true
    }

    fn peer_joined_type(&self) -> Option<MessageType> {
        None
    }

    fn peer_left_type(&self) -> MessageType {
        MessageType::ServerDisconnected
    }

    fn inbound_payloads(&self) -> &'static [MessageType] {
        &[MessageType::Response, MessageType::Image]
    }

    fn outbound_payloads(&self) -> &'static [MessageType] {
        &[MessageType::Command]
    }

    // A replacement camera only announces itself to the relay, never to us.
    fn sends_while_waiting(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin() -> Pin {
        Pin::parse("1234").unwrap()
    }

    #[test]
    fn camera_registers_with_create_room() {
        let msg = CameraPolicy.registration(&pin());
        assert_eq!(
            msg,
            Message::CreateRoom(RoomRequest {
                pin: "1234".into(),
                device_type: "SERVER".into(),
            })
        );
    }

    #[test]
    fn controller_registers_with_join_room() {
        let msg = ControllerPolicy.registration(&pin());
        assert_eq!(
            msg,
            Message::JoinRoom(RoomRequest {
                pin: "1234".into(),
                device_type: "CLIENT".into(),
            })
        );
    }

    #[test]
    fn camera_traffic_rules() {
        let camera = CameraPolicy;
        assert!(camera.accepts(MessageType::Command));
        assert!(camera.accepts(MessageType::ClientConnected));
        assert!(camera.accepts(MessageType::Error));
        assert!(!camera.accepts(MessageType::Response));
        assert!(!camera.accepts(MessageType::ServerDisconnected));

        assert!(camera.may_send(MessageType::Response));
        assert!(camera.may_send(MessageType::Image));
        assert!(!camera.may_send(MessageType::Command));
    }

    #[test]
    fn controller_traffic_rules() {
        let controller = ControllerPolicy;
        assert!(controller.accepts(MessageType::Response));
        assert!(controller.accepts(MessageType::Image));
        assert!(controller.accepts(MessageType::ServerDisconnected));
        assert!(!controller.accepts(MessageType::Command));
        assert!(!controller.accepts(MessageType::ClientConnected));

        assert!(controller.may_send(MessageType::Command));
        assert!(!controller.may_send(MessageType::Image));
    }

    #[test]
    fn only_the_controller_sends_while_waiting() {
        assert!(ControllerPolicy.sends_while_waiting());
        assert!(!CameraPolicy.sends_while_waiting());
    }

    #[test]
    fn registration_types_are_never_payloads() {
        for kind in MessageType::ALL {
            if CameraPolicy.may_send(kind) || ControllerPolicy.may_send(kind) {
                assert!(kind.is_relayed(), "{kind} is not relayed");
            }
        }
    }
}
