//! Act as the camera: create a room and answer commands.

use anyhow::{Context, Result};
use relay_client::{CameraPolicy, PeerEvent, RelayClient, Transport, WsTransport};
use relay_types::Command;
use std::path::Path;

/// What the camera sends back for one command.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Image(Vec<u8>),
    Text(String),
}

/// Run the camera command.
pub async fn run(url: &str, pin: &str, photo: Option<&Path>) -> Result<()> {
    let photo = match photo {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read photo {}", path.display()))?,
        ),
        None => None,
    };

    let client = RelayClient::new(WsTransport::new(), CameraPolicy);
    client
        .connect(url, pin)
        .await
        .context("Failed to create room")?;
    println!("Room {} created. Waiting for a controller...", pin);

    tokio::select! {
        result = serve(&client, photo.as_deref()) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Shutting down.");
            client.disconnect().await?;
            Ok(())
        }
    }
}

/// Answer commands until the relay connection ends.
async fn serve<T: Transport>(
    client: &RelayClient<T, CameraPolicy>,
    photo: Option<&[u8]>,
) -> Result<()> {
    loop {
        match client.next_event().await? {
            PeerEvent::PeerJoined => println!("Controller connected."),
            PeerEvent::PeerLeft => println!("Controller left. Waiting for a controller..."),
            PeerEvent::Command { command } => {
                println!("<- {}", command);
                for reply in replies(&command, photo) {
                    match reply {
                        Reply::Image(bytes) => {
                            client.send_image(&bytes).await?;
                            println!("-> IMAGE ({} bytes)", bytes.len());
                        }
                        Reply::Text(text) => {
                            client.send_response(text.as_str()).await?;
                            println!("-> {}", text);
                        }
                    }
                }
            }
            PeerEvent::RelayError { message } => eprintln!("Relay error: {}", message),
            PeerEvent::Disconnected { reason } => {
                println!("Disconnected: {}", reason);
                return Ok(());
            }
            other => tracing::debug!("Unhandled event: {:?}", other),
        }
    }
}

/// Replies for `command`, in send order.
fn replies(command: &str, photo: Option<&[u8]>) -> Vec<Reply> {
    match command.parse::<Command>() {
        Ok(Command::TakePhoto) => {
            let mut replies = Vec::new();
            if let Some(bytes) = photo {
                replies.push(Reply::Image(bytes.to_vec()));
            }
            replies.push(Reply::Text(format!("{} done", Command::TakePhoto)));
            replies
        }
        Ok(known) => vec![Reply::Text(format!("{} done", known))],
        Err(_) => vec![Reply::Text(format!("Unknown command: {}", command))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_client::MockTransport;
    use relay_types::Message;

    #[test]
    fn known_commands_are_acknowledged() {
        assert_eq!(
            replies("RECORD", None),
            vec![Reply::Text("RECORD done".into())]
        );
        assert_eq!(
            replies("flip_camera", None),
            vec![Reply::Text("FLIP_CAMERA done".into())]
        );
    }

    #[test]
    fn take_photo_sends_image_first() {
        let replies = replies("TAKE_PHOTO", Some(&b"jpeg"[..]));
        assert_eq!(
            replies,
            vec![
                Reply::Image(b"jpeg".to_vec()),
                Reply::Text("TAKE_PHOTO done".into())
            ]
        );
    }

    #[test]
    fn take_photo_without_photo_is_text_only() {
        assert_eq!(
            replies("TAKE_PHOTO", None),
            vec![Reply::Text("TAKE_PHOTO done".into())]
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            replies("ZOOM", None),
            vec![Reply::Text("Unknown command: ZOOM".into())]
        );
    }

    #[tokio::test]
    async fn serve_answers_until_disconnected() {
        let transport = MockTransport::new();
        transport.queue_message(&Message::RoomCreated { pin: "4321".into() });
        transport.queue_message(&Message::ClientConnected);
        transport.queue_message(&Command::TakePhoto.into());

        let client = RelayClient::new(transport.clone(), CameraPolicy);
        client.connect("ws://relay.test/camera-relay", "4321").await.unwrap();

        // The mock reports a closed connection once its queue drains.
        serve(&client, Some(&b"jpeg"[..])).await.unwrap();

        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 3);
        assert!(matches!(sent[1], Message::Image { .. }));
        assert_eq!(
            sent[2],
            Message::Response {
                message: "TAKE_PHOTO done".into()
            }
        );
    }
}
