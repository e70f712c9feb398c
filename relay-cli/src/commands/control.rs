//! Act as the controller: join a room and send commands.

use anyhow::{bail, Context, Result};
use relay_client::{ControllerPolicy, PeerEvent, RelayClient, Transport, WsTransport};
use relay_types::{decode_image, Command};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run the control command.
pub async fn run(
    url: &str,
    pin: &str,
    commands: &[Command],
    out_dir: Option<&Path>,
    wait_secs: u64,
) -> Result<()> {
    if let Some(dir) = out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .context("Failed to create output directory")?;
    }

    let client = RelayClient::new(WsTransport::new(), ControllerPolicy);
    client
        .connect(url, pin)
        .await
        .context("Failed to join room")?;
    println!("Joined room {}.", pin);

    let result = drive(&client, commands, out_dir, Duration::from_secs(wait_secs)).await;
    client.disconnect().await?;
    result
}

/// Send each command and wait for its response.
async fn drive<T: Transport>(
    client: &RelayClient<T, ControllerPolicy>,
    commands: &[Command],
    out_dir: Option<&Path>,
    wait: Duration,
) -> Result<()> {
    let mut images = 0;

    for command in commands {
        client.send_command(*command).await?;
        println!("-> {}", command);

        loop {
            let event = tokio::time::timeout(wait, client.next_event())
                .await
                .with_context(|| format!("No response to {} within {:?}", command, wait))??;

            match event {
                PeerEvent::Response { message } => {
                    println!("<- {}", message);
                    break;
                }
                PeerEvent::Image { data } => {
                    let bytes = decode_image(&data).context("Camera sent an invalid image")?;
                    images += 1;
                    match out_dir {
                        Some(dir) => {
                            let path = image_path(dir, images);
                            tokio::fs::write(&path, &bytes)
                                .await
                                .with_context(|| format!("Failed to write {}", path.display()))?;
                            println!("<- IMAGE saved to {}", path.display());
                        }
                        None => println!("<- IMAGE ({} bytes)", bytes.len()),
                    }
                }
                PeerEvent::RelayError { message } => {
                    eprintln!("Relay error: {}", message);
                    break;
                }
                PeerEvent::PeerLeft => bail!("Camera disconnected"),
                PeerEvent::Disconnected { reason } => bail!("Relay connection lost: {}", reason),
                other => tracing::debug!("Unhandled event: {:?}", other),
            }
        }
    }

    Ok(())
}

/// File name for the `index`th received image.
fn image_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("image-{:03}.jpg", index))
}
