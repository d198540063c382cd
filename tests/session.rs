//! End-to-end session protocol tests over a real WebSocket connection.

use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as Base64Standard;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use cloakstream::{RateLimiter, Server};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Binds a server on an ephemeral port and connects one client.
async fn connect() -> Result<Client> {
    connect_with_limiter(RateLimiter::default()).await
}

async fn connect_with_limiter(limiter: RateLimiter) -> Result<Client> {
    // Opt-in logging: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let server = Server::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        .await
        .context("bind")?
        .with_limiter(limiter);
    let url = server.ws_url();

    tokio::spawn(server.run());

    let (client, _) = connect_async(url.as_str()).await.context("connect")?;
    Ok(client)
}

fn png_data_uri(rgb: [u8; 3]) -> Result<String> {
    let frame = RgbImage::from_pixel(32, 24, Rgb(rgb));
    let mut buffer = Vec::new();
    frame.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        Base64Standard.encode(&buffer)
    ))
}

async fn send(client: &mut Client, value: Value) -> Result<()> {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .context("send")
}

async fn recv(client: &mut Client) -> Result<Value> {
    let timeout = Duration::from_secs(10);
    loop {
        let message = tokio::time::timeout(timeout, client.next())
            .await
            .context("receive timeout")?
            .context("connection closed")??;
        match message {
            Message::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => bail!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn first_frame_captures_background_with_single_toast() -> Result<()> {
    let mut client = connect().await?;

    send(&mut client, json!({"type": "frame", "data": png_data_uri([10, 20, 30])?})).await?;

    let toast = recv(&mut client).await?;
    assert_eq!(toast["type"], "toast");
    assert_eq!(toast["message"], "Background captured");

    let frame = recv(&mut client).await?;
    assert_eq!(frame["type"], "frame");
    let data = frame["data"].as_str().context("frame data")?;
    assert!(data.starts_with("data:image/jpeg;base64,"));

    // Second frame: no further toast, just the processed frame.
    send(&mut client, json!({"type": "frame", "data": png_data_uri([10, 20, 30])?})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["type"], "frame");

    Ok(())
}

#[tokio::test]
async fn reset_background_roundtrip() -> Result<()> {
    let mut client = connect().await?;

    send(&mut client, json!({"type": "frame", "data": png_data_uri([10, 20, 30])?})).await?;
    recv(&mut client).await?; // toast
    recv(&mut client).await?; // frame

    send(&mut client, json!({"type": "reset_background"})).await?;
    let toast = recv(&mut client).await?;
    assert_eq!(toast["type"], "toast");
    assert_eq!(toast["message"], "Background cleared");
    let ok = recv(&mut client).await?;
    assert_eq!(ok["type"], "ok");

    // The next frame re-captures.
    send(&mut client, json!({"type": "frame", "data": png_data_uri([10, 20, 30])?})).await?;
    let toast = recv(&mut client).await?;
    assert_eq!(toast["message"], "Background captured");

    Ok(())
}

#[tokio::test]
async fn set_color_validation_and_ack() -> Result<()> {
    let mut client = connect().await?;

    send(&mut client, json!({"type": "set_color", "hex": "notacolor"})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["message"], "invalid_hex_color");

    send(
        &mut client,
        json!({"type": "set_color", "hex": "#00ff00", "tolerance": 15, "s_min": 100, "v_min": 60}),
    )
    .await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["type"], "ok");

    Ok(())
}

#[tokio::test]
async fn set_params_ack_and_preview_output() -> Result<()> {
    let mut client = connect().await?;

    send(
        &mut client,
        json!({"type": "set_params", "preview_mask": true, "blur_ksize": 7}),
    )
    .await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["type"], "ok");

    // Preview mode still answers frames (and still captures a background).
    send(&mut client, json!({"type": "frame", "data": png_data_uri([200, 20, 20])?})).await?;
    let toast = recv(&mut client).await?;
    assert_eq!(toast["message"], "Background captured");
    let frame = recv(&mut client).await?;
    assert_eq!(frame["type"], "frame");

    Ok(())
}

#[tokio::test]
async fn invalid_inputs_keep_connection_open() -> Result<()> {
    let mut client = connect().await?;

    send(&mut client, json!({"type": "launch_missiles"})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["message"], "unknown_message_type");

    send(&mut client, json!({"type": "frame", "data": "@@@not-base64@@@"})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["message"], "invalid_frame_data");

    let tiny = {
        let frame = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let mut buffer = Vec::new();
        frame.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        format!("data:image/png;base64,{}", Base64Standard.encode(&buffer))
    };
    send(&mut client, json!({"type": "frame", "data": tiny})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["message"], "bad_frame");

    // The session is still alive after three rejections.
    send(&mut client, json!({"type": "set_params"})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["type"], "ok");

    Ok(())
}

#[tokio::test]
async fn rate_limit_rejects_over_budget_messages() -> Result<()> {
    let mut client =
        connect_with_limiter(RateLimiter::new(3, Duration::from_secs(60))).await?;

    for _ in 0..3 {
        send(&mut client, json!({"type": "set_params"})).await?;
        let reply = recv(&mut client).await?;
        assert_eq!(reply["type"], "ok");
    }

    send(&mut client, json!({"type": "set_params"})).await?;
    let reply = recv(&mut client).await?;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["message"], "rate_limit_exceeded");

    Ok(())
}
