//! Discord Gateway inbound event loop.
//!
//! Events are dispatched strictly one at a time: a `MESSAGE_CREATE` or
//! `INTERACTION_CREATE` is fully processed (state read, transition,
//! persist, reply) before the next frame is read. That loop is the
//! serialization point for all attendance mutation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::attendance::AttendanceStore;
use crate::channels::inbound::AttendanceBot;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsWrite = futures_util::stream::SplitSink<WsStream, Message>;

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u64,
    #[serde(default)]
    d: Option<Value>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// Default Discord gateway URL.
pub const DEFAULT_DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT.
pub const GATEWAY_INTENTS: u64 = 1 | (1 << 9) | (1 << 15);

/// Run the Discord gateway loop (reconnects with backoff).
pub async fn discord_gateway_loop<S: AttendanceStore>(
    gateway_url: String,
    bot_token: String,
    intents: u64,
    bot: &mut AttendanceBot<S>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut backoff = Duration::from_secs(1);

    loop {
        if *shutdown.borrow() {
            break;
        }

        info!("Connecting to Discord gateway");
        match tokio_tungstenite::connect_async(&gateway_url).await {
            Ok((ws_stream, _)) => {
                backoff = Duration::from_secs(1);
                if let Err(err) =
                    run_gateway_session(ws_stream, &bot_token, intents, bot, &mut shutdown).await
                {
                    warn!("Discord gateway session ended: {}", err);
                }
            }
            Err(e) => {
                warn!("Discord gateway connect failed: {}", e);
            }
        }

        if *shutdown.borrow() {
            break;
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(Duration::from_secs(30));
    }

    info!("Discord gateway loop exited");
}

async fn run_gateway_session<S: AttendanceStore>(
    ws_stream: WsStream,
    bot_token: &str,
    intents: u64,
    bot: &mut AttendanceBot<S>,
    shutdown: &mut tokio::sync::watch::Receiver<bool>,
) -> Result<(), String> {
    let (write, mut read) = ws_stream.split();
    let write = Arc::new(Mutex::new(write));
    let seq = Arc::new(AtomicU64::new(0));
    let seq_set = Arc::new(AtomicBool::new(false));

    let mut heartbeat_task: Option<tokio::task::JoinHandle<()>> = None;
    let mut identified = false;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => return Err(format!("gateway read failed: {e}")),
                    None => break,
                };

                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };

                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(payload) => payload,
                    Err(e) => {
                        debug!("Discord gateway payload parse error: {}", e);
                        continue;
                    }
                };

                if let Some(s) = payload.s {
                    seq.store(s, Ordering::Relaxed);
                    seq_set.store(true, Ordering::Relaxed);
                }

                match payload.op {
                    10 => {
                        let interval_ms = payload
                            .d
                            .as_ref()
                            .and_then(|d| d.get("heartbeat_interval"))
                            .and_then(|v| v.as_u64())
                            .unwrap_or(45000);
                        if heartbeat_task.is_none() {
                            heartbeat_task = Some(spawn_heartbeat_task(
                                write.clone(),
                                seq.clone(),
                                seq_set.clone(),
                                Duration::from_millis(interval_ms),
                            ));
                        }
                        if !identified {
                            send_identify(&write, bot_token, intents).await?;
                            identified = true;
                        }
                    }
                    0 => {
                        if let Some(ref t) = payload.t {
                            match t.as_str() {
                                "READY" => {
                                    if let Some(id) = payload
                                        .d
                                        .as_ref()
                                        .and_then(|d| d.get("user"))
                                        .and_then(|u| u.get("id"))
                                        .and_then(|v| v.as_str())
                                    {
                                        bot.set_bot_user_id(id.to_string());
                                    }
                                    info!("Discord gateway READY");
                                }
                                "MESSAGE_CREATE" => {
                                    if let Some(ref d) = payload.d {
                                        bot.handle_message_create(d).await;
                                    }
                                }
                                "INTERACTION_CREATE" => {
                                    if let Some(ref d) = payload.d {
                                        bot.handle_interaction_create(d).await;
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    1 => {
                        let current_seq = current_seq(seq.as_ref(), seq_set.as_ref());
                        send_heartbeat(&write, current_seq).await?;
                    }
                    7 => {
                        warn!("Discord gateway requested reconnect");
                        break;
                    }
                    9 => {
                        warn!("Discord gateway invalid session");
                        identified = false;
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        send_identify(&write, bot_token, intents).await?;
                        identified = true;
                    }
                    11 => {
                        // Heartbeat ACK
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(task) = heartbeat_task.take() {
        task.abort();
    }

    Ok(())
}

fn current_seq(seq: &AtomicU64, seq_set: &AtomicBool) -> Option<u64> {
    if seq_set.load(Ordering::Relaxed) {
        Some(seq.load(Ordering::Relaxed))
    } else {
        None
    }
}

fn spawn_heartbeat_task(
    write: Arc<Mutex<WsWrite>>,
    seq: Arc<AtomicU64>,
    seq_set: Arc<AtomicBool>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate tick to align with the advertised heartbeat interval.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let current = current_seq(seq.as_ref(), seq_set.as_ref());
            if send_heartbeat(&write, current).await.is_err() {
                break;
            }
        }
    })
}

async fn send_identify(
    write: &Arc<Mutex<WsWrite>>,
    bot_token: &str,
    intents: u64,
) -> Result<(), String> {
    let payload = json!({
        "op": 2,
        "d": {
            "token": bot_token,
            "intents": intents,
            "properties": {
                "$os": std::env::consts::OS,
                "$browser": "rollcall",
                "$device": "rollcall"
            }
        }
    });
    send_json(write, &payload).await
}

async fn send_heartbeat(write: &Arc<Mutex<WsWrite>>, seq: Option<u64>) -> Result<(), String> {
    let payload = json!({
        "op": 1,
        "d": seq
    });
    send_json(write, &payload).await
}

async fn send_json(write: &Arc<Mutex<WsWrite>>, payload: &Value) -> Result<(), String> {
    let text = serde_json::to_string(payload).map_err(|e| e.to_string())?;
    let mut writer = write.lock().await;
    writer
        .send(Message::Text(text))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_intents_cover_guild_messages_and_content() {
        assert_eq!(GATEWAY_INTENTS, 33281);
        assert_ne!(GATEWAY_INTENTS & 1, 0, "GUILDS");
        assert_ne!(GATEWAY_INTENTS & (1 << 9), 0, "GUILD_MESSAGES");
        assert_ne!(GATEWAY_INTENTS & (1 << 15), 0, "MESSAGE_CONTENT");
    }

    #[test]
    fn test_gateway_payload_parses_dispatch_frame() {
        let payload: GatewayPayload = serde_json::from_str(
            r#"{"op":0,"s":7,"t":"MESSAGE_CREATE","d":{"content":"online"}}"#,
        )
        .unwrap();
        assert_eq!(payload.op, 0);
        assert_eq!(payload.s, Some(7));
        assert_eq!(payload.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(payload.d.unwrap()["content"], "online");
    }

    #[test]
    fn test_gateway_payload_tolerates_missing_fields() {
        let payload: GatewayPayload = serde_json::from_str(r#"{"op":11}"#).unwrap();
        assert_eq!(payload.op, 11);
        assert!(payload.d.is_none());
        assert!(payload.s.is_none());
        assert!(payload.t.is_none());
    }
}
