//! Echo Bot Demo
//!
//! Drives the Braze runtime from the console: every line you type becomes a
//! private message event, and outbound API calls are printed back. No real
//! platform adapter is involved, which makes this a minimal end-to-end tour
//! of the framework:
//!
//! - `/echo <text>` — the command middleware extracts the remainder and the
//!   handler replies with it
//! - `/ping` — plain command reply
//! - `/register` — a two-step flow built on `Context::prompt`: the handler
//!   parks until your *next* line arrives on a later dispatch
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use std::io::BufRead;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use braze::prelude::*;

// ============================================================================
// Console bot
// ============================================================================

/// Prints outbound API calls instead of talking to a platform.
struct ConsoleBot;

#[async_trait]
impl Bot for ConsoleBot {
    fn self_id(&self) -> i64 {
        10_000
    }

    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        if action == "send_msg" {
            let message = params["message"].as_str().unwrap_or_default();
            println!("bot> {message}");
        } else {
            println!("bot> [{action}] {params}");
        }
        Ok(serde_json::json!({ "message_id": 1 }))
    }
}

// ============================================================================
// Plugins
// ============================================================================

/// `/echo` and `/ping` commands.
struct Echo;

impl Plugin for Echo {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "echo",
            version: "0.1.0",
            description: "repeats what it is told",
        }
    }

    fn init(&self, engine: &Engine) -> PluginResult {
        engine
            .new_handler(&[EventName::MESSAGE])
            .use_middleware(middlewares::command(&["echo"]))
            .handle(|ctx: Arc<Context>| async move {
                let Some(cmd) = ctx.get::<middlewares::CommandMatch>(middlewares::KEY_COMMAND)
                else {
                    return;
                };
                let _ = ctx.reply(cmd.remainder.clone()).await;
            });

        engine
            .new_handler(&[EventName::MESSAGE])
            .use_middleware(middlewares::command(&["ping"]))
            .handle(|ctx: Arc<Context>| async move {
                let _ = ctx.reply("pong").await;
            });

        Ok(())
    }
}

/// `/register`: asks a follow-up question and waits for the answer.
struct Register;

impl Plugin for Register {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "register",
            version: "0.1.0",
            description: "two-step registration flow",
        }
    }

    fn init(&self, engine: &Engine) -> PluginResult {
        engine
            .new_handler(&[EventName::MESSAGE])
            .use_middleware(middlewares::command(&["register"]))
            .handle(|ctx: Arc<Context>| async move {
                let answer = ctx
                    .prompt("what name should I register?", Duration::from_secs(60))
                    .await;
                let _ = match answer {
                    Some(name) => ctx.reply(format!("registered {name}")).await,
                    None => ctx.reply("no answer, giving up").await,
                };
            });

        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = BrazeRuntime::builder().build()?;
    runtime.set_bot(Arc::new(ConsoleBot));
    runtime.register_plugin(Box::new(Echo)).await?;
    runtime.register_plugin(Box::new(Register)).await?;

    // Stdin stands in for a platform adapter: each line is one decoded event.
    let (tx, rx) = mpsc::channel::<Arc<dyn Event>>(64);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for (i, line) in stdin.lock().lines().enumerate() {
            let Ok(line) = line else { break };
            let event: Arc<dyn Event> = Arc::new(PrivateMessage::new(7, i as i64, line));
            if tx.blocking_send(event).is_err() {
                break;
            }
        }
    });

    println!("Type messages; try /echo <text>, /ping, /register. Ctrl+D quits.");
    runtime.run(rx).await?;

    Ok(())
}
