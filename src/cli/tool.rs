// src/cli/tool.rs
// Direct tool execution from CLI

use super::serve::setup_server;
use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Execute a tool directly from the command line
pub async fn run_tool(name: String, args: String) -> Result<()> {
    let server = setup_server()?;

    let arguments = match serde_json::from_str::<Value>(&args)? {
        Value::Object(map) => map,
        _ => bail!("Tool arguments must be a JSON object"),
    };

    // Ctrl-C cancels the running task instead of killing the process mid-request
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let res = server.call(&name, Some(arguments), cancel).await;
    interrupt.abort();

    let result = res.map_err(|e| anyhow!("{} (code {})", e.message, e.code.0))?;
    for content in &result.content {
        if let Some(text) = content.as_text() {
            println!("{}", text.text);
        }
    }

    Ok(())
}
