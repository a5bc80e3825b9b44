use futures::FutureExt;
use greeting_data::KeyPrompt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Key prompt on the terminal. An empty line or a read error is a skip.
pub fn stdin_prompt() -> KeyPrompt {
    Arc::new(|| {
        async {
            eprintln!("视频生成需要已开通结算的 API Key。请粘贴 API Key 并回车（直接回车跳过）：");

            let mut line = String::new();
            let mut stdin = BufReader::new(tokio::io::stdin());
            match stdin.read_line(&mut line).await {
                Ok(_) => Some(line).filter(|l| !l.trim().is_empty()),
                Err(e) => {
                    log::warn!("Failed to read API key from stdin: {e}");
                    None
                }
            }
        }
        .boxed()
    })
}
