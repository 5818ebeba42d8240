//! HR Buddy 终端对话
//!
//! 启动: cargo run --bin hr-buddy-chat -- [config.toml]
//! 需要环境变量 HR_BUDDY_TOKEN（HR 后端 Bearer token），或在配置中开启兜底登录。
//! 每轮打印规划内容与工具调用；输入 exit / quit 退出。

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use hr_buddy::{
    agent::{ChatRequest, ChatService},
    config::load_config,
    core::ShutdownManager,
    observability,
    react::ReactEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

fn print_event(event: &ReactEvent) {
    match event {
        ReactEvent::Iteration { iteration, max_iterations } => {
            println!("  · iteration {}/{}", iteration, max_iterations);
        }
        ReactEvent::Thinking { text } => println!("  🧠 {}", text),
        ReactEvent::ToolCall { tool, input } => println!("  🔧 {} {}", tool, input),
        ReactEvent::Observation { ok, preview, .. } => {
            println!("  {} {}", if *ok { "✅" } else { "⚠️" }, preview);
        }
        ReactEvent::Output { .. } | ReactEvent::Error { .. } => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;
    let shutdown = Arc::new(ShutdownManager::new());
    let service = ChatService::from_config(&cfg, shutdown.clone()).context("Failed to create chat service")?;
    let token = std::env::var("HR_BUDDY_TOKEN").ok();

    println!("🤖 {} (type 'exit' to quit)", cfg.app.name);
    let mut conversation_id: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n👤 You: ");
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("👋 Goodbye!");
            break;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_event(&event);
            }
        });

        let request = ChatRequest {
            message: input.to_string(),
            conversation_id: conversation_id.clone(),
        };
        let cancel = service.request_token();
        let result = service.chat(request, token.as_deref(), &cancel, Some(&tx)).await;
        drop(tx);
        printer.await.ok();

        match result {
            Ok(reply) => {
                println!("\n🤖 HR Buddy: {}", reply.response);
                conversation_id = Some(reply.conversation_id);
            }
            Err(e) => println!("\n❌ {}", e),
        }
    }

    shutdown.shutdown(hr_buddy::core::ShutdownReason::UserInitiated);
    Ok(())
}
