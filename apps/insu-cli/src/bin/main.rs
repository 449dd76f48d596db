use std::io::{self, BufRead, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;
use tracing_subscriber::EnvFilter;

use insu_chat::{Assistant, Reply, ServiceContext};
use insu_core::config::Config;

const PROMPT: &str = "질문을 입력하세요 (종료하려면 'q', 'quit', 'exit' 입력):";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("답변을 생성하는 중...");
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Comparison(outcome) => {
            println!("\n=== 실행 결과 ===\n");
            println!("{}", outcome.profile);
            println!("\n[검색 결과]");
            println!("전체 결과 수: {}개\n", outcome.rows);
            println!("{}", outcome.json);
        }
        Reply::Policy(policy) => {
            println!("\n{}", policy.answer);
            for failure in policy.report.failures.iter().chain(&policy.load_failures) {
                eprintln!("⚠️  {} 검색 제외: {}", failure.collection, failure.reason);
            }
        }
        Reply::ComparisonUnavailable => println!("\n{}", reply.text()),
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let ctx = ServiceContext::from_settings(settings)?;
    let assistant = Assistant::from_context(&ctx);

    println!("\n=== 보험 상담 챗봇 ===");
    let stdin = io::stdin();
    loop {
        println!("{PROMPT}");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "q" | "quit" | "exit") {
            println!("상담을 종료합니다. 이용해 주셔서 감사합니다.");
            break;
        }

        let pb = spinner()?;
        let reply = assistant.respond(question).await;
        pb.finish_and_clear();
        match reply {
            Ok(reply) => print_reply(&reply),
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to answer question");
                println!("\n죄송합니다. 답변을 생성하는 중 문제가 발생했습니다. 잠시 후 다시 시도해주세요.\n");
            }
        }
    }

    ctx.close().await;
    Ok(())
}
