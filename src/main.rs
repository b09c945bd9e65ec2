use clap::Parser;
use tracing_subscriber::EnvFilter;

use mini_voicecall::{config, run_server, ServerArgs};

/// mini-voicecall 시그널링 서버
#[derive(Parser)]
#[command(name = "vcserver", version)]
struct Cli {
    /// 바인딩 호스트
    #[arg(long, env = "VOICECALL_HOST", default_value = config::SIGNALING_HOST)]
    host: String,

    /// WS/HTTP 공용 포트
    #[arg(long, env = "VOICECALL_PORT", default_value_t = config::SIGNALING_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    // RUST_LOG 기반 로깅 초기화 (기본값: info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_server(ServerArgs { host: cli.host, port: cli.port }).await {
        tracing::error!("[mini-voicecall] server terminated: {}", e);
        std::process::exit(1);
    }
}
