// vctrace: mini-voicecall 실시간 시그널링 관찰 CLI
//
// 사용법:
//   vctrace [--host HOST] [--port PORT] [--filter EVENT] [ROOM_ID]
//
// 예시:
//   vctrace                           # 전체 이벤트 스트림
//   vctrace general                   # general 방만
//   vctrace --filter offer            # offer 이벤트만 (시그널링은 방과 무관)
//   vctrace general --filter chat     # general + chat 이벤트만

use chrono::{Local, TimeZone};
use clap::Parser;
use colored::Colorize;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::io::{BufRead, BufReader};

// ----------------------------------------------------------------------------
// [CLI 인자]
// ----------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name    = "vctrace",
    about   = "mini-voicecall 실시간 시그널링 이벤트 스트림 관찰",
    version,
)]
struct Cli {
    /// 서버 호스트
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// 서버 포트
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// 이벤트 이름 필터 (대소문자 무관, 부분 일치)
    #[arg(long, short = 'f')]
    filter: Option<String>,

    /// 관찰할 방 ID (생략 시 전체)
    room_id: Option<String>,
}

// ----------------------------------------------------------------------------
// [TraceEvent 역직렬화]: src/trace.rs와 동일 구조
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TraceEvent {
    ts:      u64,
    dir:     String,        // "in" | "out" | "sys"
    room_id: Option<String>,
    user_id: Option<String>,
    event:   String,
    summary: String,
}

// ----------------------------------------------------------------------------
// [메인]
// ----------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    let url = match &cli.room_id {
        Some(room) => format!("http://{}:{}/trace/{}", cli.host, cli.port, room),
        None       => format!("http://{}:{}/trace",   cli.host, cli.port),
    };

    let filter = cli.filter.as_ref().map(|s| s.to_lowercase());

    println!("{}", "─".repeat(90).dimmed());
    println!(
        "  {} {}  {}  {}",
        "vctrace".bold().cyan(),
        "▶".green(),
        url.dimmed(),
        filter.as_deref()
            .map(|f| format!("[filter: {}]", f).yellow().to_string())
            .unwrap_or_default(),
    );
    println!("{}", "─".repeat(90).dimmed());
    println!(
        "  {:<12} {:<6} {:<16} {:<18} {:<10} {}",
        "TIME".dimmed(),
        "DIR".dimmed(),
        "EVENT".dimmed(),
        "USER".dimmed(),
        "ROOM".dimmed(),
        "SUMMARY".dimmed(),
    );
    println!("{}", "─".repeat(90).dimmed());

    // SSE 스트림은 끝이 없으므로 타임아웃 없음
    let client = match Client::builder().timeout(None).build() {
        Ok(c)  => c,
        Err(e) => {
            eprintln!("{} HTTP 클라이언트 생성 실패: {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    let resp = match client
        .get(&url)
        .header("Accept", "text/event-stream")
        .send()
    {
        Ok(r)  => r,
        Err(e) => {
            eprintln!("{} 서버 연결 실패: {}", "✗".red(), e);
            eprintln!("  서버가 실행 중인지 확인하세요: {}", url.dimmed());
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        eprintln!("{} HTTP {}", "✗".red(), resp.status());
        std::process::exit(1);
    }

    let reader = BufReader::new(resp);
    let mut event_count: u64 = 0;

    for line in reader.lines() {
        let line = match line {
            Ok(l)  => l,
            Err(e) => {
                eprintln!("{} 스트림 읽기 실패: {}", "✗".red(), e);
                break;
            }
        };

        // SSE 포맷: "data: {JSON}" / ": keep-alive" / 빈 줄
        let Some(json_str) = line.strip_prefix("data: ") else {
            continue;
        };

        let event: TraceEvent = match serde_json::from_str(json_str) {
            Ok(e)  => e,
            Err(e) => {
                eprintln!("{} JSON 파싱 실패: {} ({})", "⚠".yellow(), e, json_str);
                continue;
            }
        };

        if !matches_filter(&event.event, filter.as_deref()) {
            continue;
        }

        print_event(&event);
        event_count += 1;
    }

    println!("{}", "─".repeat(90).dimmed());
    println!("  스트림 종료 (총 {} 이벤트)", event_count);
}

// ----------------------------------------------------------------------------
// [이벤트 출력]
// ----------------------------------------------------------------------------

fn matches_filter(event: &str, filter: Option<&str>) -> bool {
    match filter {
        None    => true,
        Some(f) => event.to_lowercase().contains(f),
    }
}

fn print_event(e: &TraceEvent) {
    let dir_str = match e.dir.as_str() {
        "in"  => "↓ C→S".bright_blue().to_string(),
        "out" => "↑ S→C".bright_green().to_string(),
        "sys" => "· SYS".bright_yellow().to_string(),
        other => other.dimmed().to_string(),
    };

    let user_str = e.user_id.as_deref().unwrap_or("-");
    let room_str = e.room_id.as_deref().unwrap_or("-");

    println!(
        "  {} {} {:<16} {:<18} {:<10} {}",
        format_ts(e.ts).dimmed(),
        dir_str,
        colorize_event(&e.event),
        truncate(user_str, 18).bright_white().to_string(),
        room_str.dimmed(),
        e.summary.dimmed(),
    );
}

fn colorize_event(name: &str) -> String {
    match name {
        "offer" | "answer"      => name.bright_green().bold().to_string(),
        "ice-candidate"         => name.green().to_string(),
        "join-room" | "leave-room" => name.bright_cyan().to_string(),
        "identify"              => name.bright_magenta().to_string(),
        "reap" | "disconnect"  => name.bright_red().bold().to_string(),
        _                       => name.normal().to_string(),
    }
}

/// Unix millis → 로컬 "HH:MM:SS.mmm"
fn format_ts(ts_ms: u64) -> String {
    match Local.timestamp_millis_opt(ts_ms as i64).single() {
        Some(dt) => dt.format("%H:%M:%S%.3f").to_string(),
        None     => "--:--:--.---".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        format!("{:<width$}", s, width = max)
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive_substring() {
        assert!(matches_filter("ice-candidate", Some("ice")));
        assert!(matches_filter("Offer", Some("offer")));
        assert!(!matches_filter("chat-message", Some("offer")));
        assert!(matches_filter("anything", None));
    }

    #[test]
    fn truncate_pads_and_cuts() {
        assert_eq!(truncate("bob", 5), "bob  ");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("가나다라마바", 4), "가나다…");
    }
}
