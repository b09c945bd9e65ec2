// vcadmin: mini-voicecall 운영 관리 CLI
//
// 사용법:
//   vcadmin [--host HOST] [--port PORT] <COMMAND>
//
//   vcadmin status                 서버 상태 요약 (uptime, 연결 수, 방 수, 메시지 수)
//   vcadmin users                  User 전체 테이블
//   vcadmin users <user_id>        User 상세 (소속 방)
//   vcadmin rooms                  Room 전체 테이블
//   vcadmin rooms <room_id>        Room 상세 (멤버, 최근 메시지)

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use tabled::{Table, Tabled};

// ----------------------------------------------------------------------------
// [CLI 정의]
// ----------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name    = "vcadmin",
    about   = "mini-voicecall 운영 관리 CLI",
    version,
)]
struct Cli {
    /// 서버 호스트
    #[arg(long, env = "VOICECALL_HOST", default_value = "127.0.0.1")]
    host: String,

    /// 서버 포트 (WS/HTTP 공용)
    #[arg(long, env = "VOICECALL_PORT", default_value_t = 8080)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 서버 상태 요약
    Status,

    /// User 목록 또는 상세
    Users {
        /// user_id 지정 시 상세 보기
        user_id: Option<String>,
    },

    /// Room 목록 또는 상세
    Rooms {
        /// room_id 지정 시 상세 보기
        room_id: Option<String>,
    },
}

// ----------------------------------------------------------------------------
// [응답 타입]: http/dto.rs 와 대응
// ----------------------------------------------------------------------------

#[derive(Deserialize)]
struct ServerStatus {
    uptime_secs:   u64,
    user_count:    usize,
    room_count:    usize,
    message_count: usize,
}

#[derive(Deserialize, Tabled)]
struct AdminUserSummary {
    #[tabled(rename = "USER ID")]
    user_id:      String,
    #[tabled(rename = "SESSION")]
    session_id:   String,
    #[tabled(rename = "IDLE(s)")]
    idle_secs:    u64,
}

#[derive(Deserialize)]
struct AdminUserDetail {
    user_id:      String,
    session_id:   String,
    connected_at: u64,
    last_seen_ms: u64,
    idle_secs:    u64,
    rooms:        Vec<String>,
}

#[derive(Deserialize, Tabled)]
struct AdminRoomSummary {
    #[tabled(rename = "ROOM ID")]
    room_id:       String,
    #[tabled(rename = "NAME")]
    name:          String,
    #[tabled(rename = "MEMBERS")]
    member_count:  usize,
    #[tabled(rename = "ONLINE")]
    online_count:  usize,
    #[tabled(rename = "CAP")]
    capacity:      usize,
    #[tabled(rename = "MSGS")]
    message_count: usize,
}

#[derive(Deserialize)]
struct AdminRoomDetail {
    room_id:    String,
    name:       String,
    capacity:   usize,
    created_at: u64,
    members:    Vec<String>,
    recent:     Vec<ChatMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessage {
    author_id: String,
    content:   String,
    timestamp: u64,
}

// ----------------------------------------------------------------------------
// [main]
// ----------------------------------------------------------------------------

fn main() {
    let cli  = Cli::parse();
    let base = format!("http://{}:{}", cli.host, cli.port);

    let result = match &cli.command {
        Command::Status                      => cmd_status(&base),
        Command::Users { user_id: None }     => cmd_users(&base),
        Command::Users { user_id: Some(uid) } => cmd_user_detail(&base, uid),
        Command::Rooms { room_id: None }     => cmd_rooms(&base),
        Command::Rooms { room_id: Some(rid) } => cmd_room_detail(&base, rid),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "ERROR:".red().bold(), e);
        std::process::exit(1);
    }
}

// ----------------------------------------------------------------------------
// [커맨드 구현]
// ----------------------------------------------------------------------------

fn cmd_status(base: &str) -> Result<(), Box<dyn std::error::Error>> {
    let s: ServerStatus = get_json(&format!("{}/admin/status", base))?;

    let hours   = s.uptime_secs / 3600;
    let minutes = (s.uptime_secs % 3600) / 60;
    let secs    = s.uptime_secs % 60;

    println!();
    println!("{}", "  mini-voicecall Server Status".bold().cyan());
    println!("  {}", "─".repeat(36).dimmed());
    println!("  {:16} {}",
        "Uptime:".bold(),
        format!("{}h {}m {}s", hours, minutes, secs).green()
    );
    println!("  {:16} {}", "Users:".bold(),    s.user_count.to_string().yellow());
    println!("  {:16} {}", "Rooms:".bold(),    s.room_count.to_string().yellow());
    println!("  {:16} {}", "Messages:".bold(), s.message_count.to_string().yellow());
    println!();
    Ok(())
}

fn cmd_users(base: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut users: Vec<AdminUserSummary> = get_json(&format!("{}/admin/users", base))?;

    if users.is_empty() {
        println!("{}", "  접속 중인 User 없음".dimmed());
        return Ok(());
    }

    // 오래 조용한 세션은 강조 (reaper 대상 후보)
    for u in &mut users {
        if u.idle_secs > 20 {
            u.user_id = u.user_id.red().to_string();
        }
    }

    println!();
    println!("{}", Table::new(&users));
    println!("  {} user(s)", users.len());
    println!();
    Ok(())
}

fn cmd_user_detail(base: &str, user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let u: AdminUserDetail = get_json(&format!("{}/admin/users/{}", base, user_id))?;

    println!();
    println!("{}", format!("  User: {}", u.user_id).bold().cyan());
    println!("  {}", "─".repeat(36).dimmed());
    println!("  {:16} {}",  "Session:".bold(),   u.session_id);
    println!("  {:16} {}",  "Connected:".bold(), format_ts(u.connected_at));
    println!("  {:16} {}",  "Last Seen:".bold(), format_ts(u.last_seen_ms));
    println!("  {:16} {}s", "Idle:".bold(),      u.idle_secs);
    println!("  {:16} {}",
        "Rooms:".bold(),
        if u.rooms.is_empty() {
            "(없음)".dimmed().to_string()
        } else {
            u.rooms.join(", ").yellow().to_string()
        }
    );
    println!();
    Ok(())
}

fn cmd_rooms(base: &str) -> Result<(), Box<dyn std::error::Error>> {
    let rooms: Vec<AdminRoomSummary> = get_json(&format!("{}/admin/rooms", base))?;

    if rooms.is_empty() {
        println!("{}", "  방 없음".dimmed());
        return Ok(());
    }

    println!();
    println!("{}", Table::new(&rooms));
    println!("  {} room(s)", rooms.len());
    println!();
    Ok(())
}

fn cmd_room_detail(base: &str, room_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let room: AdminRoomDetail = get_json(&format!("{}/admin/rooms/{}", base, room_id))?;

    println!();
    println!("{}", format!("  Room: {} {}", room.room_id, room.name).bold().cyan());
    println!("  {}", "─".repeat(48).dimmed());
    println!("  {:18} {}", "Capacity:".bold(), format!("{}/{}", room.members.len(), room.capacity));
    println!("  {:18} {}", "Created:".bold(),  format_ts(room.created_at));

    println!();
    println!("{}", "  Members".bold());
    if room.members.is_empty() {
        println!("    {}", "(없음)".dimmed());
    } else {
        for m in &room.members {
            println!("    · {}", m.yellow());
        }
    }

    if !room.recent.is_empty() {
        println!();
        println!("{} ({})", "  Recent Messages".bold(), room.recent.len());
        for msg in &room.recent {
            println!("    {} {} {}",
                format_ts(msg.timestamp).dimmed(),
                format!("<{}>", msg.author_id).bright_white(),
                msg.content,
            );
        }
    }

    println!();
    Ok(())
}

// ----------------------------------------------------------------------------
// [공통 유틸]
// ----------------------------------------------------------------------------

/// GET 요청 + JSON 역직렬화
fn get_json<T: for<'de> serde::Deserialize<'de>>(url: &str) -> Result<T, Box<dyn std::error::Error>> {
    let resp   = reqwest::blocking::get(url)?;
    let status = resp.status();
    if !status.is_success() {
        let body: serde_json::Value = resp.json().unwrap_or_default();
        let msg = body["error"].as_str().unwrap_or("unknown error");
        return Err(format!("[{}] {}", status, msg).into());
    }
    Ok(resp.json()?)
}

/// Unix millis → 로컬 "YYYY-MM-DD HH:MM:SS"
fn format_ts(ms: u64) -> String {
    if ms == 0 {
        return "-".to_string();
    }
    match Local.timestamp_millis_opt(ms as i64).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None     => "-".to_string(),
    }
}
