// 두 CallSession 을 실제 시그널링 서버에 붙여 offer → answer → ICE → voiceData 흐름 검증
// 네이티브 미디어는 가짜 구현으로 대체

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mini_voicecall::build_router;
use mini_voicecall::call::media::{LocalAudio, MediaDevices, PeerConnection, PeerConnectionFactory, RtcConfig};
use mini_voicecall::call::{CallSession, ConnectionState, Role, SignalingState, VoiceSample};
use mini_voicecall::core::{RoomHub, UserHub};
use mini_voicecall::error::CallResult;
use mini_voicecall::protocol::message::{IceCandidate, SessionDescription};
use mini_voicecall::store::{ChatMessage, MemoryStore, Store};
use mini_voicecall::trace::TraceHub;
use portpicker::pick_unused_port;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\nc=IN IP4 0.0.0.0\r\na=mid:0\r\na=sendrecv\r\na=rtpmap:111 opus/48000/2\r\n";

// ----------------------------------------------------------------------------
// [가짜 네이티브]
// ----------------------------------------------------------------------------

struct NullAudio;

impl LocalAudio for NullAudio {
    fn track_ids(&self) -> Vec<String> { vec!["mic".to_string()] }
    fn set_enabled(&mut self, _enabled: bool) {}
    fn stop(&mut self) {}
}

struct Devices;

#[async_trait]
impl MediaDevices for Devices {
    async fn get_user_media(&self) -> CallResult<Box<dyn LocalAudio>> {
        Ok(Box::new(NullAudio))
    }
}

struct Pc {
    applied: Arc<Mutex<Vec<IceCandidate>>>,
}

#[async_trait]
impl PeerConnection for Pc {
    fn add_track(&mut self, _track_id: &str) -> CallResult<()> { Ok(()) }
    async fn create_offer(&mut self) -> CallResult<SessionDescription> { Ok(SessionDescription::offer(SDP)) }
    async fn create_answer(&mut self) -> CallResult<SessionDescription> { Ok(SessionDescription::answer(SDP)) }
    async fn set_local_description(&mut self, _d: &SessionDescription) -> CallResult<()> { Ok(()) }
    async fn set_remote_description(&mut self, _d: &SessionDescription) -> CallResult<()> { Ok(()) }
    async fn add_ice_candidate(&mut self, c: &IceCandidate) -> CallResult<()> {
        self.applied.lock().unwrap().push(c.clone());
        Ok(())
    }
    fn close(&mut self) {}
}

struct Factory {
    applied: Arc<Mutex<Vec<IceCandidate>>>,
}

impl PeerConnectionFactory for Factory {
    fn create(&self, _config: &RtcConfig) -> CallResult<Box<dyn PeerConnection>> {
        Ok(Box::new(Pc { applied: self.applied.clone() }))
    }
}

// ----------------------------------------------------------------------------
// [WS 헬퍼]
// ----------------------------------------------------------------------------

type WsTx = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsRx = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

async fn spawn_test_server() -> String {
    let port = pick_unused_port().expect("사용 가능한 포트를 찾을 수 없습니다.");
    let addr = format!("127.0.0.1:{}", port);

    let store: Arc<dyn Store<ChatMessage>> = Arc::new(MemoryStore::new());
    let app = build_router(Arc::new(UserHub::new()), Arc::new(RoomHub::new()), store, TraceHub::new());

    let listener = TcpListener::bind(&addr).await.unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

/// 소켓 1개 + CallSession 1개로 구성된 클라이언트
struct Client {
    ws_tx:   WsTx,
    ws_rx:   WsRx,
    out_rx:  mpsc::Receiver<String>,
    session: CallSession,
    applied: Arc<Mutex<Vec<IceCandidate>>>,
}

impl Client {
    async fn connect(addr: &str, local: &str, remote: &str) -> Self {
        let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.expect("WS 연결 실패");
        let (mut ws_tx, mut ws_rx) = ws.split();

        next_event(&mut ws_rx, "hello").await;
        let identify = json!({ "event": "identify", "data": { "userId": local } });
        ws_tx.send(Message::Text(identify.to_string().into())).await.unwrap();
        next_event(&mut ws_rx, "ready").await;

        let applied = Arc::new(Mutex::new(Vec::new()));
        let (out_tx, out_rx) = mpsc::channel(64);
        let session = CallSession::new(
            local,
            remote,
            Arc::new(Devices),
            Arc::new(Factory { applied: applied.clone() }),
            out_tx,
        );
        Self { ws_tx, ws_rx, out_rx, session, applied }
    }

    /// CallSession 이 내보낸 패킷을 소켓으로 전송
    async fn flush(&mut self) -> usize {
        let mut n = 0;
        while let Ok(json) = self.out_rx.try_recv() {
            self.ws_tx.send(Message::Text(json.into())).await.unwrap();
            n += 1;
        }
        n
    }

    /// 소켓에서 event 를 받아 CallSession 에 주입
    async fn deliver(&mut self, event: &str) -> Value {
        let packet = next_event(&mut self.ws_rx, event).await;
        self.session.handle_packet(&packet.to_string()).await.unwrap();
        packet
    }
}

async fn next_event(rx: &mut WsRx, event: &str) -> Value {
    let wait = async {
        loop {
            if let Message::Text(t) = rx.next().await.expect("수신 실패").expect("메시지 에러") {
                let v: Value = serde_json::from_str(&t).unwrap();
                if v["event"] == event {
                    return v;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait).await.expect("수신 타임아웃")
}

fn candidate(n: u32) -> IceCandidate {
    IceCandidate {
        candidate:        format!("candidate:{} 1 udp 2122260223 192.168.0.{} 5000 typ host", n, n),
        sdp_mid:          Some("0".to_string()),
        sdp_m_line_index: Some(0),
    }
}

// ----------------------------------------------------------------------------
// [시나리오]
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_full_call_negotiation() {
    let addr = spawn_test_server().await;

    let mut caller = Client::connect(&addr, "zz", "aa").await;
    let mut callee = Client::connect(&addr, "aa", "zz").await;

    callee.session.enable(0).await.unwrap();
    assert_eq!(callee.session.role(), Some(Role::Callee));
    assert_eq!(callee.flush().await, 0);

    caller.session.enable(0).await.unwrap();
    assert_eq!(caller.session.role(), Some(Role::Caller));
    assert_eq!(caller.flush().await, 1);

    // offer → callee
    let offer = callee.deliver("offer").await;
    assert_eq!(offer["data"]["userId"], "zz");
    assert_eq!(callee.session.signaling_state(), SignalingState::Stable);
    assert_eq!(callee.flush().await, 1);

    // answer → caller
    caller.deliver("answer").await;
    assert_eq!(
        caller.session.signaling_history(),
        &[SignalingState::New, SignalingState::HaveLocalOffer, SignalingState::Stable]
    );
    assert_eq!(
        callee.session.signaling_history(),
        &[SignalingState::New, SignalingState::HaveRemoteOffer, SignalingState::Stable]
    );

    // ICE 교환
    assert!(caller.session.on_local_ice_candidate(candidate(1)).await.unwrap());
    caller.flush().await;
    callee.deliver("ice-candidate").await;
    assert_eq!(callee.applied.lock().unwrap().as_slice(), &[candidate(1)]);

    assert!(callee.session.on_local_ice_candidate(candidate(2)).await.unwrap());
    callee.flush().await;
    caller.deliver("ice-candidate").await;
    assert_eq!(caller.applied.lock().unwrap().as_slice(), &[candidate(2)]);

    // connected 전에는 voiceData 없음
    let sample = VoiceSample { volume: 30.0, is_speaking: true, timestamp: 5 };
    assert!(!caller.session.publish_voice(&sample).await.unwrap());
    assert_eq!(caller.flush().await, 0);

    caller.session.on_connection_state(ConnectionState::Connecting);
    caller.session.on_connection_state(ConnectionState::Connected);
    assert!(caller.session.publish_voice(&sample).await.unwrap());
    assert_eq!(caller.flush().await, 1);

    let voice = next_event(&mut callee.ws_rx, "voiceData").await;
    assert_eq!(voice["data"]["userId"], "zz");
    assert_eq!(voice["data"]["volume"], 30.0);

    // 종료 후 조용
    caller.session.disable();
    assert!(!caller.session.publish_voice(&sample).await.unwrap());
    assert!(!caller.session.on_local_ice_candidate(candidate(3)).await.unwrap());
    assert_eq!(caller.flush().await, 0);
}

#[tokio::test]
async fn test_early_candidates_are_buffered() {
    let addr = spawn_test_server().await;

    let mut caller = Client::connect(&addr, "zz", "aa").await;
    let mut callee = Client::connect(&addr, "aa", "zz").await;

    callee.session.enable(0).await.unwrap();
    caller.session.enable(0).await.unwrap();

    // offer 보다 candidate 를 먼저 처리하는 상황
    caller.session.on_local_ice_candidate(candidate(7)).await.unwrap();
    caller.flush().await;

    let offer = next_event(&mut callee.ws_rx, "offer").await;
    callee.deliver("ice-candidate").await;
    assert_eq!(callee.session.pending_candidates(), 1);
    assert!(callee.applied.lock().unwrap().is_empty());

    callee.session.handle_packet(&offer.to_string()).await.unwrap();
    assert_eq!(callee.session.pending_candidates(), 0);
    assert_eq!(callee.applied.lock().unwrap().as_slice(), &[candidate(7)]);
}
