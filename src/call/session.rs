// CallSession: 1:1 음성 통화의 피어 커넥션 수명주기
//
// 상태 흐름:
//   caller : new → have-local-offer → stable
//   callee : new → have-remote-offer → stable
//   disable() 이후 : closed (enable() 로 재시작 가능)
//
// 네이티브 콜백(ICE 후보, 연결 상태, 원격 트랙)은 on_* 메서드로 주입된다.
// 시그널링 출력은 signal_tx 로 {event, data} JSON 을 내보낸다.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, trace, warn};

use crate::call::media::{LocalAudio, MediaDevices, PeerConnection, PeerConnectionFactory, RtcConfig};
use crate::call::retry::OfferRetry;
use crate::call::role::Role;
use crate::call::sdp::validate_description;
use crate::call::voice::VoiceSample;
use crate::config;
use crate::error::{CallError, CallResult};
use crate::protocol::event::client as ev;
use crate::protocol::message::{
    AnswerPayload, IceCandidate, IceCandidatePayload, OfferPayload, SdpType, SocketPacket,
    VoiceDataPayload,
};
use crate::protocol::{make_packet, parse_payload, send};
use crate::utils::current_timestamp;

// ----------------------------------------------------------------------------
// [상태]
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Closed,
}

impl std::fmt::Display for SignalingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalingState::New             => "new",
            SignalingState::HaveLocalOffer  => "have-local-offer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::Stable          => "stable",
            SignalingState::Closed          => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// RTCPeerConnection.connectionState 문자열
    pub fn from_native(s: &str) -> Option<Self> {
        match s {
            "new"          => Some(ConnectionState::New),
            "connecting"   => Some(ConnectionState::Connecting),
            "connected"    => Some(ConnectionState::Connected),
            "disconnected" => Some(ConnectionState::Disconnected),
            "failed"       => Some(ConnectionState::Failed),
            "closed"       => Some(ConnectionState::Closed),
            _              => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::New          => "new",
            ConnectionState::Connecting   => "connecting",
            ConnectionState::Connected    => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed       => "failed",
            ConnectionState::Closed       => "closed",
        };
        f.write_str(s)
    }
}

// ----------------------------------------------------------------------------
// [CallSession]
// ----------------------------------------------------------------------------

pub struct CallSession {
    local_id:  String,
    remote_id: String,

    devices:    Arc<dyn MediaDevices>,
    factory:    Arc<dyn PeerConnectionFactory>,
    rtc_config: RtcConfig,
    retry:      OfferRetry,
    signal_tx:  mpsc::Sender<String>,

    enabled: bool,
    muted:   bool,
    role:    Option<Role>,
    audio:   Option<Box<dyn LocalAudio>>,
    pc:      Option<Box<dyn PeerConnection>>,

    signaling:   SignalingState,
    connection:  ConnectionState,
    history:     Vec<SignalingState>,
    remote_desc: bool,
    pending:     VecDeque<IceCandidate>,
    remote_audio_attached: bool,
    remote_voice: Option<VoiceSample>,

    offer_deadline: Option<u64>,
    offer_retries:  u32,
}

impl CallSession {
    pub fn new(
        local_id:  impl Into<String>,
        remote_id: impl Into<String>,
        devices:   Arc<dyn MediaDevices>,
        factory:   Arc<dyn PeerConnectionFactory>,
        signal_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            local_id:  local_id.into(),
            remote_id: remote_id.into(),
            devices,
            factory,
            rtc_config: RtcConfig::stun_only(),
            retry:      OfferRetry::default(),
            signal_tx,
            enabled: false,
            muted:   false,
            role:    None,
            audio:   None,
            pc:      None,
            signaling:   SignalingState::New,
            connection:  ConnectionState::New,
            history:     Vec::new(),
            remote_desc: false,
            pending:     VecDeque::new(),
            remote_audio_attached: false,
            remote_voice: None,
            offer_deadline: None,
            offer_retries:  0,
        }
    }

    pub fn with_retry(mut self, retry: OfferRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rtc_config(mut self, rtc_config: RtcConfig) -> Self {
        self.rtc_config = rtc_config;
        self
    }

    // ------------------------------------------------------------------------
    // enable / disable
    // ------------------------------------------------------------------------

    /// 마이크 획득 → 피어 커넥션 생성 → 트랙 추가 → (caller) offer 전송
    ///
    /// 장치/환경 에러는 그대로 반환되고 세션은 비활성으로 남는다.
    /// offer 생성 실패는 로그만 남기고 on_tick 재시도에 맡긴다.
    pub async fn enable(&mut self, now_ms: u64) -> CallResult<()> {
        if self.enabled {
            trace!("enable ignored (already enabled) {} → {}", self.local_id, self.remote_id);
            return Ok(());
        }

        let role = Role::decide(&self.local_id, &self.remote_id)?;

        let mut audio = self.devices.get_user_media().await?;

        let mut pc = match self.factory.create(&self.rtc_config) {
            Ok(pc) => pc,
            Err(e) => {
                audio.stop();
                return Err(e);
            }
        };

        for track_id in audio.track_ids() {
            if let Err(e) = pc.add_track(&track_id) {
                audio.stop();
                pc.close();
                return Err(e);
            }
        }
        audio.set_enabled(!self.muted);

        self.audio      = Some(audio);
        self.pc         = Some(pc);
        self.role       = Some(role);
        self.enabled    = true;
        self.signaling  = SignalingState::New;
        self.connection = ConnectionState::New;
        self.history    = vec![SignalingState::New];

        info!("[call] enabled {} → {} role={}", self.local_id, self.remote_id, role);

        if role.is_caller() {
            if let Err(e) = self.send_offer(now_ms).await {
                warn!("[call] offer failed {} → {}: {}", self.local_id, self.remote_id, e);
            }
        }
        Ok(())
    }

    /// 트랙 정지 + 피어 커넥션 종료 + 상태 초기화. 협상 중에도 호출 가능
    pub fn disable(&mut self) {
        let was_enabled = self.enabled;

        if let Some(mut audio) = self.audio.take() {
            audio.stop();
        }
        if let Some(mut pc) = self.pc.take() {
            pc.close();
        }

        self.enabled    = false;
        self.muted      = false;
        self.role       = None;
        self.signaling  = SignalingState::Closed;
        self.connection = ConnectionState::Closed;
        self.history.clear();
        self.remote_desc = false;
        self.pending.clear();
        self.remote_audio_attached = false;
        self.remote_voice   = None;
        self.offer_deadline = None;
        self.offer_retries  = 0;

        if was_enabled {
            info!("[call] disabled {} → {}", self.local_id, self.remote_id);
        }
    }

    // ------------------------------------------------------------------------
    // 시그널링 수신
    // ------------------------------------------------------------------------

    /// 소켓에서 받은 raw 패킷 라우팅. 통화와 무관한 이벤트는 무시
    pub async fn handle_packet(&mut self, raw: &str) -> CallResult<()> {
        let packet: SocketPacket = serde_json::from_str(raw)
            .map_err(|e| CallError::InvalidPayload(e.to_string()))?;

        match packet.event.as_str() {
            ev::OFFER         => self.on_offer(parse_payload(packet.data)?).await,
            ev::ANSWER        => self.on_answer(parse_payload(packet.data)?).await,
            ev::ICE_CANDIDATE => self.on_remote_ice_candidate(parse_payload(packet.data)?).await,
            ev::VOICE_DATA    => self.on_voice_data(parse_payload(packet.data)?),
            _ => Ok(()),
        }
    }

    pub async fn on_offer(&mut self, payload: OfferPayload) -> CallResult<()> {
        if !self.is_ours(&payload.user_id, &payload.recipient_id) {
            return Ok(());
        }
        if !self.enabled {
            return Err(CallError::InvalidState("offer received while audio disabled".to_string()));
        }
        if self.connection == ConnectionState::Failed {
            return Err(CallError::InvalidState("offer after negotiation failed".to_string()));
        }
        if self.is_caller() {
            warn!("[call] glare: offer from {} ignored (local is caller)", payload.user_id);
            return Ok(());
        }
        // have-remote-offer: 직전 answer 생성이 실패했고 caller 가 재전송한 경우
        if !matches!(
            self.signaling,
            SignalingState::New | SignalingState::HaveRemoteOffer | SignalingState::Stable
        ) {
            return Err(CallError::InvalidState(format!("offer in {}", self.signaling)));
        }

        validate_description(&payload.offer, SdpType::Offer)?;

        self.pc_mut()?.set_remote_description(&payload.offer).await?;
        self.remote_desc = true;
        self.set_signaling(SignalingState::HaveRemoteOffer);
        self.flush_candidates().await;

        let pc = self.pc_mut()?;
        let answer = pc.create_answer().await?;
        pc.set_local_description(&answer).await?;
        self.set_signaling(SignalingState::Stable);

        self.emit(ev::ANSWER, AnswerPayload {
            answer,
            recipient_id: self.remote_id.clone(),
            user_id:      self.local_id.clone(),
        }).await
    }

    pub async fn on_answer(&mut self, payload: AnswerPayload) -> CallResult<()> {
        if !self.is_ours(&payload.user_id, &payload.recipient_id) {
            return Ok(());
        }
        if !self.enabled {
            return Err(CallError::InvalidState("answer received while audio disabled".to_string()));
        }
        if self.connection == ConnectionState::Failed {
            return Err(CallError::InvalidState("answer after negotiation failed".to_string()));
        }
        if self.signaling != SignalingState::HaveLocalOffer {
            return Err(CallError::InvalidState(format!("answer in {}", self.signaling)));
        }

        validate_description(&payload.answer, SdpType::Answer)?;

        self.pc_mut()?.set_remote_description(&payload.answer).await?;
        self.remote_desc    = true;
        self.offer_deadline = None;
        self.set_signaling(SignalingState::Stable);
        self.flush_candidates().await;
        Ok(())
    }

    /// 원격 설명 전에 도착한 후보는 버퍼링 후 일괄 적용
    pub async fn on_remote_ice_candidate(&mut self, payload: IceCandidatePayload) -> CallResult<()> {
        if !self.is_ours(&payload.user_id, &payload.recipient_id)
            || !self.enabled
            || self.connection == ConnectionState::Failed
        {
            return Ok(());
        }

        if !self.remote_desc {
            if self.pending.len() >= config::MAX_PENDING_CANDIDATES {
                warn!("[call] candidate buffer full, dropping oldest ({})", self.remote_id);
                self.pending.pop_front();
            }
            self.pending.push_back(payload.candidate);
            return Ok(());
        }

        self.apply_candidate(&payload.candidate).await;
        Ok(())
    }

    /// 상대의 voiceData. 마지막 값만 보관
    pub fn on_voice_data(&mut self, payload: VoiceDataPayload) -> CallResult<()> {
        if !self.is_ours(&payload.user_id, &payload.recipient_id) || !self.enabled {
            return Ok(());
        }
        self.remote_voice = Some(VoiceSample {
            volume:      payload.volume.clamp(0.0, config::VOICE_MAX_VOLUME),
            is_speaking: payload.is_speaking,
            timestamp:   payload.timestamp,
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // 네이티브 콜백
    // ------------------------------------------------------------------------

    /// onicecandidate → 상대에게 전달. 전송했으면 true
    pub async fn on_local_ice_candidate(&mut self, candidate: IceCandidate) -> CallResult<bool> {
        if !self.enabled {
            return Ok(false);
        }
        self.emit(ev::ICE_CANDIDATE, IceCandidatePayload {
            candidate,
            recipient_id: self.remote_id.clone(),
            user_id:      self.local_id.clone(),
        }).await?;
        Ok(true)
    }

    pub fn on_connection_state(&mut self, state: ConnectionState) {
        if !self.enabled || self.connection == ConnectionState::Failed {
            return;
        }
        if self.connection != state {
            debug!("[call] connection {} → {} ({})", self.connection, state, self.remote_id);
            self.connection = state;
        }
    }

    pub fn on_remote_track(&mut self) {
        if self.enabled {
            self.remote_audio_attached = true;
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(audio) = self.audio.as_mut() {
            audio.set_enabled(!muted);
        }
    }

    // ------------------------------------------------------------------------
    // 타이머 / 음성
    // ------------------------------------------------------------------------

    /// offer 마감 확인. 재시도 소진 시 failed 로 전이하고 NegotiationTimeout 반환
    pub async fn on_tick(&mut self, now_ms: u64) -> CallResult<()> {
        if !self.enabled || !self.is_caller()
            || self.signaling == SignalingState::Stable
            || self.connection == ConnectionState::Failed
        {
            return Ok(());
        }
        let Some(deadline) = self.offer_deadline else {
            return Ok(());
        };
        if now_ms < deadline {
            return Ok(());
        }

        if !self.retry.can_retry(self.offer_retries) {
            self.offer_deadline = None;
            self.connection     = ConnectionState::Failed;
            self.pending.clear();
            if let Some(mut pc) = self.pc.take() {
                pc.close();
            }
            warn!("[call] no answer from {} after {} retries", self.remote_id, self.offer_retries);
            return Err(CallError::NegotiationTimeout(self.offer_retries));
        }

        self.offer_retries += 1;
        info!("[call] resending offer to {} (retry {}/{})",
            self.remote_id, self.offer_retries, self.retry.max_retries);
        if let Err(e) = self.send_offer(now_ms).await {
            warn!("[call] offer retry failed {} → {}: {}", self.local_id, self.remote_id, e);
        }
        Ok(())
    }

    /// connected 상태에서만 voiceData 전송. 전송했으면 true
    pub async fn publish_voice(&mut self, sample: &VoiceSample) -> CallResult<bool> {
        if !self.enabled || self.connection != ConnectionState::Connected {
            return Ok(false);
        }
        self.emit(ev::VOICE_DATA, sample.to_payload(&self.local_id, &self.remote_id)).await?;
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // 조회
    // ------------------------------------------------------------------------

    pub fn local_id(&self) -> &str { &self.local_id }
    pub fn remote_id(&self) -> &str { &self.remote_id }
    pub fn role(&self) -> Option<Role> { self.role }
    pub fn is_enabled(&self) -> bool { self.enabled }
    pub fn is_muted(&self) -> bool { self.muted }
    pub fn signaling_state(&self) -> SignalingState { self.signaling }
    pub fn connection_state(&self) -> ConnectionState { self.connection }
    pub fn signaling_history(&self) -> &[SignalingState] { &self.history }
    pub fn offer_retries(&self) -> u32 { self.offer_retries }
    pub fn offer_deadline(&self) -> Option<u64> { self.offer_deadline }
    pub fn pending_candidates(&self) -> usize { self.pending.len() }
    pub fn remote_audio_attached(&self) -> bool { self.remote_audio_attached }
    pub fn remote_voice(&self) -> Option<VoiceSample> { self.remote_voice }

    pub fn is_caller(&self) -> bool {
        self.role.map(Role::is_caller).unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // 내부
    // ------------------------------------------------------------------------

    /// 마감을 먼저 걸어 두고 offer 생성. 실패해도 on_tick 이 다시 시도한다
    async fn send_offer(&mut self, now_ms: u64) -> CallResult<()> {
        self.offer_deadline = Some(now_ms + self.retry.delay_for(self.offer_retries));

        let pc = self.pc_mut()?;
        let offer = pc.create_offer().await?;
        pc.set_local_description(&offer).await?;
        self.set_signaling(SignalingState::HaveLocalOffer);

        self.emit(ev::OFFER, OfferPayload {
            offer,
            recipient_id: self.remote_id.clone(),
            user_id:      self.local_id.clone(),
        }).await
    }

    async fn flush_candidates(&mut self) {
        let buffered: Vec<IceCandidate> = self.pending.drain(..).collect();
        if !buffered.is_empty() {
            debug!("[call] flushing {} buffered candidates ({})", buffered.len(), self.remote_id);
        }
        for candidate in buffered {
            self.apply_candidate(&candidate).await;
        }
    }

    async fn apply_candidate(&mut self, candidate: &IceCandidate) {
        let Some(pc) = self.pc.as_mut() else { return };
        let res = pc.add_ice_candidate(candidate).await;
        if let Err(e) = res {
            warn!("[call] addIceCandidate failed ({}): {}", self.remote_id, e);
        }
    }

    /// 다른 통화의 트래픽은 무시
    fn is_ours(&self, sender: &str, recipient: &str) -> bool {
        let ours = sender == self.remote_id && recipient == self.local_id;
        if !ours {
            trace!("[call] ignoring {} → {} (session {} ↔ {})",
                sender, recipient, self.local_id, self.remote_id);
        }
        ours
    }

    fn set_signaling(&mut self, state: SignalingState) {
        if self.signaling != state {
            debug!("[call] signaling {} → {} ({})", self.signaling, state, self.remote_id);
            self.signaling = state;
            self.history.push(state);
        }
    }

    fn pc_mut(&mut self) -> CallResult<&mut Box<dyn PeerConnection>> {
        self.pc.as_mut().ok_or_else(|| CallError::InvalidState("no peer connection".to_string()))
    }

    async fn emit(&self, event: &str, payload: impl Serialize + Send) -> CallResult<()> {
        send(&self.signal_tx, make_packet(event, payload)).await
    }
}

/// offer 마감 감시 루프. stable / failed / disable 중 하나가 되면 종료
pub async fn watch_offer_timeout(session: Arc<Mutex<CallSession>>) {
    let mut interval = tokio::time::interval(Duration::from_millis(config::OFFER_WATCH_INTERVAL_MS));

    loop {
        interval.tick().await;

        let mut s = session.lock().await;
        if !s.is_enabled()
            || !s.is_caller()
            || s.signaling_state() == SignalingState::Stable
            || s.connection_state() == ConnectionState::Failed
        {
            break;
        }
        if let Err(e) = s.on_tick(current_timestamp()).await {
            warn!("[call] offer watch ended: {}", e);
            break;
        }
    }
}
