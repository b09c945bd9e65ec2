// UserHub: WS 세션 관리 + user_id 기반 라우팅 테이블
//
// socket ↔ user_id 매핑을 명시적으로 보관한다.
// 시그널링 메시지는 이 테이블을 통해 수신자 소켓에만 전달된다 (브로드캐스트 금지).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::utils::current_timestamp;

/// 송신 큐 타입 (직렬화된 SocketPacket JSON)
pub type EgressTx = mpsc::Sender<String>;

// ----------------------------------------------------------------------------
// [User] identify 시 등록, WS 종료 시 제거
// ----------------------------------------------------------------------------

pub struct User {
    pub session_id:   String,
    pub tx:           EgressTx,
    pub connected_at: u64,
    pub last_seen:    AtomicU64,   // 마지막 메시지 수신 시간 (좀비 세션 감지용)
}

impl User {
    pub fn new(session_id: String, tx: EgressTx) -> Self {
        let now = current_timestamp();
        Self {
            session_id,
            tx,
            connected_at: now,
            last_seen:    AtomicU64::new(now),
        }
    }

    pub fn touch(&self) {
        self.last_seen.store(current_timestamp(), Ordering::Relaxed);
    }
}

// ----------------------------------------------------------------------------
// [UserHub] 전역 라우팅 테이블
// ----------------------------------------------------------------------------

pub struct UserHub {
    users: RwLock<HashMap<String, Arc<User>>>,
}

impl UserHub {
    pub fn new() -> Self {
        trace!("Initializing UserHub");
        Self { users: RwLock::new(HashMap::new()) }
    }

    /// 같은 user_id로 재접속하면 마지막 세션이 이긴다
    pub fn register(&self, user_id: &str, session_id: &str, tx: EgressTx) -> Arc<User> {
        let user = Arc::new(User::new(session_id.to_string(), tx));
        let prev = self.users.write().unwrap().insert(user_id.to_string(), Arc::clone(&user));
        if prev.is_some() {
            warn!("User re-registered, previous session replaced: {}", user_id);
        }
        trace!("User registered: {} session={}", user_id, session_id);
        user
    }

    /// 해당 세션이 아직 매핑의 주인일 때만 제거 (재접속한 새 세션 보호)
    pub fn unregister_session(&self, user_id: &str, session_id: &str) -> bool {
        let mut users = self.users.write().unwrap();
        match users.get(user_id) {
            Some(u) if u.session_id == session_id => {
                users.remove(user_id);
                trace!("User unregistered: {} session={}", user_id, session_id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<User>> {
        self.users.read().unwrap().get(user_id).cloned()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.read().unwrap().contains_key(user_id)
    }

    /// 특정 user 1명에게만 전송. 오프라인이면 false (메시지 drop)
    pub async fn send_to(&self, user_id: &str, packet_json: String) -> bool {
        let user = match self.get(user_id) {
            Some(u) => u,
            None    => return false,
        };
        if user.tx.send(packet_json).await.is_err() {
            warn!("Send failed: rx closed user={}", user_id);
            return false;
        }
        true
    }

    /// user_id 목록을 받아 각각의 tx로 패킷 전송
    /// exclude: 브로드캐스트에서 제외할 user_id (발신자 본인 등)
    pub async fn broadcast_to(&self, user_ids: &HashSet<String>, packet_json: &str, exclude: Option<&str>) {
        let targets: Vec<Arc<User>> = {
            let users = self.users.read().unwrap();
            user_ids.iter()
                .filter(|uid| exclude.map_or(true, |ex| ex != uid.as_str()))
                .filter_map(|uid| users.get(uid).cloned())
                .collect()
        };

        for user in targets {
            if user.tx.send(packet_json.to_string()).await.is_err() {
                warn!("Broadcast failed: rx closed");
            }
        }
    }

    /// 접속 중인 전체 유저에게 전송 (presence 용)
    pub async fn broadcast_all(&self, packet_json: &str, exclude: Option<&str>) {
        let ids: HashSet<String> = self.users.read().unwrap().keys().cloned().collect();
        self.broadcast_to(&ids, packet_json, exclude).await;
    }

    /// 전체 User 목록 반환 (admin 조회용)
    pub fn all_users(&self) -> Vec<(String, Arc<User>)> {
        self.users.read().unwrap()
            .iter()
            .map(|(id, u)| (id.clone(), Arc::clone(u)))
            .collect()
    }

    /// 현재 접속 User 수
    pub fn count(&self) -> usize {
        self.users.read().unwrap().len()
    }

    /// 좀비 세션 목록 (user_id, session_id). last_seen 기준
    pub fn find_zombies(&self, timeout_ms: u64) -> Vec<(String, String)> {
        let now = current_timestamp();
        self.users.read().unwrap()
            .iter()
            .filter(|(_, u)| now.saturating_sub(u.last_seen.load(Ordering::Relaxed)) >= timeout_ms)
            .map(|(id, u)| (id.clone(), u.session_id.clone()))
            .collect()
    }
}

impl Default for UserHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tx() -> EgressTx {
        let (tx, _rx) = mpsc::channel(16);
        tx
    }

    #[test]
    fn register_and_get() {
        let hub = UserHub::new();
        hub.register("alice", "s1", make_tx());
        assert!(hub.get("alice").is_some());
        assert!(hub.get("bob").is_none());
        assert!(hub.is_online("alice"));
    }

    #[test]
    fn unregister_removes_user() {
        let hub = UserHub::new();
        hub.register("alice", "s1", make_tx());
        assert!(hub.unregister_session("alice", "s1"));
        assert!(hub.get("alice").is_none());
        assert_eq!(hub.count(), 0);
    }

    #[test]
    fn duplicate_register_overwrites() {
        let hub = UserHub::new();
        hub.register("alice", "s1", make_tx());
        hub.register("alice", "s2", make_tx());
        assert_eq!(hub.count(), 1);
        assert_eq!(hub.get("alice").unwrap().session_id, "s2");
    }

    #[test]
    fn stale_session_cannot_unregister_new_one() {
        let hub = UserHub::new();
        hub.register("alice", "old", make_tx());
        hub.register("alice", "new", make_tx());
        assert!(!hub.unregister_session("alice", "old"));
        assert!(hub.is_online("alice"));
        assert!(hub.unregister_session("alice", "new"));
        assert!(!hub.is_online("alice"));
    }

    #[tokio::test]
    async fn send_to_reaches_only_target() {
        let hub = UserHub::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        hub.register("alice", "s1", tx_a);
        hub.register("bob", "s2", tx_b);

        assert!(hub.send_to("bob", "ping".to_string()).await);
        assert_eq!(rx_b.recv().await.as_deref(), Some("ping"));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_offline_is_dropped() {
        let hub = UserHub::new();
        assert!(!hub.send_to("ghost", "ping".to_string()).await);
    }

    #[tokio::test]
    async fn broadcast_all_excludes_sender() {
        let hub = UserHub::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        hub.register("alice", "s1", tx_a);
        hub.register("bob", "s2", tx_b);

        hub.broadcast_all("hi", Some("alice")).await;
        assert_eq!(rx_b.recv().await.as_deref(), Some("hi"));
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn touch_updates_last_seen() {
        let hub = UserHub::new();
        let user = hub.register("alice", "s1", make_tx());
        let t1 = user.last_seen.load(Ordering::Relaxed);
        std::thread::sleep(std::time::Duration::from_millis(5));
        user.touch();
        let t2 = user.last_seen.load(Ordering::Relaxed);
        assert!(t2 >= t1);
    }

    #[test]
    fn find_zombies_fresh_users_empty() {
        let hub = UserHub::new();
        hub.register("alice", "s1", make_tx());
        assert!(hub.find_zombies(60_000).is_empty());
        assert_eq!(hub.find_zombies(0), vec![("alice".to_string(), "s1".to_string())]);
    }
}
