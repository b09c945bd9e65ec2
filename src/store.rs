// Store: 핸들러에 주입되는 저장소 인터페이스
//
// 현재 구현은 프로세스 메모리(MemoryStore)뿐이며 재시작 시 소실된다.
// 핸들러는 Arc<dyn Store<V>>만 알기 때문에 실제 DB 구현으로 교체해도
// 호출부는 바뀌지 않는다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::Serialize;

use crate::utils::{current_timestamp, random_id};

pub trait Store<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn put(&self, key: String, value: V);
    fn remove(&self, key: &str) -> Option<V>;
    /// 조건을 만족하는 값 목록 (순서 보장 없음)
    fn query(&self, pred: &dyn Fn(&V) -> bool) -> Vec<V>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemoryStore<V> {
    items: RwLock<HashMap<String, V>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self { items: RwLock::new(HashMap::new()) }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Store<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Option<V> {
        self.items.read().unwrap().get(key).cloned()
    }

    fn put(&self, key: String, value: V) {
        self.items.write().unwrap().insert(key, value);
    }

    fn remove(&self, key: &str) -> Option<V> {
        self.items.write().unwrap().remove(key)
    }

    fn query(&self, pred: &dyn Fn(&V) -> bool) -> Vec<V> {
        self.items.read().unwrap()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }
}

// ----------------------------------------------------------------------------
// [저장 타입] 채팅 메시지
// ----------------------------------------------------------------------------

/// 프로세스 내 저장 순번. 같은 millisecond 에 들어온 메시지도 순서 유지
static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: String,
    pub room_id:    String,
    pub author_id:  String,
    pub content:    String,
    pub timestamp:  u64,
    #[serde(skip)]
    pub seq:        u64,
}

impl ChatMessage {
    pub fn new(room_id: String, author_id: String, content: String) -> Self {
        Self {
            message_id: format!("msg_{}", random_id(16)),
            room_id,
            author_id,
            content,
            timestamp:  current_timestamp(),
            seq:        NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// 방 메시지 전체 (오래된 순)
fn room_messages(store: &dyn Store<ChatMessage>, room_id: &str) -> Vec<ChatMessage> {
    let mut list = store.query(&|m: &ChatMessage| m.room_id == room_id);
    list.sort_by_key(|m| m.seq);
    list
}

/// 방의 최근 메시지 `limit`개 (오래된 순)
pub fn recent_messages(store: &dyn Store<ChatMessage>, room_id: &str, limit: usize) -> Vec<ChatMessage> {
    let mut list = room_messages(store, room_id);
    let skip = list.len().saturating_sub(limit);
    list.split_off(skip)
}

/// 저장 후 방별 보관 한도를 넘는 오래된 메시지 삭제. 삭제 수 반환
pub fn append_message(store: &dyn Store<ChatMessage>, message: ChatMessage, keep: usize) -> usize {
    let room_id = message.room_id.clone();
    store.put(message.message_id.clone(), message);

    let list   = room_messages(store, &room_id);
    let excess = list.len().saturating_sub(keep);
    for m in &list[..excess] {
        store.remove(&m.message_id);
    }
    excess
}

/// 방 메시지 전부 삭제 (방 제거 시)
pub fn purge_room(store: &dyn Store<ChatMessage>, room_id: &str) -> usize {
    let list = store.query(&|m: &ChatMessage| m.room_id == room_id);
    for m in &list {
        store.remove(&m.message_id);
    }
    list.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, room: &str, seq: u64) -> ChatMessage {
        ChatMessage {
            message_id: id.to_string(),
            room_id:    room.to_string(),
            author_id:  "alice".to_string(),
            content:    format!("hello {}", id),
            timestamp:  1_000,
            seq,
        }
    }

    #[test]
    fn put_get_remove() {
        let store = MemoryStore::new();
        store.put("m1".to_string(), msg("m1", "general", 1));
        assert_eq!(store.get("m1").unwrap().content, "hello m1");
        assert_eq!(store.len(), 1);
        assert!(store.remove("m1").is_some());
        assert!(store.get("m1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn query_filters_by_predicate() {
        let store = MemoryStore::new();
        store.put("m1".to_string(), msg("m1", "general", 1));
        store.put("m2".to_string(), msg("m2", "random", 2));
        store.put("m3".to_string(), msg("m3", "general", 3));
        let found = store.query(&|m: &ChatMessage| m.room_id == "general");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn recent_messages_keeps_tail_in_order() {
        let store = MemoryStore::new();
        for i in 0..10u64 {
            let id = format!("m{:02}", i);
            store.put(id.clone(), msg(&id, "general", 100 + i));
        }
        store.put("other".to_string(), msg("other", "random", 105));

        let recent = recent_messages(&store, "general", 3);
        let ids: Vec<&str> = recent.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m07", "m08", "m09"]);
    }

    #[test]
    fn append_prunes_oldest_per_room() {
        let store: MemoryStore<ChatMessage> = MemoryStore::new();
        store.put("r0".to_string(), msg("r0", "random", 0));
        for i in 1..=5u64 {
            let id = format!("m{}", i);
            append_message(&store, msg(&id, "general", i), 3);
        }
        let ids: Vec<String> = recent_messages(&store, "general", 50)
            .into_iter()
            .map(|m| m.message_id)
            .collect();
        assert_eq!(ids, vec!["m3", "m4", "m5"]);
        // 다른 방은 영향 없음
        assert!(store.get("r0").is_some());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn new_messages_keep_insertion_order() {
        let store: MemoryStore<ChatMessage> = MemoryStore::new();
        for i in 0..20 {
            let m = ChatMessage::new("general".into(), "alice".into(), format!("#{}", i));
            append_message(&store, m, 50);
        }
        let contents: Vec<String> = recent_messages(&store, "general", 5)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["#15", "#16", "#17", "#18", "#19"]);
    }

    #[test]
    fn purge_room_removes_only_that_room() {
        let store: MemoryStore<ChatMessage> = MemoryStore::new();
        store.put("a".to_string(), msg("a", "lobby", 1));
        store.put("b".to_string(), msg("b", "lobby", 2));
        store.put("c".to_string(), msg("c", "general", 3));
        assert_eq!(purge_room(&store, "lobby"), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn recent_messages_empty_room() {
        let store: MemoryStore<ChatMessage> = MemoryStore::new();
        assert!(recent_messages(&store, "nowhere", 50).is_empty());
    }
}
