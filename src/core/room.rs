// RoomHub: 채팅방 정의 + 멤버 목록 관리

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{trace, warn};

use crate::error::{CallError, CallResult};
use crate::utils::current_timestamp;

#[derive(Debug)]
pub struct Room {
    pub room_id:    String,
    pub name:       String,
    pub capacity:   usize,
    pub created_at: u64,
    pub members:    RwLock<HashSet<String>>,    // user_id
}

impl Room {
    pub fn new(room_id: String, name: String, capacity: usize) -> Self {
        trace!("Creating Room: {} name={} cap={}", room_id, name, capacity);
        Self {
            room_id,
            name,
            capacity,
            created_at: current_timestamp(),
            members:    RwLock::new(HashSet::new()),
        }
    }

    pub fn add_member(&self, user_id: &str) -> CallResult<()> {
        let mut members = self.members.write().unwrap();
        if members.contains(user_id) {
            return Err(CallError::AlreadyInRoom(self.room_id.clone()));
        }
        if members.len() >= self.capacity {
            warn!("Room {} is full", self.room_id);
            return Err(CallError::RoomFull(self.room_id.clone()));
        }
        members.insert(user_id.to_string());
        trace!("Member {} joined Room {}", user_id, self.room_id);
        Ok(())
    }

    /// 멤버였으면 true
    pub fn remove_member(&self, user_id: &str) -> bool {
        let removed = self.members.write().unwrap().remove(user_id);
        if removed {
            trace!("Member {} left Room {}", user_id, self.room_id);
        }
        removed
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.read().unwrap().contains(user_id)
    }

    pub fn get_members(&self) -> HashSet<String> {
        self.members.read().unwrap().clone()
    }

    pub fn member_count(&self) -> usize {
        self.members.read().unwrap().len()
    }
}

pub struct RoomHub {
    pub rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        trace!("Initializing RoomHub");
        Self { rooms: RwLock::new(HashMap::new()) }
    }

    /// 이미 있으면 기존 방 반환
    pub fn create(&self, room_id: &str, name: &str, capacity: usize) -> Arc<Room> {
        let mut rooms = self.rooms.write().unwrap();
        let room = rooms.entry(room_id.to_string()).or_insert_with(|| {
            Arc::new(Room::new(room_id.to_string(), name.to_string(), capacity))
        });
        Arc::clone(room)
    }

    /// 없으면 만들고 멤버 추가. 빈 방 정리와 겹치지 않도록 write lock 안에서 처리
    pub fn join(&self, room_id: &str, name: &str, capacity: usize, user_id: &str) -> CallResult<Arc<Room>> {
        let mut rooms = self.rooms.write().unwrap();
        let room = rooms.entry(room_id.to_string()).or_insert_with(|| {
            Arc::new(Room::new(room_id.to_string(), name.to_string(), capacity))
        });
        room.add_member(user_id)?;
        Ok(Arc::clone(room))
    }

    /// 멤버가 없을 때만 제거
    pub fn remove_if_empty(&self, room_id: &str) -> bool {
        let mut rooms = self.rooms.write().unwrap();
        match rooms.get(room_id) {
            Some(room) if room.member_count() == 0 => {
                rooms.remove(room_id);
                trace!("Room {} removed (empty)", room_id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().unwrap().get(room_id).cloned()
    }

    pub fn all_rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.read().unwrap().values().cloned().collect()
    }

    /// 유저가 속한 방 id 목록
    pub fn rooms_of(&self, user_id: &str) -> Vec<String> {
        self.rooms.read().unwrap()
            .values()
            .filter(|r| r.is_member(user_id))
            .map(|r| r.room_id.clone())
            .collect()
    }

    /// 모든 방에서 유저 제거, 실제로 빠진 방 목록 반환
    pub fn remove_member_everywhere(&self, user_id: &str) -> Vec<Arc<Room>> {
        self.rooms.read().unwrap()
            .values()
            .filter(|r| r.remove_member(user_id))
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.rooms.read().unwrap().len()
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}
