// 네트워크 로직과 분리된, 순수 세션/방 상태 관리 모듈입니다.

pub mod room;
pub mod user;

pub use room::{Room, RoomHub};
pub use user::{EgressTx, User, UserHub};
