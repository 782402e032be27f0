use crate::models::UserRole;
use crate::ws::events::envelope;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// 单个连接的出站通道, 会话 ID 内部分配
struct SessionEntry {
    user_id: i64,
    role: UserRole,
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
struct HubInner {
    sessions: RwLock<HashMap<u64, SessionEntry>>,
    next_id: AtomicU64,
}

/// 推送总线: 按连接注册出站通道, 支持全局广播与 `user:<id>` 房间定向
///
/// 发送只是向无界通道投递字符串, 不会阻塞调用方; 写出失败 (连接已断)
/// 由会话任务在清理时摘除
#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        user_id: i64,
        role: UserRole,
        tx: mpsc::UnboundedSender<String>,
    ) -> u64 {
        let sid = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.inner.sessions.write().expect("hub lock poisoned");
        sessions.insert(sid, SessionEntry { user_id, role, tx });
        sid
    }

    pub fn unregister(&self, session_id: u64) {
        let mut sessions = self.inner.sessions.write().expect("hub lock poisoned");
        sessions.remove(&session_id);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.sessions.read().expect("hub lock poisoned").len()
    }

    /// 当前在线连接的 (session_id, user_id) 列表
    pub fn connected_sessions(&self) -> Vec<(u64, i64)> {
        let sessions = self.inner.sessions.read().expect("hub lock poisoned");
        sessions.iter().map(|(sid, e)| (*sid, e.user_id)).collect()
    }

    pub fn global_emit<P: Serialize>(&self, event: &str, payload: &P) {
        let text = envelope(event, payload);
        let sessions = self.inner.sessions.read().expect("hub lock poisoned");
        for entry in sessions.values() {
            let _ = entry.tx.send(text.clone());
        }
    }

    /// 房间 `user:<id>`: 同一用户的所有连接
    pub fn to_user<P: Serialize>(&self, user_id: i64, event: &str, payload: &P) {
        let text = envelope(event, payload);
        let sessions = self.inner.sessions.read().expect("hub lock poisoned");
        for entry in sessions.values().filter(|e| e.user_id == user_id) {
            let _ = entry.tx.send(text.clone());
        }
    }

    pub fn to_admins<P: Serialize>(&self, event: &str, payload: &P) {
        let text = envelope(event, payload);
        let sessions = self.inner.sessions.read().expect("hub lock poisoned");
        for entry in sessions.values().filter(|e| e.role == UserRole::Admin) {
            let _ = entry.tx.send(text.clone());
        }
    }

    /// 仅发给某个连接 (错误回执等)
    pub fn to_session<P: Serialize>(&self, session_id: u64, event: &str, payload: &P) {
        let sessions = self.inner.sessions.read().expect("hub lock poisoned");
        if let Some(entry) = sessions.get(&session_id) {
            let _ = entry.tx.send(envelope(event, payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_room_targeting() {
        let hub = Hub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(1, UserRole::User, tx1);
        hub.register(2, UserRole::Admin, tx2);

        hub.to_user(1, "PING", &json!({}));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        hub.to_admins("PING", &json!({}));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());

        hub.global_emit("PING", &json!({}));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sid = hub.register(7, UserRole::User, tx);
        hub.unregister(sid);
        hub.global_emit("PING", &json!({}));
        assert!(rx.try_recv().is_err());
    }
}
