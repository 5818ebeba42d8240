//! 会话存储抽象层
//!
//! 按 conversation_id 保存对话记录。每个会话一把 tokio Mutex：
//! 同一会话的并发请求在整个编排循环期间串行执行，不同会话互不阻塞。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::memory::{Conversation, Message};

/// 共享的单会话句柄
pub type ConversationHandle = Arc<Mutex<Conversation>>;

/// 会话存储接口
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// 获取会话；不存在时以 system_prompt 创建
    async fn get_or_create(&self, id: &str, system_prompt: &str) -> ConversationHandle;

    async fn get(&self, id: &str) -> Option<ConversationHandle>;

    /// 会话消息快照（等待该会话正在进行的请求结束）
    async fn snapshot(&self, id: &str) -> Option<Vec<Message>>;

    /// 删除会话；不存在返回 false
    async fn delete(&self, id: &str) -> bool;

    async fn len(&self) -> usize;
}

/// 内存会话存储：进程重启即丢失
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get_or_create(&self, id: &str, system_prompt: &str) -> ConversationHandle {
        if let Some(handle) = self.conversations.read().await.get(id) {
            return handle.clone();
        }
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::info!(conversation_id = %id, "Initialized new conversation");
                Arc::new(Mutex::new(Conversation::new(system_prompt)))
            })
            .clone()
    }

    async fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.conversations.read().await.get(id).cloned()
    }

    async fn snapshot(&self, id: &str) -> Option<Vec<Message>> {
        let handle = self.get(id).await?;
        let conversation = handle.lock().await;
        Some(conversation.messages().to_vec())
    }

    async fn delete(&self, id: &str) -> bool {
        self.conversations.write().await.remove(id).is_some()
    }

    async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_reuses_conversation() {
        let store = MemoryConversationStore::new();
        let a = store.get_or_create("c1", "sys").await;
        a.lock().await.push(Message::user("hello"));

        let b = store.get_or_create("c1", "other prompt").await;
        let conv = b.lock().await;
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].content, "sys");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_delete() {
        let store = MemoryConversationStore::new();
        assert!(store.snapshot("missing").await.is_none());
        assert!(!store.delete("missing").await);

        store.get_or_create("c1", "sys").await;
        let messages = store.snapshot("c1").await.unwrap();
        assert_eq!(messages.len(), 1);

        assert!(store.delete("c1").await);
        assert!(store.get("c1").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_same_conversation_is_serialized() {
        let store = Arc::new(MemoryConversationStore::new());
        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let handle = store.get_or_create("shared", "sys").await;
                let mut conv = handle.lock().await;
                // 读-改-追加期间让出调度，验证不会丢失更新
                let n = conv.len();
                tokio::task::yield_now().await;
                conv.push(Message::user(format!("{i}:{n}")));
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let messages = store.snapshot("shared").await.unwrap();
        assert_eq!(messages.len(), 9);
    }
}
