use crate::models::{Message, Role};

/// Fixed assistant greeting, the first visible message of every session.
pub const GREETING: &str = "👋안녕하세요 선생님, 무엇을 도와드릴까요?";

/// Ordered message history for one chat session. Appended-to only; messages
/// are never reordered or deleted within a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSession {
    messages: Vec<Message>,
}

impl ConversationSession {
    /// Starts a session with the system primer and the fixed greeting.
    pub fn initialize(system_primer: &str) -> Self {
        Self {
            messages: vec![
                Message::new(Role::System, system_primer),
                Message::new(Role::Assistant, GREETING),
            ],
        }
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::User, content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::Assistant, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages shown in the transcript view; the system primer stays hidden.
    pub fn transcript(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// Request payload for the model: the stored history with its final turn
    /// replaced by the grounded message. The stored history keeps the raw
    /// question; grounding is applied per request only.
    pub fn build_request_messages(&self, grounded: Message) -> Vec<Message> {
        let mut request = self.messages[..self.messages.len() - 1].to_vec();
        request.push(grounded);
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_seeds_primer_and_greeting() {
        let session = ConversationSession::initialize("수학 교육과정 조교입니다.");
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.messages()[0].content, "수학 교육과정 조교입니다.");
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert_eq!(session.messages()[1].content, GREETING);
    }

    #[test]
    fn transcript_hides_system_primer() {
        let mut session = ConversationSession::initialize("primer");
        session.append_user("질문");
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].content, GREETING);
        assert_eq!(transcript[1].content, "질문");
    }

    #[test]
    fn append_preserves_order() {
        let mut session = ConversationSession::initialize("primer");
        session.append_user("첫 질문");
        session.append_assistant("첫 답변");
        session.append_user("둘째 질문");
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User
            ]
        );
    }

    #[test]
    fn build_request_messages_swaps_only_the_final_turn() {
        let mut session = ConversationSession::initialize("primer");
        session.append_user("미분이 뭐야?");

        let grounded = Message::new(Role::User, "근거 자료를 줄 테니까...");
        let request = session.build_request_messages(grounded.clone());

        assert_eq!(request.len(), session.messages().len());
        assert_eq!(request.last(), Some(&grounded));
        // earlier turns pass through untouched
        assert_eq!(request[..request.len() - 1], session.messages()[..2]);
        // persisted history still holds the raw question
        assert_eq!(
            session.messages().last().map(|m| m.content.as_str()),
            Some("미분이 뭐야?")
        );
    }
}
