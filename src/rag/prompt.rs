use crate::models::{Message, Role, ScoredPassage};

/// Passages included in the grounded prompt when the caller does not
/// override the count.
pub const DEFAULT_TOP_K: usize = 15;

/// Builds the grounded user message for the final turn.
///
/// The template tells the model to answer from the supporting passages and to
/// reply '관련 내용을 찾을 수 없다' when they do not cover the question. The
/// raw question text is embedded verbatim. When fewer than `top_k` passages
/// exist, all of them are used.
pub fn assemble(question: &str, ranked: &[ScoredPassage<'_>], top_k: usize) -> Message {
    let supporting = ranked
        .iter()
        .take(top_k)
        .map(|scored| scored.record.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let content = format!(
        "근거 자료를 줄 테니까 질문에 대답해. 만약 질문에 관련된 내용을 근거 자료에서 찾지 못하겠다면, '관련 내용을 찾을 수 없다'고 답하면 돼.\n질문: {question}\n근거 자료: {supporting}"
    );

    Message::new(Role::User, content)
}
