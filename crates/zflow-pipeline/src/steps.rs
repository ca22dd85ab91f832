//! The two model calls that make up a turn.

use zflow_ai::{AiError, ChatModel, prompts, sanitize};
use zflow_types::models::{FileMap, Message};

/// Ask the chat model for the next reply in the conversation.
pub(crate) async fn reply(
    model: &dyn ChatModel,
    history: &[Message],
) -> Result<(Message, Option<u32>), AiError> {
    let prompt = prompts::chat_prompt(history)?;
    let completion = model.send_message(&prompt).await?;
    Ok((Message::ai(completion.text), completion.total_tokens))
}

/// Ask the code model for the project files matching the conversation.
/// Usage is reported whenever the model answered, even if its output is unusable.
pub(crate) async fn regenerate(
    model: &dyn ChatModel,
    history: &[Message],
) -> (Result<FileMap, AiError>, Option<u32>) {
    let completion = match prompts::code_prompt(history) {
        Ok(prompt) => model.send_message(&prompt).await,
        Err(e) => Err(AiError::from(e)),
    };

    match completion {
        Ok(completion) => {
            let files = sanitize::parse_generated_code(&completion.text).map(|code| code.files);
            (files, completion.total_tokens)
        }
        Err(e) => (Err(e), None),
    }
}
