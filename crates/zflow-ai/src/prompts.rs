use zflow_types::models::Message;

/// Instruction appended to the serialized history for conversational replies.
pub const CHAT_PROMPT: &str = r#"
You are an AI assistant and experienced React developer.
GUIDELINES:
- Tell the user what you are building.
- Keep the response under 15 lines.
- Skip code examples and commentary.
"#;

/// Instruction appended to the serialized history for code generation.
pub const CODE_GEN_PROMPT: &str = r#"
Generate a React project. Create multiple components, organizing them in separate folders with filenames using the .js extension where it makes sense.
The output should use Tailwind CSS for styling, without any third-party dependencies or libraries, except for icons from the lucide-react library, which should only be used when necessary.
Available icons: Heart, Shield, Clock, Users, Play, Home, Search, Menu, User, Settings, Mail, Bell, Calendar, Star, Upload, Download, Trash, Edit, Plus, Minus, Check, X, ArrowRight.
Return the response in JSON format with the following schema:
{
  "projectTitle": "",
  "explanation": "",
  "files": {
    "/App.js": {
      "code": ""
    }
  },
  "generatedFiles": []
}
Ensure the files field contains every created file and the generatedFiles field lists every path from files.
Write the explanation as a single paragraph describing the project structure and the purpose of each file.
- Use placeholder images from https://archive.org/download/placeholder-image/placeholder-image.jpg when needed.
- Use emojis where they improve the user experience.
- Do not create src/App.js; the project root is the source folder.
"#;

/// History followed directly by the chat instruction.
pub fn chat_prompt(messages: &[Message]) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(messages)? + CHAT_PROMPT)
}

/// History, a space, then the code-generation instruction.
pub fn code_prompt(messages: &[Message]) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(messages)? + " " + CODE_GEN_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_start_with_serialized_history() {
        let history = vec![Message {
            role: zflow_types::models::Role::User,
            content: "build a todo app".into(),
            timestamp: None,
        }];

        let chat = chat_prompt(&history).unwrap();
        assert!(chat.starts_with(r#"[{"role":"user","content":"build a todo app"}]"#));
        assert!(chat.ends_with(CHAT_PROMPT));

        let code = code_prompt(&history).unwrap();
        assert!(code.contains("}] \nGenerate a React project"));
    }
}
