use crate::error::CommandError;
use crate::modules::commands::router::Invocation;
use serde::Deserialize;

const COMPLETIONS_URL: &str = "https://api.deepinfra.com/v1/openai/chat/completions";
const MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Passthrough to the DeepInfra chat-completions API. Registered ungated:
/// this one is usable from any channel, DMs included.
pub async fn chat(inv: Invocation) -> Result<(), CommandError> {
    let Some(api_key) = inv.data.config.deepinfra_api_key.clone() else {
        return Err(CommandError::ResourceNotFound(
            "AI chat is not configured.".to_string(),
        ));
    };
    let prompt = inv.args.join(" ");

    let _ = inv.msg.channel_id.broadcast_typing(&inv.ctx.http).await;

    let payload = serde_json::json!({
        "model": MODEL,
        "messages": [{ "role": "user", "content": prompt }],
        "max_tokens": 200,
        "temperature": 0.7,
    });

    let response = inv
        .data
        .http
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| CommandError::Unexpected(format!("chat completion request: {e}")))?;

    let completion: ChatResponse = response
        .json()
        .await
        .map_err(|e| CommandError::Unexpected(format!("chat completion decode: {e}")))?;

    let Some(choice) = completion.choices.first() else {
        return Err(CommandError::Unexpected(
            "chat completion response had no choices".to_string(),
        ));
    };

    inv.msg
        .channel_id
        .say(&inv.ctx.http, choice.message.content.clone())
        .await?;
    Ok(())
}
