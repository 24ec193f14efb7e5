use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ReplyFormat};
use crate::error::AppError;

/// システムプロンプト（テキスト応答）
const SYSTEM_PROMPT_TEXT: &str = "You are commit-ai. Only return the requested REPORT, COMMIT_MESSAGE (single-line) and COMMIT_BODY (1-3 sentences).";

/// システムプロンプト（JSON応答）
const SYSTEM_PROMPT_JSON: &str = "You are commit-ai. Only return a JSON object with the string fields \"report\", \"title\" and \"body\".";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// chat completions API を呼び出すAIサービス
pub struct AiService {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    format: ReplyFormat,
}

impl AiService {
    /// 設定からAiServiceを作成
    pub fn from_config(config: &Config, api_key: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::AiRequestError(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            format: config.reply_format,
        })
    }

    /// 応答形式を上書き
    pub fn set_format(&mut self, format: ReplyFormat) {
        self.format = format;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// AI用のプロンプトを構築
    fn build_prompt(diff: &str, format: ReplyFormat) -> String {
        let sections = match format {
            ReplyFormat::Text => {
                r#"1. Provide a bulleted "REPORT" of technical changes.
2. Provide a single-line "COMMIT_MESSAGE" following these strict rules (type: description).
3. Provide a concise "COMMIT_BODY" (1-3 sentences) suitable for the commit body.

Response Format:
REPORT:
- detail
COMMIT_MESSAGE:
type: description
COMMIT_BODY:
sentences"#
            }
            ReplyFormat::Json => {
                r#"Return a JSON object with these string fields:
- "report": a bulleted list of technical changes.
- "title": a single-line commit title following these strict rules (type: description).
- "body": a concise commit body (1-3 sentences)."#
            }
        };

        format!(
            r#"Analyze this Git diff and provide a professional report.
{sections}

STRICT RULES:
- Format (commit title): type: description
- NO BRACKETS (e.g., use "feat: message" NOT "[feat]: message")
- NO SCOPES (e.g., use "feat: message" NOT "feat(scope): message")
- Use imperative mood ("add" not "added").
- No period at the end of the commit title.

Diff:
{diff}"#
        )
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        let (system, max_tokens, response_format) = match self.format {
            ReplyFormat::Text => (SYSTEM_PROMPT_TEXT, None, None),
            ReplyFormat::Json => (
                SYSTEM_PROMPT_JSON,
                Some(self.max_tokens),
                Some(ResponseFormat {
                    kind: "json_object",
                }),
            ),
        };

        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens,
            response_format,
        }
    }

    /// 差分からコミット提案の元になる応答テキストを取得
    ///
    /// `choices` が空の場合は空文字列を返す（呼び出し側でフォールバックする）。
    pub fn generate(&self, diff: &str) -> Result<String, AppError> {
        let prompt = Self::build_prompt(diff, self.format);
        let request = self.build_request(&prompt);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| AppError::AiRequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(AppError::AiRequestError(Self::extract_error(
                status.as_u16(),
                &text,
            )));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| AppError::AiRequestError(format!("Invalid response: {}", e)))?;

        Ok(Self::first_content(body))
    }

    fn first_content(body: ChatResponse) -> String {
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }

    /// エラーレスポンスからメッセージを抽出
    fn extract_error(status: u16, body: &str) -> String {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => format!("HTTP {}: {}", status, parsed.error.message),
            Err(_) => {
                let first_line = body.lines().find(|l| !l.trim().is_empty());
                match first_line {
                    Some(line) => format!("HTTP {}: {}", status, line.trim()),
                    None => format!("HTTP {}", status),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn service(format: ReplyFormat) -> AiService {
        let mut config = Config::default();
        config.reply_format = format;
        AiService::from_config(&config, "test-key".to_string()).unwrap()
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.model = "llama-3.3-70b-versatile".to_string();
        let service = AiService::from_config(&config, "key".to_string()).unwrap();

        assert_eq!(service.model(), "llama-3.3-70b-versatile");
        assert_eq!(service.format, ReplyFormat::Text);
        assert_eq!(service.temperature, 0.1);
    }

    #[test]
    fn test_set_format() {
        let mut service = service(ReplyFormat::Text);
        service.set_format(ReplyFormat::Json);
        assert_eq!(service.format, ReplyFormat::Json);
    }

    #[rstest]
    #[case(ReplyFormat::Text, "COMMIT_MESSAGE")]
    #[case(ReplyFormat::Text, "COMMIT_BODY")]
    #[case(ReplyFormat::Json, "\"title\"")]
    #[case(ReplyFormat::Json, "\"report\"")]
    fn test_build_prompt_sections(#[case] format: ReplyFormat, #[case] expected: &str) {
        let prompt = AiService::build_prompt("test diff", format);
        assert!(prompt.contains(expected), "missing {}", expected);
    }

    #[test]
    fn test_build_prompt_contains_rules_and_diff() {
        let diff = "--- a/file.rs\n+++ b/file.rs\n+new line";
        let prompt = AiService::build_prompt(diff, ReplyFormat::Text);

        assert!(prompt.contains("NO BRACKETS"));
        assert!(prompt.contains("NO SCOPES"));
        assert!(prompt.contains("imperative mood"));
        assert!(prompt.ends_with(diff));
    }

    #[test]
    fn test_build_request_text_has_no_token_bound() {
        let service = service(ReplyFormat::Text);
        let request = service.build_request("prompt");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "prompt");
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_build_request_json_sets_format_and_bound() {
        let service = service(ReplyFormat::Json);
        let request = service.build_request("prompt");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT_JSON);
    }

    #[test]
    fn test_first_content() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "REPORT:\n- x"}}]}"#,
        )
        .unwrap();
        assert_eq!(AiService::first_content(body), "REPORT:\n- x");
    }

    #[test]
    fn test_first_content_empty_choices() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(AiService::first_content(body), "");

        let body: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(AiService::first_content(body), "");
    }

    #[test]
    fn test_first_content_null_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(AiService::first_content(body), "");
    }

    #[test]
    fn test_extract_error_api_message() {
        let body = r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#;
        assert_eq!(AiService::extract_error(401, body), "HTTP 401: Invalid API Key");
    }

    #[test]
    fn test_extract_error_plain_text() {
        assert_eq!(
            AiService::extract_error(502, "\nBad Gateway\nmore"),
            "HTTP 502: Bad Gateway"
        );
    }

    #[test]
    fn test_extract_error_empty_body() {
        assert_eq!(AiService::extract_error(500, "  "), "HTTP 500");
    }
}
