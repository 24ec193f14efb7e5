use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

/// タイトルが得られなかった場合のタイトル
pub const FALLBACK_TITLE: &str = "feat: update files";

/// レポートが得られなかった場合のレポート
pub const FALLBACK_REPORT: &str = "Minor updates.";

/// 型がないタイトルに付ける型
const DEFAULT_TYPE: &str = "feat";

/// COMMIT_BODY がない場合にレポートから取る行数
const BODY_LINES: usize = 3;

/// タイトル補完に使う抜粋の最大文字数
const EXCERPT_MAX_CHARS: usize = 50;

/// AIの応答から得たコミットの提案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSuggestion {
    /// `type: description` 形式の1行タイトル
    pub title: String,
    /// 短い本文（COMMIT_BODY またはレポート先頭の数行）
    pub body: String,
    /// 変更内容のレポート（コミット本文として使う）
    pub report: String,
}

impl CommitSuggestion {
    /// 応答を解釈できなかった場合の提案
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            body: FALLBACK_REPORT.to_string(),
            report: FALLBACK_REPORT.to_string(),
        }
    }

    /// タイトルの説明部分が短い場合に本文の抜粋で補う
    pub fn enrich(mut self, min_len: usize) -> Self {
        self.title = enrich_title(&self.title, &self.body, min_len);
        self
    }
}

/// 応答の解釈方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyInterpreter {
    /// `{"report": ..., "title": ..., "body": ...}` 形式のJSON
    Structured,
    /// `REPORT:` / `COMMIT_MESSAGE:` / `COMMIT_BODY:` のラベル付きテキスト
    FreeText,
}

impl ReplyInterpreter {
    /// 応答の形から解釈方法を判定
    pub fn detect(reply: &str) -> Self {
        if strip_code_fence(reply).starts_with('{') {
            ReplyInterpreter::Structured
        } else {
            ReplyInterpreter::FreeText
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReplyInterpreter::Structured => "structured",
            ReplyInterpreter::FreeText => "free-text",
        }
    }

    /// 応答をコミットの提案に変換。解釈できない部分はフォールバック値で埋める
    pub fn interpret(&self, reply: &str) -> CommitSuggestion {
        match self {
            ReplyInterpreter::Structured => Self::interpret_structured(reply),
            ReplyInterpreter::FreeText => Self::interpret_free_text(reply),
        }
    }

    fn interpret_structured(reply: &str) -> CommitSuggestion {
        let parsed: StructuredReply = match serde_json::from_str(strip_code_fence(reply)) {
            Ok(parsed) => parsed,
            Err(_) => return CommitSuggestion::fallback(),
        };

        let report = parsed
            .report
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_REPORT.to_string());
        let body = parsed
            .body
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| synthesize_body(&report));

        CommitSuggestion {
            title: normalize_title(parsed.title.as_deref().unwrap_or_default()),
            body,
            report,
        }
    }

    fn interpret_free_text(reply: &str) -> CommitSuggestion {
        let sections = Sections::split(reply);

        let report = sections
            .get(Section::Report)
            .map(clean_section)
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| FALLBACK_REPORT.to_string());
        let body = sections
            .get(Section::CommitBody)
            .map(clean_section)
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| synthesize_body(&report));
        let title = sections
            .get(Section::CommitMessage)
            .map(normalize_title)
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());

        CommitSuggestion {
            title,
            body,
            report,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    #[serde(default)]
    report: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// ラベル付きテキストのセクション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Report,
    CommitMessage,
    CommitBody,
}

impl Section {
    fn from_label(label: &str) -> Self {
        let label = label.to_ascii_uppercase().replace(' ', "_");
        match label.as_str() {
            "REPORT" => Section::Report,
            "COMMIT_MESSAGE" => Section::CommitMessage,
            _ => Section::CommitBody,
        }
    }
}

/// ラベルの位置で分割したセクション
struct Sections<'a> {
    found: Vec<(Section, &'a str)>,
}

impl<'a> Sections<'a> {
    /// 各セクションは次のラベル（種類を問わない）の直前まで
    ///
    /// 行頭のラベルで COMMIT_MESSAGE が見つからない場合は、
    /// 1行にまとめられた応答とみなして行中のラベルも探す。
    fn split(reply: &'a str) -> Self {
        let found = Self::scan(reply, line_marker_re());
        if found.iter().any(|(s, _)| *s == Section::CommitMessage) {
            return Self { found };
        }

        Self {
            found: Self::scan(reply, inline_marker_re()),
        }
    }

    fn scan(reply: &'a str, re: &Regex) -> Vec<(Section, &'a str)> {
        let markers: Vec<(Section, usize, usize)> = re
            .captures_iter(reply)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?;
                Some((Section::from_label(label.as_str()), whole.start(), whole.end()))
            })
            .collect();

        markers
            .iter()
            .enumerate()
            .map(|(i, &(section, _, content_start))| {
                let content_end = markers
                    .get(i + 1)
                    .map(|&(_, next_start, _)| next_start)
                    .unwrap_or(reply.len());
                (section, &reply[content_start..content_end])
            })
            .collect()
    }

    /// 最初に現れたセクションの内容
    fn get(&self, section: Section) -> Option<&'a str> {
        self.found
            .iter()
            .find(|(s, _)| *s == section)
            .map(|&(_, content)| content)
    }
}

/// 行頭のラベル（`**REPORT:**`、`### COMMIT_MESSAGE:`、`1. REPORT:`、`- REPORT:` も許容）
fn line_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t#>*_-]*(?:\d+[.)][ \t]*)?(REPORT|COMMIT[_ ]MESSAGE|COMMIT[_ ]BODY)[ \t*_]*:",
        )
        .expect("line marker regex is valid")
    })
}

/// 行中のどこにあってもよいラベル
fn inline_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(REPORT|COMMIT[_ ]MESSAGE|COMMIT[_ ]BODY)[ \t*_]*:")
            .expect("inline marker regex is valid")
    })
}

/// 先頭の `[type]` / `[type]:`
fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\s*(\w+)\s*\]\s*:?\s*").expect("bracket regex is valid"))
}

/// 先頭の `type(scope):` / `type(scope)!:`
fn scope_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\([^)]*\)!?:?\s*").expect("scope regex is valid"))
}

/// 型として認める単語
fn type_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("type regex is valid"))
}

/// マークダウンのコードブロックで囲まれていれば中身を取り出す
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```")) || trimmed.len() < 6 {
        return trimmed;
    }

    // 開始行（```json など）を飛ばす
    let inner = &trimmed[3..trimmed.len() - 3];
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

/// セクション本文から強調記号を除去
fn clean_section(section: &str) -> String {
    section.replace("**", "").trim().to_string()
}

/// レポートの先頭数行から本文を作る
fn synthesize_body(report: &str) -> String {
    report
        .lines()
        .take(BODY_LINES)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_edge_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*')
}

/// 前後の空白・引用符・強調記号と末尾のピリオドを除去
fn trim_decoration(text: &str) -> &str {
    text.trim_start_matches(is_edge_noise)
        .trim_end_matches(|c| is_edge_noise(c) || c == '.')
}

/// タイトル候補を `type: description` 形式に正規化
///
/// 1. `**` を除去し最初の空でない行だけを使う
/// 2. `[type]` / `[type]:` を `type: ` に
/// 3. `type(scope):` を `type: ` に
/// 4. 末尾のピリオドと前後の装飾を除去
/// 5. 型がなければ `feat: ` を付ける
/// 6. 説明が空なら [`FALLBACK_TITLE`]
///
/// 2回適用しても結果は変わらない。
pub fn normalize_title(candidate: &str) -> String {
    let text = candidate.replace("**", "");
    let Some(line) = text.lines().map(trim_decoration).find(|l| !l.is_empty()) else {
        return FALLBACK_TITLE.to_string();
    };

    let line = bracket_re().replace(line, "$1: ");
    let line = scope_re().replace(&line, "$1: ");

    let (kind, desc) = match line.split_once(':') {
        Some((kind, desc)) => {
            let kind = kind.trim().trim_end_matches('!');
            if kind.is_empty() {
                (DEFAULT_TYPE.to_string(), desc)
            } else if type_token_re().is_match(kind) {
                (kind.to_lowercase(), desc)
            } else {
                (DEFAULT_TYPE.to_string(), &*line)
            }
        }
        None => (DEFAULT_TYPE.to_string(), &*line),
    };

    let desc = trim_decoration(desc);
    if desc.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    format!("{}: {}", kind, desc)
}

/// 本文の最初の文（リスト記号を除いた最初の空でない行の最初の文）
fn first_sentence(text: &str) -> &str {
    let line = text
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*', '•', ' ']).trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let sentence = match line.find(". ") {
        Some(end) => &line[..end],
        None => line,
    };
    trim_decoration(sentence)
}

/// `max_chars` 文字以内に単語の境界で切り詰める
fn shorten(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };

    let head = &text[..cut];
    let head = if text[cut..].starts_with(char::is_whitespace) {
        head
    } else {
        head.rfind(char::is_whitespace).map_or(head, |i| &head[..i])
    };
    head.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'))
}

/// 説明部分が `min_len` 文字未満なら本文の最初の文を付け足す
///
/// 見た目のための補完で、付け足す内容がなければタイトルをそのまま返す。
pub fn enrich_title(title: &str, body: &str, min_len: usize) -> String {
    let Some((kind, desc)) = title.split_once(':') else {
        return title.to_string();
    };
    let desc = desc.trim();
    if desc.chars().count() >= min_len {
        return title.to_string();
    }

    let extra = first_sentence(body);
    if extra.is_empty() || desc.to_lowercase().contains(&extra.to_lowercase()) {
        return title.to_string();
    }
    let extra = shorten(extra, EXCERPT_MAX_CHARS);

    let enriched = if desc.is_empty() {
        format!("{}: {}", kind, extra)
    } else {
        format!("{}: {} - {}", kind, desc, extra)
    };
    normalize_title(&enriched)
}
