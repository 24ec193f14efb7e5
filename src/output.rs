use colored::{ColoredString, Colorize};

/// すべてのログ行の先頭に付けるタグ
fn origin() -> ColoredString {
    "[commit-ai]".magenta().bold()
}

/// ログ行を組み立てる
fn line(label: ColoredString, msg: &str) -> String {
    format!("{} {}: {}", origin(), label, msg)
}

pub fn info(msg: &str) {
    println!("{}", line("[Info]".blue(), msg));
}

pub fn success(msg: &str) {
    println!("{}", line("[Success]".green(), msg));
}

pub fn warn(msg: &str) {
    println!("{}", line("[Warn]".yellow(), msg));
}

pub fn error(msg: &str) {
    eprintln!("{}", line("[Error]".red(), msg));
}

pub fn ai(msg: &str) {
    println!("{}", line("[AI]".cyan(), msg));
}

pub fn debug(msg: &str) {
    println!("{}", line("[Debug]".dimmed(), msg));
}

/// 確認プロンプトの文字列（改行なし）
pub fn prompt_label(msg: &str) -> String {
    format!("{} {}: {}", origin(), "[Prompt]".yellow(), msg)
}

/// 区切り線付きのブロックを表示
pub fn framed(title: &str, body: &str) {
    let rule = format!("─── {} ───", title);
    println!();
    println!("{}", rule.red().bold());
    println!("{}", body);
    println!("{}", "─".repeat(rule.chars().count()).red().bold());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_contains_origin_label_and_message() {
        colored::control::set_override(false);
        let result = line("[Info]".blue(), "Analyzing modified files...");
        assert_eq!(result, "[commit-ai] [Info]: Analyzing modified files...");
    }

    #[test]
    fn test_prompt_label_plain() {
        colored::control::set_override(false);
        let result = prompt_label("Use this commit message? (y/n): ");
        assert_eq!(
            result,
            "[commit-ai] [Prompt]: Use this commit message? (y/n): "
        );
    }
}
