use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    emotion::Palette,
    journal::SubmitOutcome,
    store::{EmotionCount, JournalEntry},
};

const HISTORY_TEXT_MAX_CHARS: usize = 80;
const BAR_WIDTH: usize = 12;

pub fn format_submit_reply(outcome: &SubmitOutcome, palette: &Palette) -> String {
    let swatch = palette.swatch(&outcome.scored.emotion);
    let mut reply = format!(
        "{} 오늘의 감정: <b>{}</b> ({})",
        swatch,
        escape_html(&outcome.scored.emotion),
        format_confidence(outcome.scored.confidence)
    );
    if let Some(err) = &outcome.degraded {
        reply.push_str(&format!(
            "\n\n⚠️ 감정 분석에 실패해서 기본값으로 저장했어요.\n<pre>{}</pre>",
            escape_html(&err.to_string())
        ));
    }
    reply
}

pub fn format_history(entries: &[JournalEntry], palette: &Palette, tz: &Tz) -> String {
    if entries.is_empty() {
        return "아직 저장된 일기가 없습니다.".to_string();
    }
    let mut message = String::from("최근 일기:\n\n");
    for (idx, entry) in entries.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} <b>{}</b> ({})\n   {}\n   {}\n",
            idx + 1,
            palette.swatch(&entry.emotion),
            escape_html(&entry.emotion),
            format_confidence(entry.confidence),
            escape_html(&truncate_text(&entry.text, HISTORY_TEXT_MAX_CHARS)),
            format_local_time(entry.created_at, tz),
        ));
    }
    message
}

pub fn format_distribution(counts: &[EmotionCount], palette: &Palette) -> String {
    if counts.is_empty() {
        return "아직 저장된 일기가 없습니다.".to_string();
    }
    let max = counts.iter().map(|c| c.count).max().unwrap_or(1);
    let total: i64 = counts.iter().map(|c| c.count).sum();

    let mut message = String::from("감정 분포:\n\n<pre>");
    for count in counts {
        message.push_str(&format!(
            "{} {:<10} {} {}\n",
            palette.swatch(&count.emotion),
            escape_html(&count.emotion),
            bar(count.count, max),
            count.count,
        ));
    }
    message.push_str("</pre>\n");
    message.push_str(&format!("총 {total}건"));
    message
}

/// Bar scaled to [`BAR_WIDTH`]; any nonzero count shows at least one block.
pub fn bar(count: i64, max: i64) -> String {
    if max <= 0 || count <= 0 {
        return String::new();
    }
    let len = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "▇".repeat(len.max(1))
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

pub fn format_local_time(timestamp: DateTime<Utc>, tz: &Tz) -> String {
    timestamp
        .with_timezone(tz)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Character-based truncation; entries can be arbitrary multi-byte text.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}…")
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
