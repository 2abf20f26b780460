// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation titles and previews derived from message text.

/// Title given to conversations created without one.
pub const DEFAULT_TITLE: &str = "新对话";

const TITLE_CHARS: usize = 20;
const KEYWORD_WINDOW_CHARS: usize = 30;
const PREVIEW_CHARS: usize = 50;

/// Phrases that usually open the actual request in a chat message.
const REQUEST_KEYWORDS: &[&str] = &[
    "如何", "怎么", "为什么", "是什么", "介绍", "说明", "解释", "写一篇", "写一个", "生成", "创建",
    "制作", "设计", "帮忙", "请帮我", "帮我", "需要", "想要", "想了解",
];

/// First `n` characters of `s` (not bytes).
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate_with_ellipsis(s: &str, n: usize) -> String {
    if char_len(s) > n {
        format!("{}...", take_chars(s, n))
    } else {
        s.to_string()
    }
}

/// Derive a short title from the first message of a conversation.
///
/// Short messages are used as-is. Longer ones are cut at the first request
/// keyword when one is present, otherwise at the start of the message.
pub fn smart_title(message: &str) -> String {
    let message = message.trim();
    if char_len(message) <= TITLE_CHARS {
        return message.to_string();
    }

    for keyword in REQUEST_KEYWORDS {
        if let Some(idx) = message.find(keyword) {
            let candidate = take_chars(&message[idx..], KEYWORD_WINDOW_CHARS).trim();
            if char_len(candidate) > 5 {
                return truncate_with_ellipsis(candidate, TITLE_CHARS);
            }
        }
    }

    format!("{}...", take_chars(message, TITLE_CHARS).trim())
}

/// One-line preview of a message for conversation lists.
pub fn preview(content: &str) -> String {
    truncate_with_ellipsis(content, PREVIEW_CHARS)
}
