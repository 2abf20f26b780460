// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document summaries: statistics, keywords, extractive digests and an
//! optional model-written abstract.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use mnemo_core::{ChatMessage, ExtractedDocument, ModelAdapter, ModelOptions};

use crate::kb::ExportFormat;

/// Keywords kept per document.
pub const KEYWORD_LIMIT: usize = 20;

/// Characters of the document sent to the model for the abstract.
const MODEL_INPUT_CHARS: usize = 2000;

/// Length bound of the model-written abstract, in characters.
const MODEL_SUMMARY_CHARS: usize = 300;

const SUMMARY_SYSTEM_PROMPT: &str = "你是一名专业的文档分析助手，请帮我生成简明扼要的摘要。";

/// Sentence terminators for the extractive digests.
const SENTENCE_ENDS: &[char] = &['。', '！', '？', '.', '!', '?'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextStatistics {
    /// Whitespace-separated tokens.
    pub word_count: usize,
    pub character_count: usize,
    pub paragraph_count: usize,
    pub page_count: usize,
    pub slide_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub word: String,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digests {
    pub summary_100: String,
    pub summary_300: String,
    pub summary_1000: String,
    /// Absent when the text is empty or the model call failed.
    pub llm_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub kb: String,
    pub file_name: String,
    pub statistics: TextStatistics,
    pub keywords: Vec<Keyword>,
    pub summaries: Digests,
}

pub fn statistics(doc: &ExtractedDocument) -> TextStatistics {
    let text = doc.text();
    TextStatistics {
        word_count: text.split_whitespace().count(),
        character_count: text.chars().count(),
        paragraph_count: doc.paragraphs.len(),
        page_count: doc.pages.len(),
        slide_count: doc.slides.len(),
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}')
}

/// Most frequent terms, at most [`KEYWORD_LIMIT`].
///
/// Latin words of two or more letters count case-insensitively; runs of CJK
/// characters contribute their overlapping bigrams. Ties keep first-seen order.
pub fn keywords(text: &str) -> Vec<Keyword> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut seen = 0;
    let mut count = |term: String| {
        let entry = counts.entry(term).or_insert((0, seen));
        entry.0 += 1;
        seen += 1;
    };

    let mut run: Vec<char> = Vec::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_alphabetic() && run.last().is_none_or(|p| is_cjk(*p) == is_cjk(c)) {
            run.push(c);
            continue;
        }
        if run.first().is_some_and(|f| is_cjk(*f)) {
            for pair in run.windows(2) {
                count(pair.iter().collect());
            }
        } else if run.len() > 1 {
            count(run.iter().collect::<String>().to_lowercase());
        }
        run.clear();
        if c.is_alphabetic() {
            run.push(c);
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
    ranked
        .into_iter()
        .take(KEYWORD_LIMIT)
        .map(|(word, (frequency, _))| Keyword { word, frequency })
        .collect()
}

/// Leading whole sentences that fit in `max_chars`, each closed with `。`.
///
/// When not even the first sentence fits, the text is cut at `max_chars`
/// and marked with `...`.
pub fn extractive_summary(text: &str, max_chars: usize) -> String {
    let mut summary = String::new();
    let mut used = 0;
    for sentence in text.split(SENTENCE_ENDS) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let len = sentence.chars().count();
        if used + len > max_chars {
            break;
        }
        summary.push_str(sentence);
        summary.push('。');
        used += len;
    }
    if !summary.is_empty() {
        return summary;
    }
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Ask the model for a short abstract of the document's opening.
pub async fn model_summary(model: &dyn ModelAdapter, text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let snippet: String = text.chars().take(MODEL_INPUT_CHARS).collect();
    let messages = vec![
        ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "请为以下文本生成一个不超过{MODEL_SUMMARY_CHARS}字的摘要：\n\n{snippet}"
        )),
    ];
    match model.complete(messages, ModelOptions::default()).await {
        Ok(response) => Some(response.content.trim().to_string()),
        Err(e) => {
            warn!(error = %e, "model summary unavailable");
            None
        }
    }
}

/// Summarize an extracted document.
pub async fn summarize(
    model: &dyn ModelAdapter,
    kb: &str,
    file_name: &str,
    doc: &ExtractedDocument,
) -> DocumentSummary {
    let text = doc.text();
    DocumentSummary {
        kb: kb.to_string(),
        file_name: file_name.to_string(),
        statistics: statistics(doc),
        keywords: keywords(&text),
        summaries: Digests {
            summary_100: extractive_summary(&text, 100),
            summary_300: extractive_summary(&text, 300),
            summary_1000: extractive_summary(&text, 1000),
            llm_summary: model_summary(model, &text).await,
        },
    }
}

/// Render a summary as a downloadable text or markdown document.
pub fn render(summary: &DocumentSummary, format: ExportFormat) -> String {
    let title = format!("文档摘要 - {}", summary.file_name);
    let mut lines = vec![match format {
        ExportFormat::Txt => title,
        ExportFormat::Md => format!("# {title}"),
    }];
    lines.push(format!(
        "字数: {}, 段落: {}",
        summary.statistics.character_count, summary.statistics.paragraph_count
    ));

    let digests = &summary.summaries;
    let sections = [
        ("【100字摘要】", Some(&digests.summary_100)),
        ("【300字摘要】", Some(&digests.summary_300)),
        ("【LLM摘要】", digests.llm_summary.as_ref()),
    ];
    for (heading, body) in sections {
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            lines.push(String::new());
            lines.push(heading.to_string());
            lines.push(body.clone());
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractive_summary_keeps_whole_sentences() {
        let text = "第一句话。第二句话！第三句比较长的话？";
        assert_eq!(extractive_summary(text, 8), "第一句话。第二句话。");
        assert_eq!(extractive_summary(text, 100), "第一句话。第二句话。第三句比较长的话。");
    }

    #[test]
    fn extractive_summary_cuts_an_oversized_first_sentence() {
        assert_eq!(extractive_summary("abcdefghij", 4), "abcd...");
        assert_eq!(extractive_summary("", 4), "");
    }

    #[test]
    fn keywords_count_latin_words_and_cjk_bigrams() {
        let words = keywords("Rust rust a 量子计算 量子");
        assert_eq!(words[0], Keyword { word: "rust".into(), frequency: 2 });
        assert_eq!(words[1], Keyword { word: "量子".into(), frequency: 2 });
        assert!(words.iter().any(|k| k.word == "计算"));
        assert!(words.iter().all(|k| k.word != "a"));
    }

    #[test]
    fn keywords_are_capped() {
        let text: String = ('a'..='z').map(|c| format!("x{c} ")).collect();
        let words = keywords(&text);
        assert_eq!(words.len(), KEYWORD_LIMIT);
        assert_eq!(words[0].word, "xa");
    }

    #[test]
    fn markdown_export_layout() {
        let summary = DocumentSummary {
            kb: "kb".into(),
            file_name: "a.txt".into(),
            statistics: TextStatistics {
                word_count: 1,
                character_count: 5,
                paragraph_count: 1,
                page_count: 0,
                slide_count: 0,
            },
            keywords: Vec::new(),
            summaries: Digests {
                summary_100: "短。".into(),
                summary_300: "短。".into(),
                summary_1000: "短。".into(),
                llm_summary: None,
            },
        };
        let text = render(&summary, ExportFormat::Md);
        assert_eq!(
            text,
            "# 文档摘要 - a.txt\n字数: 5, 段落: 1\n\n【100字摘要】\n短。\n\n【300字摘要】\n短。"
        );
        assert!(render(&summary, ExportFormat::Txt).starts_with("文档摘要 - a.txt\n"));
    }
}
