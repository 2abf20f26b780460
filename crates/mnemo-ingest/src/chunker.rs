// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text normalization and overlapping chunking.
//!
//! Splitting walks an ordered list of separators: paragraph break, line
//! break, CJK then Latin sentence punctuation, then spaces. A piece that is
//! still longer than the target size after the last separator is cut at a
//! fixed character count. The resulting atoms are merged greedily into
//! chunks, carrying up to `overlap` characters from the end of one chunk
//! into the start of the next.
//!
//! Every chunk is a contiguous span of the normalized input and records how
//! many leading characters it shares with its predecessor, so dropping that
//! prefix from each chunk and concatenating yields the input exactly.

use std::collections::VecDeque;

/// Separator preference, coarsest first.
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "！", "？", ". ", "! ", "? ", ".", "!", "?", " ",
];

/// Strip carriage returns and trailing whitespace per line, collapse runs of
/// blank lines to a single blank line, and trim the ends.
pub fn normalize(text: &str) -> String {
    let without_cr = text.replace('\r', "");
    let mut out = String::with_capacity(without_cr.len());
    let mut blank_run = 0usize;
    for line in without_cr.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// One chunk of normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Leading characters repeated from the end of the previous chunk.
    pub overlap: usize,
}

impl TextSpan {
    /// The part of the chunk not shared with its predecessor.
    pub fn fresh(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.text[byte..],
            None => "",
        }
    }
}

/// Splits normalized text into overlapping, size-bounded chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    separators: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct Atom {
    start: usize,
    end: usize,
    chars: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl Chunker {
    /// `size` is at least 1 and `overlap` is kept below `size`.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            overlap: overlap.min(size - 1),
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    pub fn with_separators(mut self, separators: Vec<&'static str>) -> Self {
        self.separators = separators;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk `text` as is. Callers normally pass the output of [`normalize`].
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut atoms = Vec::new();
        self.atomize(text, 0, text.len(), &self.separators, &mut atoms);
        self.merge(text, &atoms)
    }

    /// Normalize, then chunk.
    pub fn split_normalized(&self, text: &str) -> Vec<TextSpan> {
        self.split(&normalize(text))
    }

    fn atomize(&self, text: &str, start: usize, end: usize, seps: &[&'static str], out: &mut Vec<Atom>) {
        let piece = &text[start..end];
        let chars = char_len(piece);
        if chars <= self.size {
            out.push(Atom { start, end, chars });
            return;
        }

        for (i, sep) in seps.iter().enumerate() {
            if !piece.contains(sep) {
                continue;
            }
            let finer = &seps[i + 1..];
            let mut cursor = start;
            for (offset, _) in piece.match_indices(sep) {
                // The separator stays with the text before it.
                let cut = start + offset + sep.len();
                if cut > cursor {
                    self.atomize(text, cursor, cut, finer, out);
                    cursor = cut;
                }
            }
            if cursor < end {
                self.atomize(text, cursor, end, finer, out);
            }
            return;
        }

        // No separator left: hard split every `size` characters.
        let mut cursor = start;
        let mut count = 0usize;
        for (offset, _) in piece.char_indices() {
            if count == self.size {
                let cut = start + offset;
                out.push(Atom { start: cursor, end: cut, chars: count });
                cursor = cut;
                count = 0;
            }
            count += 1;
        }
        if cursor < end {
            out.push(Atom { start: cursor, end, chars: count });
        }
    }

    fn merge(&self, text: &str, atoms: &[Atom]) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut window: VecDeque<Atom> = VecDeque::new();
        let mut total = 0usize;
        let mut prev_end: Option<usize> = None;

        for atom in atoms {
            if total + atom.chars > self.size && !window.is_empty() {
                spans.push(self.emit(text, &window, prev_end));
                prev_end = window.back().map(|a| a.end);
                while total > self.overlap || (total > 0 && total + atom.chars > self.size) {
                    match window.pop_front() {
                        Some(dropped) => total -= dropped.chars,
                        None => break,
                    }
                }
            }
            window.push_back(*atom);
            total += atom.chars;
        }
        if !window.is_empty() {
            spans.push(self.emit(text, &window, prev_end));
        }
        spans
    }

    fn emit(&self, text: &str, window: &VecDeque<Atom>, prev_end: Option<usize>) -> TextSpan {
        let (Some(first), Some(last)) = (window.front(), window.back()) else {
            return TextSpan { text: String::new(), overlap: 0 };
        };
        let overlap = match prev_end {
            Some(pe) if first.start < pe => char_len(&text[first.start..pe]),
            _ => 0,
        };
        TextSpan {
            text: text[first.start..last.end].to_string(),
            overlap,
        }
    }
}

/// Rejoin chunks produced by [`Chunker::split`], dropping each overlap.
pub fn reassemble(spans: &[TextSpan]) -> String {
    spans.iter().map(TextSpan::fresh).collect()
}
