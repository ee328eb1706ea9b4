//! Line-oriented output buffer with brace-tracking auto-indent.

/// Collects one generated file. Nesting follows the braces in the emitted
/// text itself: a leading `}` dedents before its line prints, a trailing
/// `{` indents after. Two spaces per level; the second and later physical
/// lines of a single `out` call get one extra space (continuations).
pub(crate) struct CodeBuffer {
    text: String,
    depth: usize,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            depth: 0,
        }
    }

    pub fn out(&mut self, line: &str) {
        for (i, raw) in line.split('\n').enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                self.text.push('\n');
                continue;
            }
            if line.starts_with('}') {
                self.depth = self.depth.saturating_sub(1);
            }
            for _ in 0..self.depth {
                self.text.push_str("  ");
            }
            if i > 0 {
                self.text.push(' ');
            }
            self.text.push_str(line);
            self.text.push('\n');
            if line.ends_with('{') {
                self.depth += 1;
            }
        }
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    /// Finish with exactly one trailing newline.
    pub fn finish(mut self) -> String {
        self.text.truncate(self.text.trim_end().len());
        self.text.push('\n');
        self.text
    }
}
