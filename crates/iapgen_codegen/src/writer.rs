//! Append-only line buffer used by every plugin.

/// Builds one output file line by line.
///
/// Consecutive blank lines collapse into one, the buffer never starts with a
/// blank line, and [`CodeWriter::finish`] ends the text with exactly one
/// newline.
#[derive(Debug, Clone)]
pub struct CodeWriter {
    output: String,
    indent: usize,
    indent_unit: String,
    last_blank: bool,
}

impl CodeWriter {
    /// Creates a writer that indents with `indent_unit` per level.
    #[must_use]
    pub fn new(indent_unit: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            indent_unit: indent_unit.into(),
            last_blank: true,
        }
    }

    /// Writes one line at the current indentation. An empty string is a blank line.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.blank();
            return;
        }
        self.push_indent();
        self.output.push_str(text);
        self.output.push('\n');
        self.last_blank = false;
    }

    /// Writes each line of a multi-line string, keeping its relative indentation.
    pub fn lines(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line.trim_end());
        }
    }

    /// Writes a fixed snippet authored with four-space indentation,
    /// re-indented to this writer's unit and current level.
    pub fn snippet(&mut self, text: &str) {
        for line in text.lines() {
            let trimmed = line.trim_start_matches(' ');
            let depth = (line.len() - trimmed.len()) / 4;
            for _ in 0..depth {
                self.indent();
            }
            self.line(trimmed.trim_end());
            for _ in 0..depth {
                self.dedent();
            }
        }
    }

    /// Writes a blank line unless the previous line was blank.
    pub fn blank(&mut self) {
        if !self.last_blank {
            self.output.push('\n');
            self.last_blank = true;
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Writes `open`, the indented body and `close`.
    pub fn block(
        &mut self,
        open: impl AsRef<str>,
        close: impl AsRef<str>,
        body: impl FnOnce(&mut Self),
    ) {
        self.line(open);
        self.indent();
        body(self);
        self.dedent();
        self.line(close);
    }

    /// Writes `open` and the indented body with no closing line (GDScript, Python-style).
    pub fn suite(&mut self, open: impl AsRef<str>, body: impl FnOnce(&mut Self)) {
        self.line(open);
        self.indent();
        body(self);
        self.dedent();
    }

    /// Writes a doc comment, one `prefix` line per description line.
    pub fn doc(&mut self, prefix: &str, text: Option<&str>) {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return;
        };
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                self.line(prefix.trim_end());
            } else {
                self.line(format!("{prefix} {line}"));
            }
        }
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str(&self.indent_unit);
        }
    }

    /// Returns the text, ending with a single newline.
    #[must_use]
    pub fn finish(self) -> String {
        let mut output = self.output;
        let trimmed = output.trim_end_matches('\n').len();
        output.truncate(trimmed);
        output.push('\n');
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_collapse() {
        let mut w = CodeWriter::new("    ");
        w.blank();
        w.line("a");
        w.blank();
        w.blank();
        w.line("");
        w.line("b");
        w.blank();
        assert_eq!(w.finish(), "a\n\nb\n");
    }

    #[test]
    fn test_block_indents() {
        let mut w = CodeWriter::new("  ");
        w.block("struct A {", "}", |w| {
            w.line("let x: Int");
            w.block("init() {", "}", |w| w.line("x = 0"));
        });
        assert_eq!(
            w.finish(),
            "struct A {\n  let x: Int\n  init() {\n    x = 0\n  }\n}\n"
        );
    }

    #[test]
    fn test_doc_multiline() {
        let mut w = CodeWriter::new("\t");
        w.doc("///", Some("First line\n\nThird line"));
        w.doc("///", None);
        assert_eq!(w.finish(), "/// First line\n///\n/// Third line\n");
    }

    #[test]
    fn test_snippet_reindents() {
        let mut w = CodeWriter::new("\t");
        w.indent();
        w.snippet("func f():\n    if x:\n        pass\n\nvar y\n");
        assert_eq!(w.finish(), "\tfunc f():\n\t\tif x:\n\t\t\tpass\n\n\tvar y\n");
    }

    #[test]
    fn test_suite_has_no_close() {
        let mut w = CodeWriter::new("\t");
        w.suite("func f():", |w| w.line("pass"));
        w.line("var x");
        assert_eq!(w.finish(), "func f():\n\tpass\nvar x\n");
    }
}
