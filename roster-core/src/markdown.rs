//! Markdown rendering for typed responses

use std::fmt::Display;

/// Incremental markdown document
#[derive(Debug, Default, Clone)]
pub struct Markdown {
    buf: String,
}

impl Markdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a level-1 title
    pub fn titled(title: &str) -> Self {
        let mut doc = Self::new();
        doc.heading(1, title);
        doc
    }

    pub fn heading(&mut self, level: usize, text: &str) -> &mut Self {
        self.block(&format!("{} {}", "#".repeat(level.clamp(1, 6)), text))
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        if text.trim().is_empty() {
            return self;
        }
        self.block(text.trim())
    }

    /// `**Label:** value`, skipped when the value is empty
    pub fn field(&mut self, label: &str, value: impl Display) -> &mut Self {
        let value = value.to_string();
        if value.is_empty() {
            return self;
        }
        self.buf.push_str(&format!("**{}:** {}\n", label, value));
        self
    }

    /// Bulleted list under a bold label, skipped when empty
    pub fn list(&mut self, label: &str, items: &[String]) -> &mut Self {
        if items.is_empty() {
            return self;
        }
        self.buf.push_str(&format!("**{}:**\n", label));
        for item in items {
            self.buf.push_str(&format!("- {}\n", item));
        }
        self
    }

    pub fn bullets(&mut self, items: &[String]) -> &mut Self {
        let bullets = items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n");
        self.block(&bullets)
    }

    /// Level-2 section listing every item through `render`
    pub fn section<T>(
        &mut self,
        title: &str,
        items: &[T],
        render: impl Fn(&mut Markdown, &T),
    ) -> &mut Self {
        if items.is_empty() {
            return self;
        }
        self.heading(2, title);
        for item in items {
            render(self, item);
            self.buf.push('\n');
        }
        self
    }

    fn block(&mut self, text: &str) -> &mut Self {
        if !self.buf.is_empty() && !self.buf.ends_with("\n\n") {
            if !self.buf.ends_with('\n') {
                self.buf.push('\n');
            }
            self.buf.push('\n');
        }
        self.buf.push_str(text);
        self.buf.push('\n');
        self
    }

    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.buf).trim_end().to_string() + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_layout() {
        let risks = vec![("Login", "high"), ("Payment", "low")];
        let mut doc = Markdown::titled("Risk Assessment");
        doc.paragraph("Two risks found.")
            .section("Risks", &risks, |doc, (title, level)| {
                doc.heading(3, title).field("Impact", level);
            });

        let out = doc.finish();
        assert!(out.starts_with("# Risk Assessment\n\nTwo risks found.\n\n## Risks\n"));
        assert!(out.contains("### Login\n**Impact:** high\n"));
        assert!(out.contains("### Payment\n**Impact:** low\n"));
        assert!(out.ends_with("low\n"));
    }

    #[test]
    fn test_empty_parts_are_skipped() {
        let mut doc = Markdown::titled("Empty");
        doc.field("Owner", "")
            .list("Tags", &[])
            .paragraph("  ")
            .section::<String>("Items", &[], |_, _| {});
        assert_eq!(doc.finish(), "# Empty\n");
    }

    #[test]
    fn test_list_renders_bullets() {
        let mut doc = Markdown::new();
        doc.list("Steps", &["open".to_string(), "click".to_string()]);
        assert_eq!(doc.finish(), "**Steps:**\n- open\n- click\n");
    }
}
