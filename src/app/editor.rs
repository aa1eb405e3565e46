/// Single-line command editor with history recall.
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    buffer: String,
    /// Cursor position in characters
    cursor: usize,
    history: Vec<String>,
    history_pos: Option<usize>,
    draft: String,
    limit: usize,
}

impl LineEditor {
    pub fn new(history: Vec<String>, limit: usize) -> Self {
        let skip = history.len().saturating_sub(limit);
        Self {
            history: history.into_iter().skip(skip).collect(),
            limit,
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index();
        self.buffer.insert(at, c);
        self.cursor += 1;
    }

    /// Insert pasted text; line breaks and other controls are dropped.
    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars().filter(|c| !c.is_control()) {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.buffer.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index();
            self.buffer.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_pos = None;
    }

    fn load(&mut self, text: String) {
        self.buffer = text;
        self.cursor = self.char_len();
    }

    pub fn history_prev(&mut self) {
        let pos = match self.history_pos {
            None if self.history.is_empty() => return,
            None => {
                self.draft = std::mem::take(&mut self.buffer);
                self.history.len() - 1
            }
            Some(0) => return,
            Some(pos) => pos - 1,
        };
        self.history_pos = Some(pos);
        self.load(self.history[pos].clone());
    }

    pub fn history_next(&mut self) {
        match self.history_pos {
            None => {}
            Some(pos) if pos + 1 < self.history.len() => {
                self.history_pos = Some(pos + 1);
                self.load(self.history[pos + 1].clone());
            }
            Some(_) => {
                self.history_pos = None;
                let draft = std::mem::take(&mut self.draft);
                self.load(draft);
            }
        }
    }

    /// Take the current line, recording it in history unless it is blank or
    /// repeats the previous entry.
    pub fn submit(&mut self) -> String {
        let line = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.history_pos = None;
        self.draft.clear();
        if !line.trim().is_empty() && self.history.last() != Some(&line) {
            self.history.push(line.clone());
            if self.history.len() > self.limit {
                let excess = self.history.len() - self.limit;
                self.history.drain(..excess);
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> LineEditor {
        let mut editor = LineEditor::new(Vec::new(), 10);
        editor.insert_str(s);
        editor
    }

    #[test]
    fn test_editing_moves_by_characters() {
        let mut editor = typed("héllo");
        editor.left();
        editor.left();
        editor.backspace();
        assert_eq!(editor.text(), "hélo");
        editor.home();
        editor.delete();
        assert_eq!(editor.text(), "élo");
        editor.end();
        editor.insert('!');
        assert_eq!(editor.text(), "élo!");
        assert_eq!(editor.cursor(), 4);
    }

    #[test]
    fn test_paste_drops_line_breaks() {
        let editor = typed("a\r\nb\tc");
        assert_eq!(editor.text(), "abc");
    }

    #[test]
    fn test_submit_skips_repeated_command() {
        let mut editor = typed("AT");
        assert_eq!(editor.submit(), "AT");
        editor.insert_str("AT");
        editor.submit();
        editor.insert_str("ATI");
        editor.submit();
        assert_eq!(editor.history(), &["AT".to_string(), "ATI".to_string()]);
        assert!(editor.is_empty());
    }

    #[test]
    fn test_blank_line_is_not_recorded() {
        let mut editor = typed("   ");
        assert_eq!(editor.submit(), "   ");
        assert!(editor.history().is_empty());
    }

    #[test]
    fn test_history_recall_restores_draft() {
        let mut editor = LineEditor::new(vec!["one".into(), "two".into()], 10);
        editor.insert_str("dra");
        editor.history_prev();
        assert_eq!(editor.text(), "two");
        editor.history_prev();
        editor.history_prev();
        assert_eq!(editor.text(), "one");
        editor.history_next();
        assert_eq!(editor.text(), "two");
        editor.history_next();
        assert_eq!(editor.text(), "dra");
    }

    #[test]
    fn test_history_limit() {
        let mut editor = LineEditor::new((0..5).map(|i| i.to_string()).collect(), 3);
        assert_eq!(editor.history(), &["2", "3", "4"]);
        editor.insert_str("5");
        editor.submit();
        assert_eq!(editor.history(), &["3", "4", "5"]);
    }
}
