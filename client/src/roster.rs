/// Names of remote participants currently typing, in the order they started.
#[derive(Debug, Default, Clone)]
pub struct TypingRoster {
    names: Vec<String>,
}

impl TypingRoster {
    /// Apply a typing event. Returns whether the set changed.
    pub fn apply(&mut self, sender: &str, is_typing: bool) -> bool {
        let position = self.names.iter().position(|n| n == sender);
        match (is_typing, position) {
            (true, None) => {
                self.names.push(sender.to_string());
                true
            }
            (false, Some(index)) => {
                self.names.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn summary(&self) -> String {
        typing_summary(&self.names)
    }
}

/// Human readable line for the typing indicator; empty when nobody types.
pub fn typing_summary<S: AsRef<str>>(names: &[S]) -> String {
    match names {
        [] => String::new(),
        [one] => format!("{} is typing...", one.as_ref()),
        [first, second] => format!("{} and {} are typing...", first.as_ref(), second.as_ref()),
        many => format!("{} people are typing...", many.len()),
    }
}
