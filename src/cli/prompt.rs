use dialoguer::Input;

use crate::{Ec2ToolsError, Result};

/// Interactive input capability injected into command handlers, so the
/// resolution logic stays testable without a real terminal.
pub trait Prompt {
    fn read_line(&self, message: &str) -> Result<String>;

    fn confirm(&self, message: &str) -> Result<bool> {
        Ok(self.read_line(message)?.trim().eq_ignore_ascii_case("y"))
    }
}

/// Terminal-backed prompt.
pub struct TermPrompt;

impl Prompt for TermPrompt {
    fn read_line(&self, message: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Ec2ToolsError::Prompt(e.to_string()))
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Prompt that replays canned replies.
    pub struct ScriptedPrompt {
        replies: RefCell<VecDeque<String>>,
    }

    impl ScriptedPrompt {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn read_line(&self, _message: &str) -> Result<String> {
            self.replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| Ec2ToolsError::Prompt("no scripted reply left".to_string()))
        }
    }

    #[test]
    fn test_confirm_accepts_only_y() {
        let prompt = ScriptedPrompt::new(&["y", "Y", "yes", "n", ""]);
        assert!(prompt.confirm("?").unwrap());
        assert!(prompt.confirm("?").unwrap());
        assert!(!prompt.confirm("?").unwrap());
        assert!(!prompt.confirm("?").unwrap());
        assert!(!prompt.confirm("?").unwrap());
    }
}
