use std::fmt::Display;

/// String-typed result handed to a host UI, which only shows messages.
pub type CommandResult<T> = Result<T, String>;

pub fn to_command_error(error: impl Display) -> String {
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;

    #[test]
    fn to_command_error_uses_display_text() {
        let error = BrowserError::EntryNotFound("a/B.class".to_string());
        assert_eq!(
            to_command_error(error),
            "Entry not found in archive: a/B.class"
        );
    }
}
