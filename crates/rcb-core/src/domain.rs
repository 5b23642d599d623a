/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Extract family, resolved from the upload's file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Casino,
    Aviator,
    Sport,
}

impl Category {
    /// Literal used both for file-name matching and for artifact names.
    pub fn literal(self) -> &'static str {
        match self {
            Category::Casino => "Casino",
            Category::Aviator => "Aviator",
            Category::Sport => "Sport",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Casino => "casino",
            Category::Aviator => "aviator",
            Category::Sport => "sport",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.literal())
    }
}
