use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Zero-based (row, col) location in the host buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub begin: Position,
    pub end: Position,
}

/// A text replacement. Without a range the host replaces the word under the
/// cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub new_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

impl Edit {
    pub fn new(new_text: impl Into<String>) -> Self {
        Self {
            new_text: new_text.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = Some(range);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub text: String,
    #[serde(default)]
    pub syntax: String,
}

/// A raw completion candidate as produced by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub source: String,
    pub primary_edit: Edit,
    #[serde(default)]
    pub secondary_edits: Vec<Edit>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub doc: Option<Doc>,
}

impl Completion {
    pub fn new(source: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            primary_edit: Edit::new(new_text),
            secondary_edits: Vec::new(),
            label: None,
            doc: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(Doc {
            text: text.into(),
            syntax: String::new(),
        });
        self
    }
}

/// The edit context of one completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub uid: Uuid,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub line_before: String,
    #[serde(default)]
    pub line_after: String,
    #[serde(default)]
    pub words_before: String,
    #[serde(default)]
    pub words_after: String,
}

impl Context {
    /// A fresh request context with a new correlation id.
    pub fn new() -> Self {
        Self::with_uid(Uuid::new_v4())
    }

    pub fn with_uid(uid: Uuid) -> Self {
        Self {
            uid,
            position: Position::default(),
            line_before: String::new(),
            line_after: String::new(),
            words_before: String::new(),
            words_after: String::new(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Correlation payload attached to every menu record. The host hands it back
/// untouched when the user accepts the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub ctx_uid: Uuid,
    pub primary_edit: Edit,
    pub secondary_edits: Vec<Edit>,
}

/// A completion-menu item in the shape the host renderer expects.
///
/// `empty`, `dup` and `equal` are always 1: the menu must keep items with an
/// empty word, keep items with equal words, and not filter on typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub word: String,
    pub empty: u8,
    pub dup: u8,
    pub equal: u8,
    pub abbr: String,
    pub menu: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub user_data: UserData,
}

impl DisplayRecord {
    pub fn from_completion(context: &Context, cmp: Completion) -> Self {
        Self::for_request(context.uid, cmp)
    }

    pub(crate) fn for_request(ctx_uid: Uuid, cmp: Completion) -> Self {
        let Completion {
            source,
            primary_edit,
            secondary_edits,
            label,
            doc,
        } = cmp;

        let abbr = label.unwrap_or_else(|| primary_edit.new_text.clone());
        Self {
            word: String::new(),
            empty: 1,
            dup: 1,
            equal: 1,
            abbr,
            menu: format!("[{source}]"),
            info: doc.map(|d| d.text),
            user_data: UserData {
                ctx_uid,
                primary_edit,
                secondary_edits,
            },
        }
    }
}
