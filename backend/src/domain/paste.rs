//! Short-lived text pastes.
//!
//! A paste expires `minutes` after creation; expired pastes are invisible to
//! reads and cannot be updated. Every committed update bumps `version`.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::FieldErrors;
use super::versioned::{Patch, Version, Versioned};

/// Maximum title length in bytes.
pub const TITLE_MAX_BYTES: usize = 255;
/// Longest lifetime, or lifetime extension, accepted in one request.
pub const MAX_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Database-assigned paste identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PasteId(i64);

impl PasteId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier for persistence.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed set of paste categories, stored and serialised as 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Category {
    Sport,
    Home,
    Work,
}

impl Category {
    /// Numeric code used on the wire and in storage.
    pub const fn code(self) -> i16 {
        match self {
            Self::Sport => 1,
            Self::Home => 2,
            Self::Work => 3,
        }
    }

    /// Look up a category by code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Sport),
            2 => Some(Self::Home),
            3 => Some(Self::Work),
            _ => None,
        }
    }

    fn parse_field(code: i64) -> Result<Self, FieldErrors> {
        Self::from_code(code).ok_or_else(|| FieldErrors::single("category", "no such category"))
    }
}

impl From<Category> for i16 {
    fn from(value: Category) -> Self {
        value.code()
    }
}

impl TryFrom<i16> for Category {
    type Error = FieldErrors;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::parse_field(i64::from(value))
    }
}

/// Stored paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paste {
    pub id: PasteId,
    pub title: String,
    #[schema(value_type = i16, example = 1)]
    pub category: Category,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub version: Version,
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    errors.check(!title.trim().is_empty(), "title", "must be provided");
    errors.check(
        title.len() <= TITLE_MAX_BYTES,
        "title",
        format!("must not be more than {TITLE_MAX_BYTES} bytes long"),
    );
}

fn check_text(errors: &mut FieldErrors, text: &str) {
    errors.check(!text.trim().is_empty(), "text", "must be provided");
}

impl Versioned for Paste {
    type Id = PasteId;

    fn id(&self) -> PasteId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_title(&mut errors, &self.title);
        check_text(&mut errors, &self.text);
        errors.check(
            self.expires_at > self.created_at,
            "minutes",
            "paste can't be expired before creation",
        );
        errors.into_result()
    }
}

/// Validated creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteDraft {
    pub title: String,
    pub category: Category,
    pub text: String,
    pub minutes: i64,
}

impl PasteDraft {
    /// Validate raw creation input, reporting every failing field. Title and
    /// text are trimmed before they are checked and stored.
    ///
    /// # Examples
    /// ```
    /// use pastebin::domain::PasteDraft;
    ///
    /// assert!(PasteDraft::new("groceries", 2, "milk", 60).is_ok());
    /// assert!(PasteDraft::new("", 9, "", 0).is_err());
    /// ```
    pub fn new(
        title: impl Into<String>,
        category: i64,
        text: impl Into<String>,
        minutes: i64,
    ) -> Result<Self, FieldErrors> {
        let title = trimmed(title.into());
        let text = trimmed(text.into());
        let mut errors = FieldErrors::new();
        check_title(&mut errors, &title);
        check_text(&mut errors, &text);
        let category = match Category::parse_field(category) {
            Ok(category) => Some(category),
            Err(e) => {
                errors.extend(e);
                None
            }
        };
        errors.check(minutes > 0, "minutes", "must be greater than zero");
        errors.check(
            minutes <= MAX_MINUTES,
            "minutes",
            format!("must not be more than {MAX_MINUTES}"),
        );
        errors.into_result()?;
        let Some(category) = category else {
            return Err(FieldErrors::single("category", "no such category"));
        };
        Ok(Self {
            title,
            category,
            text,
            minutes,
        })
    }

    /// Stamp the draft with its creation time.
    pub fn at(self, now: DateTime<Utc>) -> NewPaste {
        NewPaste {
            expires_at: now + TimeDelta::minutes(self.minutes),
            created_at: now,
            title: self.title,
            category: self.category,
            text: self.text,
        }
    }
}

/// Insert payload handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    pub title: String,
    pub category: Category,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Sparse update. `minutes` extends (or shortens) the current expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PastePatch {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub text: Option<String>,
    pub minutes: Option<i64>,
}

impl PastePatch {
    /// Validate raw patch input. Title and text are trimmed; their contents
    /// are checked on the merged paste.
    pub fn new(
        title: Option<String>,
        category: Option<i64>,
        text: Option<String>,
        minutes: Option<i64>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let category = match category.map(Category::parse_field).transpose() {
            Ok(category) => category,
            Err(e) => {
                errors.extend(e);
                None
            }
        };
        if let Some(minutes) = minutes {
            errors.check(
                (-MAX_MINUTES..=MAX_MINUTES).contains(&minutes),
                "minutes",
                format!("must not be more than {MAX_MINUTES}"),
            );
        }
        errors.into_result()?;
        Ok(Self {
            title: title.map(trimmed),
            category,
            text: text.map(trimmed),
            minutes,
        })
    }
}

fn trimmed(raw: String) -> String {
    raw.trim().to_owned()
}

impl Patch<Paste> for PastePatch {
    fn merge_into(self, entity: &mut Paste) {
        if let Some(title) = self.title {
            entity.title = title;
        }
        if let Some(category) = self.category {
            entity.category = category;
        }
        if let Some(text) = self.text {
            entity.text = text;
        }
        if let Some(minutes) = self.minutes {
            entity.expires_at += TimeDelta::minutes(minutes);
        }
    }
}

/// Listing filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub category: Option<Category>,
}

impl PasteFilter {
    /// Whether `paste` passes the filter.
    pub fn matches(&self, paste: &Paste) -> bool {
        let title_ok = self.title.as_deref().is_none_or(|needle| {
            paste
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let category_ok = self.category.is_none_or(|c| c == paste.category);
        title_ok && category_ok
    }
}
