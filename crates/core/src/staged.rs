#![forbid(unsafe_code)]

use crate::version::{Field, VersionSnapshot};

/// A value buffered for the next commit, or nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Staged<T> {
    Unset,
    Set(T),
}

impl<T> Default for Staged<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Staged<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    pub fn as_ref(&self) -> Staged<&T> {
        match self {
            Self::Unset => Staged::Unset,
            Self::Set(value) => Staged::Set(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Staged<U> {
        match self {
            Self::Unset => Staged::Unset,
            Self::Set(value) => Staged::Set(f(value)),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::Unset;
    }
}

/// Edits buffered on a motion between commits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StagedEdits {
    pub title: Staged<String>,
    pub text: Staged<String>,
    pub reason: Staged<Option<String>>,
}

impl StagedEdits {
    pub fn is_empty(&self) -> bool {
        !self.title.is_set() && !self.text.is_set() && !self.reason.is_set()
    }

    pub fn staged(&self, field: Field) -> Staged<Option<&str>> {
        match field {
            Field::Title => self.title.as_ref().map(|v| Some(v.as_str())),
            Field::Text => self.text.as_ref().map(|v| Some(v.as_str())),
            Field::Reason => self.reason.as_ref().map(|v| v.as_deref()),
        }
    }

    /// The staged value if one is set, otherwise the field of `base`.
    pub fn resolve<'a>(
        &'a self,
        field: Field,
        base: Option<&'a VersionSnapshot>,
    ) -> Option<&'a str> {
        match self.staged(field) {
            Staged::Set(value) => value,
            Staged::Unset => base.and_then(|snapshot| snapshot.field(field)),
        }
    }

    /// True when some staged field differs from `base`, or there is no base.
    pub fn differs_from(&self, base: Option<&VersionSnapshot>) -> bool {
        let Some(base) = base else {
            return true;
        };
        Field::ALL.into_iter().any(|field| match self.staged(field) {
            Staged::Set(value) => value != base.field(field),
            Staged::Unset => false,
        })
    }

    /// Full snapshot with staged fields laid over `base`.
    pub fn snapshot_over(&self, base: Option<&VersionSnapshot>) -> VersionSnapshot {
        VersionSnapshot {
            title: self.resolve(Field::Title, base).unwrap_or_default().to_string(),
            text: self.resolve(Field::Text, base).unwrap_or_default().to_string(),
            reason: self.resolve(Field::Reason, base).map(str::to_string),
        }
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.text.clear();
        self.reason.clear();
    }
}
