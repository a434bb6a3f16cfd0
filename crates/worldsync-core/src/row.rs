//! Positional input rows and their typed views.
//!
//! Column meaning is decided by the input category, not by the row: the same
//! [`InputRow`] is read as a [`MembershipRow`] or a [`WorldRow`] depending on
//! which file it came from.

use crate::config::WorldsConfig;
use crate::error::{SyncError, SyncResult};
use crate::ids::{GroupId, UserId};

/// One record of an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    /// 1-based line number in the source file.
    pub line: usize,
    fields: Vec<String>,
}

impl InputRow {
    pub fn new<I, S>(line: usize, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            line,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of columns present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value of a column. Missing and empty columns both read as `None`.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields
            .get(index)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, index: usize, name: &'static str) -> SyncResult<&str> {
        self.field(index).ok_or(SyncError::MissingField {
            line: self.line,
            index,
            name,
        })
    }

    fn owned(&self, index: usize) -> Option<String> {
        self.field(index).map(str::to_string)
    }
}

/// A `members.csv` record: `user, world id, role label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRow {
    pub user: UserId,
    pub group: GroupId,
    pub role_label: String,
}

impl MembershipRow {
    pub fn parse(row: &InputRow) -> SyncResult<Self> {
        Ok(Self {
            user: UserId::new(row.required(0, "user")?),
            group: GroupId::new(row.required(1, "world id")?),
            role_label: row.required(2, "role")?.to_string(),
        })
    }
}

/// A `worlds.csv` record.
///
/// Columns 2 (start date), 4 (short description) and 7 (end date) are carried
/// by the export but not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldRow {
    pub line: usize,
    pub term: Option<String>,
    pub group: GroupId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub template_code: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub grouping: Option<String>,
    /// Configured custom property names paired with their column values, in
    /// configuration order. The grouping entry is not repeated here.
    pub custom: Vec<(String, Option<String>)>,
}

impl WorldRow {
    const GROUPING_COLUMN: usize = 11;

    pub fn parse(row: &InputRow, config: &WorldsConfig) -> SyncResult<Self> {
        let custom = config
            .custom_properties
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, name)| (name.clone(), row.owned(Self::GROUPING_COLUMN + index)))
            .collect();

        Ok(Self {
            line: row.line,
            term: row.owned(0),
            group: GroupId::new(row.required(1, "world id")?),
            title: row.owned(3),
            description: row.owned(5),
            published: row.owned(6),
            template_code: row.owned(8),
            contact_name: row.owned(9),
            contact_email: row.owned(10),
            grouping: row.owned(Self::GROUPING_COLUMN),
            custom,
        })
    }

    /// A world is published only when its flag column holds exactly `"1"`.
    pub fn is_published(&self) -> bool {
        self.published.as_deref() == Some("1")
    }
}
