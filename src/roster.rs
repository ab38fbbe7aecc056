use crate::error::LoadError;
use crate::workbook::{Record, Sheet, Workbook, cell_text};
use anyhow::{Result, bail};
use calamine::Data;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Columns identifying the household a roster row belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyColumns {
    /// Family name plus the first name of the parent.
    Family { family_name: String, given_name: String },
    /// A single column holding the member's full name.
    Member { member: String },
}

/// How a roster workbook is laid out and which households it admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub key: KeyColumns,
    pub child: String,
    pub status: Option<String>,
    /// Reject households whose child cells are not text instead of printing them as-is.
    pub validate: bool,
    pub excluded_statuses: Vec<String>,
}

impl Layout {
    /// `Familienname` | `Vorname_Elternteil` | `Vorname_Kind`
    pub fn family() -> Self {
        Layout {
            key: KeyColumns::Family {
                family_name: "Familienname".to_owned(),
                given_name: "Vorname_Elternteil".to_owned(),
            },
            child: "Vorname_Kind".to_owned(),
            status: None,
            validate: false,
            excluded_statuses: Vec::new(),
        }
    }

    /// `Mitglied` | `Kind` | `Klasse`
    pub fn member() -> Self {
        Layout {
            key: KeyColumns::Member {
                member: "Mitglied".to_owned(),
            },
            child: "Kind".to_owned(),
            status: Some("Klasse".to_owned()),
            validate: true,
            excluded_statuses: vec!["Abgemeldet".to_owned(), "Warteliste".to_owned()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum HouseholdKey {
    Family { family_name: String, given_name: String },
    Member(String),
}

impl HouseholdKey {
    /// Name of the addressee printed on the receipt.
    pub fn display_name(&self) -> String {
        match self {
            HouseholdKey::Family {
                family_name,
                given_name,
            } => format!("{given_name} {family_name}"),
            HouseholdKey::Member(member) => member.clone(),
        }
    }

    /// Identifier embedded in the receipt file name.
    pub fn file_id(&self) -> &str {
        match self {
            HouseholdKey::Family { family_name, .. } => family_name,
            HouseholdKey::Member(member) => member,
        }
    }
}

impl fmt::Display for HouseholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One child of one household.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub line: usize,
    pub key: HouseholdKey,
    pub child: Data,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Roster {
    rows: Vec<RosterRow>,
}

/// Rows sharing a household key, in sheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: HouseholdKey,
    pub rows: Vec<RosterRow>,
}

/// A group that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Household {
    pub key: HouseholdKey,
    pub children: Vec<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Admitted(Household),
    /// Skipped because of its status. Not an error.
    Excluded(String),
}

impl Roster {
    /// Reads the first sheet of the roster workbook.
    pub fn load(path: &Path, layout: &Layout) -> Result<Self, LoadError> {
        let sheet = Workbook::open(path)?.first_sheet()?;
        let roster = Self::from_sheet(&sheet, layout)?;
        info!(rows = roster.rows.len(), "Loaded roster");
        Ok(roster)
    }

    /// Rows missing any part of the household key are dropped.
    pub fn from_sheet(sheet: &Sheet, layout: &Layout) -> Result<Self, LoadError> {
        let key = KeyReader::new(sheet, &layout.key)?;
        let child = sheet.column(&layout.child)?;
        let status = layout
            .status
            .as_deref()
            .map(|status| sheet.column(status))
            .transpose()?;

        let rows = sheet
            .records()
            .iter()
            .filter_map(|record| {
                let row = key.read(record).map(|key| RosterRow {
                    line: record.line,
                    key,
                    child: record.get(child).clone(),
                    status: status.and_then(|status| cell_text(record.get(status))),
                });
                if row.is_none() {
                    debug!(line = record.line, "Dropping roster row without household key");
                }
                row
            })
            .collect();
        Ok(Roster { rows })
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    /// Groups rows by household, in the order each household first appears.
    pub fn groups(&self) -> Vec<Group> {
        let mut positions: HashMap<&HouseholdKey, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        for row in &self.rows {
            match positions.get(&row.key) {
                Some(&position) => groups[position].rows.push(row.clone()),
                None => {
                    positions.insert(&row.key, groups.len());
                    groups.push(Group {
                        key: row.key.clone(),
                        rows: vec![row.clone()],
                    });
                }
            }
        }
        groups
    }
}

impl Group {
    /// Excluded statuses are checked before the child cells, so a withdrawn household
    /// with broken data is still skipped silently.
    pub fn admit(&self, layout: &Layout) -> Result<Admission> {
        let status = self.rows.first().and_then(|row| row.status.clone());
        if let Some(status) = &status {
            if layout.excluded_statuses.iter().any(|excluded| excluded == status) {
                return Ok(Admission::Excluded(status.clone()));
            }
        }
        let children = self
            .rows
            .iter()
            .map(|row| child_name(row, layout.validate))
            .collect::<Result<Vec<_>>>()?;
        Ok(Admission::Admitted(Household {
            key: self.key.clone(),
            children,
            status,
        }))
    }
}

fn child_name(row: &RosterRow, validate: bool) -> Result<String> {
    match (&row.child, validate) {
        (Data::String(name), _) => Ok(name.trim().to_owned()),
        (Data::Empty, false) => bail!("Child name missing in row {}", row.line),
        (other, false) => Ok(other.to_string()),
        (other, true) => bail!(
            "Invalid child name in row {}: expected text, found {}",
            row.line,
            describe(other)
        ),
    }
}

fn describe(cell: &Data) -> String {
    match cell {
        Data::Empty => "an empty cell".to_owned(),
        Data::Error(err) => format!("the error value {err:?}"),
        other => format!("'{other}'"),
    }
}

impl Household {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn children_names(&self) -> String {
        self.children.iter().join(" und ")
    }
}

enum KeyReader {
    Family { family_name: usize, given_name: usize },
    Member { member: usize },
}

impl KeyReader {
    fn new(sheet: &Sheet, columns: &KeyColumns) -> Result<Self, LoadError> {
        Ok(match columns {
            KeyColumns::Family {
                family_name,
                given_name,
            } => KeyReader::Family {
                family_name: sheet.column(family_name)?,
                given_name: sheet.column(given_name)?,
            },
            KeyColumns::Member { member } => KeyReader::Member {
                member: sheet.column(member)?,
            },
        })
    }

    fn read(&self, record: &Record) -> Option<HouseholdKey> {
        match *self {
            KeyReader::Family {
                family_name,
                given_name,
            } => Some(HouseholdKey::Family {
                family_name: cell_text(record.get(family_name))?,
                given_name: cell_text(record.get(given_name))?,
            }),
            KeyReader::Member { member } => {
                Some(HouseholdKey::Member(cell_text(record.get(member))?))
            }
        }
    }
}
