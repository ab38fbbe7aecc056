pub mod raw;

use crate::receipt::Delimiters;
use crate::roster::{KeyColumns, Layout};
use anyhow::{Context, Error, Result, bail};
use chrono::NaiveDate;
use std::convert::{TryFrom, TryInto};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG: &str = "quittungen.yaml";
pub const DEFAULT_ROSTER: &str = "schuelerliste.xlsx";
pub const DEFAULT_PRICES: &str = "preise.xlsx";
pub const DEFAULT_TEMPLATE: &str = "Quittung-Template.docx";
pub const DEFAULT_OUTPUT: &str = "quittungen";
pub const DEFAULT_SCHOOL_YEAR: &str = "2024/2025";

/// Everything one run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub roster: PathBuf,
    pub prices: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    pub layout: Layout,
    /// School year used when the price workbook has no configuration sheet.
    pub school_year_fallback: String,
    pub delimiters: Delimiters,
    /// Issue date printed on the receipts. Today when unset.
    pub date: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            roster: PathBuf::from(DEFAULT_ROSTER),
            prices: PathBuf::from(DEFAULT_PRICES),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output: PathBuf::from(DEFAULT_OUTPUT),
            layout: Layout::family(),
            school_year_fallback: DEFAULT_SCHOOL_YEAR.to_owned(),
            delimiters: Delimiters::default(),
            date: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("roster", &self.roster),
            ("prices", &self.prices),
            ("template", &self.template),
            ("output", &self.output),
        ] {
            if path.as_os_str().is_empty() {
                bail!("All paths must be given: {} is empty", name);
            }
        }
        if self.delimiters.open.is_empty() && self.delimiters.close.is_empty() {
            bail!("Placeholder delimiters must not both be empty");
        }
        Ok(())
    }
}

impl raw::Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let doc = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&doc)
            .with_context(|| format!("Failed to deserialize config {}", path.display()))
    }
}

impl TryFrom<raw::Config> for Config {
    type Error = Error;

    fn try_from(raw: raw::Config) -> Result<Self> {
        let default = Config::default();
        let mut layout = match raw.layout.as_deref().map(str::trim) {
            None | Some("family") => Layout::family(),
            Some("member") => Layout::member(),
            Some(other) => bail!("Unknown layout '{}', expected 'family' or 'member'", other),
        };
        if let Some(columns) = raw.columns {
            apply_columns(&mut layout, columns)?;
        }
        if let Some(validate) = raw.validate {
            layout.validate = validate;
        }
        if let Some(excluded) = raw.excluded_statuses {
            layout.excluded_statuses = excluded;
        }

        let mut delimiters = default.delimiters;
        if let Some(placeholder) = raw.placeholder {
            delimiters.open = placeholder.open.unwrap_or(delimiters.open);
            delimiters.close = placeholder.close.unwrap_or(delimiters.close);
        }

        let date = raw
            .date
            .map(|date| {
                NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                    .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))
            })
            .transpose()?;

        let config = Config {
            roster: raw.roster.unwrap_or(default.roster),
            prices: raw.prices.unwrap_or(default.prices),
            template: raw.template.unwrap_or(default.template),
            output: raw.output.unwrap_or(default.output),
            layout,
            school_year_fallback: raw
                .school_year_fallback
                .unwrap_or(default.school_year_fallback),
            delimiters,
            date,
        };
        config.validate()?;
        Ok(config)
    }
}

fn apply_columns(layout: &mut Layout, columns: raw::Columns) -> Result<()> {
    match &mut layout.key {
        KeyColumns::Family {
            family_name,
            given_name,
        } => {
            if columns.member.is_some() {
                bail!("Column 'member' only applies to the member layout");
            }
            if let Some(family) = columns.family {
                *family_name = family;
            }
            if let Some(given) = columns.given_name {
                *given_name = given;
            }
        }
        KeyColumns::Member { member } => {
            if columns.family.is_some() || columns.given_name.is_some() {
                bail!("Columns 'family' and 'given_name' only apply to the family layout");
            }
            if let Some(name) = columns.member {
                *member = name;
            }
        }
    }
    if let Some(child) = columns.child {
        layout.child = child;
    }
    if let Some(status) = columns.status {
        let status = status.trim().to_owned();
        layout.status = if status.is_empty() { None } else { Some(status) };
    }
    Ok(())
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(doc: &str) -> Result<Self, Self::Err> {
        let raw: raw::Config = serde_yaml::from_str(doc)
            .with_context(|| format!("Failed to deserialize config:\n{}", doc))?;
        raw.try_into().context("Failed to convert config")
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn empty_config_uses_defaults() -> Result<()> {
        let config: Config = "{}".parse()?;
        assert_eq!(config, Config::default());
        assert_eq!(config.roster, PathBuf::from("schuelerliste.xlsx"));
        assert_eq!(config.output, PathBuf::from("quittungen"));
        Ok(())
    }

    #[test]
    fn member_layout_with_overrides() -> Result<()> {
        let config: Config = indoc! {"
            roster: daten/mitglieder.xlsx
            output: out
            layout: member
            columns:
              child: Kindername
              status: Gruppe
            excluded_statuses: [Ausgetreten]
            placeholder:
              open: '[['
            date: 2025-09-01
        "}
        .parse()?;
        dbg!(&config);
        assert_eq!(config.roster, PathBuf::from("daten/mitglieder.xlsx"));
        assert_eq!(config.prices, PathBuf::from("preise.xlsx"));
        assert_eq!(
            config.layout.key,
            KeyColumns::Member {
                member: "Mitglied".to_owned()
            }
        );
        assert_eq!(config.layout.child, "Kindername");
        assert_eq!(config.layout.status.as_deref(), Some("Gruppe"));
        assert!(config.layout.validate);
        assert_eq!(config.layout.excluded_statuses, vec!["Ausgetreten"]);
        assert_eq!(config.delimiters.open, "[[");
        assert_eq!(config.delimiters.close, "}}");
        assert_eq!(config.date, NaiveDate::from_ymd_opt(2025, 9, 1));
        Ok(())
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = "template: ''".parse::<Config>().unwrap_err();
        assert!(format!("{err:#}").contains("All paths must be given: template is empty"));
    }

    #[test]
    fn unknown_layout_is_rejected() {
        let err = "layout: klasse".parse::<Config>().unwrap_err();
        assert!(format!("{err:#}").contains("Unknown layout 'klasse'"));
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = raw::Config {
            roster: Some(PathBuf::from("a.xlsx")),
            output: Some(PathBuf::from("out")),
            columns: Some(raw::Columns {
                child: Some("Kind".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cli = raw::Config {
            roster: Some(PathBuf::from("b.xlsx")),
            columns: Some(raw::Columns {
                status: Some("Klasse".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.roster, Some(PathBuf::from("b.xlsx")));
        assert_eq!(merged.output, Some(PathBuf::from("out")));
        let columns = merged.columns.unwrap_or_default();
        assert_eq!(columns.child.as_deref(), Some("Kind"));
        assert_eq!(columns.status.as_deref(), Some("Klasse"));
    }
}
