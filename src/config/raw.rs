use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw struct deserialized from yaml. Every field is optional, missing ones fall back
/// to the defaults when resolved.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub roster: Option<PathBuf>,
    pub prices: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub layout: Option<String>,
    pub columns: Option<Columns>,
    pub validate: Option<bool>,
    pub excluded_statuses: Option<Vec<String>>,
    pub school_year_fallback: Option<String>,
    pub placeholder: Option<Placeholder>,
    pub date: Option<String>,
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Columns {
    pub family: Option<String>,
    pub given_name: Option<String>,
    pub member: Option<String>,
    pub child: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Placeholder {
    pub open: Option<String>,
    pub close: Option<String>,
}

impl Config {
    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            roster: overrides.roster.or(self.roster),
            prices: overrides.prices.or(self.prices),
            template: overrides.template.or(self.template),
            output: overrides.output.or(self.output),
            layout: overrides.layout.or(self.layout),
            columns: match (self.columns, overrides.columns) {
                (Some(base), Some(columns)) => Some(base.merge(columns)),
                (base, columns) => columns.or(base),
            },
            validate: overrides.validate.or(self.validate),
            excluded_statuses: overrides.excluded_statuses.or(self.excluded_statuses),
            school_year_fallback: overrides.school_year_fallback.or(self.school_year_fallback),
            placeholder: match (self.placeholder, overrides.placeholder) {
                (Some(base), Some(placeholder)) => Some(Placeholder {
                    open: placeholder.open.or(base.open),
                    close: placeholder.close.or(base.close),
                }),
                (base, placeholder) => placeholder.or(base),
            },
            date: overrides.date.or(self.date),
        }
    }
}

impl Columns {
    fn merge(self, overrides: Columns) -> Columns {
        Columns {
            family: overrides.family.or(self.family),
            given_name: overrides.given_name.or(self.given_name),
            member: overrides.member.or(self.member),
            child: overrides.child.or(self.child),
            status: overrides.status.or(self.status),
        }
    }
}
