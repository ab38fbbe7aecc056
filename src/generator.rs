use crate::config::Config;
use crate::fees::Fees;
use crate::prices::PriceTable;
use crate::receipt::{Receipt, path_safe};
use crate::roster::{Admission, Group, Household, HouseholdKey, Roster};
use crate::template::docx::Docx;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A household that got no receipt and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub household: HouseholdKey,
    pub reason: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedReceipt {
    pub household: HouseholdKey,
    pub number: u32,
    pub path: PathBuf,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Saved(SavedReceipt),
    Excluded {
        household: HouseholdKey,
        status: String,
    },
    Failed(ErrorRecord),
}

/// One outcome per household, in roster order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn saved(&self) -> impl Iterator<Item = &SavedReceipt> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Saved(saved) => Some(saved),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Failed(error) => Some(error),
            _ => None,
        })
    }

    pub fn excluded(&self) -> impl Iterator<Item = (&HouseholdKey, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Excluded { household, status } => Some((household, status.as_str())),
            _ => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.errors().next().is_none()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} receipt(s) created successfully.", self.saved().count())?;
        if self.is_complete() {
            return Ok(());
        }
        write!(f, "\n\nThe following households were skipped:")?;
        for error in self.errors() {
            write!(f, "\n- {}: {}", error.household, error.reason)?;
        }
        Ok(())
    }
}

/// Loads prices, roster and template, then writes one receipt per admitted household
/// into `config.output`.
///
/// Any failure while loading aborts the run before a receipt is written. Failures of
/// a single household are recorded in the report and the run continues.
pub fn generate(config: &Config) -> Result<Report> {
    config.validate()?;
    let prices = PriceTable::load(&config.prices, &config.school_year_fallback)
        .with_context(|| format!("Failed to load prices from {}", config.prices.display()))?;
    let roster = Roster::load(&config.roster, &config.layout)
        .with_context(|| format!("Failed to load roster from {}", config.roster.display()))?;
    let template = Docx::open(&config.template)?;
    fs::create_dir_all(&config.output).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.display()
        )
    })?;

    let mut generator = Generator {
        config,
        prices: &prices,
        template: &template,
        date: config.date.unwrap_or_else(|| Local::now().date_naive()),
        next_number: 1,
    };
    let outcomes = roster
        .groups()
        .iter()
        .map(|group| {
            generator.process(group).unwrap_or_else(|err| {
                let reason = format!("{err:#}");
                warn!(household = %group.key, %reason, "Skipping household");
                Outcome::Failed(ErrorRecord {
                    household: group.key.clone(),
                    reason,
                })
            })
        })
        .collect();
    let report = Report { outcomes };
    info!(
        saved = report.saved().count(),
        failed = report.errors().count(),
        excluded = report.excluded().count(),
        "Finished"
    );
    Ok(report)
}

struct Generator<'a> {
    config: &'a Config,
    prices: &'a PriceTable,
    template: &'a Docx,
    date: NaiveDate,
    next_number: u32,
}

impl Generator<'_> {
    fn process(&mut self, group: &Group) -> Result<Outcome> {
        let household = match group.admit(&self.config.layout)? {
            Admission::Admitted(household) => household,
            Admission::Excluded(status) => {
                debug!(household = %group.key, %status, "Excluded by status");
                return Ok(Outcome::Excluded {
                    household: group.key.clone(),
                    status,
                });
            }
        };
        let fees = Fees::compute(household.child_count(), self.prices);
        let receipt = Receipt {
            number: self.next_number,
            household: &household,
            fees,
            school_year: self.prices.school_year(),
            date: self.date,
        };

        let mut document = self.template.clone();
        document.fill(&receipt.replacements(&self.config.delimiters)?)?;
        let path = self.output_dir(&household)?.join(receipt.file_name());
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to replace {}", path.display()))?;
        }
        document.save(&path)?;
        info!(number = receipt.number, path = %path.display(), "Saved receipt");

        self.next_number += 1;
        Ok(Outcome::Saved(SavedReceipt {
            household: household.key.clone(),
            number: receipt.number,
            path,
            status: household.status.clone(),
        }))
    }

    /// The output directory, or a subfolder named after the household's status.
    fn output_dir(&self, household: &Household) -> Result<PathBuf> {
        let status = household
            .status
            .as_deref()
            .map(path_safe)
            .filter(|status| !status.is_empty());
        match status {
            Some(status) => {
                let dir = self.config.output.join(status);
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                Ok(dir)
            }
            None => Ok(self.config.output.clone()),
        }
    }
}

#[cfg(test)]
mod generator_tests {
    use super::*;
    use indoc::indoc;

    fn family(name: &str) -> HouseholdKey {
        HouseholdKey::Family {
            family_name: name.to_owned(),
            given_name: "Anna".to_owned(),
        }
    }

    fn saved(name: &str, number: u32) -> Outcome {
        Outcome::Saved(SavedReceipt {
            household: family(name),
            number,
            path: PathBuf::from(format!("quittungen/Quittung_{name}_{number:03}.docx")),
            status: None,
        })
    }

    #[test]
    fn report_without_errors() {
        let report = Report {
            outcomes: vec![
                saved("Müller", 1),
                Outcome::Excluded {
                    household: family("Kaya"),
                    status: "Abgemeldet".to_owned(),
                },
                saved("Schmidt", 2),
            ],
        };
        assert!(report.is_complete());
        assert_eq!(report.to_string(), "2 receipt(s) created successfully.");
        assert_eq!(report.excluded().count(), 1);
    }

    #[test]
    fn report_lists_errors() {
        let report = Report {
            outcomes: vec![
                saved("Müller", 1),
                Outcome::Failed(ErrorRecord {
                    household: HouseholdKey::Member("Weber".to_owned()),
                    reason: "Invalid child name in row 4: expected text, found '42'".to_owned(),
                }),
            ],
        };
        assert_eq!(
            report.to_string(),
            indoc! {"
                1 receipt(s) created successfully.

                The following households were skipped:
                - Weber: Invalid child name in row 4: expected text, found '42'"}
        );
    }

    #[test]
    fn status_subfolder_stays_inside_output() -> Result<()> {
        use crate::money::Money;
        use crate::template::docx::docx_tests::{DOCUMENT, package};
        use std::collections::BTreeMap;

        let dir = tempfile::tempdir()?;
        let config = Config {
            output: dir.path().join("inner"),
            ..Default::default()
        };
        let prices = PriceTable::new(BTreeMap::new(), Money::from(20), "2025/2026");
        let template = Docx::from_bytes(&package(DOCUMENT)?)?;
        let generator = Generator {
            config: &config,
            prices: &prices,
            template: &template,
            date: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date"),
            next_number: 1,
        };
        for (status, expected) in [("..", "_"), (".", "_"), ("../1a", ".._1a")] {
            let household = Household {
                key: family("Müller"),
                children: vec!["Ben".to_owned()],
                status: Some(status.to_owned()),
            };
            let output = generator.output_dir(&household)?;
            assert_eq!(output, config.output.join(expected));
            assert!(output.starts_with(&config.output));
        }
        Ok(())
    }

    #[test]
    fn outcomes_serialize_tagged() -> Result<()> {
        let report = Report {
            outcomes: vec![
                saved("Müller", 1),
                Outcome::Excluded {
                    household: HouseholdKey::Member("Kaya".to_owned()),
                    status: "Warteliste".to_owned(),
                },
            ],
        };
        let json = serde_json::to_value(&report)?;
        dbg!(&json);
        assert_eq!(json["outcomes"][0]["outcome"], "saved");
        assert_eq!(json["outcomes"][0]["household"]["family_name"], "Müller");
        assert!(json["outcomes"][0].get("status").is_none());
        assert_eq!(json["outcomes"][1]["outcome"], "excluded");
        assert_eq!(json["outcomes"][1]["household"], "Kaya");
        Ok(())
    }
}
