use crate::error::LoadError;
use crate::money::Money;
use crate::workbook::{Record, Sheet, Workbook, cell_text};
use calamine::Data;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::path::Path;
use tracing::info;

pub const FEES_SHEET: &str = "Gebuehren";
pub const CONTRIBUTIONS_SHEET: &str = "Beitraege";
pub const CONFIG_SHEET: &str = "Konfiguration";

const CHILD_INDEX: &str = "Kind_Nr";
const AMOUNT: &str = "Betrag";
const ITEM: &str = "Posten";
const MEMBERSHIP_ITEM: &str = "Mitgliedsbeitrag";
const PROPERTY: &str = "Eigenschaft";
const VALUE: &str = "Wert";
const SCHOOL_YEAR_PROPERTY: &str = "Schuljahr";

/// School fee per child rank, the yearly membership fee and the school year printed on
/// every receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    child_fees: BTreeMap<u32, Money>,
    membership_fee: Money,
    school_year: String,
}

impl PriceTable {
    pub fn new(child_fees: BTreeMap<u32, Money>, membership_fee: Money, school_year: &str) -> Self {
        Self {
            child_fees,
            membership_fee,
            school_year: school_year.to_owned(),
        }
    }

    /// Reads the fee, contribution and (optional) configuration sheets of the price
    /// workbook. Without a configuration sheet the school year is `school_year_fallback`.
    pub fn load(path: &Path, school_year_fallback: &str) -> Result<Self, LoadError> {
        let mut workbook = Workbook::open(path)?;
        let fees = workbook.sheet(FEES_SHEET)?;
        let contributions = workbook.sheet(CONTRIBUTIONS_SHEET)?;
        let config = if workbook.has_sheet(CONFIG_SHEET) {
            Some(workbook.sheet(CONFIG_SHEET)?)
        } else {
            None
        };
        let prices = Self::from_sheets(&fees, &contributions, config.as_ref(), school_year_fallback)?;
        info!(
            tiers = prices.child_fees.len(),
            membership_fee = %prices.membership_fee,
            school_year = %prices.school_year,
            "Loaded price table"
        );
        Ok(prices)
    }

    pub fn from_sheets(
        fees: &Sheet,
        contributions: &Sheet,
        config: Option<&Sheet>,
        school_year_fallback: &str,
    ) -> Result<Self, LoadError> {
        let child_fees = child_fees(fees)?;

        let amount = contributions.column(AMOUNT)?;
        let membership = lookup(contributions, ITEM, MEMBERSHIP_ITEM)?;
        let membership_fee = amount_cell(contributions, membership, amount)?;

        let school_year = match config {
            Some(config) => {
                let value = config.column(VALUE)?;
                let record = lookup(config, PROPERTY, SCHOOL_YEAR_PROPERTY)?;
                cell_text(record.get(value)).ok_or_else(|| LoadError::InvalidCell {
                    sheet: config.name().to_owned(),
                    column: VALUE.to_owned(),
                    line: record.line,
                    reason: "school year is empty".to_owned(),
                })?
            }
            None => school_year_fallback.to_owned(),
        };

        Ok(Self {
            child_fees,
            membership_fee,
            school_year,
        })
    }

    /// Fee for the child at 1-based `rank` within a household, zero past the last tier.
    pub fn child_fee(&self, rank: u32) -> Money {
        self.child_fees.get(&rank).copied().unwrap_or_default()
    }

    pub fn membership_fee(&self) -> Money {
        self.membership_fee
    }

    pub fn school_year(&self) -> &str {
        &self.school_year
    }
}

fn child_fees(sheet: &Sheet) -> Result<BTreeMap<u32, Money>, LoadError> {
    let index = sheet.column(CHILD_INDEX)?;
    let amount = sheet.column(AMOUNT)?;
    sheet
        .records()
        .iter()
        .filter(|record| {
            !matches!(record.get(index), Data::Empty) || !matches!(record.get(amount), Data::Empty)
        })
        .map(|record| {
            let rank = child_rank(record.get(index)).ok_or_else(|| LoadError::InvalidCell {
                sheet: sheet.name().to_owned(),
                column: CHILD_INDEX.to_owned(),
                line: record.line,
                reason: format!("{:?} is not a child number", record.get(index)),
            })?;
            Ok((rank, amount_cell(sheet, record, amount)?))
        })
        .collect()
}

fn child_rank(cell: &Data) -> Option<u32> {
    match cell {
        Data::Int(i) => u32::try_from(*i).ok(),
        Data::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX) => {
            Some(*f as u32)
        }
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn amount_cell(sheet: &Sheet, record: &Record, column: usize) -> Result<Money, LoadError> {
    let cell = record.get(column);
    let parsed = match cell {
        Data::Float(f) => Money::try_from(*f),
        Data::Int(i) => Ok(Money::from(*i)),
        Data::String(s) => s.parse(),
        other => Err(anyhow::anyhow!("{:?} is not an amount", other)),
    };
    parsed.map_err(|err| LoadError::InvalidCell {
        sheet: sheet.name().to_owned(),
        column: AMOUNT.to_owned(),
        line: record.line,
        reason: format!("{err:#}"),
    })
}

/// First record of `sheet` whose `column` equals `value`.
fn lookup<'a>(sheet: &'a Sheet, column: &str, value: &str) -> Result<&'a Record, LoadError> {
    let index = sheet.column(column)?;
    sheet.find(index, value).ok_or_else(|| LoadError::MissingRow {
        sheet: sheet.name().to_owned(),
        column: column.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod prices_tests {
    use super::*;
    use crate::workbook::text;
    use anyhow::Result;

    fn fees() -> Sheet {
        Sheet::from_rows(
            FEES_SHEET,
            0,
            vec![
                vec![text("Kind_Nr "), text(" Betrag")],
                vec![Data::Float(1.0), Data::Float(100.0)],
                vec![Data::Float(2.0), Data::Float(80.0)],
                vec![text("3"), text("60,50")],
            ],
        )
    }

    fn contributions() -> Sheet {
        Sheet::from_rows(
            CONTRIBUTIONS_SHEET,
            0,
            vec![
                vec![text("Posten"), text("Betrag")],
                vec![text("Spende"), Data::Float(5.0)],
                vec![text("Mitgliedsbeitrag"), Data::Float(20.0)],
            ],
        )
    }

    #[test]
    fn loads_fees_membership_and_school_year() -> Result<()> {
        let config = Sheet::from_rows(
            CONFIG_SHEET,
            0,
            vec![
                vec![text("Eigenschaft"), text("Wert")],
                vec![text("Schuljahr"), text("2025/2026")],
            ],
        );
        let prices = PriceTable::from_sheets(&fees(), &contributions(), Some(&config), "x")?;
        assert_eq!(prices.child_fee(1), Money::from(100));
        assert_eq!(prices.child_fee(2), Money::from(80));
        assert_eq!(prices.child_fee(3).to_string(), "60,50 EUR");
        assert_eq!(prices.child_fee(4), Money::zero());
        assert_eq!(prices.membership_fee(), Money::from(20));
        assert_eq!(prices.school_year(), "2025/2026");
        Ok(())
    }

    #[test]
    fn school_year_falls_back_without_config_sheet() -> Result<()> {
        let prices = PriceTable::from_sheets(&fees(), &contributions(), None, "2024/2025")?;
        assert_eq!(prices.school_year(), "2024/2025");
        Ok(())
    }

    #[test]
    fn missing_membership_row_is_fatal() {
        let contributions = Sheet::from_rows(
            CONTRIBUTIONS_SHEET,
            0,
            vec![
                vec![text("Posten"), text("Betrag")],
                vec![text("Spende"), Data::Float(5.0)],
            ],
        );
        let err = PriceTable::from_sheets(&fees(), &contributions, None, "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "No row with Posten = 'Mitgliedsbeitrag' in sheet 'Beitraege'"
        );
    }

    #[test]
    fn missing_school_year_row_is_fatal() {
        let config = Sheet::from_rows(
            CONFIG_SHEET,
            0,
            vec![vec![text("Eigenschaft"), text("Wert")]],
        );
        let err = PriceTable::from_sheets(&fees(), &contributions(), Some(&config), "x").unwrap_err();
        assert!(matches!(err, LoadError::MissingRow { .. }));
    }

    #[test]
    fn invalid_cells_are_reported_with_their_row() {
        let fees = Sheet::from_rows(
            FEES_SHEET,
            0,
            vec![
                vec![text("Kind_Nr"), text("Betrag")],
                vec![Data::Float(1.0), Data::Float(100.0)],
                vec![text("zwei"), Data::Float(80.0)],
            ],
        );
        let err = PriceTable::from_sheets(&fees, &contributions(), None, "x").unwrap_err();
        assert!(matches!(err, LoadError::InvalidCell { line: 3, ref column, .. } if column == "Kind_Nr"));

        let fees = Sheet::from_rows(
            FEES_SHEET,
            0,
            vec![
                vec![text("Kind_Nr"), text("Betrag")],
                vec![Data::Float(1.0), Data::Bool(true)],
            ],
        );
        let err = PriceTable::from_sheets(&fees, &contributions(), None, "x").unwrap_err();
        assert!(matches!(err, LoadError::InvalidCell { line: 2, ref column, .. } if column == "Betrag"));
    }

    #[test]
    fn missing_columns_are_fatal() {
        let fees = Sheet::from_rows(FEES_SHEET, 0, vec![vec![text("Nr"), text("Betrag")]]);
        let err = PriceTable::from_sheets(&fees, &contributions(), None, "x").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Kind_Nr"));
    }
}
