use crate::fees::Fees;
use crate::roster::Household;
use anyhow::Result;
use chrono::NaiveDate;

/// Values a template can ask for, in the order they are substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    ParentName,
    ChildrenNames,
    Number,
    Date,
    SchoolYear,
    SchoolFee,
    Total,
    SchoolFeeWords,
    TotalWords,
    MembershipFee,
    MembershipFeeWords,
}

impl Placeholder {
    pub const ALL: [Placeholder; 11] = [
        Placeholder::ParentName,
        Placeholder::ChildrenNames,
        Placeholder::Number,
        Placeholder::Date,
        Placeholder::SchoolYear,
        Placeholder::SchoolFee,
        Placeholder::Total,
        Placeholder::SchoolFeeWords,
        Placeholder::TotalWords,
        Placeholder::MembershipFee,
        Placeholder::MembershipFeeWords,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::ParentName => "ELTERN_NAME",
            Placeholder::ChildrenNames => "KINDER_NAMEN",
            Placeholder::Number => "NR",
            Placeholder::Date => "DATUM",
            Placeholder::SchoolYear => "SCHULJAHR",
            Placeholder::SchoolFee => "BETRAG_GEBUEHR",
            Placeholder::Total => "GESAMTBETRAG",
            Placeholder::SchoolFeeWords => "BETRAG_GEBUEHR_WORT",
            Placeholder::TotalWords => "GESAMTBETRAG_WORT",
            Placeholder::MembershipFee => "BETRAG_MITGLIED",
            Placeholder::MembershipFeeWords => "BETRAG_MITGLIED_WORT",
        }
    }
}

/// Text around a token in the template, `{{` and `}}` by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            open: "{{".to_owned(),
            close: "}}".to_owned(),
        }
    }
}

impl Delimiters {
    pub fn wrap(&self, placeholder: Placeholder) -> String {
        format!("{}{}{}", self.open, placeholder.token(), self.close)
    }
}

#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    pub number: u32,
    pub household: &'a Household,
    pub fees: Fees,
    pub school_year: &'a str,
    pub date: NaiveDate,
}

impl Receipt<'_> {
    pub fn value(&self, placeholder: Placeholder) -> Result<String> {
        Ok(match placeholder {
            Placeholder::ParentName => self.household.key.display_name(),
            Placeholder::ChildrenNames => self.household.children_names(),
            Placeholder::Number => format!("{:03}", self.number),
            Placeholder::Date => self.date.format("%d.%m.%Y").to_string(),
            Placeholder::SchoolYear => self.school_year.to_owned(),
            Placeholder::SchoolFee => self.fees.school_fee.to_string(),
            Placeholder::Total => self.fees.total.to_string(),
            Placeholder::SchoolFeeWords => self.fees.school_fee.in_words()?,
            Placeholder::TotalWords => self.fees.total.in_words()?,
            Placeholder::MembershipFee => self.fees.membership_fee.to_string(),
            Placeholder::MembershipFeeWords => self.fees.membership_fee.in_words()?,
        })
    }

    /// Placeholder literal and its value for every placeholder, in substitution order.
    pub fn replacements(&self, delimiters: &Delimiters) -> Result<Vec<(String, String)>> {
        Placeholder::ALL
            .iter()
            .map(|&placeholder| Ok((delimiters.wrap(placeholder), self.value(placeholder)?)))
            .collect()
    }

    /// `Quittung_<household>_<number>.docx`
    pub fn file_name(&self) -> String {
        format!(
            "Quittung_{}_{:03}.docx",
            path_safe(self.household.key.file_id()),
            self.number
        )
    }
}

/// Replaces spaces and path separators so a name can be used as one path component.
/// `.` and `..` become `_`.
pub fn path_safe(name: &str) -> String {
    let safe: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    match safe.as_str() {
        "." | ".." => "_".to_owned(),
        _ => safe,
    }
}

#[cfg(test)]
mod receipt_tests {
    use super::*;
    use crate::money::Money;
    use crate::roster::HouseholdKey;

    fn household() -> Household {
        Household {
            key: HouseholdKey::Family {
                family_name: "von Berg".to_owned(),
                given_name: "Anna".to_owned(),
            },
            children: vec!["Ben".to_owned(), "Carla".to_owned()],
            status: None,
        }
    }

    fn fees() -> Fees {
        Fees {
            school_fee: Money::from(180),
            membership_fee: Money::from(20),
            total: Money::from(200),
        }
    }

    #[test]
    fn replacements_in_order() -> Result<()> {
        let household = household();
        let receipt = Receipt {
            number: 7,
            household: &household,
            fees: fees(),
            school_year: "2025/2026",
            date: NaiveDate::from_ymd_opt(2025, 9, 5).expect("valid date"),
        };
        let replacements = receipt.replacements(&Delimiters::default())?;
        let expected: Vec<(String, String)> = vec![
            ("{{ELTERN_NAME}}", "Anna von Berg"),
            ("{{KINDER_NAMEN}}", "Ben und Carla"),
            ("{{NR}}", "007"),
            ("{{DATUM}}", "05.09.2025"),
            ("{{SCHULJAHR}}", "2025/2026"),
            ("{{BETRAG_GEBUEHR}}", "180,00 EUR"),
            ("{{GESAMTBETRAG}}", "200,00 EUR"),
            ("{{BETRAG_GEBUEHR_WORT}}", "einhundertachtzig Euro"),
            ("{{GESAMTBETRAG_WORT}}", "zweihundert Euro"),
            ("{{BETRAG_MITGLIED}}", "20,00 EUR"),
            ("{{BETRAG_MITGLIED_WORT}}", "zwanzig Euro"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        assert_eq!(replacements, expected);
        Ok(())
    }

    #[test]
    fn custom_delimiters() {
        let delimiters = Delimiters {
            open: "[[".to_owned(),
            close: "]]".to_owned(),
        };
        assert_eq!(delimiters.wrap(Placeholder::Number), "[[NR]]");
    }

    #[test]
    fn file_name_is_path_safe() {
        let household = household();
        let receipt = Receipt {
            number: 12,
            household: &household,
            fees: fees(),
            school_year: "",
            date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
        };
        assert_eq!(receipt.file_name(), "Quittung_von_Berg_012.docx");
        assert_eq!(path_safe(" 1a/2b "), "1a_2b");
        assert_eq!(path_safe(".."), "_");
        assert_eq!(path_safe(" . "), "_");
        assert_eq!(path_safe("../x"), ".._x");
        assert_eq!(path_safe("Kl. 3"), "Kl._3");
    }
}
