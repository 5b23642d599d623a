//! Category + step resolution from an upload's file name.

use std::sync::OnceLock;

use regex::Regex;

use crate::{domain::Category, errors::Error, Result};

/// Placeholder step for aviator files whose name carries no digits.
pub const AVIATOR_STEP_PLACEHOLDER: &str = "X";

const SPORT_PATTERN: &str = r"Linear_Retention_(\d)_Sport";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub step: String,
}

fn casino_step_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Linear_Retention_(\d+)").expect("valid regex"))
}

fn first_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

fn sport_step_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SPORT_PATTERN).expect("valid regex"))
}

/// Resolve the category (first of Casino, Aviator, Sport found in the name, case-sensitive)
/// and the step token that category uses.
pub fn classify(file_name: &str) -> Result<Classification> {
    let category = [Category::Casino, Category::Aviator, Category::Sport]
        .into_iter()
        .find(|c| file_name.contains(c.literal()))
        .ok_or_else(|| Error::Unclassified {
            file_name: file_name.to_string(),
        })?;

    let step = match category {
        Category::Casino => casino_step_re()
            .captures(file_name)
            .and_then(|c| c.get(1))
            .map_or_else(|| "1".to_string(), |m| m.as_str().to_string()),
        Category::Aviator => first_digits_re()
            .find(file_name)
            .map_or_else(
                || AVIATOR_STEP_PLACEHOLDER.to_string(),
                |m| m.as_str().to_string(),
            ),
        Category::Sport => sport_step_re()
            .captures(file_name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::NameMismatch {
                file_name: file_name.to_string(),
                expected: SPORT_PATTERN.to_string(),
            })?,
    };

    Ok(Classification { category, step })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(name: &str) -> (Category, String) {
        let c = classify(name).unwrap();
        (c.category, c.step)
    }

    #[test]
    fn sport_step_is_single_digit() {
        assert_eq!(
            ok("Linear_Retention_3_Sport.xlsx"),
            (Category::Sport, "3".to_string())
        );
    }

    #[test]
    fn sport_requires_its_pattern() {
        assert!(matches!(
            classify("Sport_export.xlsx"),
            Err(Error::NameMismatch { .. })
        ));
        // Two digits are not a valid sport step.
        assert!(matches!(
            classify("Linear_Retention_12_Sport.xlsx"),
            Err(Error::NameMismatch { .. })
        ));
    }

    #[test]
    fn unknown_names_are_unclassified() {
        assert!(matches!(
            classify("report.xlsx"),
            Err(Error::Unclassified { .. })
        ));
        // Matching is case-sensitive.
        assert!(matches!(
            classify("linear_retention_2_casino.xlsx"),
            Err(Error::Unclassified { .. })
        ));
    }

    #[test]
    fn casino_step_defaults_to_one() {
        assert_eq!(
            ok("tg_Linear_Retention_12_Casino.xlsx"),
            (Category::Casino, "12".to_string())
        );
        assert_eq!(ok("Casino_2024.xlsx"), (Category::Casino, "1".to_string()));
    }

    #[test]
    fn aviator_takes_first_digit_run() {
        assert_eq!(
            ok("Aviator_2024_Linear_Retention_4.xlsx"),
            (Category::Aviator, "2024".to_string())
        );
        assert_eq!(ok("Aviator.xlsx"), (Category::Aviator, "X".to_string()));
    }

    #[test]
    fn casino_wins_over_later_categories() {
        assert_eq!(
            ok("Linear_Retention_2_Casino_Aviator.xlsx"),
            (Category::Casino, "2".to_string())
        );
        assert_eq!(
            ok("Linear_Retention_5_Aviator_Sport.xlsx"),
            (Category::Aviator, "5".to_string())
        );
    }
}
