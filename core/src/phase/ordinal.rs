use crate::prelude::{AnalysisError, AnalysisResult};

/// Selector that resolves to the chronologically last registered phase.
pub const LAST: &str = "last";

/// Positional phase name: 0th, 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, 21st.
pub fn ordinal(num: usize) -> String {
    let suffix = match (num % 10, num % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", num, suffix)
}

/// Parses a positional phase name back into its index.
pub fn parse_phase_name(name: &str) -> AnalysisResult<usize> {
    let invalid = || {
        AnalysisError::InvalidInput(format!(
            "phase name must be like 0th, 1st, 2nd... or last, but {} was applied",
            name
        ))
    };
    if name.len() < 3 || !name.is_ascii() {
        return Err(invalid());
    }
    let (digits, suffix) = name.split_at(name.len() - 2);
    let num: usize = digits.parse().map_err(|_| invalid())?;
    if ordinal(num) != format!("{}{}", digits, suffix) {
        return Err(invalid());
    }
    Ok(num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_follow_english_rules() {
        let names: Vec<String> = [0, 1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 101, 111].map(ordinal).to_vec();
        assert_eq!(
            names,
            ["0th", "1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "23rd", "101st", "111th"]
        );
    }

    #[test]
    fn parsing_rejects_malformed_names() {
        assert_eq!(parse_phase_name("0th").unwrap(), 0);
        assert_eq!(parse_phase_name("12th").unwrap(), 12);
        assert!(parse_phase_name("1th").is_err());
        assert!(parse_phase_name("first").is_err());
        assert!(parse_phase_name("st").is_err());
        assert!(parse_phase_name("07th").is_err());
    }
}
