//! "Did you mean" ranking for unknown column names.

use crate::result::TableError;

/// Columns listed in full before the message switches to "and N more"
pub const MAX_LISTED_COLUMNS: usize = 10;

/// Suggestions offered at most
pub const MAX_SUGGESTIONS: usize = 3;

/// Edit distance between two strings (insert, delete, substitute)
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Available names closest to `wanted`, best first
#[must_use]
pub fn rank_suggestions(wanted: &str, available: &[String]) -> Vec<String> {
    let lowered = wanted.to_lowercase();
    let threshold = (wanted.chars().count() / 3).max(2);
    let mut scored: Vec<(usize, &String)> = available
        .iter()
        .filter_map(|name| {
            let candidate = name.to_lowercase();
            let distance = levenshtein(&lowered, &candidate);
            let related = distance <= threshold
                || (!lowered.is_empty() && (candidate.contains(&lowered) || lowered.contains(&candidate)));
            related.then_some((distance, name))
        })
        .collect();
    scored.sort_by_key(|(distance, _)| *distance);
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.clone())
        .collect()
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the resolution error for an unknown column
#[must_use]
pub fn column_not_found(column: &str, available: &[String]) -> TableError {
    let mut message = format!("Column \"{column}\" not found.");

    let suggestions = rank_suggestions(column, available);
    if !suggestions.is_empty() {
        message.push_str(&format!(" Did you mean: {}?", quoted(&suggestions)));
    }

    if available.len() > MAX_LISTED_COLUMNS {
        message.push_str(&format!(
            " Available columns: {} (and {} more).",
            quoted(&available[..MAX_LISTED_COLUMNS]),
            available.len() - MAX_LISTED_COLUMNS
        ));
    } else {
        message.push_str(&format!(" Available columns: {}.", quoted(available)));
    }

    if let Some(case_match) = available
        .iter()
        .find(|name| name.as_str() != column && name.eq_ignore_ascii_case(column))
    {
        message.push_str(&format!(
            " Column names are case-sensitive: use \"{case_match}\" instead of \"{column}\"."
        ));
    }

    TableError::ColumnNotFound {
        column: column.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("Name", "Name"), 0);
    }

    #[test]
    fn test_rank_orders_by_distance() {
        let available = names(&["Email", "Name", "Names List", "Role"]);
        let ranked = rank_suggestions("Nmae", &available);
        assert_eq!(ranked.first().map(String::as_str), Some("Name"));
        assert!(!ranked.contains(&"Email".to_string()));
    }

    #[test]
    fn test_message_lists_columns_and_suggestion() {
        let err = column_not_found("Emial", &names(&["Name", "Email"]));
        let message = err.to_string();
        assert!(message.starts_with("Column \"Emial\" not found."));
        assert!(message.contains("Did you mean: \"Email\"?"));
        assert!(message.contains("Available columns: \"Name\", \"Email\"."));
    }

    #[test]
    fn test_wide_table_truncates_list() {
        let available: Vec<String> = (0..14).map(|i| format!("Column {i}")).collect();
        let message = column_not_found("Missing", &available).to_string();
        assert!(message.contains("(and 4 more)"));
        assert!(!message.contains("\"Column 12\", "));
    }

    #[test]
    fn test_case_hint() {
        let message = column_not_found("email", &names(&["Name", "Email"])).to_string();
        assert!(message.contains("case-sensitive"));
        assert!(message.contains("use \"Email\""));
    }
}
