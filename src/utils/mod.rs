//! Input checks shared by the catalog request handlers.

use catalog_http::AppError;

/// Reject strings that are empty once surrounding whitespace is removed.
pub fn ensure_not_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_field(
            field,
            "blank",
            format!("{field} must not be blank"),
        ));
    }
    Ok(())
}

/// Reject zero, negative and non-finite amounts.
pub fn ensure_positive(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::invalid_field(
            field,
            "not_positive",
            format!("{field} must be greater than 0"),
        ));
    }
    Ok(())
}

/// Reject strings shorter than `min` characters.
pub fn ensure_min_chars(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.chars().count() < min {
        return Err(AppError::invalid_field(
            field,
            "too_short",
            format!("{field} must be at least {min} characters long"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_are_rejected() {
        assert!(ensure_not_blank("title", "Dune").is_ok());
        assert!(ensure_not_blank("title", "").is_err());
        assert!(ensure_not_blank("title", " \t\n").is_err());
    }

    #[test]
    fn prices_must_be_positive() {
        assert!(ensure_positive("price", 0.01).is_ok());
        assert!(ensure_positive("price", 0.0).is_err());
        assert!(ensure_positive("price", -5.0).is_err());
        assert!(ensure_positive("price", f64::NAN).is_err());
    }

    #[test]
    fn min_length_counts_characters() {
        assert!(ensure_min_chars("q", "py", 2).is_ok());
        assert!(ensure_min_chars("q", "p", 2).is_err());
        assert!(ensure_min_chars("q", "дб", 2).is_ok());
    }
}
