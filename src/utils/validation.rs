use thiserror::Error;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title, description, category, and location are required")]
    MissingIssueFields,
    #[error("Invalid category. Must be one of: Electricity, Roads, Water, Waste, Safety")]
    InvalidCategory,
    #[error("Invalid status. Must be one of: Pending, In-Progress, Resolved")]
    InvalidStatus,
    #[error("Content, author name, and author type are required")]
    MissingCommentFields,
    #[error("Author type must be either \"admin\" or \"reporter\"")]
    InvalidAuthorType,
    #[error("viewerType must be either \"admin\" or \"reporter\"")]
    InvalidViewerType,
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Only image files are allowed")]
    NotAnImage,
    #[error("Photo must be 5 MB or smaller")]
    PhotoTooLarge,
    #[error("Photo uploads are not available")]
    PhotoUploadsDisabled,
    #[error("Malformed form data")]
    MalformedForm,
    #[error("Request body must be a JSON object with the expected fields")]
    MalformedJson,
    #[error("Invalid query parameters")]
    MalformedQuery,
    #[error("Issue id must be a positive integer")]
    InvalidIssueId,
}

/// Trims a submitted value; blank input counts as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn check_photo(content_type: &str, size: usize) -> Result<(), ValidationError> {
    if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(ValidationError::NotAnImage);
    }
    if size > MAX_PHOTO_BYTES {
        return Err(ValidationError::PhotoTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Pothole ".to_string())), Some("Pothole".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(Some(String::new())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_check_photo_content_type() {
        assert!(check_photo("image/png", 10).is_ok());
        assert!(check_photo("IMAGE/JPEG", 10).is_ok());
        assert_eq!(check_photo("application/pdf", 10), Err(ValidationError::NotAnImage));
        assert_eq!(check_photo("", 10), Err(ValidationError::NotAnImage));
    }

    #[test]
    fn test_check_photo_size_limit() {
        assert!(check_photo("image/png", MAX_PHOTO_BYTES).is_ok());
        assert_eq!(
            check_photo("image/png", MAX_PHOTO_BYTES + 1),
            Err(ValidationError::PhotoTooLarge)
        );
    }
}
