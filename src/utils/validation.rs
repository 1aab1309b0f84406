use crate::utils::error::{ConnectorError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ConnectorError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ConnectorError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ConnectorError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ConnectorError::MissingConfig {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConnectorError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ConnectorError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("opencti.url", "https://example.com").is_ok());
        assert!(validate_url("opencti.url", "http://localhost:8080").is_ok());
        assert!(validate_url("opencti.url", "").is_err());
        assert!(validate_url("opencti.url", "invalid-url").is_err());
        assert!(validate_url("opencti.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some("token".to_string());
        let absent: Option<String> = None;
        assert_eq!(
            validate_required_field("opencti.token", &present).unwrap(),
            "token"
        );
        assert!(matches!(
            validate_required_field("opencti.token", &absent),
            Err(ConnectorError::MissingConfig { .. })
        ));
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("vigilintel.interval_hours", 24, 1, 8760).is_ok());
        assert!(validate_range("vigilintel.interval_hours", 0, 1, 8760).is_err());
    }
}
