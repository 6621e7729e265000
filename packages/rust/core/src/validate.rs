//! Pre-run validation of a stage definition.

use std::fmt;

use url::Url;

use crate::metadata::StageMetadata;
use crate::schema::SPEAKER_COLUMN;

const MSG_ONE_INPUT: &str = "component should have exactly one input";
const MSG_ONE_OUTPUT: &str = "component should have exactly one output";
const MSG_ADDRESS_UNSET: &str = "website address should be set";
const MSG_ADDRESS_FORMAT: &str = "uri is not in correct format";
const MSG_SPEAKER_UNMAPPED: &str = "no speaker input column mapped";

/// Outcome of [`validate`].
///
/// `Corrupt` means the stage definition itself is damaged and has to be
/// redefined. `Broken` means a setting or mapping the user can fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    Valid,
    Corrupt(String),
    Broken(String),
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The message to surface, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Corrupt(msg) | Self::Broken(msg) => Some(msg),
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("OK"),
            Self::Corrupt(msg) => write!(f, "corrupt: {msg}"),
            Self::Broken(msg) => write!(f, "broken: {msg}"),
        }
    }
}

/// Parse a program address, returning `None` unless it is an absolute URI.
pub fn parse_source_address(address: &str) -> Option<Url> {
    Url::parse(address).ok()
}

/// Check the stage's preconditions, stopping at the first violation.
///
/// Checks run in a fixed order so a stage with several problems always
/// reports the same one: input count, output count, address presence,
/// address syntax, speaker mapping.
pub fn validate(meta: &StageMetadata) -> ValidationStatus {
    if meta.inputs.len() != 1 {
        return ValidationStatus::Corrupt(MSG_ONE_INPUT.into());
    }
    if meta.outputs.len() != 1 {
        return ValidationStatus::Corrupt(MSG_ONE_OUTPUT.into());
    }

    let address = &meta.config.source_address;
    if address.is_empty() {
        return ValidationStatus::Broken(MSG_ADDRESS_UNSET.into());
    }
    if parse_source_address(address).is_none() {
        return ValidationStatus::Broken(MSG_ADDRESS_FORMAT.into());
    }

    if meta.inputs[0].mapped_column(SPEAKER_COLUMN).is_none() {
        return ValidationStatus::Broken(MSG_SPEAKER_UNMAPPED.into());
    }

    ValidationStatus::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::define_schema;

    fn ready_stage() -> StageMetadata {
        let mut meta = StageMetadata::new("lookup");
        define_schema(&mut meta);
        meta.config.source_address = "https://conf.example.com/program".into();
        meta.map_input_column("Referent", SPEAKER_COLUMN).unwrap();
        meta
    }

    #[test]
    fn fully_configured_stage_is_valid() {
        let status = validate(&ready_stage());
        assert!(status.is_valid());
        assert_eq!(status.message(), None);
        assert_eq!(status.to_string(), "OK");
    }

    #[test]
    fn two_inputs_are_corrupt() {
        let mut meta = ready_stage();
        meta.add_input("Second");
        assert_eq!(
            validate(&meta),
            ValidationStatus::Corrupt("component should have exactly one input".into())
        );
    }

    #[test]
    fn missing_output_is_corrupt() {
        let mut meta = ready_stage();
        meta.outputs.clear();
        assert_eq!(
            validate(&meta),
            ValidationStatus::Corrupt("component should have exactly one output".into())
        );
    }

    #[test]
    fn empty_address_is_broken() {
        let mut meta = ready_stage();
        meta.config.source_address.clear();
        assert_eq!(
            validate(&meta),
            ValidationStatus::Broken("website address should be set".into())
        );
    }

    #[test]
    fn malformed_address_is_broken() {
        let mut meta = ready_stage();
        meta.config.source_address = "not a uri".into();
        assert_eq!(
            validate(&meta),
            ValidationStatus::Broken("uri is not in correct format".into())
        );
    }

    #[test]
    fn unmapped_speaker_is_broken() {
        let mut meta = ready_stage();
        meta.unmap_input_column(SPEAKER_COLUMN);
        assert_eq!(
            validate(&meta),
            ValidationStatus::Broken("no speaker input column mapped".into())
        );
    }

    #[test]
    fn first_violation_wins() {
        // Wrong input count, no address and no mapping at once.
        let mut meta = StageMetadata::new("lookup");
        meta.add_input("Second");
        let status = validate(&meta);
        assert_eq!(
            status.message(),
            Some("component should have exactly one input")
        );

        // Structure fine, but both address and mapping are missing.
        let mut meta = StageMetadata::new("lookup");
        define_schema(&mut meta);
        assert_eq!(
            validate(&meta).message(),
            Some("website address should be set")
        );

        // Bad address and no mapping: the address is reported.
        meta.config.source_address = "conf.example.com".into();
        assert_eq!(validate(&meta).message(), Some("uri is not in correct format"));
    }

    #[test]
    fn address_parser_accepts_absolute_uris_only() {
        assert!(parse_source_address("https://conf.example.com").is_some());
        assert!(parse_source_address("file:///tmp/program.html").is_some());
        assert!(parse_source_address("/relative/path").is_none());
        assert!(parse_source_address("").is_none());
    }
}
