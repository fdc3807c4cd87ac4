use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cardinality {
    /// One entry per language is legitimate.
    MultiValued,
    /// Exactly one entry expected; extras are reported and dropped.
    ScalarExpected,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum AttributeCode {
    Title,
    Abstract,
    Description,
    Claim,
    Amendment,
    PdfLink,
    Other(String),
}

impl AttributeCode {
    pub const KNOWN: [AttributeCode; 6] = [
        AttributeCode::Title,
        AttributeCode::Abstract,
        AttributeCode::Claim,
        AttributeCode::Description,
        AttributeCode::PdfLink,
        AttributeCode::Amendment,
    ];

    pub fn parse(code: &str) -> Self {
        match code {
            "TITLE" => Self::Title,
            "ABSTR" => Self::Abstract,
            "DESCR" => Self::Description,
            "CLAIM" => Self::Claim,
            "AMEND" => Self::Amendment,
            "PDFEP" => Self::PdfLink,
            other => Self::Other(other.to_string()),
        }
    }

    /// Resolves an output field key back to its code under either naming
    /// convention.
    pub fn from_field_name(name: &str, normalize_names: bool) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|code| code.field_name(normalize_names) == name)
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Title => "TITLE",
            Self::Abstract => "ABSTR",
            Self::Description => "DESCR",
            Self::Claim => "CLAIM",
            Self::Amendment => "AMEND",
            Self::PdfLink => "PDFEP",
            Self::Other(code) => code,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Title | Self::Claim | Self::Amendment => Cardinality::MultiValued,
            Self::Abstract | Self::Description | Self::PdfLink | Self::Other(_) => {
                Cardinality::ScalarExpected
            }
        }
    }

    pub fn field_name(&self, normalize_names: bool) -> String {
        normalize_name(self.as_code(), normalize_names)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Title => "Title of the patent",
            Self::Abstract => "Abstract of the patent",
            Self::Description => "Description of the patent",
            Self::Claim => "Claims of the patent",
            Self::Amendment => "Amended claims of the patent",
            Self::PdfLink => "Url link to the pdf of the EP patent",
            Self::Other(_) => "Unclassified attribute",
        }
    }
}

impl fmt::Display for AttributeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Maps an attribute code to its storage field name. Every place that turns a
/// code into a key goes through here so records and schema descriptions agree.
pub fn normalize_name(name: &str, normalize_names: bool) -> String {
    if !normalize_names {
        return name.to_string();
    }

    match name {
        "ABSTR" => "abstract".to_string(),
        "DESCR" => "description".to_string(),
        "PDFEP" => "url".to_string(),
        "AMEND" => "amendment".to_string(),
        "CLAIM" => "claims".to_string(),
        other => other.to_lowercase(),
    }
}
