use super::attribute::AttributeCode;
use super::group::PatentBatch;
use super::row::PublicationNumber;

/// Index-aligned languages and texts gathered for one attribute code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedAttribute {
    pub code: AttributeCode,
    pub languages: Vec<String>,
    pub texts: Vec<String>,
}

impl AggregatedAttribute {
    fn new(code: AttributeCode) -> Self {
        Self {
            code,
            languages: Vec::new(),
            texts: Vec::new(),
        }
    }

    fn push(&mut self, language: String, text: String) {
        self.languages.push(language);
        self.texts.push(text);
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotedBatch {
    pub publication_number: PublicationNumber,
    pub publication_date: String,
    /// In order of first appearance within the batch.
    pub attributes: Vec<AggregatedAttribute>,
}

/// Groups a batch's rows by attribute code in one pass, keeping row order
/// inside each group. Publication number and date come from the first row.
pub fn pivot(batch: PatentBatch) -> PivotedBatch {
    let publication_number = batch.publication_number().clone();
    let publication_date = batch.publication_date().to_string();

    let mut attributes: Vec<AggregatedAttribute> = Vec::new();
    for row in batch.into_rows() {
        let code = AttributeCode::parse(&row.attribute_code);
        let position = match attributes.iter().position(|entry| entry.code == code) {
            Some(position) => position,
            None => {
                attributes.push(AggregatedAttribute::new(code));
                attributes.len() - 1
            }
        };
        attributes[position].push(row.language, row.text);
    }

    PivotedBatch {
        publication_number,
        publication_date,
        attributes,
    }
}
