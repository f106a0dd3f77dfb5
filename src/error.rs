use thiserror::Error;

use crate::dictionary::Language;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of a scanning pass.
///
/// Not finding a label is not an error; every pipeline stage reports that as `None`. What remains
/// is either a broken external recogniser or a dictionary that disagrees with the lexer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("keyword {spelling:?} matched the {language:?} vocabulary but has no classification")]
    UnclassifiedKeyword { spelling: String, language: Language },
    #[error("unit {spelling:?} matched the {language:?} unit table but has no classification")]
    UnclassifiedUnit { spelling: String, language: Language },
    #[error("text recognition failed: {0}")]
    Recognition(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn recognition(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Recognition(Box::new(error))
    }

    /// Whether the error points at a defect in this crate rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::UnclassifiedKeyword { .. } | Self::UnclassifiedUnit { .. }
        )
    }
}
