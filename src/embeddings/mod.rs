// Embeddings module
// Turns question text into a query vector comparable with the corpus matrix

use crate::Result;

/// Produces the query vector for a question.
///
/// Implementations must use the same model that produced the corpus embeddings,
/// otherwise distances are meaningless.
pub trait QueryEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

impl<T: QueryEncoder + ?Sized> QueryEncoder for std::sync::Arc<T> {
    #[inline]
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        (**self).encode(text)
    }
}
