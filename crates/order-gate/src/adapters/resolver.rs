//! Resolver for transactions that carry their own document id

use crate::domain::entities::Transaction;
use crate::domain::value_objects::DocumentId;
use crate::ports::outbound::DocumentIdResolver;

/// Reads [`Transaction::document_id`] directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedDocumentResolver;

impl<P> DocumentIdResolver<Transaction<P>> for EmbeddedDocumentResolver {
    fn document_id(&self, transaction: &Transaction<P>) -> Option<DocumentId> {
        transaction.document_id.clone()
    }
}
