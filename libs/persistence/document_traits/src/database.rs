use std::sync::Arc;

use crate::collection::DocumentCollection;

pub trait DocumentDatabase: Send + Sync {
    type Collection: DocumentCollection;

    fn collection(&self, name: &str) -> Self::Collection;
}

impl<T> DocumentDatabase for Arc<T>
where
    T: DocumentDatabase,
{
    type Collection = T::Collection;

    fn collection(&self, name: &str) -> Self::Collection {
        (**self).collection(name)
    }
}
