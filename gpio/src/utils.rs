use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum TryGetSingleError {
    #[error("collection is empty")]
    Empty,
    #[error("collection has more than one item")]
    MoreThanOne,
}

pub trait CollectionExt {
    type Item;

    fn try_get_single(&self) -> Result<&Self::Item, TryGetSingleError>;
}

impl<T> CollectionExt for [T] {
    type Item = T;

    fn try_get_single(&self) -> Result<&T, TryGetSingleError> {
        match self {
            [] => Err(TryGetSingleError::Empty),
            [item] => Ok(item),
            _ => Err(TryGetSingleError::MoreThanOne),
        }
    }
}
