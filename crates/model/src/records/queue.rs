/// Envelope carried on the request and result channels.
///
/// `End` is the end-of-stream marker: no further items follow it on the
/// channel it was sent on.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem<T> {
    Item(T),
    End,
}

impl<T> QueueItem<T> {
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item(item) => Some(item),
            Self::End => None,
        }
    }
}

impl<T> From<T> for QueueItem<T> {
    fn from(item: T) -> Self {
        Self::Item(item)
    }
}
