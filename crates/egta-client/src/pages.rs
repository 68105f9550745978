use crate::error::Result;

type FetchPage<T> = Box<dyn FnMut(u32) -> Result<Vec<T>> + Send>;

/// Lazily walks a paginated listing, one request per page, and stops at the
/// first empty page. A failed fetch is yielded once and ends the iteration.
pub struct Pages<T> {
    fetch: FetchPage<T>,
    next_page: u32,
    buffer: std::vec::IntoIter<T>,
    done: bool,
}

impl<T> Pages<T> {
    pub(crate) fn new(
        first_page: u32,
        fetch: impl FnMut(u32) -> Result<Vec<T>> + Send + 'static,
    ) -> Self {
        Self {
            fetch: Box::new(fetch),
            next_page: first_page,
            buffer: Vec::new().into_iter(),
            done: false,
        }
    }

    /// Page that the next fetch will request.
    pub fn next_page(&self) -> u32 {
        self.next_page
    }
}

impl<T> Iterator for Pages<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match (self.fetch)(self.next_page) {
                Ok(items) if items.is_empty() => {
                    self.done = true;
                    return None;
                }
                Ok(items) => {
                    self.next_page += 1;
                    self.buffer = items.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
