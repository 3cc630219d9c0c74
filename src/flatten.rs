//! Sequence flattening
//!
//! Turns a lazy sequence of containers back into an element-at-a-time view,
//! so chunk-shaped data (byte runs from a reader, chunks out of the codec)
//! can feed stages that consume individual elements.

/// Iterator adapter flattening `Result<C, E>` items into `Result<C::Item, E>`
/// items, in container order.
///
/// `std::iter::Flatten` cannot be used here because the container sits inside
/// a `Result` and upstream errors have to pass through lazily. A partially
/// consumed container is resumed before the next one is requested; empty
/// containers are skipped transparently.
pub struct Flatten<I, C: IntoIterator> {
    upstream: I,
    current: Option<C::IntoIter>,
}

impl<I, C: IntoIterator> Flatten<I, C> {
    /// Create a flattener over `upstream`.
    pub fn new(upstream: I) -> Self {
        Self {
            upstream,
            current: None,
        }
    }
}

impl<I, C, E> Iterator for Flatten<I, C>
where
    I: Iterator<Item = Result<C, E>>,
    C: IntoIterator,
{
    type Item = Result<C::Item, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(iter) = &mut self.current {
                if let Some(item) = iter.next() {
                    return Some(Ok(item));
                }
                self.current = None;
            }
            match self.upstream.next()? {
                Ok(container) => self.current = Some(container.into_iter()),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattens_in_order() {
        let upstream = vec![Ok::<_, ()>(vec![1, 2]), Ok(vec![3]), Ok(vec![4, 5, 6])];
        let flat: Vec<i32> = Flatten::new(upstream.into_iter())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(flat, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_skips_empty_containers() {
        let upstream = vec![Ok::<_, ()>(vec![]), Ok(vec![7]), Ok(vec![]), Ok(vec![8])];
        let flat: Vec<i32> = Flatten::new(upstream.into_iter())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(flat, vec![7, 8]);
    }

    #[test]
    fn test_all_empty_yields_nothing() {
        let upstream: Vec<Result<Vec<i32>, ()>> = vec![Ok(vec![]), Ok(vec![])];
        let mut flat = Flatten::new(upstream.into_iter());
        assert!(flat.next().is_none());
    }

    #[test]
    fn test_resumes_partial_container_lazily() {
        // The second container must not be requested before the first is
        // exhausted.
        let pulled = std::cell::Cell::new(0usize);
        let upstream = (0..2).map(|i| {
            pulled.set(pulled.get() + 1);
            Ok::<_, ()>(vec![i * 10, i * 10 + 1])
        });
        let mut flat = Flatten::new(upstream);

        assert_eq!(flat.next(), Some(Ok(0)));
        assert_eq!(pulled.get(), 1);
        assert_eq!(flat.next(), Some(Ok(1)));
        assert_eq!(pulled.get(), 1);
        assert_eq!(flat.next(), Some(Ok(10)));
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_error_passes_through() {
        let upstream = vec![Ok(vec![1]), Err("io"), Ok(vec![2])];
        let mut flat = Flatten::new(upstream.into_iter());
        assert_eq!(flat.next(), Some(Ok(1)));
        assert_eq!(flat.next(), Some(Err("io")));
        assert_eq!(flat.next(), Some(Ok(2)));
    }
}
