use std::marker::PhantomData;

pub struct IndexedIter<I, Ix> {
    inner: std::iter::Enumerate<I>,
    _marker: PhantomData<Ix>,
}

pub trait EnumerateIdx: Iterator + Sized {
    fn enumerate_idx<Ix: From<usize>>(self) -> IndexedIter<Self, Ix> {
        IndexedIter {
            inner: self.enumerate(),
            _marker: PhantomData,
        }
    }
}

impl<I: Iterator> EnumerateIdx for I {}

impl<I: Iterator, Ix: From<usize>> Iterator for IndexedIter<I, Ix> {
    type Item = (Ix, I::Item);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(i, item)| (Ix::from(i), item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
