cfg_if::cfg_if! {
    if #[cfg(feature = "no-std")] {
        use alloc::boxed::Box;
        use alloc::vec::Vec;
    } else {
        use std::boxed::Box;
        use std::vec::Vec;
    }
}

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use log::{debug, trace};

pub type LinkedListResult<T> = Result<T, LinkedListError>;

/// errors for positional operations that the list rejected. a rejected
/// operation never modifies the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedListError {
    /// `index` does not name a valid position in a list of length `len`
    IndexOutOfBounds { index: usize, len: usize },
    /// an output buffer of `provided` slots can't hold `required` elements
    BufferTooSmall { required: usize, provided: usize },
}

impl fmt::Display for LinkedListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LinkedListError::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds for list of length {}", index, len)
            }
            LinkedListError::BufferTooSmall { required, provided } => write!(
                f,
                "buffer of length {} is too small, {} slots required",
                provided, required
            ),
        }
    }
}

#[cfg(not(feature = "no-std"))]
impl std::error::Error for LinkedListError {}

/// an owning, singly-linked list with O(1) access to both ends.
///
/// the list owns its node chain and the `T` stored in each node, but never
/// looks inside a `T`. to keep element payloads owned elsewhere, store
/// references or shared pointers (`&X`, `Rc<X>`) as `T`.
pub struct LinkedList<T> {
    /// first node of the chain, or None if the list is empty
    head: Link<T>,
    /// last node of the chain, or None if the list is empty. its `next` is
    /// always None.
    tail: Link<T>,
    /// the number of nodes reachable from `head`
    len: usize,
    _owns: PhantomData<Box<LinkedListNode<T>>>,
}

type Link<T> = Option<NonNull<LinkedListNode<T>>>;

struct LinkedListNode<T> {
    data: T,
    next: Link<T>,
}

impl<T> LinkedListNode<T> {
    /// heap allocate a node, handing ownership of the allocation to the caller
    fn alloc(data: T, next: Link<T>) -> NonNull<LinkedListNode<T>> {
        NonNull::from(Box::leak(Box::new(Self { data, next })))
    }

    /// release a node previously created by `alloc`, returning its data
    /// # Safety
    /// `node` must come from `alloc`, must not be freed already, and must no
    /// longer be reachable from any list
    unsafe fn free(node: NonNull<LinkedListNode<T>>) -> T {
        Box::from_raw(node.as_ptr()).data
    }
}

impl<T> LinkedList<T> {
    /// create a new, empty LinkedList
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            _owns: PhantomData,
        }
    }

    /// get the number of elements in the list
    pub fn len(&self) -> usize {
        self.len
    }

    /// returns true if the length of the list is 0
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// get the first element of the list, or None if the list is empty
    pub fn first(&self) -> Option<&T> {
        // SAFETY: head always points at a live node owned by us
        self.head.map(|n| unsafe { &(*n.as_ptr()).data })
    }

    pub fn first_mut(&mut self) -> Option<&mut T> {
        // SAFETY: head always points at a live node owned by us
        self.head.map(|n| unsafe { &mut (*n.as_ptr()).data })
    }

    /// get the last element of the list, or None if the list is empty
    pub fn last(&self) -> Option<&T> {
        // SAFETY: tail always points at a live node owned by us
        self.tail.map(|n| unsafe { &(*n.as_ptr()).data })
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        // SAFETY: tail always points at a live node owned by us
        self.tail.map(|n| unsafe { &mut (*n.as_ptr()).data })
    }

    /// get the element at `index`, or None if `index >= len`. walks the
    /// chain from the head.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: index was bounds checked above
        unsafe { Some(&(*self.node_at(index).as_ptr()).data) }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: index was bounds checked above
        unsafe { Some(&mut (*self.node_at(index).as_ptr()).data) }
    }

    /// find the position of the first element for which
    /// `eq(element, candidate)` holds, scanning from the head
    pub fn find<F>(&self, element: &T, mut eq: F) -> Option<usize>
    where
        F: FnMut(&T, &T) -> bool,
    {
        self.iter().position(|candidate| eq(element, candidate))
    }

    /// count the elements for which `eq(element, candidate)` holds
    pub fn count_all<F>(&self, element: &T, mut eq: F) -> usize
    where
        F: FnMut(&T, &T) -> bool,
    {
        self.iter().filter(|candidate| eq(element, *candidate)).count()
    }

    /// push an element to the front of the list
    pub fn insert_first(&mut self, data: T) {
        let node = LinkedListNode::alloc(data, self.head);
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.len += 1;
    }

    /// push an element to the back of the list
    pub fn insert_last(&mut self, data: T) {
        let node = LinkedListNode::alloc(data, None);
        match self.tail {
            None => self.head = Some(node),
            // SAFETY: tail always points at a live node owned by us
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
        }
        self.tail = Some(node);
        self.len += 1;
    }

    /// insert an element so that it ends up at `index`, shifting everything
    /// from `index` onward back by one. valid indexes are `0..=len`; `0`
    /// behaves like `insert_first` and `len` like `insert_last`.
    pub fn insert(&mut self, index: usize, data: T) -> LinkedListResult<()> {
        if index > self.len {
            debug!("rejected insert at {} into list of length {}", index, self.len);
            return Err(LinkedListError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        if index == 0 {
            self.insert_first(data);
        } else if index == self.len {
            self.insert_last(data);
        } else {
            // SAFETY: 0 < index < len, so index - 1 names an interior node
            unsafe {
                let prev = self.node_at(index - 1).as_ptr();
                let node = LinkedListNode::alloc(data, (*prev).next);
                (*prev).next = Some(node);
            }
            self.len += 1;
        }

        Ok(())
    }

    /// pop the element at the front of the list, or None if the list is empty
    pub fn remove_first(&mut self) -> Option<T> {
        let head = self.head?;
        // SAFETY: head is a live node with no predecessor
        unsafe { Some(self.unlink(None, head)) }
    }

    /// pop the element at the back of the list, or None if the list is empty.
    /// with no backward links this walks the chain to find the new tail.
    pub fn remove_last(&mut self) -> Option<T> {
        match self.len {
            0 => None,
            1 => self.remove_first(),
            len => {
                let tail = self.tail?;
                // SAFETY: len >= 2 so len - 2 names the node before the tail
                unsafe {
                    let prev = self.node_at(len - 2);
                    Some(self.unlink(Some(prev), tail))
                }
            }
        }
    }

    /// remove and return the element at `index`. valid indexes are `0..len`.
    pub fn remove(&mut self, index: usize) -> LinkedListResult<T> {
        let out_of_bounds = LinkedListError::IndexOutOfBounds {
            index,
            len: self.len,
        };
        if index >= self.len {
            debug!("rejected remove at {} from list of length {}", index, self.len);
            return Err(out_of_bounds);
        }

        // SAFETY: index was bounds checked above, so the node exists and
        // prev is either None (index 0) or its direct predecessor
        unsafe {
            let prev = if index == 0 {
                None
            } else {
                Some(self.node_at(index - 1))
            };
            let node = match prev {
                None => self.head,
                Some(prev) => (*prev.as_ptr()).next,
            };
            let node = node.ok_or(out_of_bounds)?;
            Ok(self.unlink(prev, node))
        }
    }

    /// remove every element for which `eq(element, candidate)` holds in a
    /// single pass, returning how many were removed
    pub fn remove_all<F>(&mut self, element: &T, eq: F) -> usize
    where
        F: FnMut(&T, &T) -> bool,
    {
        self.remove_all_with(element, eq, drop)
    }

    /// like `remove_all`, handing each removed element to `free` instead of
    /// dropping it
    pub fn remove_all_with<F, D>(&mut self, element: &T, mut eq: F, mut free: D) -> usize
    where
        F: FnMut(&T, &T) -> bool,
        D: FnMut(T),
    {
        let mut removed = 0;
        let mut prev: Link<T> = None;
        let mut curr = self.head;

        while let Some(node) = curr {
            // SAFETY: node is a live node of this list and prev is either None
            // (node is the head) or node's predecessor
            unsafe {
                let next = (*node.as_ptr()).next;
                if eq(element, &(*node.as_ptr()).data) {
                    free(self.unlink(prev, node));
                    removed += 1;
                } else {
                    prev = Some(node);
                }
                curr = next;
            }
        }

        trace!("remove_all removed {} elements, {} remain", removed, self.len);
        removed
    }

    /// keep the first element for which `eq(element, candidate)` holds and
    /// remove every later one, in a single pass.
    ///
    /// returns the number of elements removed, or None if no element matched
    /// at all. a single match yields `Some(0)`.
    pub fn remove_duplicates<F>(&mut self, element: &T, eq: F) -> Option<usize>
    where
        F: FnMut(&T, &T) -> bool,
    {
        self.remove_duplicates_with(element, eq, drop)
    }

    /// like `remove_duplicates`, handing each removed element to `free`
    /// instead of dropping it
    pub fn remove_duplicates_with<F, D>(
        &mut self,
        element: &T,
        mut eq: F,
        mut free: D,
    ) -> Option<usize>
    where
        F: FnMut(&T, &T) -> bool,
        D: FnMut(T),
    {
        let mut occurrences = 0;
        let mut prev: Link<T> = None;
        let mut curr = self.head;

        while let Some(node) = curr {
            // SAFETY: node is a live node of this list and prev is either None
            // (node is the head) or node's predecessor. the first match is
            // never unlinked, so prev is Some whenever we unlink.
            unsafe {
                let next = (*node.as_ptr()).next;
                if eq(element, &(*node.as_ptr()).data) {
                    occurrences += 1;
                    if occurrences > 1 {
                        free(self.unlink(prev, node));
                    } else {
                        prev = Some(node);
                    }
                } else {
                    prev = Some(node);
                }
                curr = next;
            }
        }

        if occurrences == 0 {
            return None;
        }
        trace!(
            "remove_duplicates removed {} elements, {} remain",
            occurrences - 1,
            self.len
        );
        Some(occurrences - 1)
    }

    /// drop every element, leaving the list empty but usable
    pub fn clear(&mut self) {
        self.clear_with(drop)
    }

    /// remove every element front to back, handing each to `free`, leaving
    /// the list empty but usable
    pub fn clear_with<D>(&mut self, mut free: D)
    where
        D: FnMut(T),
    {
        let released = self.len;
        while let Some(data) = self.remove_first() {
            free(data);
        }
        if released > 0 {
            trace!("released {} nodes", released);
        }
    }

    /// tear the list down, handing each element to `free` in list order
    pub fn destroy_with<D>(mut self, free: D)
    where
        D: FnMut(T),
    {
        self.clear_with(free);
    }

    /// build a new list holding `f(element)` for every element, in order
    pub fn map<U, F>(&self, f: F) -> LinkedList<U>
    where
        F: FnMut(&T) -> U,
    {
        let mapped: LinkedList<U> = self.iter().map(f).collect();
        trace!("map produced {} elements", mapped.len());
        mapped
    }

    /// invoke `f` on every element in list order
    pub fn print<F>(&self, f: F)
    where
        F: FnMut(&T),
    {
        self.iter().for_each(f);
    }

    /// return an immutable iterator for this list
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            _ll: self,
            curr: self.head,
            remaining: self.len,
        }
    }

    /// return a mutable iterator for this list
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            _ll: PhantomData,
            curr: self.head,
            remaining: self.len,
        }
    }

    /// walk `index` links from the head
    /// # Safety
    /// `index` must be less than `self.len`
    unsafe fn node_at(&self, index: usize) -> NonNull<LinkedListNode<T>> {
        debug_assert!(index < self.len);
        let mut node = self.head.unwrap_unchecked();
        for _ in 0..index {
            node = (*node.as_ptr()).next.unwrap_unchecked();
        }
        node
    }

    /// detach `node` from the chain, patching head and tail as needed, free
    /// it and return its data
    /// # Safety
    /// `node` must be a live node of this list and `prev` must be its direct
    /// predecessor, or None if `node` is the head
    unsafe fn unlink(&mut self, prev: Link<T>, node: NonNull<LinkedListNode<T>>) -> T {
        let next = (*node.as_ptr()).next;
        match prev {
            None => self.head = next,
            Some(prev) => (*prev.as_ptr()).next = next,
        }
        if self.tail == Some(node) {
            self.tail = prev;
        }
        self.len -= 1;
        LinkedListNode::free(node)
    }

    /// walk the chain and assert the structural invariants hold
    #[cfg(test)]
    fn check_invariants(&self) {
        if self.len == 0 {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            return;
        }
        if self.len == 1 {
            assert_eq!(self.head, self.tail);
        }

        let mut reachable = 0;
        let mut last = None;
        let mut curr = self.head;
        while let Some(node) = curr {
            reachable += 1;
            last = Some(node);
            assert!(reachable <= self.len, "chain is longer than len");
            curr = unsafe { (*node.as_ptr()).next };
        }
        assert_eq!(reachable, self.len);
        assert_eq!(last, self.tail);
    }
}

impl<T: PartialEq> LinkedList<T> {
    /// returns true if some element equals `element`
    pub fn contains(&self, element: &T) -> bool {
        self.iter().any(|candidate| candidate == element)
    }

    /// `find` using `PartialEq`
    pub fn find_eq(&self, element: &T) -> Option<usize> {
        self.find(element, |a, b| a == b)
    }

    /// `count_all` using `PartialEq`
    pub fn count_eq(&self, element: &T) -> usize {
        self.count_all(element, |a, b| a == b)
    }
}

impl<T: Clone> LinkedList<T> {
    /// build a new list holding the elements of `first` followed by the
    /// elements of `second`. both inputs are left untouched and share no
    /// nodes with the result.
    pub fn join(first: &Self, second: &Self) -> Self {
        let joined: Self = first.iter().chain(second.iter()).cloned().collect();
        trace!(
            "joined lists of length {} and {}",
            first.len(),
            second.len()
        );
        joined
    }

    /// copy the elements, in order, into the front of `out`
    pub fn to_array(&self, out: &mut [T]) -> LinkedListResult<()> {
        if out.len() < self.len {
            debug!(
                "rejected to_array into buffer of length {} from list of length {}",
                out.len(),
                self.len
            );
            return Err(LinkedListError::BufferTooSmall {
                required: self.len,
                provided: out.len(),
            });
        }
        for (slot, data) in out.iter_mut().zip(self.iter()) {
            *slot = data.clone();
        }
        Ok(())
    }

    /// collect the elements, in order, into a Vec
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// build a new list from the elements at positions `start..=end`. both
    /// indexes must name existing positions; `start > end` yields an empty
    /// list.
    pub fn sublist_between(&self, start: usize, end: usize) -> LinkedListResult<Self> {
        for index in [start, end] {
            if index >= self.len {
                debug!(
                    "rejected sublist {}..={} of list of length {}",
                    start, end, self.len
                );
                return Err(LinkedListError::IndexOutOfBounds {
                    index,
                    len: self.len,
                });
            }
        }

        let sublist: Self = self
            .iter()
            .skip(start)
            .take((end + 1).saturating_sub(start))
            .cloned()
            .collect();
        trace!("sublist {}..={} has {} elements", start, end, sublist.len());
        Ok(sublist)
    }

    /// build a new list from the elements at the given positions, in list
    /// order rather than the order of `indexes`. out of range indexes are
    /// ignored and repeated indexes select their element once.
    pub fn sublist(&self, indexes: &[usize]) -> Self {
        let mut selected: Vec<bool> = core::iter::repeat(false).take(self.len).collect();
        let mut wanted = 0;
        for &index in indexes {
            if index < self.len && !selected[index] {
                selected[index] = true;
                wanted += 1;
            }
        }

        let sublist: Self = self
            .iter()
            .zip(selected)
            .filter_map(|(data, keep)| keep.then(|| data.clone()))
            .take(wanted)
            .collect();
        trace!(
            "sublist of {} indexes has {} elements",
            indexes.len(),
            sublist.len()
        );
        sublist
    }

    /// build a new list holding, in order, the elements that satisfy `pred`
    pub fn filter<P>(&self, mut pred: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let filtered: Self = self.iter().filter(|data| pred(*data)).cloned().collect();
        trace!(
            "filter kept {} of {} elements",
            filtered.len(),
            self.len
        );
        filtered
    }
}

impl<T> Drop for LinkedList<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for LinkedList<T> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> PartialEq for LinkedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for LinkedList<T> {}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for LinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T> Extend<T> for LinkedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for data in iter {
            self.insert_last(data);
        }
    }
}

impl<T> IntoIterator for LinkedList<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut LinkedList<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// SAFETY: the list exclusively owns its nodes, so it is exactly as thread
// safe as the `T`s it holds
unsafe impl<T: Send> Send for LinkedList<T> {}
unsafe impl<T: Sync> Sync for LinkedList<T> {}

/// an independent forward iterator over a list. any number may be live at
/// once; each one walks the list a single time.
pub struct Iter<'a, T> {
    _ll: &'a LinkedList<T>,
    curr: Link<T>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    /// returns true if `next` will produce another element
    pub fn has_next(&self) -> bool {
        self.curr.is_some()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.curr?;

        // SAFETY: the shared borrow of the list keeps every node alive for 'a
        unsafe {
            let node = &*node.as_ptr();
            self.curr = node.next;
            self.remaining -= 1;
            Some(&node.data)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            _ll: self._ll,
            curr: self.curr,
            remaining: self.remaining,
        }
    }
}

unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

pub struct IterMut<'a, T> {
    _ll: PhantomData<&'a mut LinkedList<T>>,
    curr: Link<T>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.curr?;

        // SAFETY: the exclusive borrow of the list keeps every node alive for
        // 'a and each node is yielded at most once
        unsafe {
            let node = &mut *node.as_ptr();
            self.curr = node.next;
            self.remaining -= 1;
            Some(&mut node.data)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

unsafe impl<T: Send> Send for IterMut<'_, T> {}
unsafe impl<T: Sync> Sync for IterMut<'_, T> {}

/// an owning iterator that drains the list front to back
pub struct IntoIter<T>(LinkedList<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.remove_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len(), Some(self.0.len()))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

#[cfg(all(not(feature = "no-std"), test))]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn same<T>(a: &&T, b: &&T) -> bool {
        core::ptr::eq(*a, *b)
    }

    fn list_of(values: &[u32]) -> LinkedList<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn linked_lists_are_sendable() {
        fn send<S: Send>(_: S) {}
        send(LinkedList::<u32>::new());
    }

    #[test]
    fn new_list_is_empty() {
        let ll = LinkedList::<u32>::new();
        assert!(ll.is_empty());
        assert_eq!(ll.len(), 0);
        ll.check_invariants();
    }

    #[test]
    fn queries_on_empty_list_return_none() {
        let mut ll = LinkedList::<u32>::new();
        assert!(ll.first().is_none());
        assert!(ll.last().is_none());
        assert!(ll.get(0).is_none());
        assert!(ll.remove_first().is_none());
        assert!(ll.remove_last().is_none());
        assert_eq!(
            ll.remove(0),
            Err(LinkedListError::IndexOutOfBounds { index: 0, len: 0 })
        );
        ll.check_invariants();
    }

    #[test]
    fn basic_lifecycle() {
        let items = ['a', 'b', 'c'];
        let (a, b, c) = (&items[0], &items[1], &items[2]);
        let mut ll = LinkedList::new();
        assert!(ll.is_empty());

        ll.insert_last(a);
        ll.insert_last(b);
        ll.insert_last(c);

        assert_eq!(ll.len(), 3);
        assert!(core::ptr::eq(*ll.first().expect("first should be some"), a));
        assert!(core::ptr::eq(*ll.last().expect("last should be some"), c));
        assert!(core::ptr::eq(*ll.get(1).expect("get(1) should be some"), b));
        ll.check_invariants();
    }

    #[test]
    fn insert_first_sets_head_and_tail_on_empty_list() {
        let mut ll = LinkedList::new();
        ll.insert_first(73);
        assert_eq!(ll.first(), Some(&73));
        assert_eq!(ll.last(), Some(&73));
        ll.insert_first(42);
        assert_eq!(ll.first(), Some(&42));
        assert_eq!(ll.last(), Some(&73));
        ll.check_invariants();
    }

    #[test]
    fn insert_last_preserves_insertion_order() {
        let ll = list_of(&[1, 2, 3, 4, 5]);
        assert_eq!(ll.to_vec(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn insert_at_every_position() {
        let mut ll = list_of(&[1, 3]);
        ll.insert(1, 2).expect("insert in the middle failed");
        ll.insert(0, 0).expect("insert at the front failed");
        ll.insert(4, 4).expect("insert at the back failed");
        assert_eq!(ll.to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(ll.last(), Some(&4));
        ll.check_invariants();
    }

    #[test]
    fn insert_past_len_is_rejected() {
        let mut ll = list_of(&[1, 2]);
        let res = ll.insert(3, 9);
        assert_eq!(
            res,
            Err(LinkedListError::IndexOutOfBounds { index: 3, len: 2 })
        );
        assert_eq!(ll.to_vec(), vec![1, 2]);
    }

    #[test]
    fn get_out_of_range_returns_none() {
        let ll = list_of(&[1, 2, 3]);
        assert!(ll.get(3).is_none());
        assert!(ll.get(usize::MAX).is_none());
        assert_eq!(ll.len(), 3);
    }

    #[test]
    fn get_mut_updates_element() {
        let mut ll = list_of(&[1, 2, 3]);
        *ll.get_mut(1).expect("get_mut(1) should be some") = 20;
        *ll.first_mut().expect("first_mut should be some") += 10;
        *ll.last_mut().expect("last_mut should be some") += 30;
        assert_eq!(ll.to_vec(), vec![11, 20, 33]);
    }

    #[test]
    fn remove_first_clears_tail_when_emptied() {
        let mut ll = list_of(&[7]);
        assert_eq!(ll.remove_first(), Some(7));
        assert!(ll.last().is_none());
        ll.check_invariants();
        ll.insert_last(8);
        assert_eq!(ll.first(), Some(&8));
        ll.check_invariants();
    }

    #[test]
    fn remove_last_moves_tail_back() {
        let mut ll = list_of(&[1, 2, 3]);
        assert_eq!(ll.remove_last(), Some(3));
        assert_eq!(ll.last(), Some(&2));
        ll.insert_last(4);
        assert_eq!(ll.to_vec(), vec![1, 2, 4]);
        ll.check_invariants();
    }

    #[test]
    fn remove_at_every_position() {
        let mut ll = list_of(&[0, 1, 2, 3, 4]);
        assert_eq!(ll.remove(2), Ok(2));
        assert_eq!(ll.remove(0), Ok(0));
        assert_eq!(ll.remove(2), Ok(4));
        assert_eq!(ll.to_vec(), vec![1, 3]);
        assert_eq!(ll.last(), Some(&3));
        ll.check_invariants();
    }

    #[test]
    fn remove_at_len_is_rejected() {
        let mut ll = list_of(&[1, 2, 3]);
        assert_eq!(
            ll.remove(3),
            Err(LinkedListError::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(ll.len(), 3);
    }

    #[test]
    fn find_returns_first_match() {
        let ll = list_of(&[5, 6, 5, 7]);
        assert_eq!(ll.find(&5, |a, b| a == b), Some(0));
        assert_eq!(ll.find(&7, |a, b| a == b), Some(3));
        assert_eq!(ll.find(&9, |a, b| a == b), None);
        assert_eq!(ll.find_eq(&6), Some(1));
        assert!(ll.contains(&7));
        assert!(!ll.contains(&8));
    }

    #[test]
    fn find_passes_element_before_candidate() {
        let ll = list_of(&[1, 2, 3]);
        // only true when the searched element is the smaller argument
        assert_eq!(ll.find(&2, |element, candidate| element < candidate), Some(2));
    }

    #[test]
    fn removals_pass_element_before_candidate() {
        let mut ll = list_of(&[1, 2, 3]);
        let mut calls = vec![];
        ll.remove_all(&2, |element, candidate| {
            calls.push((*element, *candidate));
            false
        });
        assert_eq!(calls, vec![(2, 1), (2, 2), (2, 3)]);

        calls.clear();
        ll.remove_duplicates(&2, |element, candidate| {
            calls.push((*element, *candidate));
            false
        });
        assert_eq!(calls, vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn count_all_counts_every_match() {
        let ll = list_of(&[1, 2, 1, 1, 3]);
        assert_eq!(ll.count_all(&1, |a, b| a == b), 3);
        assert_eq!(ll.count_eq(&4), 0);
    }

    #[test]
    fn remove_all_by_reference() {
        init_logging();
        let items = ['x', 'y', 'z'];
        let (x, y, z) = (&items[0], &items[1], &items[2]);
        let mut ll: LinkedList<&char> = [x, y, x, z, x].into_iter().collect();

        assert_eq!(ll.remove_all(&x, same), 3);

        assert_eq!(ll.len(), 2);
        assert!(core::ptr::eq(*ll.first().expect("first should be some"), y));
        assert!(core::ptr::eq(*ll.last().expect("last should be some"), z));
        ll.check_invariants();
    }

    #[test]
    fn remove_all_can_empty_the_list() {
        let mut ll = list_of(&[4, 4, 4]);
        assert_eq!(ll.remove_all(&4, |a, b| a == b), 3);
        assert!(ll.is_empty());
        ll.check_invariants();
        ll.insert_last(5);
        assert_eq!(ll.to_vec(), vec![5]);
    }

    #[test]
    fn remove_all_hands_removed_elements_to_free() {
        let mut ll: LinkedList<String> = ["a", "b", "a"].iter().map(|s| String::from(*s)).collect();
        let mut freed = vec![];
        let removed = ll.remove_all_with(&String::from("a"), |a, b| a == b, |s| freed.push(s));
        assert_eq!(removed, 2);
        assert_eq!(freed, vec![String::from("a"), String::from("a")]);
        assert_eq!(ll.to_vec(), vec![String::from("b")]);
    }

    #[test]
    fn remove_duplicates_keeps_first_match() {
        init_logging();
        let items = ['x', 'y', 'z'];
        let (x, y, z) = (&items[0], &items[1], &items[2]);
        let mut ll: LinkedList<&char> = [y, x, z, x, x].into_iter().collect();

        assert_eq!(ll.remove_duplicates(&x, same), Some(2));

        let remaining: Vec<&char> = ll.iter().copied().collect();
        assert_eq!(remaining.len(), 3);
        assert!(core::ptr::eq(remaining[0], y));
        assert!(core::ptr::eq(remaining[1], x));
        assert!(core::ptr::eq(remaining[2], z));
        ll.check_invariants();
    }

    #[test]
    fn remove_duplicates_updates_tail() {
        let mut ll = list_of(&[1, 2, 1]);
        assert_eq!(ll.remove_duplicates(&1, |a, b| a == b), Some(1));
        assert_eq!(ll.last(), Some(&2));
        ll.insert_last(3);
        assert_eq!(ll.to_vec(), vec![1, 2, 3]);
        ll.check_invariants();
    }

    #[test]
    fn remove_duplicates_reports_single_and_missing_matches() {
        let mut ll = list_of(&[1, 2, 3]);
        assert_eq!(ll.remove_duplicates(&2, |a, b| a == b), Some(0));
        assert_eq!(ll.remove_duplicates(&9, |a, b| a == b), None);
        assert_eq!(ll.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn remove_duplicates_hands_removed_elements_to_free() {
        let mut ll = list_of(&[3, 3, 3]);
        let mut freed = 0;
        let removed = ll.remove_duplicates_with(&3, |a, b| a == b, |_| freed += 1);
        assert_eq!(removed, Some(2));
        assert_eq!(freed, 2);
        assert_eq!(ll.to_vec(), vec![3]);
    }

    #[test]
    fn clear_with_visits_elements_in_order() {
        let mut ll = list_of(&[1, 2, 3]);
        let mut seen = vec![];
        ll.clear_with(|e| seen.push(e));
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(ll.is_empty());
        ll.check_invariants();

        ll.insert_last(4);
        assert_eq!(ll.to_vec(), vec![4]);
    }

    #[test]
    fn destroy_with_visits_every_element() {
        let ll = list_of(&[1, 2, 3]);
        let mut seen = vec![];
        ll.destroy_with(|e| seen.push(e));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn drop_releases_every_element() {
        let shared = Rc::new(());
        let ll: LinkedList<Rc<()>> = (0..4).map(|_| Rc::clone(&shared)).collect();
        assert_eq!(Rc::strong_count(&shared), 5);
        drop(ll);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    fn join_leaves_inputs_untouched() {
        init_logging();
        let first = list_of(&[1, 2]);
        let second = list_of(&[3, 4]);

        let joined = LinkedList::join(&first, &second);

        assert_eq!(joined.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(first.to_vec(), vec![1, 2]);
        assert_eq!(second.to_vec(), vec![3, 4]);
        joined.check_invariants();
    }

    #[test]
    fn join_with_empty_lists() {
        let empty = LinkedList::<u32>::new();
        let some = list_of(&[1]);
        assert_eq!(LinkedList::join(&empty, &empty).len(), 0);
        assert_eq!(LinkedList::join(&empty, &some).to_vec(), vec![1]);
        assert_eq!(LinkedList::join(&some, &empty).to_vec(), vec![1]);
    }

    #[test]
    fn join_shares_elements_not_nodes() {
        let payload = Rc::new(RefCell::new(0));
        let mut first = LinkedList::new();
        first.insert_last(Rc::clone(&payload));
        let second = LinkedList::new();

        let mut joined = LinkedList::join(&first, &second);
        assert_eq!(Rc::strong_count(&payload), 3);

        *joined.first().expect("joined should not be empty").borrow_mut() = 42;
        assert_eq!(*first.first().expect("first should not be empty").borrow(), 42);

        joined.remove_first();
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn join_lists_borrowing_for_different_lifetimes() {
        let statics: LinkedList<&'static str> = ["one", "two"].into_iter().collect();
        let local = String::from("three");
        let mut borrowed: LinkedList<&str> = LinkedList::new();
        borrowed.insert_last(local.as_str());

        let joined = LinkedList::join(&statics, &borrowed);

        assert_eq!(joined.to_vec(), vec!["one", "two", "three"]);
        assert_eq!(statics.len(), 2);
    }

    #[test]
    fn lists_of_references_shorten_their_lifetime() {
        fn shorten<'a>(ll: LinkedList<&'static str>) -> LinkedList<&'a str> {
            ll
        }
        fn shorten_iter<'i, 'a>(iter: Iter<'i, &'static str>) -> Iter<'i, &'a str> {
            iter
        }

        let local = String::from("local");
        let mut ll = shorten(["static"].into_iter().collect());
        ll.insert_last(local.as_str());
        assert_eq!(ll.to_vec(), vec!["static", "local"]);

        let statics: LinkedList<&'static str> = ["a", "b"].into_iter().collect();
        assert_eq!(shorten_iter(statics.iter()).count(), 2);
    }

    #[test]
    fn to_array_fills_buffer_in_order() {
        let ll = list_of(&[1, 2, 3]);
        let mut out = [0; 5];
        ll.to_array(&mut out).expect("buffer is large enough");
        assert_eq!(out, [1, 2, 3, 0, 0]);
    }

    #[test]
    fn to_array_rejects_short_buffer() {
        let ll = list_of(&[1, 2, 3]);
        let mut out = [0; 2];
        assert_eq!(
            ll.to_array(&mut out),
            Err(LinkedListError::BufferTooSmall {
                required: 3,
                provided: 2
            })
        );
        assert_eq!(out, [0, 0]);
    }

    #[test]
    fn to_array_round_trips() {
        let ll = list_of(&[9, 8, 7, 6]);
        let mut out = [0; 4];
        ll.to_array(&mut out).expect("buffer is large enough");
        let rebuilt: LinkedList<u32> = out.iter().copied().collect();
        assert_eq!(rebuilt, ll);
    }

    #[test]
    fn sublist_between_is_inclusive() {
        let ll: LinkedList<char> = "abcde".chars().collect();
        let sub = ll
            .sublist_between(1, 3)
            .expect("indexes are in range");
        assert_eq!(sub.to_vec(), vec!['b', 'c', 'd']);
        sub.check_invariants();

        let whole = ll.sublist_between(0, 4).expect("indexes are in range");
        assert_eq!(whole, ll);
    }

    #[test]
    fn sublist_between_rejects_out_of_range_indexes() {
        let ll = list_of(&[1, 2, 3]);
        assert_eq!(
            ll.sublist_between(0, 3),
            Err(LinkedListError::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(
            ll.sublist_between(5, 1),
            Err(LinkedListError::IndexOutOfBounds { index: 5, len: 3 })
        );
        assert!(LinkedList::<u32>::new().sublist_between(0, 0).is_err());
    }

    #[test]
    fn sublist_between_reversed_indexes_is_empty() {
        let ll = list_of(&[1, 2, 3]);
        let sub = ll.sublist_between(2, 1).expect("indexes are in range");
        assert!(sub.is_empty());
    }

    #[test]
    fn sublist_keeps_list_order() {
        let ll: LinkedList<char> = "abcde".chars().collect();
        let sub = ll.sublist(&[4, 0, 2]);
        assert_eq!(sub.to_vec(), vec!['a', 'c', 'e']);
        sub.check_invariants();
    }

    #[test]
    fn sublist_ignores_duplicate_and_out_of_range_indexes() {
        let ll: LinkedList<char> = "abcde".chars().collect();
        let sub = ll.sublist(&[3, 3, 17, 1, 3, 5]);
        assert_eq!(sub.to_vec(), vec!['b', 'd']);
        assert!(ll.sublist(&[]).is_empty());
    }

    #[test]
    fn map_builds_new_list() {
        let ll = list_of(&[1, 2, 3]);
        let doubled = ll.map(|e| e * 2);
        let described = ll.map(|e| e.to_string());
        assert_eq!(doubled.to_vec(), vec![2, 4, 6]);
        assert_eq!(
            described.to_vec(),
            vec![String::from("1"), String::from("2"), String::from("3")]
        );
        assert_eq!(ll.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn filter_keeps_matching_elements_in_order() {
        let ll = list_of(&[1, 2, 3, 4, 5, 6]);
        let evens = ll.filter(|e| e % 2 == 0);
        assert_eq!(evens.to_vec(), vec![2, 4, 6]);
        assert!(ll.filter(|_| false).is_empty());
        assert_eq!(ll.len(), 6);
        evens.check_invariants();
    }

    #[test]
    fn print_visits_every_element() {
        let ll: LinkedList<&str> = ["one", "two", "three"].into_iter().collect();
        let mut out = String::new();
        ll.print(|s| out.push_str(&format!("[{}]->", s)));
        assert_eq!(out, "[one]->[two]->[three]->");
    }

    #[test]
    fn debug_renders_elements() {
        let ll = list_of(&[1, 2, 3]);
        assert_eq!(format!("{:?}", ll), "[1, 2, 3]");
        assert_eq!(format!("{:?}", LinkedList::<u32>::new()), "[]");
    }

    #[test]
    fn errors_display_their_bounds() {
        let err = LinkedListError::IndexOutOfBounds { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "index 4 out of bounds for list of length 2"
        );
    }

    #[test]
    fn clone_is_deep() {
        let ll = list_of(&[1, 2, 3]);
        let mut copy = ll.clone();
        copy.insert_last(4);
        assert_eq!(ll.to_vec(), vec![1, 2, 3]);
        assert_eq!(copy.to_vec(), vec![1, 2, 3, 4]);
        assert_ne!(ll, copy);
    }
}

#[cfg(all(not(feature = "no-std"), test))]
mod iter_test {
    use super::*;

    #[test]
    fn basic_iter_test() {
        let nums = [73, 42, 114, 901];
        let ll: LinkedList<u32> = nums.iter().copied().collect();

        for (data, num) in ll.iter().zip(nums.iter()) {
            assert_eq!(data, num);
        }
        assert_eq!(ll.iter().count(), ll.len());
    }

    #[test]
    fn iter_terminates_properly_single_element() {
        let mut ll = LinkedList::new();
        let val = 42;
        ll.insert_last(val);

        let mut iter = ll.iter();
        assert!(iter.has_next());
        assert_eq!(&val, iter.next().expect("should produce a value"));
        assert!(!iter.has_next());

        for _i in 0..10 {
            assert!(iter.next().is_none());
        }
    }

    #[test]
    fn iter_on_empty_list_has_no_next() {
        let ll = LinkedList::<u32>::new();
        let mut iter = ll.iter();
        assert!(!iter.has_next());
        assert!(iter.next().is_none());
    }

    #[test]
    fn iterators_are_independent() {
        let ll: LinkedList<u32> = (0..4).collect();
        let mut outer = ll.iter();
        assert_eq!(outer.next(), Some(&0));

        let inner: Vec<u32> = ll.iter().copied().collect();
        assert_eq!(inner, vec![0, 1, 2, 3]);

        // starting a second iteration does not disturb the first
        assert_eq!(outer.next(), Some(&1));
        let forked = outer.clone();
        assert_eq!(outer.len(), 2);
        assert_eq!(forked.copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(outer.next(), Some(&2));
    }

    #[test]
    fn has_next_walk_matches_len() {
        let ll: LinkedList<u32> = (10..15).collect();
        let mut iter = ll.iter();
        let mut seen = vec![];
        while iter.has_next() {
            seen.push(*iter.next().expect("has_next promised a value"));
        }
        assert_eq!(seen, vec![10, 11, 12, 13, 14]);
        assert_eq!(seen.len(), ll.len());
    }

    #[test]
    fn basic_iter_mut_test() {
        let nums = [73, 42, 114, 901];
        let mut ll: LinkedList<u32> = nums.iter().copied().collect();

        for data in ll.iter_mut() {
            *data += 1;
        }

        for (data, num) in ll.iter().zip(nums.iter()) {
            assert_eq!(data, &(*num + 1));
        }
    }

    #[test]
    fn iter_mut_terminates_properly_multi_element() {
        let mut ll: LinkedList<u32> = [42, 73].into_iter().collect();

        let mut iter = ll.iter_mut();
        assert_eq!(&42, iter.next().expect("should produce a value"));
        assert_eq!(&73, iter.next().expect("should produce a value"));

        for _i in 0..10 {
            assert!(iter.next().is_none());
        }
    }

    #[test]
    fn into_iter_drains_in_order() {
        let ll: LinkedList<u32> = (0..5).collect();
        let mut iter = ll.into_iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn borrowed_into_iter() {
        let mut ll: LinkedList<u32> = (0..3).collect();
        for data in &mut ll {
            *data *= 10;
        }
        let mut total = 0;
        for data in &ll {
            total += data;
        }
        assert_eq!(total, 30);
    }

    #[test]
    fn extend_appends_to_tail() {
        let mut ll: LinkedList<u32> = (0..2).collect();
        ll.extend(2..4);
        assert_eq!(ll.to_vec(), vec![0, 1, 2, 3]);
        assert_eq!(ll.last(), Some(&3));
        ll.check_invariants();
    }
}

// proptest doesn't run under miri with default config
#[cfg(all(not(miri), not(feature = "no-std"), test))]
mod proptests {
    use std::collections::VecDeque;

    use proptest::collection::vec as prop_vec;
    use proptest::prelude::*;
    use proptest::test_runner::Config;
    use proptest_derive::Arbitrary;
    use proptest_state_machine::{ReferenceStateMachine, StateMachineTest};
    use rand::Rng;

    use super::*;

    // values come from a small range so equality based removals find matches
    const VALUE_RANGE: core::ops::Range<u32> = 0..8;

    proptest_state_machine::prop_state_machine! {
        #![proptest_config(Config {
            failure_persistence: None,
            .. Config::default()
        })]

        #[test]
        fn linked_list_state_machine_test(
            sequential
            1..200
            =>
            LinkedList<u32>
        );
    }

    /// The possible transitions of the state machine.
    #[derive(Clone, Debug)]
    pub enum Transition {
        InsertFirst(u32),
        InsertLast(u32),
        Insert(usize, u32),
        RemoveFirst,
        RemoveLast,
        Remove(usize),
        RemoveAll(u32),
        RemoveDuplicates(u32),
        Clear,
    }

    pub struct LinkedListStateMachine;

    impl ReferenceStateMachine for LinkedListStateMachine {
        type State = VecDeque<u32>;
        type Transition = Transition;

        fn init_state() -> BoxedStrategy<Self::State> {
            Just(VecDeque::new()).boxed()
        }

        fn transitions(state: &Self::State) -> BoxedStrategy<Self::Transition> {
            // indexes may run one or two past the end to exercise rejection
            let len = state.len();
            prop_oneof![
                3 => VALUE_RANGE.prop_map(Transition::InsertFirst),
                3 => VALUE_RANGE.prop_map(Transition::InsertLast),
                3 => (0..len + 2, VALUE_RANGE).prop_map(|(i, v)| Transition::Insert(i, v)),
                1 => Just(Transition::RemoveFirst),
                1 => Just(Transition::RemoveLast),
                2 => (0..len + 2).prop_map(Transition::Remove),
                1 => VALUE_RANGE.prop_map(Transition::RemoveAll),
                1 => VALUE_RANGE.prop_map(Transition::RemoveDuplicates),
                1 => Just(Transition::Clear),
            ]
            .boxed()
        }

        fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
            match *transition {
                Transition::InsertFirst(value) => state.push_front(value),
                Transition::InsertLast(value) => state.push_back(value),
                Transition::Insert(index, value) => {
                    if index <= state.len() {
                        state.insert(index, value);
                    }
                }
                Transition::RemoveFirst => {
                    state.pop_front();
                }
                Transition::RemoveLast => {
                    state.pop_back();
                }
                Transition::Remove(index) => {
                    state.remove(index);
                }
                Transition::RemoveAll(value) => state.retain(|v| *v != value),
                Transition::RemoveDuplicates(value) => {
                    let mut seen = false;
                    state.retain(|v| {
                        if *v != value {
                            return true;
                        }
                        let keep = !seen;
                        seen = true;
                        keep
                    });
                }
                Transition::Clear => state.clear(),
            }
            state
        }
    }

    impl StateMachineTest for LinkedList<u32> {
        type SystemUnderTest = Self;
        type Reference = LinkedListStateMachine;

        fn init_test(
            _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        ) -> Self::SystemUnderTest {
            Self::new()
        }

        fn apply(
            mut state: Self::SystemUnderTest,
            _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
            transition: Transition,
        ) -> Self::SystemUnderTest {
            let len = state.len();
            match transition {
                Transition::InsertFirst(value) => state.insert_first(value),
                Transition::InsertLast(value) => state.insert_last(value),
                Transition::Insert(index, value) => {
                    let res = state.insert(index, value);
                    assert_eq!(res.is_ok(), index <= len);
                    if res.is_ok() {
                        assert_eq!(state.get(index), Some(&value));
                    }
                }
                Transition::RemoveFirst => {
                    let expected = state.first().copied();
                    assert_eq!(state.remove_first(), expected);
                }
                Transition::RemoveLast => {
                    let expected = state.last().copied();
                    assert_eq!(state.remove_last(), expected);
                }
                Transition::Remove(index) => {
                    let expected = state.get(index).copied();
                    assert_eq!(state.remove(index).ok(), expected);
                }
                Transition::RemoveAll(value) => {
                    let matches = state.count_eq(&value);
                    assert_eq!(state.remove_all(&value, |a, b| a == b), matches);
                }
                Transition::RemoveDuplicates(value) => {
                    let matches = state.count_eq(&value);
                    let removed = state.remove_duplicates(&value, |a, b| a == b);
                    assert_eq!(removed, matches.checked_sub(1));
                }
                Transition::Clear => state.clear(),
            }
            state
        }

        fn check_invariants(
            state: &Self::SystemUnderTest,
            ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        ) {
            state.check_invariants();
            assert_eq!(state.len(), ref_state.len());
            assert_eq!(state.iter().count(), ref_state.len());
            assert_eq!(state.first(), ref_state.front());
            assert_eq!(state.last(), ref_state.back());

            for (data, ref_value) in state.iter().zip(ref_state.iter()) {
                assert_eq!(data, ref_value);
            }
        }
    }

    #[derive(Arbitrary, Debug)]
    enum Operation {
        InsertFirst(u8),
        InsertLast(u8),
        Get,
        Find,
        SublistBetween,
        Sublist,
        Map,
        Filter,
        Join,
        ToArray,
    }

    fn random_index(len: usize) -> usize {
        // occasionally one past the end
        rand::thread_rng().gen_range(0..=len)
    }

    proptest! {
        #[test]
        fn derived_operations_match_vec(ops in prop_vec(any::<Operation>(), 0..256)) {
            let mut reference: Vec<u8> = vec![];
            let mut ll = LinkedList::new();

            for op in ops.iter() {
                match op {
                    Operation::InsertFirst(v) => {
                        reference.insert(0, *v);
                        ll.insert_first(*v);
                    }
                    Operation::InsertLast(v) => {
                        reference.push(*v);
                        ll.insert_last(*v);
                    }
                    Operation::Get => {
                        let index = random_index(reference.len());
                        prop_assert_eq!(ll.get(index), reference.get(index));
                    }
                    Operation::Find => {
                        let index = random_index(reference.len());
                        if let Some(v) = reference.get(index) {
                            let expected = reference.iter().position(|r| r == v);
                            prop_assert_eq!(ll.find_eq(v), expected);
                            prop_assert_eq!(
                                ll.count_eq(v),
                                reference.iter().filter(|r| *r == v).count()
                            );
                        }
                    }
                    Operation::SublistBetween => {
                        let start = random_index(reference.len());
                        let end = random_index(reference.len());
                        match ll.sublist_between(start, end) {
                            Ok(sub) => {
                                prop_assert!(start < reference.len() && end < reference.len());
                                let expected: &[u8] = if start <= end {
                                    &reference[start..=end]
                                } else {
                                    &[]
                                };
                                prop_assert_eq!(sub.to_vec(), expected.to_vec());
                            }
                            Err(_) => {
                                prop_assert!(start >= reference.len() || end >= reference.len());
                            }
                        }
                    }
                    Operation::Sublist => {
                        let indexes: Vec<usize> =
                            (0..4).map(|_| random_index(reference.len())).collect();
                        let expected: Vec<u8> = reference
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| indexes.contains(i))
                            .map(|(_, v)| *v)
                            .collect();
                        prop_assert_eq!(ll.sublist(&indexes).to_vec(), expected);
                    }
                    Operation::Map => {
                        let expected: Vec<u16> = reference.iter().map(|v| *v as u16 + 1).collect();
                        prop_assert_eq!(ll.map(|v| *v as u16 + 1).to_vec(), expected);
                    }
                    Operation::Filter => {
                        let expected: Vec<u8> =
                            reference.iter().copied().filter(|v| v % 3 == 0).collect();
                        prop_assert_eq!(ll.filter(|v| v % 3 == 0).to_vec(), expected);
                    }
                    Operation::Join => {
                        let joined = LinkedList::join(&ll, &ll);
                        let mut expected = reference.clone();
                        expected.extend_from_slice(&reference);
                        prop_assert_eq!(joined.to_vec(), expected);
                        joined.check_invariants();
                    }
                    Operation::ToArray => {
                        let mut out = vec![0; reference.len()];
                        prop_assert!(ll.to_array(&mut out).is_ok());
                        prop_assert_eq!(&out, &reference);
                    }
                }
                ll.check_invariants();
            }
        }
    }
}
