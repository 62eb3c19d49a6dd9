//! Fixed-capacity collection of the highest-scored items

/// Keeps the `limit` best items seen so far, ranked by a score function
///
/// Until the bucket is full every item is admitted. After that, a new item
/// replaces the lowest-scored member, in that member's slot, only if its
/// score is strictly greater; on ties the earlier item stays.
///
/// Items are kept in slot order, not sorted by score.
///
/// # Example
///
/// ```
/// use sleuth_core::TopResultsBucket;
///
/// let mut bucket = TopResultsBucket::new(2, |score: &u32| *score);
/// for score in [5, 3, 8, 1, 9] {
///     bucket.add(score);
/// }
/// assert_eq!(bucket.items(), &[9, 8]);
/// ```
pub struct TopResultsBucket<T, F> {
    limit: usize,
    score_of: F,
    items: Vec<T>,
}

impl<T, F, S> TopResultsBucket<T, F>
where
    F: Fn(&T) -> S,
    S: PartialOrd,
{
    /// Create an empty bucket holding at most `limit` items
    pub fn new(limit: usize, score_of: F) -> Self {
        Self {
            limit,
            score_of,
            items: Vec::with_capacity(limit),
        }
    }

    /// Offer an item; returns whether it was admitted
    pub fn add(&mut self, item: T) -> bool {
        if self.items.len() < self.limit {
            self.items.push(item);
            return true;
        }

        let Some(lowest) = self.lowest_slot() else {
            return false;
        };
        if (self.score_of)(&item) > (self.score_of)(&self.items[lowest]) {
            self.items[lowest] = item;
            true
        } else {
            false
        }
    }

    /// Slot of the first lowest-scored member
    fn lowest_slot(&self) -> Option<usize> {
        let mut slots = self.items.iter().enumerate();
        let (mut lowest, first) = slots.next()?;
        let mut lowest_score = (self.score_of)(first);

        for (slot, item) in slots {
            let score = (self.score_of)(item);
            if score < lowest_score {
                lowest = slot;
                lowest_score = score;
            }
        }
        Some(lowest)
    }
}

impl<T, F> TopResultsBucket<T, F> {
    /// Members in slot order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take the members out, in slot order
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the bucket has no members
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of members
    pub fn limit(&self) -> usize {
        self.limit
    }
}
