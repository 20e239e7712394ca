//! Display items and lazy separator insertion.
//!
//! Records become [`UiItem::Text`] items; [`InsertSeparators`] walks any
//! (possibly unbounded) iterator and asks a generator for a separator between
//! each adjacent pair, holding at most one item back while it waits for the
//! successor.

use pagefill_storage::{Key, Record};
use std::fmt;
use std::iter::FusedIterator;

/// An item of the display stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UiItem {
    /// A loaded record.
    Text {
        /// Record value.
        value: Key,
    },
    /// A synthetic group header.
    Separator {
        /// Header text.
        text: String,
    },
}

/// Stable identity of a display slot, for list diffing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    /// Key of a text item.
    Value(Key),
    /// Key of a separator.
    Text(String),
    /// Key of an unloaded slot at the given position.
    Placeholder(usize),
}

impl UiItem {
    /// Maps a record to a text item.
    pub fn text(record: Record) -> Self {
        UiItem::Text {
            value: record.value(),
        }
    }

    /// Creates a separator.
    pub fn separator(text: impl Into<String>) -> Self {
        UiItem::Separator { text: text.into() }
    }

    /// Returns the stable diffing key.
    pub fn key(&self) -> ItemKey {
        match self {
            UiItem::Text { value } => ItemKey::Value(*value),
            UiItem::Separator { text } => ItemKey::Text(text.clone()),
        }
    }

    /// Returns the record value of a text item.
    pub fn value(&self) -> Option<Key> {
        match self {
            UiItem::Text { value } => Some(*value),
            UiItem::Separator { .. } => None,
        }
    }

    /// Returns true for separators.
    pub fn is_separator(&self) -> bool {
        matches!(self, UiItem::Separator { .. })
    }
}

impl fmt::Display for UiItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiItem::Text { value } => write!(f, "{value}"),
            UiItem::Separator { text } => write!(f, "-- {text} --"),
        }
    }
}

/// Returns the key for an optional slot, falling back to a placeholder key.
pub fn slot_key(position: usize, slot: Option<&UiItem>) -> ItemKey {
    slot.map_or(ItemKey::Placeholder(position), UiItem::key)
}

/// Separator between two decades: `"{before / 10}x"` when `after` starts a
/// new multiple of ten. Stream edges never get a separator.
pub fn decade_separator(before: Option<&UiItem>, after: Option<&UiItem>) -> Option<UiItem> {
    let before = before?.value()?;
    let after = after?.value()?;
    (after % 10 == 0).then(|| UiItem::separator(format!("{}x", before / 10)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Running,
    Done,
}

/// Iterator adapter that inserts generated items between neighbors.
///
/// The generator is called with `(None, first)` before the first item, with
/// every adjacent pair, and with `(last, None)` after the last item. It is
/// never called for an empty upstream.
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct InsertSeparators<I: Iterator, F> {
    iter: I,
    generator: F,
    pending: Option<I::Item>,
    separator: Option<I::Item>,
    phase: Phase,
}

impl<I: Iterator, F> InsertSeparators<I, F>
where
    F: FnMut(Option<&I::Item>, Option<&I::Item>) -> Option<I::Item>,
{
    /// Wraps `iter`.
    pub fn new(iter: I, generator: F) -> Self {
        Self {
            iter,
            generator,
            pending: None,
            separator: None,
            phase: Phase::Start,
        }
    }
}

impl<I: Iterator, F> Iterator for InsertSeparators<I, F>
where
    F: FnMut(Option<&I::Item>, Option<&I::Item>) -> Option<I::Item>,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(separator) = self.separator.take() {
            return Some(separator);
        }

        match self.phase {
            Phase::Done => None,
            Phase::Start => {
                self.phase = Phase::Running;
                let Some(first) = self.iter.next() else {
                    self.phase = Phase::Done;
                    return None;
                };
                let header = (self.generator)(None, Some(&first));
                self.pending = Some(first);
                header.or_else(|| self.next())
            }
            Phase::Running => {
                let current = self.pending.take()?;
                let successor = self.iter.next();
                self.separator = (self.generator)(Some(&current), successor.as_ref());
                if successor.is_none() {
                    self.phase = Phase::Done;
                }
                self.pending = successor;
                Some(current)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let held = usize::from(self.pending.is_some()) + usize::from(self.separator.is_some());
        let (lower, upper) = self.iter.size_hint();
        // Every upstream item can be followed by one generated item.
        let upper = upper
            .and_then(|upper| upper.checked_add(held))
            .and_then(|upper| upper.checked_mul(2))
            .and_then(|upper| upper.checked_add(1));
        (lower.saturating_add(held), upper)
    }
}

impl<I: Iterator, F> FusedIterator for InsertSeparators<I, F> where
    F: FnMut(Option<&I::Item>, Option<&I::Item>) -> Option<I::Item>
{
}

/// Extension trait adding [`insert_separators`](SeparatorExt::insert_separators)
/// to every iterator.
pub trait SeparatorExt: Iterator + Sized {
    /// Inserts generated items between neighbors, lazily.
    fn insert_separators<F>(self, generator: F) -> InsertSeparators<Self, F>
    where
        F: FnMut(Option<&Self::Item>, Option<&Self::Item>) -> Option<Self::Item>,
    {
        InsertSeparators::new(self, generator)
    }
}

impl<I: Iterator> SeparatorExt for I {}

/// Maps records to text items and inserts decade separators.
pub fn display_items<I>(records: I) -> impl Iterator<Item = UiItem>
where
    I: IntoIterator<Item = Record>,
{
    records
        .into_iter()
        .map(UiItem::text)
        .insert_separators(decade_separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts(values: impl IntoIterator<Item = Key>) -> Vec<UiItem> {
        values.into_iter().map(|value| UiItem::Text { value }).collect()
    }

    #[test]
    fn separator_before_multiple_of_ten() {
        let items: Vec<_> = display_items((7..=11).map(Record::new)).collect();

        let mut expected = texts(7..=9);
        expected.push(UiItem::separator("0x"));
        expected.extend(texts(10..=11));
        assert_eq!(items, expected);
    }

    #[test]
    fn no_separator_at_stream_edges() {
        let items: Vec<_> = display_items((10..=19).map(Record::new)).collect();
        assert_eq!(items, texts(10..=19));

        let items: Vec<_> = display_items((15..=20).map(Record::new)).collect();
        assert_eq!(items.last(), Some(&UiItem::Text { value: 20 }));
        assert_eq!(items[items.len() - 2], UiItem::separator("1x"));
    }

    #[test]
    fn empty_and_single_streams() {
        assert_eq!(display_items(Vec::new()).count(), 0);
        let single: Vec<_> = display_items([Record::new(10)]).collect();
        assert_eq!(single, texts([10]));
    }

    #[test]
    fn label_uses_predecessor_decade() {
        let items: Vec<_> = display_items([Record::new(25), Record::new(40)]).collect();
        assert_eq!(
            items,
            vec![
                UiItem::Text { value: 25 },
                UiItem::separator("2x"),
                UiItem::Text { value: 40 }
            ]
        );
    }

    #[test]
    fn works_on_unbounded_stream() {
        let items: Vec<_> = display_items((0..).map(Record::new)).take(23).collect();
        let separators: Vec<_> = items.iter().filter(|item| item.is_separator()).collect();
        assert_eq!(
            separators,
            vec![&UiItem::separator("0x"), &UiItem::separator("1x")]
        );
        assert_eq!(items.len(), 23);
    }

    #[test]
    fn generator_sees_edges() {
        let mut calls = Vec::new();
        let out: Vec<i32> = [1, 2]
            .into_iter()
            .insert_separators(|before, after| {
                calls.push((before.copied(), after.copied()));
                match (before, after) {
                    (None, Some(_)) => Some(0),
                    (Some(_), None) => Some(99),
                    _ => None,
                }
            })
            .collect();

        assert_eq!(out, vec![0, 1, 2, 99]);
        assert_eq!(calls, vec![(None, Some(1)), (Some(1), Some(2)), (Some(2), None)]);
    }

    #[test]
    fn upstream_is_pulled_lazily() {
        let mut pulled = 0;
        let mut iter = (0..100)
            .inspect(|_| pulled += 1)
            .map(Record::new)
            .map(UiItem::text)
            .insert_separators(decade_separator);

        iter.next();
        drop(iter);
        // First item plus its successor.
        assert_eq!(pulled, 2);
    }

    #[test]
    fn item_keys() {
        assert_eq!(UiItem::Text { value: 7 }.key(), ItemKey::Value(7));
        assert_eq!(
            UiItem::separator("3x").key(),
            ItemKey::Text("3x".to_string())
        );
        assert_eq!(slot_key(4, None), ItemKey::Placeholder(4));
        assert_eq!(
            slot_key(4, Some(&UiItem::Text { value: 1 })),
            ItemKey::Value(1)
        );
    }

    proptest! {
        #[test]
        fn separators_mark_every_decade_boundary(
            values in proptest::collection::btree_set(0i64..500, 0..60)
        ) {
            let items: Vec<_> = display_items(values.iter().copied().map(Record::new)).collect();

            let shown: Vec<Key> = items.iter().filter_map(UiItem::value).collect();
            prop_assert_eq!(shown, values.iter().copied().collect::<Vec<_>>());

            for (i, item) in items.iter().enumerate() {
                if let UiItem::Text { value } = item {
                    let preceded = i > 0 && items[i - 1].is_separator();
                    prop_assert_eq!(preceded, i > 0 && value % 10 == 0);
                }
            }
        }
    }
}
