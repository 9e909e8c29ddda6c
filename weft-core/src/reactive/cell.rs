//! The public cell type.

use std::fmt;

use super::{EventStream, Moment};
use crate::cell::operators::{Mapped, Mapped2, MappedAt, Switched};
use crate::cell::{CellVertex, DerivedFrozenCell, PureCell};
use crate::stream::operators::Values;
use crate::stream::StreamVertex;
use crate::transaction::Transaction;

/// A value that changes over time, one transaction at a time.
///
/// Building a cell is cheap and lazy: derived cells compute nothing and hold
/// no subscriptions until something observes them. Cells built from
/// constants only are constants themselves.
///
/// # Example
///
/// ```rust,ignore
/// let price = Cell::constant(20);
/// let quantity = orders.hold(tx, 1);
/// let total = Cell::map2(&price, &quantity, |price, quantity| price * quantity);
/// assert_eq!(total.sample(tx), 20);
/// ```
pub struct Cell<V> {
    vertex: CellVertex<V>,
}

impl<V: Clone + 'static> Cell<V> {
    /// A cell that never changes.
    pub fn constant(value: V) -> Self {
        Self::from_vertex(CellVertex::Frozen(PureCell::new(value)))
    }

    pub(crate) fn from_vertex(vertex: CellVertex<V>) -> Self {
        Self { vertex }
    }

    pub(crate) fn vertex(&self) -> &CellVertex<V> {
        &self.vertex
    }

    /// Whether the cell is known never to change.
    pub fn is_constant(&self) -> bool {
        self.vertex.is_frozen()
    }

    /// The value from before the current transaction.
    pub fn sample(&self, tx: &mut Transaction) -> V {
        self.vertex.old_value(tx)
    }

    pub fn sampling(&self) -> Moment<V> {
        let cell = self.clone();
        Moment::new(move |tx| cell.sample(tx))
    }

    /// A cell holding `transform` of this cell's value.
    ///
    /// `transform` may run several times per transaction and should be
    /// pure; use [`map_at`](Self::map_at) to sample other cells.
    pub fn map<U: Clone + 'static>(&self, transform: impl Fn(&V) -> U + 'static) -> Cell<U> {
        let vertex = match &self.vertex {
            CellVertex::Frozen(source) => {
                let source = source.clone();
                CellVertex::Frozen(DerivedFrozenCell::new(move |tx| transform(&source.old_value(tx))))
            }
            CellVertex::Warm(source) => CellVertex::Warm(Mapped::vertex(source.clone(), transform)),
        };
        Cell::from_vertex(vertex)
    }

    /// A cell combining the values of two cells.
    pub fn map2<B, U>(first: &Cell<V>, second: &Cell<B>, transform: impl Fn(&V, &B) -> U + 'static) -> Cell<U>
    where
        B: Clone + 'static,
        U: Clone + 'static,
    {
        let vertex = match (&first.vertex, &second.vertex) {
            (CellVertex::Frozen(a), CellVertex::Frozen(b)) => {
                let (a, b) = (a.clone(), b.clone());
                CellVertex::Frozen(DerivedFrozenCell::new(move |tx| {
                    transform(&a.old_value(tx), &b.old_value(tx))
                }))
            }
            _ => CellVertex::Warm(Mapped2::vertex(first.vertex.clone(), second.vertex.clone(), transform)),
        };
        Cell::from_vertex(vertex)
    }

    /// A cell holding `transform` of this cell's value, computed once per
    /// update at the moment it happens.
    ///
    /// `transform` gets the transaction and may sample other cells; its
    /// result is kept as state. The initial value is computed right away.
    pub fn map_at<U: Clone + 'static>(
        &self,
        tx: &mut Transaction,
        transform: impl Fn(&mut Transaction, &V) -> U + 'static,
    ) -> Cell<U> {
        match &self.vertex {
            CellVertex::Frozen(source) => {
                let value = source.old_value(tx);
                Cell::constant(transform(tx, &value))
            }
            CellVertex::Warm(source) => Cell::from_vertex(CellVertex::Warm(MappedAt::spawn(tx, source.clone(), transform))),
        }
    }

    /// A cell following whichever cell `outer` currently holds.
    pub fn switch(outer: &Cell<Cell<V>>) -> Cell<V> {
        Cell::from_vertex(CellVertex::Warm(Switched::vertex(outer.vertex.clone())))
    }

    /// A cell starting at `initial` and taking on each value `new_values`
    /// emits.
    pub fn define(tx: &mut Transaction, initial: V, new_values: &EventStream<V>) -> Cell<V> {
        new_values.hold(tx, initial)
    }

    /// The stream of this cell's values, spawned when pulled.
    pub fn values(&self) -> Moment<EventStream<V>> {
        let cell = self.clone();
        Moment::new(move |tx| cell.values_in(tx))
    }

    /// The stream of this cell's values, starting with the current one.
    ///
    /// In the spawning transaction the stream emits the value the cell has
    /// after that transaction; afterwards it emits every update. A constant
    /// never changes, so its values stream never emits.
    pub fn values_in(&self, tx: &mut Transaction) -> EventStream<V> {
        match &self.vertex {
            CellVertex::Frozen(_) => EventStream::never(),
            CellVertex::Warm(_) => {
                let vertex = Values::spawn(tx, self.vertex.clone());
                EventStream::from_vertex(StreamVertex::Live(vertex))
            }
        }
    }
}

impl<V> Clone for Cell<V> {
    fn clone(&self) -> Self {
        Self {
            vertex: self.vertex.clone(),
        }
    }
}

impl<V: Clone + 'static> fmt::Debug for Cell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&self.vertex).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn constant_operators_stay_constant() {
        let constant = Cell::constant(2);
        let mapped = constant.map(|value| value * 10);
        let combined = Cell::map2(&mapped, &constant, |a, b| a + b);
        let mapped_at = sample(|tx| combined.map_at(tx, |_, value| value + 1));

        verify_frozen(combined.vertex(), 22);
        verify_frozen(mapped_at.vertex(), 23);
    }

    #[test]
    fn map2_with_one_warm_source_is_warm() {
        let input = InputCell::new(1);
        let combined = Cell::map2(&input.cell(), &Cell::constant(10), |a, b| a + b);
        assert!(!combined.is_constant());

        let verifier = ObservingVerifier::start(combined.vertex());
        verifier.verify_updates(&input.update(2), 11, 12);
    }

    #[test]
    fn switch_follows_the_current_inner_cell() {
        let first = InputCell::new(1);
        let outer = InputCell::new(first.cell());
        let switched = Cell::switch(&outer.cell());
        let verifier = ObservingVerifier::start(switched.vertex());

        verifier.verify_updates(&outer.update(Cell::constant(5)), 1, 5);
        verifier.verify_does_not_update_at_all(&first.update(2), 5);
    }

    #[test]
    fn map_at_samples_other_cells() {
        let input = InputCell::new(1);
        let factor = InputCell::new(10);
        let factor_cell = factor.cell();
        let scaled = sample(|tx| {
            input
                .cell()
                .map_at(tx, move |tx, value| value * factor_cell.sample(tx))
        });
        let verifier = ObservingVerifier::start(scaled.vertex());

        verifier.verify_updates(&input.update(2), 10, 20);
        stimulate(&factor.update(100));
        verify_at_rest(scaled.vertex(), 20);
        verifier.verify_updates(&input.update(3), 20, 300);
    }

    #[test]
    fn values_starts_with_the_current_value() {
        let input = InputCell::new(4);

        let first = sample(|tx| {
            let values = input.cell().values_in(tx);
            let verifier = SubscribingVerifier::start_in(tx, values.vertex());
            let ongoing = values.vertex().ongoing_emission();
            verifier.stop();
            ongoing
        });

        assert_eq!(first.map(|emission| emission.into_event()), Some(4));
    }

    #[test]
    fn values_of_a_constant_never_emit() {
        let values = sample(|tx| Cell::constant(3).values_in(tx));

        assert!(values.is_never());
    }
}
