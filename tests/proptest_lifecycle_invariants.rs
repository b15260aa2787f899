//! Property tests for the coalescing and teardown invariants.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;

use spark_observe::testkit::{TestEngine, TestHost};
use spark_observe::{observer, Definition, Disposer, DisposerRegistry, Props};

proptest! {
    /// Any burst of invalidations between two flushes produces exactly one
    /// re-render, and the output reflects the last written value.
    #[test]
    fn prop_invalidation_bursts_coalesce(values in prop::collection::vec(0i32..1_000, 1..40)) {
        let engine = TestEngine::new();
        engine.install();
        let cell = engine.cell(-1i32);

        let renders = Rc::new(Cell::new(0usize));
        let renders_in = renders.clone();
        let read = cell.clone();
        let def = observer(Definition::function("Burst", move |_props, _ctx| {
            renders_in.set(renders_in.get() + 1);
            Ok(read.get().to_string())
        }));

        let host = TestHost::new();
        let id = host.mount(def, Props::new()).unwrap();
        prop_assert_eq!(renders.get(), 1);

        for value in &values {
            cell.set(*value);
        }

        // However many writes happened, at most one update is pending and
        // exactly one re-render runs (the initial value differs from every
        // written one, so at least one write invalidated).
        prop_assert_eq!(host.pending_updates(), 1);
        prop_assert_eq!(host.flush(), 1);
        prop_assert_eq!(renders.get(), 2);
        let last = *values.last().unwrap();
        let output = host.output(id);
        let last_str = last.to_string();
        prop_assert_eq!(output.as_deref(), Some(last_str.as_str()));

        // Nothing left behind.
        prop_assert_eq!(host.flush(), 0);
        host.unmount(id);
    }

    /// Unmounting with any number of queued invalidations never renders
    /// again and never errors.
    #[test]
    fn prop_unmount_cancels_any_pending_burst(writes in 1usize..30) {
        let engine = TestEngine::new();
        engine.install();
        let cell = engine.cell(0i32);

        let renders = Rc::new(Cell::new(0usize));
        let renders_in = renders.clone();
        let read = cell.clone();
        let def = observer(Definition::function("Doomed", move |_props, _ctx| {
            renders_in.set(renders_in.get() + 1);
            Ok(read.get().to_string())
        }));

        let host = TestHost::new();
        let id = host.mount(def, Props::new()).unwrap();

        for value in 1..=writes {
            cell.set(value as i32);
        }
        host.unmount(id);

        prop_assert_eq!(host.flush(), 0);
        prop_assert_eq!(renders.get(), 1);

        // Writes after teardown stay inert.
        cell.set(-1);
        prop_assert_eq!(host.pending_updates(), 0);
    }

    /// Draining invokes every disposer exactly once, in registration order;
    /// a second drain invokes none.
    #[test]
    fn prop_drain_order_and_idempotency(count in 1usize..64) {
        let registry = DisposerRegistry::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for index in 0..count {
            let order = order.clone();
            registry
                .register(Box::new(move || order.borrow_mut().push(index)) as Disposer)
                .unwrap();
        }

        registry.drain();
        let expected: Vec<usize> = (0..count).collect();
        prop_assert_eq!(order.borrow().clone(), expected);

        registry.drain();
        prop_assert_eq!(order.borrow().len(), count);
    }
}
