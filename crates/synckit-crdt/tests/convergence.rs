//! Convergence properties shared by every CRDT (`spec.md` §4.2.5, §8):
//! applying the same deltas in any permutation converges to the same state.

use proptest::prelude::*;

use synckit_core::{ClientId, LogicalTimestamp, Value};
use synckit_crdt::{LwwDocument, OrSet, PnCounter};

fn cid(s: &str) -> ClientId {
    ClientId::from(s)
}

proptest! {
    #[test]
    fn lww_document_converges_regardless_of_apply_order(
        values in prop::collection::vec((0u64..20, 0i64..1000), 1..12)
    ) {
        let deltas: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &(counter, value))| {
                let client = if i % 2 == 0 { "a" } else { "b" };
                let producer = LwwDocument::new();
                producer.local_set("x", Value::from(value), LogicalTimestamp::new(counter + 1, cid(client)))
            })
            .collect();

        let mut forward = LwwDocument::new();
        for d in &deltas {
            forward.apply(d);
        }

        let mut reversed = LwwDocument::new();
        for d in deltas.iter().rev() {
            reversed.apply(d);
        }

        prop_assert_eq!(forward.get("x"), reversed.get("x"));
    }

    #[test]
    fn or_set_converges_regardless_of_apply_order(
        adds in prop::collection::vec(0u64..20, 1..12)
    ) {
        let set_producer: OrSet<u64> = OrSet::new();
        let deltas: Vec<_> = adds
            .iter()
            .enumerate()
            .map(|(i, &v)| set_producer.local_add(v, LogicalTimestamp::new(i as u64 + 1, cid("a"))))
            .collect();

        let mut forward: OrSet<u64> = OrSet::new();
        for d in &deltas {
            forward.apply(d);
        }
        let mut reversed: OrSet<u64> = OrSet::new();
        for d in deltas.iter().rev() {
            reversed.apply(d);
        }

        let mut forward_elems: Vec<_> = forward.elements().cloned().collect();
        let mut reversed_elems: Vec<_> = reversed.elements().cloned().collect();
        forward_elems.sort();
        reversed_elems.sort();
        prop_assert_eq!(forward_elems, reversed_elems);
    }

    #[test]
    fn pn_counter_value_is_independent_of_merge_order(
        incs in prop::collection::vec(0u64..100, 1..8),
        decs in prop::collection::vec(0u64..100, 1..8),
    ) {
        let mut replica_a = PnCounter::new();
        for (i, &amount) in incs.iter().enumerate() {
            let delta = replica_a.local_increment(amount, LogicalTimestamp::new(i as u64 + 1, cid("a")));
            replica_a.apply(&delta);
        }

        let mut replica_b = PnCounter::new();
        for (i, &amount) in decs.iter().enumerate() {
            let delta = replica_b.local_decrement(amount, LogicalTimestamp::new(i as u64 + 1, cid("b")));
            replica_b.apply(&delta);
        }

        let mut order1 = replica_a.clone();
        order1.merge(&replica_b);
        let mut order2 = replica_b.clone();
        order2.merge(&replica_a);

        prop_assert_eq!(order1.value(), order2.value());
    }
}
