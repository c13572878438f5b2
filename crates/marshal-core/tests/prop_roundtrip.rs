/// Property-based tests for the marshaling engine.
///
/// Verifies that `deserialize(serialize(x)) == x` holds for generated object
/// graphs, that the native fast path produces the same tree as the per-element
/// path, and that plan compilation is stable across engines.
///
/// Floats exclude NaN so that derived `PartialEq` on the fixtures holds.
use std::collections::VecDeque;

use marshal_core::{Describe, Marshaller, TypeDescriptor, Value};
use proptest::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct Item {
    sku: String,
    quantity: u16,
    price: f64,
    tags: VecDeque<String>,
    discount: Option<i8>,
}

impl Describe for Item {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::structure::<Self>()
            .field("sku", |i: &Item| &i.sku, |i: &mut Item, v| i.sku = v)
            .field("quantity", |i: &Item| &i.quantity, |i: &mut Item, v| i.quantity = v)
            .field("price", |i: &Item| &i.price, |i: &mut Item, v| i.price = v)
            .field("tags", |i: &Item| &i.tags, |i: &mut Item, v| i.tags = v)
            .field("discount", |i: &Item| &i.discount, |i: &mut Item, v| i.discount = v)
            .default_factory()
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Order {
    id: i64,
    items: Vec<Item>,
    matrix: Vec<Vec<i32>>,
    flags: Vec<bool>,
    note: Option<String>,
}

impl Describe for Order {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::structure::<Self>()
            .field("id", |o: &Order| &o.id, |o: &mut Order, v| o.id = v)
            .field("items", |o: &Order| &o.items, |o: &mut Order, v| o.items = v)
            .field("matrix", |o: &Order| &o.matrix, |o: &mut Order, v| o.matrix = v)
            .field("flags", |o: &Order| &o.flags, |o: &mut Order, v| o.flags = v)
            .field("note", |o: &Order| &o.note, |o: &mut Order, v| o.note = v)
            .default_factory()
            .build()
    }
}

// ============================================================================
// Strategies
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,20}",
        Just(String::new()),
        Just("line1\nline2".to_string()),
        Just("say \"hi\"".to_string()),
        Just("caf\u{00e9}".to_string()),
    ]
}

fn arb_item() -> impl Strategy<Value = Item> {
    (
        arb_text(),
        any::<u16>(),
        -1.0e6f64..1.0e6,
        prop::collection::vec_deque(arb_text(), 0..4),
        any::<Option<i8>>(),
    )
        .prop_map(|(sku, quantity, price, tags, discount)| Item {
            sku,
            quantity,
            price,
            tags,
            discount,
        })
}

fn arb_order() -> impl Strategy<Value = Order> {
    (
        any::<i64>(),
        prop::collection::vec(arb_item(), 0..5),
        prop::collection::vec(prop::collection::vec(any::<i32>(), 0..5), 0..4),
        prop::collection::vec(any::<bool>(), 0..8),
        prop::option::of(arb_text()),
    )
        .prop_map(|(id, items, matrix, flags, note)| Order {
            id,
            items,
            matrix,
            flags,
            note,
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn order_round_trips(order in arb_order()) {
        let engine = Marshaller::new();
        let tree = engine.serialize(&order).unwrap();
        let back: Order = engine.deserialize(&tree).unwrap();
        prop_assert_eq!(back, order);
    }

    #[test]
    fn order_round_trips_without_fast_path(order in arb_order()) {
        let engine = Marshaller::builder().native_fast_path(false).build();
        let tree = engine.serialize(&order).unwrap();
        let back: Order = engine.deserialize(&tree).unwrap();
        prop_assert_eq!(back, order);
    }

    #[test]
    fn fast_path_equals_general_path_for_integers(data in prop::collection::vec(any::<i64>(), 0..64)) {
        let fast = Marshaller::new().serialize(&data).unwrap();
        let slow = Marshaller::builder().native_fast_path(false).build().serialize(&data).unwrap();
        prop_assert!(fast.as_seq().map_or(false, |seq| seq.is_native()));
        prop_assert_eq!(fast, slow);
    }

    #[test]
    fn fast_path_equals_general_path_for_floats(data in prop::collection::vec(any::<f32>(), 0..64)) {
        let fast = Marshaller::new().serialize(&data).unwrap();
        let slow = Marshaller::builder().native_fast_path(false).build().serialize(&data).unwrap();
        prop_assert_eq!(fast, slow);
    }

    #[test]
    fn fast_path_equals_general_path_for_chars(data in prop::collection::vec(any::<char>(), 0..32)) {
        let fast = Marshaller::new().serialize(&data).unwrap();
        let slow = Marshaller::builder().native_fast_path(false).build().serialize(&data).unwrap();
        prop_assert_eq!(&fast, &slow);

        let back: Vec<char> = Marshaller::new().deserialize(&slow).unwrap();
        prop_assert_eq!(back, data);
    }

    #[test]
    fn serialized_trees_are_stable_across_engines(order in arb_order()) {
        let first = Marshaller::new().serialize(&order).unwrap();
        let second = Marshaller::new().serialize(&order).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn arbitrary_json_survives_a_value_field(json in "[a-z]{1,8}", count in any::<i32>()) {
        let engine = Marshaller::new();
        let tree = Value::from(serde_json::json!({ "key": json, "count": count }));
        let back: Value = engine.deserialize(&engine.serialize(&tree).unwrap()).unwrap();
        prop_assert_eq!(back, tree);
    }
}
