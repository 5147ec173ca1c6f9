use std::collections::BTreeMap;
use std::rc::Rc;

use proptest::prelude::*;

use super::{AvlTreeMap, BstMap, KeyError, NodeRef};

const N: i32 = 1_000;
const LARGE_N: i32 = 10_000_000;

// Pre-order (key, balance, left key, right key) of every node.
fn shape<K: Copy, V>(root: Option<NodeRef<'_, K, V>>) -> Vec<(K, i8, Option<K>, Option<K>)> {
    let mut shape = Vec::new();
    let mut stack: Vec<NodeRef<'_, K, V>> = root.into_iter().collect();
    while let Some(node) = stack.pop() {
        shape.push((
            *node.key(),
            node.balance(),
            node.left().map(|left| *left.key()),
            node.right().map(|right| *right.key()),
        ));
        stack.extend(node.right());
        stack.extend(node.left());
    }
    shape
}

// Shape of 1, 2, 3 after any insertion order.
const PERFECT_THREE: [(i32, i8, Option<i32>, Option<i32>); 3] = [
    (2, 0, Some(1), Some(3)),
    (1, 0, None, None),
    (3, 0, None, None),
];

fn root_key<V>(map: &AvlTreeMap<i32, V>) -> Option<i32> {
    map.root().map(|root| *root.key())
}

#[test]
fn test_new() {
    let map_i32 = AvlTreeMap::<i32, ()>::new();
    assert!(map_i32.is_empty());
    assert!(map_i32.is_balanced());
    assert_eq!(map_i32.height(), 0);
    map_i32.check_consistency();

    let map_string = AvlTreeMap::<String, String>::default();
    assert!(map_string.is_empty());
    assert!(map_string.root().is_none());
    assert_eq!(map_string.begin(), map_string.end());
    map_string.check_consistency();
}

#[test]
fn test_rebalance() {
    {
        //     3 ->   2
        //    /      / \
        //   2      1   3
        //  /
        // 1
        let mut map = AvlTreeMap::new();
        map.insert(3, ());
        map.insert(2, ());
        map.insert(1, ());
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(shape(map.root()), PERFECT_THREE);
    }
    {
        //     3   ->     3 ->   2
        //    / \        /      / \
        //   2   4      2      1   3
        //  /          /
        // 1          1
        let mut map = AvlTreeMap::new();
        map.insert(3, ());
        map.insert(2, ());
        map.insert(4, ());
        map.insert(1, ());
        map.check_consistency();
        assert_eq!(map.height(), 3);
        map.remove(&4);
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(root_key(&map), Some(2));
    }
    {
        //   3  ->   2
        //  /       / \
        // 1       1   3
        //  \
        //   2
        let mut map = AvlTreeMap::new();
        map.insert(3, ());
        map.insert(1, ());
        map.insert(2, ());
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(shape(map.root()), PERFECT_THREE);
    }
    {
        //   3   ->   3  ->   2
        //  / \      /       / \
        // 1   4    1       1   3
        //  \        \
        //   2        2
        let mut map = AvlTreeMap::new();
        map.insert(3, ());
        map.insert(1, ());
        map.insert(4, ());
        map.insert(2, ());
        map.check_consistency();
        assert_eq!(map.height(), 3);
        map.remove(&4);
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(root_key(&map), Some(2));
    }
    {
        // 1 ->    2
        //  \     / \
        //   2   1   3
        //    \
        //     3
        let mut map = AvlTreeMap::new();
        map.insert(1, ());
        map.insert(2, ());
        map.insert(3, ());
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(shape(map.root()), PERFECT_THREE);
    }
    {
        //   1     -> 1     ->    2
        //  / \        \         / \
        // 0   2        2       1   3
        //      \        \
        //       3        3
        let mut map = AvlTreeMap::new();
        map.insert(1, ());
        map.insert(0, ());
        map.insert(2, ());
        map.insert(3, ());
        map.check_consistency();
        assert_eq!(map.height(), 3);
        map.remove(&0);
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(root_key(&map), Some(2));
    }
    {
        // 1   ->  2
        //  \     / \
        //   3   1   3
        //  /
        // 2
        let mut map = AvlTreeMap::new();
        map.insert(1, ());
        map.insert(3, ());
        map.insert(2, ());
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(shape(map.root()), PERFECT_THREE);
    }
    {
        //   1   ->  1   ->  2
        //  / \       \     / \
        // 0   3       3   1   3
        //    /       /
        //   2       2
        let mut map = AvlTreeMap::new();
        map.insert(1, ());
        map.insert(0, ());
        map.insert(3, ());
        map.insert(2, ());
        map.check_consistency();
        assert_eq!(map.height(), 3);
        map.remove(&0);
        map.check_consistency();
        assert_eq!(map.height(), 2);
        assert_eq!(root_key(&map), Some(2));
    }
}

#[test]
fn test_remove_leaf_from_three_nodes() {
    let mut map: AvlTreeMap<i32, ()> = [(1, ()), (2, ()), (3, ())].into_iter().collect();
    map.remove(&1);
    map.check_consistency();
    assert_eq!(shape(map.root()), vec![(2, 1, None, Some(3)), (3, 0, None, None)]);

    let mut map: AvlTreeMap<i32, ()> = [(1, ()), (2, ()), (3, ())].into_iter().collect();
    map.remove(&3);
    map.check_consistency();
    assert_eq!(shape(map.root()), vec![(2, -1, Some(1), None), (1, 0, None, None)]);
}

#[test]
fn test_remove_with_evenly_balanced_sibling() {
    //   2        ->     4
    //  / \             / \
    // 1   4           2   5
    //    / \           \
    //   3   5           3
    let mut map: AvlTreeMap<i32, ()> = [2, 1, 4, 3, 5].into_iter().map(|key| (key, ())).collect();
    map.remove(&1);
    map.check_consistency();
    assert_eq!(
        shape(map.root()),
        vec![
            (4, -1, Some(2), Some(5)),
            (2, 1, None, Some(3)),
            (3, 0, None, None),
            (5, 0, None, None),
        ]
    );

    // Mirror image
    let mut map: AvlTreeMap<i32, ()> = [4, 5, 2, 1, 3].into_iter().map(|key| (key, ())).collect();
    map.remove(&5);
    map.check_consistency();
    assert_eq!(
        shape(map.root()),
        vec![
            (2, 1, Some(1), Some(4)),
            (1, 0, None, None),
            (4, -1, Some(3), None),
            (3, 0, None, None),
        ]
    );
}

#[test]
fn test_remove_two_children_takes_predecessor() {
    let mut map: AvlTreeMap<i32, i32> = (1..=7).map(|key| (key, key)).collect();
    assert_eq!(root_key(&map), Some(4));
    assert_eq!(map.remove(&4), Some(4));
    map.check_consistency();
    assert_eq!(root_key(&map), Some(3));

    // Predecessor is the direct left child of the removed node
    let mut map: AvlTreeMap<i32, i32> = [2, 1, 3].into_iter().map(|key| (key, key)).collect();
    assert_eq!(map.remove_entry(&2), Some((2, 2)));
    map.check_consistency();
    assert_eq!(shape(map.root()), vec![(1, 1, None, Some(3)), (3, 0, None, None)]);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_remove_every_key_of_every_small_tree() {
    fn permutations(keys: &[i32]) -> Vec<Vec<i32>> {
        if keys.len() <= 1 {
            return vec![keys.to_vec()];
        }
        let mut result = Vec::new();
        for (i, &first) in keys.iter().enumerate() {
            let mut rest = keys.to_vec();
            rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, first);
                result.push(tail);
            }
        }
        result
    }

    let keys: Vec<i32> = (1..=6).collect();
    for order in permutations(&keys) {
        let map: AvlTreeMap<i32, ()> = order.iter().map(|&key| (key, ())).collect();
        map.check_consistency();
        for &key in &keys {
            let mut map = map.clone();
            assert_eq!(map.remove(&key), Some(()));
            map.check_consistency();
            assert_eq!(map.len(), keys.len() - 1);
        }
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_insert() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let mut values: Vec<i32> = (0..N).map(|_| rng.gen()).collect();
    values.sort();
    values.dedup();

    let mut map = AvlTreeMap::new();
    for value in &values {
        assert!(map.insert(*value, *value).is_none());
        map.check_consistency();
    }
    assert!(map.len() == values.len());

    for value in &values {
        assert_eq!(map.insert(*value, value.wrapping_add(1)), Some(*value));
    }
    assert!(map.len() == values.len());
    assert!(map.is_balanced());
}

#[test]
fn test_insert_existing_keeps_shape() {
    let mut map: AvlTreeMap<i32, i32> = (0..100).map(|key| (key * 7 % 100, key)).collect();
    let before = shape(map.root());
    for key in 0..100 {
        assert!(map.insert(key, -key).is_some());
    }
    assert_eq!(shape(map.root()), before);
    assert!(map.values().zip(0..).all(|(&value, key)| value == -key));
}

#[test]
fn test_remove_absent_keeps_shape() {
    let mut map: AvlTreeMap<i32, i32> = (0..100).map(|key| (key * 2, key)).collect();
    let before = shape(map.root());
    for key in (-1..201).step_by(2) {
        assert!(map.remove(&key).is_none());
    }
    assert_eq!(shape(map.root()), before);
    assert_eq!(map.len(), 100);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_insert_sorted_range() {
    let mut map = AvlTreeMap::new();
    for value in 1..=N {
        assert!(map.insert(value, value).is_none());
        map.check_consistency();
    }
    assert!(map.len() == N as usize);
    let bound = 1.44 * f64::from(N + 2).log2();
    assert!(map.height() > 0);
    assert!(map.height() as f64 <= bound);
    assert!(map.get(&-42).is_none());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_insert_shuffled_range() {
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

    let mut values: Vec<i32> = (0..N).collect();
    let mut rng = StdRng::seed_from_u64(0);
    values.shuffle(&mut rng);

    let mut map = AvlTreeMap::new();
    for value in &values {
        assert!(map.insert(*value, "foo").is_none());
        map.check_consistency();
    }
    assert!(map.len() == values.len());

    for value in &values {
        assert_eq!(map.insert(*value, "bar"), Some("foo"));
    }
    assert!(map.len() == values.len());
    assert!(map.get(&-42).is_none());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_get() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (0..N).map(|_| rng.gen()).collect();

    let mut map = AvlTreeMap::new();
    assert!(map.get(&42).is_none());
    for value in &values {
        map.insert(*value, value.wrapping_add(1));
    }

    for value in &values {
        let got = map.get(value);
        assert_eq!(got, Some(&value.wrapping_add(1)));
        let got = map.get_key_value(value);
        assert_eq!(got, Some((value, &(value.wrapping_add(1)))));
        assert!(map.contains_key(value));
    }

    for value in &values {
        if let Some(mapped) = map.get_mut(value) {
            *mapped = 0;
        }
    }
    assert!(map.values().all(|&mapped| mapped == 0));
}

#[test]
fn test_index() {
    let mut map: AvlTreeMap<String, i32> =
        [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect();
    assert_eq!(map["a"], 1);
    map["b"] += 40;
    assert_eq!(map["b"], 42);
    assert_eq!(map.try_index("b"), Ok(&42));
    assert_eq!(map.try_index("c"), Err(KeyError));
    assert_eq!(map.try_index_mut("c"), Err(KeyError));
    if let Ok(value) = map.try_index_mut("a") {
        *value = 7;
    }
    assert_eq!(map["a"], 7);
}

#[test]
#[should_panic(expected = "key not found")]
fn test_index_missing_key() {
    let map: AvlTreeMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    let _value: i32 = map[&10];
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_clear() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let mut values: Vec<i32> = (0..N).map(|_| rng.gen()).collect();
    values.sort();
    values.dedup();

    let mut map = AvlTreeMap::new();
    for value in &values {
        map.insert(*value, String::from("foo"));
    }
    assert!(!map.is_empty());
    assert!(map.len() == values.len());

    map.clear();
    assert!(map.is_empty());
    assert!(map.len() == 0);
    assert!(map.root().is_none());

    for value in &values {
        assert!(map.insert(*value, String::from("bar")).is_none());
    }
    assert!(!map.is_empty());
    assert!(map.len() == values.len());
    map.check_consistency();
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_remove() {
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let mut values: Vec<i32> = (0..N).map(|_| rng.gen()).collect();
    values.sort();
    values.dedup();

    let mut map = AvlTreeMap::new();
    for value in &values {
        map.insert(*value, 42);
    }

    values.shuffle(&mut rng);
    for value in &values {
        assert!(map.get(value).is_some());
        assert_eq!(map.remove(value), Some(42));
        assert!(map.get(value).is_none());
        map.check_consistency();
    }
    assert!(map.is_empty());
    assert!(map.len() == 0);
    assert!(map.root().is_none());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_map_iter() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let mut values: Vec<i32> = (0..N).map(|_| rng.gen()).collect();

    let mut map = AvlTreeMap::new();
    for value in &values {
        map.insert(*value, value.wrapping_add(42));
    }

    values.sort();
    values.dedup();

    let mut map_iter = map.iter();
    assert_eq!(map_iter.len(), values.len());
    for value in &values {
        let kv = map_iter.next();
        assert!(kv.is_some());
        let (&key, &mapped) = kv.unwrap();
        assert_eq!(key, *value);
        assert_eq!(mapped, value.wrapping_add(42));
    }
    assert!(map_iter.next().is_none());

    let mut value_iter = values.iter();
    for (&key, &mapped) in &map {
        let value = value_iter.next();
        assert!(value.is_some());
        let value = value.unwrap();
        assert_eq!(key, *value);
        assert_eq!(mapped, value.wrapping_add(42));
    }
    assert!(value_iter.next().is_none());

    let mut map_iter_mut = map.iter_mut();
    for value in &values {
        let kv = map_iter_mut.next();
        assert!(kv.is_some());
        let (&key, mapped_mut) = kv.unwrap();
        assert_eq!(key, *value);
        assert_eq!(*mapped_mut, value.wrapping_add(42));
        *mapped_mut = value.wrapping_sub(42);
    }
    assert!(map_iter_mut.next().is_none());

    let mut value_iter = values.iter();
    for (&key, mapped_mut) in &mut map {
        let value = value_iter.next();
        assert!(value.is_some());
        let value = value.unwrap();
        assert_eq!(key, *value);
        assert_eq!(*mapped_mut, value.wrapping_sub(42));
        *mapped_mut = 42;
    }
    assert!(value_iter.next().is_none());

    assert!(map.keys().copied().eq(values.iter().copied()));
    for mapped in map.values_mut() {
        *mapped += 1;
    }
    assert!(map.values().all(|&mapped| mapped == 43));
    assert!(map.into_iter().map(|(key, _)| key).eq(values.into_iter()));
}

#[test]
fn test_cursor() {
    let map: AvlTreeMap<i32, char> = [(20, 'b'), (10, 'a'), (30, 'c')].into_iter().collect();

    let mut cursor = map.begin();
    assert_eq!(cursor.key_value(), Some((&10, &'a')));
    cursor.move_next();
    assert_eq!(cursor, map.find(&20));
    cursor.move_next();
    assert_eq!(cursor.value(), Some(&'c'));
    cursor.move_next();
    assert!(cursor.is_end());
    assert_eq!(cursor, map.end());
    cursor.move_next();
    assert_eq!(cursor, map.end());

    let mut cursor = map.find(&30);
    cursor.move_prev();
    assert_eq!(cursor.key(), Some(&20));
    cursor.move_prev();
    cursor.move_prev();
    assert_eq!(cursor, map.end());

    assert_eq!(map.find(&25), map.end());
    assert!(map.find(&25).key_value().is_none());
    assert_eq!(map.first_key_value(), Some((&10, &'a')));
    assert_eq!(map.last_key_value(), Some((&30, &'c')));

    let node = map.find(&10).node().map(|node| node.parent().map(|parent| *parent.key()));
    assert_eq!(node, Some(Some(20)));
}

#[test]
fn test_iter_mut_borrows_outlive_iteration() {
    let mut map: AvlTreeMap<i32, i32> = (1..=15).map(|key| (key, key)).collect();
    let entries: Vec<(&i32, &mut i32)> = map.iter_mut().collect();
    assert_eq!(entries.len(), 15);
    for (key, value) in entries {
        *value += 10 * key;
    }
    assert!(map.iter().all(|(&key, &value)| value == 11 * key));

    let values: Vec<&mut i32> = map.values_mut().collect();
    for value in values {
        *value = -*value;
    }
    assert!(map.iter().all(|(&key, &value)| value == -11 * key));
    map.check_consistency();
}

#[test]
fn test_remove_root_with_distant_predecessor() {
    //        8
    //      /   \
    //     4     12
    //    / \   /  \
    //   2   6 10  14
    //      /
    //     5
    let mut map: AvlTreeMap<i32, i32> =
        [8, 4, 12, 2, 6, 10, 14, 5].into_iter().map(|key| (key, key)).collect();
    map.check_consistency();
    assert_eq!(map.remove(&8), Some(8));
    map.check_consistency();
    assert_eq!(root_key(&map), Some(6));
    assert!(map.keys().copied().eq([2, 4, 5, 6, 10, 12, 14]));

    // 4 takes its direct left child as predecessor, then the root goes again
    assert_eq!(map.remove(&4), Some(4));
    assert_eq!(map.remove(&6), Some(6));
    map.check_consistency();
    assert!(map.keys().copied().eq([2, 5, 10, 12, 14]));
}

#[test]
fn test_values_dropped_once() {
    let marker = Rc::new(());
    let mut map = AvlTreeMap::new();
    for key in 0..100 {
        map.insert(key, Rc::clone(&marker));
    }
    assert_eq!(Rc::strong_count(&marker), 101);

    for key in (0..100).step_by(3) {
        drop(map.remove(&key));
    }
    assert_eq!(Rc::strong_count(&marker), 101 - 34);

    let mut into_iter = map.clone().into_iter();
    assert_eq!(Rc::strong_count(&marker), 1 + 2 * 66);
    let (first_key, first_value) = into_iter.next().unwrap();
    assert_eq!(first_key, 1);
    drop(first_value);
    assert_eq!(into_iter.len(), 65);
    drop(into_iter);
    assert_eq!(Rc::strong_count(&marker), 1 + 66);

    drop(map);
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn test_clone_eq_debug() {
    let map: AvlTreeMap<i32, &str> = [(2, "two"), (1, "one"), (3, "three")].into_iter().collect();
    let copy = map.clone();
    assert_eq!(copy, map);
    assert_eq!(shape(copy.root()), shape(map.root()));
    assert_eq!(format!("{map:?}"), r#"{1: "one", 2: "two", 3: "three"}"#);

    let mut other = copy.clone();
    other.insert(4, "four");
    assert_ne!(other, map);
}

#[test]
fn test_bst_map_keeps_insertion_shape() {
    let mut map: BstMap<i32, i32> = (1..=100).map(|key| (key, key)).collect();
    map.check_consistency();
    assert_eq!(map.height(), 100);
    assert!(!map.is_balanced());

    assert_eq!(map.remove(&1), Some(1));
    assert_eq!(map.root().map(|root| *root.key()), Some(2));
    map.check_consistency();

    let mut map: BstMap<i32, i32> =
        [4, 2, 6, 1, 3, 5, 7].into_iter().map(|key| (key, key)).collect();
    assert!(map.is_balanced());
    assert_eq!(map.remove(&4), Some(4));
    assert_eq!(map.root().map(|root| *root.key()), Some(3));
    map.check_consistency();
    assert!(map.keys().copied().eq([1, 2, 3, 5, 6, 7]));
}

#[test]
#[ignore]
fn test_large() {
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let mut values: Vec<i32> = (0..LARGE_N).map(|_| rng.gen_range(0..LARGE_N)).collect();

    let mut map = AvlTreeMap::new();
    for value in &values {
        map.insert(*value, *value);
    }
    map.check_consistency();

    values.shuffle(&mut rng);
    values.resize(values.len() / 2, 0);
    for value in &values {
        map.remove(value);
    }
    map.check_consistency();
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, u32),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<u8>(), any::<u32>()).prop_map(|(key, value)| Op::Insert(key, value)),
        2 => any::<u8>().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    #[cfg_attr(miri, ignore)]
    fn prop_matches_btree_map(ops in prop::collection::vec(op(), 0..400)) {
        let mut map = AvlTreeMap::new();
        let mut model = BTreeMap::new();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(map.insert(key, value), model.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                }
            }
            map.check_consistency();
            prop_assert!(map.is_balanced());
            prop_assert_eq!(map.len(), model.len());
        }
        prop_assert!(map.iter().eq(model.iter()));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn prop_insert_then_remove_all_empties(
        keys in prop::collection::vec(any::<i16>(), 0..200),
        seed in any::<u64>(),
    ) {
        use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

        let mut map: AvlTreeMap<i16, ()> = keys.iter().map(|&key| (key, ())).collect();
        let mut order = keys.clone();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        for key in &order {
            map.remove(key);
            map.check_consistency();
        }
        prop_assert!(map.is_empty());
        prop_assert!(map.root().is_none());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn prop_bst_map_matches_btree_map(ops in prop::collection::vec(op(), 0..200)) {
        let mut map = BstMap::new();
        let mut model = BTreeMap::new();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(map.insert(key, value), model.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                }
            }
            map.check_consistency();
        }
        prop_assert!(map.iter().eq(model.iter()));
    }
}
