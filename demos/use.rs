use avlbst::{AvlTreeMap, KeyError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut map = AvlTreeMap::new();
    map.insert(0, "zero");
    map.insert(1, "one");
    map.insert(2, "two");
    map.insert(2, "two");
    map.insert(3, "three");
    map.insert(4, "four");
    map.insert(5, "five");
    assert_eq!(map.get(&1), Some(&"one"));
    map.remove(&1);
    assert!(map.get(&1).is_none());
    assert_eq!(map.try_index(&1), Err(KeyError));

    for (k, v) in &map {
        println!("{k} => {v}");
    }

    let mut cursor = map.find(&3);
    cursor.move_prev();
    println!("before 3: {:?}", cursor.key_value());

    println!("height {}, balanced {}", map.height(), map.is_balanced());
}
