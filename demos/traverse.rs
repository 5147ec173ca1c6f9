use std::collections::VecDeque;

use avlbst::AvlTreeMap;

fn main() {
    let map: AvlTreeMap<_, _> = (1..=6).map(|k| (k, k.to_string())).collect();

    println!("Level-order traversal:");
    let mut queue: VecDeque<_> = map.root().into_iter().collect();
    while let Some(node) = queue.pop_front() {
        println!(
            "Key: {}, Value: {}, Balance: {}",
            node.key(),
            node.value(),
            node.balance()
        );
        queue.extend(node.left());
        queue.extend(node.right());
    }

    print!("Forward:");
    let mut cursor = map.begin();
    while let Some(key) = cursor.key() {
        print!(" {key}");
        cursor.move_next();
    }
    println!();

    print!("Backward:");
    let mut cursor = map.find(&6);
    while let Some(key) = cursor.key() {
        print!(" {key}");
        cursor.move_prev();
    }
    println!();
}
