//! Tests for union_find module

use wiretrack::UnionFind;

#[test]
fn test_basic_operations() {
    let mut uf: UnionFind<i32> = UnionFind::new();

    uf.make_set(1);
    uf.make_set(2);
    uf.make_set(3);

    assert!(!uf.connected(&1, &2));

    uf.union(&1, &2);
    assert!(uf.connected(&1, &2));
    assert!(!uf.connected(&1, &3));
}

#[test]
fn test_path_compression() {
    let mut uf: UnionFind<i32> = UnionFind::new();

    // Create chain: 1 -> 2 -> 3 -> 4
    uf.make_set(1);
    uf.make_set(2);
    uf.make_set(3);
    uf.make_set(4);

    uf.union(&1, &2);
    uf.union(&2, &3);
    uf.union(&3, &4);

    // After find, all should point to same root
    let root = uf.find(&1);
    assert_eq!(uf.find(&2), root);
    assert_eq!(uf.find(&3), root);
    assert_eq!(uf.find(&4), root);
}

#[test]
fn test_groups() {
    let mut uf: UnionFind<usize> = UnionFind::new();

    for element in 0..4 {
        uf.make_set(element);
    }
    uf.union(&0, &1);
    uf.union(&2, &3);

    let groups = uf.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&0], vec![0, 1]);
    assert_eq!(groups[&2], vec![2, 3]);
}

#[test]
fn test_groups_deterministic() {
    // Run multiple times - results should be identical despite HashMap
    // iteration being random.
    let results: Vec<_> = (0..5)
        .map(|_| {
            let mut uf: UnionFind<usize> = UnionFind::new();

            for element in [7, 0, 3, 5, 1] {
                uf.make_set(element);
            }
            uf.union(&0, &7);
            uf.union(&3, &5);

            uf.groups()
        })
        .collect();

    for other in &results[1..] {
        assert_eq!(results[0].len(), other.len());
        for (root, members) in &results[0] {
            assert_eq!(Some(members), other.get(root));
        }
    }
}

#[test]
fn test_groups_keyed_by_smallest_member() {
    let mut uf: UnionFind<usize> = UnionFind::new();

    for element in [9, 4, 2] {
        uf.make_set(element);
    }
    uf.union(&9, &2);

    let groups = uf.groups();
    assert!(groups.contains_key(&2));
    assert_eq!(groups[&2], vec![2, 9]);
    assert_eq!(groups[&4], vec![4]);
}

#[test]
fn test_find_adds_unknown_elements() {
    let mut uf: UnionFind<i32> = UnionFind::new();
    assert_eq!(uf.find(&42), 42);
    assert_eq!(uf.len(), 1);
}

#[test]
fn test_union_is_idempotent() {
    let mut uf: UnionFind<i32> = UnionFind::new();
    uf.make_set(1);
    uf.make_set(2);

    uf.union(&1, &2);
    uf.union(&1, &2);
    uf.union(&2, &1);

    assert_eq!(uf.groups().len(), 1);
}
