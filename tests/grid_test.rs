//! Tests for the grid model.

use poison_game::{enumerate_unclaimed, ClaimedSet, Coord};

#[test]
fn test_in_bounds_across_sizes() {
    for size in 3..=10u8 {
        assert!(Coord::new(1, 1).in_bounds(size));
        assert!(Coord::new(size, size).in_bounds(size));
        assert!(!Coord::new(0, 1).in_bounds(size));
        assert!(!Coord::new(1, 0).in_bounds(size));
        assert!(!Coord::new(size + 1, 1).in_bounds(size));
        assert!(!Coord::new(1, size + 1).in_bounds(size));
    }
}

#[test]
fn test_claimed_set_refuses_duplicates() {
    let mut claimed = ClaimedSet::new(5);
    assert!(claimed.push(Coord::new(2, 3)));
    assert!(!claimed.push(Coord::new(2, 3)));
    assert_eq!(claimed.len(), 1);
    assert!(claimed.contains(Coord::new(2, 3)));
    assert!(!claimed.contains(Coord::new(3, 2)));
}

#[test]
fn test_claimed_set_preserves_order() {
    let mut claimed = ClaimedSet::new(4);
    let sequence = [Coord::new(4, 1), Coord::new(1, 4), Coord::new(2, 2)];
    for c in sequence {
        assert!(claimed.push(c));
    }
    assert_eq!(claimed.as_slice(), &sequence);
}

#[test]
fn test_enumerate_unclaimed_full_board() {
    let claimed = ClaimedSet::new(3);
    let free = enumerate_unclaimed(3, &claimed, &[]);
    assert_eq!(free.len(), 9);
    // Row-major: first row first, columns ascending within it.
    assert_eq!(free[0], Coord::new(1, 1));
    assert_eq!(free[1], Coord::new(2, 1));
    assert_eq!(free[3], Coord::new(1, 2));
    assert_eq!(free[8], Coord::new(3, 3));
}

#[test]
fn test_enumerate_unclaimed_excludes_claims_and_exclusions() {
    let mut claimed = ClaimedSet::new(3);
    claimed.push(Coord::new(1, 1));
    claimed.push(Coord::new(2, 2));

    let own_poison = Coord::new(3, 3);
    let free = enumerate_unclaimed(3, &claimed, &[own_poison]);
    assert_eq!(free.len(), 6);
    assert!(!free.contains(&Coord::new(1, 1)));
    assert!(!free.contains(&Coord::new(2, 2)));
    assert!(!free.contains(&own_poison));
}

#[test]
fn test_enumerate_unclaimed_empty_when_everything_taken() {
    let mut claimed = ClaimedSet::new(3);
    for y in 1..=3 {
        for x in 1..=3 {
            claimed.push(Coord::new(x, y));
        }
    }
    assert!(enumerate_unclaimed(3, &claimed, &[]).is_empty());
}
