//! # Grid Scenario Tests
//!
//! End-to-end passes through the public facade, packed and indirect.

use std::cell::RefCell;
use std::rc::Rc;

use hshg_core::{Body, ConfigError, GridConfig, Hshg2d, Hshg3d, HshgError, PackedEntity};

#[derive(Debug, Clone, PartialEq)]
struct Particle {
    position: [f32; 3],
    radius: f32,
    hits: u32,
}

impl Particle {
    fn new(position: [f32; 3], radius: f32) -> Self {
        Self {
            position,
            radius,
            hits: 0,
        }
    }
}

impl Body<3> for Particle {
    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

fn references(found: &[PackedEntity<2>]) -> Vec<u32> {
    let mut refs: Vec<u32> = found.iter().map(|entity| entity.reference).collect();
    refs.sort_unstable();
    refs
}

fn record_pairs(grid: &mut Hshg2d) -> Rc<RefCell<Vec<(u32, u32)>>> {
    let pairs = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&pairs);
    grid.set_collide(move |a: &mut PackedEntity<2>, b: &mut PackedEntity<2>| {
        sink.borrow_mut()
            .push((a.reference.min(b.reference), a.reference.max(b.reference)));
    });
    pairs
}

/// Test: small entity near a huge one, one collision and a point query.
#[test]
fn test_single_collision_and_point_query() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 100)).unwrap();
    grid.insert([10.0, 20.0], 5.0, 1).unwrap();
    grid.insert([20.0, 0.0], 100.0, 2).unwrap();

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), vec![(1, 2)]);

    let found = grid.query_collect([20.0, 0.0], [20.0, 0.0]).unwrap();
    assert_eq!(references(&found), vec![2]);
}

/// Test: a query over the whole arena reports every entity exactly once.
#[test]
fn test_full_arena_query() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 64)).unwrap();
    for i in 0..64u32 {
        let (x, y) = ((i % 8) as f32 * 8.0 + 1.0, (i / 8) as f32 * 8.0 + 1.0);
        grid.insert([x, y], (i % 5) as f32 + 0.5, i + 1).unwrap();
    }
    let found = grid.query_collect([0.0, 0.0], [64.0, 64.0]).unwrap();
    assert_eq!(references(&found), (1..=64).collect::<Vec<_>>());
}

/// Test: spheres whose surfaces touch exactly still collide.
#[test]
fn test_touching_spheres_collide() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 10)).unwrap();
    grid.insert([10.0, 10.0], 1.0, 1).unwrap();
    grid.insert([12.0, 10.0], 1.0, 2).unwrap();
    grid.insert([14.5, 10.0], 1.0, 3).unwrap();

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), vec![(1, 2)]);
}

/// Test: an entity moved in update is found at its new place only.
#[test]
fn test_update_move_is_rebucketed() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 10)).unwrap();
    grid.insert([1.0, 1.0], 1.0, 1).unwrap();
    grid.insert([40.0, 40.0], 1.0, 2).unwrap();

    grid.set_update(|mut entity| {
        if entity.reference == 1 {
            entity.position = [40.5, 40.0];
        }
    });
    grid.update().unwrap();

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), vec![(1, 2)]);
    assert!(grid.query_collect([0.0, 0.0], [8.0, 8.0]).unwrap().is_empty());
}

/// Test: growing an entity's radius moves it to a coarser level.
#[test]
fn test_update_grow_reaches_far_neighbour() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 10)).unwrap();
    grid.insert([8.0, 8.0], 1.0, 1).unwrap();
    grid.insert([30.0, 8.0], 1.0, 2).unwrap();

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    assert!(pairs.borrow().is_empty());

    grid.set_update(|mut entity| {
        if entity.reference == 1 {
            entity.radius = 21.0;
        }
    });
    grid.update().unwrap();
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), vec![(1, 2)]);
}

/// Test: a move made in the collision callback is queryable before the next update.
#[test]
fn test_collision_move_is_queryable_right_away() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 10)).unwrap();
    grid.insert([10.0, 10.0], 1.0, 1).unwrap();
    grid.insert([11.0, 10.0], 1.0, 2).unwrap();

    grid.set_collide(|a: &mut PackedEntity<2>, b: &mut PackedEntity<2>| {
        let pushed = if a.reference == 2 { a } else { b };
        pushed.position = [40.0, 10.0];
    });
    grid.collide().unwrap();

    let found = grid.query_collect([39.0, 9.0], [41.0, 11.0]).unwrap();
    assert_eq!(references(&found), vec![2]);
    let found = grid.query_collect([9.0, 9.0], [12.0, 11.0]).unwrap();
    assert_eq!(references(&found), vec![1]);

    grid.update().unwrap();
    let found = grid.query_collect([39.0, 9.0], [41.0, 11.0]).unwrap();
    assert_eq!(references(&found), vec![2]);
}

/// Test: a radius grown in the collision callback reaches a far entity on the next collide.
#[test]
fn test_collision_grow_is_rebucketed() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 10)).unwrap();
    grid.insert([10.0, 10.0], 1.0, 1).unwrap();
    grid.insert([11.0, 10.0], 1.0, 2).unwrap();
    grid.insert([50.0, 10.0], 1.0, 3).unwrap();

    grid.set_collide(|a: &mut PackedEntity<2>, b: &mut PackedEntity<2>| {
        for entity in [a, b] {
            if entity.reference == 1 {
                entity.radius = 45.0;
            }
        }
    });
    grid.collide().unwrap();

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    let mut found = pairs.take();
    found.sort_unstable();
    assert_eq!(found, vec![(1, 2), (1, 3)]);
}

/// Test: entities removed in update vanish from every later pass.
#[test]
fn test_packed_removal() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 4)).unwrap();
    for reference in 1..=4 {
        grid.insert([3.0 + reference as f32 * 0.75, 5.0], 1.0, reference).unwrap();
    }
    grid.set_update(|entity| {
        if entity.reference % 2 == 0 {
            entity.remove();
        }
    });
    grid.update().unwrap();
    assert_eq!(grid.len(), 2);

    let found = grid.query_collect([0.0, 0.0], [64.0, 64.0]).unwrap();
    assert_eq!(references(&found), vec![1, 3]);

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), vec![(1, 3)]);

    grid.insert([50.0, 50.0], 1.0, 9).unwrap();
    grid.insert([55.0, 50.0], 1.0, 10).unwrap();
    assert!(matches!(
        grid.insert([60.0, 50.0], 1.0, 11),
        Err(HshgError::CapacityExceeded { max_entities: 4 })
    ));
}

/// Test: removed host ids are handed out again.
#[test]
fn test_indirect_removal_reuses_ids() {
    let mut grid: Hshg3d<Particle> = Hshg3d::new(GridConfig::new(8, 2, 8)).unwrap();
    let a = grid.insert(Particle::new([1.0, 1.0, 1.0], 0.5)).unwrap();
    let b = grid.insert(Particle::new([1.5, 1.0, 1.0], 0.25)).unwrap();
    let c = grid.insert(Particle::new([9.0, 1.0, 1.0], 0.5)).unwrap();
    assert_eq!((a, b, c), (1, 2, 3));

    grid.set_update(|particle| {
        if particle.radius < 0.5 {
            particle.remove();
        }
    });
    grid.update().unwrap();
    assert_eq!(grid.len(), 2);
    assert!(grid.get(b).is_none());

    let pairs = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&pairs);
    grid.set_collide(move |first: &mut Particle, second: &mut Particle| {
        first.hits += 1;
        second.hits += 1;
        *sink.borrow_mut() += 1;
    });
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), 0);
    assert_eq!(grid.get(a).map(|p| p.hits), Some(0));

    let d = grid.insert(Particle::new([3.0, 3.0, 3.0], 0.5)).unwrap();
    assert_eq!(d, b);
    let ids: Vec<u32> = grid.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

/// Test: collision callbacks mutate the host objects themselves.
#[test]
fn test_indirect_collision_mutates_host_objects() {
    let mut grid: Hshg3d<Particle> = Hshg3d::new(GridConfig::new(8, 2, 10)).unwrap();
    let a = grid.insert(Particle::new([1.0, 1.0, 1.0], 0.5)).unwrap();
    let b = grid.insert(Particle::new([1.0, 1.0, 1.9], 0.5)).unwrap();
    let far = grid.insert(Particle::new([12.0, 12.0, 12.0], 0.5)).unwrap();

    grid.set_collide(|first: &mut Particle, second: &mut Particle| {
        first.hits += 1;
        second.hits += 1;
    });
    grid.collide().unwrap();
    grid.collide().unwrap();

    assert_eq!(grid.get(a).map(|p| p.hits), Some(2));
    assert_eq!(grid.get(b).map(|p| p.hits), Some(2));
    assert_eq!(grid.get(far).map(|p| p.hits), Some(0));

    let found = grid
        .query_collect([11.0, 11.0, 11.0], [13.0, 13.0, 13.0])
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].position, [12.0, 12.0, 12.0]);
}

/// Test: an indirect entity moved in update is re-bucketed.
#[test]
fn test_indirect_update_move() {
    let mut grid: Hshg3d<Particle> = Hshg3d::new(GridConfig::new(8, 2, 4)).unwrap();
    grid.insert(Particle::new([1.0, 1.0, 1.0], 0.5)).unwrap();
    grid.set_update(|mut particle| particle.position[2] = 12.0);
    grid.update().unwrap();

    let mut seen = 0;
    grid.query_with([0.0, 0.0, 11.0], [2.0, 2.0, 13.0], |_| seen += 1)
        .unwrap();
    assert_eq!(seen, 1);
    assert!(grid
        .query_collect([0.0, 0.0, 0.0], [2.0, 2.0, 2.0])
        .unwrap()
        .is_empty());
}

/// Test: capacity refusal leaves the host table untouched.
#[test]
fn test_indirect_capacity_exceeded() {
    let mut grid: Hshg3d<Particle> = Hshg3d::new(GridConfig::new(8, 2, 2)).unwrap();
    grid.insert(Particle::new([1.0; 3], 0.5)).unwrap();
    grid.insert(Particle::new([3.0; 3], 0.5)).unwrap();
    let err = grid.insert(Particle::new([5.0; 3], 0.5)).unwrap_err();
    assert!(matches!(err, HshgError::CapacityExceeded { max_entities: 2 }));
    assert_eq!(grid.iter().count(), 2);
}

/// Test: configuration problems surface before any memory is touched.
#[test]
fn test_configuration_errors() {
    assert!(matches!(
        GridConfig::from_toml_str("side = 12\ncell_size = 4\nmax_entities = 10\n"),
        Err(ConfigError::NotPowerOfTwo { field: "side", .. })
    ));
    assert!(matches!(
        Hshg2d::new(GridConfig::new(16, 3, 10)),
        Err(HshgError::Configuration(ConfigError::NotPowerOfTwo { field: "cell_size", .. }))
    ));
    assert!(matches!(
        Hshg2d::new(GridConfig::new(16, 4, 0)),
        Err(HshgError::Configuration(ConfigError::ZeroCapacity))
    ));
    assert!(GridConfig::from_toml_str("side = 16").is_err());
}

/// Test: negative and NaN radii are refused at insert.
#[test]
fn test_invalid_radius_rejected_at_insert() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 4)).unwrap();
    assert!(matches!(
        grid.insert([1.0, 1.0], -1.0, 1),
        Err(HshgError::InvalidRadius { .. })
    ));
    assert!(matches!(
        grid.insert([1.0, 1.0], f32::NAN, 2),
        Err(HshgError::InvalidRadius { .. })
    ));
    grid.insert([1.0, 1.0], 0.0, 3).unwrap();
    assert_eq!(grid.len(), 1);

    let mut hosted: Hshg3d<Particle> = Hshg3d::new(GridConfig::new(8, 2, 4)).unwrap();
    let err = hosted.insert(Particle::new([1.0; 3], -0.5)).unwrap_err();
    assert!(matches!(err, HshgError::InvalidRadius { .. }));
    assert_eq!(hosted.iter().count(), 0);
}

/// Test: an invalid radius set in update keeps the last committed radius.
#[test]
fn test_invalid_radius_from_update_keeps_committed() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 4, 4)).unwrap();
    grid.insert([10.0, 10.0], 2.0, 1).unwrap();
    grid.insert([13.0, 10.0], 2.0, 2).unwrap();
    grid.set_update(|mut entity| {
        if entity.reference == 1 {
            entity.radius = f32::NAN;
            entity.position[0] = 11.0;
        }
    });
    grid.update().unwrap();

    let found = grid.query_collect([10.5, 9.0], [11.5, 11.0]).unwrap();
    let moved = found.iter().find(|entity| entity.reference == 1).unwrap();
    assert_eq!(moved.radius, 2.0);
    assert_eq!(moved.position, [11.0, 10.0]);

    let pairs = record_pairs(&mut grid);
    grid.collide().unwrap();
    assert_eq!(*pairs.borrow(), vec![(1, 2)]);
}

/// Test: cell sizes whose arena exceeds `u32` are accepted.
#[test]
fn test_wide_arena_is_accepted() {
    let mut grid = Hshg2d::new(GridConfig::new(16, 1 << 30, 10)).unwrap();
    grid.insert([5.0, 5.0], 1.0, 1).unwrap();
    grid.insert([3.0e9, 5.0], 10.0, 2).unwrap();

    let found = grid.query_collect([0.0, 0.0], [100.0, 100.0]).unwrap();
    assert_eq!(references(&found), vec![1]);
    let found = grid.query_collect([2.9e9, 0.0], [3.1e9, 100.0]).unwrap();
    assert_eq!(references(&found), vec![2]);
}
