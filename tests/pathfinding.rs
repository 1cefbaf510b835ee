use cgmath::Point3;
use voxel_volume_engine::{
    engine_state::voxels::worldgen::{FlatTerrain, TerrainGenerator},
    ChunkWorld, Mesher, PathOutcome, PathRequest, PathfindError, Stroke, Volume,
};

fn flat_world() -> ChunkWorld {
    let mut world = ChunkWorld::new(Volume::new(16, 8, 16, 8).unwrap(), Mesher::new());
    world.load_voxels(&FlatTerrain::new(1, 1).generate(16, 8, 16)).unwrap();
    world.flush();
    world
}

#[test]
fn reserved_cells_force_a_detour_until_released() {
    let mut world = flat_world();
    for z in 0..15 {
        world.obstacle(Point3::new(8, 1, z), true, 2);
    }
    let request = PathRequest::new(Point3::new(2, 1, 2), Point3::new(13, 1, 2));

    let detour = world.pathfind(&request).unwrap();
    assert_eq!(detour.outcome, PathOutcome::Complete);
    assert!(detour.waypoints.contains(&Point3::new(8, 1, 15)));
    assert_eq!(detour.len(), 38);

    for z in 0..15 {
        world.obstacle(Point3::new(8, 1, z), false, 2);
    }
    let direct = world.pathfind(&request).unwrap();
    assert_eq!(direct.outcome, PathOutcome::Complete);
    assert_eq!(direct.len(), 12);
    assert!(direct.waypoints.iter().all(|p| p.y == 1 && p.z == 2));
}

#[test]
fn agents_climb_stairs_one_cell_at_a_time() {
    let mut world = flat_world();
    let terrace = |_distance: f32, _current: u8, p: Point3<i32>| {
        if (p.x >= 10 && p.y <= 2) || (p.x == 9 && p.y == 1) {
            Some(1)
        } else {
            None
        }
    };
    world.update(Point3::new(12, 1, 8), 12, Stroke::Shape(&terrace));
    world.flush();

    let up = world
        .pathfind(&PathRequest::new(Point3::new(2, 1, 8), Point3::new(13, 3, 8)))
        .unwrap();
    assert_eq!(up.outcome, PathOutcome::Complete);
    assert_eq!(up.len(), 12);
    assert!(up.waypoints.contains(&Point3::new(9, 2, 8)));
    assert!(up.waypoints.contains(&Point3::new(10, 3, 8)));
    for pair in up.waypoints.windows(2) {
        assert!(pair[1].y - pair[0].y <= 1);
    }

    let down = world
        .pathfind(&PathRequest::new(Point3::new(13, 3, 8), Point3::new(2, 1, 8)))
        .unwrap();
    assert_eq!(down.outcome, PathOutcome::Complete);
    assert_eq!(down.waypoints.last(), Some(&Point3::new(2, 1, 8)));
}

#[test]
fn tall_agents_need_headroom() {
    let mut world = flat_world();
    // A ceiling two cells above the floor over the whole world except the start column.
    let ceiling = |_distance: f32, _current: u8, p: Point3<i32>| (p.y == 2 && p.x > 2).then_some(1);
    world.update(Point3::new(8, 2, 8), 12, Stroke::Shape(&ceiling));
    world.flush();

    let request = PathRequest::new(Point3::new(1, 1, 1), Point3::new(14, 1, 14));
    assert_eq!(world.pathfind(&request).unwrap().outcome, PathOutcome::Complete);

    let tall = world.pathfind(&request.with_height(2)).unwrap();
    assert_eq!(tall.outcome, PathOutcome::Unreachable);
    assert!(tall.is_empty());
    assert!(!tall.is_usable());
}

#[test]
fn endpoints_outside_the_volume_are_rejected() {
    let world = flat_world();
    let request = PathRequest::new(Point3::new(1, 1, 1), Point3::new(1, 1, 16));
    assert_eq!(
        world.pathfind(&request),
        Err(PathfindError::OutOfBounds {
            position: Point3::new(1, 1, 16)
        })
    );
}
