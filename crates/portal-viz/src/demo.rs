//! Procedural demo levels.

use nalgebra::Point3;
use portal_raster::bsp::{LeafContents, LeafDesc, NodeId, Portal, Surface, SurfaceId};
use portal_raster::pvs::{compress_row, row_bytes};
use portal_raster::{Axis, BoundingBox, BspPlane, Level, LevelBuilder, LevelError};

/// Side length of a corridor room along x and z.
pub const ROOM_SIZE: i32 = 256;
/// Height of every room.
pub const ROOM_HEIGHT: i32 = 128;
/// Doorway opening between neighbouring rooms: x range and top edge.
pub const DOOR_X: [i32; 2] = [96, 160];
pub const DOOR_TOP: i32 = 96;

/// Where a camera standing in the first room starts.
pub fn spawn_point() -> Point3<i32> {
    Point3::new(ROOM_SIZE / 2, ROOM_HEIGHT / 2, ROOM_SIZE / 2)
}

/// A straight corridor of `rooms` box rooms along +z, each joined to the
/// next by a doorway.
///
/// The BSP is balanced: every interior node splits on a room boundary and
/// carries that boundary's doorway as its portal. With `pvs_radius` set,
/// each room's PVS holds the rooms at most that many steps away.
pub fn corridor(rooms: usize, pvs_radius: Option<usize>) -> Result<Level, LevelError> {
    let mut builder = LevelBuilder::new();
    if rooms == 0 {
        let sentinel = builder.sentinel();
        return builder.build(sentinel);
    }

    let leaf_count = rooms + 1;
    let mut leaves = Vec::with_capacity(rooms);
    for room in 0..rooms {
        let surfaces = room_surfaces(&mut builder, room, rooms);
        let z0 = room as i32 * ROOM_SIZE;
        let mut desc = LeafDesc::new(
            LeafContents::Regular,
            BoundingBox::new(
                Point3::new(0, 0, z0),
                Point3::new(ROOM_SIZE, ROOM_HEIGHT, z0 + ROOM_SIZE),
            ),
        )
        .with_surfaces(surfaces)
        .with_bsp_key(room as i32);

        if let Some(radius) = pvs_radius {
            desc = desc.with_pvs(pvs_row(room, rooms, radius, leaf_count));
        }
        leaves.push(builder.add_leaf(desc));
    }

    let root = split(&mut builder, &leaves, 0);
    builder.build(root)
}

/// Builds the subtree over `leaves`, whose first room has index `first`.
fn split(builder: &mut LevelBuilder, leaves: &[NodeId], first: usize) -> NodeId {
    if leaves.len() == 1 {
        return leaves[0];
    }

    let mid = leaves.len() / 2;
    let z = (first + mid) as i32 * ROOM_SIZE;
    let back = split(builder, &leaves[..mid], first);
    let front = split(builder, &leaves[mid..], first + mid);
    let door = builder.add_portal(doorway(z));
    builder.add_interior(BspPlane::axial(Axis::Z, z), front, back, Some(door))
}

fn doorway(z: i32) -> Portal {
    Portal::new(vec![
        Point3::new(DOOR_X[0], 0, z),
        Point3::new(DOOR_X[1], 0, z),
        Point3::new(DOOR_X[1], DOOR_TOP, z),
        Point3::new(DOOR_X[0], DOOR_TOP, z),
    ])
}

fn room_surfaces(builder: &mut LevelBuilder, room: usize, rooms: usize) -> Vec<SurfaceId> {
    let (z0, z1) = (room as i32 * ROOM_SIZE, (room as i32 + 1) * ROOM_SIZE);
    let (w, h) = (ROOM_SIZE, ROOM_HEIGHT);
    let mut quads = vec![
        // floor and ceiling
        [[0, 0, z0], [w, 0, z0], [w, 0, z1], [0, 0, z1]],
        [[0, h, z0], [0, h, z1], [w, h, z1], [w, h, z0]],
        // side walls
        [[0, 0, z0], [0, 0, z1], [0, h, z1], [0, h, z0]],
        [[w, 0, z0], [w, h, z0], [w, h, z1], [w, 0, z1]],
    ];
    if room == 0 {
        quads.push([[0, 0, z0], [0, h, z0], [w, h, z0], [w, 0, z0]]);
    }
    if room + 1 == rooms {
        quads.push([[0, 0, z1], [w, 0, z1], [w, h, z1], [0, h, z1]]);
    }

    quads
        .into_iter()
        .map(|quad| {
            let vertices = quad.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect();
            builder.add_surface(Surface::new(vertices))
        })
        .collect()
}

fn pvs_row(room: usize, rooms: usize, radius: usize, leaf_count: usize) -> Vec<u8> {
    let mut bits = vec![0; row_bytes(leaf_count)];
    let lo = room.saturating_sub(radius);
    let hi = (room + radius).min(rooms - 1);
    // Room r is leaf r + 1, stored at bit r.
    for other in lo..=hi {
        bits[other / 8] |= 1 << (other % 8);
    }
    compress_row(&bits)
}
