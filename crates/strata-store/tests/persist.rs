use strata_chunk::{Block, Chunk, ChunkBuf, ChunkState};
use strata_store::{FarStore, MemoryFarStore, StoreError, world_save_path};
use strata_world::ChunkCoord;

fn chunk_at(coord: ChunkCoord, marker: Block) -> Chunk {
    let mut buf = ChunkBuf::new_air(coord, 4, 4, 4);
    buf.set_local(0, 0, 0, marker);
    Chunk::new(buf, ChunkState::Complete)
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = world_save_path(dir.path(), "alpha");

    let store = MemoryFarStore::new();
    for (i, marker) in [Block::STONE, Block::DIRT, Block::SAND].into_iter().enumerate() {
        store.put(&chunk_at(ChunkCoord::new(i as i32, 0, -(i as i32)), marker)).unwrap();
    }
    store.dispose();
    store.save(&path).unwrap();
    assert!(path.exists());

    let loaded = MemoryFarStore::load(&path).unwrap();
    assert_eq!(loaded.len(), 3);
    assert!((loaded.size() - store.size()).abs() < f32::EPSILON);
    let c = loaded.get(ChunkCoord::new(1, 0, -1)).unwrap().unwrap();
    assert_eq!(c.read().unwrap().get_local(0, 0, 0), Block::DIRT);
    assert!(!loaded.is_closed());
}

#[test]
fn open_or_default_starts_empty_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryFarStore::open_or_default(&dir.path().join("missing.dat")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn version_mismatch_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.dat");
    let bytes = bincode::serialize(&(99u32, Vec::<u8>::new())).unwrap();
    std::fs::write(&path, bytes).unwrap();
    match MemoryFarStore::load(&path) {
        Err(StoreError::VersionMismatch { found, expected }) => {
            assert_eq!(found, 99);
            assert_eq!(expected, 1);
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("load should fail"),
    }
}

#[test]
fn save_into_unwritable_location_errors() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let store = MemoryFarStore::new();
    let err = store.save(&blocker.join("nested").join("w.dat"));
    assert!(matches!(err, Err(StoreError::Io(_))));
}
