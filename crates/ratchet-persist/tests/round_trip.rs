//! Save/load round trips and malformed-file handling.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroU32;
use std::sync::Arc;

use proptest::prelude::*;
use ratchet_core::VectorError;
use ratchet_persist::codec::{HEADER_LEN, WORD};
use ratchet_persist::{load, load_from_path, save, save_to_path, LoadConfig, PersistError, MAGIC};
use ratchet_test_utils::{nz, TrackedRefcount, TrackedSerde};
use ratchet_vector::AtomicVector;

type IntVector = AtomicVector<NonZeroU32, Arc<TrackedRefcount>>;

fn ints(rc: &Arc<TrackedRefcount>, values: impl IntoIterator<Item = u32>) -> IntVector {
    let vec = IntVector::new(Arc::clone(rc));
    for v in values {
        vec.append(nz(v));
    }
    vec
}

fn patch(path: &std::path::Path, at: u64, bytes: &[u8]) {
    let mut f = OpenOptions::new().write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(at)).unwrap();
    f.write_all(bytes).unwrap();
}

#[test]
fn integers_round_trip_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ints.vec");
    let rc = Arc::new(TrackedRefcount::new(1000));
    let serde = TrackedSerde::new(Arc::clone(&rc));

    let original = ints(&rc, (0..5000).map(|i| i % 1000 + 1));
    save_to_path(&original, &serde, &path).unwrap();

    let mut back = IntVector::new(Arc::clone(&rc));
    let summary = load_from_path(&mut back, &serde, &path, &LoadConfig::default()).unwrap();
    assert_eq!(summary.elements, 5000);
    assert_eq!(back.len(), original.len());
    for i in 0..original.len() {
        assert_eq!(*back.get(i).unwrap(), *original.get(i).unwrap());
    }
    // Each vector holds exactly one reference per slot.
    assert_eq!(rc.total(), 10_000);
    drop(original);
    drop(back);
    rc.assert_clear();
}

#[test]
fn empty_vector_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.vec");
    let rc = Arc::new(TrackedRefcount::new(10));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    save_to_path(&ints(&rc, []), &serde, &path).unwrap();

    let mut back = IntVector::new(Arc::clone(&rc));
    let summary = load_from_path(&mut back, &serde, &path, &LoadConfig::default()).unwrap();
    assert_eq!(summary.elements, 0);
    assert_eq!(summary.end, HEADER_LEN);
    assert!(back.is_empty());
}

#[test]
fn consecutive_vectors_share_one_file() {
    let rc = Arc::new(TrackedRefcount::new(100));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    let first = ints(&rc, [1, 2, 3]);
    let second = ints(&rc, [40, 50]);

    let mut file = tempfile::tempfile().unwrap();
    save(&first, &serde, &mut file).unwrap();
    save(&second, &serde, &mut file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut a = IntVector::new(Arc::clone(&rc));
    let mut b = IntVector::new(Arc::clone(&rc));
    load(&mut a, &serde, &file, &LoadConfig::default()).unwrap();
    load(&mut b, &serde, &file, &LoadConfig::default()).unwrap();
    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 2);
    assert_eq!(*b.get(1).unwrap(), nz(50));
}

#[test]
fn bad_magic_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("magic.vec");
    let rc = Arc::new(TrackedRefcount::new(10));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    save_to_path(&ints(&rc, [1]), &serde, &path).unwrap();
    patch(&path, 0, &0x1977_0408i32.to_ne_bytes());

    let mut back = IntVector::new(Arc::clone(&rc));
    let err = load_from_path(&mut back, &serde, &path, &LoadConfig::default()).unwrap_err();
    assert!(
        matches!(err, PersistError::BadMagic { found } if found != MAGIC),
        "{err}"
    );
    assert!(back.is_empty());
}

#[test]
fn truncated_files_are_rejected() {
    let rc = Arc::new(TrackedRefcount::new(10));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    let mut file = tempfile::tempfile().unwrap();
    save(&ints(&rc, [1, 2, 3]), &serde, &mut file).unwrap();
    let full = file.metadata().unwrap().len();

    // Every cut must fail cleanly: in the header, the directory, or a payload.
    for cut in [0, 3, HEADER_LEN, HEADER_LEN + WORD, full - 1] {
        let mut copy = tempfile::tempfile().unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        std::io::copy(&mut (&file).take(cut), &mut copy).unwrap();
        copy.seek(SeekFrom::Start(0)).unwrap();

        let mut back = IntVector::new(Arc::clone(&rc));
        let result = load(&mut back, &serde, &copy, &LoadConfig::default());
        assert!(result.is_err(), "cut at {cut} loaded");
    }
}

#[test]
fn directory_pointing_outside_file_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dir.vec");
    let rc = Arc::new(TrackedRefcount::new(10));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    save_to_path(&ints(&rc, [1, 2]), &serde, &path).unwrap();
    patch(&path, HEADER_LEN + WORD, &(1usize << 40).to_ne_bytes());

    let mut back = IntVector::new(Arc::clone(&rc));
    let err = load_from_path(&mut back, &serde, &path, &LoadConfig::default()).unwrap_err();
    assert!(
        matches!(err, PersistError::CorruptDirectory { index: 1, .. }),
        "{err}"
    );
}

#[test]
fn oversized_payload_length_is_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("len.vec");
    let rc = Arc::new(TrackedRefcount::new(10));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    save_to_path(&ints(&rc, [7]), &serde, &path).unwrap();
    let first_entry = HEADER_LEN + WORD;
    patch(&path, first_entry, &usize::MAX.to_ne_bytes());

    let mut back = IntVector::new(Arc::clone(&rc));
    let err = load_from_path(&mut back, &serde, &path, &LoadConfig::default()).unwrap_err();
    assert!(
        matches!(err, PersistError::PayloadOutOfBounds { index: 0, .. }),
        "{err}"
    );
}

#[test]
fn load_into_non_empty_vector_is_refused() {
    let rc = Arc::new(TrackedRefcount::new(10));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    let mut file = tempfile::tempfile().unwrap();
    save(&ints(&rc, [1]), &serde, &mut file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut target = ints(&rc, [2]);
    let err = load(&mut target, &serde, &file, &LoadConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        PersistError::Vector(VectorError::NotEmpty { size: 1 })
    ));
    assert_eq!(target.len(), 1);
}

#[test]
fn save_races_concurrent_appends() {
    const FINAL: usize = 20_000;
    let rc = Arc::new(TrackedRefcount::new(1000));
    let serde = TrackedSerde::new(Arc::clone(&rc));
    let value = |i: usize| nz((i % 1000) as u32 + 1);
    let vec = ints(&rc, (0..100).map(|i| value(i).get()));

    let mut file = tempfile::tempfile().unwrap();
    let summary = std::thread::scope(|s| {
        s.spawn(|| {
            for i in 100..FINAL {
                vec.append(value(i));
            }
        });
        save(&vec, &serde, &mut file).unwrap()
    });
    assert_eq!(vec.len(), FINAL);
    assert!(summary.elements >= 100, "saved {}", summary.elements);

    file.seek(SeekFrom::Start(0)).unwrap();
    let mut back = IntVector::new(Arc::clone(&rc));
    let loaded = load(&mut back, &serde, &file, &LoadConfig::with_threads(4)).unwrap();
    assert_eq!(loaded.elements, summary.elements);
    assert_eq!(back.len(), summary.elements);
    for i in 0..back.len() {
        assert_eq!(*back.get(i).unwrap(), value(i), "index {i}");
    }
    drop(vec);
    drop(back);
    rc.assert_clear();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_integer_vector_round_trips(
        values in prop::collection::vec(1u32..=1000, 0..300),
        threads in 1usize..9,
    ) {
        let rc = Arc::new(TrackedRefcount::new(1000));
        let serde = TrackedSerde::new(Arc::clone(&rc));
        let original = ints(&rc, values.iter().copied());
        let mut file = tempfile::tempfile().unwrap();
        save(&original, &serde, &mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let mut back = IntVector::new(Arc::clone(&rc));
        load(&mut back, &serde, &file, &LoadConfig::with_threads(threads)).unwrap();
        prop_assert_eq!(back.len(), values.len());
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(*back.get(i).unwrap(), nz(v));
        }
        drop(original);
        drop(back);
        prop_assert_eq!(rc.total(), 0);
    }
}
