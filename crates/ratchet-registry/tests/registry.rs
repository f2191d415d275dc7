//! Registry lifecycle, persistence, and concurrent use.

use std::sync::Arc;

use ratchet_persist::PersistError;
use ratchet_registry::{RegistryError, VectorRegistry};
use ratchet_tensor::{ElementKind, Tensor};
use ratchet_test_utils::{random_f32, run_on_all_cpus, seeded_rng};

fn float_tensor(seed: u64, n: usize) -> Arc<Tensor> {
    Arc::new(Tensor::from_f32(&[n], random_f32(&mut seeded_rng(seed), n)).unwrap())
}

#[test]
fn save_then_load_under_new_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.vec");
    let reg = VectorRegistry::new();
    reg.create("weights", ElementKind::Float);
    let v = reg.get("weights").unwrap();
    let tensors: Vec<_> = (0..40).map(|i| float_tensor(i, 10 + i as usize * 50)).collect();
    for t in &tensors {
        v.append(t).unwrap();
    }

    let saved = reg.save("weights", &path).unwrap();
    assert_eq!(saved.elements, 40);

    let loaded = reg.load("restored", ElementKind::Float, &path).unwrap();
    assert_eq!(loaded.elements, 40);
    let restored = reg.get("restored").unwrap();
    assert_eq!(restored.len(), 40);
    for (i, t) in tensors.iter().enumerate() {
        assert_eq!(*restored.read(i).unwrap(), **t);
    }
    assert_eq!(reg.names(), ["weights", "restored"]);
}

#[test]
fn load_refuses_taken_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v.vec");
    let reg = VectorRegistry::new();
    reg.create("v", ElementKind::Float);
    reg.save("v", &path).unwrap();

    let err = reg.load("v", ElementKind::Float, &path).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { ref name } if name == "v"));
}

#[test]
fn load_rejects_tensors_of_other_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.vec");
    let reg = VectorRegistry::new();
    reg.create("f", ElementKind::Float);
    reg.get("f").unwrap().append(&float_tensor(9, 4)).unwrap();
    reg.save("f", &path).unwrap();

    let err = reg.load("d", ElementKind::Double, &path).unwrap_err();
    assert!(
        matches!(
            err,
            RegistryError::Persist(PersistError::Decode { index: 0, .. })
        ),
        "{err}"
    );
    assert!(reg.get("d").is_err());
}

#[test]
fn save_of_unknown_name_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let reg = VectorRegistry::new();
    assert!(matches!(
        reg.save("nope", dir.path().join("x")),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn load_of_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let reg = VectorRegistry::new();
    let err = reg
        .load("m", ElementKind::Float, dir.path().join("absent"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Persist(PersistError::Io(_))));
    assert!(reg.is_empty());
}

#[test]
fn concurrent_appends_through_global_registry() {
    let reg = VectorRegistry::global();
    let name = "registry-test-concurrent";
    assert!(reg.create(name, ElementKind::Float));
    let t = float_tensor(1, 8);
    const PER_THREAD: usize = 200;

    let threads = run_on_all_cpus(|_| {
        let v = VectorRegistry::global().get(name).unwrap();
        for _ in 0..PER_THREAD {
            v.append(&t).unwrap();
        }
    });

    let v = reg.get(name).unwrap();
    assert_eq!(v.len(), threads * PER_THREAD);
    assert_eq!(Arc::strong_count(&t), threads * PER_THREAD + 1);
    assert!(reg.destroy(name));
    drop(v);
    assert_eq!(Arc::strong_count(&t), 1);
}
