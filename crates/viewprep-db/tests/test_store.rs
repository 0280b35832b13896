use viewprep_db::{
    codec::{pair_id, unpair_id},
    CameraModelId, DatabaseError, Matrix, ProjectStore,
};

#[test]
fn test_pair_id_bijection() -> Result<(), Box<dyn std::error::Error>> {
    let ids = [0u32, 1, 2, 3, 17, 4096, 65_535, 1 << 20, (1 << 31) - 2, (1 << 31) - 1];
    let mut keys = std::collections::HashSet::new();
    for (i, &a) in ids.iter().enumerate() {
        for &b in ids.iter().skip(i + 1) {
            let key = pair_id(a, b)?;
            assert_eq!(key, pair_id(b, a)?);
            assert_eq!(unpair_id(key)?, (a.min(b), a.max(b)));
            assert!(keys.insert(key), "duplicate key for ({a}, {b})");
        }
    }
    Ok(())
}

#[test]
fn test_failed_inserts_do_not_mutate() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut store = ProjectStore::open(dir.path().join("database.db"))?;
    store.create_schema()?;

    let camera_id = store.add_camera(CameraModelId::Pinhole, 640, 480, &[500.0, 500.0, 320.0, 240.0], false)?;
    store.add_image("000.png", camera_id, None)?;
    let before = store.list_images()?;

    assert!(matches!(
        store.add_image("001.png", camera_id + 1, None),
        Err(DatabaseError::UnknownCamera(id)) if id == camera_id + 1
    ));
    assert!(matches!(
        store.add_image("000.png", camera_id, None),
        Err(DatabaseError::DuplicateName(_))
    ));
    assert_eq!(store.list_images()?, before);

    // the next successful insert still gets the next id
    let id = store.add_image("001.png", camera_id, None)?;
    assert_eq!(id, before[0].0 + 1);

    store.close()?;
    Ok(())
}

#[test]
fn test_feature_alignment_survives_rewrite() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ProjectStore::open_in_memory()?;
    store.create_schema()?;
    let camera_id = store.add_camera(CameraModelId::SimplePinhole, 100, 100, &[80.0, 50.0, 50.0], false)?;
    let id = store.add_image("a.png", camera_id, None)?;

    let n = 5u32;
    let keypoints = Matrix::from_shape_vec(n, 2, (0..n * 2).map(|v| v as f32).collect())?;
    let descriptors = Matrix::from_shape_vec(n, 4, (0..n * 4).map(|v| v as f32 * 0.5).collect())?;
    store.add_keypoints(id, &keypoints)?;
    store.add_descriptors(id, &descriptors)?;

    let kps = store.keypoints(id)?.expect("keypoints");
    let desc = store.descriptors(id)?.expect("descriptors");
    assert_eq!(kps.rows(), desc.rows());
    for i in 0..n {
        assert_eq!(kps.row(i), keypoints.row(i));
        assert_eq!(desc.row(i), descriptors.row(i));
    }
    Ok(())
}

#[test]
fn test_misaligned_descriptors_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ProjectStore::open_in_memory()?;
    store.create_schema()?;
    let camera_id = store.add_camera(CameraModelId::SimplePinhole, 100, 100, &[80.0, 50.0, 50.0], false)?;
    let id = store.add_image("a.png", camera_id, None)?;

    let keypoints = Matrix::from_shape_vec(5, 2, vec![1.0f32; 10])?;
    store.add_keypoints(id, &keypoints)?;

    let short = Matrix::from_shape_vec(3, 4, vec![0.5f32; 12])?;
    assert!(matches!(
        store.add_descriptors(id, &short),
        Err(DatabaseError::InvalidShape(_))
    ));
    assert_eq!(store.descriptors(id)?, None);

    let aligned = Matrix::from_shape_vec(5, 4, vec![0.5f32; 20])?;
    store.add_descriptors(id, &aligned)?;
    assert_eq!(store.descriptors(id)?.map(|d| d.rows()), Some(5));

    // a failed rewrite keeps the aligned record
    assert!(store.add_descriptors(id, &short).is_err());
    assert_eq!(store.descriptors(id)?, Some(aligned));
    Ok(())
}

#[test]
fn test_list_images_keeps_registration_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ProjectStore::open_in_memory()?;
    store.create_schema()?;
    let camera_id = store.add_camera(CameraModelId::SimplePinhole, 100, 100, &[90.0, 50.0, 50.0], false)?;

    let names = ["d.jpg", "b.jpg", "c.jpg", "a.jpg"];
    for name in names {
        store.add_image(name, camera_id, None)?;
    }
    let listed = store.list_images()?;
    assert_eq!(
        listed.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>(),
        names
    );
    assert_eq!(listed.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    Ok(())
}
