use std::{collections::HashMap, path::Path};

use viewprep_db::ImageId;
use viewprep_io::colmap::ColmapImage;

use crate::error::PipelineError;

/// Renumber the reference poses in the store's registration order.
///
/// The `k`-th entry of `store_order` (0-based) becomes the record with id
/// `k + 1`, carrying the pose and camera of the matching reference image.
/// A store name matches the reference image with the same name, or else the
/// only reference image with the same basename, so images registered under a
/// subdirectory still find their pose. The store name is kept in the output.
///
/// # Errors
///
/// [`PipelineError::PreconditionFailed`] if a stored image has no reference
/// pose, or only matches several reference images by basename.
pub fn reconcile_order(
    store_order: &[(ImageId, String)],
    reference: &[ColmapImage],
) -> Result<Vec<ColmapImage>, PipelineError> {
    let by_name = reference
        .iter()
        .map(|image| (image.name.as_str(), image))
        .collect::<HashMap<_, _>>();
    let mut by_basename = HashMap::<&str, Vec<&ColmapImage>>::new();
    for image in reference {
        by_basename.entry(basename(&image.name)).or_default().push(image);
    }

    store_order
        .iter()
        .enumerate()
        .map(|(idx, (_, name))| {
            let pose = match by_name.get(name.as_str()) {
                Some(pose) => *pose,
                None => match by_basename.get(basename(name)).map(Vec::as_slice) {
                    Some([pose]) => *pose,
                    Some(candidates) if !candidates.is_empty() => {
                        return Err(PipelineError::PreconditionFailed(format!(
                            "image {name} matches {} reference images by file name",
                            candidates.len()
                        )))
                    }
                    _ => {
                        return Err(PipelineError::PreconditionFailed(format!(
                            "image {name} is not part of the reference model"
                        )))
                    }
                },
            };
            Ok(ColmapImage {
                image_id: idx as ImageId + 1,
                rotation: pose.rotation,
                translation: pose.translation,
                camera_id: pose.camera_id,
                name: name.clone(),
                points2d: Vec::new(),
            })
        })
        .collect()
}

fn basename(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(image_id: ImageId, name: &str) -> ColmapImage {
        ColmapImage {
            image_id,
            rotation: [1.0, 0.0, 0.0, 0.0],
            translation: [image_id as f64, 0.0, 0.0],
            camera_id: 1,
            name: name.to_string(),
            points2d: vec![(1.0, 2.0, -1)],
        }
    }

    #[test]
    fn test_ids_follow_store_order() -> Result<(), PipelineError> {
        let reference = vec![pose(10, "a.jpg"), pose(20, "b.jpg"), pose(30, "c.jpg")];
        let store = vec![(1, "c.jpg".to_string()), (2, "a.jpg".to_string())];

        let records = reconcile_order(&store, &reference)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image_id, 1);
        assert_eq!(records[0].name, "c.jpg");
        assert_eq!(records[0].translation, [30.0, 0.0, 0.0]);
        assert_eq!(records[1].image_id, 2);
        assert_eq!(records[1].translation, [10.0, 0.0, 0.0]);
        assert!(records.iter().all(|r| r.points2d.is_empty()));
        Ok(())
    }

    #[test]
    fn test_lookup_by_basename() -> Result<(), PipelineError> {
        let reference = vec![pose(4, "frame.png")];
        let store = vec![(7, "cam0/frame.png".to_string())];
        let records = reconcile_order(&store, &reference)?;
        assert_eq!(records[0].name, "cam0/frame.png");
        assert_eq!(records[0].translation, [4.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_shared_basename() -> Result<(), PipelineError> {
        let reference = vec![pose(1, "left/frame.png"), pose(2, "right/frame.png")];

        // exact names are unambiguous
        let store = vec![(1, "right/frame.png".to_string())];
        assert_eq!(reconcile_order(&store, &reference)?[0].translation, [2.0, 0.0, 0.0]);

        let store = vec![(1, "frame.png".to_string())];
        assert!(matches!(
            reconcile_order(&store, &reference),
            Err(PipelineError::PreconditionFailed(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_image() {
        let res = reconcile_order(&[(1, "new.jpg".to_string())], &[pose(1, "old.jpg")]);
        assert!(matches!(res, Err(PipelineError::PreconditionFailed(_))));
    }
}
