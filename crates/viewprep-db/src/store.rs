use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    codec::{decode_matrix, encode_matrix, pair_id, Matrix, MatrixBlob},
    error::DatabaseError,
    types::{
        Camera, CameraId, CameraModelId, Image, ImageId, PriorPose, TwoViewGeometry,
        TwoViewGeometryConfig,
    },
};

/// Element type of the `keypoints` table.
pub type KeypointElement = f32;

/// Element type of the `descriptors` table.
pub type DescriptorElement = f32;

/// Element type of the `matches` and `two_view_geometries` tables.
pub type MatchElement = u32;

// NOTE: the column layout must stay byte-compatible with the reconstruction engine.
const CREATE_CAMERAS_TABLE: &str = "CREATE TABLE IF NOT EXISTS cameras (
    camera_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    model INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    params BLOB,
    prior_focal_length INTEGER NOT NULL);";

const CREATE_IMAGES_TABLE: &str = "CREATE TABLE IF NOT EXISTS images (
    image_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    camera_id INTEGER NOT NULL,
    prior_qw REAL,
    prior_qx REAL,
    prior_qy REAL,
    prior_qz REAL,
    prior_tx REAL,
    prior_ty REAL,
    prior_tz REAL,
    CONSTRAINT image_id_check CHECK(image_id >= 0 and image_id < 2147483647),
    FOREIGN KEY(camera_id) REFERENCES cameras(camera_id));";

const CREATE_KEYPOINTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS keypoints (
    image_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB,
    FOREIGN KEY(image_id) REFERENCES images(image_id) ON DELETE CASCADE);";

const CREATE_DESCRIPTORS_TABLE: &str = "CREATE TABLE IF NOT EXISTS descriptors (
    image_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB,
    FOREIGN KEY(image_id) REFERENCES images(image_id) ON DELETE CASCADE);";

const CREATE_MATCHES_TABLE: &str = "CREATE TABLE IF NOT EXISTS matches (
    pair_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB);";

const CREATE_TWO_VIEW_GEOMETRIES_TABLE: &str = "CREATE TABLE IF NOT EXISTS two_view_geometries (
    pair_id INTEGER PRIMARY KEY NOT NULL,
    rows INTEGER NOT NULL,
    cols INTEGER NOT NULL,
    data BLOB,
    config INTEGER NOT NULL,
    F BLOB,
    E BLOB,
    H BLOB,
    qvec BLOB,
    tvec BLOB);";

const CREATE_NAME_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS index_name ON images(name);";

/// A handle to a project database file.
///
/// The handle is the single writer of the file while it is open. Every
/// mutation runs in its own transaction, so a failed call leaves the file
/// untouched. The connection is released on [`ProjectStore::close`] or when
/// the handle is dropped.
pub struct ProjectStore {
    conn: Connection,
}

impl ProjectStore {
    /// Open the database at `path`, creating an empty file if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create the six tables and the name index if they do not exist yet.
    ///
    /// Existing rows are never touched.
    pub fn create_schema(&mut self) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        for statement in [
            CREATE_CAMERAS_TABLE,
            CREATE_IMAGES_TABLE,
            CREATE_KEYPOINTS_TABLE,
            CREATE_DESCRIPTORS_TABLE,
            CREATE_MATCHES_TABLE,
            CREATE_TWO_VIEW_GEOMETRIES_TABLE,
            CREATE_NAME_INDEX,
        ] {
            tx.execute_batch(statement)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Flush and release the connection.
    pub fn close(self) -> Result<(), DatabaseError> {
        self.conn.close().map_err(|(_, e)| DatabaseError::from(e))
    }

    /// Insert a camera and return its id.
    pub fn add_camera(
        &mut self,
        model: CameraModelId,
        width: u64,
        height: u64,
        params: &[f64],
        prior_focal_length: bool,
    ) -> Result<CameraId, DatabaseError> {
        check_params(model, params)?;
        let blob = params_blob(params)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO cameras (model, width, height, params, prior_focal_length) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![model.tag(), width as i64, height as i64, blob, prior_focal_length as i64],
        )?;
        let camera_id = tx.last_insert_rowid() as CameraId;
        tx.commit()?;

        log::debug!("added camera {camera_id} ({model})");
        Ok(camera_id)
    }

    /// Replace the model, size and parameters of an existing camera.
    ///
    /// The focal length is marked as a trusted prior afterwards.
    pub fn update_camera(
        &mut self,
        camera_id: CameraId,
        model: CameraModelId,
        width: u64,
        height: u64,
        params: &[f64],
    ) -> Result<(), DatabaseError> {
        check_params(model, params)?;
        let blob = params_blob(params)?;

        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE cameras SET model = ?1, width = ?2, height = ?3, params = ?4, prior_focal_length = 1 WHERE camera_id = ?5",
            params![model.tag(), width as i64, height as i64, blob, camera_id],
        )?;
        if updated == 0 {
            return Err(DatabaseError::UnknownCamera(camera_id));
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert an image and return its id.
    ///
    /// Fails with [`DatabaseError::UnknownCamera`] or
    /// [`DatabaseError::DuplicateName`] without modifying the store.
    pub fn add_image(
        &mut self,
        name: &str,
        camera_id: CameraId,
        prior: Option<PriorPose>,
    ) -> Result<ImageId, DatabaseError> {
        let tx = self.conn.transaction()?;

        if !exists(&tx, "SELECT 1 FROM cameras WHERE camera_id = ?1", camera_id)? {
            return Err(DatabaseError::UnknownCamera(camera_id));
        }
        let taken = tx
            .query_row("SELECT 1 FROM images WHERE name = ?1", [name], |_| Ok(()))
            .optional()?
            .is_some();
        if taken {
            return Err(DatabaseError::DuplicateName(name.to_string()));
        }

        let q = prior.map(|p| p.qvec);
        let t = prior.map(|p| p.tvec);
        tx.execute(
            "INSERT INTO images (name, camera_id, prior_qw, prior_qx, prior_qy, prior_qz, prior_tx, prior_ty, prior_tz)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                name,
                camera_id,
                q.map(|q| q[0]),
                q.map(|q| q[1]),
                q.map(|q| q[2]),
                q.map(|q| q[3]),
                t.map(|t| t[0]),
                t.map(|t| t[1]),
                t.map(|t| t[2]),
            ],
        )?;
        let image_id = tx.last_insert_rowid() as ImageId;
        tx.commit()?;

        log::debug!("added image {image_id} `{name}`");
        Ok(image_id)
    }

    /// Insert or replace the keypoints of an image.
    pub fn add_keypoints(
        &mut self,
        image_id: ImageId,
        keypoints: &Matrix<KeypointElement>,
    ) -> Result<(), DatabaseError> {
        if keypoints.cols() < 2 {
            return Err(DatabaseError::InvalidShape(format!(
                "keypoints need at least 2 columns, got {}",
                keypoints.cols()
            )));
        }
        self.put_image_record("keypoints", image_id, &encode_matrix(keypoints), None)
    }

    /// Insert or replace the descriptors of an image.
    ///
    /// Fails with [`DatabaseError::InvalidShape`] if the image already has
    /// keypoints and the row counts differ.
    pub fn add_descriptors(
        &mut self,
        image_id: ImageId,
        descriptors: &Matrix<DescriptorElement>,
    ) -> Result<(), DatabaseError> {
        self.put_image_record(
            "descriptors",
            image_id,
            &encode_matrix(descriptors),
            Some("keypoints"),
        )
    }

    /// Insert or replace the raw matches between two images.
    ///
    /// Column 0 of `matches` indexes keypoints of `id_a`, column 1 those of
    /// `id_b`. The record is stored with the smaller image id first.
    pub fn add_matches(
        &mut self,
        id_a: ImageId,
        id_b: ImageId,
        matches: &Matrix<MatchElement>,
    ) -> Result<(), DatabaseError> {
        let key = pair_id(id_a, id_b)?;
        let blob = encode_matrix(&oriented_matches(id_a, id_b, matches)?);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO matches (pair_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)",
            params![key as i64, blob.rows, blob.cols, blob.data],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace the verified geometry between two images.
    pub fn add_two_view_geometry(
        &mut self,
        id_a: ImageId,
        id_b: ImageId,
        matches: &Matrix<MatchElement>,
        geometry: &TwoViewGeometry,
    ) -> Result<(), DatabaseError> {
        let key = pair_id(id_a, id_b)?;
        let blob = encode_matrix(&oriented_matches(id_a, id_b, matches)?);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO two_view_geometries (pair_id, rows, cols, data, config, F, E, H, qvec, tvec)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                key as i64,
                blob.rows,
                blob.cols,
                blob.data,
                geometry.config.tag(),
                optional_blob(geometry.f.as_ref().map(|m| &m[..]), 3, 3)?,
                optional_blob(geometry.e.as_ref().map(|m| &m[..]), 3, 3)?,
                optional_blob(geometry.h.as_ref().map(|m| &m[..]), 3, 3)?,
                optional_blob(geometry.qvec.as_ref().map(|q| &q[..]), 4, 1)?,
                optional_blob(geometry.tvec.as_ref().map(|t| &t[..]), 3, 1)?,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// List `(image_id, name)` in the store's own physical order.
    ///
    /// This order is authoritative: it is how the reconstruction engine
    /// registered the images, not necessarily the insertion call order. The
    /// table itself is scanned; the name index would yield name order.
    pub fn list_images(&self) -> Result<Vec<(ImageId, String)>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT image_id, name FROM images NOT INDEXED")?;
        let images = stmt
            .query_map([], |row| Ok((row.get::<_, ImageId>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    /// Number of images in the store.
    pub fn num_images(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Read a camera by id.
    pub fn camera(&self, camera_id: CameraId) -> Result<Option<Camera>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT camera_id, model, width, height, params, prior_focal_length FROM cameras WHERE camera_id = ?1",
                [camera_id],
                read_camera_row,
            )
            .optional()?
            .map(Camera::try_from)
            .transpose()
    }

    /// Read all cameras ordered by id.
    pub fn cameras(&self) -> Result<Vec<Camera>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT camera_id, model, width, height, params, prior_focal_length FROM cameras ORDER BY camera_id",
        )?;
        let rows = stmt
            .query_map([], read_camera_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Camera::try_from).collect()
    }

    /// Read an image by id.
    pub fn image(&self, image_id: ImageId) -> Result<Option<Image>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT image_id, name, camera_id, prior_qw, prior_qx, prior_qy, prior_qz, prior_tx, prior_ty, prior_tz
                 FROM images WHERE image_id = ?1",
                [image_id],
                read_image_row,
            )
            .optional()?)
    }

    /// Read an image by name.
    pub fn image_by_name(&self, name: &str) -> Result<Option<Image>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT image_id, name, camera_id, prior_qw, prior_qx, prior_qy, prior_qz, prior_tx, prior_ty, prior_tz
                 FROM images WHERE name = ?1",
                [name],
                read_image_row,
            )
            .optional()?)
    }

    /// Read the keypoints of an image.
    pub fn keypoints(
        &self,
        image_id: ImageId,
    ) -> Result<Option<Matrix<KeypointElement>>, DatabaseError> {
        self.get_image_record("keypoints", image_id)
    }

    /// Read the descriptors of an image.
    pub fn descriptors(
        &self,
        image_id: ImageId,
    ) -> Result<Option<Matrix<DescriptorElement>>, DatabaseError> {
        self.get_image_record("descriptors", image_id)
    }

    /// Read the raw matches of a pair, oriented as `(id_a, id_b)`.
    pub fn matches(
        &self,
        id_a: ImageId,
        id_b: ImageId,
    ) -> Result<Option<Matrix<MatchElement>>, DatabaseError> {
        let key = pair_id(id_a, id_b)?;
        let blob = self
            .conn
            .query_row(
                "SELECT rows, cols, data FROM matches WHERE pair_id = ?1",
                [key as i64],
                read_blob_row,
            )
            .optional()?;

        blob.map(|b| -> Result<_, DatabaseError> {
            let stored = b.decode::<MatchElement>()?;
            Ok(if id_a > id_b {
                stored.reverse_columns()
            } else {
                stored
            })
        })
        .transpose()
    }

    /// Read the verified geometry of a pair, with matches oriented as `(id_a, id_b)`.
    pub fn two_view_geometry(
        &self,
        id_a: ImageId,
        id_b: ImageId,
    ) -> Result<Option<(Matrix<MatchElement>, TwoViewGeometry)>, DatabaseError> {
        let key = pair_id(id_a, id_b)?;
        let row = self
            .conn
            .query_row(
                "SELECT rows, cols, data, config, F, E, H, qvec, tvec FROM two_view_geometries WHERE pair_id = ?1",
                [key as i64],
                |row| {
                    Ok((
                        read_blob_row(row)?,
                        row.get::<_, i64>(3)?,
                        [
                            row.get::<_, Option<Vec<u8>>>(4)?,
                            row.get::<_, Option<Vec<u8>>>(5)?,
                            row.get::<_, Option<Vec<u8>>>(6)?,
                        ],
                        row.get::<_, Option<Vec<u8>>>(7)?,
                        row.get::<_, Option<Vec<u8>>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((blob, config, [f, e, h], qvec, tvec)) = row else {
            return Ok(None);
        };

        let stored = blob.decode::<MatchElement>()?;
        let matches = if id_a > id_b {
            stored.reverse_columns()
        } else {
            stored
        };

        let geometry = TwoViewGeometry {
            config: TwoViewGeometryConfig::from_tag(config)
                .ok_or(DatabaseError::UnknownTwoViewConfig(config))?,
            f: decode_fixed(f.as_deref(), 3, 3)?,
            e: decode_fixed(e.as_deref(), 3, 3)?,
            h: decode_fixed(h.as_deref(), 3, 3)?,
            qvec: decode_fixed(qvec.as_deref(), 4, 1)?,
            tvec: decode_fixed(tvec.as_deref(), 3, 1)?,
        };
        Ok(Some((matches, geometry)))
    }

    fn put_image_record(
        &mut self,
        table: &str,
        image_id: ImageId,
        blob: &MatrixBlob,
        aligned_with: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        if !exists(&tx, "SELECT 1 FROM images WHERE image_id = ?1", image_id)? {
            return Err(DatabaseError::UnknownImage(image_id));
        }
        if let Some(other) = aligned_with {
            let rows = tx
                .query_row(
                    &format!("SELECT rows FROM {other} WHERE image_id = ?1"),
                    [image_id],
                    |row| row.get::<_, u32>(0),
                )
                .optional()?;
            if let Some(rows) = rows.filter(|rows| *rows != blob.rows) {
                return Err(DatabaseError::InvalidShape(format!(
                    "{table} of image {image_id} have {} rows, {other} have {rows}",
                    blob.rows
                )));
            }
        }
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO {table} (image_id, rows, cols, data) VALUES (?1, ?2, ?3, ?4)"
            ),
            params![image_id, blob.rows, blob.cols, blob.data],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_image_record<T: crate::codec::BlobElement>(
        &self,
        table: &str,
        image_id: ImageId,
    ) -> Result<Option<Matrix<T>>, DatabaseError> {
        let blob = self
            .conn
            .query_row(
                &format!("SELECT rows, cols, data FROM {table} WHERE image_id = ?1"),
                [image_id],
                read_blob_row,
            )
            .optional()?;
        Ok(blob.map(|b| b.decode::<T>()).transpose()?)
    }
}

/// A camera row before its model tag and parameter blob are validated.
struct RawCamera {
    camera_id: CameraId,
    model: i64,
    width: i64,
    height: i64,
    params: Option<Vec<u8>>,
    prior_focal_length: bool,
}

impl TryFrom<RawCamera> for Camera {
    type Error = DatabaseError;

    fn try_from(raw: RawCamera) -> Result<Self, Self::Error> {
        let model =
            CameraModelId::from_tag(raw.model).ok_or(DatabaseError::UnknownCameraModel(raw.model))?;
        let bytes = raw.params.unwrap_or_default();
        let num_params = bytes.len() / std::mem::size_of::<f64>();
        let params = decode_matrix::<f64>(&bytes, num_params as u32, 1)?.into_vec();
        Ok(Camera {
            camera_id: raw.camera_id,
            model,
            width: raw.width as u64,
            height: raw.height as u64,
            params,
            prior_focal_length: raw.prior_focal_length,
        })
    }
}

fn read_camera_row(row: &Row<'_>) -> rusqlite::Result<RawCamera> {
    Ok(RawCamera {
        camera_id: row.get(0)?,
        model: row.get(1)?,
        width: row.get(2)?,
        height: row.get(3)?,
        params: row.get(4)?,
        prior_focal_length: row.get::<_, i64>(5)? != 0,
    })
}

fn read_image_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    let mut prior = [None::<f64>; 7];
    for (i, value) in prior.iter_mut().enumerate() {
        *value = row.get(3 + i)?;
    }
    let prior = match prior {
        [Some(qw), Some(qx), Some(qy), Some(qz), Some(tx), Some(ty), Some(tz)] => Some(PriorPose {
            qvec: [qw, qx, qy, qz],
            tvec: [tx, ty, tz],
        }),
        _ => None,
    };
    Ok(Image {
        image_id: row.get(0)?,
        name: row.get(1)?,
        camera_id: row.get(2)?,
        prior,
    })
}

fn read_blob_row(row: &Row<'_>) -> rusqlite::Result<MatrixBlob> {
    Ok(MatrixBlob {
        rows: row.get(0)?,
        cols: row.get(1)?,
        data: row.get::<_, Option<Vec<u8>>>(2)?.unwrap_or_default(),
    })
}

fn exists(conn: &Connection, sql: &str, id: u32) -> Result<bool, DatabaseError> {
    Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

fn check_params(model: CameraModelId, params: &[f64]) -> Result<(), DatabaseError> {
    if params.len() != model.num_params() {
        return Err(DatabaseError::InvalidParams {
            model,
            expected: model.num_params(),
            actual: params.len(),
        });
    }
    Ok(())
}

fn params_blob(params: &[f64]) -> Result<Vec<u8>, DatabaseError> {
    let matrix = Matrix::from_shape_vec(params.len() as u32, 1, params.to_vec())?;
    Ok(encode_matrix(&matrix).data)
}

fn optional_blob(
    values: Option<&[f64]>,
    rows: u32,
    cols: u32,
) -> Result<Option<Vec<u8>>, DatabaseError> {
    values
        .map(|v| -> Result<_, DatabaseError> {
            Ok(encode_matrix(&Matrix::from_shape_vec(rows, cols, v.to_vec())?).data)
        })
        .transpose()
}

fn decode_fixed<const N: usize>(
    bytes: Option<&[u8]>,
    rows: u32,
    cols: u32,
) -> Result<Option<[f64; N]>, DatabaseError> {
    let Some(bytes) = bytes else {
        return Ok(None);
    };
    let values = decode_matrix::<f64>(bytes, rows, cols)?.into_vec();
    let array: [f64; N] = values.try_into().map_err(|v: Vec<f64>| {
        DatabaseError::InvalidShape(format!("expected {N} values, got {}", v.len()))
    })?;
    Ok(Some(array))
}

fn oriented_matches(
    id_a: ImageId,
    id_b: ImageId,
    matches: &Matrix<MatchElement>,
) -> Result<Matrix<MatchElement>, DatabaseError> {
    if matches.cols() != 2 {
        return Err(DatabaseError::InvalidShape(format!(
            "matches need 2 columns, got {}",
            matches.cols()
        )));
    }
    Ok(if id_a > id_b {
        matches.reverse_columns()
    } else {
        matches.clone()
    })
}
