//! KD-tree index over road network nodes for nearest-node snapping.
//!
//! Nodes are projected onto the unit sphere before insertion, so Euclidean
//! (chord) order equals great-circle order and a plain 3-D KD-tree answers
//! geographic nearest-neighbour queries. Reported distances are haversine
//! metres.
//!
//! # Serialization Format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: b"LRSI" (4 bytes)
//!   - Version: u8 (1 byte)
//!   - Flags: u8 (1 byte), reserved
//!   - Node count: u32 little endian (4 bytes)
//!   - Reserved: 6 bytes
//!
//! Body:
//!   - postcard-serialized Vec<IndexNode>
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geo::{Coordinate, EARTH_RADIUS_METERS};
use crate::network::{NetworkNode, NodeId};

const INDEX_MAGIC: &[u8; 4] = b"LRSI";
const INDEX_VERSION: u8 = 1;
const HEADER_SIZE: usize = 16;
const CHECKSUM_SIZE: usize = 32;
const COMPRESSION_LEVEL: i32 = 3;
const BUCKET_SIZE: usize = 32;

/// Relative slack when collecting equidistant candidates for tie-breaking.
const TIE_TOLERANCE: f64 = 1e-12;

/// Node entry stored in the index file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexNode {
    pub node_id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
}

impl IndexNode {
    fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Nearest-node index. Immutable once built.
///
/// Coincident nodes share one tree item, so any number of nodes may sit on
/// the same point.
pub struct SpatialIndex {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    nodes: Vec<IndexNode>,
    /// Node indexes per distinct point, ascending by node id.
    points: Vec<Vec<usize>>,
    id_to_index: HashMap<NodeId, usize>,
}

impl SpatialIndex {
    /// Build an index over the given nodes.
    pub fn build(nodes: &[NetworkNode]) -> Self {
        let entries = nodes
            .iter()
            .map(|node| IndexNode {
                node_id: node.id,
                latitude: node.coordinate.latitude,
                longitude: node.coordinate.longitude,
            })
            .collect();
        let index = Self::from_entries(entries);
        info!(node_count = index.len(), "built spatial index");
        index
    }

    fn from_entries(mut nodes: Vec<IndexNode>) -> Self {
        nodes.sort_by_key(|node| node.node_id);

        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        let mut id_to_index = HashMap::with_capacity(nodes.len());
        let mut point_ids: HashMap<[u64; 3], usize> = HashMap::with_capacity(nodes.len());
        let mut points: Vec<Vec<usize>> = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            id_to_index.insert(node.node_id, index);

            let position = node.coordinate().to_unit_vector();
            let key = position.map(f64::to_bits);
            match point_ids.get(&key) {
                Some(&point) => points[point].push(index),
                None => {
                    let point = points.len();
                    point_ids.insert(key, point);
                    points.push(vec![index]);
                    tree.add(&position, point);
                }
            }
        }

        Self {
            tree,
            nodes,
            points,
            id_to_index,
        }
    }

    /// Lowest-id node at a point.
    fn representative(&self, point: usize) -> usize {
        self.points[point][0]
    }

    fn expand<'a>(&'a self, points: impl Iterator<Item = usize> + 'a) -> impl Iterator<Item = usize> + 'a {
        points.flat_map(move |point| self.points[point].iter().copied())
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.id_to_index.contains_key(&node_id)
    }

    /// Whether the index holds exactly these nodes at these positions.
    pub fn covers(&self, nodes: &[NetworkNode]) -> bool {
        nodes.len() == self.nodes.len()
            && nodes.iter().all(|node| {
                self.id_to_index.get(&node.id).is_some_and(|&index| {
                    let entry = &self.nodes[index];
                    entry.latitude == node.coordinate.latitude
                        && entry.longitude == node.coordinate.longitude
                })
            })
    }

    /// Nearest node and its distance in metres. Equidistant nodes resolve to
    /// the lowest id.
    pub fn nearest(&self, coordinate: &Coordinate) -> Option<(NodeId, f64)> {
        if self.nodes.is_empty() {
            return None;
        }

        let query = coordinate.to_unit_vector();
        let closest = self.tree.nearest_n::<SquaredEuclidean>(&query, 1);
        let best = closest.first()?.distance;

        let slack = best * TIE_TOLERANCE + f64::EPSILON;
        let ties = self.tree.within::<SquaredEuclidean>(&query, best + slack);
        let index = ties
            .into_iter()
            .map(|neighbour| self.representative(neighbour.item))
            .min_by_key(|&index| self.nodes[index].node_id)
            .unwrap_or_else(|| self.representative(closest[0].item));

        let node = &self.nodes[index];
        Some((node.node_id, coordinate.distance_to(&node.coordinate())))
    }

    /// Up to `k` nearest nodes as (id, metres), closest first, ties by id.
    pub fn nearest_n(&self, coordinate: &Coordinate, k: usize) -> Vec<(NodeId, f64)> {
        if k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let query = coordinate.to_unit_vector();
        let results = self.tree.nearest_n::<SquaredEuclidean>(&query, k);
        let mut hits =
            self.to_sorted_hits(coordinate, self.expand(results.into_iter().map(|n| n.item)));
        hits.truncate(k);
        hits
    }

    /// All nodes within `radius_meters` great-circle distance, closest first.
    pub fn within_radius(&self, coordinate: &Coordinate, radius_meters: f64) -> Vec<(NodeId, f64)> {
        if radius_meters.is_nan() || radius_meters < 0.0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let angle = (radius_meters / EARTH_RADIUS_METERS).min(std::f64::consts::PI);
        let chord = 2.0 * (angle / 2.0).sin();
        let squared = chord * chord * (1.0 + TIE_TOLERANCE) + f64::EPSILON;

        let query = coordinate.to_unit_vector();
        let results = self.tree.within::<SquaredEuclidean>(&query, squared);
        let mut hits =
            self.to_sorted_hits(coordinate, self.expand(results.into_iter().map(|n| n.item)));
        hits.retain(|(_, distance)| *distance <= radius_meters);
        hits
    }

    fn to_sorted_hits(
        &self,
        coordinate: &Coordinate,
        items: impl Iterator<Item = usize>,
    ) -> Vec<(NodeId, f64)> {
        let mut hits: Vec<(NodeId, f64)> = items
            .map(|index| {
                let node = &self.nodes[index];
                (node.node_id, coordinate.distance_to(&node.coordinate()))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        hits
    }

    /// Serialize the index to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            "saving spatial index"
        );

        let serialized =
            postcard::to_allocvec(&self.nodes).map_err(|e| Error::SpatialIndexSerialize {
                message: format!("postcard serialization failed: {e}"),
            })?;

        let compressed =
            zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
                Error::SpatialIndexSerialize {
                    message: format!("zstd compression failed: {e}"),
                }
            })?;

        let checksum = Sha256::digest(&compressed);
        let node_count = u32::try_from(self.nodes.len()).map_err(|_| Error::SpatialIndexSerialize {
            message: format!("too many nodes ({})", self.nodes.len()),
        })?;

        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(INDEX_MAGIC);
        header[4] = INDEX_VERSION;
        header[6..10].copy_from_slice(&node_count.to_le_bytes());

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&header)?;
        writer.write_all(&compressed)?;
        writer.write_all(&checksum)?;
        writer.flush()?;

        debug!(
            file_size = HEADER_SIZE + compressed.len() + CHECKSUM_SIZE,
            compressed_size = compressed.len(),
            "spatial index saved"
        );
        Ok(())
    }

    /// Load an index written by [`save`](Self::save), verifying header and checksum.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading spatial index");
        let load_error = |message: String| Error::SpatialIndexLoad {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| load_error(format!("failed to open file: {e}")))?;
        let file_size = file
            .metadata()
            .map_err(|e| load_error(format!("failed to stat file: {e}")))?
            .len() as usize;
        if file_size < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(load_error(format!("file too short ({file_size} bytes)")));
        }
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header)
            .map_err(|e| load_error(format!("failed to read header: {e}")))?;
        if &header[0..4] != INDEX_MAGIC {
            return Err(load_error("invalid magic bytes".to_string()));
        }
        if header[4] != INDEX_VERSION {
            return Err(load_error(format!(
                "unsupported version {} (expected {INDEX_VERSION})",
                header[4]
            )));
        }
        let node_count = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);

        let mut compressed = vec![0u8; file_size - HEADER_SIZE - CHECKSUM_SIZE];
        reader
            .read_exact(&mut compressed)
            .map_err(|e| load_error(format!("failed to read compressed data: {e}")))?;

        let mut stored_checksum = [0u8; CHECKSUM_SIZE];
        reader
            .read_exact(&mut stored_checksum)
            .map_err(|e| load_error(format!("failed to read checksum: {e}")))?;
        if Sha256::digest(&compressed).as_slice() != stored_checksum {
            return Err(load_error(
                "checksum mismatch, file may be corrupted".to_string(),
            ));
        }

        let decompressed = zstd::decode_all(compressed.as_slice())
            .map_err(|e| load_error(format!("zstd decompression failed: {e}")))?;
        let nodes: Vec<IndexNode> = postcard::from_bytes(&decompressed)
            .map_err(|e| load_error(format!("postcard deserialization failed: {e}")))?;

        if nodes.len() != node_count as usize {
            return Err(load_error(format!(
                "node count mismatch: header says {node_count}, body has {}",
                nodes.len()
            )));
        }

        let index = Self::from_entries(nodes);
        info!(node_count = index.len(), "loaded spatial index");
        Ok(index)
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

/// Path of the spatial index stored beside a network database:
/// `roads.db` -> `roads.db.spatial.bin`.
pub fn spatial_index_path(network_path: &Path) -> PathBuf {
    let mut path = network_path.as_os_str().to_owned();
    path.push(".spatial.bin");
    PathBuf::from(path)
}

/// Load the spatial index beside a network database, or `None` when it is
/// missing or unreadable.
pub fn try_load_spatial_index(network_path: &Path) -> Option<SpatialIndex> {
    let index_path = spatial_index_path(network_path);
    if !index_path.exists() {
        return None;
    }

    match SpatialIndex::load(&index_path) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(
                path = %index_path.display(),
                error = %e,
                "failed to load spatial index, will rebuild"
            );
            None
        }
    }
}
