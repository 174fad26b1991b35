use std::collections::BTreeMap;

use rstar::primitives::{GeomWithData, Line};
use rstar::{PointDistance, RTree};

use super::LaneCandidate;

/// Geometry of one drivable lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneShape {
    pub lane_id: String,
    pub edge_id: String,
    pub points: Vec<(f64, f64)>,
}

impl LaneShape {
    pub fn new(
        lane_id: impl Into<String>,
        edge_id: impl Into<String>,
        points: Vec<(f64, f64)>,
    ) -> Self {
        Self {
            lane_id: lane_id.into(),
            edge_id: edge_id.into(),
            points,
        }
    }

    fn segments(&self) -> Vec<Line<[f64; 2]>> {
        match self.points.as_slice() {
            [] => Vec::new(),
            [only] => vec![Line::new([only.0, only.1], [only.0, only.1])],
            points => points
                .windows(2)
                .map(|pair| Line::new([pair[0].0, pair[0].1], [pair[1].0, pair[1].1]))
                .collect(),
        }
    }
}

type Segment = GeomWithData<Line<[f64; 2]>, usize>;

/// R-tree over lane segments. Each segment remembers the declaration order of
/// its lane, which doubles as the tie-break key.
pub struct LaneIndex {
    lanes: Vec<LaneShape>,
    tree: RTree<Segment>,
}

impl std::fmt::Debug for LaneIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneIndex")
            .field("lanes", &self.lanes.len())
            .field("segments", &self.tree.size())
            .finish()
    }
}

impl LaneIndex {
    pub fn new(lanes: Vec<LaneShape>) -> Self {
        let segments = lanes
            .iter()
            .enumerate()
            .flat_map(|(order, lane)| {
                lane.segments()
                    .into_iter()
                    .map(move |segment| GeomWithData::new(segment, order))
            })
            .collect();
        Self {
            lanes,
            tree: RTree::bulk_load(segments),
        }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn lanes(&self) -> &[LaneShape] {
        &self.lanes
    }

    /// Lanes whose polyline passes within `radius` of `(x, y)`, in declaration
    /// order, each with its point-to-polyline distance.
    pub fn lanes_within(&self, x: f64, y: f64, radius: f64) -> Vec<LaneCandidate> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let query = [x, y];
        let mut nearest: BTreeMap<usize, f64> = BTreeMap::new();
        for segment in self.tree.locate_within_distance(query, radius * radius) {
            let distance = segment.geom().distance_2(&query).sqrt();
            nearest
                .entry(segment.data)
                .and_modify(|best| *best = best.min(distance))
                .or_insert(distance);
        }

        nearest
            .into_iter()
            .filter_map(|(order, distance)| {
                self.lanes.get(order).map(|lane| LaneCandidate {
                    lane_id: lane.lane_id.clone(),
                    edge_id: lane.edge_id.clone(),
                    distance,
                    order,
                })
            })
            .collect()
    }
}
