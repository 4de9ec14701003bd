use crate::shared::region::FaceRegion;

/// Relative tolerance for treating two candidates as the same face.
pub const DEFAULT_GROUP_EPS: f64 = 0.2;

/// A raw detector hit before grouping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
}

impl Candidate {
    fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// Clusters overlapping candidates and keeps clusters with enough members.
///
/// Two candidates are neighbors when every edge differs by at most
/// `eps * (min width + min height) / 2`. Clusters are transitive. Each
/// surviving cluster is reported as the mean of its members, in the order
/// its first member was found.
pub struct CandidateGrouper {
    eps: f64,
}

impl CandidateGrouper {
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }

    pub fn group(
        &self,
        candidates: &[Candidate],
        min_neighbors: usize,
        width: u32,
        height: u32,
    ) -> Vec<FaceRegion> {
        let labels = self.partition(candidates);
        let cluster_count = labels.iter().copied().max().map_or(0, |m| m + 1);

        let mut sums = vec![[0.0f64; 4]; cluster_count];
        let mut counts = vec![0usize; cluster_count];
        for (c, &label) in candidates.iter().zip(&labels) {
            sums[label][0] += c.x1;
            sums[label][1] += c.y1;
            sums[label][2] += c.x2;
            sums[label][3] += c.y2;
            counts[label] += 1;
        }

        let threshold = min_neighbors.max(1);
        sums.iter()
            .zip(&counts)
            .filter(|(_, n)| **n >= threshold)
            .filter_map(|(s, &n)| {
                let n = n as f64;
                FaceRegion::from_corners(s[0] / n, s[1] / n, s[2] / n, s[3] / n, width, height)
            })
            .collect()
    }

    /// Union-find partition; labels are renumbered in first-seen order.
    fn partition(&self, candidates: &[Candidate]) -> Vec<usize> {
        let mut parent: Vec<usize> = (0..candidates.len()).collect();

        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                if self.similar(&candidates[i], &candidates[j]) {
                    let ri = find(&mut parent, i);
                    let rj = find(&mut parent, j);
                    if ri != rj {
                        parent[ri.max(rj)] = ri.min(rj);
                    }
                }
            }
        }

        let mut renumbered = vec![usize::MAX; candidates.len()];
        let mut next = 0;
        (0..candidates.len())
            .map(|i| {
                let root = find(&mut parent, i);
                if renumbered[root] == usize::MAX {
                    renumbered[root] = next;
                    next += 1;
                }
                renumbered[root]
            })
            .collect()
    }

    fn similar(&self, a: &Candidate, b: &Candidate) -> bool {
        let delta = self.eps * (a.width().min(b.width()) + a.height().min(b.height())) * 0.5;
        (a.x1 - b.x1).abs() <= delta
            && (a.y1 - b.y1).abs() <= delta
            && (a.x2 - b.x2).abs() <= delta
            && (a.y2 - b.y2).abs() <= delta
    }
}

impl Default for CandidateGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_EPS)
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cand(x: f64, y: f64, size: f64) -> Candidate {
        Candidate {
            x1: x,
            y1: y,
            x2: x + size,
            y2: y + size,
            score: 0.9,
        }
    }

    fn cluster_at(x: f64, y: f64, n: usize) -> Vec<Candidate> {
        (0..n).map(|i| cand(x + i as f64, y, 100.0)).collect()
    }

    #[test]
    fn test_empty_input_yields_no_regions() {
        let grouper = CandidateGrouper::default();
        assert!(grouper.group(&[], 1, 640, 480).is_empty());
    }

    #[test]
    fn test_cluster_reported_as_mean_box() {
        let grouper = CandidateGrouper::default();
        let candidates = vec![cand(10.0, 10.0, 100.0), cand(14.0, 12.0, 100.0)];
        let regions = grouper.group(&candidates, 2, 640, 480);
        assert_eq!(regions, vec![FaceRegion::new(12, 11, 100, 100)]);
    }

    #[rstest]
    #[case(4, 5, 0)]
    #[case(5, 5, 1)]
    #[case(9, 5, 1)]
    #[case(1, 0, 1)]
    fn test_min_neighbors_threshold(
        #[case] members: usize,
        #[case] min_neighbors: usize,
        #[case] expected: usize,
    ) {
        let grouper = CandidateGrouper::default();
        let regions = grouper.group(&cluster_at(50.0, 50.0, members), min_neighbors, 640, 480);
        assert_eq!(regions.len(), expected);
    }

    #[test]
    fn test_distant_candidates_form_separate_faces() {
        let grouper = CandidateGrouper::default();
        let mut candidates = cluster_at(0.0, 0.0, 3);
        candidates.extend(cluster_at(300.0, 200.0, 3));
        let regions = grouper.group(&candidates, 3, 640, 480);
        assert_eq!(regions.len(), 2);
        assert!(regions[0].x < regions[1].x);
    }

    #[test]
    fn test_order_follows_first_member() {
        let grouper = CandidateGrouper::default();
        let mut candidates = vec![cand(300.0, 200.0, 100.0); 2];
        candidates.extend(vec![cand(0.0, 0.0, 100.0); 2]);
        let regions = grouper.group(&candidates, 2, 640, 480);
        assert_eq!(regions[0].x, 300);
        assert_eq!(regions[1].x, 0);
    }

    #[test]
    fn test_grouping_is_transitive() {
        // a~b and b~c but a is too far from c on its own
        let grouper = CandidateGrouper::default();
        let candidates = vec![
            cand(0.0, 0.0, 100.0),
            cand(15.0, 0.0, 100.0),
            cand(30.0, 0.0, 100.0),
        ];
        assert!(!grouper.similar(&candidates[0], &candidates[2]));
        assert_eq!(grouper.group(&candidates, 3, 640, 480).len(), 1);
    }

    #[test]
    fn test_regions_are_clamped_to_raster() {
        let grouper = CandidateGrouper::default();
        let candidates = vec![cand(600.0, 400.0, 100.0)];
        let regions = grouper.group(&candidates, 1, 640, 480);
        assert_eq!(regions, vec![FaceRegion::new(600, 400, 40, 80)]);
    }
}
