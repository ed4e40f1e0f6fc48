/// Connected-component labeling
///
/// Each mask row is split into horizontal runs of set cells. Runs in adjacent
/// rows whose x spans overlap belong to the same 4-connected component; they
/// are joined with a union-find over run indices stored in flat arrays, so
/// stack depth stays constant no matter how large a component grows.
use super::region::{BoundingBox, Region};
use super::segmenter::Mask;
use crate::error::SentinelError;

/// Horizontal run of set cells, `end` exclusive.
#[derive(Debug, Clone, Copy)]
struct Run {
    y: u32,
    start: u32,
    end: u32,
}

impl Run {
    fn len(&self) -> u64 {
        (self.end - self.start) as u64
    }

    fn overlaps(&self, other: &Run) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Union-find with union by size and path halving.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

/// Running totals for one component.
#[derive(Debug, Clone)]
struct Component {
    first_run: usize,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixels: u64,
    sum_x: u64,
    sum_y: u64,
}

impl Component {
    fn start(index: usize, run: &Run) -> Self {
        let mut component = Self {
            first_run: index,
            min_x: run.start,
            min_y: run.y,
            max_x: run.end,
            max_y: run.y + 1,
            pixels: 0,
            sum_x: 0,
            sum_y: 0,
        };
        component.add(run);
        component
    }

    fn add(&mut self, run: &Run) {
        self.min_x = self.min_x.min(run.start);
        self.min_y = self.min_y.min(run.y);
        self.max_x = self.max_x.max(run.end);
        self.max_y = self.max_y.max(run.y + 1);
        let len = run.len();
        self.pixels += len;
        // sum of start..end
        self.sum_x += len * (run.start as u64 + run.end as u64 - 1) / 2;
        self.sum_y += len * run.y as u64;
    }

    fn into_region(self) -> Region {
        let count = self.pixels as f64;
        Region {
            bbox: BoundingBox::new(
                self.min_x,
                self.min_y,
                self.max_x - self.min_x,
                self.max_y - self.min_y,
            ),
            pixel_count: self.pixels as usize,
            centroid: (self.sum_x as f64 / count, self.sum_y as f64 / count),
        }
    }
}

/// Groups mask cells into regions, dropping components below a size floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionExtractor {
    min_pixels: usize,
}

impl RegionExtractor {
    pub fn new(min_pixels: usize) -> Result<Self, SentinelError> {
        if min_pixels == 0 {
            return Err(SentinelError::configuration(
                "min_region_pixels must be at least 1",
            ));
        }
        Ok(Self { min_pixels })
    }

    pub fn min_pixels(&self) -> usize {
        self.min_pixels
    }

    /// Label `mask` and return its regions.
    ///
    /// Components smaller than `min_pixels` are discarded as noise. Regions
    /// are ordered by bounding-box top-left, row-major; boxes sharing a
    /// top-left corner keep the order of their first pixel.
    pub fn extract(&self, mask: &Mask) -> Vec<Region> {
        let (runs, row_starts) = collect_runs(mask);
        if runs.is_empty() {
            return Vec::new();
        }

        let mut forest = DisjointSet::new(runs.len());
        for y in 1..mask.height() as usize {
            let (mut i, prev_end) = (row_starts[y - 1], row_starts[y]);
            let (mut j, cur_end) = (row_starts[y], row_starts[y + 1]);
            while i < prev_end && j < cur_end {
                if runs[i].overlaps(&runs[j]) {
                    forest.union(i, j);
                }
                if runs[i].end < runs[j].end {
                    i += 1;
                } else {
                    j += 1;
                }
            }
        }

        // runs are row-major, so components come out in first-pixel order
        let mut slot_of_root: Vec<Option<usize>> = vec![None; runs.len()];
        let mut components: Vec<Component> = Vec::new();
        for (index, run) in runs.iter().enumerate() {
            let root = forest.find(index);
            match slot_of_root[root] {
                Some(slot) => components[slot].add(run),
                None => {
                    slot_of_root[root] = Some(components.len());
                    components.push(Component::start(index, run));
                }
            }
        }

        let total = components.len();
        let mut regions: Vec<(usize, Region)> = components
            .into_iter()
            .filter(|c| c.pixels as usize >= self.min_pixels)
            .map(|c| (c.first_run, c.into_region()))
            .collect();
        regions.sort_by_key(|(first_run, region)| (region.bbox.y, region.bbox.x, *first_run));

        tracing::trace!(
            "Extracted {} regions ({} components, {} below {} pixels)",
            regions.len(),
            total,
            total - regions.len(),
            self.min_pixels
        );

        regions.into_iter().map(|(_, region)| region).collect()
    }
}

/// Runs of every row plus the index of each row's first run.
///
/// `row_starts` has `height + 1` entries; row `y` owns
/// `runs[row_starts[y]..row_starts[y + 1]]`.
fn collect_runs(mask: &Mask) -> (Vec<Run>, Vec<usize>) {
    let mut runs = Vec::new();
    let mut row_starts = Vec::with_capacity(mask.height() as usize + 1);
    for y in 0..mask.height() {
        row_starts.push(runs.len());
        let row = mask.row(y);
        let mut x = 0usize;
        while x < row.len() {
            if !row[x] {
                x += 1;
                continue;
            }
            let start = x;
            while x < row.len() && row[x] {
                x += 1;
            }
            runs.push(Run {
                y,
                start: start as u32,
                end: x as u32,
            });
        }
    }
    row_starts.push(runs.len());
    (runs, row_starts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mask_is_one_region() {
        let mask = Mask::from_bits(10, 10, vec![true; 100]).unwrap();
        let regions = RegionExtractor::new(5).unwrap().extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count, 100);
        assert_eq!(regions[0].bbox, BoundingBox::new(0, 0, 10, 10));
        assert_eq!(regions[0].centroid, (4.5, 4.5));
    }

    #[test]
    fn test_four_connectivity_only() {
        let mask = Mask::from_rows(&[
            "#...", //
            ".#..", //
            "..##", //
        ]);
        let regions = RegionExtractor::new(1).unwrap().extract(&mask);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].pixel_count, 1);
        assert_eq!(regions[1].pixel_count, 1);
        assert_eq!(regions[2].pixel_count, 2);
    }

    #[test]
    fn test_u_shape_merges_late() {
        // two arms only meet on the last row
        let mask = Mask::from_rows(&[
            "#...#", //
            "#...#", //
            "#####", //
        ]);
        let regions = RegionExtractor::new(1).unwrap().extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count, 9);
        assert_eq!(regions[0].bbox, BoundingBox::new(0, 0, 5, 3));
    }

    #[test]
    fn test_small_components_dropped() {
        let mask = Mask::from_rows(&[
            "##......", //
            "##....#.", //
            "........", //
        ]);
        let regions = RegionExtractor::new(2).unwrap().extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count, 4);
    }

    #[test]
    fn test_ordering_by_top_left() {
        let mask = Mask::from_rows(&[
            "......##", //
            "......##", //
            ".##.....", //
            ".##.....", //
        ]);
        let regions = RegionExtractor::new(1).unwrap().extract(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bbox, BoundingBox::new(6, 0, 2, 2));
        assert_eq!(regions[1].bbox, BoundingBox::new(1, 2, 2, 2));
    }

    #[test]
    fn test_shared_top_left_uses_first_pixel() {
        // both components have their bounding box corner at (0, 0)
        let mask = Mask::from_rows(&[
            ".#.#", //
            ".#.#", //
            "##.#", //
            "...#", //
            "####", //
        ]);
        let regions = RegionExtractor::new(1).unwrap().extract(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bbox, BoundingBox::new(0, 0, 2, 3));
        assert_eq!(regions[0].pixel_count, 4);
        assert_eq!(regions[1].bbox, BoundingBox::new(0, 0, 4, 5));
        assert_eq!(regions[1].pixel_count, 8);
    }

    #[test]
    fn test_large_component_no_recursion() {
        let width = 1024;
        let height = 1024;
        // serpentine path, one component spanning the whole mask
        let mut mask = Mask::new(width, height);
        for y in 0..height {
            if y % 2 == 0 {
                for x in 0..width {
                    mask.set(x, y, true);
                }
            } else if (y / 2) % 2 == 0 {
                mask.set(width - 1, y, true);
            } else {
                mask.set(0, y, true);
            }
        }
        let regions = RegionExtractor::new(1).unwrap().extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count, mask.count_set());
    }

    #[test]
    fn test_zero_min_pixels_rejected() {
        assert!(RegionExtractor::new(0).unwrap_err().is_configuration());
    }

    #[test]
    fn test_empty_mask() {
        let mask = Mask::new(4, 4);
        assert!(RegionExtractor::new(1).unwrap().extract(&mask).is_empty());
    }
}
