//! Positional pattern features
//!
//! Counts line patterns for one color on a grid. Every piece is taken as a
//! possible pattern start and each of the four axes is scanned in a single
//! canonical direction. Off-board cells are never empty and never either
//! color: a pattern that needs an in-bounds cell fails at the edge, while a
//! "not own color" check passes there.
//!
//! Sub-patterns are not deduplicated. One physical run may satisfy several
//! sub-patterns of a feature and is then counted once per match.

use fourrow_core::{Action, Cell, Grid, Player};
use rustc_hash::FxHashSet;

use crate::params::Feature;

/// Scan directions: horizontal, vertical, diagonal, anti-diagonal
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

// ============================================================================
// EXTRACTOR TRAIT
// ============================================================================

/// Source of feature counts for one color on one grid
pub trait FeatureExtractor {
    /// Count occurrences of `feature` among `pieces` (all of one color)
    fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32;
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &E {
    fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32 {
        (**self).count(feature, grid, pieces)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for std::sync::Arc<E> {
    fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32 {
        (**self).count(feature, grid, pieces)
    }
}

/// Direct pattern scan, no memoization
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternExtractor;

impl FeatureExtractor for PatternExtractor {
    fn count(&self, feature: Feature, grid: &Grid, pieces: &[Action]) -> u32 {
        match feature {
            Feature::Connected2 => connected_2(grid, pieces),
            Feature::Unconnected2 => unconnected_2(grid, pieces),
            Feature::Connected3 => connected_3(grid, pieces),
            Feature::Connected4 => connected_4(grid, pieces),
        }
    }
}

// ============================================================================
// SCAN CONTEXT
// ============================================================================

/// Lookup helpers shared by the four pattern scans
struct Scan<'a> {
    grid: &'a Grid,
    own: Cell,
    opponent: Cell,
    pieces: FxHashSet<(isize, isize)>,
}

impl<'a> Scan<'a> {
    /// Color is read from the grid at the first piece
    fn new(grid: &'a Grid, pieces: &[Action]) -> Option<Self> {
        let first = pieces.first()?;
        let own = grid.at(*first);
        let player = own.owner()?;
        Some(Self {
            grid,
            own,
            opponent: Cell::from(player.opponent()),
            pieces: pieces
                .iter()
                .map(|a| (a.row as isize, a.col as isize))
                .collect(),
        })
    }

    fn has_piece(&self, (r, c): (isize, isize)) -> bool {
        self.pieces.contains(&(r, c))
    }

    /// In bounds and empty
    fn is_empty(&self, (r, c): (isize, isize)) -> bool {
        self.grid.probe(r, c) == Some(Cell::Empty)
    }

    /// In bounds and not held by the opponent
    fn is_open(&self, (r, c): (isize, isize)) -> bool {
        matches!(self.grid.probe(r, c), Some(cell) if cell != self.opponent)
    }

    /// Off the board or not held by this color
    fn not_own(&self, (r, c): (isize, isize)) -> bool {
        self.grid.probe(r, c) != Some(self.own)
    }

    /// Every (piece, direction) pair to try as a pattern start
    fn starts(&self) -> impl Iterator<Item = ((isize, isize), (isize, isize))> + '_ {
        self.pieces
            .iter()
            .copied()
            .flat_map(|p| DIRECTIONS.into_iter().map(move |d| (p, d)))
    }
}

fn step((r, c): (isize, isize), (dr, dc): (isize, isize), k: isize) -> (isize, isize) {
    (r + k * dr, c + k * dc)
}

fn enough(pieces: &[Action], feature: Feature) -> bool {
    pieces.len() >= feature.min_pieces()
}

// ============================================================================
// PATTERNS
// ============================================================================

/// Connected pairs: `-xx-`, `xx--` and `--xx`, each matched independently
pub fn connected_2(grid: &Grid, pieces: &[Action]) -> u32 {
    if !enough(pieces, Feature::Connected2) {
        return 0;
    }
    let Some(scan) = Scan::new(grid, pieces) else {
        return 0;
    };

    let mut count = 0;
    for (p, d) in scan.starts() {
        if !scan.has_piece(step(p, d, 1)) {
            continue;
        }
        let (prev, prev2) = (step(p, d, -1), step(p, d, -2));
        let (next2, next3) = (step(p, d, 2), step(p, d, 3));

        // -xx-
        if scan.is_empty(prev) && scan.is_empty(next2) {
            count += 1;
        }
        // xx--
        if scan.is_empty(next2) && scan.is_open(next3) && scan.not_own(prev) {
            count += 1;
        }
        // --xx
        if scan.is_empty(prev) && scan.is_open(prev2) && scan.not_own(next2) {
            count += 1;
        }
    }
    count
}

/// Split pairs: `x-x-` and `-x-x`
pub fn unconnected_2(grid: &Grid, pieces: &[Action]) -> u32 {
    if !enough(pieces, Feature::Unconnected2) {
        return 0;
    }
    let Some(scan) = Scan::new(grid, pieces) else {
        return 0;
    };

    let mut count = 0;
    for (p, d) in scan.starts() {
        let prev = step(p, d, -1);
        let (next, next2, next3) = (step(p, d, 1), step(p, d, 2), step(p, d, 3));

        if !(scan.is_empty(next) && scan.has_piece(next2)) {
            continue;
        }
        // x-x-
        if scan.is_empty(next3) && scan.not_own(prev) {
            count += 1;
        }
        // -x-x
        if scan.is_empty(prev) && scan.not_own(next3) {
            count += 1;
        }
    }
    count
}

/// Connected triples: `xxx-` and `-xxx`
pub fn connected_3(grid: &Grid, pieces: &[Action]) -> u32 {
    if !enough(pieces, Feature::Connected3) {
        return 0;
    }
    let Some(scan) = Scan::new(grid, pieces) else {
        return 0;
    };

    let mut count = 0;
    for (p, d) in scan.starts() {
        if !(scan.has_piece(step(p, d, 1)) && scan.has_piece(step(p, d, 2))) {
            continue;
        }
        let (prev, next3) = (step(p, d, -1), step(p, d, 3));

        // xxx-
        if scan.is_open(next3) && scan.not_own(prev) {
            count += 1;
        }
        // -xxx
        if scan.is_open(prev) && scan.not_own(next3) {
            count += 1;
        }
    }
    count
}

/// Four in a row, counted once at the start of each run
pub fn connected_4(grid: &Grid, pieces: &[Action]) -> u32 {
    if !enough(pieces, Feature::Connected4) {
        return 0;
    }
    let Some(scan) = Scan::new(grid, pieces) else {
        return 0;
    };

    let mut starts = FxHashSet::default();
    for (p, d) in scan.starts() {
        let run = (1..4).all(|k| scan.has_piece(step(p, d, k)));
        if run && scan.not_own(step(p, d, -1)) {
            starts.insert((p, d));
        }
    }
    starts.len() as u32
}

/// Center proximity: sum of inverse distances for `player` minus the opponent's
///
/// A piece lying exactly on the center is scored as if half a cell away.
pub fn center_value(center: (f64, f64), player: &[Action], opponent: &[Action]) -> f64 {
    closeness(center, player) - closeness(center, opponent)
}

fn closeness(center: (f64, f64), pieces: &[Action]) -> f64 {
    pieces
        .iter()
        .map(|a| {
            let dr = a.row as f64 - center.0;
            let dc = a.col as f64 - center.1;
            1.0 / dr.hypot(dc).max(0.5)
        })
        .sum()
}

/// All four counts for one color, in [`Feature::ALL`] order
pub fn all_counts<E: FeatureExtractor + ?Sized>(
    extractor: &E,
    grid: &Grid,
    player: Player,
) -> [u32; 4] {
    let pieces = grid.pieces(player);
    Feature::ALL.map(|f| extractor.count(f, grid, &pieces))
}

// ============================================================================
// TESTS
// ============================================================================
