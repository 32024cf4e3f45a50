//! Best-first search tree
//!
//! Uses arena allocation: nodes live in one vector and refer to each other by
//! index. A parent owns its children through the index list; the parent index
//! stored on each node is only used to walk back up during backpropagation.
//!
//! ## Architecture
//! - Level 2: Tree operations (select_leaf, expand, backpropagate)
//! - Level 3: Minimax child choice
//! - Level 4: Statistics, utilities

use fourrow_core::{Action, GameState, Player, Result, Rules};

// ============================================================================
// TYPES
// ============================================================================

/// Node identifier (index into arena)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A node in the search tree
#[derive(Clone, Debug)]
pub struct SearchNode {
    /// Position at this node
    pub state: GameState,
    /// Parent node (None for root)
    pub parent: Option<NodeId>,
    /// Action that led here from the parent (None for root)
    pub action: Option<Action>,
    /// Children in action enumeration order
    pub children: Vec<NodeId>,
    /// Heuristic value, later overwritten by backpropagation
    pub value: f64,
    /// Distance from the root
    pub depth: usize,
}

impl SearchNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ============================================================================
// SEARCH TREE (Level 2 - Tree Operations)
// ============================================================================

/// Search tree with arena allocation
#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    /// Side the tree maximizes for, fixed at construction
    player: Player,
}

impl SearchTree {
    /// Create a tree whose root holds `root_state` with the given value
    pub fn new(root_state: GameState, player: Player, root_value: f64) -> Self {
        let root = SearchNode {
            state: root_state,
            parent: None,
            action: None,
            children: Vec::new(),
            value: root_value,
            depth: 0,
        };
        Self {
            nodes: vec![root],
            player,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Descend from the root along minimax choices until a leaf
    pub fn select_leaf(&self) -> NodeId {
        let mut current = self.root();
        loop {
            let next = self.minmax(current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Expand a leaf into one child per legal action, then prune.
    ///
    /// Every child is evaluated in enumeration order before pruning, so the
    /// evaluator sees (and draws noise for) pruned children too. Children whose
    /// value is more than `theta` away from the minimax child's value are
    /// discarded; the minimax child itself is always kept. Returns the number
    /// of children kept. A terminal leaf stays childless.
    pub fn expand<G, F>(&mut self, id: NodeId, rules: &G, theta: f64, mut evaluate: F) -> Result<usize>
    where
        G: Rules + ?Sized,
        F: FnMut(&GameState) -> f64,
    {
        let node = self.get(id);
        let actions = rules.valid_actions(&node.state.grid);
        let maximize = self.maximizes(&node.state);
        let depth = node.depth + 1;

        let mut candidates = Vec::with_capacity(actions.len());
        for action in actions {
            let next = rules.transit(&self.get(id).state, action)?;
            let value = evaluate(&next.state);
            candidates.push((action, next.state, value));
        }

        let Some(best) = pick(candidates.iter().map(|(_, _, v)| *v), maximize) else {
            return Ok(0);
        };
        let best_value = candidates[best].2;

        let mut kept = Vec::new();
        for (i, (action, state, value)) in candidates.into_iter().enumerate() {
            if i != best && (value - best_value).abs() > theta {
                continue;
            }
            let child = NodeId(self.nodes.len());
            self.nodes.push(SearchNode {
                state,
                parent: Some(id),
                action: Some(action),
                children: Vec::new(),
                value,
                depth,
            });
            kept.push(child);
        }

        let count = kept.len();
        self.nodes[id.0].children = kept;
        Ok(count)
    }

    /// Attach a single child without evaluation or pruning
    pub fn attach(&mut self, id: NodeId, action: Action, state: GameState, value: f64) -> NodeId {
        let child = NodeId(self.nodes.len());
        let depth = self.get(id).depth + 1;
        self.nodes.push(SearchNode {
            state,
            parent: Some(id),
            action: Some(action),
            children: Vec::new(),
            value,
            depth,
        });
        self.nodes[id.0].children.push(child);
        child
    }

    /// Refresh values from `id` up to the root with each node's minimax child value
    pub fn backpropagate(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let value = self.get(self.minmax(node_id)).value;
            let node = &mut self.nodes[node_id.0];
            node.value = value;
            current = node.parent;
        }
    }

    // ========================================================================
    // Level 3: Minimax Choice
    // ========================================================================

    /// Does the tree maximize at a node with this state?
    fn maximizes(&self, state: &GameState) -> bool {
        state.to_move == self.player
    }

    /// The child a minimax player picks at `id`, or `id` itself for a leaf.
    ///
    /// Maximizes when the search player is to move, minimizes otherwise. Ties
    /// go to the child enumerated first.
    pub fn minmax(&self, id: NodeId) -> NodeId {
        let node = self.get(id);
        let maximize = self.maximizes(&node.state);
        pick(node.children.iter().map(|&c| self.get(c).value), maximize)
            .map_or(id, |i| node.children[i])
    }

    /// Action of the root's minimax child
    pub fn best_action(&self) -> Option<Action> {
        let choice = self.minmax(self.root());
        if choice == self.root() {
            return None;
        }
        self.get(choice).action
    }

    // ========================================================================
    // Level 4: Statistics
    // ========================================================================

    /// Root children as (action, value) pairs
    pub fn root_values(&self) -> Vec<(Action, f64)> {
        self.get(self.root())
            .children
            .iter()
            .filter_map(|&c| {
                let node = self.get(c);
                node.action.map(|a| (a, node.value))
            })
            .collect()
    }

    /// Deepest node depth
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

/// Index of the strictly best value, first one winning ties
fn pick(values: impl Iterator<Item = f64>, maximize: bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, value) in values.enumerate() {
        let better = match best {
            None => true,
            Some((_, current)) if maximize => value > current,
            Some((_, current)) => value < current,
        };
        if better {
            best = Some((i, value));
        }
    }
    best.map(|(i, _)| i)
}

// ============================================================================
// TESTS
// ============================================================================
