//! Split-view tab management
//!
//! Two panes, `left` and `right`, each with an ordered tab list and an
//! optional active tab. Single-pane mode only ever touches `left`.
//! After every transition the auto-collapse rule is re-checked: a split
//! view whose left pane emptied while the right still has tabs folds the
//! right pane back into the left.

use serde::{Deserialize, Serialize};

pub const MIN_SPLIT_RATIO: f64 = 20.0;
pub const MAX_SPLIT_RATIO: f64 = 80.0;
pub const DEFAULT_SPLIT_RATIO: f64 = 50.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    Left,
    Right,
}

impl Pane {
    pub fn other(self) -> Pane {
        match self {
            Pane::Left => Pane::Right,
            Pane::Right => Pane::Left,
        }
    }
}

/// Tabs of a single pane.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaneTabs {
    pub open_files: Vec<String>,
    pub active_file: Option<String>,
}

impl PaneTabs {
    pub fn contains(&self, file_id: &str) -> bool {
        self.open_files.iter().any(|id| id == file_id)
    }

    fn push_unique(&mut self, file_id: &str) {
        if !self.contains(file_id) {
            self.open_files.push(file_id.to_string());
        }
    }

    /// Drops `file_id`; if it was active, the last remaining tab takes over.
    fn remove(&mut self, file_id: &str) -> bool {
        let before = self.open_files.len();
        self.open_files.retain(|id| id != file_id);
        if self.open_files.len() == before {
            return false;
        }
        if self.active_file.as_deref() == Some(file_id) {
            self.active_file = self.open_files.last().cloned();
        }
        true
    }
}

/// Persisted layout of both panes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaneState {
    pub left: PaneTabs,
    pub right: PaneTabs,
    pub split_view: bool,
    pub split_ratio: f64,
}

impl Default for PaneState {
    fn default() -> Self {
        Self {
            left: PaneTabs::default(),
            right: PaneTabs::default(),
            split_view: false,
            split_ratio: DEFAULT_SPLIT_RATIO,
        }
    }
}

pub fn clamp_split_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return DEFAULT_SPLIT_RATIO;
    }
    ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

#[derive(Debug, Clone, Default)]
pub struct PaneManager {
    state: PaneState,
}

impl PaneManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(mut state: PaneState) -> Self {
        state.split_ratio = clamp_split_ratio(state.split_ratio);
        let mut manager = Self { state };
        manager.enforce_collapse();
        manager
    }

    pub fn state(&self) -> &PaneState {
        &self.state
    }

    pub fn tabs(&self, pane: Pane) -> &PaneTabs {
        match pane {
            Pane::Left => &self.state.left,
            Pane::Right => &self.state.right,
        }
    }

    fn tabs_mut(&mut self, pane: Pane) -> &mut PaneTabs {
        match pane {
            Pane::Left => &mut self.state.left,
            Pane::Right => &mut self.state.right,
        }
    }

    pub fn open_files(&self, pane: Pane) -> &[String] {
        &self.tabs(pane).open_files
    }

    pub fn active_file(&self, pane: Pane) -> Option<&str> {
        self.tabs(pane).active_file.as_deref()
    }

    pub fn split_view(&self) -> bool {
        self.state.split_view
    }

    pub fn split_ratio(&self) -> f64 {
        self.state.split_ratio
    }

    pub fn is_open(&self, file_id: &str) -> bool {
        self.state.left.contains(file_id) || self.state.right.contains(file_id)
    }

    /// A click on a file in the tree.
    ///
    /// Returns the pane the file ended up active in.
    pub fn open_file(&mut self, file_id: &str) -> Pane {
        let pane = if !self.state.split_view {
            Pane::Left
        } else if self.state.left.contains(file_id) {
            Pane::Left
        } else if self.state.right.contains(file_id) || self.state.right.active_file.is_none() {
            Pane::Right
        } else {
            Pane::Left
        };

        self.open_in(pane, file_id)
    }

    /// "Open in split view": always lands in the right pane, pulling the
    /// file out of the left pane if it was there.
    pub fn open_in_split(&mut self, file_id: &str) {
        self.state.split_view = true;
        if !self.state.right.contains(file_id) {
            self.state.left.remove(file_id);
        }
        self.open_in(Pane::Right, file_id);
    }

    /// Returns the pane the file is active in once the collapse rule ran.
    fn open_in(&mut self, pane: Pane, file_id: &str) -> Pane {
        let tabs = self.tabs_mut(pane);
        tabs.push_unique(file_id);
        tabs.active_file = Some(file_id.to_string());
        if self.enforce_collapse() {
            Pane::Left
        } else {
            pane
        }
    }

    /// Activates an already-open tab. Returns false if it isn't in `pane`.
    pub fn set_active(&mut self, pane: Pane, file_id: &str) -> bool {
        let tabs = self.tabs_mut(pane);
        if !tabs.contains(file_id) {
            return false;
        }
        tabs.active_file = Some(file_id.to_string());
        true
    }

    /// Closes one tab. Returns false if it wasn't open in `pane`.
    pub fn close_tab(&mut self, pane: Pane, file_id: &str) -> bool {
        if !self.tabs_mut(pane).remove(file_id) {
            return false;
        }
        if pane == Pane::Right && self.state.split_view && self.state.right.open_files.is_empty() {
            self.state.split_view = false;
        }
        self.enforce_collapse();
        true
    }

    /// Closes `file_id` in every pane it is open in, left first.
    pub fn close_everywhere(&mut self, file_id: &str) -> bool {
        let left = self.close_tab(Pane::Left, file_id);
        let right = self.close_tab(Pane::Right, file_id);
        left || right
    }

    /// Drag a tab from `from` onto the other pane.
    pub fn move_tab(&mut self, from: Pane, file_id: &str) -> bool {
        let to = from.other();
        if !self.tabs_mut(from).remove(file_id) {
            return false;
        }
        let tabs = self.tabs_mut(to);
        tabs.push_unique(file_id);
        tabs.active_file = Some(file_id.to_string());
        if to == Pane::Right {
            self.state.split_view = true;
        }
        if from == Pane::Right && self.state.right.open_files.is_empty() {
            self.state.split_view = false;
        }
        self.enforce_collapse();
        true
    }

    /// Drag a tab to another position within its own pane.
    pub fn reorder_tab(&mut self, pane: Pane, from_index: usize, to_index: usize) -> bool {
        let tabs = self.tabs_mut(pane);
        if from_index >= tabs.open_files.len() {
            return false;
        }
        let id = tabs.open_files.remove(from_index);
        let to_index = to_index.min(tabs.open_files.len());
        tabs.open_files.insert(to_index, id);
        true
    }

    pub fn toggle_split_view(&mut self) -> bool {
        if self.state.split_view {
            self.merge_right_into_left();
        } else {
            self.state.split_view = true;
        }
        self.state.split_view
    }

    pub fn set_split_ratio(&mut self, ratio: f64) -> f64 {
        self.state.split_ratio = clamp_split_ratio(ratio);
        self.state.split_ratio
    }

    /// Empties both panes; the split ratio is kept.
    pub fn clear(&mut self) {
        self.state.left = PaneTabs::default();
        self.state.right = PaneTabs::default();
        self.state.split_view = false;
    }

    /// Drops tabs for files that no longer exist.
    pub fn retain_files<F>(&mut self, mut exists: F)
    where
        F: FnMut(&str) -> bool,
    {
        let stale: Vec<String> = self
            .state
            .left
            .open_files
            .iter()
            .chain(self.state.right.open_files.iter())
            .filter(|id| !exists(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.close_everywhere(&id);
        }
        for tabs in [&mut self.state.left, &mut self.state.right] {
            if let Some(active) = &tabs.active_file {
                if !tabs.contains(active) {
                    tabs.active_file = tabs.open_files.last().cloned();
                }
            }
        }
    }

    /// Folds the right pane into the left when the left has emptied under a
    /// split view. Returns true if it did anything.
    pub fn enforce_collapse(&mut self) -> bool {
        if self.state.split_view
            && self.state.left.open_files.is_empty()
            && !self.state.right.open_files.is_empty()
        {
            self.merge_right_into_left();
            return true;
        }
        false
    }

    fn merge_right_into_left(&mut self) {
        let right = std::mem::take(&mut self.state.right);
        for id in &right.open_files {
            self.state.left.push_unique(id);
        }
        if right.active_file.is_some() {
            self.state.left.active_file = right.active_file;
        }
        self.state.split_view = false;
    }
}
