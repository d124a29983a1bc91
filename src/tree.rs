//! Relationships derived from `parent_id`.
//!
//! Nothing here is cached: every query filters the flat folder/file sets.
//! That is linear per lookup, which is fine for a personal note tree.

use std::collections::{HashSet, VecDeque};

use crate::models::FileSystem;

/// Everything a folder transitively owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtree {
    /// The folder itself first, then descendants in breadth-first order.
    pub folder_ids: Vec<String>,
    /// Files owned by any folder in `folder_ids`, in discovery order.
    pub file_ids: Vec<String>,
}

/// Breadth-first walk from `folder_id`, collecting every descendant folder
/// and every file held by any of them (including the folder itself).
///
/// A folder that is its own ancestor through corrupt data is visited once.
pub fn collect_subtree(fs: &FileSystem, folder_id: &str) -> Subtree {
    let mut subtree = Subtree::default();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([folder_id.to_string()]);

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        for child in fs.child_folders(&current) {
            queue.push_back(child.id.clone());
        }
        subtree.folder_ids.push(current);
    }

    for folder_id in &subtree.folder_ids {
        subtree
            .file_ids
            .extend(fs.child_files(folder_id).map(|f| f.id.clone()));
    }

    subtree
}

/// Walks up from `folder_id` towards the root, yielding each ancestor id.
/// Stops on a missing parent or on a loop.
pub fn ancestors(fs: &FileSystem, folder_id: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([folder_id.to_string()]);
    let mut current = fs.folder(folder_id).and_then(|f| f.parent_id.clone());

    while let Some(id) = current {
        if !seen.insert(id.clone()) {
            break;
        }
        current = fs.folder(&id).and_then(|f| f.parent_id.clone());
        chain.push(id);
    }

    chain
}

/// Whether moving `folder_id` under `new_parent_id` would close a loop,
/// i.e. the target is the folder itself or one of its descendants.
pub fn would_create_cycle(fs: &FileSystem, folder_id: &str, new_parent_id: &str) -> bool {
    new_parent_id == folder_id || ancestors(fs, new_parent_id).iter().any(|id| id == folder_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{File, Folder};
    use proptest::prelude::*;

    fn folder(id: &str, parent: &str) -> Folder {
        Folder::new(id, format!("folder-{}", id), Some(parent.to_string()))
    }

    fn sample() -> FileSystem {
        FileSystem {
            folders: vec![
                Folder::new("1", "root", None),
                folder("2", "1"),
                folder("3", "2"),
                folder("4", "2"),
                folder("5", "3"),
                folder("6", "1"),
            ],
            files: vec![
                File::new("10", "a.md", "2", ""),
                File::new("11", "b.md", "5", ""),
                File::new("12", "c.md", "6", ""),
                File::new("13", "d.md", "1", ""),
            ],
        }
    }

    #[test]
    fn test_collect_subtree_breadth_first() {
        let subtree = collect_subtree(&sample(), "2");
        assert_eq!(subtree.folder_ids, vec!["2", "3", "4", "5"]);
        assert_eq!(subtree.file_ids, vec!["10", "11"]);
    }

    #[test]
    fn test_collect_subtree_leaf() {
        let subtree = collect_subtree(&sample(), "6");
        assert_eq!(subtree.folder_ids, vec!["6"]);
        assert_eq!(subtree.file_ids, vec!["12"]);
    }

    #[test]
    fn test_collect_subtree_survives_loops() {
        let mut fs = sample();
        fs.folders.push(folder("7", "8"));
        fs.folders.push(folder("8", "7"));
        let subtree = collect_subtree(&fs, "7");
        assert_eq!(subtree.folder_ids, vec!["7", "8"]);
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        assert_eq!(ancestors(&sample(), "5"), vec!["3", "2", "1"]);
        assert!(ancestors(&sample(), "1").is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let fs = sample();
        assert!(would_create_cycle(&fs, "2", "5"));
        assert!(would_create_cycle(&fs, "2", "2"));
        assert!(!would_create_cycle(&fs, "3", "6"));
        assert!(!would_create_cycle(&fs, "5", "1"));
    }

    /// Builds a random forest under the root: folder `i` hangs off an
    /// earlier folder, file `j` off any folder.
    fn tree_strategy() -> impl Strategy<Value = FileSystem> {
        (1usize..20)
            .prop_flat_map(|n| {
                (
                    proptest::collection::vec(any::<prop::sample::Index>(), n),
                    proptest::collection::vec(any::<prop::sample::Index>(), 0..30),
                )
            })
            .prop_map(|(parents, file_parents)| {
                let mut folders = vec![Folder::new("f0", "root", None)];
                for (i, parent) in parents.iter().enumerate() {
                    let parent_id = folders[parent.index(folders.len())].id.clone();
                    folders.push(folder(&format!("f{}", i + 1), &parent_id));
                }
                let files = file_parents
                    .iter()
                    .enumerate()
                    .map(|(j, parent)| {
                        let parent_id = folders[parent.index(folders.len())].id.clone();
                        File::new(format!("x{}", j), "n.md", parent_id, "")
                    })
                    .collect();
                FileSystem { folders, files }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every folder reached has the target among its ancestors (or is the
        /// target), every folder not reached does not, and the collected files
        /// are exactly those whose parent was reached.
        #[test]
        fn prop_subtree_is_exactly_the_descendants(fs in tree_strategy(), pick in any::<prop::sample::Index>()) {
            let target = fs.folders[pick.index(fs.folders.len())].id.clone();
            let subtree = collect_subtree(&fs, &target);

            for folder in &fs.folders {
                let inside = folder.id == target || ancestors(&fs, &folder.id).contains(&target);
                prop_assert_eq!(inside, subtree.folder_ids.contains(&folder.id));
            }
            for file in &fs.files {
                prop_assert_eq!(
                    subtree.folder_ids.contains(&file.parent_id),
                    subtree.file_ids.contains(&file.id)
                );
            }
        }
    }
}
