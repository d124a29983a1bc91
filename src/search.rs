use crate::models::{File, FileSystem};

/// Files whose name or content contains the query, ignoring case.
///
/// The iterator is lazy and `Clone`, so a caller can restart it without
/// re-running the search. The query is matched as typed, surrounding spaces
/// included; a query of nothing but whitespace matches nothing.
pub fn search<'a>(fs: &'a FileSystem, query: &str) -> Matches<'a> {
    let needle = if query.trim().is_empty() {
        String::new()
    } else {
        query.to_lowercase()
    };
    Matches {
        files: fs.files.iter(),
        needle,
    }
}

#[derive(Clone, Debug)]
pub struct Matches<'a> {
    files: std::slice::Iter<'a, File>,
    needle: String,
}

impl<'a> Iterator for Matches<'a> {
    type Item = &'a File;

    fn next(&mut self) -> Option<Self::Item> {
        if self.needle.is_empty() {
            return None;
        }
        let needle = self.needle.as_str();
        self.files.by_ref().find(|file| {
            file.name.to_lowercase().contains(needle) || file.content.to_lowercase().contains(needle)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.files.len()))
    }
}
