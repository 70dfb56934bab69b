/// File-name filter built from a comma-separated pattern list.
/// `*.ext` patterns match by case-insensitive suffix, anything else must
/// match the file name exactly (case-insensitive). An empty list passes
/// every name. Directories are never tested, only leaf files.
#[derive(Clone, Debug, Default)]
pub struct FileFilter {
    patterns: Vec<String>,
}

impl FileFilter {
    pub fn parse(raw: &str) -> Self {
        let patterns = raw
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let name = name.to_lowercase();
        self.patterns.iter().any(|p| match p.strip_prefix("*.") {
            Some(ext) => name.len() > ext.len() && name.ends_with(ext) && {
                // require the dot: "*.txt" must not match a file named "txt"
                name.as_bytes()[name.len() - ext.len() - 1] == b'.'
            },
            None => name == *p,
        })
    }
}

/// Hidden by the dotfile convention, the portable rule for this engine.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// The full inclusion decision for a leaf file.
pub fn include_file(name: &str, exclude_hidden: bool, filter: &FileFilter) -> bool {
    if exclude_hidden && is_hidden(name) {
        return false;
    }
    filter.matches(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_passes_everything() {
        let f = FileFilter::parse("");
        assert!(f.is_empty());
        assert!(f.matches("anything.bin"));
        let f = FileFilter::parse(" , ,");
        assert!(f.is_empty());
    }

    #[test]
    fn suffix_patterns_are_case_insensitive() {
        let f = FileFilter::parse("*.txt, *.JPG");
        assert!(f.matches("notes.TXT"));
        assert!(f.matches("photo.jpg"));
        assert!(!f.matches("image.png"));
    }

    #[test]
    fn suffix_requires_the_dot() {
        let f = FileFilter::parse("*.txt");
        assert!(!f.matches("txt"));
        assert!(!f.matches("atxt"));
        assert!(f.matches("a.txt"));
    }

    #[test]
    fn bare_patterns_match_exactly() {
        let f = FileFilter::parse("Makefile,*.rs");
        assert!(f.matches("makefile"));
        assert!(f.matches("lib.rs"));
        assert!(!f.matches("Makefile.bak"));
    }

    #[test]
    fn hidden_rule_applies_before_filter() {
        let f = FileFilter::parse("*.txt");
        assert!(!include_file(".secret.txt", true, &f));
        assert!(include_file(".secret.txt", false, &f));
        assert!(include_file("plain.txt", true, &f));
        assert!(!include_file("plain.png", true, &f));
    }
}
