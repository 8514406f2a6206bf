//! Class id to class description table.
//!
//! Detector backends report numeric class ids. The table maps an id to the
//! line at the same position in a `labels.txt` file, the layout detection
//! models ship their class list in.

use anyhow::{anyhow, Result};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read labels file {}: {}", path.display(), e))?;
        let labels = Self::parse(&raw);
        if labels.is_empty() {
            return Err(anyhow!("labels file {} has no labels", path.display()));
        }
        log::info!("loaded {} class labels from {}", labels.len(), path.display());
        Ok(labels)
    }

    /// One label per line. Blank lines keep their position so ids stay aligned;
    /// lines starting with `#` are skipped.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Description for `class_id`, or `class_<id>` when the table has none.
    pub fn describe(&self, class_id: u32) -> String {
        match self.names.get(class_id as usize) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("class_{}", class_id),
        }
    }

    /// Reverse lookup, used by synthetic backends to emit ids for known labels.
    pub fn id_of(&self, label: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|name| name == label)
            .map(|idx| idx as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_keeps_blank_positions_and_skips_comments() {
        let labels =
            ClassLabels::parse("# model classes\nBACKGROUND\nbox_truck\n\noverdimension_load\n");
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.describe(0), "BACKGROUND");
        assert_eq!(labels.describe(1), "box_truck");
        assert_eq!(labels.describe(2), "class_2");
        assert_eq!(labels.describe(3), "overdimension_load");
        assert_eq!(labels.describe(17), "class_17");
        assert_eq!(labels.id_of("overdimension_load"), Some(3));
        assert_eq!(labels.id_of("pedestrian"), None);
    }

    #[test]
    fn load_rejects_empty_file() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        assert!(ClassLabels::load(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn load_reads_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "BACKGROUND")?;
        writeln!(file, "dump_truck")?;
        let labels = ClassLabels::load(file.path())?;
        assert_eq!(labels.describe(1), "dump_truck");
        Ok(())
    }
}
