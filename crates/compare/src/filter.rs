use crate::delta::{DifferenceType, InodeDelta};

/// Removes `size` key-deltas on directory entries.
///
/// Tar archives do not record meaningful sizes for directories, so a
/// manifest synthesized from an archive disagrees with a filesystem walk
/// on every directory's `size`. Callers comparing across that boundary
/// run the delta list through this filter before reporting. Modified
/// deltas left with no keys are dropped entirely.
pub fn strip_tar_directory_sizes(deltas: &mut Vec<InodeDelta>) {
    for delta in deltas.iter_mut() {
        if delta.diff() != DifferenceType::Modified {
            continue;
        }
        if delta.entry_type() != Some("dir") {
            continue;
        }
        delta
            .keys_mut()
            .retain(|key| key.name().as_str() != "size");
    }
    deltas.retain(|delta| {
        delta.diff() != DifferenceType::Modified || !delta.keys().is_empty()
    });
}

/// Retains only deltas the predicate accepts; convenience for collaborator
/// filter stacks.
pub fn retain_deltas<F>(deltas: &mut Vec<InodeDelta>, mut keep: F)
where
    F: FnMut(&InodeDelta) -> bool,
{
    deltas.retain(|delta| keep(delta));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use omtree_spec::parse_spec;

    #[test]
    fn directory_size_deltas_are_stripped() {
        let fs_side = parse_spec(". type=dir size=4096\n    f type=file size=3\n".as_bytes())
            .expect("manifest parses");
        let tar_side = parse_spec(". type=dir size=0\n    f type=file size=3\n".as_bytes())
            .expect("manifest parses");

        let mut deltas = compare(Some(&fs_side), Some(&tar_side), None).unwrap();
        assert_eq!(deltas.len(), 1, "{deltas:?}");

        strip_tar_directory_sizes(&mut deltas);
        assert!(deltas.is_empty(), "{deltas:?}");
    }

    #[test]
    fn file_size_deltas_survive() {
        let old = parse_spec("    f type=file size=3\n".as_bytes()).unwrap();
        let new = parse_spec("    f type=file size=9\n".as_bytes()).unwrap();

        let mut deltas = compare(Some(&old), Some(&new), None).unwrap();
        strip_tar_directory_sizes(&mut deltas);
        assert_eq!(deltas.len(), 1);
    }

    #[test]
    fn retain_deltas_applies_the_predicate() {
        let old = parse_spec(". type=dir\n    f type=file size=1\n".as_bytes()).unwrap();
        let new = parse_spec(". type=dir\n".as_bytes()).unwrap();

        let mut deltas = compare(Some(&old), Some(&new), None).unwrap();
        assert_eq!(deltas.len(), 1);
        retain_deltas(&mut deltas, |delta| {
            delta.diff() != DifferenceType::Missing
        });
        assert!(deltas.is_empty());
    }
}
